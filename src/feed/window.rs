/// Decides which rows around the visible window still need data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderWindow {
    /// Rows beyond either edge of the viewport that are loaded ahead of time.
    pub threshold: usize,
    /// Requests are grown to at least this many rows where possible.
    pub minimum_batch_size: usize,
}

impl Default for LoaderWindow {
    fn default() -> Self {
        Self {
            threshold: 3,
            minimum_batch_size: 10,
        }
    }
}

impl LoaderWindow {
    /// Inclusive index ranges that should be requested for the given viewport.
    ///
    /// Scans the viewport widened by `threshold` for runs of rows for which
    /// `is_loaded` is false, then grows the last run forward and the first run
    /// backward towards `minimum_batch_size`, never crossing a loaded row or
    /// `item_count`.
    pub fn unloaded_ranges(
        &self,
        visible_start: usize,
        visible_stop: usize,
        item_count: usize,
        is_loaded: impl Fn(usize) -> bool,
    ) -> Vec<(usize, usize)> {
        if item_count == 0 || visible_stop < visible_start {
            return Vec::new();
        }
        let batch = self.minimum_batch_size.max(1);
        let start = visible_start.saturating_sub(self.threshold);
        let stop = visible_stop
            .saturating_add(self.threshold)
            .min(item_count - 1);
        if start > stop {
            return Vec::new();
        }

        let mut ranges = Vec::new();
        let mut run: Option<(usize, usize)> = None;
        for index in start..=stop {
            if !is_loaded(index) {
                run = Some(match run {
                    Some((s, _)) => (s, index),
                    None => (index, index),
                });
            } else if let Some(r) = run.take() {
                ranges.push(r);
            }
        }

        if let Some((s, mut e)) = run {
            let potential = (s + batch - 1).max(e).min(item_count - 1);
            while e < potential && !is_loaded(e + 1) {
                e += 1;
            }
            ranges.push((s, e));
        }

        if let Some(first) = ranges.first_mut() {
            while first.1 - first.0 + 1 < batch && first.0 > 0 && !is_loaded(first.0 - 1) {
                first.0 -= 1;
            }
        }

        ranges
    }
}
