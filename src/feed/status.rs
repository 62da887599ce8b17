use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Loaded,
}

/// Per-row load state, keyed by visual index. Rows never requested are absent.
#[derive(Debug, Default)]
pub struct LoadStatusMap {
    entries: BTreeMap<usize, LoadStatus>,
}

impl LoadStatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<LoadStatus> {
        self.entries.get(&index).copied()
    }

    pub fn is_loaded(&self, index: usize) -> bool {
        self.get(index) == Some(LoadStatus::Loaded)
    }

    pub fn is_loading(&self, index: usize) -> bool {
        self.get(index) == Some(LoadStatus::Loading)
    }

    /// Sets every index in `start..=stop` to `status`. Empty when `stop < start`.
    pub fn mark_range(&mut self, start: usize, stop: usize, status: LoadStatus) {
        if stop < start {
            return;
        }
        for index in start..=stop {
            self.entries.insert(index, status);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrequested_rows_are_absent() {
        let map = LoadStatusMap::new();
        assert_eq!(map.get(0), None);
        assert!(!map.is_loaded(0));
        assert!(!map.is_loading(0));
        assert!(map.is_empty());
    }

    #[test]
    fn mark_range_is_inclusive() {
        let mut map = LoadStatusMap::new();
        map.mark_range(3, 5, LoadStatus::Loading);
        assert!(!map.is_loading(2));
        assert!(map.is_loading(3));
        assert!(map.is_loading(5));
        assert!(!map.is_loading(6));
    }

    #[test]
    fn mark_range_overwrites_status() {
        let mut map = LoadStatusMap::new();
        map.mark_range(0, 9, LoadStatus::Loading);
        map.mark_range(0, 4, LoadStatus::Loaded);
        assert!(map.is_loaded(4));
        assert!(map.is_loading(5));
        assert!(!map.is_loaded(5));
    }

    #[test]
    fn reversed_range_marks_nothing() {
        let mut map = LoadStatusMap::new();
        map.mark_range(5, 4, LoadStatus::Loaded);
        assert!(map.is_empty());
    }

    #[test]
    fn clear_forgets_everything() {
        let mut map = LoadStatusMap::new();
        map.mark_range(0, 2, LoadStatus::Loaded);
        map.clear();
        assert!(!map.is_loaded(0));
        assert!(map.is_empty());
    }
}
