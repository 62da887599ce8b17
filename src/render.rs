//! Plain-text rendering of a feed, one block per row.

use chrono::{DateTime, Utc};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::api::Post;
use crate::feed::FeedController;

const INDENT: &str = "     ";

pub struct RenderOptions {
    /// Display columns available per line.
    pub width: usize,
    /// Description lines shown under each post; 0 hides descriptions.
    pub excerpt_lines: usize,
    /// Rows rendered at most; `None` renders every row.
    pub max_rows: Option<usize>,
    pub now: DateTime<Utc>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 80,
            excerpt_lines: 2,
            max_rows: None,
            now: Utc::now(),
        }
    }
}

/// Renders every row of the feed followed by a status line, or the empty-feed
/// message once the feed is known to be empty.
pub fn render_feed(feed: &FeedController<Post>, opts: &RenderOptions) -> String {
    if feed.is_empty() {
        return "There are no posts yet!\nBe the first to create one!".to_string();
    }

    let rows = opts
        .max_rows
        .map_or(feed.item_count(), |max| max.min(feed.item_count()));
    let mut lines = Vec::new();
    for index in 0..rows {
        match feed.record(index) {
            Some(post) => lines.extend(render_post(index, post, opts)),
            None => lines.push(format!("{:>3}. loading…", index + 1)),
        }
    }
    lines.push(String::new());
    lines.push(status_line(feed));
    lines.join("\n")
}

pub fn status_line(feed: &FeedController<Post>) -> String {
    let count = feed.records().len();
    let mut parts = vec![
        format!("{} post{}", count, if count == 1 { "" } else { "s" }),
        feed.filters().to_string(),
        if feed.has_more() {
            "more available".to_string()
        } else {
            "end of feed".to_string()
        },
    ];
    if feed.is_fetching() {
        parts.push("fetching".to_string());
    }
    parts.join(" | ")
}

fn render_post(index: usize, post: &Post, opts: &RenderOptions) -> Vec<String> {
    let prefix = format!("{:>3}. ", index + 1);
    let title_width = opts.width.saturating_sub(prefix.width());
    let mut lines = vec![format!("{prefix}{}", truncate(&post.title, title_width))];

    let mut meta = vec![post.post_type.label().to_string()];
    meta.extend(post.author_name());
    meta.extend(
        post.created_at
            .as_deref()
            .and_then(|ts| format_age(ts, opts.now)),
    );
    if let Some(likes) = post.likes_count {
        meta.push(format!("{likes} likes"));
    }
    if let Some(comments) = post.comments_count {
        meta.push(format!("{comments} comments"));
    }
    meta.extend(post.categories.iter().map(|c| c.name.clone()));
    lines.push(format!("{INDENT}{}", meta.join(" · ")));

    if opts.excerpt_lines > 0 && !post.description.trim().is_empty() {
        let wrap_width = opts.width.saturating_sub(INDENT.len()).max(10);
        lines.extend(
            textwrap::wrap(post.description.trim(), wrap_width)
                .into_iter()
                .take(opts.excerpt_lines)
                .map(|line| format!("{INDENT}{line}")),
        );
    }
    lines
}

/// "5m ago", "3h ago" or "2d ago" for an RFC 3339 timestamp.
pub fn format_age(created_at: &str, now: DateTime<Utc>) -> Option<String> {
    let then = DateTime::parse_from_rfc3339(created_at).ok()?;
    let diff = now.signed_duration_since(then.with_timezone(&Utc));
    Some(if diff.num_hours() < 1 {
        format!("{}m ago", diff.num_minutes().max(0))
    } else if diff.num_hours() < 24 {
        format!("{}h ago", diff.num_hours())
    } else {
        format!("{}d ago", diff.num_days())
    })
}

/// Cuts `text` to at most `width` display columns, marking the cut with `…`.
fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let budget = width.saturating_sub(1);
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

pub fn render_json(records: &[Post]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}
