//! Rewrites ATX heading levels so that each fragment contributes a single
//! entry to the combined document's outline.

use std::{borrow::Cow, cmp};

use once_cell::sync::Lazy;
use regex::Regex;

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#+)\s+(.*)$").unwrap());

/// The deepest level a heading may have after promotion.
pub const MAX_TOP_LEVEL: usize = 3;

/// Level of a heading that follows the first one in a fragment whose first
/// heading was promoted to `top`.
///
/// Demoted headings always sit strictly below `top`, which keeps them out of
/// a table of contents cut off at the fragment's own depth.
pub fn demote(level: usize, top: usize) -> usize {
    cmp::max(level + 1, top + 1)
}

/// Promotes the first heading in `text` to `top` and demotes every later one
/// with [`demote`]. Lines that are not headings are left untouched.
pub fn normalize(text: &str, top: usize) -> Cow<'_, str> {
    debug_assert!((1..=MAX_TOP_LEVEL).contains(&top));

    if !text.split('\n').any(|line| HEADING.is_match(line)) {
        return Cow::Borrowed(text);
    }

    let mut first = true;
    let lines = text.split('\n').map(|line| {
        let Some(caps) = HEADING.captures(line) else {
            return Cow::Borrowed(line);
        };
        let level = if first {
            first = false;
            top
        } else {
            demote(caps[1].len(), top)
        };
        Cow::Owned(format!("{} {}", "#".repeat(level), &caps[2]))
    });
    Cow::Owned(lines.collect::<Vec<_>>().join("\n"))
}

/// Body used in place of a fragment whose source does not exist.
pub fn stub(title: &str, level: usize) -> String {
    format!("{} {title}\n\n", "#".repeat(level))
}
