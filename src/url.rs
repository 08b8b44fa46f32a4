use std::{
    borrow::Cow,
    path::{Component, Path, PathBuf},
};

pub(crate) fn best_effort_decode(s: &str) -> Cow<'_, str> {
    percent_encoding::percent_decode_str(s)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(s))
}

/// Whether a link target points outside the book, e.g. `https://example.com/page.md`.
pub(crate) fn is_remote(target: &str) -> bool {
    match target.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => target.starts_with("mailto:"),
    }
}

/// Lexically resolves `.` and `..` components without touching the filesystem,
/// so that sources which do not exist can still be compared with each other.
pub(crate) fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(component),
            },
            component => normalized.push(component),
        }
    }
    normalized
}
