//! Conflict-free names for copies
//!
//! `sprite.png` -> `sprite copy.png` -> `sprite copy 1.png` -> `sprite copy 2.png`

use crate::path;

const COPY: &str = "copy";

/// Find the first candidate, starting from `path`, for which `exists` is false
pub fn make_unique_asset_name(path: &str, exists: impl Fn(&str) -> bool) -> String {
    let mut candidate = path.to_string();
    while exists(&candidate) {
        candidate = next_candidate(&candidate);
    }
    candidate
}

/// Next name in the copy sequence
pub fn next_candidate(candidate: &str) -> String {
    let extension = path::extension(candidate);
    let without_extension = path::without_extension(candidate);
    let name_start = without_extension.len() - path::file_name(without_extension).len();

    let with_extension = |stem: String| {
        if extension.is_empty() {
            stem
        } else {
            format!("{}.{}", stem, extension)
        }
    };

    if without_extension[name_start..].ends_with(COPY) {
        let prefix = &without_extension[..without_extension.len() - COPY.len()];
        return with_extension(format!("{}{} 1", prefix, COPY));
    }

    if let Some(pos) = without_extension[name_start..].rfind(COPY) {
        let copy_pos = name_start + pos;
        let counter = without_extension[copy_pos + COPY.len()..]
            .trim_matches(' ')
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .and_then(|n| n.checked_add(1));

        if let Some(next) = counter {
            let prefix = &without_extension[..copy_pos];
            return with_extension(format!("{}{} {}", prefix, COPY, next));
        }
    }

    if extension.is_empty() {
        format!("{} {}", candidate, COPY)
    } else {
        format!("{} {}.{}", without_extension, COPY, extension)
    }
}
