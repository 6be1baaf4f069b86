//! Virtual asset paths
//!
//! Paths are slash-delimited and relative to a content root, e.g.
//! `images/player.png`. They never start or end with a slash.

use std::path::{Path, PathBuf};

use crate::meta::META_EXTENSION;

/// Normalize a user supplied path into virtual form
///
/// `..` steps out of the previous component and never above the content root.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(|c: char| c == '/' || c == '\\') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    parts.join("/")
}

/// Parent folder path, empty for root-level assets
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[..pos],
        None => "",
    }
}

/// Last path component
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Extension of the last component, without the dot
pub fn extension(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(pos) => &name[pos + 1..],
        None => "",
    }
}

/// Full path with the extension of the last component removed
pub fn without_extension(path: &str) -> &str {
    let name_start = path.len() - file_name(path).len();
    match path[name_start..].rfind('.') {
        Some(pos) => &path[..name_start + pos],
        None => path,
    }
}

/// Join a folder and a relative path
pub fn join(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        folder.to_string()
    } else {
        format!("{}/{}", folder, name)
    }
}

/// Sidecar path for an asset path
pub fn meta_path(path: &str) -> String {
    format!("{}.{}", path, META_EXTENSION)
}

/// Check if the path names a sidecar file
pub fn is_meta(path: &str) -> bool {
    extension(path) == META_EXTENSION
}

/// Resolve a virtual path under a filesystem root
pub fn to_fs_path(root: &Path, path: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for part in path.split('/').filter(|p| !matches!(*p, "" | "." | "..")) {
        out.push(part);
    }
    out
}
