//! Content sources
//!
//! Tree reconciliation never touches the filesystem directly. It works on a
//! [`FolderInfo`] snapshot and reads sidecars through a [`MetaSource`], so it
//! can run against an in-memory layout in tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::{AssetError, AssetResult};
use crate::meta::{self, MetaInfo};
use crate::path;

/// A file seen during a scan
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    /// Virtual path
    pub path: String,
    /// Last modification, milliseconds since the unix epoch
    pub modified_ms: u64,
}

/// A folder seen during a scan
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FolderInfo {
    /// Virtual path, empty for the content root
    pub path: String,
    /// Subfolders
    pub folders: Vec<FolderInfo>,
    /// Files, including sidecars
    pub files: Vec<FileInfo>,
}

impl FolderInfo {
    /// Create an empty folder
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            folders: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Find a direct file by path
    pub fn file(&self, path: &str) -> Option<&FileInfo> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Check for a direct subfolder by path
    pub fn has_folder(&self, path: &str) -> bool {
        self.folders.iter().any(|f| f.path == path)
    }

    /// Check if the sidecar of a direct child exists
    pub fn has_meta_for(&self, path: &str) -> bool {
        self.file(&path::meta_path(path)).is_some()
    }

    /// Total number of files in the subtree
    pub fn file_count(&self) -> usize {
        self.files.len() + self.folders.iter().map(|f| f.file_count()).sum::<usize>()
    }
}

/// Reads sidecar metadata for a virtual path
pub trait MetaSource {
    /// Read the sidecar of the asset at `path`
    fn read_meta(&self, path: &str) -> AssetResult<MetaInfo>;
}

/// A content root that can be scanned
pub trait ContentSource: MetaSource {
    /// Scan the whole content root
    fn scan(&self) -> AssetResult<FolderInfo>;
}

/// Content on the local filesystem
#[derive(Clone, Debug)]
pub struct DiskContent {
    root: PathBuf,
}

impl DiskContent {
    /// Create a source for a content root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Content root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scan_folder(&self, virtual_path: &str, fs_path: &Path) -> AssetResult<FolderInfo> {
        let mut folder = FolderInfo::new(virtual_path);

        let mut entries = fs::read_dir(fs_path)
            .map_err(|e| AssetError::io(fs_path, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AssetError::io(fs_path, e))?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let name = entry.file_name().to_string_lossy().to_string();
            let child_path = path::join(virtual_path, &name);
            let file_type = entry.file_type().map_err(|e| AssetError::io(entry.path(), e))?;

            if file_type.is_dir() {
                match self.scan_folder(&child_path, &entry.path()) {
                    Ok(sub) => folder.folders.push(sub),
                    Err(e) => log::error!("Failed to scan folder {}: {}", child_path, e),
                }
            } else if file_type.is_file() {
                let modified_ms = entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0);

                folder.files.push(FileInfo {
                    path: child_path,
                    modified_ms,
                });
            }
        }

        Ok(folder)
    }
}

impl MetaSource for DiskContent {
    fn read_meta(&self, asset_path: &str) -> AssetResult<MetaInfo> {
        meta::read_meta(&path::to_fs_path(&self.root, &path::meta_path(asset_path)))
    }
}

impl ContentSource for DiskContent {
    fn scan(&self) -> AssetResult<FolderInfo> {
        if !self.root.is_dir() {
            log::debug!("Content root {:?} does not exist, scanning as empty", self.root);
            return Ok(FolderInfo::default());
        }
        self.scan_folder("", &self.root)
    }
}
