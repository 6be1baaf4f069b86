//! Asset converters
//!
//! A converter turns a source asset into its built artifact. The builder
//! dispatches every new, modified, moved and removed node to the converter
//! that claims its type, falling back to [`StdAssetConverter`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{AssetError, AssetResult};
use crate::loaders::FOLDER_TYPE;
use crate::path;
use crate::tree::AssetNode;
use crate::uid::Uid;

/// Roots a conversion reads from and writes to
#[derive(Clone, Copy, Debug)]
pub struct ConvertContext<'a> {
    /// Source content root
    pub source_root: &'a Path,
    /// Built content root
    pub built_root: &'a Path,
}

impl ConvertContext<'_> {
    /// Source file of a node
    pub fn source_path(&self, node: &AssetNode) -> PathBuf {
        path::to_fs_path(self.source_root, &node.path)
    }

    /// Built artifact of a node
    pub fn built_path(&self, node: &AssetNode) -> PathBuf {
        path::to_fs_path(self.built_root, &node.path)
    }
}

/// Per-type build step
pub trait AssetConverter {
    /// Asset types this converter handles
    fn processing_types(&self) -> &[&str];

    /// Build (or rebuild) the artifact of a node
    fn convert(&mut self, node: &AssetNode, ctx: &ConvertContext) -> AssetResult<()>;

    /// Remove the artifact of a node that no longer exists
    fn remove(&mut self, node: &AssetNode, ctx: &ConvertContext) -> AssetResult<()>;

    /// Relocate the artifact of a moved node
    fn move_asset(&mut self, from: &AssetNode, to: &AssetNode, ctx: &ConvertContext) -> AssetResult<()>;

    /// Runs after all nodes were dispatched; returns extra changed UIDs
    fn post_process(&mut self, _ctx: &ConvertContext) -> AssetResult<Vec<Uid>> {
        Ok(Vec::new())
    }

    /// Drop state left from a previous build
    fn reset(&mut self) {}
}

fn ensure_parent(path: &Path) -> AssetResult<()> {
    match path.parent() {
        Some(dir) => fs::create_dir_all(dir).map_err(|e| AssetError::io(dir, e)),
        None => Ok(()),
    }
}

fn ignore_not_found(result: io::Result<()>, path: &Path) -> AssetResult<()> {
    match result {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(AssetError::io(path, e)),
        _ => Ok(()),
    }
}

/// Default converter: copies the payload into the built root
#[derive(Default)]
pub struct StdAssetConverter;

impl AssetConverter for StdAssetConverter {
    fn processing_types(&self) -> &[&str] {
        &[]
    }

    fn convert(&mut self, node: &AssetNode, ctx: &ConvertContext) -> AssetResult<()> {
        let src = ctx.source_path(node);
        let dst = ctx.built_path(node);
        ensure_parent(&dst)?;
        fs::copy(&src, &dst).map_err(|e| AssetError::io(&src, e))?;
        Ok(())
    }

    fn remove(&mut self, node: &AssetNode, ctx: &ConvertContext) -> AssetResult<()> {
        let built = ctx.built_path(node);
        ignore_not_found(fs::remove_file(&built), &built)
    }

    fn move_asset(&mut self, from: &AssetNode, to: &AssetNode, ctx: &ConvertContext) -> AssetResult<()> {
        let old = ctx.built_path(from);
        if !old.is_file() {
            return self.convert(to, ctx);
        }
        let new = ctx.built_path(to);
        ensure_parent(&new)?;
        fs::rename(&old, &new).map_err(|e| AssetError::io(&old, e))
    }
}

/// Mirrors folders into the built root
///
/// Removals are deferred to post-processing so that files inside a removed
/// folder are handled by their own converters first.
#[derive(Default)]
pub struct FolderAssetConverter {
    removed_folders: Vec<String>,
}

impl AssetConverter for FolderAssetConverter {
    fn processing_types(&self) -> &[&str] {
        &[FOLDER_TYPE]
    }

    fn convert(&mut self, node: &AssetNode, ctx: &ConvertContext) -> AssetResult<()> {
        let built = ctx.built_path(node);
        fs::create_dir_all(&built).map_err(|e| AssetError::io(&built, e))
    }

    fn remove(&mut self, node: &AssetNode, _ctx: &ConvertContext) -> AssetResult<()> {
        self.removed_folders.push(node.path.clone());
        Ok(())
    }

    fn move_asset(&mut self, from: &AssetNode, to: &AssetNode, ctx: &ConvertContext) -> AssetResult<()> {
        let old = ctx.built_path(from);
        let new = ctx.built_path(to);
        if old.is_dir() && !new.exists() {
            ensure_parent(&new)?;
            fs::rename(&old, &new).map_err(|e| AssetError::io(&old, e))
        } else {
            fs::create_dir_all(&new).map_err(|e| AssetError::io(&new, e))
        }
    }

    fn post_process(&mut self, ctx: &ConvertContext) -> AssetResult<Vec<Uid>> {
        // Deepest first
        self.removed_folders
            .sort_by_key(|p| std::cmp::Reverse(p.matches('/').count()));

        for folder in self.removed_folders.drain(..) {
            let built = path::to_fs_path(ctx.built_root, &folder);
            ignore_not_found(fs::remove_dir_all(&built), &built)?;
        }
        Ok(Vec::new())
    }

    fn reset(&mut self) {
        self.removed_folders.clear();
    }
}
