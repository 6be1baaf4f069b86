//! Assets Builder - incremental build of one content tree
//!
//! The builder diffs the current tree against the snapshot saved by the
//! previous build and dispatches every difference to a converter:
//! - removed (UID gone) => `remove`
//! - moved (same UID, new path) => `move_asset`, or `convert` when the old
//!   or new path is shared with another asset
//! - modified (timestamp or sidecar changed) => `convert`
//! - new (UID not in the snapshot) => `convert`
//!
//! The current tree then becomes the new snapshot.

use std::collections::BTreeSet;
use std::fs;
use std::io;

use crate::config::ContentLayout;
use crate::converter::{AssetConverter, ConvertContext, FolderAssetConverter, StdAssetConverter};
use crate::error::{AssetError, AssetResult};
use crate::tree::{AssetNode, AssetTree};
use crate::uid::Uid;

/// Dispatches tree differences to converters
pub struct AssetsBuilder {
    converters: Vec<Box<dyn AssetConverter>>,
    std_converter: StdAssetConverter,
}

impl Default for AssetsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetsBuilder {
    /// Create a builder with the folder converter registered
    pub fn new() -> Self {
        Self {
            converters: vec![Box::new(FolderAssetConverter::default())],
            std_converter: StdAssetConverter,
        }
    }

    /// Register a converter; earlier registrations win for shared types
    pub fn register_converter(&mut self, converter: Box<dyn AssetConverter>) {
        self.converters.push(converter);
    }

    fn converter_for(&mut self, asset_type: &str) -> &mut dyn AssetConverter {
        let index = self
            .converters
            .iter()
            .position(|c| c.processing_types().contains(&asset_type));

        match index {
            Some(i) => self.converters[i].as_mut(),
            None => &mut self.std_converter,
        }
    }

    fn dispatch(
        &mut self,
        what: &str,
        node: &AssetNode,
        action: impl FnOnce(&mut dyn AssetConverter) -> AssetResult<()>,
    ) {
        let converter = self.converter_for(&node.asset_type);
        if let Err(e) = action(converter) {
            log::error!("Failed to {} asset {}: {}", what, node.path, e);
        }
    }

    /// Build a tree into its layout, returning the UIDs whose artifacts changed
    ///
    /// `forcible` discards the previous build and converts everything.
    pub fn build_assets(
        &mut self,
        layout: &ContentLayout,
        tree: &AssetTree,
        forcible: bool,
    ) -> AssetResult<Vec<Uid>> {
        self.std_converter.reset();
        for converter in &mut self.converters {
            converter.reset();
        }

        if forcible {
            log::info!("Forcible build, wiping {}", layout.built.display());
            remove_if_exists(fs::remove_dir_all(&layout.built), &layout.built)?;
            remove_if_exists(fs::remove_file(&layout.tree_snapshot), &layout.tree_snapshot)?;
        }

        let previous = if layout.tree_snapshot.is_file() {
            match AssetTree::load_snapshot(&layout.tree_snapshot) {
                Ok(tree) => tree,
                Err(e) => {
                    log::warn!("Discarding unreadable built tree: {}", e);
                    AssetTree::default()
                }
            }
        } else {
            AssetTree::default()
        };

        let ctx = ConvertContext {
            source_root: &layout.assets,
            built_root: &layout.built,
        };
        let mut changed = BTreeSet::new();

        // Removed; a path taken over by another asset is rebuilt by its new owner
        for old in previous.iter() {
            if tree.find_asset(old.uid).is_none() {
                if tree.find_asset(old.path.as_str()).is_none() {
                    self.dispatch("remove", old, |c| c.remove(old, &ctx));
                }
                changed.insert(old.uid);
            }
        }

        // Parents before children, so folder moves land before their contents
        let mut stack: Vec<&AssetNode> = tree.roots().collect();
        stack.reverse();
        while let Some(node) = stack.pop() {
            let mut children: Vec<&AssetNode> = tree.children_of(node.uid).collect();
            children.reverse();
            stack.extend(children);

            match previous.find_asset(node.uid) {
                Some(old) if old.path != node.path => {
                    let source_reused = tree.find_asset(old.path.as_str()).is_some();
                    let target_built = previous.find_asset(node.path.as_str()).is_some();
                    if source_reused || target_built {
                        // Artifacts trade places, renaming would clobber one of them
                        self.dispatch("convert", node, |c| c.convert(node, &ctx));
                        if !source_reused {
                            self.dispatch("remove", old, |c| c.remove(old, &ctx));
                        }
                    } else {
                        self.dispatch("move", node, |c| c.move_asset(old, node, &ctx));
                    }
                    changed.insert(node.uid);
                }
                Some(old) if old.modified_ms != node.modified_ms || old.meta != node.meta => {
                    self.dispatch("convert", node, |c| c.convert(node, &ctx));
                    changed.insert(node.uid);
                }
                Some(_) => {}
                None => {
                    self.dispatch("convert", node, |c| c.convert(node, &ctx));
                    changed.insert(node.uid);
                }
            }
        }

        changed.extend(self.std_converter.post_process(&ctx)?);
        for converter in &mut self.converters {
            changed.extend(converter.post_process(&ctx)?);
        }

        tree.save_snapshot(&layout.tree_snapshot)?;

        if !changed.is_empty() {
            log::info!(
                "Built {} changed assets from {}",
                changed.len(),
                layout.assets.display()
            );
        }
        Ok(changed.into_iter().collect())
    }
}

fn remove_if_exists(result: io::Result<()>, path: &std::path::Path) -> AssetResult<()> {
    match result {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(AssetError::io(path, e)),
        _ => Ok(()),
    }
}
