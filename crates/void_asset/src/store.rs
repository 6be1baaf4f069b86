//! Asset Store - the entry point of the asset database
//!
//! The store owns the content trees (main first, then the optional editor
//! tree), the type registry, the asset cache and the builder. Lookups search
//! the trees in that order and accept either a path or a UID.
//!
//! Structural operations (remove, copy, move, rename, import) act on the
//! filesystem only. The trees pick the change up on the next rebuild, which
//! callers request per operation or once at the end of a batch. Expected
//! rejections (missing source, occupied destination) are logged and reported
//! as `Ok(false)`; filesystem failures are returned as errors.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crossbeam_channel::Receiver;

use crate::builder::AssetsBuilder;
use crate::cache::{AssetCache, AssetRef};
use crate::config::{AssetsConfig, ContentLayout};
use crate::content::DiskContent;
use crate::error::{AssetError, AssetResult};
use crate::events::{AssetEvent, EventBus};
use crate::loader::{Asset, AssetTypeRegistry, LoadContext, LoadError};
use crate::meta::{self, MetaInfo};
use crate::path;
use crate::tree::{AssetInfo, AssetNode, AssetTree};
use crate::uid::{AssetLocator, Uid};
use crate::unique_name;
#[cfg(feature = "file-watcher")]
use crate::watcher::ContentWatcher;

/// One content root together with its tree
struct ContentTree {
    layout: ContentLayout,
    tree: AssetTree,
}

impl ContentTree {
    fn new(layout: ContentLayout) -> Self {
        let tree = AssetTree::new(&layout.assets);
        Self { layout, tree }
    }

    fn fs_path(&self, asset_path: &str) -> PathBuf {
        path::to_fs_path(&self.layout.assets, asset_path)
    }

    fn meta_fs_path(&self, asset_path: &str) -> PathBuf {
        self.fs_path(&path::meta_path(asset_path))
    }

    /// Payload or sidecar present on disk
    fn is_on_disk(&self, asset_path: &str) -> bool {
        self.fs_path(asset_path).exists() || self.meta_fs_path(asset_path).exists()
    }
}

/// Asset database façade
pub struct AssetStore {
    config: AssetsConfig,
    registry: AssetTypeRegistry,
    trees: Vec<ContentTree>,
    cache: AssetCache,
    builder: AssetsBuilder,
    events: EventBus,
    #[cfg(feature = "file-watcher")]
    watcher: Option<ContentWatcher>,
}

impl AssetStore {
    /// Open the store with the built-in asset types
    pub fn new(config: AssetsConfig) -> AssetResult<Self> {
        Self::with_registry(config, AssetTypeRegistry::with_builtin())
    }

    /// Open the store with a prepared type registry
    ///
    /// With `prebuild` every tree is rescanned and built, otherwise the built
    /// tree snapshots are loaded.
    pub fn with_registry(config: AssetsConfig, registry: AssetTypeRegistry) -> AssetResult<Self> {
        let trees = config.layouts().into_iter().map(ContentTree::new).collect();

        let mut store = Self {
            config,
            registry,
            trees,
            cache: AssetCache::new(),
            builder: AssetsBuilder::new(),
            events: EventBus::new(),
            #[cfg(feature = "file-watcher")]
            watcher: None,
        };

        if store.config.prebuild {
            store.rebuild_assets(false)?;
        } else {
            store.load_assets_tree()?;
        }

        if store.config.watch {
            #[cfg(feature = "file-watcher")]
            store.watch()?;
            #[cfg(not(feature = "file-watcher"))]
            log::warn!("File watching requested but the file-watcher feature is disabled");
        }

        log::info!(
            "Asset store opened at {}: {} assets",
            store.config.project_root.display(),
            store.trees.iter().map(|c| c.tree.len()).sum::<usize>()
        );
        Ok(store)
    }

    /// Load every tree from its built snapshot
    ///
    /// A missing or unreadable snapshot falls back to a full rebuild.
    pub fn load_assets_tree(&mut self) -> AssetResult<()> {
        let mut stale = false;

        for content in &mut self.trees {
            let snapshot = &content.layout.tree_snapshot;
            if !snapshot.is_file() {
                log::warn!("Built asset tree {} is missing", snapshot.display());
                stale = true;
                continue;
            }

            match AssetTree::load_snapshot(snapshot) {
                Ok(tree) => content.tree = tree,
                Err(e) => {
                    log::warn!("Failed to load built asset tree: {}", e);
                    stale = true;
                }
            }
        }

        if stale {
            log::warn!("Rebuilding assets");
            self.rebuild_assets(false)?;
        }
        Ok(())
    }

    /// Rescan and build every tree
    ///
    /// The cache is cleared first; handles held elsewhere keep their objects
    /// alive until dropped. Subscribers get one `Rebuilt` event after all
    /// trees are done.
    pub fn rebuild_assets(&mut self, forcible: bool) -> AssetResult<Vec<Uid>> {
        let retained = self.cache.clear();
        self.events.publish(AssetEvent::CacheCleared { retained });

        let mut changed = BTreeSet::new();
        for content in &mut self.trees {
            let source = DiskContent::new(&content.layout.assets);
            content.tree.rebuild(&source)?;
            changed.extend(self.builder.build_assets(&content.layout, &content.tree, forcible)?);
        }

        let changed: Vec<Uid> = changed.into_iter().collect();
        log::info!("Assets rebuilt, {} changed", changed.len());
        self.events.publish(AssetEvent::Rebuilt {
            changed: changed.clone(),
        });
        Ok(changed)
    }

    fn locate(&self, locator: AssetLocator) -> Option<(usize, &AssetNode)> {
        self.trees
            .iter()
            .enumerate()
            .find_map(|(i, c)| c.tree.find_asset(locator).map(|node| (i, node)))
    }

    fn resolve(&self, locator: AssetLocator) -> AssetResult<(usize, AssetNode)> {
        self.locate(locator)
            .map(|(i, node)| (i, node.clone()))
            .ok_or_else(|| match locator {
                AssetLocator::Path(p) => AssetError::NotFound(p.to_string()),
                AssetLocator::Uid(uid) => AssetError::UidNotFound(uid),
            })
    }

    /// Asset info, first match across trees
    pub fn get_asset_info<'a>(&self, locator: impl Into<AssetLocator<'a>>) -> Option<AssetInfo> {
        self.locate(locator.into()).map(|(_, node)| node.info())
    }

    /// Current path of an asset
    pub fn get_asset_path(&self, uid: Uid) -> Option<String> {
        self.locate(AssetLocator::Uid(uid)).map(|(_, node)| node.path.clone())
    }

    /// UID of the asset at a path
    pub fn get_asset_id(&self, asset_path: &str) -> Option<Uid> {
        self.locate(AssetLocator::Path(asset_path)).map(|(_, node)| node.uid)
    }

    /// Check if an asset is known
    pub fn is_asset_exist<'a>(&self, locator: impl Into<AssetLocator<'a>>) -> bool {
        self.locate(locator.into()).is_some()
    }

    /// Filesystem location of an asset's payload
    pub fn asset_fs_path<'a>(&self, locator: impl Into<AssetLocator<'a>>) -> Option<PathBuf> {
        let (idx, node) = self.locate(locator.into())?;
        Some(self.trees[idx].fs_path(&node.path))
    }

    /// Get a handle to the loaded asset, loading it on first use
    ///
    /// Unknown assets, types without a loader and load failures all yield the
    /// empty handle.
    pub fn get_asset_ref<'a>(&mut self, locator: impl Into<AssetLocator<'a>>) -> AssetRef {
        let locator = locator.into();
        let (idx, node) = match self.locate(locator) {
            Some((idx, node)) => (idx, node.clone()),
            None => {
                log::debug!("Asset {} not found", locator);
                return AssetRef::empty();
            }
        };

        if let Some(handle) = self.cache.find(node.uid) {
            return handle;
        }

        match self.load_object(idx, &node) {
            Ok(asset) => {
                log::debug!("Loaded asset {} ({})", node.path, node.uid);
                self.cache.insert(node.uid, &node.path, asset)
            }
            Err(AssetError::Load(LoadError::UnsupportedType(asset_type))) => {
                log::warn!("No loader for asset type {} ({})", asset_type, node.path);
                AssetRef::empty()
            }
            Err(e) => {
                log::error!("Failed to load asset {}: {}", node.path, e);
                AssetRef::empty()
            }
        }
    }

    /// Read a payload and run the loader of its type
    fn load_object(&self, idx: usize, node: &AssetNode) -> AssetResult<Box<dyn Asset>> {
        let content = &self.trees[idx];
        let data = if node.is_folder() {
            Vec::new()
        } else {
            fs::read(content.fs_path(&node.path)).map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => LoadError::NotFound(node.path.clone()),
                _ => LoadError::IoError(format!("{}: {}", node.path, e)),
            })?
        };
        let children = content.tree.child_infos(node.uid);

        let mut ctx = LoadContext::new(&node.path, &node.meta, &data).with_children(&children);
        Ok(self.registry.load(&node.asset_type, &mut ctx)?)
    }

    /// Check if a path is used by an asset or by anything on disk
    fn is_path_taken(&self, asset_path: &str) -> bool {
        self.trees
            .iter()
            .any(|c| c.tree.find_asset(asset_path).is_some() || c.is_on_disk(asset_path))
    }

    fn check_destination(&self, idx: usize, source: &AssetNode, destination: &str) -> AssetResult<()> {
        if destination.is_empty() || path::is_meta(destination) {
            return Err(AssetError::InvalidTarget(destination.to_string()));
        }
        if self.is_path_taken(destination) {
            return Err(AssetError::Conflict(destination.to_string()));
        }
        if destination.starts_with(&format!("{}/", source.path)) {
            return Err(AssetError::InvalidTarget(format!(
                "{} is inside {}",
                destination, source.path
            )));
        }

        let parent = path::parent(destination);
        let content = &self.trees[idx];
        if !parent.is_empty() && !content.meta_fs_path(parent).is_file() {
            return Err(AssetError::NotFound(parent.to_string()));
        }
        Ok(())
    }

    /// Drop cached objects of an asset and its descendants
    fn evict_subtree(&mut self, idx: usize, uid: Uid) {
        let tree = &self.trees[idx].tree;
        let mut stack = vec![uid];
        while let Some(current) = stack.pop() {
            stack.extend(tree.children_of(current).map(|n| n.uid));
            self.cache.remove(current);
        }
    }

    /// Map expected rejections to `None`, rebuild on success if requested
    fn finish<T>(&mut self, operation: &str, result: AssetResult<T>, rebuild: bool) -> AssetResult<Option<T>> {
        match result {
            Ok(value) => {
                if rebuild {
                    self.rebuild_assets(false)?;
                }
                Ok(Some(value))
            }
            Err(e) if e.is_rejection() => {
                log::error!("Failed to {}: {}", operation, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete an asset (recursively for folders) together with its sidecar
    pub fn remove_asset<'a>(&mut self, locator: impl Into<AssetLocator<'a>>, rebuild: bool) -> AssetResult<bool> {
        let result = self.remove_asset_files(locator.into());
        self.finish("remove asset", result, rebuild).map(|r| r.is_some())
    }

    fn remove_asset_files(&mut self, locator: AssetLocator) -> AssetResult<()> {
        let (idx, node) = self.resolve(locator)?;
        let content = &self.trees[idx];

        let payload = content.fs_path(&node.path);
        let removed = if node.is_folder() {
            fs::remove_dir_all(&payload)
        } else {
            fs::remove_file(&payload)
        };
        removed.map_err(|e| AssetError::io(&payload, e))?;

        let sidecar = content.meta_fs_path(&node.path);
        fs::remove_file(&sidecar).map_err(|e| AssetError::io(&sidecar, e))?;

        self.evict_subtree(idx, node.uid);
        log::info!("Removed asset {}", node.path);
        Ok(())
    }

    /// Copy an asset; every copied asset gets a fresh UID
    pub fn copy_asset<'a>(
        &mut self,
        source: impl Into<AssetLocator<'a>>,
        destination: &str,
        rebuild: bool,
    ) -> AssetResult<bool> {
        let result = self.copy_asset_files(source.into(), destination);
        self.finish("copy asset", result, rebuild).map(|r| r.is_some())
    }

    fn copy_asset_files(&self, locator: AssetLocator, destination: &str) -> AssetResult<()> {
        let (idx, node) = self.resolve(locator)?;
        let destination = path::normalize(destination);
        self.check_destination(idx, &node, &destination)?;

        let content = &self.trees[idx];
        let from = content.fs_path(&node.path);
        let to = content.fs_path(&destination);
        if node.is_folder() {
            copy_folder(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| AssetError::io(&from, e))?;
        }

        let meta = meta::read_meta(&content.meta_fs_path(&node.path))?;
        meta::write_meta(&content.meta_fs_path(&destination), &meta.with_new_id())?;

        log::info!("Copied asset {} to {}", node.path, destination);
        Ok(())
    }

    /// Move an asset; its UID travels with the sidecar
    pub fn move_asset<'a>(
        &mut self,
        source: impl Into<AssetLocator<'a>>,
        destination: &str,
        rebuild: bool,
    ) -> AssetResult<bool> {
        let result = self.move_asset_files(source.into(), destination);
        self.finish("move asset", result, rebuild).map(|r| r.is_some())
    }

    fn move_asset_files(&mut self, locator: AssetLocator, destination: &str) -> AssetResult<()> {
        let (idx, node) = self.resolve(locator)?;
        let destination = path::normalize(destination);
        self.check_destination(idx, &node, &destination)?;

        let content = &self.trees[idx];
        let from = content.fs_path(&node.path);
        fs::rename(&from, content.fs_path(&destination)).map_err(|e| AssetError::io(&from, e))?;

        let meta_from = content.meta_fs_path(&node.path);
        fs::rename(&meta_from, content.meta_fs_path(&destination))
            .map_err(|e| AssetError::io(&meta_from, e))?;

        self.evict_subtree(idx, node.uid);
        log::info!("Moved asset {} to {}", node.path, destination);
        Ok(())
    }

    /// Move several assets, rebuilding at most once
    ///
    /// Every move is attempted. Returns `Ok(false)` if any was rejected and
    /// the first filesystem error if any occurred.
    pub fn move_assets(&mut self, moves: &[(AssetLocator<'_>, &str)], rebuild: bool) -> AssetResult<bool> {
        let mut all_moved = true;
        let mut first_error = None;

        for (locator, destination) in moves {
            match self.move_asset(*locator, destination, false) {
                Ok(true) => {}
                Ok(false) => all_moved = false,
                Err(e) => {
                    log::error!("Failed to move asset {}: {}", locator, e);
                    all_moved = false;
                    first_error.get_or_insert(e);
                }
            }
        }

        if rebuild {
            self.rebuild_assets(false)?;
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(all_moved),
        }
    }

    /// Move several assets into `folder`, each keeping its own name
    pub fn move_assets_to(&mut self, sources: &[AssetLocator<'_>], folder: &str, rebuild: bool) -> AssetResult<bool> {
        let folder = path::normalize(folder);
        // Unknown sources keep an empty destination and are rejected as not found
        let destinations: Vec<String> = sources
            .iter()
            .map(|locator| match self.locate(*locator) {
                Some((_, node)) => path::join(&folder, node.name()),
                None => String::new(),
            })
            .collect();

        let moves: Vec<(AssetLocator<'_>, &str)> = sources
            .iter()
            .copied()
            .zip(destinations.iter().map(String::as_str))
            .collect();
        self.move_assets(&moves, rebuild)
    }

    /// Rename an asset within its folder
    pub fn rename_asset<'a>(
        &mut self,
        source: impl Into<AssetLocator<'a>>,
        new_name: &str,
        rebuild: bool,
    ) -> AssetResult<bool> {
        let locator = source.into();
        let result = self
            .renamed_path(locator, new_name)
            .and_then(|destination| self.move_asset_files(locator, &destination));
        self.finish("rename asset", result, rebuild).map(|r| r.is_some())
    }

    fn renamed_path(&self, locator: AssetLocator, new_name: &str) -> AssetResult<String> {
        if new_name.is_empty() || new_name.contains(|c| c == '/' || c == '\\') {
            return Err(AssetError::InvalidTarget(new_name.to_string()));
        }
        let (_, node) = self.resolve(locator)?;
        Ok(path::join(path::parent(&node.path), new_name))
    }

    /// Write a sidecar for a file or folder of the main tree that lacks one
    ///
    /// The type comes from the extension table. Returns the new UID.
    pub fn import_asset(&mut self, asset_path: &str, rebuild: bool) -> AssetResult<Option<Uid>> {
        let result = self.write_import_meta(asset_path);
        self.finish("import asset", result, rebuild)
    }

    fn write_import_meta(&self, asset_path: &str) -> AssetResult<Uid> {
        let asset_path = path::normalize(asset_path);
        if asset_path.is_empty() || path::is_meta(&asset_path) {
            return Err(AssetError::InvalidTarget(asset_path));
        }
        if self.locate(AssetLocator::Path(&asset_path)).is_some() {
            return Err(AssetError::Conflict(asset_path));
        }

        let content = &self.trees[0];
        let fs_path = content.fs_path(&asset_path);
        if !fs_path.exists() {
            return Err(AssetError::NotFound(asset_path));
        }
        let sidecar = content.meta_fs_path(&asset_path);
        if sidecar.exists() {
            return Err(AssetError::Conflict(asset_path));
        }
        let parent = path::parent(&asset_path);
        if !parent.is_empty() && !content.meta_fs_path(parent).is_file() {
            return Err(AssetError::NotFound(parent.to_string()));
        }

        let asset_type = self.registry.type_for_path(&asset_path, fs_path.is_dir());
        let meta = MetaInfo::new(asset_type);
        meta::write_meta(&sidecar, &meta)?;

        log::info!("Imported {} as {} ({})", asset_path, asset_type, meta.id);
        Ok(meta.id)
    }

    /// First free path in the copy-name sequence starting at `asset_path`
    pub fn make_unique_asset_name(&self, asset_path: &str) -> String {
        unique_name::make_unique_asset_name(&path::normalize(asset_path), |p| self.is_path_taken(p))
    }

    /// Register for store events
    pub fn subscribe(&mut self) -> Receiver<AssetEvent> {
        self.events.subscribe()
    }

    /// Start watching the content roots
    #[cfg(feature = "file-watcher")]
    pub fn watch(&mut self) -> AssetResult<()> {
        if self.watcher.is_some() {
            return Ok(());
        }
        let mut watcher = ContentWatcher::new()?;
        for content in &self.trees {
            watcher.watch(&content.layout.assets)?;
        }
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Check if the content roots are watched
    #[cfg(feature = "file-watcher")]
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Poll the watcher; any change triggers one rebuild
    #[cfg(feature = "file-watcher")]
    pub fn update(&mut self) -> AssetResult<Option<Vec<Uid>>> {
        let changes = match self.watcher.as_mut() {
            Some(watcher) => watcher.poll(),
            None => return Ok(None),
        };
        if changes.is_empty() {
            return Ok(None);
        }

        log::info!("{} content changes detected, rebuilding", changes.len());
        self.rebuild_assets(false).map(Some)
    }

    /// All trees, main first
    pub fn trees(&self) -> impl Iterator<Item = &AssetTree> {
        self.trees.iter().map(|c| &c.tree)
    }

    /// Main content tree
    pub fn main_tree(&self) -> &AssetTree {
        &self.trees[0].tree
    }

    /// Editor content tree, if configured
    pub fn editor_tree(&self) -> Option<&AssetTree> {
        self.trees.get(1).map(|c| &c.tree)
    }

    /// Type registry
    pub fn registry(&self) -> &AssetTypeRegistry {
        &self.registry
    }

    /// Asset cache
    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Builder, for registering converters
    pub fn builder_mut(&mut self) -> &mut AssetsBuilder {
        &mut self.builder
    }

    /// Configuration the store was opened with
    pub fn config(&self) -> &AssetsConfig {
        &self.config
    }
}

/// Copy a folder recursively, giving every copied sidecar a fresh UID
fn copy_folder(from: &Path, to: &Path) -> AssetResult<()> {
    fs::create_dir_all(to).map_err(|e| AssetError::io(to, e))?;

    let entries = fs::read_dir(from).map_err(|e| AssetError::io(from, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| AssetError::io(from, e))?;
        let source = entry.path();
        let target = to.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| AssetError::io(&source, e))?;

        if file_type.is_dir() {
            copy_folder(&source, &target)?;
        } else if path::is_meta(&entry.file_name().to_string_lossy()) {
            match meta::read_meta(&source) {
                Ok(meta) => meta::write_meta(&target, &meta.with_new_id())?,
                Err(e) => {
                    log::warn!("Copying unreadable sidecar verbatim: {}", e);
                    fs::copy(&source, &target).map_err(|e| AssetError::io(&source, e))?;
                }
            }
        } else {
            fs::copy(&source, &target).map_err(|e| AssetError::io(&source, e))?;
        }
    }
    Ok(())
}
