//! Asset Tree - hierarchical index of one content root
//!
//! The tree mirrors a directory subtree. Only files and folders that have a
//! sidecar are represented. [`AssetTree::rebuild`] reconciles the tree with a
//! fresh scan of the content root:
//! - nodes whose payload or sidecar disappeared are removed (folders cascade)
//! - files with a sidecar that are not yet represented are added
//! - folders with a sidecar are added and recursed into; folders without one
//!   are reported and skipped together with their contents
//!
//! The diff is path based and runs in three passes over the whole tree:
//! prune, refresh, add. Refreshing re-reads the sidecar of every surviving
//! node; a node whose sidecar now names another UID is detached before any
//! node is added, so identities swapped on disk resolve to their new paths.
//! Timestamps and sidecars kept on the nodes are what the builder compares
//! against the previous build.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::content::{ContentSource, FolderInfo, MetaSource};
use crate::error::{AssetError, AssetResult};
use crate::loaders::FOLDER_TYPE;
use crate::meta::MetaInfo;
use crate::path;
use crate::uid::{AssetLocator, Uid};

/// Public description of an asset
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Virtual path at the time of the lookup
    pub path: String,
    /// Stable identifier
    pub uid: Uid,
    /// Asset type discriminator
    pub asset_type: String,
    /// Sidecar metadata
    pub meta: MetaInfo,
}

impl AssetInfo {
    /// Check if this is a folder
    pub fn is_folder(&self) -> bool {
        self.asset_type == FOLDER_TYPE
    }
}

impl PartialEq for AssetInfo {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid
    }
}

impl Eq for AssetInfo {}

/// A node of the asset tree
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetNode {
    /// Virtual path, always parent path + own name
    pub path: String,
    /// Stable identifier
    pub uid: Uid,
    /// Asset type discriminator
    pub asset_type: String,
    /// Sidecar metadata
    pub meta: MetaInfo,
    /// Newest of payload and sidecar modification times, milliseconds
    pub modified_ms: u64,
    /// Back reference to the parent folder
    pub parent: Option<Uid>,
    /// Owned children (folders only)
    pub children: Vec<Uid>,
}

impl AssetNode {
    /// Create a detached node from sidecar metadata
    pub fn new(path: impl Into<String>, meta: MetaInfo, modified_ms: u64) -> Self {
        Self {
            path: path.into(),
            uid: meta.id,
            asset_type: meta.asset_type.clone(),
            meta,
            modified_ms,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Check if this is a folder node
    pub fn is_folder(&self) -> bool {
        self.asset_type == FOLDER_TYPE
    }

    /// Own name
    pub fn name(&self) -> &str {
        path::file_name(&self.path)
    }

    /// Public info for this node
    pub fn info(&self) -> AssetInfo {
        AssetInfo {
            path: self.path.clone(),
            uid: self.uid,
            asset_type: self.asset_type.clone(),
            meta: self.meta.clone(),
        }
    }
}

/// Structural changes produced by a rebuild
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeChanges {
    /// Nodes created
    pub added: Vec<Uid>,
    /// Nodes destroyed
    pub removed: Vec<Uid>,
}

impl TreeChanges {
    /// Check if nothing changed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Number of changed nodes
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }
}

/// Serialized form of a tree (the built tree snapshot)
#[derive(Clone, Serialize, Deserialize)]
struct TreeSnapshot {
    root_path: PathBuf,
    roots: Vec<Uid>,
    nodes: Vec<AssetNode>,
}

/// Hierarchical index of one content root
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "TreeSnapshot", into = "TreeSnapshot")]
pub struct AssetTree {
    /// Filesystem root the virtual paths are relative to
    root_path: PathBuf,
    /// Root-level nodes
    roots: Vec<Uid>,
    /// All nodes by UID
    nodes: BTreeMap<Uid, AssetNode>,
    /// Path to UID index
    by_path: HashMap<String, Uid>,
}

impl From<TreeSnapshot> for AssetTree {
    fn from(snapshot: TreeSnapshot) -> Self {
        let mut tree = Self {
            root_path: snapshot.root_path,
            roots: snapshot.roots,
            nodes: snapshot.nodes.into_iter().map(|n| (n.uid, n)).collect(),
            by_path: HashMap::new(),
        };
        tree.reindex();
        tree
    }
}

impl From<AssetTree> for TreeSnapshot {
    fn from(tree: AssetTree) -> Self {
        let mut nodes = Vec::with_capacity(tree.nodes.len());
        let mut stack: Vec<Uid> = tree.roots.iter().rev().copied().collect();
        while let Some(uid) = stack.pop() {
            if let Some(node) = tree.nodes.get(&uid) {
                stack.extend(node.children.iter().rev().copied());
                nodes.push(node.clone());
            }
        }

        Self {
            root_path: tree.root_path,
            roots: tree.roots,
            nodes,
        }
    }
}

impl AssetTree {
    /// Create an empty tree for a content root
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            ..Default::default()
        }
    }

    /// Content root
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Clear state and perform a full scan
    pub fn build_tree<S: ContentSource>(
        &mut self,
        root_path: impl Into<PathBuf>,
        source: &S,
    ) -> AssetResult<TreeChanges> {
        self.root_path = root_path.into();
        self.clear();
        self.rebuild(source)
    }

    /// Rescan the content root and reconcile
    pub fn rebuild<S: ContentSource>(&mut self, source: &S) -> AssetResult<TreeChanges> {
        let snapshot = source.scan()?;
        Ok(self.rebuild_from(&snapshot, source))
    }

    /// Reconcile against an already taken snapshot
    pub fn rebuild_from(&mut self, snapshot: &FolderInfo, metas: &dyn MetaSource) -> TreeChanges {
        let mut changes = TreeChanges::default();
        // Prune and refresh everything first so a moved asset's UID is free at its new path
        self.prune_folder(snapshot, None, &mut changes);
        self.refresh_folder(snapshot, None, metas, &mut changes);
        self.load_folder(snapshot, None, metas, &mut changes);

        log::debug!(
            "Asset tree {:?} rebuilt: {} nodes, {} added, {} removed",
            self.root_path,
            self.nodes.len(),
            changes.added.len(),
            changes.removed.len()
        );
        changes
    }

    /// Drop nodes whose payload or sidecar is gone
    fn prune_folder(&mut self, folder: &FolderInfo, parent: Option<Uid>, changes: &mut TreeChanges) {
        let missing: Vec<Uid> = self
            .child_ids(parent)
            .iter()
            .filter_map(|uid| self.nodes.get(uid))
            .filter(|node| {
                let exists = if node.is_folder() {
                    folder.has_folder(&node.path)
                } else {
                    folder.file(&node.path).is_some()
                };
                !(exists && folder.has_meta_for(&node.path))
            })
            .map(|node| node.uid)
            .collect();

        for uid in missing {
            changes
                .removed
                .extend(self.remove_asset(uid).into_iter().map(|n| n.uid));
        }

        for sub in &folder.folders {
            let existing = self
                .by_path
                .get(&sub.path)
                .copied()
                .filter(|uid| self.nodes.get(uid).map(|n| n.is_folder()).unwrap_or(false));
            if let Some(uid) = existing {
                self.prune_folder(sub, Some(uid), changes);
            }
        }
    }

    /// Re-read the sidecars of surviving nodes
    fn refresh_folder(
        &mut self,
        folder: &FolderInfo,
        parent: Option<Uid>,
        metas: &dyn MetaSource,
        changes: &mut TreeChanges,
    ) {
        for uid in self.child_ids(parent) {
            let (node_path, is_folder) = match self.nodes.get(&uid) {
                Some(node) => (node.path.clone(), node.is_folder()),
                None => continue,
            };

            let meta = match metas.read_meta(&node_path) {
                Ok(meta) => meta,
                Err(e) => {
                    log::error!("Failed to reload asset info for {}: {}", node_path, e);
                    continue;
                }
            };

            if meta.id != uid {
                log::info!("Sidecar of {} now names {}, detaching {}", node_path, meta.id, uid);
                changes
                    .removed
                    .extend(self.remove_asset(uid).into_iter().map(|n| n.uid));
                continue;
            }

            let modified_ms = entry_modified(folder, &node_path, is_folder);
            if let Some(node) = self.nodes.get_mut(&uid) {
                node.modified_ms = modified_ms;
                if !is_folder {
                    node.asset_type = meta.asset_type.clone();
                }
                node.meta = meta;
            }

            if is_folder {
                if let Some(sub) = folder.folders.iter().find(|f| f.path == node_path) {
                    self.refresh_folder(sub, Some(uid), metas, changes);
                }
            }
        }
    }

    /// Add nodes for imported entries not yet in the tree
    fn load_folder(
        &mut self,
        folder: &FolderInfo,
        parent: Option<Uid>,
        metas: &dyn MetaSource,
        changes: &mut TreeChanges,
    ) {
        for file in &folder.files {
            if path::is_meta(&file.path) {
                continue;
            }

            // Not imported yet, or already refreshed
            if !folder.has_meta_for(&file.path) || self.by_path.contains_key(&file.path) {
                continue;
            }

            let meta = match metas.read_meta(&file.path) {
                Ok(meta) => meta,
                Err(e) => {
                    log::error!("Failed to load asset info for {}: {}", file.path, e);
                    continue;
                }
            };

            let modified_ms = entry_modified(folder, &file.path, false);
            let node = AssetNode::new(file.path.clone(), meta, modified_ms);
            if let Some(uid) = self.insert_node(node, parent) {
                changes.added.push(uid);
            }
        }

        for sub in &folder.folders {
            let existing = self
                .by_path
                .get(&sub.path)
                .copied()
                .filter(|uid| self.nodes.get(uid).map(|n| n.is_folder()).unwrap_or(false));

            let uid = match existing {
                Some(uid) => uid,
                None => {
                    if !folder.has_meta_for(&sub.path) {
                        log::warn!("Can't load asset info for {} - missing meta file", sub.path);
                        continue;
                    }

                    let meta = match metas.read_meta(&sub.path) {
                        Ok(meta) => meta,
                        Err(e) => {
                            log::error!("Failed to load folder info for {}: {}", sub.path, e);
                            continue;
                        }
                    };

                    let modified_ms = entry_modified(folder, &sub.path, true);
                    let mut node = AssetNode::new(sub.path.clone(), meta, modified_ms);
                    if !node.is_folder() {
                        log::warn!(
                            "Folder {} has meta of type {}, treating as folder",
                            sub.path,
                            node.asset_type
                        );
                        node.asset_type = FOLDER_TYPE.to_string();
                    }

                    match self.insert_node(node, parent) {
                        Some(uid) => {
                            changes.added.push(uid);
                            uid
                        }
                        None => continue,
                    }
                }
            };

            self.load_folder(sub, Some(uid), metas, changes);
        }
    }

    fn child_ids(&self, parent: Option<Uid>) -> Vec<Uid> {
        match parent {
            Some(uid) => self
                .nodes
                .get(&uid)
                .map(|n| n.children.clone())
                .unwrap_or_default(),
            None => self.roots.clone(),
        }
    }

    /// Attach a node under `parent`, rejecting duplicate UIDs and paths
    fn insert_node(&mut self, mut node: AssetNode, parent: Option<Uid>) -> Option<Uid> {
        if let Some(existing) = self.nodes.get(&node.uid) {
            log::warn!(
                "Duplicate asset UID {} at {} (already used by {}), skipping",
                node.uid,
                node.path,
                existing.path
            );
            return None;
        }
        if self.by_path.contains_key(&node.path) {
            log::warn!("Asset path {} is already indexed, skipping", node.path);
            return None;
        }

        let uid = node.uid;
        node.parent = parent;

        match parent {
            Some(parent_uid) => match self.nodes.get_mut(&parent_uid) {
                Some(parent_node) => parent_node.children.push(uid),
                None => return None,
            },
            None => self.roots.push(uid),
        }

        self.by_path.insert(node.path.clone(), uid);
        self.nodes.insert(uid, node);
        Some(uid)
    }

    /// Add a node, attaching it to the folder its path points into
    ///
    /// Returns false if the parent folder is not in the tree or the UID/path is
    /// already taken.
    pub fn add_asset(&mut self, node: AssetNode) -> bool {
        let parent_path = path::parent(&node.path);
        let parent = if parent_path.is_empty() {
            None
        } else {
            match self.by_path.get(parent_path) {
                Some(uid) => Some(*uid),
                None => {
                    log::error!("Failed to add asset info: {} - parent folder is missing", node.path);
                    return false;
                }
            }
        };
        self.insert_node(node, parent).is_some()
    }

    /// Remove a node and, for folders, every descendant
    ///
    /// The removed nodes are handed back to the caller; dropping them releases
    /// them.
    pub fn remove_asset(&mut self, uid: Uid) -> Vec<AssetNode> {
        let parent = match self.nodes.get(&uid) {
            Some(node) => node.parent,
            None => return Vec::new(),
        };

        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(parent_node) => parent_node.children.retain(|c| *c != uid),
            None => self.roots.retain(|r| *r != uid),
        }

        let mut removed = Vec::new();
        let mut stack = vec![uid];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                self.by_path.remove(&node.path);
                stack.extend(node.children.iter().copied());
                removed.push(node);
            }
        }
        removed
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.roots.clear();
        self.nodes.clear();
        self.by_path.clear();
    }

    /// Find a node by path or UID
    pub fn find_asset<'a>(&self, locator: impl Into<AssetLocator<'a>>) -> Option<&AssetNode> {
        match locator.into() {
            AssetLocator::Path(p) => {
                let uid = self.by_path.get(path::normalize(p).as_str())?;
                self.nodes.get(uid)
            }
            AssetLocator::Uid(uid) => self.nodes.get(&uid),
        }
    }

    /// Find asset info by path or UID
    pub fn find_asset_info<'a>(&self, locator: impl Into<AssetLocator<'a>>) -> Option<AssetInfo> {
        self.find_asset(locator).map(AssetNode::info)
    }

    /// Root-level nodes
    pub fn roots(&self) -> impl Iterator<Item = &AssetNode> {
        self.roots.iter().filter_map(move |uid| self.nodes.get(uid))
    }

    /// Direct children of a node
    pub fn children_of(&self, uid: Uid) -> impl Iterator<Item = &AssetNode> {
        self.nodes
            .get(&uid)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |c| self.nodes.get(c))
    }

    /// Infos of the direct children of a node
    pub fn child_infos(&self, uid: Uid) -> Vec<AssetInfo> {
        self.children_of(uid).map(AssetNode::info).collect()
    }

    /// All nodes, in UID order
    pub fn iter(&self) -> impl Iterator<Item = &AssetNode> {
        self.nodes.values()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check that the flat index matches the nodes reachable from the roots
    pub fn is_consistent(&self) -> bool {
        let mut reachable = 0;
        let mut stack: Vec<(Option<Uid>, Uid)> = self.roots.iter().map(|r| (None, *r)).collect();
        while let Some((parent, uid)) = stack.pop() {
            let node = match self.nodes.get(&uid) {
                Some(node) => node,
                None => return false,
            };
            if node.parent != parent || self.by_path.get(&node.path) != Some(&uid) {
                return false;
            }
            if let Some(parent_node) = parent.and_then(|p| self.nodes.get(&p)) {
                if node.path != path::join(&parent_node.path, node.name()) {
                    return false;
                }
            }
            if !node.is_folder() && !node.children.is_empty() {
                return false;
            }
            reachable += 1;
            stack.extend(node.children.iter().map(|c| (Some(uid), *c)));
        }
        reachable == self.nodes.len() && self.by_path.len() == self.nodes.len()
    }

    fn reindex(&mut self) {
        self.by_path = self
            .nodes
            .values()
            .map(|n| (n.path.clone(), n.uid))
            .collect();
    }

    /// Load a built tree snapshot
    pub fn load_snapshot(path: &Path) -> AssetResult<Self> {
        let data = fs::read(path).map_err(|e| AssetError::io(path, e))?;
        serde_json::from_slice(&data).map_err(|e| AssetError::Snapshot {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Save a built tree snapshot
    pub fn save_snapshot(&self, path: &Path) -> AssetResult<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| AssetError::io(dir, e))?;
        }
        let data = serde_json::to_vec_pretty(self).map_err(|e| AssetError::Snapshot {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, data).map_err(|e| AssetError::io(path, e))
    }
}

/// Newest modification time of an entry of `folder`; folders only count their sidecar
fn entry_modified(folder: &FolderInfo, asset_path: &str, is_folder: bool) -> u64 {
    let meta_ms = folder
        .file(&path::meta_path(asset_path))
        .map_or(0, |f| f.modified_ms);
    if is_folder {
        return meta_ms;
    }
    folder
        .file(asset_path)
        .map_or(0, |f| f.modified_ms)
        .max(meta_ms)
}

/// Reconcile a tree against a snapshot, returning the new tree and its changes
pub fn reconcile(
    mut tree: AssetTree,
    snapshot: &FolderInfo,
    metas: &dyn MetaSource,
) -> (AssetTree, TreeChanges) {
    let changes = tree.rebuild_from(snapshot, metas);
    (tree, changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FileInfo;
    use crate::loaders::IMAGE_TYPE;

    /// In-memory content: a snapshot plus sidecars by asset path
    #[derive(Default)]
    struct MemoryContent {
        metas: HashMap<String, MetaInfo>,
    }

    impl MemoryContent {
        fn import(&mut self, path: &str, asset_type: &str) -> Uid {
            let meta = MetaInfo::new(asset_type);
            let uid = meta.id;
            self.metas.insert(path.to_string(), meta);
            uid
        }
    }

    impl MetaSource for MemoryContent {
        fn read_meta(&self, path: &str) -> AssetResult<MetaInfo> {
            self.metas
                .get(path)
                .cloned()
                .ok_or_else(|| AssetError::NotFound(path.to_string()))
        }
    }

    fn file(path: &str) -> FileInfo {
        FileInfo {
            path: path.to_string(),
            modified_ms: 1,
        }
    }

    fn with_meta(folder: &mut FolderInfo, path: &str) {
        folder.files.push(file(path));
        folder.files.push(file(&path::meta_path(path)));
    }

    /// root: images/ (meta) { a.png (meta), b.png (no meta), ui/ (no meta) { c.png (meta) } }
    fn sample() -> (FolderInfo, MemoryContent) {
        let mut content = MemoryContent::default();
        content.import("images", FOLDER_TYPE);
        content.import("images/a.png", IMAGE_TYPE);
        content.import("images/ui/c.png", IMAGE_TYPE);

        let mut ui = FolderInfo::new("images/ui");
        with_meta(&mut ui, "images/ui/c.png");

        let mut images = FolderInfo::new("images");
        with_meta(&mut images, "images/a.png");
        images.files.push(file("images/b.png"));
        images.folders.push(ui);

        let mut root = FolderInfo::new("");
        root.files.push(file("images.meta"));
        root.folders.push(images);

        (root, content)
    }

    #[test]
    fn test_rebuild_skips_unimported() {
        let (snapshot, content) = sample();
        let mut tree = AssetTree::new("Assets");

        let changes = tree.rebuild_from(&snapshot, &content);

        assert_eq!(changes.added.len(), 2);
        assert!(tree.find_asset("images").is_some());
        assert!(tree.find_asset("images/a.png").is_some());
        // No sidecar: silently skipped
        assert!(tree.find_asset("images/b.png").is_none());
        // Folder without sidecar is skipped with its contents
        assert!(tree.find_asset("images/ui").is_none());
        assert!(tree.find_asset("images/ui/c.png").is_none());
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_rebuild_idempotent() {
        let (snapshot, content) = sample();
        let mut tree = AssetTree::new("Assets");
        tree.rebuild_from(&snapshot, &content);
        let before = tree.len();

        let changes = tree.rebuild_from(&snapshot, &content);
        assert!(changes.is_empty());
        assert_eq!(tree.len(), before);
    }

    #[test]
    fn test_rebuild_removes_missing_with_cascade() {
        let (mut snapshot, mut content) = sample();
        content.import("images/ui", FOLDER_TYPE);
        snapshot.folders[0].files.push(file("images/ui.meta"));

        let mut tree = AssetTree::new("Assets");
        tree.rebuild_from(&snapshot, &content);
        assert!(tree.find_asset("images/ui/c.png").is_some());
        assert_eq!(tree.len(), 4);

        // Whole images folder vanished from disk
        let empty = FolderInfo::new("");
        let changes = tree.rebuild_from(&empty, &content);
        assert_eq!(changes.removed.len(), 4);
        assert!(tree.is_empty());
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_rebuild_drops_node_when_sidecar_deleted() {
        let (mut snapshot, content) = sample();
        let mut tree = AssetTree::new("Assets");
        tree.rebuild_from(&snapshot, &content);
        let uid = tree.find_asset("images/a.png").unwrap().uid;

        snapshot.folders[0].files.retain(|f| f.path != "images/a.png.meta");
        let changes = tree.rebuild_from(&snapshot, &content);

        assert_eq!(changes.removed, vec![uid]);
        assert!(tree.find_asset(uid).is_none());
    }

    #[test]
    fn test_duplicate_uid_rejected() {
        let (mut snapshot, mut content) = sample();
        let original = content.metas["images/a.png"].clone();
        content.metas.insert("images/dup.png".to_string(), original.clone());
        with_meta(&mut snapshot.folders[0], "images/dup.png");

        let mut tree = AssetTree::new("Assets");
        tree.rebuild_from(&snapshot, &content);

        assert_eq!(tree.find_asset(original.id).unwrap().path, "images/a.png");
        assert!(tree.find_asset("images/dup.png").is_none());
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_rebuild_refreshes_timestamps() {
        let (mut snapshot, content) = sample();
        let mut tree = AssetTree::new("Assets");
        tree.rebuild_from(&snapshot, &content);
        assert_eq!(tree.find_asset("images/a.png").unwrap().modified_ms, 1);

        for f in &mut snapshot.folders[0].files {
            if f.path == "images/a.png" {
                f.modified_ms = 42;
            }
        }
        let changes = tree.rebuild_from(&snapshot, &content);
        assert!(changes.is_empty());
        assert_eq!(tree.find_asset("images/a.png").unwrap().modified_ms, 42);
    }

    #[test]
    fn test_move_into_earlier_folder_keeps_uid() {
        let mut content = MemoryContent::default();
        content.import("b", FOLDER_TYPE);
        content.import("a", FOLDER_TYPE);
        let uid = content.import("b/x.png", IMAGE_TYPE);

        let mut b = FolderInfo::new("b");
        with_meta(&mut b, "b/x.png");
        let mut root = FolderInfo::new("");
        root.files.push(file("a.meta"));
        root.files.push(file("b.meta"));
        root.folders.push(FolderInfo::new("a"));
        root.folders.push(b);

        let mut tree = AssetTree::new("Assets");
        tree.rebuild_from(&root, &content);
        assert_eq!(tree.find_asset(uid).unwrap().path, "b/x.png");

        // Move b/x.png to a/x.png, sidecar travels with it
        let meta = content.metas.remove("b/x.png").unwrap();
        content.metas.insert("a/x.png".to_string(), meta);
        root.folders[1].files.clear();
        with_meta(&mut root.folders[0], "a/x.png");

        let changes = tree.rebuild_from(&root, &content);
        assert_eq!(changes.removed, vec![uid]);
        assert_eq!(changes.added, vec![uid]);
        assert_eq!(tree.find_asset(uid).unwrap().path, "a/x.png");
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_swapped_sidecars_follow_their_assets() {
        let (mut snapshot, mut content) = sample();
        let b_uid = content.import("images/b.png", IMAGE_TYPE);
        snapshot.folders[0].files.push(file("images/b.png.meta"));

        let mut tree = AssetTree::new("Assets");
        tree.rebuild_from(&snapshot, &content);
        let a_uid = tree.find_asset("images/a.png").unwrap().uid;
        assert_eq!(tree.find_asset(b_uid).unwrap().path, "images/b.png");

        // a.png and b.png trade places together with their sidecars
        let a_meta = content.metas.remove("images/a.png").unwrap();
        let b_meta = content.metas.remove("images/b.png").unwrap();
        content.metas.insert("images/a.png".to_string(), b_meta);
        content.metas.insert("images/b.png".to_string(), a_meta);

        tree.rebuild_from(&snapshot, &content);
        assert_eq!(tree.find_asset(a_uid).unwrap().path, "images/b.png");
        assert_eq!(tree.find_asset(b_uid).unwrap().path, "images/a.png");
        assert_eq!(tree.len(), 3);
        assert!(tree.is_consistent());

        assert!(tree.rebuild_from(&snapshot, &content).is_empty());
    }

    #[test]
    fn test_folder_sidecar_replaced() {
        let (mut snapshot, mut content) = sample();
        let mut tree = AssetTree::new("Assets");
        tree.rebuild_from(&snapshot, &content);
        let old_uid = tree.find_asset("images").unwrap().uid;
        let child = tree.find_asset("images/a.png").unwrap().uid;

        let new_uid = content.import("images", FOLDER_TYPE);
        snapshot.files[0].modified_ms = 7;
        let changes = tree.rebuild_from(&snapshot, &content);

        assert!(changes.removed.contains(&old_uid));
        assert!(changes.added.contains(&new_uid));
        assert!(tree.find_asset(old_uid).is_none());

        let folder = tree.find_asset("images").unwrap();
        assert_eq!(folder.uid, new_uid);
        assert_eq!(folder.modified_ms, 7);
        // Children keep their own identity
        assert_eq!(tree.find_asset(child).unwrap().parent, Some(new_uid));
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_folder_sidecar_params_refreshed() {
        let (snapshot, mut content) = sample();
        let mut tree = AssetTree::new("Assets");
        tree.rebuild_from(&snapshot, &content);
        let uid = tree.find_asset("images").unwrap().uid;

        if let Some(meta) = content.metas.get_mut("images") {
            meta.set_param("tag", serde_json::json!("ui"));
        }
        let changes = tree.rebuild_from(&snapshot, &content);

        assert!(changes.is_empty());
        let folder = tree.find_asset(uid).unwrap();
        assert_eq!(folder.meta.param("tag"), Some(&serde_json::json!("ui")));
    }

    #[test]
    fn test_add_and_remove_asset() {
        let mut tree = AssetTree::new("Assets");
        assert!(tree.add_asset(AssetNode::new("sprites", MetaInfo::new(FOLDER_TYPE), 0)));
        assert!(tree.add_asset(AssetNode::new("sprites/a.png", MetaInfo::new(IMAGE_TYPE), 0)));
        // Parent folder not in the tree
        assert!(!tree.add_asset(AssetNode::new("missing/b.png", MetaInfo::new(IMAGE_TYPE), 0)));

        let folder = tree.find_asset("sprites").unwrap().uid;
        assert_eq!(tree.child_infos(folder).len(), 1);

        let removed = tree.remove_asset(folder);
        assert_eq!(removed.len(), 2);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let (snapshot, content) = sample();
        let mut tree = AssetTree::new("Assets");
        tree.rebuild_from(&snapshot, &content);

        let json = serde_json::to_string(&tree).unwrap();
        let loaded: AssetTree = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.len(), tree.len());
        assert_eq!(loaded.root_path(), Path::new("Assets"));
        assert!(loaded.find_asset("images/a.png").is_some());
        assert!(loaded.is_consistent());
    }

    #[test]
    fn test_reconcile_pure() {
        let (snapshot, content) = sample();
        let (tree, changes) = reconcile(AssetTree::new("Assets"), &snapshot, &content);
        assert_eq!(tree.len(), changes.added.len());
    }
}
