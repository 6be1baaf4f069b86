//! Integration tests for void_asset

use std::collections::HashSet;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use tempfile::TempDir;
use void_asset::loaders::{FOLDER_TYPE, IMAGE_TYPE, TEXT_TYPE};
use void_asset::meta::{read_meta, write_meta};
use void_asset::prelude::*;
use void_asset::{AssetTree, ContentLayout, MetaInfo};

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::new(width, height);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Write a payload and its sidecar, returning the UID
fn add_file(root: &Path, rel: &str, bytes: &[u8], asset_type: &str) -> Uid {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, bytes).unwrap();
    let meta = MetaInfo::new(asset_type);
    write_meta(&root.join(format!("{}.meta", rel)), &meta).unwrap();
    meta.id
}

fn add_folder(root: &Path, rel: &str) -> Uid {
    fs::create_dir_all(root.join(rel)).unwrap();
    let meta = MetaInfo::new(FOLDER_TYPE);
    write_meta(&root.join(format!("{}.meta", rel)), &meta).unwrap();
    meta.id
}

struct Project {
    dir: TempDir,
    config: AssetsConfig,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = AssetsConfig {
            prebuild: true,
            ..AssetsConfig::for_project(dir.path())
        };
        fs::create_dir_all(dir.path().join("Assets")).unwrap();
        Self { dir, config }
    }

    fn assets(&self) -> std::path::PathBuf {
        self.dir.path().join("Assets")
    }

    fn open(&self) -> AssetStore {
        AssetStore::new(self.config.clone()).unwrap()
    }
}

#[test]
fn test_rename_keeps_uid() {
    let project = Project::new();
    let root = project.assets();
    add_folder(&root, "images");
    let uid = add_file(&root, "images/a.png", &png_bytes(2, 2), IMAGE_TYPE);

    let mut store = project.open();
    assert!(store.rename_asset(uid, "b.png", true).unwrap());

    assert!(root.join("images/b.png").is_file());
    assert!(root.join("images/b.png.meta").is_file());
    assert!(!root.join("images/a.png").exists());
    assert!(!root.join("images/a.png.meta").exists());
    assert_eq!(store.get_asset_info(uid).unwrap().path, "images/b.png");
}

#[test]
fn test_identity_stable_across_moves() {
    let project = Project::new();
    let root = project.assets();
    add_folder(&root, "a");
    add_folder(&root, "b");
    let uid = add_file(&root, "b/notes.txt", b"hello", TEXT_TYPE);

    let mut store = project.open();
    assert!(store.move_asset("b/notes.txt", "a/notes.txt", true).unwrap());
    assert_eq!(store.get_asset_path(uid).unwrap(), "a/notes.txt");

    assert!(store.rename_asset("a/notes.txt", "todo.txt", true).unwrap());
    assert_eq!(store.get_asset_path(uid).unwrap(), "a/todo.txt");
    assert_eq!(store.get_asset_id("a/todo.txt"), Some(uid));

    // Built artifact followed the asset
    let built = project.dir.path().join("Built/Assets");
    assert!(built.join("a/todo.txt").is_file());
    assert!(!built.join("b/notes.txt").exists());
}

#[test]
fn test_root_level_rename() {
    let project = Project::new();
    let uid = add_file(&project.assets(), "readme.txt", b"r", TEXT_TYPE);

    let mut store = project.open();
    assert!(store.rename_asset(uid, "about.txt", true).unwrap());
    assert_eq!(store.get_asset_path(uid).unwrap(), "about.txt");
}

#[test]
fn test_unique_name_scenarios() {
    let project = Project::new();
    let root = project.assets();
    add_folder(&root, "folder");
    add_file(&root, "folder/sprite.png", &png_bytes(1, 1), IMAGE_TYPE);

    let store = project.open();
    assert_eq!(
        store.make_unique_asset_name("folder/sprite.png"),
        "folder/sprite copy.png"
    );

    add_file(&root, "folder/sprite copy.png", &png_bytes(1, 1), IMAGE_TYPE);
    assert_eq!(
        store.make_unique_asset_name("folder/sprite copy.png"),
        "folder/sprite copy 1.png"
    );

    // Never an existing path, stable on its own output
    let unique = store.make_unique_asset_name("folder/sprite.png");
    assert!(!store.is_asset_exist(unique.as_str()));
    assert!(!root.join(&unique).exists());
    assert_eq!(store.make_unique_asset_name(&unique), unique);
}

#[test]
fn test_copy_folder_gets_fresh_uids() {
    let project = Project::new();
    let root = project.assets();
    add_folder(&root, "folderA");
    let mut originals = vec![
        add_file(&root, "folderA/one.txt", b"1", TEXT_TYPE),
        add_file(&root, "folderA/two.txt", b"2", TEXT_TYPE),
        add_file(&root, "folderA/three.png", &png_bytes(1, 1), IMAGE_TYPE),
    ];
    add_folder(&root, "folderA/sub");
    originals.push(add_file(&root, "folderA/sub/four.txt", b"4", TEXT_TYPE));

    let mut store = project.open();
    assert!(store.copy_asset("folderA", "folderB", true).unwrap());

    let leaves = [
        "folderB/one.txt",
        "folderB/two.txt",
        "folderB/three.png",
        "folderB/sub/four.txt",
    ];
    let mut copied = HashSet::new();
    for leaf in leaves {
        let uid = store.get_asset_id(leaf).unwrap();
        assert!(!originals.contains(&uid), "{} aliases its source", leaf);
        copied.insert(uid);
    }
    assert_eq!(copied.len(), 4);

    // Sources untouched
    for uid in &originals {
        assert!(store.get_asset_path(*uid).unwrap().starts_with("folderA/"));
    }
    assert_ne!(store.get_asset_id("folderB"), store.get_asset_id("folderA"));
}

#[test]
fn test_deleted_sidecar_drops_node() {
    let project = Project::new();
    let root = project.assets();
    let uid = add_file(&root, "c.png", &png_bytes(1, 1), IMAGE_TYPE);

    let mut store = project.open();
    assert!(store.is_asset_exist(uid));

    fs::remove_file(root.join("c.png.meta")).unwrap();
    let changed = store.rebuild_assets(false).unwrap();

    assert!(changed.contains(&uid));
    assert!(!store.is_asset_exist(uid));
    assert!(!store.is_asset_exist("c.png"));
    assert!(root.join("c.png").is_file());
}

#[test]
fn test_path_uid_duality_and_cache_uniqueness() {
    let project = Project::new();
    let uid = add_file(&project.assets(), "hero.png", &png_bytes(4, 3), IMAGE_TYPE);

    let mut store = project.open();
    let by_path = store.get_asset_ref("hero.png");
    let by_uid = store.get_asset_ref(store.get_asset_id("hero.png").unwrap());
    let again = store.get_asset_ref(uid);

    assert!(!by_path.is_empty());
    assert!(by_path.ptr_eq(&by_uid));
    assert!(by_path.ptr_eq(&again));
    assert_eq!(by_path.ref_count(), 3);
    assert_eq!(store.cache().len(), 1);

    let image = by_uid.get::<ImageAsset>().unwrap();
    assert_eq!((image.width, image.height), (4, 3));
}

#[test]
fn test_unknown_type_gives_empty_handle() {
    let project = Project::new();
    add_file(&project.assets(), "ship.mesh", b"verts", "Mesh");

    let mut store = project.open();
    assert!(store.is_asset_exist("ship.mesh"));
    assert!(store.get_asset_ref("ship.mesh").is_empty());
    assert!(store.get_asset_ref("missing.png").is_empty());
}

#[test]
fn test_rebuild_idempotent() {
    let project = Project::new();
    let root = project.assets();
    add_folder(&root, "docs");
    add_file(&root, "docs/a.txt", b"a", TEXT_TYPE);

    let mut store = project.open();
    let before: Vec<Uid> = store.main_tree().iter().map(|n| n.uid).collect();

    assert!(store.rebuild_assets(false).unwrap().is_empty());
    let after: Vec<Uid> = store.main_tree().iter().map(|n| n.uid).collect();
    assert_eq!(before, after);
    assert!(store.main_tree().is_consistent());
}

#[test]
fn test_conflict_rejected() {
    let project = Project::new();
    let root = project.assets();
    add_folder(&root, "images");
    let a = add_file(&root, "images/a.png", &png_bytes(1, 1), IMAGE_TYPE);
    let b = add_file(&root, "images/b.png", &png_bytes(2, 2), IMAGE_TYPE);
    // Payload on disk without a sidecar still occupies its path
    fs::write(root.join("images/c.png"), b"raw").unwrap();

    let mut store = project.open();
    let a_bytes = fs::read(root.join("images/a.png")).unwrap();
    let b_bytes = fs::read(root.join("images/b.png")).unwrap();

    assert!(!store.copy_asset(a, "images/b.png", true).unwrap());
    assert!(!store.move_asset(a, "images/b.png", true).unwrap());
    assert!(!store.rename_asset(a, "b.png", true).unwrap());
    assert!(!store.move_asset(a, "images/c.png", true).unwrap());

    assert_eq!(fs::read(root.join("images/a.png")).unwrap(), a_bytes);
    assert_eq!(fs::read(root.join("images/b.png")).unwrap(), b_bytes);
    assert_eq!(fs::read(root.join("images/c.png")).unwrap(), b"raw");
    assert_eq!(store.get_asset_path(a).unwrap(), "images/a.png");
    assert_eq!(store.get_asset_path(b).unwrap(), "images/b.png");
}

#[test]
fn test_invalid_targets_rejected() {
    let project = Project::new();
    let root = project.assets();
    add_folder(&root, "a");

    let mut store = project.open();
    assert!(!store.copy_asset("a", "a/inner", false).unwrap());
    assert!(!store.move_asset("a", "missing/a", false).unwrap());
    assert!(!store.rename_asset("a", "x/y", false).unwrap());
    assert!(!root.join("a/inner").exists());
}

#[test]
fn test_not_found_returns_false() {
    let project = Project::new();
    let mut store = project.open();

    assert!(!store.remove_asset("nope.png", true).unwrap());
    assert!(!store.copy_asset(Uid::generate(), "x.png", true).unwrap());
    assert!(!store.rename_asset("nope.png", "x.png", true).unwrap());
    assert!(store.get_asset_info("nope.png").is_none());
}

#[test]
fn test_remove_folder() {
    let project = Project::new();
    let root = project.assets();
    let folder = add_folder(&root, "level");
    let child = add_file(&root, "level/map.json", b"{}", "Data");

    let mut store = project.open();
    let handle = store.get_asset_ref(child);
    assert!(!handle.is_empty());

    assert!(store.remove_asset(folder, true).unwrap());
    assert!(!root.join("level").exists());
    assert!(!root.join("level.meta").exists());
    assert!(!store.is_asset_exist(child));
    assert!(!project.dir.path().join("Built/Assets/level").exists());

    // Outstanding handle keeps the object alive
    assert!(handle.read().is_some());
    assert!(!store.cache().is_current(&handle));
}

#[test]
fn test_move_assets_batch() {
    let project = Project::new();
    let root = project.assets();
    add_folder(&root, "src");
    add_folder(&root, "dst");
    let a = add_file(&root, "src/a.txt", b"a", TEXT_TYPE);
    let b = add_file(&root, "src/b.txt", b"b", TEXT_TYPE);
    add_file(&root, "dst/b.txt", b"taken", TEXT_TYPE);

    let mut store = project.open();
    let events = store.subscribe();

    let moves = [
        (AssetLocator::from(a), "dst/a.txt"),
        (AssetLocator::from(b), "dst/b.txt"),
    ];
    assert!(!store.move_assets(&moves, true).unwrap());

    assert_eq!(store.get_asset_path(a).unwrap(), "dst/a.txt");
    assert_eq!(store.get_asset_path(b).unwrap(), "src/b.txt");

    // One rebuild for the whole batch
    let rebuilt = events
        .try_iter()
        .filter(|e| matches!(e, AssetEvent::Rebuilt { .. }))
        .count();
    assert_eq!(rebuilt, 1);
}

#[test]
fn test_rebuild_notifies_once_after_all_trees() {
    let project = Project::new();
    let mut config = project.config.clone();
    config.editor = Some(ContentLayout::named("EditorAssets"));
    add_file(&project.assets(), "a.txt", b"a", TEXT_TYPE);
    let editor_uid = add_file(&project.dir.path().join("EditorAssets"), "icon.png", &png_bytes(1, 1), IMAGE_TYPE);

    let mut store = AssetStore::new(config).unwrap();
    let events = store.subscribe();

    fs::write(project.assets().join("a.txt"), b"changed").unwrap();
    let meta_path = project.assets().join("a.txt.meta");
    let mut meta = read_meta(&meta_path).unwrap();
    meta.set_param("encoding", serde_json::Value::String("utf-8".into()));
    write_meta(&meta_path, &meta).unwrap();

    let changed = store.rebuild_assets(false).unwrap();
    assert_eq!(changed, vec![meta.id]);

    let received: Vec<AssetEvent> = events.try_iter().collect();
    assert_eq!(
        received,
        vec![
            AssetEvent::CacheCleared { retained: 0 },
            AssetEvent::Rebuilt { changed },
        ]
    );

    // Editor assets resolve through the same store
    assert_eq!(store.get_asset_path(editor_uid).unwrap(), "icon.png");
    assert!(store.main_tree().find_asset(editor_uid).is_none());
    assert!(store.editor_tree().unwrap().find_asset(editor_uid).is_some());
    assert_eq!(store.trees().count(), 2);
}

#[test]
fn test_cache_clear_defers_referenced() {
    let project = Project::new();
    add_file(&project.assets(), "a.txt", b"a", TEXT_TYPE);
    add_file(&project.assets(), "b.txt", b"b", TEXT_TYPE);

    let mut store = project.open();
    let kept = store.get_asset_ref("a.txt");
    drop(store.get_asset_ref("b.txt"));
    let events = store.subscribe();

    store.rebuild_assets(false).unwrap();

    assert_eq!(events.try_recv().unwrap(), AssetEvent::CacheCleared { retained: 1 });
    assert!(store.cache().is_empty());
    assert_eq!(kept.get::<TextAsset>().unwrap().text, "a");

    // A fresh lookup builds a new instance
    let fresh = store.get_asset_ref("a.txt");
    assert!(!fresh.ptr_eq(&kept));
    assert!(store.cache().is_current(&fresh));
}

#[test]
fn test_import_asset() {
    let project = Project::new();
    let root = project.assets();
    fs::write(root.join("loose.png"), png_bytes(1, 1)).unwrap();
    fs::create_dir_all(root.join("loose_dir")).unwrap();

    let mut store = project.open();
    assert!(!store.is_asset_exist("loose.png"));

    let uid = store.import_asset("loose.png", true).unwrap().unwrap();
    let info = store.get_asset_info("loose.png").unwrap();
    assert_eq!(info.uid, uid);
    assert_eq!(info.asset_type, IMAGE_TYPE);

    let folder = store.import_asset("loose_dir", true).unwrap().unwrap();
    assert!(store.get_asset_info(folder).unwrap().is_folder());

    // Already imported, missing on disk
    assert!(store.import_asset("loose.png", false).unwrap().is_none());
    assert!(store.import_asset("ghost.png", false).unwrap().is_none());
}

#[test]
fn test_reopen_loads_snapshot() {
    let project = Project::new();
    let uid = add_file(&project.assets(), "a.txt", b"a", TEXT_TYPE);
    drop(project.open());

    let config = AssetsConfig {
        prebuild: false,
        ..project.config.clone()
    };
    let store = AssetStore::new(config).unwrap();
    assert_eq!(store.get_asset_path(uid).unwrap(), "a.txt");

    let snapshot = project.dir.path().join("Built/assets_tree.json");
    let saved = AssetTree::load_snapshot(&snapshot).unwrap();
    assert_eq!(saved.len(), store.main_tree().len());
}

#[test]
fn test_missing_snapshot_falls_back_to_rebuild() {
    let project = Project::new();
    let uid = add_file(&project.assets(), "a.txt", b"a", TEXT_TYPE);

    let config = AssetsConfig {
        prebuild: false,
        ..project.config.clone()
    };
    let store = AssetStore::new(config).unwrap();
    assert!(store.is_asset_exist(uid));
}

#[test]
fn test_corrupt_sidecar_is_skipped() {
    let project = Project::new();
    let root = project.assets();
    fs::write(root.join("bad.txt"), b"x").unwrap();
    fs::write(root.join("bad.txt.meta"), b"not json").unwrap();
    let good = add_file(&root, "good.txt", b"y", TEXT_TYPE);

    let store = project.open();
    assert!(!store.is_asset_exist("bad.txt"));
    assert!(store.is_asset_exist(good));
}

/// Exchange two payloads together with their sidecars, outside the store
fn swap_on_disk(root: &Path, a: &str, b: &str) {
    for suffix in ["", ".meta"] {
        let pa = root.join(format!("{}{}", a, suffix));
        let pb = root.join(format!("{}{}", b, suffix));
        let tmp = root.join(format!("{}{}.swap", a, suffix));
        fs::rename(&pa, &tmp).unwrap();
        fs::rename(&pb, &pa).unwrap();
        fs::rename(&tmp, &pb).unwrap();
    }
}

#[test]
fn test_swapped_assets_keep_identity() {
    let project = Project::new();
    let root = project.assets();
    let a = add_file(&root, "a.txt", b"first", TEXT_TYPE);
    let b = add_file(&root, "b.txt", b"second", TEXT_TYPE);

    let mut store = project.open();
    swap_on_disk(&root, "a.txt", "b.txt");

    let changed: HashSet<Uid> = store.rebuild_assets(false).unwrap().into_iter().collect();
    assert_eq!(changed, HashSet::from([a, b]));
    assert_eq!(store.get_asset_path(a).unwrap(), "b.txt");
    assert_eq!(store.get_asset_path(b).unwrap(), "a.txt");

    let built = project.dir.path().join("Built/Assets");
    assert_eq!(fs::read(built.join("a.txt")).unwrap(), b"second");
    assert_eq!(fs::read(built.join("b.txt")).unwrap(), b"first");

    assert!(store.rebuild_assets(false).unwrap().is_empty());
}

#[test]
fn test_replaced_folder_sidecar_takes_new_uid() {
    let project = Project::new();
    let root = project.assets();
    let old = add_folder(&root, "lvl");
    let child = add_file(&root, "lvl/map.json", b"{}", void_asset::loaders::DATA_TYPE);

    let mut store = project.open();
    let new = MetaInfo::new(FOLDER_TYPE);
    write_meta(&root.join("lvl.meta"), &new).unwrap();
    store.rebuild_assets(false).unwrap();

    assert_eq!(store.get_asset_path(new.id).unwrap(), "lvl");
    assert!(!store.is_asset_exist(old));
    assert_eq!(store.get_asset_path(child).unwrap(), "lvl/map.json");
    assert!(project.dir.path().join("Built/Assets/lvl/map.json").is_file());

    // Survives a reopen from the built snapshot
    let reopened = AssetStore::new(AssetsConfig {
        prebuild: false,
        ..project.config.clone()
    })
    .unwrap();
    assert_eq!(reopened.get_asset_id("lvl"), Some(new.id));
}

#[test]
fn test_parent_steps_stay_inside_content_root() {
    let project = Project::new();
    let root = project.assets();
    add_folder(&root, "docs");
    let uid = add_file(&root, "docs/a.txt", b"a", TEXT_TYPE);

    let mut store = project.open();
    assert!(store.copy_asset(uid, "docs/../../../escaped.txt", true).unwrap());

    assert!(root.join("escaped.txt").is_file());
    assert!(!project.dir.path().join("escaped.txt").exists());
    assert!(store.is_asset_exist("escaped.txt"));
}

#[test]
fn test_missing_payload_gives_empty_handle() {
    let project = Project::new();
    let root = project.assets();
    let uid = add_file(&root, "gone.txt", b"x", TEXT_TYPE);

    let mut store = project.open();
    fs::remove_file(root.join("gone.txt")).unwrap();

    // Tree still lists the asset until the next rebuild
    assert!(store.is_asset_exist(uid));
    assert!(store.get_asset_ref(uid).is_empty());
    assert!(!store.cache().contains(uid));
}

#[test]
fn test_move_assets_into_folder() {
    let project = Project::new();
    let root = project.assets();
    add_folder(&root, "inbox");
    add_folder(&root, "archive");
    let a = add_file(&root, "inbox/a.txt", b"a", TEXT_TYPE);
    let b = add_file(&root, "b.txt", b"b", TEXT_TYPE);

    let mut store = project.open();
    let missing = AssetLocator::from(Uid::generate());
    let sources = [AssetLocator::from(a), AssetLocator::from(b), missing];
    assert!(!store.move_assets_to(&sources, "archive", true).unwrap());

    assert_eq!(store.get_asset_path(a).unwrap(), "archive/a.txt");
    assert_eq!(store.get_asset_path(b).unwrap(), "archive/b.txt");

    let sources = [AssetLocator::from(a)];
    assert!(store.move_assets_to(&sources, "", true).unwrap());
    assert_eq!(store.get_asset_path(a).unwrap(), "a.txt");
}
