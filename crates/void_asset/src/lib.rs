//! # void_asset - Asset Database
//!
//! Persistent index of content files kept in sync with the filesystem:
//! - Path + UID identity, UIDs persisted in `.meta` sidecars
//! - Asset trees reconciled against directory scans
//! - Incremental build through pluggable converters
//! - Reference-counted cache of loaded asset objects
//!
//! ## Example
//!
//! ```ignore
//! use void_asset::prelude::*;
//!
//! // Open the store, rebuilding from the content roots
//! let mut store = AssetStore::new(AssetsConfig {
//!     prebuild: true,
//!     ..AssetsConfig::for_project("game")
//! })?;
//!
//! // Look assets up by path or UID
//! let uid = store.get_asset_id("textures/player.png").unwrap();
//! let handle = store.get_asset_ref(uid);
//! if let Some(image) = handle.get::<ImageAsset>() {
//!     println!("{}x{}", image.width, image.height);
//! }
//!
//! // Structural edits go through the store
//! let copy = store.make_unique_asset_name("textures/player.png");
//! store.copy_asset("textures/player.png", &copy, true)?;
//! ```

pub mod builder;
pub mod cache;
pub mod config;
pub mod content;
pub mod converter;
pub mod error;
pub mod events;
pub mod loader;
pub mod loaders;
pub mod meta;
pub mod path;
pub mod store;
pub mod tree;
pub mod uid;
pub mod unique_name;
#[cfg(feature = "file-watcher")]
pub mod watcher;

pub use builder::AssetsBuilder;
pub use cache::{AssetCache, AssetRef, CacheKey};
pub use config::{AssetsConfig, ContentLayout};
pub use content::{ContentSource, DiskContent, FileInfo, FolderInfo, MetaSource};
pub use converter::{AssetConverter, ConvertContext, FolderAssetConverter, StdAssetConverter};
pub use error::{AssetError, AssetResult};
pub use events::AssetEvent;
pub use loader::{Asset, AssetLoader, AssetTypeRegistry, ErasedLoader, LoadContext, LoadError, LoadResult};
pub use meta::MetaInfo;
pub use store::AssetStore;
pub use tree::{AssetInfo, AssetNode, AssetTree, TreeChanges};
pub use uid::{AssetLocator, Uid};
pub use unique_name::make_unique_asset_name;

#[cfg(feature = "file-watcher")]
pub use watcher::{ContentWatcher, FileChange, FileChangeKind};

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::cache::AssetRef;
    pub use crate::config::AssetsConfig;
    pub use crate::error::{AssetError, AssetResult};
    pub use crate::events::AssetEvent;
    pub use crate::loader::{Asset, AssetLoader, LoadContext, LoadError, LoadResult};
    pub use crate::loaders::{BinaryAsset, DataAsset, FolderAsset, ImageAsset, TextAsset};
    pub use crate::store::AssetStore;
    pub use crate::tree::AssetInfo;
    pub use crate::uid::{AssetLocator, Uid};
}
