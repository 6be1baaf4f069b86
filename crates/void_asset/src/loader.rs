//! Asset types and the extension registry
//!
//! Every asset type is described by an [`AssetLoader`]: a type name written
//! into sidecars, the file extensions it claims, and a function turning raw
//! payload bytes into a live asset object.

use std::any::Any;
use std::collections::BTreeMap;

use thiserror::Error;

use crate::meta::MetaInfo;
use crate::tree::AssetInfo;
use crate::uid::Uid;

/// Error during asset loading
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// Payload file not found
    #[error("Asset not found: {0}")]
    NotFound(String),
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
    /// Parse/decode error
    #[error("Parse error: {0}")]
    ParseError(String),
    /// No loader for this type
    #[error("Unsupported asset type: {0}")]
    UnsupportedType(String),
}

/// Result type for asset loading
pub type LoadResult<T> = Result<T, LoadError>;

/// A live asset object owned by the cache
pub trait Asset: Any + Send + Sync {
    /// Name of the asset type, matching the sidecar discriminator
    fn type_name(&self) -> &'static str;

    /// Upcast for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn Asset {
    /// Downcast to a concrete asset type
    pub fn downcast_ref<T: Asset>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Downcast to a concrete asset type, mutably
    pub fn downcast_mut<T: Asset>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Context provided to loaders during loading
pub struct LoadContext<'a> {
    /// Virtual path of the asset being loaded
    pub path: &'a str,
    /// Asset UID
    pub uid: Uid,
    /// Sidecar metadata
    pub meta: &'a MetaInfo,
    /// Raw payload (empty for folders)
    pub data: &'a [u8],
    /// Direct children infos (folders only)
    pub children: &'a [AssetInfo],
}

impl<'a> LoadContext<'a> {
    /// Create a new load context
    pub fn new(path: &'a str, meta: &'a MetaInfo, data: &'a [u8]) -> Self {
        Self {
            path,
            uid: meta.id,
            meta,
            data,
            children: &[],
        }
    }

    /// Attach folder children
    pub fn with_children(mut self, children: &'a [AssetInfo]) -> Self {
        self.children = children;
        self
    }

    /// Get file extension
    pub fn extension(&self) -> &str {
        crate::path::extension(self.path)
    }

    /// Read data as string (UTF-8)
    pub fn read_string(&self) -> LoadResult<&str> {
        std::str::from_utf8(self.data)
            .map_err(|e| LoadError::ParseError(format!("Invalid UTF-8 in {}: {}", self.path, e)))
    }
}

/// Trait for asset type descriptors
pub trait AssetLoader: Send + Sync {
    /// Asset type this loader produces
    type Asset: Asset;

    /// Type discriminator stored in sidecars
    fn type_name(&self) -> &'static str;

    /// File extensions this type claims
    fn extensions(&self) -> &[&str];

    /// Build the asset object from its payload
    fn load(&self, ctx: &mut LoadContext) -> LoadResult<Self::Asset>;
}

/// Type-erased asset loader
pub trait ErasedLoader: Send + Sync {
    /// Type discriminator stored in sidecars
    fn type_name(&self) -> &'static str;

    /// File extensions this type claims
    fn extensions(&self) -> &[&str];

    /// Load an asset into a boxed object
    fn load_erased(&self, ctx: &mut LoadContext) -> LoadResult<Box<dyn Asset>>;
}

impl<L: AssetLoader> ErasedLoader for L {
    fn type_name(&self) -> &'static str {
        AssetLoader::type_name(self)
    }

    fn extensions(&self) -> &[&str] {
        AssetLoader::extensions(self)
    }

    fn load_erased(&self, ctx: &mut LoadContext) -> LoadResult<Box<dyn Asset>> {
        self.load(ctx).map(|asset| Box::new(asset) as Box<dyn Asset>)
    }
}

/// Registry of asset types, keyed by type name and by file extension
pub struct AssetTypeRegistry {
    /// Extension -> type name
    by_extension: BTreeMap<String, &'static str>,
    /// Type name -> index into all_loaders
    by_type: BTreeMap<&'static str, usize>,
    /// All registered loaders
    all_loaders: Vec<Box<dyn ErasedLoader>>,
    /// Type used for files with an unknown extension
    std_type: &'static str,
}

impl AssetTypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            by_extension: BTreeMap::new(),
            by_type: BTreeMap::new(),
            all_loaders: Vec::new(),
            std_type: crate::loaders::BINARY_TYPE,
        }
    }

    /// Registry with every built-in asset type
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.load_asset_types(crate::loaders::builtin_loaders());
        registry
    }

    /// Register a batch of types in order; earlier registrants win collisions
    pub fn load_asset_types(&mut self, loaders: Vec<Box<dyn ErasedLoader>>) {
        for loader in loaders {
            self.register_erased(loader);
        }
        log::debug!(
            "Asset types loaded: {} types, {} extensions",
            self.all_loaders.len(),
            self.by_extension.len()
        );
    }

    /// Register a loader
    pub fn register<L: AssetLoader + 'static>(&mut self, loader: L) {
        self.register_erased(Box::new(loader));
    }

    /// Register an erased loader
    pub fn register_erased(&mut self, loader: Box<dyn ErasedLoader>) {
        let type_name = loader.type_name();
        if self.by_type.contains_key(type_name) {
            log::warn!("Asset type registered twice: {}, keeping the first", type_name);
            return;
        }

        for &ext in loader.extensions() {
            let ext = ext.to_lowercase();
            if let Some(existing) = self.by_extension.get(&ext) {
                log::warn!(
                    "Assets extensions duplicating: {}, at {} and {}",
                    ext,
                    existing,
                    type_name
                );
                continue;
            }
            self.by_extension.insert(ext, type_name);
        }

        self.by_type.insert(type_name, self.all_loaders.len());
        self.all_loaders.push(loader);
    }

    /// Set the fallback type for unknown extensions
    pub fn set_std_type(&mut self, type_name: &'static str) {
        self.std_type = type_name;
    }

    /// Fallback type for unknown extensions
    pub fn std_type(&self) -> &'static str {
        self.std_type
    }

    /// Type bound to an extension, or the fallback type
    pub fn type_for_extension(&self, ext: &str) -> &'static str {
        self.by_extension
            .get(&ext.to_lowercase())
            .copied()
            .unwrap_or(self.std_type)
    }

    /// Type for a virtual path
    pub fn type_for_path(&self, path: &str, is_folder: bool) -> &'static str {
        if is_folder {
            crate::loaders::FOLDER_TYPE
        } else {
            self.type_for_extension(crate::path::extension(path))
        }
    }

    /// Loader for a type name
    pub fn loader(&self, type_name: &str) -> Option<&dyn ErasedLoader> {
        let idx = *self.by_type.get(type_name)?;
        self.all_loaders.get(idx).map(|b| b.as_ref())
    }

    /// Check if a type is registered
    pub fn contains_type(&self, type_name: &str) -> bool {
        self.by_type.contains_key(type_name)
    }

    /// Check if an extension is bound
    pub fn supports_extension(&self, ext: &str) -> bool {
        self.by_extension.contains_key(&ext.to_lowercase())
    }

    /// Snapshot of the extension table
    pub fn extension_types(&self) -> BTreeMap<String, &'static str> {
        self.by_extension.clone()
    }

    /// Load an asset of the given type
    pub fn load(&self, type_name: &str, ctx: &mut LoadContext) -> LoadResult<Box<dyn Asset>> {
        let loader = self
            .loader(type_name)
            .ok_or_else(|| LoadError::UnsupportedType(type_name.to_string()))?;
        loader.load_erased(ctx)
    }
}

impl Default for AssetTypeRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
