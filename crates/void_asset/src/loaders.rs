//! Built-in asset types
//!
//! - `Folder`: directory node, knows its direct children
//! - `Binary`: fallback type, raw bytes
//! - `Image`: PNG/JPG/BMP, dimensions decoded on load
//! - `Data`: JSON documents (prefabs, animations and other structured data)
//! - `Text`: plain text formats

use std::any::Any;
use std::io::Cursor;

use crate::loader::{Asset, AssetLoader, ErasedLoader, LoadContext, LoadError, LoadResult};
use crate::tree::AssetInfo;

pub const FOLDER_TYPE: &str = "Folder";
pub const BINARY_TYPE: &str = "Binary";
pub const IMAGE_TYPE: &str = "Image";
pub const DATA_TYPE: &str = "Data";
pub const TEXT_TYPE: &str = "Text";

/// All built-in loaders in registration order
pub fn builtin_loaders() -> Vec<Box<dyn ErasedLoader>> {
    vec![
        Box::new(FolderLoader),
        Box::new(ImageLoader),
        Box::new(DataLoader),
        Box::new(TextLoader),
        Box::new(BinaryLoader),
    ]
}

macro_rules! impl_asset {
    ($ty:ty, $name:expr) => {
        impl Asset for $ty {
            fn type_name(&self) -> &'static str {
                $name
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }
    };
}

/// Folder asset
#[derive(Clone, Debug, Default)]
pub struct FolderAsset {
    /// Direct children at load time
    pub children: Vec<AssetInfo>,
}

impl_asset!(FolderAsset, FOLDER_TYPE);

/// Folder loader
pub struct FolderLoader;

impl AssetLoader for FolderLoader {
    type Asset = FolderAsset;

    fn type_name(&self) -> &'static str {
        FOLDER_TYPE
    }

    fn extensions(&self) -> &[&str] {
        &[]
    }

    fn load(&self, ctx: &mut LoadContext) -> LoadResult<Self::Asset> {
        Ok(FolderAsset {
            children: ctx.children.to_vec(),
        })
    }
}

/// Raw bytes asset
#[derive(Clone, Debug, Default)]
pub struct BinaryAsset {
    pub bytes: Vec<u8>,
}

impl_asset!(BinaryAsset, BINARY_TYPE);

/// Bytes loader, used for unknown extensions
pub struct BinaryLoader;

impl AssetLoader for BinaryLoader {
    type Asset = BinaryAsset;

    fn type_name(&self) -> &'static str {
        BINARY_TYPE
    }

    fn extensions(&self) -> &[&str] {
        &["bin", "dat"]
    }

    fn load(&self, ctx: &mut LoadContext) -> LoadResult<Self::Asset> {
        Ok(BinaryAsset {
            bytes: ctx.data.to_vec(),
        })
    }
}

/// Image asset
///
/// Only the header is decoded; pixel upload belongs to the renderer.
#[derive(Clone, Debug)]
pub struct ImageAsset {
    /// Encoded file bytes
    pub bytes: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format
    pub format: image::ImageFormat,
}

impl_asset!(ImageAsset, IMAGE_TYPE);

/// Image loader
pub struct ImageLoader;

impl AssetLoader for ImageLoader {
    type Asset = ImageAsset;

    fn type_name(&self) -> &'static str {
        IMAGE_TYPE
    }

    fn extensions(&self) -> &[&str] {
        &["png", "jpg", "jpeg", "bmp"]
    }

    fn load(&self, ctx: &mut LoadContext) -> LoadResult<Self::Asset> {
        let reader = image::ImageReader::new(Cursor::new(ctx.data))
            .with_guessed_format()
            .map_err(|e| LoadError::IoError(format!("{}: {}", ctx.path, e)))?;

        let format = reader
            .format()
            .ok_or_else(|| LoadError::ParseError(format!("Unknown image format: {}", ctx.path)))?;

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| LoadError::ParseError(format!("Failed to decode image {}: {}", ctx.path, e)))?;

        Ok(ImageAsset {
            bytes: ctx.data.to_vec(),
            width,
            height,
            format,
        })
    }
}

/// Structured data asset
#[derive(Clone, Debug, Default)]
pub struct DataAsset {
    pub value: serde_json::Value,
}

impl_asset!(DataAsset, DATA_TYPE);

/// JSON loader
pub struct DataLoader;

impl AssetLoader for DataLoader {
    type Asset = DataAsset;

    fn type_name(&self) -> &'static str {
        DATA_TYPE
    }

    fn extensions(&self) -> &[&str] {
        &["json", "prefab", "anim"]
    }

    fn load(&self, ctx: &mut LoadContext) -> LoadResult<Self::Asset> {
        let value = serde_json::from_slice(ctx.data)
            .map_err(|e| LoadError::ParseError(format!("{}: {}", ctx.path, e)))?;
        Ok(DataAsset { value })
    }
}

/// Text asset
#[derive(Clone, Debug, Default)]
pub struct TextAsset {
    pub text: String,
}

impl_asset!(TextAsset, TEXT_TYPE);

/// Text loader
pub struct TextLoader;

impl AssetLoader for TextLoader {
    type Asset = TextAsset;

    fn type_name(&self) -> &'static str {
        TEXT_TYPE
    }

    fn extensions(&self) -> &[&str] {
        &["txt", "text", "md", "ron", "toml", "yaml", "yml", "xml"]
    }

    fn load(&self, ctx: &mut LoadContext) -> LoadResult<Self::Asset> {
        let text = ctx.read_string()?;
        Ok(TextAsset {
            text: text.to_string(),
        })
    }
}
