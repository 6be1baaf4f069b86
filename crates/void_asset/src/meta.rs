//! Sidecar meta files
//!
//! For an asset at `P` the file `P.meta` holds its [`MetaInfo`]. The presence
//! of the sidecar marks `P` as imported; files without one are invisible to
//! the asset tree.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AssetError, AssetResult};
use crate::uid::Uid;

/// Extension of sidecar files
pub const META_EXTENSION: &str = "meta";

/// Metadata persisted next to every imported asset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetaInfo {
    /// Stable identifier, generated once when the sidecar is created
    pub id: Uid,
    /// Asset type discriminator
    #[serde(rename = "type")]
    pub asset_type: String,
    /// Per-type payload
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl MetaInfo {
    /// Create metadata for a new asset with a fresh UID
    pub fn new(asset_type: impl Into<String>) -> Self {
        Self {
            id: Uid::generate(),
            asset_type: asset_type.into(),
            params: serde_json::Map::new(),
        }
    }

    /// Same payload under a fresh UID
    pub fn with_new_id(&self) -> Self {
        Self {
            id: Uid::generate(),
            ..self.clone()
        }
    }

    /// Get a per-type parameter
    pub fn param(&self, key: &str) -> Option<&serde_json::Value> {
        self.params.get(key)
    }

    /// Set a per-type parameter
    pub fn set_param(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.params.insert(key.into(), value);
    }
}

/// Read a sidecar file
pub fn read_meta(path: &Path) -> AssetResult<MetaInfo> {
    let data = fs::read(path).map_err(|e| AssetError::io(path, e))?;
    serde_json::from_slice(&data).map_err(|e| AssetError::Meta {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write a sidecar file
pub fn write_meta(path: &Path, meta: &MetaInfo) -> AssetResult<()> {
    let data = serde_json::to_vec_pretty(meta).map_err(|e| AssetError::Meta {
        path: path.to_path_buf(),
        source: e,
    })?;
    fs::write(path, data).map_err(|e| AssetError::io(path, e))
}
