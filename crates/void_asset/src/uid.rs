//! Asset identity
//!
//! Assets are addressed two ways:
//! - by virtual path, which is only valid until the next rename or move
//! - by [`Uid`], which is written once into the sidecar and never reassigned
//!
//! Two asset infos describe the same asset when their UIDs match.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of an asset
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(Uuid);

impl Uid {
    /// Generate a fresh random UID
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The empty UID
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Check if this is the empty UID
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Build from raw 128 bits
    pub const fn from_u128(bits: u128) -> Self {
        Self(Uuid::from_u128(bits))
    }

    /// Get raw 128 bits
    pub fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }
}

impl Default for Uid {
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({})", self.0)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Uid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Either identity form, accepted by every lookup
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetLocator<'a> {
    /// Virtual path relative to a content root
    Path(&'a str),
    /// Stable identifier
    Uid(Uid),
}

impl<'a> From<&'a str> for AssetLocator<'a> {
    fn from(path: &'a str) -> Self {
        Self::Path(path)
    }
}

impl<'a> From<&'a String> for AssetLocator<'a> {
    fn from(path: &'a String) -> Self {
        Self::Path(path.as_str())
    }
}

impl From<Uid> for AssetLocator<'_> {
    fn from(uid: Uid) -> Self {
        Self::Uid(uid)
    }
}

impl From<&Uid> for AssetLocator<'_> {
    fn from(uid: &Uid) -> Self {
        Self::Uid(*uid)
    }
}

impl fmt::Display for AssetLocator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "'{}'", path),
            Self::Uid(uid) => write!(f, "{}", uid),
        }
    }
}
