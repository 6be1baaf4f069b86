//! Asset Store Configuration
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables: `VOID_ASSETS_ROOT`, `VOID_ASSETS_PREBUILD`,
//!    `VOID_ASSETS_WATCH`
//! 2. Config file: `void_assets.toml` or `assets.toml` in the working directory
//! 3. Built-in defaults
//!
//! # Example Config File
//!
//! ```toml
//! project_root = "game"
//! prebuild = true
//! watch = false
//!
//! [main]
//! assets = "Assets"
//! built = "Built/Assets"
//! tree_snapshot = "Built/assets_tree.json"
//!
//! [editor]
//! assets = "EditorAssets"
//! built = "Built/EditorAssets"
//! tree_snapshot = "Built/editor_assets_tree.json"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AssetError, AssetResult};

/// Config files probed by [`AssetsConfig::load`]
pub const CONFIG_FILES: &[&str] = &["void_assets.toml", "assets.toml"];

/// Where one content root lives and where its build output goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentLayout {
    /// Source content root
    pub assets: PathBuf,
    /// Built content root
    pub built: PathBuf,
    /// Built tree snapshot file
    pub tree_snapshot: PathBuf,
}

impl ContentLayout {
    /// Layout rooted at conventional locations for a content folder name
    pub fn named(name: &str) -> Self {
        Self {
            assets: PathBuf::from(name),
            built: Path::new("Built").join(name),
            tree_snapshot: Path::new("Built").join(format!("{}_tree.json", name.to_lowercase())),
        }
    }

    /// Resolve relative paths against a project root
    pub fn resolve(&self, root: &Path) -> Self {
        Self {
            assets: root.join(&self.assets),
            built: root.join(&self.built),
            tree_snapshot: root.join(&self.tree_snapshot),
        }
    }
}

impl Default for ContentLayout {
    fn default() -> Self {
        Self::named("Assets")
    }
}

/// Asset store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory all relative layout paths are resolved against
    pub project_root: PathBuf,
    /// Main content tree
    pub main: ContentLayout,
    /// Optional editor content tree, rebuilt after the main one
    pub editor: Option<ContentLayout>,
    /// Rebuild everything on startup instead of loading the snapshot
    pub prebuild: bool,
    /// Start the file watcher on startup
    pub watch: bool,
    /// Config file this was loaded from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            main: ContentLayout::default(),
            editor: None,
            prebuild: false,
            watch: false,
            config_path: None,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl AssetsConfig {
    /// Configuration for a project directory with default layouts
    pub fn for_project(root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: root.into(),
            ..Default::default()
        }
    }

    /// Load configuration from all sources
    pub fn load() -> Self {
        let mut config = Self::default();

        // 1. Config file
        for path in CONFIG_FILES {
            let path = Path::new(path);
            if !path.is_file() {
                continue;
            }
            match Self::load_from_file(path) {
                Ok(loaded) => {
                    config = loaded;
                    log::info!("Loaded asset config from {}", path.display());
                    break;
                }
                Err(e) => log::warn!("Ignoring asset config {}: {}", path.display(), e),
            }
        }

        // 2. Environment
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> AssetResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AssetError::io(path, e))?;
        let mut config = Self::from_toml_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> AssetResult<Self> {
        toml::from_str(content).map_err(|e| AssetError::Config(e.to_string()))
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(root) = lookup("VOID_ASSETS_ROOT").filter(|r| !r.is_empty()) {
            self.project_root = PathBuf::from(root);
            log::info!("Asset project root from env: {}", self.project_root.display());
        }
        if let Some(value) = lookup("VOID_ASSETS_PREBUILD") {
            self.prebuild = parse_flag(&value);
        }
        if let Some(value) = lookup("VOID_ASSETS_WATCH") {
            self.watch = parse_flag(&value);
        }
    }

    /// Main layout with paths resolved against the project root
    pub fn main_layout(&self) -> ContentLayout {
        self.main.resolve(&self.project_root)
    }

    /// Editor layout with paths resolved against the project root
    pub fn editor_layout(&self) -> Option<ContentLayout> {
        self.editor.as_ref().map(|l| l.resolve(&self.project_root))
    }

    /// All resolved layouts, main first
    pub fn layouts(&self) -> Vec<ContentLayout> {
        std::iter::once(self.main_layout())
            .chain(self.editor_layout())
            .collect()
    }
}
