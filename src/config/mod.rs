//! Configuration module
//!
//! Two pieces live here:
//! - [`Paths`]: process-level locations (home, cwd), built once in `main`
//!   and threaded into the scope resolver.
//! - [`Config`]: the per-scope document at `<store>/config.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use toml_edit::{DocumentMut, Item, Table};

use crate::error::{MemError, OpContext, Result};
use crate::hook::Strategy;

/// Environment variable overriding the home directory used for the global scope
pub const HOME_ENV: &str = "MEM_HOME";

/// Default key prefix for memories derived by the commit hook
pub const DEFAULT_HOOK_PREFIX: &str = "hooks/commits";

/// Process-level filesystem locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub home: PathBuf,
    pub cwd: PathBuf,
}

impl Paths {
    pub fn new(home: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            cwd: cwd.into(),
        }
    }

    /// Detect locations from the environment
    ///
    /// Priority for home: `MEM_HOME`, then the platform home directory.
    pub fn detect() -> Result<Self> {
        let cwd = std::env::current_dir().op("get working directory")?;

        let home = match std::env::var_os(HOME_ENV) {
            Some(h) if !h.is_empty() => PathBuf::from(h),
            _ => directories::BaseDirs::new()
                .map(|b| b.home_dir().to_path_buf())
                .ok_or_else(|| MemError::Config("cannot determine home directory".into()))?,
        };

        Ok(Self { home, cwd })
    }
}

/// Per-scope configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,

    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub providers: BTreeMap<String, ProviderConfig>,

    #[serde(default)]
    pub hooks: HooksConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingsConfig {
    /// `http` for an OpenAI-compatible endpoint; anything else disables embeddings
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default)]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            model: String::new(),
            base_url: None,
            api_key: None,
            dimension: default_dimension(),
        }
    }
}

fn default_backend() -> String {
    "none".to_string()
}

fn default_dimension() -> usize {
    384
}

/// A registered text-completion provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HooksConfig {
    #[serde(default)]
    pub post_commit: HookConfig,
}

/// Settings for the managed post-commit hook
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HookConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Scope hint the hook was installed with ("" resolves normally)
    #[serde(default)]
    pub scope: String,

    #[serde(default)]
    pub strategy: Strategy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<PathBuf>,

    #[serde(default = "default_hook_prefix")]
    pub key_prefix: String,

    #[serde(default)]
    pub quiet: bool,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scope: String::new(),
            strategy: Strategy::default(),
            script: None,
            key_prefix: default_hook_prefix(),
            quiet: false,
        }
    }
}

fn default_hook_prefix() -> String {
    DEFAULT_HOOK_PREFIX.to_string()
}

impl Config {
    /// Load config from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).op("read config"),
        };
        toml::from_str(&content).map_err(|e| MemError::Config(format!("parse config: {}", e)))
    }

    /// Save the whole config to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MemError::Config(format!("serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).op("create config directory")?;
        }
        std::fs::write(path, content).op("write config")
    }

    /// Replace `[hooks.post_commit]` in place, leaving the rest of the document untouched
    pub fn save_hook(path: &Path, hook: &HookConfig) -> Result<()> {
        let existing = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e).op("read config"),
        };

        let mut doc: DocumentMut = existing
            .parse()
            .map_err(|e| MemError::Config(format!("parse config: {}", e)))?;

        let rendered = toml::to_string(hook)
            .map_err(|e| MemError::Config(format!("serialize hook config: {}", e)))?;
        let fragment: DocumentMut = rendered
            .parse()
            .map_err(|e| MemError::Config(format!("render hook config: {}", e)))?;

        if !doc.contains_table("hooks") {
            let mut hooks = Table::new();
            hooks.set_implicit(true);
            doc.insert("hooks", Item::Table(hooks));
        }
        doc["hooks"]["post_commit"] = Item::Table(fragment.as_table().clone());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).op("create config directory")?;
        }
        std::fs::write(path, doc.to_string()).op("write config")
    }
}
