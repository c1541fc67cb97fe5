use anyhow::{anyhow, Context};
use regionlock_editor::{EditorIdentity, ProtectionMode, ProtectionOptions, StreamScope, TagPair};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "regionlock.config.json";

/// Regionlock configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Password used to unprotect and protect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Named regions that stay locked
    #[serde(default)]
    pub keep_locked: Vec<String>,

    /// Named regions made editable even when kept locked
    #[serde(default)]
    pub unlock: Vec<String>,

    /// Tag pairs whose interiors are always editable
    #[serde(default = "default_tags")]
    pub tags: Vec<TagPair>,

    /// "everyone" or a user name
    #[serde(default = "default_editor")]
    pub editor: String,

    #[serde(default)]
    pub mode: ProtectionMode,

    /// Enforce protection after granting
    #[serde(default = "default_protect")]
    pub protect: bool,

    /// Streams whose unnamed content becomes editable
    #[serde(default = "default_streams")]
    pub streams: Vec<StreamScope>,
}

fn default_tags() -> Vec<TagPair> {
    vec![TagPair {
        open: "[sgfs]".to_string(),
        close: "[sgfe]".to_string(),
    }]
}

fn default_editor() -> String {
    "everyone".to_string()
}

fn default_protect() -> bool {
    true
}

fn default_streams() -> Vec<StreamScope> {
    vec![StreamScope::Body]
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Load an explicitly named config file; it must exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Err(anyhow!("Config file not found: {}", path.display()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn editor_identity(&self) -> EditorIdentity {
        if self.editor.eq_ignore_ascii_case("everyone") {
            EditorIdentity::Everyone
        } else {
            EditorIdentity::User(self.editor.clone())
        }
    }

    pub fn protection_options(&self) -> ProtectionOptions {
        ProtectionOptions {
            keep_locked: self.keep_locked.iter().cloned().collect(),
            unlock: self.unlock.clone(),
            tags: self.tags.clone(),
            streams: self.streams.clone(),
            editor: self.editor_identity(),
            mode: self.mode,
            password: self.password.clone(),
            protect: self.protect,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            password: None,
            keep_locked: vec![],
            unlock: vec![],
            tags: default_tags(),
            editor: default_editor(),
            mode: ProtectionMode::ReadOnly,
            protect: default_protect(),
            streams: default_streams(),
        }
    }
}
