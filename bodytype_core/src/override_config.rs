use std::{
    env, fs, io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use thiserror::Error;

use crate::affordance::AffordanceConfig;
use crate::record_adapter::{CommitProbe, RecordLayout};

pub const BUILTIN_OVERRIDE_CONFIG: &str = include_str!("data/override_config.json");

pub const DEFAULT_STATE_PATH: &str = "plugins/BodyTypes/player_state.json";
pub const DEFAULT_COMMAND_BIND: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 41010);

/// Everything the override needs to know about the host's appearance API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverrideConfig {
    layout: RecordLayout,
    commit: CommitProbe,
    target_field: String,
    enabled_value: String,
    default_value: String,
    affordance: AffordanceConfig,
}

impl Default for OverrideConfig {
    fn default() -> Self {
        Self {
            layout: RecordLayout::default(),
            commit: CommitProbe::default(),
            target_field: "body_characteristic".to_string(),
            enabled_value: "Athletic".to_string(),
            default_value: "Default".to_string(),
            affordance: AffordanceConfig::default(),
        }
    }
}

impl OverrideConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_OVERRIDE_CONFIG)
                .expect("builtin override config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, OverrideConfigError> {
        let contents =
            fs::read_to_string(path).map_err(|source| OverrideConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let config = OverrideConfig::from_json_str(&contents)?;
        Ok(config)
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    pub fn commit(&self) -> &CommitProbe {
        &self.commit
    }

    pub fn target_field(&self) -> &str {
        &self.target_field
    }

    /// Position of the overridden sub-field in the layout.
    pub fn target_index(&self) -> Option<usize> {
        self.layout.index_of(&self.target_field)
    }

    /// Value written while the user is opted in.
    pub fn enabled_value(&self) -> &str {
        &self.enabled_value
    }

    /// Value restored on opt-out when no original was remembered.
    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    pub fn affordance(&self) -> &AffordanceConfig {
        &self.affordance
    }

    #[must_use]
    pub fn with_layout(mut self, layout: RecordLayout, target_field: impl Into<String>) -> Self {
        self.layout = layout;
        self.target_field = target_field.into();
        self
    }

    #[must_use]
    pub fn with_commit(mut self, commit: CommitProbe) -> Self {
        self.commit = commit;
        self
    }

    #[must_use]
    pub fn with_values(mut self, enabled: impl Into<String>, default: impl Into<String>) -> Self {
        self.enabled_value = enabled.into();
        self.default_value = default.into();
        self
    }
}

#[derive(Debug, Error)]
pub enum OverrideConfigError {
    #[error("failed to parse override config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read override config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Metadata about the override configuration source.
#[derive(Debug, Clone)]
pub struct OverrideConfigMetadata {
    path: Option<PathBuf>,
}

impl OverrideConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

pub fn load_override_config_from_env() -> (Arc<OverrideConfig>, OverrideConfigMetadata) {
    let override_path = env::var("BODYTYPES_CONFIG_PATH").ok().map(PathBuf::from);
    let default_path =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/data/override_config.json");

    let candidates: Vec<PathBuf> = match override_path {
        Some(ref path) => vec![path.clone()],
        None => vec![default_path.clone()],
    };

    for path in candidates {
        match OverrideConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "bodytypes::config",
                    path = %path.display(),
                    "override_config.loaded=file"
                );
                return (Arc::new(config), OverrideConfigMetadata::new(Some(path)));
            }
            Err(err) => {
                tracing::warn!(
                    target: "bodytypes::config",
                    path = %path.display(),
                    error = %err,
                    "override_config.load_failed"
                );
            }
        }
    }

    let config = OverrideConfig::builtin();
    tracing::info!(
        target: "bodytypes::config",
        "override_config.loaded=builtin"
    );
    (config, OverrideConfigMetadata::new(None))
}

/// Location of the persisted player state.
pub fn state_path_from_env() -> PathBuf {
    env::var("BODYTYPES_STATE_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH))
}

/// Address the line-command server listens on.
pub fn command_bind_from_env() -> SocketAddr {
    match env::var("BODYTYPES_COMMAND_BIND") {
        Ok(value) => match value.trim().parse() {
            Ok(addr) => addr,
            Err(err) => {
                tracing::warn!(
                    target: "bodytypes::config",
                    value = %value,
                    error = %err,
                    fallback = %DEFAULT_COMMAND_BIND,
                    "command_bind.invalid"
                );
                DEFAULT_COMMAND_BIND
            }
        },
        Err(_) => DEFAULT_COMMAND_BIND,
    }
}
