//! Configuration file handling

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::paths::{find_config, resolve_relative};
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Name of the environment to run against
    #[serde(default = "default_env")]
    pub env: String,

    /// Target environments keyed by name
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentConfig>,

    /// Directory for the rolling log file
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Variable store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Auth token handling
    #[serde(default)]
    pub auth: AuthConfig,

    /// Case groups, executed in priority order
    #[serde(default)]
    pub groups: Vec<GroupConfig>,

    /// Directory that relative paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// A target environment
#[derive(Debug, Deserialize, Clone)]
pub struct EnvironmentConfig {
    /// Base URL every request path is appended to
    pub base_url: String,

    /// Per-request timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Store backend selection
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// YAML document on disk, re-read on every access
    #[default]
    File,
    /// In-process tree, discarded at the end of the run
    Memory,
}

/// Variable store settings
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Mutable shared-state document
    #[serde(default = "default_state_path")]
    pub state: PathBuf,

    /// Read-only fixtures document (login credentials and the like)
    pub fixtures: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            state: default_state_path(),
            fixtures: None,
        }
    }
}

/// Auth token handling
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Variable under `global.` holding the token
    #[serde(default = "default_token_var")]
    pub token_var: String,

    /// Header the token is sent in
    #[serde(default = "default_token_header")]
    pub token_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_var: default_token_var(),
            token_header: default_token_header(),
        }
    }
}

/// A group of cases loaded from one data file
#[derive(Debug, Deserialize, Clone)]
pub struct GroupConfig {
    pub name: String,

    /// Case data file
    pub cases: PathBuf,

    /// Lower runs first; groups without a priority run last
    pub priority: Option<u32>,

    /// Variables (under `global.`) that must be set before the group runs
    #[serde(default)]
    pub requires: Vec<String>,

    /// Fixture paths that must be present before the group runs
    #[serde(default)]
    pub fixtures: Vec<String>,
}

fn default_env() -> String {
    "test".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_timeout() -> u64 {
    10
}

fn default_state_path() -> PathBuf {
    PathBuf::from("config/user_vars.yaml")
}

fn default_token_var() -> String {
    "token".to_string()
}

fn default_token_header() -> String {
    "token".to_string()
}

impl Config {
    /// Load configuration, looking in the default locations when no path is given
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = find_config(explicit).ok_or_else(|| {
            Error::Config(format!(
                "No configuration file found. Create '{}' or pass --config",
                super::paths::CONFIG_FILE_NAME
            ))
        })?;
        Self::from_file(&path)
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::parse(&content, base_dir)
    }

    /// Parse configuration text; relative paths resolve against `base_dir`
    pub fn parse(content: &str, base_dir: PathBuf) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.base_dir = base_dir;

        let mut seen = std::collections::HashSet::new();
        for group in &config.groups {
            if !seen.insert(group.name.as_str()) {
                return Err(Error::Config(format!(
                    "Group '{}' is declared more than once",
                    group.name
                )));
            }
        }

        Ok(config)
    }

    /// Get the selected environment, honouring an override name
    pub fn environment(&self, name: Option<&str>) -> Result<&EnvironmentConfig> {
        let name = name.unwrap_or(&self.env);
        self.environments.get(name).ok_or_else(|| {
            let mut known: Vec<&str> = self.environments.keys().map(String::as_str).collect();
            known.sort_unstable();
            Error::Config(format!(
                "Unknown environment '{}'. Configured: {}",
                name,
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            ))
        })
    }

    /// Groups in execution order: by priority, unprioritised last, ties in declaration order
    pub fn ordered_groups(&self) -> Vec<&GroupConfig> {
        let mut groups: Vec<&GroupConfig> = self.groups.iter().collect();
        groups.sort_by_key(|g| g.priority.unwrap_or(u32::MAX));
        groups
    }

    /// Resolve a path from the config file against its directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        resolve_relative(&self.base_dir, path)
    }
}
