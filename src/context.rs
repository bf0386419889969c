//! Run context
//!
//! Everything a case needs besides the dispatcher: the mutable state store,
//! the read-only fixture store and the auth token settings. It is created
//! once per run and threaded through the executor explicitly.

use tracing::info;

use crate::common::config::{AuthConfig, Config, StoreBackend};
use crate::common::{Error, Result};
use crate::store::{MemoryStore, VariableStore, YamlFileStore};
use crate::template::Resolver;

/// State shared by all cases of a run
pub struct RunContext {
    pub state: Box<dyn VariableStore>,
    pub fixtures: Option<Box<dyn VariableStore>>,
    pub auth: AuthConfig,
}

impl RunContext {
    pub fn new(state: Box<dyn VariableStore>) -> Self {
        Self {
            state,
            fixtures: None,
            auth: AuthConfig::default(),
        }
    }

    pub fn with_fixtures(mut self, fixtures: Box<dyn VariableStore>) -> Self {
        self.fixtures = Some(fixtures);
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    /// Build the stores described by the configuration
    ///
    /// File-backed stores must exist up front; a missing file is a
    /// configuration error raised before any case runs.
    pub fn from_config(config: &Config) -> Result<Self> {
        let state: Box<dyn VariableStore> = match config.store.backend {
            StoreBackend::File => {
                let path = config.resolve(&config.store.state);
                if !path.exists() {
                    return Err(Error::store_not_found(&path));
                }
                Box::new(YamlFileStore::new(path))
            }
            StoreBackend::Memory => Box::new(MemoryStore::new()),
        };

        let fixtures: Option<Box<dyn VariableStore>> = match &config.store.fixtures {
            Some(path) => {
                let path = config.resolve(path);
                if !path.exists() {
                    return Err(Error::store_not_found(&path));
                }
                Some(Box::new(YamlFileStore::new(path)))
            }
            None => None,
        };

        info!(
            "Variable store: {}{}",
            state.describe(),
            fixtures
                .as_ref()
                .map(|f| format!(", fixtures: {}", f.describe()))
                .unwrap_or_default()
        );

        Ok(Self {
            state,
            fixtures,
            auth: config.auth.clone(),
        })
    }

    /// A resolver over this context's stores
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self.state.as_ref(), self.fixtures.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_from_config_missing_state_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::parse("", dir.path().to_path_buf()).unwrap();
        let err = RunContext::from_config(&config).err().unwrap();
        assert!(matches!(err, Error::StoreNotFound { .. }));
    }

    #[test]
    fn test_from_config_memory_backend() {
        let config = Config::parse("[store]\nbackend = \"memory\"\n", PathBuf::from("/nowhere"))
            .unwrap();
        let mut ctx = RunContext::from_config(&config).unwrap();
        ctx.state.set("global.token", json!("t")).unwrap();
        assert_eq!(ctx.resolver().lookup("token").unwrap(), Some(json!("t")));
    }

    #[test]
    fn test_from_config_file_backend_with_fixtures() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        std::fs::write(dir.path().join("config/user_vars.yaml"), "global: {}\n").unwrap();
        std::fs::write(
            dir.path().join("config/fixtures.yaml"),
            "user:\n  username: '13800000000'\n",
        )
        .unwrap();

        let config = Config::parse(
            "[store]\nfixtures = \"config/fixtures.yaml\"\n\n[auth]\ntoken_header = \"x-token\"\n",
            dir.path().to_path_buf(),
        )
        .unwrap();
        let ctx = RunContext::from_config(&config).unwrap();
        assert_eq!(ctx.auth.token_header, "x-token");
        assert_eq!(
            ctx.resolver().lookup("user.username").unwrap(),
            Some(json!("13800000000"))
        );
    }
}
