use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::cli::Cli;
use crate::engine::EngineOptions;
use crate::model::HISTORY_CAP;
use crate::namespace::{self, Namespace, NamespaceError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("invalid config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("invalid key_prefix: {0}")]
    Prefix(#[from] NamespaceError),
}

/// Settings read from `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub db_path: Option<PathBuf>,
    pub key_prefix: Option<String>,
    pub history_cap: Option<usize>,
    pub max_write_attempts: Option<u32>,
    pub tenant: Option<String>,
}

impl FileConfig {
    pub fn parse(source: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source, path)
    }
}

/// Location of the config file (~/.config/skcstore/config.toml or platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "skcstore")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` means the platform data directory.
    pub db_path: Option<PathBuf>,
    pub tenant: String,
    pub namespace: Namespace,
    pub history_cap: usize,
    pub max_write_attempts: u32,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: None,
            tenant: namespace::ANONYMOUS_TENANT.to_string(),
            namespace: Namespace::default(),
            history_cap: HISTORY_CAP,
            max_write_attempts: 3,
            verbose: false,
        }
    }
}

impl Config {
    /// Defaults, then the config file, then command-line flags.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        let file = match &cli.config {
            Some(path) => Some(FileConfig::load(path)?),
            None => match default_config_path() {
                Some(path) if path.exists() => Some(FileConfig::load(&path)?),
                _ => None,
            },
        };
        if let Some(file) = file {
            config.merge_file(file)?;
        }

        if let Some(db) = &cli.db {
            config.db_path = Some(db.clone());
        }
        if let Some(tenant) = &cli.tenant {
            config.tenant = namespace::tenant_or_anonymous(Some(tenant)).to_string();
        }
        config.verbose = cli.verbose;

        Ok(config)
    }

    pub fn merge_file(&mut self, file: FileConfig) -> Result<(), ConfigError> {
        if let Some(db_path) = file.db_path {
            self.db_path = Some(db_path);
        }
        if let Some(prefix) = file.key_prefix {
            self.namespace = Namespace::new(prefix)?;
        }
        if let Some(cap) = file.history_cap {
            self.history_cap = cap;
        }
        if let Some(attempts) = file.max_write_attempts {
            self.max_write_attempts = attempts.max(1);
        }
        if let Some(tenant) = file.tenant {
            self.tenant = namespace::tenant_or_anonymous(Some(&tenant)).to_string();
        }
        Ok(())
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            namespace: self.namespace.clone(),
            history_cap: self.history_cap,
            max_write_attempts: self.max_write_attempts,
        }
    }
}
