use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;
use thiserror::Error;

use crate::sheet::MissingPolicy;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_USER: &str = "root";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid configuration file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid load {0:?}: expected FILE=TABLE")]
    LoadPair(String),
    #[error("unknown backend {0:?}: expected mysql or sqlite")]
    Backend(String),
    #[error("no database configured")]
    NoDatabase,
    #[error("no files to load")]
    NoLoads,
    #[error("{0} support was not compiled in")]
    Unsupported(BackendKind),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    MySql,
    Sqlite,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mysql" => Ok(BackendKind::MySql),
            "sqlite" => Ok(BackendKind::Sqlite),
            _ => Err(ConfigError::Backend(s.to_owned())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BackendKind::MySql => f.write_str("mysql"),
            BackendKind::Sqlite => f.write_str("sqlite"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Credentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    /// Database name; the database file path for SQLite.
    pub database: Option<String>,
    /// SQLite only: create the database file when it does not exist.
    pub create_if_missing: bool,
}

impl Default for Credentials {
    fn default() -> Self {
        Credentials {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            user: DEFAULT_USER.to_owned(),
            password: None,
            database: None,
            create_if_missing: false,
        }
    }
}

impl Credentials {
    pub fn database(&self) -> Result<&str, ConfigError> {
        self.database
            .as_deref()
            .filter(|db| !db.is_empty())
            .ok_or(ConfigError::NoDatabase)
    }
}

/// One spreadsheet file and the table it is loaded into.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadSpec {
    pub file: PathBuf,
    pub table: String,
    pub sheet: Option<String>,
}

impl FromStr for LoadSpec {
    type Err = ConfigError;

    /// Parse `FILE=TABLE`, splitting at the last `=`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('=') {
            Some((file, table)) if !file.is_empty() && !table.trim().is_empty() => Ok(LoadSpec {
                file: PathBuf::from(file),
                table: table.trim().to_owned(),
                sheet: None,
            }),
            _ => Err(ConfigError::LoadPair(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub backend: BackendKind,
    pub keep_going: bool,
    pub na_values: Option<Vec<String>>,
    pub connection: Credentials,
    #[serde(rename = "load")]
    pub loads: Vec<LoadSpec>,
}

impl Config {
    /// Read a configuration file.
    ///
    /// Relative spreadsheet paths are taken relative to the directory the
    /// file lives in.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let mut config = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        if let Some(base) = path.parent() {
            for load in &mut config.loads {
                if load.file.is_relative() {
                    load.file = base.join(&load.file);
                }
            }
        }
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn missing_policy(&self) -> MissingPolicy {
        match &self.na_values {
            Some(values) => MissingPolicy::new(values.iter().cloned()),
            None => MissingPolicy::default(),
        }
    }

    /// Check that there is something to connect to and something to load.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.connection.database()?;
        if self.loads.is_empty() {
            return Err(ConfigError::NoLoads);
        }
        if cfg!(not(feature = "mysql")) && self.backend == BackendKind::MySql {
            return Err(ConfigError::Unsupported(self.backend));
        }
        Ok(())
    }
}
