use crate::constants::*;
use crate::error::{IngestError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Optional `ingest.toml` contents; every field may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    csv_path: Option<PathBuf>,
    batch_size: Option<usize>,
    strict: Option<bool>,
    #[serde(default)]
    neo4j: FileNeo4jConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileNeo4jConfig {
    uri: Option<String>,
    user: Option<String>,
    password: Option<String>,
    database: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl Neo4jConfig {
    /// Credentials are never baked in; a run that touches the database must
    /// supply a password through the config file or `NEO4J_PASSWORD`.
    pub fn password(&self) -> Result<&str> {
        self.password.as_deref().ok_or_else(|| {
            IngestError::Config(format!(
                "no Neo4j password configured (set {} or [neo4j].password)",
                ENV_NEO4J_PASSWORD
            ))
        })
    }
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub csv_path: PathBuf,
    pub batch_size: usize,
    pub strict: bool,
    pub neo4j: Neo4jConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            batch_size: DEFAULT_BATCH_SIZE,
            strict: false,
            neo4j: Neo4jConfig {
                uri: DEFAULT_NEO4J_URI.to_string(),
                user: DEFAULT_NEO4J_USER.to_string(),
                password: None,
                database: None,
            },
        }
    }
}

impl IngestConfig {
    /// Defaults, then the TOML file, then process environment.
    ///
    /// An explicitly named file must exist; the default `ingest.toml` is
    /// only read when present.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let (path, explicit) = match config_path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        if explicit || path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                IngestError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            config.apply_toml(&content)?;
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_toml(&mut self, content: &str) -> Result<()> {
        let file: FileConfig = toml::from_str(content)?;
        if let Some(path) = file.csv_path {
            self.csv_path = path;
        }
        if let Some(size) = file.batch_size {
            self.batch_size = size;
        }
        if let Some(strict) = file.strict {
            self.strict = strict;
        }
        if let Some(uri) = file.neo4j.uri {
            self.neo4j.uri = uri;
        }
        if let Some(user) = file.neo4j.user {
            self.neo4j.user = user;
        }
        if file.neo4j.password.is_some() {
            self.neo4j.password = file.neo4j.password;
        }
        if file.neo4j.database.is_some() {
            self.neo4j.database = file.neo4j.database;
        }
        Ok(())
    }

    /// Overlay values from an environment lookup (injected for tests).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = non_empty(ENV_CSV_PATH) {
            self.csv_path = PathBuf::from(path);
        }
        if let Some(uri) = non_empty(ENV_NEO4J_URI) {
            self.neo4j.uri = uri;
        }
        if let Some(user) = non_empty(ENV_NEO4J_USER) {
            self.neo4j.user = user;
        }
        if let Some(password) = non_empty(ENV_NEO4J_PASSWORD) {
            self.neo4j.password = Some(password);
        }
        if let Some(database) = non_empty(ENV_NEO4J_DATABASE) {
            self.neo4j.database = Some(database);
        }
        if let Some(size) = non_empty(ENV_BATCH_SIZE) {
            self.batch_size = size.trim().parse().map_err(|_| {
                IngestError::Config(format!("{} must be a positive integer, got '{}'", ENV_BATCH_SIZE, size))
            })?;
        }
        if let Some(strict) = non_empty(ENV_STRICT) {
            self.strict = parse_bool(&strict).ok_or_else(|| {
                IngestError::Config(format!("{} must be a boolean, got '{}'", ENV_STRICT, strict))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(IngestError::Config("batch size must be at least 1".to_string()));
        }
        if self.neo4j.uri.trim().is_empty() {
            return Err(IngestError::Config("Neo4j URI must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
