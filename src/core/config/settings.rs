use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::validation::{require_non_empty, validate_config, validate_http_url};
use super::ConfigError;

const REDACT_PLACEHOLDER: &str = "****";

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:8080";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Clone)]
pub struct AnthropicSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Clone)]
pub struct QdrantSettings {
    pub url: String,
    pub collection_name: String,
    pub api_key: Option<String>,
}

#[derive(Clone)]
pub struct EmbeddingSettings {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Skips the startup probe when set.
    pub dimension: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

/// Process-wide settings, read once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Settings {
    pub anthropic: AnthropicSettings,
    pub qdrant: QdrantSettings,
    pub embedding: EmbeddingSettings,
    pub server: ServerSettings,
    pub log_dir: PathBuf,
}

impl Settings {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let anthropic = AnthropicSettings {
            api_key: require_non_empty("ANTHROPIC_API_KEY", lookup("ANTHROPIC_API_KEY"))?,
            model: require_non_empty("ANTHROPIC_MODEL", lookup("ANTHROPIC_MODEL"))?,
            base_url: optional_url(&lookup, "ANTHROPIC_BASE_URL", DEFAULT_ANTHROPIC_BASE_URL)?,
        };

        let qdrant_url = require_non_empty("QDRANT_URL", lookup("QDRANT_URL"))?;
        validate_http_url("QDRANT_URL", &qdrant_url)?;
        let qdrant = QdrantSettings {
            url: qdrant_url.trim_end_matches('/').to_string(),
            collection_name: require_non_empty(
                "QDRANT_COLLECTION_NAME",
                lookup("QDRANT_COLLECTION_NAME"),
            )?,
            api_key: optional_value(&lookup, "QDRANT_API_KEY"),
        };

        let embedding = EmbeddingSettings {
            url: optional_url(&lookup, "EMBEDDING_URL", DEFAULT_EMBEDDING_URL)?,
            model: require_non_empty("EMBEDDING_MODEL", lookup("EMBEDDING_MODEL"))?,
            api_key: optional_value(&lookup, "EMBEDDING_API_KEY"),
            dimension: parse_dimension(optional_value(&lookup, "EMBEDDING_DIMENSION"))?,
        };

        let file_config = match optional_value(&lookup, "RAG_CONFIG_PATH") {
            Some(path) => load_yaml_file(Path::new(&path))?,
            None => Value::Object(Map::new()),
        };
        validate_config(&file_config)?;

        let server = resolve_server_settings(&file_config, &lookup)?;
        let log_dir = optional_value(&lookup, "LOG_DIR")
            .or_else(|| {
                file_config
                    .get("logging")
                    .and_then(|v| v.get("dir"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

        Ok(Settings {
            anthropic,
            qdrant,
            embedding,
            server,
            log_dir,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn optional_value<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn optional_url<F>(lookup: &F, key: &str, default: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let url = optional_value(lookup, key).unwrap_or_else(|| default.to_string());
    validate_http_url(key, &url)?;
    Ok(url.trim_end_matches('/').to_string())
}

fn parse_dimension(raw: Option<String>) -> Result<Option<usize>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.parse::<usize>() {
        Ok(0) | Err(_) => Err(ConfigError::invalid(
            "EMBEDDING_DIMENSION",
            "must be a positive integer",
        )),
        Ok(value) => Ok(Some(value)),
    }
}

fn resolve_server_settings<F>(config: &Value, lookup: &F) -> Result<ServerSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let server = config.get("server");

    let host = optional_value(lookup, "HOST")
        .or_else(|| {
            server
                .and_then(|v| v.get("host"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = match optional_value(lookup, "PORT") {
        Some(raw) => match raw.parse::<u16>() {
            Ok(0) | Err(_) => {
                return Err(ConfigError::invalid("PORT", "must be between 1 and 65535"))
            }
            Ok(port) => port,
        },
        None => server
            .and_then(|v| v.get("port"))
            .and_then(|v| v.as_u64())
            .map(|v| v as u16)
            .unwrap_or(DEFAULT_PORT),
    };

    let origins = server
        .and_then(|v| v.get("cors_allowed_origins"))
        .and_then(|v| v.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|item| item.as_str())
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    Ok(ServerSettings {
        host,
        port,
        cors_allowed_origins: if origins.is_empty() {
            default_local_origins()
        } else {
            origins
        },
    })
}

pub fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost".to_string(),
    ]
}

fn load_yaml_file(path: &Path) -> Result<Value, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::File {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_yaml::from_str::<Value>(&contents).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

fn redact(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| REDACT_PLACEHOLDER)
}

impl fmt::Debug for AnthropicSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicSettings")
            .field("api_key", &REDACT_PLACEHOLDER)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl fmt::Debug for QdrantSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QdrantSettings")
            .field("url", &self.url)
            .field("collection_name", &self.collection_name)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

impl fmt::Debug for EmbeddingSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingSettings")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("dimension", &self.dimension)
            .finish()
    }
}
