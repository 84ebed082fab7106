use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::util::non_empty;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub services: FileServicesConfig,
    #[serde(default)]
    pub library: FileLibraryConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServicesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileLibraryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_multiplier: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_credential: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorize_before_fetch: Option<bool>,
}

/// Environment-derived configuration values. Numeric and boolean values are
/// kept raw so the loader can report the ones that fail to parse.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<String>,
    pub database_url: Option<String>,
    pub index_url: Option<String>,
    pub identity_url: Option<String>,
    pub service_token: Option<String>,
    pub timeout_secs: Option<String>,
    pub max_rows: Option<String>,
    pub rate_limit_multiplier: Option<String>,
    pub override_credential: Option<String>,
    pub authorize_before_fetch: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset,
    /// except the override credential, whose blankness the loader reports.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| non_empty(lookup(key));
        Self {
            config_path: var("BIBLIB_CONFIG_PATH").map(PathBuf::from),
            server_host: var("SERVER_HOST"),
            server_port: var("SERVER_PORT"),
            database_url: var("DATABASE_URL"),
            index_url: var("BIBLIB_SOLR_BIG_QUERY_URL"),
            identity_url: var("BIBLIB_USER_EMAIL_ADSWS_API_URL"),
            service_token: var("BIBLIB_SERVICE_TOKEN"),
            timeout_secs: var("BIBLIB_SERVICE_TIMEOUT_SECS"),
            max_rows: var("BIBLIB_MAX_ROWS"),
            rate_limit_multiplier: var("BIBLIB_RATE_LIMIT_MULTIPLIER"),
            override_credential: lookup("READONLY_ALL_LIBRARIES_TOKEN"),
            authorize_before_fetch: var("BIBLIB_AUTHORIZE_BEFORE_FETCH"),
        }
    }
}
