pub mod sources;

use std::path::PathBuf;
use std::time::Duration;

use biblib_core::read_path::ReadPathConfig;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_INDEX_URL: &str = "https://api.adsabs.harvard.edu/v1/search/bigquery";
pub const DEFAULT_IDENTITY_URL: &str = "https://api.adsabs.harvard.edu/v1/user";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ROWS: usize = 100;
pub const DEFAULT_RATE_LIMIT_MULTIPLIER: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub services: ServicesConfig,
    pub library: LibraryConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    /// Read-path tunables handed to the core services.
    pub fn read_path(&self) -> ReadPathConfig {
        ReadPathConfig {
            max_rows: self.library.max_rows,
            rate_limit_multiplier: self.library.rate_limit_multiplier,
            override_credential: self.library.override_credential.clone(),
            authorize_before_fetch: self.library.authorize_before_fetch,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServicesConfig {
    pub index_url: String,
    pub identity_url: String,
    pub service_token: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LibraryConfig {
    pub max_rows: usize,
    pub rate_limit_multiplier: f64,
    pub override_credential: Option<String>,
    pub authorize_before_fetch: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
