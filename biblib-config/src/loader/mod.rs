pub mod error;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::models::sources::{EnvConfig, FileConfig};
use crate::models::{
    Config, ConfigMetadata, DEFAULT_HOST, DEFAULT_IDENTITY_URL, DEFAULT_INDEX_URL,
    DEFAULT_MAX_ROWS, DEFAULT_PORT, DEFAULT_RATE_LIMIT_MULTIPLIER,
    DEFAULT_TIMEOUT_SECS, DatabaseConfig, LibraryConfig, ServerConfig,
    ServicesConfig,
};
use crate::util::parse_bool;
use crate::validation::ConfigWarnings;
use error::ConfigLoadError;

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["biblib.toml", "config/biblib.toml"];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Load `.env`, then compose from the process environment.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Compose from an already gathered environment, skipping `.env`.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) = compose_config(file_config, env, config_path)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigLoadError::MissingConfig { path });
                }
                path
            }
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        let file_config = read_file_config(&path)?;
        Ok((Some(file_config), Some(path)))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|err| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source: err,
        })?;
    toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source: err,
    })
}

fn parse_env<T: FromStr>(
    key: &'static str,
    raw: Option<&str>,
) -> Result<Option<T>, ConfigLoadError> {
    raw.map(|value| {
        value.parse::<T>().map_err(|_| ConfigLoadError::InvalidValue {
            key,
            value: value.to_string(),
        })
    })
    .transpose()
}

fn parse_env_bool(
    key: &'static str,
    raw: Option<&str>,
) -> Result<Option<bool>, ConfigLoadError> {
    raw.map(|value| {
        parse_bool(value).ok_or_else(|| ConfigLoadError::InvalidValue {
            key,
            value: value.to_string(),
        })
    })
    .transpose()
}

fn validate_url(key: &'static str, raw: String) -> Result<String, ConfigLoadError> {
    Url::parse(&raw).map_err(|source| ConfigLoadError::InvalidUrl { key, source })?;
    Ok(raw)
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if config_path.is_none() {
        warnings.push_with_hint(
            "No biblib.toml detected; falling back to environment variables",
            "Create biblib.toml or set BIBLIB_CONFIG_PATH",
        );
    }

    let FileConfig {
        server: file_server,
        database: file_database,
        services: file_services,
        library: file_library,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: parse_env::<u16>("SERVER_PORT", env.server_port.as_deref())?
            .or(file_server.port)
            .unwrap_or(DEFAULT_PORT),
    };

    let database = DatabaseConfig {
        url: env.database_url.clone().or(file_database.url),
    };
    if database.url.is_none() {
        warnings.push_with_hint(
            "DATABASE_URL not configured",
            "Set DATABASE_URL or run with --in-memory",
        );
    }

    let timeout_secs =
        parse_env::<u64>("BIBLIB_SERVICE_TIMEOUT_SECS", env.timeout_secs.as_deref())?
            .or(file_services.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let services = ServicesConfig {
        index_url: validate_url(
            "BIBLIB_SOLR_BIG_QUERY_URL",
            env.index_url
                .clone()
                .or(file_services.index_url)
                .unwrap_or_else(|| DEFAULT_INDEX_URL.to_string()),
        )?,
        identity_url: validate_url(
            "BIBLIB_USER_EMAIL_ADSWS_API_URL",
            env.identity_url
                .clone()
                .or(file_services.identity_url)
                .unwrap_or_else(|| DEFAULT_IDENTITY_URL.to_string()),
        )?,
        service_token: env.service_token.clone().or(file_services.service_token),
        timeout: Duration::from_secs(timeout_secs),
    };
    if services.service_token.is_none() {
        warnings.push("BIBLIB_SERVICE_TOKEN not configured; upstream calls are unauthenticated");
    }

    let mut rate_limit_multiplier = parse_env::<f64>(
        "BIBLIB_RATE_LIMIT_MULTIPLIER",
        env.rate_limit_multiplier.as_deref(),
    )?
    .or(file_library.rate_limit_multiplier)
    .unwrap_or(DEFAULT_RATE_LIMIT_MULTIPLIER);
    if !(rate_limit_multiplier.is_finite() && rate_limit_multiplier > 0.0) {
        warnings.push(format!(
            "rate_limit_multiplier {rate_limit_multiplier} is not positive; using {DEFAULT_RATE_LIMIT_MULTIPLIER}"
        ));
        rate_limit_multiplier = DEFAULT_RATE_LIMIT_MULTIPLIER;
    }

    let raw_credential = env
        .override_credential
        .clone()
        .or(file_library.override_credential);
    let override_credential = raw_credential
        .as_deref()
        .map(str::trim)
        .filter(|credential| !credential.is_empty())
        .map(str::to_string);
    if raw_credential.is_some() && override_credential.is_none() {
        warnings.push("READONLY_ALL_LIBRARIES_TOKEN is blank; override reads are disabled");
    }

    let library = LibraryConfig {
        max_rows: parse_env::<usize>("BIBLIB_MAX_ROWS", env.max_rows.as_deref())?
            .or(file_library.max_rows)
            .unwrap_or(DEFAULT_MAX_ROWS),
        rate_limit_multiplier,
        override_credential,
        authorize_before_fetch: parse_env_bool(
            "BIBLIB_AUTHORIZE_BEFORE_FETCH",
            env.authorize_before_fetch.as_deref(),
        )?
        .or(file_library.authorize_before_fetch)
        .unwrap_or(false),
    };

    let config = Config {
        server,
        database,
        services,
        library,
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded: false,
        },
    };
    Ok((config, warnings))
}
