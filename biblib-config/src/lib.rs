//! Shared configuration library for biblib.
//!
//! Values are composed from (highest precedence first) environment
//! variables, a TOML file and built-in defaults. A `.env` file is loaded into
//! the environment before anything else is read.

pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{
    Config, ConfigMetadata, DatabaseConfig, LibraryConfig, ServerConfig,
    ServicesConfig,
};
pub use validation::{ConfigWarning, ConfigWarnings};
