// Configuration loading for SMRT applications

pub mod application;
pub mod env;
pub mod error;
pub mod loader;
pub mod manager;
pub mod validation;

pub use application::{ApplicationConfig, CONFIGURATION_ENV};
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use manager::ConfigManager;
pub use validation::{ConfigValidator, Validate};
