//! Service configuration.
//!
//! Loaded once at startup from an optional `config` file and `LTIDEMO__*`
//! environment variables.

mod loader;
mod static_config;

pub use loader::load_config;
pub use static_config::{
    LtiConfig, PlatformRegistration, ServerConfig, ServiceConfig, StateConfig, StorageConfig,
};
