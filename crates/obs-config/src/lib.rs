mod service;

pub use service::{ConfigError, ServerConfig, DEFAULT_ADDRESS, DEFAULT_DATABASE_URL};
