use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::Deserialize;

pub const CONFIG_PATH_ENV: &str = "SOLAR_SIZING_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub catalog: CatalogConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: IpAddr::from([0, 0, 0, 0]), port: 8080 }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Empty `allowed_origins` mirrors the caller's Origin header.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// Remote equipment catalog. Without `base_url` the built-in catalog is served.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_s: u64,
    pub max_retries: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { base_url: None, api_key: None, timeout_s: 10, max_retries: 2 }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LogConfig {
    pub json: bool,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Path from `SOLAR_SIZING_CONFIG`, else `config.json`. A missing file
    /// yields the defaults; a malformed one is an error.
    pub fn load_or_default() -> Result<(Self, Option<String>), Box<dyn std::error::Error>> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        if Path::new(&path).exists() {
            Ok((Self::load(&path)?, Some(path)))
        } else {
            Ok((Self::default(), None))
        }
    }
}
