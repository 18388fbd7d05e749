use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use memoji::ServiceConfig;
use serde::{Deserialize, Serialize};

/// Server settings, read from an optional TOML file.
///
/// Missing keys take their defaults. Command line flags are applied on top
/// with [`Overrides::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub assets: PathBuf,
    pub storage: PathBuf,
    /// Name dictionary, the built-in one when absent
    pub names: Option<PathBuf>,
    /// Seconds an artifact is remembered as present
    pub existence_ttl: u64,
    pub decoded_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_owned(),
            assets: PathBuf::from("./public/images/avatars"),
            storage: PathBuf::from("./storage/avatars"),
            names: None,
            existence_ttl: 3600,
            decoded_capacity: 128,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            assets: self.assets.clone(),
            storage: self.storage.clone(),
            existence_ttl: Duration::from_secs(self.existence_ttl),
            decoded_capacity: self.decoded_capacity,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Address to listen on [default: 127.0.0.1:8080]
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Root of the male/, female/ and v1/ asset directories
    #[arg(short, long)]
    pub assets: Option<PathBuf>,

    /// Directory for rendered avatars
    #[arg(short, long)]
    pub storage: Option<PathBuf>,

    /// Tab-separated name dictionary
    #[arg(short, long)]
    pub names: Option<PathBuf>,

    /// Seconds an existing avatar is remembered without checking the disk
    #[arg(long)]
    pub existence_ttl: Option<u64>,

    /// Number of decoded base images kept in memory
    #[arg(long)]
    pub decoded_capacity: Option<usize>,
}

impl Overrides {
    pub fn apply(self, config: &mut ServerConfig) {
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(assets) = self.assets {
            config.assets = assets;
        }
        if let Some(storage) = self.storage {
            config.storage = storage;
        }
        if let Some(names) = self.names {
            config.names = Some(names);
        }
        if let Some(ttl) = self.existence_ttl {
            config.existence_ttl = ttl;
        }
        if let Some(capacity) = self.decoded_capacity {
            config.decoded_capacity = capacity;
        }
    }
}
