use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StorageConfig {
    /// Path of the index database file.
    pub path: PathBuf,

    /// Size (in Mb) of the database cache
    pub cache: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/index.redb"),
            cache: None,
        }
    }
}

/// Location of the node exports consumed by the file bridge.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct BridgeConfig {
    pub node_info: Option<PathBuf>,
    pub snapshot: Option<PathBuf>,
    pub events: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QueryConfig {
    /// Upper bound applied to the page size requested by clients.
    pub max_page_size: u32,
}

impl QueryConfig {
    /// Clamps a requested page size. Zero (unpaginated) is capped too.
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        match requested {
            Some(x) if x > 0 && x <= self.max_page_size => x,
            _ => self.max_page_size,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_page_size: 1000,
        }
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug)]
pub struct LoggingConfig {
    #[serde_as(as = "DisplayFromStr")]
    pub max_level: tracing::Level,

    #[serde(default)]
    pub include_redb: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            max_level: tracing::Level::INFO,
            include_redb: Default::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct RootConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub bridge: BridgeConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}
