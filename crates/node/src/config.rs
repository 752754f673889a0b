// node/src/config.rs
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Directory holding the database and genesis file
    pub home: String,
    pub rpc: RpcConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub gamm: GammConfig,
    #[serde(default)]
    pub epochs: Vec<EpochConfig>,
    #[serde(default)]
    pub upgrades: Vec<UpgradeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub enabled: bool,
    pub listen_addr: SocketAddr,
    pub cors_origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub max_open_files: i32,
    pub write_buffer_size_mb: usize,
    pub pool_cache_capacity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GammConfig {
    /// Coin string such as `1000uosmo`; overrides the stored module params when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_creation_fee: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochConfig {
    pub identifier: String,
    pub duration_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeConfig {
    pub name: String,
    pub height: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            home: "./gammd".into(),
            rpc: RpcConfig {
                enabled: true,
                listen_addr: SocketAddr::from(([127, 0, 0, 1], 1317)),
                cors_origin: "*".into(),
            },
            storage: StorageConfig {
                max_open_files: 1024,
                write_buffer_size_mb: 64,
                pool_cache_capacity: 256,
            },
            gamm: GammConfig::default(),
            epochs: vec![
                EpochConfig {
                    identifier: "day".into(),
                    duration_secs: 86_400,
                },
                EpochConfig {
                    identifier: "week".into(),
                    duration_secs: 7 * 86_400,
                },
            ],
            upgrades: vec![],
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        Path::new(&self.home).join("db")
    }

    pub fn genesis_path(&self) -> PathBuf {
        Path::new(&self.home).join("genesis.json")
    }

    pub fn config_path(&self) -> PathBuf {
        Path::new(&self.home).join("config.toml")
    }
}
