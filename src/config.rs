use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf};

const DEFAULT_CONFIG_PATH: &str = ".config/order_extract.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default = "default_store_results")]
    pub store_results: bool,
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
    /// Files picked up by `batch`, without the dot.
    #[serde(default = "default_export_extension")]
    pub export_extension: String,
}

fn default_db_path() -> String {
    "orderstore/orders.db".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_store_results() -> bool {
    true
}

fn default_batch_concurrency() -> usize {
    4
}

fn default_export_extension() -> String {
    "txt".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_filter: default_log_filter(),
            store_results: default_store_results(),
            batch_concurrency: default_batch_concurrency(),
            export_extension: default_export_extension(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Like [`Config::load`], but a missing file just means defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut cfg: Config = toml::from_str(content)?;
        cfg.batch_concurrency = cfg.batch_concurrency.max(1);
        Ok(cfg)
    }

    pub fn path() -> PathBuf {
        env::var("ORDER_EXTRACT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}
