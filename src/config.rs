use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Path of the sqlite file holding OAuth credentials.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Track ids per add-tracks request. The Web API caps this at 100 and
    /// the materializer clamps to that.
    #[serde(default = "default_max_batch")]
    pub max_batch_size: usize,
}

fn app_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("playlist-album-regroup")
}

fn default_db_path() -> PathBuf {
    app_dir().join("credentials.db")
}
fn default_log_dir() -> PathBuf {
    app_dir().join("logs")
}
fn default_max_batch() -> usize {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_dir: default_log_dir(),
            max_batch_size: default_max_batch(),
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        Ok(cfg)
    }

    /// Where the config file lives unless --config overrides it.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("playlist-album-regroup")
            .join("config.toml")
    }
}
