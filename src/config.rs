use std::{env, path::PathBuf};

use color_eyre::Result;
use lazy_static::lazy_static;
use serde::Deserialize;

use directories::BaseDirs;

use crate::core::column::ColumnCatalog;
use crate::session::SessionPolicy;

const CONFIG: &str = include_str!("../.config/config.json5");

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub config_dir: PathBuf,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default, flatten)]
    pub config: AppConfig,
    #[serde(default)]
    pub columns: ColumnCatalog,
    #[serde(default)]
    pub session: SessionPolicy,
}

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref DATA_FOLDER: Option<PathBuf> =
        env::var(format!("{}_DATA", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
    pub static ref CONFIG_FOLDER: Option<PathBuf> =
        env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
}

impl Config {
    /// The defaults compiled into the binary
    pub fn embedded() -> Result<Self, config::ConfigError> {
        json5::from_str(CONFIG)
            .map_err(|e| config::ConfigError::Message(format!("embedded config: {e}")))
    }

    /// Load configuration. An explicit path must exist; otherwise
    /// `~/.filterkit-config.json5` is read when present. Anything the user file
    /// leaves out falls back to the embedded defaults.
    pub fn from_path(config_path: Option<&PathBuf>) -> Result<Self, config::ConfigError> {
        let default_config = Self::embedded()?;
        let data_dir = get_data_dir();
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.to_string_lossy().to_string())?
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?;

        builder = match config_path {
            Some(p) => builder.add_source(
                config::File::from(expand_tilde(p))
                    .format(config::FileFormat::Json5)
                    .required(true),
            ),
            None => builder.add_source(
                config::File::from(default_home_config_path())
                    .format(config::FileFormat::Json5)
                    .required(false),
            ),
        };

        let mut cfg: Self = builder.build()?.try_deserialize()?;

        if cfg.columns.is_empty() {
            cfg.columns = default_config.columns;
        }

        Ok(cfg)
    }

    /// Directory the JSON sink writes saved filters into
    pub fn filters_dir(&self) -> PathBuf {
        self.config.data_dir.join("filters")
    }
}

fn expand_tilde(path: &PathBuf) -> PathBuf {
    if let Some(s) = path.to_str() {
        if s.starts_with("~") {
            if let Some(base) = BaseDirs::new() { return PathBuf::from(s.replacen("~", base.home_dir().to_str().unwrap_or(""), 1)); }
        }
    }
    path.clone()
}

fn default_home_config_path() -> PathBuf {
    if let Some(base) = BaseDirs::new() {
        return base.home_dir().join(".filterkit-config.json5");
    }
    PathBuf::from(".filterkit-config.json5")
}

pub fn get_data_dir() -> PathBuf {
    if let Some(s) = DATA_FOLDER.clone() {
        s
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_config_dir() -> PathBuf {
    if let Some(s) = CONFIG_FOLDER.clone() {
        s
    } else {
        PathBuf::from(".").join(".config")
    }
}
