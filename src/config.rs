use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::api::Endpoints;
use crate::domain::{AppError, Result};
use crate::logging::LOG_ENV;

/// Environment variable naming the compatibility layer's data root
pub const COMPAT_DATA_ENV: &str = "STEAM_COMPAT_DATA_PATH";

/// Optional overrides read from beside the executable
pub const CONFIG_FILE: &str = "proton-helper.json";

const CACHE_DIR: &str = ".cache";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub script_dir: PathBuf,
    pub compat_data_path: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
    pub endpoints: Endpoints,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    script_dir: Option<PathBuf>,
    compat_data_path: Option<PathBuf>,
    log_path: Option<PathBuf>,
    endpoints: Option<Endpoints>,
}

impl Config {
    pub fn new(script_dir: impl Into<PathBuf>) -> Self {
        Self {
            script_dir: script_dir.into(),
            compat_data_path: None,
            log_path: None,
            endpoints: Endpoints::default(),
        }
    }

    /// Defaults, then `proton-helper.json` beside the executable, then the environment.
    pub fn load() -> Result<Self> {
        let exe = std::env::current_exe()?;
        let script_dir = exe
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| AppError::Config(format!("no parent for {}", exe.display())))?;

        let mut config = Self::new(&script_dir);
        let file = script_dir.join(CONFIG_FILE);
        if file.is_file() {
            tracing::debug!("loading config overrides from {}", file.display());
            config.merge_file(&std::fs::read_to_string(&file)?)?;
        }
        config.merge_env(
            std::env::var_os(COMPAT_DATA_ENV).map(PathBuf::from),
            std::env::var_os(LOG_ENV).map(PathBuf::from),
        );

        Ok(config)
    }

    fn merge_file(&mut self, json: &str) -> Result<()> {
        let file: FileConfig = serde_json::from_str(json)
            .map_err(|e| AppError::Config(format!("{}: {}", CONFIG_FILE, e)))?;

        if let Some(dir) = file.script_dir {
            self.script_dir = dir;
        }
        if file.compat_data_path.is_some() {
            self.compat_data_path = file.compat_data_path;
        }
        if file.log_path.is_some() {
            self.log_path = file.log_path;
        }
        if let Some(endpoints) = file.endpoints {
            self.endpoints = endpoints;
        }
        Ok(())
    }

    fn merge_env(&mut self, compat_data_path: Option<PathBuf>, log_path: Option<PathBuf>) {
        if compat_data_path.is_some() {
            self.compat_data_path = compat_data_path;
        }
        if log_path.is_some() {
            self.log_path = log_path;
        }
    }

    /// The `pfx` directory wine runs against
    pub fn wineprefix(&self) -> Result<PathBuf> {
        self.compat_data_path
            .as_ref()
            .map(|root| root.join("pfx"))
            .ok_or_else(|| AppError::Config(format!("{} is not set", COMPAT_DATA_ENV)))
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.script_dir.join(CACHE_DIR)
    }

    pub fn winetricks_path(&self) -> PathBuf {
        self.script_dir.join("winetricks")
    }

    pub fn pip_path(&self) -> PathBuf {
        self.script_dir.join("pip.pyz")
    }
}
