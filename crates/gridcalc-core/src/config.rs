//! Evaluation settings loaded from `config.toml`.
//!
//! ```toml
//! strategy = "memoized"   # or "recursive"
//! errors = "tagged"       # or "zero"
//! max_depth = 64       # 1 to 128
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use gridcalc_engine::engine::{
    DEFAULT_MAX_DEPTH, ErrorPolicy, MAX_DEPTH_LIMIT, RecomputeOptions, Strategy,
};
use serde::{Deserialize, Serialize};

use crate::error::{GridcalcError, Result};

const MAX_CONFIG_FILE_BYTES: u64 = 1_048_576; // 1 MiB

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub strategy: Strategy,
    pub errors: ErrorPolicy,
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            strategy: Strategy::default(),
            errors: ErrorPolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str, path: &Path) -> Result<Config> {
        let config: Config = toml::from_str(content).map_err(|source| GridcalcError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 || self.max_depth > MAX_DEPTH_LIMIT {
            return Err(GridcalcError::InvalidMaxDepth {
                value: self.max_depth,
                max: MAX_DEPTH_LIMIT,
            });
        }
        Ok(())
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the user config file is read
    /// if present and defaults are used otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(GridcalcError::ConfigNotFound(path.to_path_buf()));
            }
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.is_file() => path,
                _ => {
                    log::debug!("no user config file, using defaults");
                    return Ok(Config::default());
                }
            },
        };

        let meta = std::fs::metadata(&path)?;
        if meta.len() > MAX_CONFIG_FILE_BYTES {
            return Err(GridcalcError::FileTooLarge {
                path,
                size: meta.len(),
                max: MAX_CONFIG_FILE_BYTES,
            });
        }
        let content = std::fs::read_to_string(&path)?;
        let config = Config::from_toml(&content, &path)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn options(&self) -> RecomputeOptions {
        RecomputeOptions {
            strategy: self.strategy,
            errors: self.errors,
            max_depth: self.max_depth,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "gridcalc")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}
