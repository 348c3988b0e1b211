#![forbid(unsafe_code)]

use crate::error::ServiceError;
use std::path::{Path, PathBuf};

const DATA_DIR_ENV: &str = "DATALINE_DATA_DIR";
const DEFAULT_DATA_DIR: &str = "./data";

/// Filesystem layout for one service instance. Everything lives under a
/// single data dir: `artifacts/` (content store root), `meta/` (SQLite
/// metadata), `tmp/` (where producers park finished files before ingest).
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub meta_dir: PathBuf,
    pub tmp_dir: PathBuf,
}

impl ServiceConfig {
    pub fn load() -> Result<Self, ServiceError> {
        let data_dir = std::env::var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));
        Self::from_data_dir(data_dir)
    }

    pub fn from_data_dir(data_dir: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let config = Self {
            artifacts_dir: data_dir.join("artifacts"),
            meta_dir: data_dir.join("meta"),
            tmp_dir: data_dir.join("tmp"),
            data_dir,
        };
        for dir in [
            &config.data_dir,
            &config.artifacts_dir,
            &config.meta_dir,
            &config.tmp_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(config)
    }
}
