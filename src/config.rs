use crate::cli::Cli;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::LevelFilter;
use std::path::{Path, PathBuf};

const STORE_FILE: &str = "store.yml";
const LOG_FILE: &str = "errand.log";

/// Paths and levels resolved from flags over platform defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store_path: PathBuf,
    pub log_path: PathBuf,
    pub log_level: LevelFilter,
}

impl Settings {
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let store_path = match &cli.store {
            Some(path) => path.clone(),
            None => data_dir()?.join(STORE_FILE),
        };
        let log_path = cli
            .log_file
            .clone()
            .unwrap_or_else(|| sibling(&store_path, LOG_FILE));
        Ok(Settings {
            store_path,
            log_path,
            log_level: cli.log_level,
        })
    }
}

fn data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "errand").context("locating data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

fn sibling(path: &Path, name: &str) -> PathBuf {
    match path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}
