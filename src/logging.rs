use crate::config::Settings;
use simplelog::{ConfigBuilder, WriteLogger};
use std::fs::{self, OpenOptions};

/// Sends log output to the configured file; the terminal belongs to the UI.
pub fn init(settings: &Settings) {
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    if let Some(parent) = settings.log_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.log_path);
    if let Ok(log_file) = file {
        let _ = WriteLogger::init(settings.log_level, log_config, log_file);
    }
}
