use std::{fs, io};

use cpucaps_core::{exports::library_version, Prober};
use cpucaps_logging::{log_error, log_info, log_warning, set_logger, LogCategory, Logger};
use once_cell::sync::Lazy;

mod report;
mod settings;

use report::CpuReport;
use settings::Settings;

pub const LOG_CAT : LogCategory = LogCategory::new("Main");

const SETTINGS_FILE: &str = "cpucaps.toml";

static LOGGER: Lazy<Logger> = Lazy::new(Logger::new);

/// Load the settings file from the working directory, falling back to the defaults when it is missing or invalid.
fn load_settings() -> Settings {
    match fs::read_to_string(SETTINGS_FILE) {
        Ok(toml) => Settings::load(&toml).unwrap_or_else(|| {
            log_warning!(LOG_CAT, "'{SETTINGS_FILE}' is invalid, using default settings");
            Settings::default()
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Settings::default(),
        Err(err) => {
            log_error!(LOG_CAT, "Failed to read '{SETTINGS_FILE}', err: {err}");
            Settings::default()
        }
    }
}

fn setup_logger(logger: &Logger, settings: &Settings) {
    logger.set_max_level(settings.log_level);
    logger.set_always_flush(settings.always_flush);

    if let Some(path) = &settings.log_file {
        match fs::File::create(path) {
            Ok(file) => if logger.add_writer(Box::new(file)).is_err() {
                log_warning!(LOG_CAT, "No writer slot left for log file '{}'", path.display());
            },
            Err(err) => log_error!(LOG_CAT, "Failed to create log file '{}', err: {err}", path.display()),
        }
    }
}

fn main() {
    set_logger(&LOGGER);

    let settings = load_settings();
    setup_logger(&LOGGER, &settings);

    let (major, minor) = library_version();
    log_info!(LOG_CAT, "cpucaps {major}.{minor}, mask layout: {}, count scope: {}", settings.layout, settings.count_scope);

    let report = CpuReport::gather(&Prober::native(), settings.layout, settings.count_scope);
    println!("{report}");

    LOGGER.flush();
}
