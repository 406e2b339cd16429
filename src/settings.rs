use std::path::PathBuf;

use cpucaps_base::EnumFromNameT;
use cpucaps_core::{CountScope, MaskLayout};
use cpucaps_logging::{LogCategory, LogLevel, log_error};
use serde::Deserialize;

const LOG_CAT: LogCategory = LogCategory::new_with_sub("Main", "Settings");

/// `[logging]` table, as written in the file
#[derive(Deserialize, Default, Debug)]
#[serde(default, deny_unknown_fields)]
struct RawLogging {
    level:        Option<String>,
    always_flush: bool,
    log_file:     Option<PathBuf>,
}

/// `[report]` table, as written in the file
#[derive(Deserialize, Default, Debug)]
#[serde(default, deny_unknown_fields)]
struct RawReport {
    layout:      Option<String>,
    count_scope: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default, deny_unknown_fields)]
struct RawSettings {
    logging: RawLogging,
    report:  RawReport,
}

/// Report settings
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Settings {
    /// Maximum level of messages that are logged
    pub log_level:    LogLevel,
    /// Flush the log after every message
    pub always_flush: bool,
    /// Additional file to write the log to
    pub log_file:     Option<PathBuf>,

    /// Layout used to print the capability mask
    pub layout:       MaskLayout,
    /// Affinity mask used to count the logical processors
    pub count_scope:  CountScope,
}

impl Settings {
    /// Load the settings from the contents of `cpucaps.toml`.
    ///
    /// Returns `None` and logs the reason when the file is invalid. Missing keys keep their default value.
    pub fn load(toml: &str) -> Option<Settings> {
        let raw = match toml::from_str::<RawSettings>(toml) {
            Ok(raw) => raw,
            Err(err) => {
                log_error!(LOG_CAT, "Failed to parse 'cpucaps.toml', err: {err}");
                return None;
            }
        };

        let defaults = Settings::default();
        Some(Settings {
            log_level: parse_name(raw.logging.level, "logging.level", defaults.log_level)?,
            always_flush: raw.logging.always_flush,
            log_file: raw.logging.log_file,
            layout: parse_name(raw.report.layout, "report.layout", defaults.layout)?,
            count_scope: parse_name(raw.report.count_scope, "report.count_scope", defaults.count_scope)?,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warning,
            always_flush: false,
            log_file: None,
            layout: MaskLayout::default(),
            count_scope: CountScope::default(),
        }
    }
}

/// Parse an optional enum value, logging an error if the name is unknown.
fn parse_name<T: EnumFromNameT>(value: Option<String>, key: &str, default: T) -> Option<T> {
    let Some(value) = value else {
        return Some(default);
    };

    let parsed = T::parse(&value);
    if parsed.is_none() {
        log_error!(LOG_CAT, "Invalid value for '{key}': '{value}'");
    }
    parsed
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Settings::load(""), Some(Settings::default()));
    }

    #[test]
    fn full_file() {
        let toml = r#"
            [logging]
            level = "debug"
            always_flush = true
            log_file = "cpucaps.log"

            [report]
            layout = "compact"
            count_scope = "shared"
        "#;

        let settings = Settings::load(toml).unwrap();
        assert_eq!(settings, Settings {
            log_level: LogLevel::Debug,
            always_flush: true,
            log_file: Some(PathBuf::from("cpucaps.log")),
            layout: MaskLayout::Compact,
            count_scope: CountScope::Shared,
        });
    }

    #[test]
    fn partial_table() {
        let settings = Settings::load("[report]\nlayout = \"wide\"\n").unwrap();
        assert_eq!(settings.layout, MaskLayout::Wide);
        assert_eq!(settings.count_scope, CountScope::System);
        assert_eq!(settings.log_level, LogLevel::Warning);
    }

    #[test]
    fn unknown_values_are_rejected() {
        assert_eq!(Settings::load("[report]\nlayout = \"huge\"\n"), None);
        assert_eq!(Settings::load("[logging]\nlevel = \"loud\"\n"), None);
        assert_eq!(Settings::load("[report]\ncolour = true\n"), None);
        assert_eq!(Settings::load("[report\n"), None);
    }
}
