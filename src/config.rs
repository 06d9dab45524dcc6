// src/config.rs

use crate::messages::BreakType;
use serde::Deserialize;
use serde_json::Value;
use std::num::NonZeroU64;
use std::{fs, path::PathBuf};
use thiserror::Error;

const fn minutes(value: u64) -> NonZeroU64 {
    match NonZeroU64::new(value) {
        Some(value) => value,
        None => panic!("durations must be non-zero"),
    }
}

pub const DEFAULT_INTERVAL: NonZeroU64 = minutes(30);
pub const DEFAULT_BREAK_DURATION: NonZeroU64 = minutes(5);
pub const SECONDS_PER_MINUTE: NonZeroU64 = minutes(60);
/// Demo scale: one configured minute lasts six seconds.
pub const DEMO_SECONDS_PER_MINUTE: NonZeroU64 = minutes(6);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from {source_arg}: {source}")]
    Unreadable {
        source_arg: String,
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("invalid configuration: {0}")]
    Invalid(serde_json::Error),
    #[error("{0} must be a positive number of minutes")]
    NonPositive(&'static str),
}

/// Field deserializers that replace a bad value with the field's default
/// instead of rejecting the whole document.
mod lenient {
    use super::{BreakTypes, DEFAULT_BREAK_DURATION, DEFAULT_INTERVAL};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::num::NonZeroU64;

    fn minutes<'de, D>(deserializer: D, field: &str, default: NonZeroU64) -> Result<NonZeroU64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Value = Value::deserialize(deserializer)?;
        Ok(value.as_u64().and_then(NonZeroU64::new).unwrap_or_else(|| {
            log::warn!("ignoring invalid {} {}, using {}", field, value, default);
            default
        }))
    }

    pub fn interval<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NonZeroU64, D::Error> {
        minutes(deserializer, "interval", DEFAULT_INTERVAL)
    }

    pub fn break_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NonZeroU64, D::Error> {
        minutes(deserializer, "break_duration", DEFAULT_BREAK_DURATION)
    }

    fn flag<'de, D>(deserializer: D, default: bool) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Value = Value::deserialize(deserializer)?;
        Ok(value.as_bool().unwrap_or_else(|| {
            log::warn!("ignoring non-boolean flag {}, using {}", value, default);
            default
        }))
    }

    pub fn flag_on<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        flag(deserializer, true)
    }

    pub fn flag_off<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        flag(deserializer, false)
    }

    pub fn break_types<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BreakTypes, D::Error> {
        let value: Value = Value::deserialize(deserializer)?;
        Ok(BreakTypes::deserialize(&value).unwrap_or_else(|e| {
            log::warn!("ignoring invalid break_types {}: {}", value, e);
            BreakTypes::default()
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BreakTypes {
    #[serde(deserialize_with = "lenient::flag_off")]
    pub eye_strain: bool,
    #[serde(deserialize_with = "lenient::flag_on")]
    pub water: bool,
    #[serde(deserialize_with = "lenient::flag_on")]
    pub stretch: bool,
    #[serde(deserialize_with = "lenient::flag_off")]
    pub walk: bool,
}

impl Default for BreakTypes {
    fn default() -> Self {
        Self {
            eye_strain: false,
            water: true,
            stretch: true,
            walk: false,
        }
    }
}

impl BreakTypes {
    pub fn is_enabled(&self, break_type: BreakType) -> bool {
        match break_type {
            BreakType::EyeStrain => self.eye_strain,
            BreakType::Water => self.water,
            BreakType::Stretch => self.stretch,
            BreakType::Walk => self.walk,
        }
    }

    /// Enabled break types, in catalogue order.
    pub fn enabled(&self) -> Vec<BreakType> {
        BreakType::ALL
            .into_iter()
            .filter(|break_type: &BreakType| self.is_enabled(*break_type))
            .collect()
    }
}

/**
 * Reminder settings as supplied by the JSON config and CLI flags.
 * Durations are in minutes.
 */
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    #[serde(deserialize_with = "lenient::interval")]
    pub interval: NonZeroU64,
    #[serde(deserialize_with = "lenient::break_duration")]
    pub break_duration: NonZeroU64,
    #[serde(deserialize_with = "lenient::break_types")]
    pub break_types: BreakTypes,
    #[serde(deserialize_with = "lenient::flag_on")]
    pub notifications_enabled: bool,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            break_duration: DEFAULT_BREAK_DURATION,
            break_types: BreakTypes::default(),
            notifications_enabled: true,
        }
    }
}

impl ReminderConfig {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("break-reminder/config.json")
    }

    /// Parses `source` as a JSON document first and, failing that, reads it as a file path.
    pub fn from_source(source: &str) -> Result<Self, ConfigError> {
        if let Ok(value) = serde_json::from_str::<Value>(source) {
            return Self::from_value(&value);
        }
        let data: String = fs::read_to_string(source).map_err(|e| ConfigError::Unreadable {
            source_arg: source.to_string(),
            source: e,
        })?;
        let value: Value = serde_json::from_str(&data).map_err(|e| ConfigError::Parse {
            path: source.to_string(),
            source: e,
        })?;
        Self::from_value(&value)
    }

    /// Builds a config from a JSON object. Missing or invalid fields keep their defaults.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        if !value.is_object() {
            return Err(ConfigError::NotAnObject);
        }
        Self::deserialize(value).map_err(ConfigError::Invalid)
    }

    /// Loads from `source`, or from the default config file if it exists.
    /// Never fails: every problem is reported and the defaults are used instead.
    pub fn load_or_default(source: Option<&str>) -> Self {
        let source: String = match source {
            Some(source) => source.to_string(),
            None => {
                let path: PathBuf = Self::config_path();
                if !path.exists() {
                    return Self::default();
                }
                path.to_string_lossy().into_owned()
            }
        };
        match Self::from_source(&source) {
            Ok(config) => {
                log::debug!("loaded config: {:?}", config);
                config
            }
            Err(e) => {
                eprintln!("Warning: {}", e);
                log::warn!("falling back to default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Applies command-line overrides. Zero durations are reported and ignored.
    pub fn apply_overrides(
        &mut self,
        interval: Option<u64>,
        break_duration: Option<u64>,
        notifications: Option<bool>,
    ) {
        if let Some(minutes) = interval {
            match NonZeroU64::new(minutes) {
                Some(minutes) => self.interval = minutes,
                None => eprintln!("Warning: {}", ConfigError::NonPositive("interval")),
            }
        }
        if let Some(minutes) = break_duration {
            match NonZeroU64::new(minutes) {
                Some(minutes) => self.break_duration = minutes,
                None => eprintln!("Warning: {}", ConfigError::NonPositive("break_duration")),
            }
        }
        if let Some(enabled) = notifications {
            self.notifications_enabled = enabled;
        }
    }

    pub fn session(&self, seconds_per_minute: NonZeroU64) -> SessionConfig {
        SessionConfig::new(self.interval, self.break_duration, seconds_per_minute)
    }
}

/// Validated, immutable durations for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    work_minutes: NonZeroU64,
    break_minutes: NonZeroU64,
    seconds_per_minute: NonZeroU64,
}

impl SessionConfig {
    pub fn new(work_minutes: NonZeroU64, break_minutes: NonZeroU64, seconds_per_minute: NonZeroU64) -> Self {
        Self {
            work_minutes,
            break_minutes,
            seconds_per_minute,
        }
    }

    pub fn work_minutes(&self) -> u64 {
        self.work_minutes.get()
    }

    pub fn break_minutes(&self) -> u64 {
        self.break_minutes.get()
    }

    pub fn work_seconds(&self) -> NonZeroU64 {
        self.work_minutes.saturating_mul(self.seconds_per_minute)
    }

    pub fn break_seconds(&self) -> NonZeroU64 {
        self.break_minutes.saturating_mul(self.seconds_per_minute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config: ReminderConfig = ReminderConfig::default();
        assert_eq!(config.interval.get(), 30);
        assert_eq!(config.break_duration.get(), 5);
        assert!(config.notifications_enabled);
        assert_eq!(
            config.break_types.enabled(),
            vec![BreakType::Water, BreakType::Stretch]
        );
    }

    #[test]
    fn test_from_json_string() {
        let config: ReminderConfig = ReminderConfig::from_source(
            r#"{"interval": 45, "break_duration": 10, "break_types": {"walk": true, "water": false}, "notifications_enabled": false}"#,
        )
        .unwrap();
        assert_eq!(config.interval.get(), 45);
        assert_eq!(config.break_duration.get(), 10);
        assert!(!config.notifications_enabled);
        assert_eq!(
            config.break_types.enabled(),
            vec![BreakType::Stretch, BreakType::Walk]
        );
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(
            ReminderConfig::from_value(&json!({})).unwrap(),
            ReminderConfig::default()
        );
    }

    #[test]
    fn test_missing_and_invalid_fields_fall_back() {
        let config: ReminderConfig = ReminderConfig::from_value(&json!({
            "interval": 0,
            "break_duration": "ten",
            "break_types": {"eye_strain": "yes", "water": null},
            "notifications_enabled": 1,
        }))
        .unwrap();
        assert_eq!(config, ReminderConfig::default());
    }

    #[test]
    fn test_invalid_field_keeps_valid_neighbours() {
        let config: ReminderConfig = ReminderConfig::from_value(&json!({
            "interval": -5,
            "break_duration": 7,
            "break_types": {"walk": true, "stretch": "maybe"},
        }))
        .unwrap();
        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert_eq!(config.break_duration.get(), 7);
        assert!(config.break_types.walk);
        assert!(config.break_types.stretch);
    }

    #[test]
    fn test_non_object_break_types_fall_back() {
        let config: ReminderConfig =
            ReminderConfig::from_value(&json!({"break_types": 5, "interval": 9})).unwrap();
        assert_eq!(config.break_types, BreakTypes::default());
        assert_eq!(config.interval.get(), 9);
    }

    #[test]
    fn test_from_file_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"interval": 12}}"#).unwrap();
        let path: String = file.path().to_string_lossy().into_owned();
        let config: ReminderConfig = ReminderConfig::from_source(&path).unwrap();
        assert_eq!(config.interval.get(), 12);
        assert_eq!(config.break_duration, DEFAULT_BREAK_DURATION);
    }

    #[test]
    fn test_file_with_bad_json_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let path: String = file.path().to_string_lossy().into_owned();
        assert!(matches!(
            ReminderConfig::from_source(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_malformed_json_that_is_not_a_path_uses_defaults() {
        let source: &str = "{\"interval\": 10,,, /definitely/not/a/file";
        assert!(matches!(
            ReminderConfig::from_source(source),
            Err(ConfigError::Unreadable { .. })
        ));
        assert_eq!(
            ReminderConfig::load_or_default(Some(source)),
            ReminderConfig::default()
        );
    }

    #[test]
    fn test_non_object_json_uses_defaults() {
        assert!(matches!(
            ReminderConfig::from_source("[1, 2, 3]"),
            Err(ConfigError::NotAnObject)
        ));
        assert_eq!(
            ReminderConfig::load_or_default(Some("42")),
            ReminderConfig::default()
        );
    }

    #[test]
    fn test_overrides_ignore_zero() {
        let mut config: ReminderConfig = ReminderConfig::default();
        config.apply_overrides(Some(0), Some(3), Some(false));
        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert_eq!(config.break_duration.get(), 3);
        assert!(!config.notifications_enabled);
    }

    #[test]
    fn test_session_after_zero_override_keeps_defaults() {
        let mut config: ReminderConfig = ReminderConfig::default();
        config.apply_overrides(Some(0), Some(0), None);
        let session: SessionConfig = config.session(SECONDS_PER_MINUTE);
        assert_eq!(session.work_minutes(), 30);
        assert_eq!(session.break_minutes(), 5);
    }

    #[test]
    fn test_session_scales_minutes() {
        let session: SessionConfig = ReminderConfig::default().session(DEMO_SECONDS_PER_MINUTE);
        assert_eq!(session.work_minutes(), 30);
        assert_eq!(session.work_seconds().get(), 180);
        assert_eq!(session.break_seconds().get(), 30);
    }
}
