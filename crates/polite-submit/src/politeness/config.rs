use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Datelike, Timelike, Weekday};
use log::LevelFilter;
use serde::{Deserialize, Deserializer};

use crate::common::error::{PsError, config_error};
use crate::common::utils::time::deserialize_human_duration;

/// Name of the configuration file that is looked up in the working directory.
const LOCAL_CONFIG_FILE: &str = "polite-submit.toml";
/// Name of the configuration file that is looked up in the home directory.
const HOME_CONFIG_FILE: &str = ".polite-submit.toml";

/// Configuration of a polite submission run. It is loaded once and then only passed around.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PolitenessConfig {
    pub cluster: ClusterConfig,
    pub politeness: Thresholds,
    pub peak_hours: PeakHours,
    pub backoff: BackoffConfig,
    pub array: ArrayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ClusterConfig {
    /// SSH host alias of the cluster login node, `None` runs commands locally.
    pub host: Option<String>,
    /// Slurm user whose jobs are counted as own jobs, defaults to `$USER`.
    pub username: Option<String>,
    /// Partition that is probed, `None` probes the whole cluster.
    pub partition: Option<String>,
    /// How long can a single probe of the cluster state take.
    #[serde(deserialize_with = "deserialize_human_duration")]
    pub probe_timeout: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            host: None,
            username: None,
            partition: None,
            probe_timeout: Duration::from_secs(30),
        }
    }
}

impl ClusterConfig {
    pub fn effective_username(&self) -> String {
        self.username
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Thresholds {
    /// When disabled, units are submitted without probing the cluster.
    pub enabled: bool,
    pub max_concurrent_jobs: u32,
    pub max_pending_jobs: u32,
    /// Maximum number of pending jobs of other users.
    pub queue_depth_threshold: u32,
    pub utilization_threshold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrent_jobs: 4,
            max_pending_jobs: 2,
            queue_depth_threshold: 10,
            utilization_threshold: 0.85,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PeakHours {
    pub enabled: bool,
    pub schedule: Vec<PeakWindow>,
    /// Running job ceiling that replaces `max_concurrent_jobs` during peak hours.
    pub max_concurrent: u32,
    /// Peak hours never apply on Saturdays and Sundays.
    pub weekend_exempt: bool,
}

impl Default for PeakHours {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule: vec![PeakWindow::every_day(9, 17)],
            max_concurrent: 2,
            weekend_exempt: true,
        }
    }
}

impl PeakHours {
    /// Returns true if `now` falls into one of the peak windows.
    pub fn contains<T: Datelike + Timelike>(&self, now: &T) -> bool {
        if !self.enabled {
            return false;
        }
        let weekday = now.weekday();
        if self.weekend_exempt && matches!(weekday, Weekday::Sat | Weekday::Sun) {
            return false;
        }
        self.schedule
            .iter()
            .any(|window| window.contains(weekday, now.hour()))
    }
}

/// Half-open interval of hours `[start, end)`, optionally limited to some days of the week.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "PeakWindowDef")]
pub struct PeakWindow {
    pub start: u32,
    pub end: u32,
    /// Days on which the window applies. Empty means every day.
    pub days: Vec<Weekday>,
}

impl PeakWindow {
    pub fn every_day(start: u32, end: u32) -> Self {
        Self {
            start,
            end,
            days: vec![],
        }
    }

    pub fn contains(&self, weekday: Weekday, hour: u32) -> bool {
        (self.days.is_empty() || self.days.contains(&weekday))
            && self.start <= hour
            && hour < self.end
    }
}

/// A peak window can be written either as `[9, 17]` or as `{ start = 9, end = 17, days = [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PeakWindowDef {
    Hours(u32, u32),
    Table(PeakWindowTable),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PeakWindowTable {
    start: u32,
    end: u32,
    #[serde(default)]
    days: Vec<Weekday>,
}

impl From<PeakWindowDef> for PeakWindow {
    fn from(def: PeakWindowDef) -> Self {
        match def {
            PeakWindowDef::Hours(start, end) => PeakWindow::every_day(start, end),
            PeakWindowDef::Table(PeakWindowTable { start, end, days }) => {
                PeakWindow { start, end, days }
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BackoffConfig {
    pub initial_seconds: f64,
    pub max_seconds: f64,
    pub multiplier: f64,
    /// How many times can a single unit be deferred before it is given up.
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_seconds: 30.0,
            max_seconds: 1800.0,
            multiplier: 2.0,
            max_attempts: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ArrayConfig {
    /// How many array indices are submitted by a single `sbatch` invocation.
    pub chunk_size: u32,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self { chunk_size: 10 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingConfig {
    /// Log level used when neither `--debug` nor `RUST_LOG` is given.
    #[serde(deserialize_with = "deserialize_log_level")]
    pub level: Option<LevelFilter>,
    /// Log records are appended to this file instead of being written to stderr.
    pub file: Option<PathBuf>,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<Option<LevelFilter>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    let level = match value.to_lowercase().as_str() {
        "warning" => Ok(LevelFilter::Warn),
        "critical" => Ok(LevelFilter::Error),
        other => other.parse(),
    };
    level
        .map(Some)
        .map_err(|_| serde::de::Error::custom(format!("Invalid log level `{value}`")))
}

impl PolitenessConfig {
    pub fn validate(&self) -> crate::Result<()> {
        let backoff = &self.backoff;
        if !(backoff.initial_seconds.is_finite() && backoff.initial_seconds > 0.0) {
            return config_error(format!(
                "backoff.initial_seconds must be positive, got {}",
                backoff.initial_seconds
            ));
        }
        if !(backoff.max_seconds.is_finite() && backoff.max_seconds >= backoff.initial_seconds) {
            return config_error(format!(
                "backoff.max_seconds ({}) must not be smaller than backoff.initial_seconds ({})",
                backoff.max_seconds, backoff.initial_seconds
            ));
        }
        if !(backoff.multiplier.is_finite() && backoff.multiplier > 1.0) {
            return config_error(format!(
                "backoff.multiplier must be larger than 1.0, got {}",
                backoff.multiplier
            ));
        }
        if backoff.max_attempts < 1 {
            return config_error("backoff.max_attempts must be at least 1");
        }

        let threshold = self.politeness.utilization_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return config_error(format!(
                "politeness.utilization_threshold must be within (0, 1], got {threshold}"
            ));
        }
        if self.array.chunk_size < 1 {
            return config_error("array.chunk_size must be at least 1");
        }
        if self.cluster.probe_timeout.is_zero() {
            return config_error("cluster.probe_timeout must be positive");
        }
        for window in &self.peak_hours.schedule {
            if window.start > window.end || window.end > 24 {
                return config_error(format!(
                    "Invalid peak window [{}, {}), hours must satisfy start <= end <= 24",
                    window.start, window.end
                ));
            }
        }
        Ok(())
    }

    /// Parses and validates a TOML configuration.
    pub fn parse(content: &str) -> crate::Result<PolitenessConfig> {
        let config: PolitenessConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(HOME_CONFIG_FILE));
    }
    if let Some(config) = dirs::config_dir() {
        paths.push(config.join("polite-submit").join("config.toml"));
    }
    paths
}

/// Loads the configuration from `path`, or from the first existing default location.
/// If no configuration file exists, the default configuration is returned.
pub fn load_config(path: Option<&Path>) -> crate::Result<PolitenessConfig> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_paths().into_iter().find(|p| p.is_file()),
    };
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                PsError::GenericError(format!(
                    "Cannot read configuration file {}: {e}",
                    path.display()
                ))
            })?;
            PolitenessConfig::parse(&content)
        }
        None => {
            let config = PolitenessConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}
