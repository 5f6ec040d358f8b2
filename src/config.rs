//! TOML configuration for a generation run.
//!
//! A layered model: compiled-in defaults, then a TOML file (explicit path or
//! the `FINOPS_DATAGEN_CONFIG` environment variable), then CLI overrides.
//! [`AppConfig::generator_config`] turns the loaded file into a validated
//! [`GeneratorConfig`]; nothing is generated from an invalid one.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calendar::holidays::COVERED_YEARS;
use crate::domain::{AnomalyCategory, Domain};
use crate::schedule::{builtin, AnomalyEvent, ScheduleError};

/// Env var naming a config file to load when `--config` is not given.
pub const CONFIG_ENV: &str = "FINOPS_DATAGEN_CONFIG";

/// Anomalies closer than this to the reference time could produce incident
/// transitions after it.
pub const MIN_EVENT_AGE_DAYS: i64 = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("year {0} is not covered by the holiday tables ({min}-{max})", min = COVERED_YEARS.start(), max = COVERED_YEARS.end())]
    UnsupportedYear(i32),

    #[error("at least one location is required")]
    NoLocations,

    #[error("location names must not be blank")]
    BlankLocation,

    #[error("location '{0}' is listed more than once")]
    DuplicateLocation(String),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("{date} {location}: category '{category}' does not belong to the {domain} domain")]
    ForeignCategory {
        date: chrono::NaiveDate,
        location: String,
        category: AnomalyCategory,
        domain: Domain,
    },

    #[error("{date} {location}: anomalies must be dated at least {min_days} days before the reference time {now}", min_days = MIN_EVENT_AGE_DAYS)]
    EventTooRecent {
        date: chrono::NaiveDate,
        location: String,
        now: NaiveDateTime,
    },
}

// ---------------------------------------------------------------------------
// Generator input
// ---------------------------------------------------------------------------

/// Validated input to [`crate::generate::Generator`].
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub year: i32,
    pub domain: Domain,
    pub locations: Vec<String>,
    pub anomalies: Vec<AnomalyEvent>,
    /// Base seed; `None` draws one at startup.
    pub seed: Option<u64>,
    /// Generation-time reference for the future-resolution clamp.
    pub now: NaiveDateTime,
}

impl GeneratorConfig {
    pub fn new(year: i32, domain: Domain, locations: Vec<String>) -> Self {
        Self {
            year,
            domain,
            locations,
            anomalies: Vec::new(),
            seed: None,
            now: chrono::Local::now().naive_local().trunc_subsecs(0),
        }
    }

    pub fn with_anomalies(mut self, anomalies: Vec<AnomalyEvent>) -> Self {
        self.anomalies = anomalies;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sub-second precision is dropped; stored timestamps carry whole seconds.
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now.trunc_subsecs(0);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !COVERED_YEARS.contains(&self.year) {
            return Err(ConfigError::UnsupportedYear(self.year));
        }
        if self.locations.is_empty() {
            return Err(ConfigError::NoLocations);
        }
        let mut seen = HashSet::new();
        for loc in &self.locations {
            if loc.trim().is_empty() {
                return Err(ConfigError::BlankLocation);
            }
            if !seen.insert(loc.as_str()) {
                return Err(ConfigError::DuplicateLocation(loc.clone()));
            }
        }

        let newest_allowed = self.now.date() - Duration::days(MIN_EVENT_AGE_DAYS);
        for event in &self.anomalies {
            event.validate()?;
            if event.category.domain() != self.domain {
                return Err(ConfigError::ForeignCategory {
                    date: event.date,
                    location: event.location.clone(),
                    category: event.category,
                    domain: self.domain,
                });
            }
            if event.date.year() != self.year {
                continue;
            }
            if event.date > newest_allowed {
                return Err(ConfigError::EventTooRecent {
                    date: event.date,
                    location: event.location.clone(),
                    now: self.now,
                });
            }
            if !seen.contains(event.location.as_str()) {
                warn!(date = %event.date, location = %event.location, "anomaly for unconfigured location is ignored");
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File-level config
// ---------------------------------------------------------------------------

/// Root of the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Replaces the built-in schedule when non-empty.
    #[serde(default)]
    pub anomalies: Vec<AnomalyEvent>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load from `path` if given, else from `$FINOPS_DATAGEN_CONFIG`, else
    /// defaults. An explicitly named file that fails to load is an error.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            return Self::load(Path::new(&env_path))
                .with_context(|| format!("{} points at an unusable file", CONFIG_ENV));
        }
        debug!("no config file given, using compiled-in defaults");
        Ok(Self::default())
    }

    /// Build and validate the generator input.
    pub fn generator_config(&self) -> Result<GeneratorConfig, ConfigError> {
        let g = &self.generation;
        let anomalies = if !self.anomalies.is_empty() {
            self.anomalies.clone()
        } else if g.builtin_schedule {
            builtin::events(g.domain)
        } else {
            Vec::new()
        };

        let mut config = GeneratorConfig::new(g.year, g.domain, g.locations.clone())
            .with_anomalies(anomalies);
        if let Some(seed) = g.seed {
            config = config.with_seed(seed);
        }
        if let Some(now) = g.reference_now {
            config = config.with_now(now);
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub year: i32,
    pub domain: Domain,
    pub locations: Vec<String>,
    pub seed: Option<u64>,
    /// Overrides the wall clock as the generation-time reference.
    pub reference_now: Option<NaiveDateTime>,
    /// Use the domain's built-in anomaly script when `[[anomalies]]` is empty.
    pub builtin_schedule: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            year: 2024,
            domain: Domain::Pos,
            locations: builtin::LOCATIONS.iter().map(|s| s.to_string()).collect(),
            seed: None,
            reference_now: None,
            builtin_schedule: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file.
    pub database: PathBuf,
    /// Clear every table before writing.
    pub reset: bool,
    pub retry: RetryConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("data/finops_demo.db"),
            reset: false,
            retry: RetryConfig::default(),
        }
    }
}

/// Batch retry policy for transient store errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff_ms: 100,
            max_backoff_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
