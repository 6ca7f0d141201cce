//! Configuration for the event bus and the statistics engine.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepwiseConfig {
    /// Event bus behavior.
    #[serde(default)]
    pub bus: BusConfig,
    /// Statistics engine behavior.
    #[serde(default)]
    pub statistics: StatisticsConfig,
}

impl StepwiseConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// Malformed JSON is reported against the `json` field.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::new("json", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.statistics.validate()
    }

    /// Sets the bus configuration.
    #[must_use]
    pub fn with_bus(mut self, bus: BusConfig) -> Self {
        self.bus = bus;
        self
    }

    /// Sets the statistics configuration.
    #[must_use]
    pub fn with_statistics(mut self, statistics: StatisticsConfig) -> Self {
        self.statistics = statistics;
        self
    }
}

/// Configuration for an event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Catch panics raised by listeners instead of unwinding into the runner.
    #[serde(default = "default_true")]
    pub catch_listener_panics: bool,
    /// Derive outcome titles from test names.
    #[serde(default = "default_true")]
    pub humanize_titles: bool,
    /// Record force-sealed steps as warnings on the outcome.
    #[serde(default = "default_true")]
    pub record_unbalanced_warnings: bool,
    /// Completed outcomes and listener failures kept on the bus; the oldest
    /// are dropped past this.
    #[serde(default = "default_max_retained")]
    pub max_retained: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_retained() -> usize {
    1000
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            catch_listener_panics: default_true(),
            humanize_titles: default_true(),
            record_unbalanced_warnings: default_true(),
            max_retained: default_max_retained(),
        }
    }
}

impl BusConfig {
    /// Creates a bus configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether listener panics are caught.
    #[must_use]
    pub fn with_catch_listener_panics(mut self, catch: bool) -> Self {
        self.catch_listener_panics = catch;
        self
    }

    /// Sets whether titles are humanized.
    #[must_use]
    pub fn with_humanize_titles(mut self, humanize: bool) -> Self {
        self.humanize_titles = humanize;
        self
    }

    /// Sets whether unbalanced-stack warnings are recorded on outcomes.
    #[must_use]
    pub fn with_record_unbalanced_warnings(mut self, record: bool) -> Self {
        self.record_unbalanced_warnings = record;
        self
    }

    /// Sets how many completed outcomes and listener failures are kept.
    #[must_use]
    pub fn with_max_retained(mut self, max: usize) -> Self {
        self.max_retained = max;
        self
    }
}

/// Configuration for the statistics engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Number of recent runs used for the long-term pass rate.
    #[serde(default = "default_pass_rate_window")]
    pub pass_rate_window: usize,
    /// Number of recent runs used for stability. Shorter than the pass-rate window.
    #[serde(default = "default_stability_window")]
    pub stability_window: usize,
    /// Number of snapshots kept in the engine's local history.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Pass-rate change below which a trend counts as steady.
    #[serde(default = "default_trend_tolerance")]
    pub trend_tolerance: f64,
}

fn default_pass_rate_window() -> usize {
    20
}

fn default_stability_window() -> usize {
    5
}

fn default_history_window() -> usize {
    10
}

fn default_trend_tolerance() -> f64 {
    0.05
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            pass_rate_window: default_pass_rate_window(),
            stability_window: default_stability_window(),
            history_window: default_history_window(),
            trend_tolerance: default_trend_tolerance(),
        }
    }
}

impl StatisticsConfig {
    /// Creates a statistics configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pass-rate window.
    #[must_use]
    pub fn with_pass_rate_window(mut self, window: usize) -> Self {
        self.pass_rate_window = window;
        self
    }

    /// Sets the stability window.
    #[must_use]
    pub fn with_stability_window(mut self, window: usize) -> Self {
        self.stability_window = window;
        self
    }

    /// Sets the default history window.
    #[must_use]
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Sets the trend tolerance.
    #[must_use]
    pub fn with_trend_tolerance(mut self, tolerance: f64) -> Self {
        self.trend_tolerance = tolerance;
        self
    }

    /// Checks the window sizes and tolerance.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pass_rate_window == 0 {
            return Err(ConfigError::new("pass_rate_window", "must be greater than zero"));
        }
        if self.stability_window == 0 {
            return Err(ConfigError::new("stability_window", "must be greater than zero"));
        }
        if self.stability_window > self.pass_rate_window {
            return Err(ConfigError::new(
                "stability_window",
                format!(
                    "must not exceed pass_rate_window ({})",
                    self.pass_rate_window
                ),
            ));
        }
        if self.history_window == 0 {
            return Err(ConfigError::new("history_window", "must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.trend_tolerance) {
            return Err(ConfigError::new("trend_tolerance", "must be within 0.0..=1.0"));
        }
        Ok(())
    }
}
