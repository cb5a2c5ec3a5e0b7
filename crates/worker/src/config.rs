use std::time::Duration;

use barbcut_core::scheduling::{
    min_stale_after, DEFAULT_BATCH_SIZE, DEFAULT_STALE_AFTER_MINUTES, DEFAULT_TICK_INTERVAL,
};
use barbcut_pipeline::ProcessorConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Scheduler configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub tick_interval: Duration,
    pub batch_size: usize,
    /// `None` when stale-job reclaim is disabled.
    pub stale_after: Option<chrono::Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            stale_after: Some(chrono::Duration::minutes(DEFAULT_STALE_AFTER_MINUTES)),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `SCHEDULER_INTERVAL_SECS` | `300`   |
    /// | `SCHEDULER_BATCH_SIZE`    | `3`     |
    /// | `STALE_JOB_MINUTES`       | `60` (`0` disables) |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let tick_interval = match parse_positive(&lookup, "SCHEDULER_INTERVAL_SECS")? {
            Some(secs) => Duration::from_secs(secs),
            None => defaults.tick_interval,
        };
        let batch_size = match parse_positive(&lookup, "SCHEDULER_BATCH_SIZE")? {
            Some(size) => size as usize,
            None => defaults.batch_size,
        };
        let stale_after = match lookup("STALE_JOB_MINUTES") {
            None => defaults.stale_after,
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(0) => None,
                Ok(minutes) if minutes > 0 => Some(chrono::Duration::minutes(minutes)),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "STALE_JOB_MINUTES",
                        value: raw,
                        expected: "a non-negative integer",
                    })
                }
            },
        };

        Ok(Self {
            tick_interval,
            batch_size,
            stale_after,
        })
    }

    /// Raise the stale threshold to [`min_stale_after`] for this generator
    /// deadline. Returns the raised value, or `None` when it already fits.
    pub fn fit_to_generator_timeout(&mut self, timeout: Duration) -> Option<chrono::Duration> {
        let floor = chrono::Duration::seconds(min_stale_after(timeout).as_secs() as i64);
        match self.stale_after {
            Some(current) if current < floor => {
                self.stale_after = Some(floor);
                Some(floor)
            }
            _ => None,
        }
    }

    pub fn processor_config(&self, bucket: impl Into<String>) -> ProcessorConfig {
        ProcessorConfig {
            batch_size: self.batch_size,
            stale_after: self.stale_after,
            bucket: bucket.into(),
        }
    }
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(ConfigError::Invalid {
            name,
            value: raw,
            expected: "a positive integer",
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<WorkerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.tick_interval, Duration::from_secs(300));
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.stale_after, Some(chrono::Duration::minutes(60)));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config(&[
            ("SCHEDULER_INTERVAL_SECS", "60"),
            ("SCHEDULER_BATCH_SIZE", "10"),
            ("STALE_JOB_MINUTES", "0"),
        ])
        .unwrap();
        assert_eq!(config.tick_interval, Duration::from_secs(60));
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.stale_after, None);
    }

    #[test]
    fn stale_threshold_is_raised_above_generation_deadline() {
        let mut short = config(&[("STALE_JOB_MINUTES", "30")]).unwrap();
        let raised = short.fit_to_generator_timeout(Duration::from_secs(600));
        assert_eq!(raised, Some(chrono::Duration::minutes(45)));
        assert_eq!(short.stale_after, Some(chrono::Duration::minutes(45)));

        let mut defaults = WorkerConfig::default();
        assert_eq!(defaults.fit_to_generator_timeout(Duration::from_secs(600)), None);

        let mut disabled = config(&[("STALE_JOB_MINUTES", "0")]).unwrap();
        assert_eq!(disabled.fit_to_generator_timeout(Duration::from_secs(600)), None);
        assert_eq!(disabled.stale_after, None);
    }

    #[test]
    fn invalid_numbers_fail_fast() {
        assert!(config(&[("SCHEDULER_BATCH_SIZE", "0")]).is_err());
        assert!(config(&[("SCHEDULER_INTERVAL_SECS", "soon")]).is_err());
        assert!(config(&[("STALE_JOB_MINUTES", "-5")]).is_err());
    }
}
