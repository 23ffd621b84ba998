use crate::{ConfigError, DEFAULT_TIME_UNIT};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{serde_as, DeserializeAs, SerializeAs};
use std::collections::HashSet;
use std::time::Duration;

/// Declarative description of a single scenario: which executor drives it and which tag its
/// requests are recorded under.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub tag: String,
    pub executor: ExecutorConfig,
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExecutorConfig {
    /// A fixed pool of `vus` workers looping the workflow for `duration`.
    ConstantVus {
        vus: usize,
        #[serde_as(as = "HumanDuration")]
        duration: Duration,
    },
    /// Iterations are started at a rate following `stages`, with a worker pool sized between
    /// `pre_allocated_vus` and `max_vus`.
    RampingArrivalRate {
        start_rate: u32,
        #[serde_as(as = "HumanDuration")]
        #[serde(default = "default_time_unit")]
        time_unit: Duration,
        pre_allocated_vus: usize,
        max_vus: usize,
        stages: Vec<Stage>,
    },
}

#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub target: u32,
    #[serde_as(as = "HumanDuration")]
    pub duration: Duration,
}

impl Stage {
    pub fn new(target: u32, duration: Duration) -> Self {
        Self { target, duration }
    }
}

impl ScenarioConfig {
    pub fn constant_vus(name: &str, tag: &str, vus: usize, duration: Duration) -> Self {
        Self {
            name: name.to_string(),
            tag: tag.to_string(),
            executor: ExecutorConfig::ConstantVus { vus, duration },
        }
    }

    pub fn ramping_arrival_rate(
        name: &str,
        tag: &str,
        start_rate: u32,
        pre_allocated_vus: usize,
        max_vus: usize,
        stages: Vec<Stage>,
    ) -> Self {
        Self {
            name: name.to_string(),
            tag: tag.to_string(),
            executor: ExecutorConfig::RampingArrivalRate {
                start_rate,
                time_unit: DEFAULT_TIME_UNIT,
                pre_allocated_vus,
                max_vus,
                stages,
            },
        }
    }

    /// Total wall-clock time after which no new iterations are started.
    pub fn duration(&self) -> Duration {
        match &self.executor {
            ExecutorConfig::ConstantVus { duration, .. } => *duration,
            ExecutorConfig::RampingArrivalRate { stages, .. } => {
                stages.iter().map(|s| s.duration).sum()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.tag.is_empty() {
            return Err(ConfigError::EmptyTag(self.name.clone()));
        }

        match &self.executor {
            ExecutorConfig::ConstantVus { vus, duration } => {
                if *vus == 0 {
                    return Err(ConfigError::NoVus(self.name.clone()));
                }
                if duration.is_zero() {
                    return Err(ConfigError::ZeroDuration(self.name.clone()));
                }
            }
            ExecutorConfig::RampingArrivalRate {
                time_unit,
                pre_allocated_vus,
                max_vus,
                stages,
                ..
            } => {
                if stages.is_empty() {
                    return Err(ConfigError::NoStages(self.name.clone()));
                }
                if self.duration().is_zero() {
                    return Err(ConfigError::ZeroDuration(self.name.clone()));
                }
                if time_unit.is_zero() {
                    return Err(ConfigError::ZeroTimeUnit(self.name.clone()));
                }
                if *max_vus == 0 {
                    return Err(ConfigError::NoVus(self.name.clone()));
                }
                if pre_allocated_vus > max_vus {
                    return Err(ConfigError::VuBounds {
                        name: self.name.clone(),
                        pre_allocated: *pre_allocated_vus,
                        max: *max_vus,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Validate a whole set of scenarios, including that names are unique.
pub fn validate_all(configs: &[ScenarioConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for config in configs {
        config.validate()?;
        if !seen.insert(config.name.as_str()) {
            return Err(ConfigError::DuplicateName(config.name.clone()));
        }
    }
    Ok(())
}

fn default_time_unit() -> Duration {
    DEFAULT_TIME_UNIT
}

/// (De)serializes durations as humantime strings such as `45s` or `1m 30s`.
pub struct HumanDuration;

impl SerializeAs<Duration> for HumanDuration {
    fn serialize_as<S>(source: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&humantime::format_duration(*source))
    }
}

impl<'de> DeserializeAs<'de, Duration> for HumanDuration {
    fn deserialize_as<D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
