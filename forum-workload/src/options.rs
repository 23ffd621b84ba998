//! Scenario and threshold options, with the standard read/like workload as the default.
//!
//! Options can be loaded from a JSON file shaped like:
//!
//! ```json
//! {
//!   "scenarios": [
//!     {
//!       "exec": "read-detail",
//!       "name": "read_detail_heavy",
//!       "tag": "read",
//!       "executor": { "kind": "constant-vus", "vus": 1200, "duration": "45s" }
//!     }
//!   ],
//!   "thresholds": { "http_req_duration{scenario:read}": ["p(95)<60"] },
//!   "auth": { "kind": "shared" }
//! }
//! ```
//!
//! Every top-level key is optional and falls back to the default workload.
use crate::constants::*;
use crate::fixture::AuthPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use surge::core::{ExecutorConfig, ScenarioConfig, Stage, Threshold, ThresholdParseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("Unable to read options file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed options: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid threshold for '{selector}': {source}")]
    Threshold {
        selector: String,
        #[source]
        source: ThresholdParseError,
    },
}

/// Which workflow a scenario's iterations run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Workflow {
    ReadDetail,
    LikeWrite,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOptions {
    pub exec: Workflow,
    #[serde(flatten)]
    pub config: ScenarioConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadOptions {
    pub scenarios: Vec<ScenarioOptions>,
    /// Expressions per metric selector, all of which must hold.
    pub thresholds: BTreeMap<String, Vec<String>>,
    pub auth: AuthPolicy,
}

impl Default for WorkloadOptions {
    fn default() -> Self {
        Self {
            scenarios: vec![
                ScenarioOptions {
                    exec: Workflow::ReadDetail,
                    config: ScenarioConfig::constant_vus(
                        READ_SCENARIO,
                        READ_TAG,
                        1200,
                        Duration::from_secs(45),
                    ),
                },
                ScenarioOptions {
                    exec: Workflow::LikeWrite,
                    config: ScenarioConfig::ramping_arrival_rate(
                        WRITE_SCENARIO,
                        WRITE_TAG,
                        500,
                        600,
                        2000,
                        vec![
                            Stage::new(1500, Duration::from_secs(20)),
                            Stage::new(2500, Duration::from_secs(20)),
                            Stage::new(0, Duration::from_secs(5)),
                        ],
                    ),
                },
            ],
            thresholds: BTreeMap::from([
                (
                    format!("http_req_duration{{scenario:{READ_TAG}}}"),
                    vec!["p(95)<60".to_string()],
                ),
                (
                    format!("http_req_duration{{scenario:{WRITE_TAG}}}"),
                    vec!["p(95)<120".to_string()],
                ),
                (
                    "http_req_failed".to_string(),
                    vec!["rate<0.01".to_string()],
                ),
            ]),
            auth: AuthPolicy::default(),
        }
    }
}

impl WorkloadOptions {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn thresholds(&self) -> Result<Vec<Threshold>, OptionsError> {
        let mut thresholds = vec![];
        for (selector, exprs) in &self.thresholds {
            for expr in exprs {
                let threshold =
                    Threshold::parse(selector, expr).map_err(|source| OptionsError::Threshold {
                        selector: selector.clone(),
                        source,
                    })?;
                thresholds.push(threshold);
            }
        }
        Ok(thresholds)
    }

    /// Scale every VU count by `factor`, keeping at least one VU.
    pub fn scale_vus(&mut self, factor: f64) {
        for scenario in &mut self.scenarios {
            match &mut scenario.config.executor {
                ExecutorConfig::ConstantVus { vus, .. } => *vus = scale_count(*vus, factor),
                ExecutorConfig::RampingArrivalRate {
                    pre_allocated_vus,
                    max_vus,
                    ..
                } => {
                    *pre_allocated_vus = scale_count(*pre_allocated_vus, factor);
                    *max_vus = scale_count(*max_vus, factor).max(*pre_allocated_vus);
                }
            }
        }
    }

    /// Scale every arrival rate by `factor`. Stages ramping down to zero still reach zero.
    pub fn scale_rates(&mut self, factor: f64) {
        for scenario in &mut self.scenarios {
            if let ExecutorConfig::RampingArrivalRate {
                start_rate, stages, ..
            } = &mut scenario.config.executor
            {
                *start_rate = scale_rate(*start_rate, factor);
                for stage in stages {
                    stage.target = scale_rate(stage.target, factor);
                }
            }
        }
    }
}

fn scale_count(count: usize, factor: f64) -> usize {
    ((count as f64 * factor).round() as usize).max(1)
}

fn scale_rate(rate: u32, factor: f64) -> u32 {
    if rate == 0 {
        return 0;
    }
    ((rate as f64 * factor).round() as u32).max(1)
}
