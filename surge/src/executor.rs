//! Executors decide how many workers run a workflow, and when.
//!
//! Two strategies are provided: [`ConstantVus`] keeps a fixed pool of workers looping for a
//! bounded duration, and [`RampingArrivalRate`] starts iterations at a rate that follows a
//! staged schedule, sizing its worker pool between declared bounds. In both cases the scenario
//! ends by refusing to start new iterations; iterations already in flight run to completion.
use crate::scenario::{BoxedFut, IterationFn};
use futures_util::future::join_all;
use std::time::Duration;
use surge_core::{ExecutorConfig, RampingSchedule, ScenarioConfig};
use tokio::task::JoinHandle;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

mod constant_vus;
mod ramping_arrival_rate;

pub use constant_vus::ConstantVus;
pub use ramping_arrival_rate::RampingArrivalRate;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutorReport {
    pub iterations: u64,
    /// Highest number of workers allocated at once.
    pub peak_vus: usize,
    pub elapsed: Duration,
}

pub trait Executor: Send + Sync {
    /// Drive `iteration` until the executor's schedule is exhausted, then wait for every worker
    /// to finish its current iteration.
    fn execute(&self, iteration: IterationFn) -> BoxedFut<'_, ExecutorReport>;
}

/// Build the executor described by a scenario's configuration.
pub fn from_config(config: &ScenarioConfig) -> Box<dyn Executor> {
    match &config.executor {
        ExecutorConfig::ConstantVus { vus, duration } => {
            Box::new(ConstantVus::new(*vus, *duration))
        }
        ExecutorConfig::RampingArrivalRate {
            start_rate,
            time_unit,
            pre_allocated_vus,
            max_vus,
            stages,
        } => Box::new(RampingArrivalRate::new(
            RampingSchedule::new(*start_rate, *time_unit, stages),
            *pre_allocated_vus,
            *max_vus,
        )),
    }
}

async fn join_workers(workers: Vec<JoinHandle<()>>) {
    for res in join_all(workers).await {
        if let Err(err) = res {
            error!("Worker task failed: {err}");
        }
    }
}
