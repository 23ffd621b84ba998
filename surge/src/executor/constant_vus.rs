use super::{join_workers, Executor, ExecutorReport};
use crate::scenario::{BoxedFut, IterationFn, Vu};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

/// A fixed pool of workers, each looping the workflow until the duration has elapsed.
#[derive(Clone, Debug)]
pub struct ConstantVus {
    vus: usize,
    duration: Duration,
}

impl ConstantVus {
    pub fn new(vus: usize, duration: Duration) -> Self {
        Self { vus, duration }
    }
}

impl Executor for ConstantVus {
    fn execute(&self, iteration: IterationFn) -> BoxedFut<'_, ExecutorReport> {
        Box::pin(async move {
            info!(
                "Starting {} VUs for {}",
                self.vus,
                humantime::format_duration(self.duration)
            );

            let start = Instant::now();
            let deadline = start + self.duration;
            let iterations = Arc::new(AtomicU64::new(0));

            let workers: Vec<_> = (0..self.vus as u64)
                .map(|id| {
                    let iteration = iteration.clone();
                    let iterations = iterations.clone();
                    tokio::spawn(async move {
                        let mut count = 0;
                        // NOTE: The deadline is only checked between iterations, so an iteration
                        // which has started always runs to completion.
                        while Instant::now() < deadline {
                            iteration(Vu::new(id, count)).await;
                            count += 1;
                        }
                        iterations.fetch_add(count, Ordering::Relaxed);
                    })
                })
                .collect();

            join_workers(workers).await;

            let report = ExecutorReport {
                iterations: iterations.load(Ordering::Relaxed),
                peak_vus: self.vus,
                elapsed: start.elapsed(),
            };
            debug!("Constant VUs finished: {report:?}");
            report
        })
    }
}
