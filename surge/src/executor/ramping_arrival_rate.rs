use super::{join_workers, Executor, ExecutorReport};
use crate::scenario::{BoxedFut, IterationFn, Vu};
use crate::timer::Timer;
use arc_swap::ArcSwapOption;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use surge_core::{RampingSchedule, CONTROL_INTERVAL};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

/// Permits are allowed to bunch up over this window, so that timer granularity does not cap the
/// achievable rate.
const BURST_WINDOW: Duration = Duration::from_millis(10);

/// Relative change in the scheduled rate below which the limiter is left untouched.
const RATE_TOLERANCE: f64 = 0.01;

/// Starts iterations at the rate given by a [`RampingSchedule`].
///
/// Workers wait on a shared rate limiter before each iteration. The limiter is swapped out every
/// [`CONTROL_INTERVAL`] to follow the schedule, and whenever every allocated worker is busy the
/// pool grows, up to `max_vus`. Only the current limiter admits iterations: workers waiting on a
/// replaced one are woken and move over to its successor.
#[derive(Clone, Debug)]
pub struct RampingArrivalRate {
    schedule: RampingSchedule,
    pre_allocated_vus: usize,
    max_vus: usize,
}

impl RampingArrivalRate {
    pub fn new(schedule: RampingSchedule, pre_allocated_vus: usize, max_vus: usize) -> Self {
        Self {
            schedule,
            pre_allocated_vus,
            max_vus: max_vus.max(pre_allocated_vus),
        }
    }
}

impl Executor for RampingArrivalRate {
    fn execute(&self, iteration: IterationFn) -> BoxedFut<'_, ExecutorReport> {
        Box::pin(async move {
            info!(
                "Starting arrival-rate executor over {} with {} pre-allocated VUs (max {})",
                humantime::format_duration(self.schedule.total_duration()),
                self.pre_allocated_vus,
                self.max_vus
            );

            let start = Instant::now();
            let deadline = start + self.schedule.total_duration();

            let mut rate = self.schedule.rate_at(CONTROL_INTERVAL / 2);
            let shared = Arc::new(PoolState::new(rate));

            let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(self.pre_allocated_vus);
            for id in 0..self.pre_allocated_vus as u64 {
                workers.push(spawn_worker(id, &iteration, &shared, deadline));
            }

            // NOTE: This loop is time-sensitive. Any long awaits or blocking will throw off the
            // rate limiter updates.
            let mut timer = Timer::new(CONTROL_INTERVAL).await;
            while Instant::now() < deadline {
                let tick = timer.tick().await;
                if tick > CONTROL_INTERVAL * 2 {
                    warn!("Arrival-rate control loop is lagging, {tick:?} since the last tick");
                }

                // The rate held until the next tick, taken mid-interval so a linear ramp
                // integrates exactly.
                let next = self.schedule.rate_at(start.elapsed() + CONTROL_INTERVAL / 2);
                if rate_changed(rate, next) {
                    trace!("Arrival rate {rate:.2}/s -> {next:.2}/s");
                    rate = next;
                    shared.set_rate(rate);
                }

                let busy = shared.busy.load(Ordering::Relaxed);
                if busy >= workers.len() && workers.len() < self.max_vus && rate > 0. {
                    let wanted = ((rate * CONTROL_INTERVAL.as_secs_f64()).ceil() as usize).max(1);
                    let grow = wanted.min(self.max_vus - workers.len());
                    debug!(
                        "All {} VUs busy at {rate:.2}/s, allocating {grow} more",
                        workers.len()
                    );
                    for _ in 0..grow {
                        let id = workers.len() as u64;
                        workers.push(spawn_worker(id, &iteration, &shared, deadline));
                    }
                }
            }

            let peak_vus = workers.len();
            join_workers(workers).await;

            let report = ExecutorReport {
                iterations: shared.iterations.load(Ordering::Relaxed),
                peak_vus,
                elapsed: start.elapsed(),
            };
            debug!("Arrival-rate executor finished: {report:?}");
            report
        })
    }
}

struct PoolState {
    /// `None` while the scheduled rate is zero.
    gate: ArcSwapOption<DefaultDirectRateLimiter>,
    swapped: Notify,
    busy: AtomicUsize,
    iterations: AtomicU64,
}

impl PoolState {
    fn new(rate: f64) -> Self {
        Self {
            gate: ArcSwapOption::new(rate_limiter(rate).map(Arc::new)),
            swapped: Notify::new(),
            busy: AtomicUsize::new(0),
            iterations: AtomicU64::new(0),
        }
    }

    fn set_rate(&self, rate: f64) {
        self.gate.store(successor_limiter(rate).map(Arc::new));
        self.swapped.notify_waiters();
    }

    fn is_current(&self, limiter: &Arc<DefaultDirectRateLimiter>) -> bool {
        let current = self.gate.load();
        matches!(&*current, Some(current) if Arc::ptr_eq(current, limiter))
    }

    /// Wait for the next arrival. Returns `false` once no more iterations may start.
    async fn acquire(&self, deadline: Instant) -> bool {
        loop {
            if Instant::now() >= deadline {
                return false;
            }

            // Registered before the gate is read, so a swap in between still wakes us.
            let swapped = self.swapped.notified();

            match self.gate.load_full() {
                Some(limiter) => tokio::select! {
                    _ = limiter.until_ready() => {
                        // A permit from a replaced limiter does not count as an arrival.
                        if self.is_current(&limiter) {
                            return Instant::now() < deadline;
                        }
                    }
                    _ = swapped => {}
                    _ = sleep_until(deadline) => return false,
                },
                None => tokio::select! {
                    _ = swapped => {}
                    _ = sleep_until(deadline) => return false,
                },
            }
        }
    }
}

fn spawn_worker(
    id: u64,
    iteration: &IterationFn,
    shared: &Arc<PoolState>,
    deadline: Instant,
) -> JoinHandle<()> {
    let iteration = iteration.clone();
    let shared = shared.clone();

    tokio::spawn(async move {
        let mut count = 0;
        while shared.acquire(deadline).await {
            shared.busy.fetch_add(1, Ordering::Relaxed);
            iteration(Vu::new(id, count)).await;
            shared.busy.fetch_sub(1, Ordering::Relaxed);
            count += 1;
        }
        shared.iterations.fetch_add(count, Ordering::Relaxed);
    })
}

fn rate_changed(current: f64, next: f64) -> bool {
    if (current > 0.) != (next > 0.) {
        return true;
    }
    (next - current).abs() > current.max(1.) * RATE_TOLERANCE
}

fn burst_size(rate: f64) -> NonZeroU32 {
    let burst = (rate * BURST_WINDOW.as_secs_f64()).ceil().min(u32::MAX as f64) as u32;
    NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN)
}

fn rate_limiter(rate: f64) -> Option<DefaultDirectRateLimiter> {
    if !rate.is_finite() || rate <= 0. {
        return None;
    }

    let quota = Quota::with_period(Duration::from_secs_f64(1. / rate))?;
    Some(RateLimiter::direct(quota.allow_burst(burst_size(rate))))
}

/// A limiter taking over mid-run. It keeps a single permit of its initial burst, so swapping
/// continues the current pace rather than releasing a burst.
fn successor_limiter(rate: f64) -> Option<DefaultDirectRateLimiter> {
    let limiter = rate_limiter(rate)?;
    for _ in 1..burst_size(rate).get() {
        let _ = limiter.check();
    }
    Some(limiter)
}
