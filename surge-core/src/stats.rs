use std::fmt;
use std::time::Duration;

/// Run Statistics for a given Scenario
///
/// Summary of one scenario's run, computed once all of its iterations have finished.
#[derive(Clone, Debug)]
pub struct RunStatistics {
    pub scenario: String,
    pub tag: String,
    /// Highest number of concurrently allocated workers.
    pub concurrency: usize,
    pub iterations: u64,
    pub requests: u64,
    pub actual_tps: f64,
    pub error_rate: f64,
    pub latency_p50: Duration,
    pub latency_p90: Duration,
    pub latency_p95: Duration,
    pub latency_p99: Duration,
    pub elapsed: Duration,
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: VUs={}, iterations={}, requests={}, TPS={:.2}, ErrorRate={:.4}, p50={:?}, p90={:?}, p95={:?}, p99={:?}, elapsed={}",
            self.scenario,
            self.tag,
            self.concurrency,
            self.iterations,
            self.requests,
            self.actual_tps,
            self.error_rate,
            self.latency_p50,
            self.latency_p90,
            self.latency_p95,
            self.latency_p99,
            humantime::format_duration(self.elapsed),
        )
    }
}

/// Pass/fail totals for one named check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

impl CheckSummary {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }
}

impl fmt::Display for CheckSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.fails == 0 { "✓" } else { "✗" };
        write!(
            f,
            "{mark} {} ({}/{} passed)",
            self.name,
            self.passes,
            self.total()
        )
    }
}

/// Every request sample recorded under one tag, collected at the end of a run.
#[derive(Clone, Debug, Default)]
pub struct SeriesSnapshot {
    pub tag: String,
    /// Sorted ascending.
    pub latencies: Vec<Duration>,
    pub success: u64,
    pub error: u64,
}

impl SeriesSnapshot {
    pub fn new(tag: &str, mut latencies: Vec<Duration>, success: u64, error: u64) -> Self {
        latencies.sort_unstable();
        Self {
            tag: tag.to_string(),
            latencies,
            success,
            error,
        }
    }

    pub fn total(&self) -> u64 {
        self.success + self.error
    }

    pub fn error_rate(&self) -> f64 {
        rate(self.error, self.total()).unwrap_or(0.)
    }

    pub fn latency(&self, quantile: f64) -> Duration {
        percentile(&self.latencies, quantile * 100.).unwrap_or_default()
    }
}

/// All samples of a finished run. Threshold evaluation is a pure function of this value.
#[derive(Clone, Debug, Default)]
pub struct RunSnapshot {
    pub series: Vec<SeriesSnapshot>,
    pub checks: Vec<CheckSummary>,
}

impl RunSnapshot {
    pub fn series(&self, tag: &str) -> Option<&SeriesSnapshot> {
        self.series.iter().find(|s| s.tag == tag)
    }

    /// Sorted latencies for `tag`, or for every tag when `None`.
    pub fn latencies(&self, tag: Option<&str>) -> Vec<Duration> {
        match tag {
            Some(tag) => self
                .series(tag)
                .map(|s| s.latencies.clone())
                .unwrap_or_default(),
            None => {
                let mut all: Vec<Duration> = self
                    .series
                    .iter()
                    .flat_map(|s| s.latencies.iter().copied())
                    .collect();
                all.sort_unstable();
                all
            }
        }
    }

    /// Fraction of failed requests, `None` when no request was recorded.
    pub fn failure_rate(&self, tag: Option<&str>) -> Option<f64> {
        let (error, total) = self
            .series
            .iter()
            .filter(|s| tag.map_or(true, |t| s.tag == t))
            .fold((0, 0), |(e, t), s| (e + s.error, t + s.total()));
        rate(error, total)
    }

    /// Fraction of passed checks, `None` when no check was recorded.
    pub fn check_pass_rate(&self) -> Option<f64> {
        let (passes, total) = self
            .checks
            .iter()
            .fold((0, 0), |(p, t), c| (p + c.passes, t + c.total()));
        rate(passes, total)
    }
}

fn rate(count: u64, total: u64) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(count as f64 / total as f64)
    }
}

/// The `p`th percentile (0..=100) of `sorted`, linearly interpolated between the closest ranks.
///
/// Computed in whole nanoseconds so that a sample set whose percentile lands exactly on a
/// recorded value reports that value exactly.
pub fn percentile(sorted: &[Duration], p: f64) -> Option<Duration> {
    if sorted.is_empty() {
        return None;
    }

    let rank = (p.clamp(0., 100.) / 100.) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    let lo = sorted[lower].as_nanos() as f64;
    let hi = sorted[upper].as_nanos() as f64;
    let nanos = lo + (hi - lo) * (rank - lower as f64);

    Some(Duration::from_nanos(nanos.round() as u64))
}
