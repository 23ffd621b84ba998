use metrics_util::AtomicBucket;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use surge_core::SeriesSnapshot;

/// Lock-free sample sink for every request issued under one tag.
pub(crate) struct Series {
    tag: Arc<str>,
    success: AtomicU64,
    error: AtomicU64,
    latency: AtomicBucket<Duration>,
}

impl Series {
    fn new(tag: &str) -> Self {
        Self {
            tag: Arc::from(tag),
            success: AtomicU64::new(0),
            error: AtomicU64::new(0),
            latency: AtomicBucket::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn record(&self, elapsed: Duration, failed: bool) {
        self.latency.push(elapsed);

        if failed {
            self.error.fetch_add(1, Ordering::Relaxed);
        } else {
            self.success.fetch_add(1, Ordering::Relaxed);
        }

        #[cfg(feature = "metrics")]
        {
            use surge_core::{HTTP_REQS, HTTP_REQ_DURATION, HTTP_REQ_FAILED, SCENARIO_TAG_KEY};

            let tag = self.tag.to_string();
            metrics::histogram!(HTTP_REQ_DURATION, SCENARIO_TAG_KEY => tag.clone())
                .record(elapsed.as_secs_f64() * 1e3);
            metrics::counter!(HTTP_REQS, SCENARIO_TAG_KEY => tag.clone()).increment(1);
            if failed {
                metrics::counter!(HTTP_REQ_FAILED, SCENARIO_TAG_KEY => tag).increment(1);
            }
        }
    }

    pub fn snapshot(&self) -> SeriesSnapshot {
        SeriesSnapshot::new(
            &self.tag,
            self.latency.data(),
            self.success.load(Ordering::Relaxed),
            self.error.load(Ordering::Relaxed),
        )
    }
}

/// One [`Series`] per tag, registered before any worker starts.
#[derive(Default)]
pub(crate) struct Recorder {
    series: BTreeMap<String, Arc<Series>>,
}

impl Recorder {
    /// The series for `tag`, created on first use. Scenarios sharing a tag share a series.
    pub fn register(&mut self, tag: &str) -> Arc<Series> {
        self.series
            .entry(tag.to_string())
            .or_insert_with(|| Arc::new(Series::new(tag)))
            .clone()
    }

    pub fn snapshot(&self) -> Vec<SeriesSnapshot> {
        self.series.values().map(|s| s.snapshot()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_per_tag() {
        let mut recorder = Recorder::default();
        let read = recorder.register("read");
        let write = recorder.register("write");
        assert!(Arc::ptr_eq(&read, &recorder.register("read")));

        read.record(Duration::from_millis(5), false);
        read.record(Duration::from_millis(1), true);
        write.record(Duration::from_millis(9), false);

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.len(), 2);

        let read = snapshot.iter().find(|s| s.tag == "read").unwrap();
        assert_eq!(read.success, 1);
        assert_eq!(read.error, 1);
        assert_eq!(
            read.latencies,
            vec![Duration::from_millis(1), Duration::from_millis(5)]
        );
    }

    #[test]
    fn records_from_many_threads() {
        let series = Recorder::default().register("read");

        std::thread::scope(|s| {
            for _ in 0..8 {
                let series = series.clone();
                s.spawn(move || {
                    for i in 0..1_000 {
                        series.record(Duration::from_micros(i), false);
                    }
                });
            }
        });

        let snapshot = series.snapshot();
        assert_eq!(snapshot.success, 8_000);
        assert_eq!(snapshot.latencies.len(), 8_000);
    }
}
