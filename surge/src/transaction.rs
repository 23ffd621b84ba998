use crate::check::CheckRegistry;
use crate::recorder::Series;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

/// Classifies a successful transaction result as a failed request.
///
/// A transaction which returns `Err` always counts as failed; for `Ok` values this trait decides,
/// e.g. an HTTP response with a 5xx status.
pub trait Outcome {
    fn is_failure(&self) -> bool;
}

impl Outcome for () {
    fn is_failure(&self) -> bool {
        false
    }
}

/// Transaction hook used by the `#[transaction]` macro. Not intended to be used manually.
pub async fn transaction_hook<T, R, E>(func: T) -> T::Output
where
    T: Future<Output = Result<R, E>>,
    R: Outcome,
{
    if let Ok(series) = TRANSACTION_HOOK.try_with(|v| v.series.clone()) {
        let start = Instant::now();
        let res = func.await;
        let elapsed = start.elapsed();

        let failed = match &res {
            Ok(r) => r.is_failure(),
            Err(_) => true,
        };
        series.record(elapsed, failed);

        res
    } else {
        tracing::warn!("No hook available.");
        func.await
    }
}

#[derive(Clone)]
pub(crate) struct TransactionData {
    pub series: Arc<Series>,
    pub checks: Arc<CheckRegistry>,
}

tokio::task_local! {
    pub(crate) static TRANSACTION_HOOK: TransactionData;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::Recorder;

    struct Status(u16);

    impl Outcome for Status {
        fn is_failure(&self) -> bool {
            self.0 >= 400
        }
    }

    async fn call(status: u16) -> Result<Status, ()> {
        transaction_hook(async move { Ok(Status(status)) }).await
    }

    async fn broken() -> Result<(), &'static str> {
        transaction_hook(async { Err("connection refused") }).await
    }

    #[tokio::test]
    async fn records_under_scoped_tag() {
        let mut recorder = Recorder::default();
        let data = TransactionData {
            series: recorder.register("read"),
            checks: Arc::new(CheckRegistry::default()),
        };

        TRANSACTION_HOOK
            .scope(data, async {
                let _ = call(200).await;
                let _ = call(409).await;
                let _ = broken().await;
            })
            .await;

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot[0].success, 1);
        assert_eq!(snapshot[0].error, 2);
        assert_eq!(snapshot[0].latencies.len(), 3);
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn passes_through_without_hook() {
        let res = call(200).await;
        assert!(matches!(res, Ok(Status(200))));
        assert!(logs_contain("No hook available."));
    }
}
