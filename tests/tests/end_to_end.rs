mod utils;
use utils::*;

use forum_workload::constants::*;
use forum_workload::{load_test, Credentials, ScenarioOptions, Workflow, WorkloadOptions};
use std::time::Duration;
use surge::core::{ScenarioConfig, Stage};
use surge::RunError;

/// The standard workload shrunk to a couple of seconds.
fn smoke_options() -> WorkloadOptions {
    WorkloadOptions {
        scenarios: vec![
            ScenarioOptions {
                exec: Workflow::ReadDetail,
                config: ScenarioConfig::constant_vus(
                    READ_SCENARIO,
                    READ_TAG,
                    4,
                    Duration::from_secs(2),
                ),
            },
            ScenarioOptions {
                exec: Workflow::LikeWrite,
                config: ScenarioConfig::ramping_arrival_rate(
                    WRITE_SCENARIO,
                    WRITE_TAG,
                    5,
                    2,
                    10,
                    vec![
                        Stage::new(20, Duration::from_secs(1)),
                        Stage::new(0, Duration::from_secs(1)),
                    ],
                ),
            },
        ],
        ..WorkloadOptions::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn smoke_run_passes() {
    let (server, client) = start().await;

    let report = load_test(client, Credentials::default(), &smoke_options())
        .unwrap()
        .run()
        .await
        .unwrap();

    println!("{report}");
    assert!(report.passed());
    assert_eq!(report.thresholds.len(), 3);

    let read = report.scenario(READ_SCENARIO).unwrap();
    assert_eq!(read.concurrency, 4);
    assert!(read.iterations >= 4);
    assert_eq!(read.requests, read.iterations);
    assert_eq!(read.error_rate, 0.);

    let write = report.scenario(WRITE_SCENARIO).unwrap();
    assert!(write.iterations > 0);
    assert!(write.concurrency <= 10);

    let login = report.check(LOGIN_200).unwrap();
    assert_eq!((login.passes, login.fails), (1, 0));
    assert_eq!(report.check(CREATE_POST_OK).unwrap().passes, 6);
    assert_eq!(report.check(PRELOAD_200).unwrap().passes, 5);
    assert_eq!(report.check(DETAIL_200).unwrap().fails, 0);
    assert_eq!(report.check(LIKE_200).unwrap().fails, 0);

    let final_read = report.check(FINAL_READ_OK).unwrap();
    assert_eq!((final_read.passes, final_read.fails), (1, 0));

    // The final read is the last request the server saw.
    let last = server.state().requests().pop().unwrap();
    assert_eq!(last.method, "GET");
    assert!(last.authorization.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn setup_failure_skips_scenarios() {
    let (server, client) = start().await;
    server.state().set_reject_logins(true);

    let res = load_test(client, Credentials::default(), &smoke_options())
        .unwrap()
        .run()
        .await;

    assert!(matches!(res, Err(RunError::Setup(_))));
    assert_eq!(
        paths_since(&server, 0),
        vec!["/api/v1/register".to_string(), "/api/v1/login".to_string()]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn slow_reads_fail_the_run() {
    let (server, client) = start().await;
    server.state().set_read_delay(Duration::from_millis(70));

    let mut options = smoke_options();
    options.scenarios.truncate(1);

    let report = load_test(client, Credentials::default(), &options)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(!report.passed());
    let read = report
        .thresholds
        .iter()
        .find(|t| t.threshold.starts_with("http_req_duration{scenario:read}"))
        .unwrap();
    assert!(!read.passed);
    assert!(read.observed.unwrap() >= 70.);

    // Slow but successful: every other threshold still holds.
    assert_eq!(report.thresholds.iter().filter(|t| !t.passed).count(), 1);
}
