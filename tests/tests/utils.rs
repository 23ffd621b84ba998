use forum_workload::ApiClient;
use mock_service::MockServer;
use std::sync::OnceLock;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("surge=debug,forum_workload=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A fresh mock API on an ephemeral port plus a client pointed at it.
#[allow(unused)]
pub async fn start() -> (MockServer, ApiClient) {
    init();
    let server = MockServer::start().await.unwrap();
    let client = ApiClient::new(&server.base_url()).unwrap();
    (server, client)
}

/// Paths of every request the mock received after the first `skip`.
#[allow(unused)]
pub fn paths_since(server: &MockServer, skip: usize) -> Vec<String> {
    server
        .state()
        .requests()
        .into_iter()
        .skip(skip)
        .map(|r| r.path)
        .collect()
}
