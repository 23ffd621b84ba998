use crate::client::ApiClient;
use crate::credentials::Credentials;
use crate::fixture::Fixture;
use crate::options::{OptionsError, Workflow, WorkloadOptions};
use crate::provision::provision;
use crate::workflows::{final_read, like_write, read_detail};
use std::sync::Arc;
use surge::{LoadTest, Scenario};

/// Assemble the load test: provisioning as setup, one scenario per configured workflow, the
/// final read as teardown, and the configured thresholds.
pub fn load_test(
    client: ApiClient,
    credentials: Credentials,
    options: &WorkloadOptions,
) -> Result<LoadTest<Fixture>, OptionsError> {
    let thresholds = options.thresholds()?;
    let auth = options.auth;

    let mut test = LoadTest::new({
        let client = client.clone();
        move || async move { provision(&client, &credentials, auth).await }
    });

    for scenario in &options.scenarios {
        let client = client.clone();
        let config = scenario.config.clone();
        let scenario = match scenario.exec {
            Workflow::ReadDetail => Scenario::new(config, move |fixture: Arc<Fixture>, _vu| {
                let client = client.clone();
                async move { read_detail(&client, &fixture).await }
            }),
            Workflow::LikeWrite => Scenario::new(config, move |fixture: Arc<Fixture>, vu| {
                let client = client.clone();
                async move { like_write(&client, &fixture, vu).await }
            }),
        };
        test = test.scenario(scenario);
    }

    Ok(test
        .teardown(move |fixture| async move { final_read(&client, &fixture).await })
        .thresholds(thresholds))
}
