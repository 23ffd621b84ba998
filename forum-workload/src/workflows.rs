//! Per-iteration workflows and the end-of-run finalization.
use crate::client::ApiClient;
use crate::constants::*;
use crate::fixture::Fixture;
use surge::{check, Vu};
use tokio::time::sleep;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

/// Unauthenticated read of the hotspot post, then the read think-time.
pub async fn read_detail(client: &ApiClient, fixture: &Fixture) {
    let res = client.get_post(fixture.hotspot_post_id()).await;
    if let Err(err) = &res {
        debug!("Detail read failed: {err}");
    }

    check(DETAIL_200, matches!(&res, Ok(r) if r.is_ok()));
    check(
        DETAIL_FAST,
        matches!(&res, Ok(r) if r.elapsed() < READ_LATENCY_CEILING),
    );

    sleep(READ_THINK_TIME).await;
}

/// Authenticated like of the target picked by worker identity, then the write think-time.
pub async fn like_write(client: &ApiClient, fixture: &Fixture, vu: Vu) {
    match fixture.target_for(vu.id()) {
        Some(target) => {
            let res = client.like_post(fixture.token_for(vu.id()), target).await;
            if let Err(err) = &res {
                debug!("Like of post {target} failed: {err}");
            }
            check(LIKE_200, matches!(&res, Ok(r) if r.is_ok()));
        }
        None => {
            error!("Fixture has no like targets");
            check(LIKE_200, false);
        }
    }

    sleep(WRITE_THINK_TIME).await;
}

/// A single read of the hotspot post once every scenario has stopped.
pub async fn final_read(client: &ApiClient, fixture: &Fixture) {
    let res = client.get_post(fixture.hotspot_post_id()).await;
    check(FINAL_READ_OK, matches!(&res, Ok(r) if r.is_ok()));

    match &res {
        Ok(r) => info!(
            "Final read of post {}: status={}, body={}",
            fixture.hotspot_post_id(),
            r.status(),
            r.body().map(|b| b.to_string()).unwrap_or_default()
        ),
        Err(err) => warn!("Final read of post {} failed: {err}", fixture.hotspot_post_id()),
    }
}
