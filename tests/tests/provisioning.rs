mod utils;
use utils::*;

use forum_workload::provision::{login, register_if_needed};
use forum_workload::{provision, AuthPolicy, Credentials, Registration, SetupError};
use std::collections::HashSet;

#[tokio::test]
#[ntest::timeout(10_000)]
async fn provisions_complete_fixture() {
    let (server, client) = start().await;

    let fixture = provision(&client, &Credentials::default(), AuthPolicy::Shared)
        .await
        .unwrap();

    assert!(!fixture.auth_token().is_empty());
    assert!(fixture.pool_tokens().is_empty());

    let hotspot = server.state().post(fixture.hotspot_post_id().0).unwrap();
    assert_eq!(hotspot.title, "Hot Post");
    assert_eq!(hotspot.content, "This is a hot post for cache.");
    assert_eq!(hotspot.community_id, 1);

    let targets = fixture.target_post_ids();
    assert_eq!(targets.len(), 5);
    let distinct: HashSet<_> = targets.iter().collect();
    assert_eq!(distinct.len(), 5);
    assert!(!targets.contains(&fixture.hotspot_post_id()));

    for (i, id) in targets.iter().enumerate() {
        let post = server.state().post(id.0).unwrap();
        assert_eq!(post.title, format!("Like Target {i}"));
        assert_eq!(post.content, "for like set pressure");
    }

    let hotspot_path = format!("/api/v1/posts/{}", fixture.hotspot_post_id());
    let preloads = paths_since(&server, 0)
        .into_iter()
        .filter(|p| *p == hotspot_path)
        .count();
    assert_eq!(preloads, 5);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn registration_is_idempotent() {
    let (server, client) = start().await;
    let creds = Credentials::for_suffix("idem");

    assert_eq!(
        register_if_needed(&client, &creds).await.unwrap(),
        Registration::Created
    );
    assert_eq!(
        register_if_needed(&client, &creds).await.unwrap(),
        Registration::AlreadyExists
    );
    assert_eq!(server.state().user_count(), 1);

    // A second full provisioning against the same server reuses the account.
    provision(&client, &creds, AuthPolicy::Shared).await.unwrap();
    provision(&client, &creds, AuthPolicy::Shared).await.unwrap();
    assert_eq!(server.state().user_count(), 1);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn login_failure_is_fatal() {
    let (server, client) = start().await;
    server.state().set_reject_logins(true);

    let res = provision(&client, &Credentials::default(), AuthPolicy::Shared).await;

    assert!(matches!(res, Err(SetupError::Login { status: 401, .. })));
    assert!(server.state().posts().is_empty());
    assert_eq!(
        paths_since(&server, 0),
        vec!["/api/v1/register".to_string(), "/api/v1/login".to_string()]
    );
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn unknown_account_cannot_log_in() {
    let (_server, client) = start().await;

    let res = login(&client, &Credentials::for_suffix("ghost")).await;
    assert!(matches!(res, Err(SetupError::Login { status: 401, .. })));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn unreachable_api_is_fatal() {
    init();
    let client = forum_workload::ApiClient::new("http://127.0.0.1:1/api/v1").unwrap();

    let res = provision(&client, &Credentials::default(), AuthPolicy::Shared).await;
    assert!(matches!(res, Err(SetupError::Api(_))));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn account_pool_provisions_extra_sessions() {
    let (server, client) = start().await;

    let fixture = provision(
        &client,
        &Credentials::for_suffix("pool"),
        AuthPolicy::AccountPool { size: 3 },
    )
    .await
    .unwrap();

    let tokens: HashSet<_> = fixture.pool_tokens().iter().collect();
    assert_eq!(tokens.len(), 3);
    assert!(!fixture
        .pool_tokens()
        .iter()
        .any(|t| t == fixture.auth_token()));
    assert_eq!(server.state().user_count(), 4);
    assert_eq!(fixture.token_for(4), fixture.pool_tokens()[1]);
}
