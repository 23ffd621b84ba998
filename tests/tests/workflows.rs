mod utils;
use utils::*;

use forum_workload::workflows::{final_read, like_write, read_detail};
use forum_workload::{provision, AuthPolicy, Credentials, Fixture};
use surge::Vu;

async fn provisioned() -> (mock_service::MockServer, forum_workload::ApiClient, Fixture) {
    let (server, client) = start().await;
    let fixture = provision(&client, &Credentials::default(), AuthPolicy::Shared)
        .await
        .unwrap();
    (server, client, fixture)
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn read_is_anonymous_and_only_touches_hotspot() {
    let (server, client, fixture) = provisioned().await;
    let before = server.state().requests().len();

    for _ in 0..3 {
        read_detail(&client, &fixture).await;
    }

    let requests: Vec<_> = server.state().requests().into_iter().skip(before).collect();
    assert_eq!(requests.len(), 3);
    let hotspot_path = format!("/api/v1/posts/{}", fixture.hotspot_post_id());
    for req in requests {
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, hotspot_path);
        assert_eq!(req.authorization, None);
    }
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn likes_are_authenticated_round_robin() {
    let (server, client, fixture) = provisioned().await;
    let before = server.state().requests().len();

    for id in 0..7 {
        like_write(&client, &fixture, Vu::new(id, 0)).await;
    }

    let requests: Vec<_> = server.state().requests().into_iter().skip(before).collect();
    let expected: Vec<String> = [0, 1, 2, 3, 4, 0, 1]
        .iter()
        .map(|i| format!("/api/v1/posts/{}/like", fixture.target_post_ids()[*i]))
        .collect();
    let paths: Vec<String> = requests.iter().map(|r| r.path.clone()).collect();
    assert_eq!(paths, expected);

    let bearer = format!("Bearer {}", fixture.auth_token());
    assert!(requests
        .iter()
        .all(|r| r.method == "POST" && r.authorization.as_deref() == Some(bearer.as_str())));

    // Likes toggle per user: targets A and B were liked twice, the rest once.
    let targets = fixture.target_post_ids();
    assert_eq!(server.state().likes(targets[0].0), 0);
    assert_eq!(server.state().likes(targets[2].0), 1);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn final_read_is_single_anonymous_get() {
    let (server, client, fixture) = provisioned().await;
    let before = server.state().requests().len();

    final_read(&client, &fixture).await;

    assert_eq!(
        paths_since(&server, before),
        vec![format!("/api/v1/posts/{}", fixture.hotspot_post_id())]
    );
}
