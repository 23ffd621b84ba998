//! One-time creation of the fixture every scenario reads.
//!
//! Provisioning is strictly sequential and all-or-nothing: the first failing step aborts it and
//! no partial fixture is ever returned. Nothing is retried.
use crate::client::{ApiClient, ApiError, PostId};
use crate::constants::*;
use crate::credentials::Credentials;
use crate::fixture::{AuthPolicy, Fixture};
use surge::check;
use thiserror::Error;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Registering '{username}' failed with status {status}")]
    Registration { username: String, status: u16 },

    #[error("Login as '{username}' failed with status {status}")]
    Login { username: String, status: u16 },

    #[error("Login as '{0}' returned no session id")]
    MissingSession(String),

    #[error("Creating post '{title}' failed with status {status}")]
    CreatePost { title: String, status: u16 },

    #[error("Creating post '{0}' returned no post id")]
    MissingPostId(String),

    #[error("Preloading post {post} failed with status {status}")]
    Preload { post: PostId, status: u16 },

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    Created,
    AlreadyExists,
}

/// Register the account, treating an existing account as success.
pub async fn register_if_needed(
    client: &ApiClient,
    credentials: &Credentials,
) -> Result<Registration, SetupError> {
    let res = client.register(credentials).await?;
    match res.status() {
        200 => Ok(Registration::Created),
        409 => {
            debug!("Account '{}' already exists", credentials.username);
            Ok(Registration::AlreadyExists)
        }
        status => Err(SetupError::Registration {
            username: credentials.username.clone(),
            status,
        }),
    }
}

/// Log in and return the session token.
pub async fn login(client: &ApiClient, credentials: &Credentials) -> Result<String, SetupError> {
    let res = client.login(credentials).await;
    check(
        LOGIN_200,
        matches!(&res, Ok(r) if r.is_ok() && r.session_id().is_some()),
    );

    let res = res?;
    if !res.is_ok() {
        return Err(SetupError::Login {
            username: credentials.username.clone(),
            status: res.status(),
        });
    }
    res.session_id()
        .map(str::to_string)
        .ok_or_else(|| SetupError::MissingSession(credentials.username.clone()))
}

pub async fn create_post(
    client: &ApiClient,
    token: &str,
    title: &str,
    content: &str,
) -> Result<PostId, SetupError> {
    let res = client
        .create_post(token, title, content, COMMUNITY_ID)
        .await;
    check(
        CREATE_POST_OK,
        matches!(&res, Ok(r) if r.is_ok() && r.post_id().is_some()),
    );

    let res = res?;
    if !res.is_ok() {
        return Err(SetupError::CreatePost {
            title: title.to_string(),
            status: res.status(),
        });
    }
    res.post_id()
        .ok_or_else(|| SetupError::MissingPostId(title.to_string()))
}

pub async fn preload(client: &ApiClient, post: PostId) -> Result<(), SetupError> {
    let res = client.get_post(post).await;
    check(PRELOAD_200, matches!(&res, Ok(r) if r.is_ok()));

    let res = res?;
    if !res.is_ok() {
        return Err(SetupError::Preload {
            post,
            status: res.status(),
        });
    }
    Ok(())
}

/// Build the fixture: account, session, hotspot post, like targets, then cache warm-up.
pub async fn provision(
    client: &ApiClient,
    credentials: &Credentials,
    auth: AuthPolicy,
) -> Result<Fixture, SetupError> {
    info!(
        "Provisioning fixture as '{}' against {}",
        credentials.username,
        client.base_url()
    );

    register_if_needed(client, credentials).await?;
    let token = login(client, credentials).await?;

    let hotspot = create_post(client, &token, HOTSPOT_TITLE, HOTSPOT_CONTENT).await?;

    let mut targets = Vec::with_capacity(TARGET_POST_COUNT);
    for i in 0..TARGET_POST_COUNT {
        let title = format!("Like Target {i}");
        targets.push(create_post(client, &token, &title, TARGET_CONTENT).await?);
    }

    for _ in 0..PRELOAD_COUNT {
        preload(client, hotspot).await?;
    }

    let pool_tokens = match auth {
        AuthPolicy::Shared => vec![],
        AuthPolicy::AccountPool { size } => {
            let mut tokens = Vec::with_capacity(size);
            for i in 0..size {
                let account = credentials.pooled(i);
                register_if_needed(client, &account).await?;
                tokens.push(login(client, &account).await?);
            }
            tokens
        }
    };

    let fixture = Fixture::new(token, hotspot, targets).with_pool_tokens(pool_tokens);
    info!(
        "Fixture ready: hotspot={}, targets={:?}, pooled sessions={}",
        fixture.hotspot_post_id(),
        fixture.target_post_ids(),
        fixture.pool_tokens().len()
    );
    Ok(fixture)
}
