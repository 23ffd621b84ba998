//! Form-encoded client for the forum API.
//!
//! Every call is a `#[transaction]`, so its latency and outcome are recorded under whichever
//! scenario (or the setup/teardown phase) issued it.
use crate::credentials::Credentials;
use crate::form::FormBody;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use surge::transaction;
use surge::transaction::Outcome;
use thiserror::Error;
use url::Url;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid base URL '{url}': {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status, parsed JSON body and latency of one API call.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    status: u16,
    body: Option<Value>,
    elapsed: Duration,
}

impl ApiResponse {
    pub fn new(status: u16, body: Option<Value>, elapsed: Duration) -> Self {
        Self {
            status,
            body,
            elapsed,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.as_ref()?.get(name)
    }

    /// The non-empty `session_id` returned by a login.
    pub fn session_id(&self) -> Option<&str> {
        self.field("session_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// The non-zero `post_id` returned by a post creation.
    pub fn post_id(&self) -> Option<PostId> {
        let id = match self.field("post_id")? {
            Value::Number(n) => n.as_u64()?,
            Value::String(s) => s.parse().ok()?,
            _ => return None,
        };
        (id != 0).then_some(PostId(id))
    }
}

impl Outcome for ApiResponse {
    fn is_failure(&self) -> bool {
        !(200..400).contains(&self.status)
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
        Url::parse(base_url).map_err(|source| ApiError::BaseUrl {
            url: base_url.to_string(),
            source,
        })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[transaction]
    pub async fn register(&self, credentials: &Credentials) -> Result<ApiResponse, ApiError> {
        self.send(self.post_form("/register", credentials.registration_form()))
            .await
    }

    #[transaction]
    pub async fn login(&self, credentials: &Credentials) -> Result<ApiResponse, ApiError> {
        self.send(self.post_form("/login", credentials.login_form()))
            .await
    }

    #[transaction]
    pub async fn create_post(
        &self,
        token: &str,
        title: &str,
        content: &str,
        community_id: u64,
    ) -> Result<ApiResponse, ApiError> {
        let form = FormBody::new()
            .field("title", title)
            .field("content", content)
            .field("community_id", community_id);

        self.send(self.post_form("/posts", form).header(AUTHORIZATION, bearer(token)))
            .await
    }

    #[transaction]
    pub async fn get_post(&self, post: PostId) -> Result<ApiResponse, ApiError> {
        self.send(self.http.get(self.url(&format!("/posts/{post}"))))
            .await
    }

    #[transaction]
    pub async fn like_post(&self, token: &str, post: PostId) -> Result<ApiResponse, ApiError> {
        let request = self
            .http
            .post(self.url(&format!("/posts/{post}/like")))
            .header(AUTHORIZATION, bearer(token));

        self.send(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn post_form(&self, path: &str, form: FormBody) -> RequestBuilder {
        self.http
            .post(self.url(path))
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(form.encode())
    }

    async fn send(&self, request: RequestBuilder) -> Result<ApiResponse, ApiError> {
        let start = Instant::now();
        let res = request.send().await?;
        let status = res.status().as_u16();
        let bytes = res.bytes().await?;
        let elapsed = start.elapsed();

        // NOTE: Not every endpoint answers with JSON; a body which doesn't parse is simply absent.
        let body = serde_json::from_slice(&bytes).ok();

        Ok(ApiResponse::new(status, body, elapsed))
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: Value) -> ApiResponse {
        ApiResponse::new(status, Some(body), Duration::from_millis(3))
    }

    #[test]
    fn extracts_session_id() {
        assert_eq!(
            response(200, json!({"session_id": "abc"})).session_id(),
            Some("abc")
        );
        assert_eq!(response(200, json!({"session_id": ""})).session_id(), None);
        assert_eq!(response(200, json!({"message": "ok"})).session_id(), None);
    }

    #[test]
    fn extracts_post_id() {
        assert_eq!(
            response(200, json!({"post_id": 42})).post_id(),
            Some(PostId(42))
        );
        assert_eq!(
            response(200, json!({"post_id": "7"})).post_id(),
            Some(PostId(7))
        );
        assert_eq!(response(200, json!({"post_id": 0})).post_id(), None);
        assert_eq!(ApiResponse::new(200, None, Duration::ZERO).post_id(), None);
    }

    #[test]
    fn client_errors_count_as_failures() {
        assert!(!response(200, json!({})).is_failure());
        assert!(response(409, json!({})).is_failure());
        assert!(response(401, json!({})).is_failure());
        assert!(response(500, json!({})).is_failure());
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ApiError::BaseUrl { .. })
        ));

        let client = ApiClient::new("http://app:8080/api/v1/").unwrap();
        assert_eq!(client.url("/posts/1"), "http://app:8080/api/v1/posts/1");
    }
}
