//! In-memory stand-in for the forum API, mounted under `/api/v1`.
//!
//! Only the observable contract is reproduced: form-encoded requests, session tokens handed out
//! by `/login` and checked as `Authorization: Bearer <session>`, numeric post ids, and likes that
//! toggle per user. Every request is logged so tests can assert on what a workflow sent.
use axum::{
    debug_handler,
    extract::{Path, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub async fn run(addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    debug!("Mock forum API listening on {addr}");
    axum::serve(listener, router(Arc::new(MockState::default()))).await
}

pub fn router(state: Arc<MockState>) -> Router {
    let api = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/posts", post(create_post))
        .route("/posts/:post_id", get(get_post))
        .route("/posts/:post_id/like", post(like_post));

    Router::new()
        .nest("/api/v1", api)
        .layer(middleware::from_fn_with_state(state.clone(), log_request))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A mock server bound to an ephemeral local port, shut down on drop.
pub struct MockServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(MockState::default());

        let app = router(state.clone());
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!("Mock server failed: {err}");
            }
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    pub fn state(&self) -> &MockState {
        &self.state
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestRecord {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: u64,
    pub author_id: u64,
    pub community_id: u64,
    pub title: String,
    pub content: String,
    pub author_name: String,
}

struct User {
    id: u64,
    password: String,
}

#[derive(Default)]
struct Db {
    users: HashMap<String, User>,
    emails: HashSet<String>,
    sessions: HashMap<String, (u64, String)>,
    posts: BTreeMap<u64, Post>,
    likes: HashMap<u64, HashSet<u64>>,
}

#[derive(Default)]
pub struct MockState {
    db: Mutex<Db>,
    requests: Mutex<Vec<RequestRecord>>,
    next_id: AtomicU64,
    reject_logins: AtomicBool,
    read_delay_ms: AtomicU64,
}

impl MockState {
    fn db(&self) -> MutexGuard<'_, Db> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RequestRecord> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn user_count(&self) -> usize {
        self.db().users.len()
    }

    pub fn post(&self, id: u64) -> Option<Post> {
        self.db().posts.get(&id).cloned()
    }

    pub fn posts(&self) -> Vec<Post> {
        self.db().posts.values().cloned().collect()
    }

    pub fn likes(&self, post: u64) -> usize {
        self.db().likes.get(&post).map_or(0, HashSet::len)
    }

    /// Make `/login` answer 401 for every account.
    pub fn set_reject_logins(&self, reject: bool) {
        self.reject_logins.store(reject, Ordering::Relaxed);
    }

    /// Delay every post detail read.
    pub fn set_read_delay(&self, delay: Duration) {
        self.read_delay_ms
            .store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    fn session(&self, headers: &HeaderMap) -> Option<(u64, String)> {
        let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let token = header.strip_prefix("Bearer ")?;
        self.db().sessions.get(token).cloned()
    }
}

async fn log_request(State(state): State<Arc<MockState>>, req: Request, next: Next) -> Response {
    let record = RequestRecord {
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        authorization: req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    state
        .requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(record);

    next.run(req).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

type FormData = Form<HashMap<String, String>>;

fn field<'a>(form: &'a HashMap<String, String>, name: &str) -> &'a str {
    form.get(name).map(String::as_str).unwrap_or_default()
}

#[debug_handler]
async fn register(State(state): State<Arc<MockState>>, Form(form): FormData) -> Response {
    let username = field(&form, "username");
    let password = field(&form, "password");
    let email = field(&form, "email");

    if username.is_empty() || password.is_empty() || email.is_empty() {
        return error(StatusCode::BAD_REQUEST, "username, password and email are required");
    }
    if password != field(&form, "confirm_password") {
        return error(StatusCode::BAD_REQUEST, "passwords do not match");
    }

    let id = state.next_id();
    let mut db = state.db();
    if db.users.contains_key(username) {
        return error(StatusCode::CONFLICT, "username already exists");
    }
    if !db.emails.insert(email.to_string()) {
        return error(StatusCode::CONFLICT, "email already registered");
    }
    db.users.insert(
        username.to_string(),
        User {
            id,
            password: password.to_string(),
        },
    );

    Json(json!({ "message": "registered" })).into_response()
}

#[debug_handler]
async fn login(State(state): State<Arc<MockState>>, Form(form): FormData) -> Response {
    let username = field(&form, "username");
    let password = field(&form, "password");

    if state.reject_logins.load(Ordering::Relaxed) {
        return error(StatusCode::UNAUTHORIZED, "logins are disabled");
    }

    let mut db = state.db();
    let user_id = match db.users.get(username) {
        Some(user) if user.password == password => user.id,
        _ => return error(StatusCode::UNAUTHORIZED, "unknown user or wrong password"),
    };

    let session_id = uuid::Uuid::new_v4().to_string();
    db.sessions
        .insert(session_id.clone(), (user_id, username.to_string()));

    Json(json!({ "message": "logged in", "session_id": session_id })).into_response()
}

#[debug_handler]
async fn create_post(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Form(form): FormData,
) -> Response {
    let Some((author_id, author_name)) = state.session(&headers) else {
        return error(StatusCode::UNAUTHORIZED, "missing or invalid session");
    };

    let title = field(&form, "title");
    let content = field(&form, "content");
    let Ok(community_id) = field(&form, "community_id").parse::<u64>() else {
        return error(StatusCode::BAD_REQUEST, "invalid community_id");
    };
    if title.is_empty() || content.is_empty() {
        return error(StatusCode::BAD_REQUEST, "title and content are required");
    }

    let id = state.next_id();
    state.db().posts.insert(
        id,
        Post {
            id,
            author_id,
            community_id,
            title: title.to_string(),
            content: content.to_string(),
            author_name,
        },
    );

    Json(json!({ "message": "created", "post_id": id })).into_response()
}

#[debug_handler]
async fn get_post(State(state): State<Arc<MockState>>, Path(post_id): Path<String>) -> Response {
    let Ok(post_id) = post_id.parse::<u64>() else {
        return error(StatusCode::BAD_REQUEST, "invalid post id");
    };

    let delay = state.read_delay_ms.load(Ordering::Relaxed);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    match state.post(post_id) {
        Some(post) => Json(post).into_response(),
        None => error(StatusCode::NOT_FOUND, "post not found"),
    }
}

#[debug_handler]
async fn like_post(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(post_id): Path<String>,
) -> Response {
    let Some((user_id, _)) = state.session(&headers) else {
        return error(StatusCode::UNAUTHORIZED, "missing or invalid session");
    };
    let Ok(post_id) = post_id.parse::<u64>() else {
        return error(StatusCode::BAD_REQUEST, "invalid post id");
    };

    let mut db = state.db();
    let likes = db.likes.entry(post_id).or_default();
    let liked = if likes.remove(&user_id) {
        false
    } else {
        likes.insert(user_id);
        true
    };

    let message = if liked { "liked" } else { "unliked" };
    Json(json!({
        "message": message,
        "likes": likes.len(),
        "liked": liked,
    }))
    .into_response()
}
