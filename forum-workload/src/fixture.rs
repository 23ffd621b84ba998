use crate::client::PostId;
use serde::{Deserialize, Serialize};

/// How write iterations authenticate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AuthPolicy {
    /// Every worker shares the single provisioned session.
    #[default]
    Shared,
    /// `size` extra accounts are provisioned; workers pick one by identity.
    AccountPool { size: usize },
}

/// Everything produced by provisioning, shared read-only by every worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fixture {
    auth_token: String,
    hotspot_post_id: PostId,
    target_post_ids: Vec<PostId>,
    pool_tokens: Vec<String>,
}

impl Fixture {
    pub fn new(auth_token: String, hotspot_post_id: PostId, target_post_ids: Vec<PostId>) -> Self {
        Self {
            auth_token,
            hotspot_post_id,
            target_post_ids,
            pool_tokens: vec![],
        }
    }

    pub fn with_pool_tokens(mut self, pool_tokens: Vec<String>) -> Self {
        self.pool_tokens = pool_tokens;
        self
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    pub fn hotspot_post_id(&self) -> PostId {
        self.hotspot_post_id
    }

    /// In creation order.
    pub fn target_post_ids(&self) -> &[PostId] {
        &self.target_post_ids
    }

    pub fn pool_tokens(&self) -> &[String] {
        &self.pool_tokens
    }

    /// The session a worker authenticates with: the shared token, or one of the pooled tokens
    /// picked round-robin by worker identity.
    pub fn token_for(&self, identity: u64) -> &str {
        if self.pool_tokens.is_empty() {
            &self.auth_token
        } else {
            &self.pool_tokens[(identity % self.pool_tokens.len() as u64) as usize]
        }
    }

    pub fn target_for(&self, identity: u64) -> Option<PostId> {
        select_target(&self.target_post_ids, identity)
    }
}

/// Round-robin choice of a like target by worker identity.
pub fn select_target(targets: &[PostId], identity: u64) -> Option<PostId> {
    if targets.is_empty() {
        return None;
    }
    Some(targets[(identity % targets.len() as u64) as usize])
}
