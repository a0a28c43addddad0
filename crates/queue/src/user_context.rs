//! User identity resolution.

use async_trait::async_trait;
use pulse_common::IdGenerator;
use tracing::debug;

use crate::error::IdentityError;

/// Resolves the identifier of the current user.
///
/// Resolved at most once per tracker; the outcome is final.
#[async_trait]
pub trait UserContext: Send + Sync {
    /// Resolve the user identifier.
    async fn resolve(&self) -> Result<String, IdentityError>;
}

/// A user context that already knows the identity.
#[derive(Clone, Debug)]
pub struct FixedUserContext {
    user_id: String,
}

impl FixedUserContext {
    /// Context resolving to `user_id`.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl UserContext for FixedUserContext {
    async fn resolve(&self) -> Result<String, IdentityError> {
        Ok(self.user_id.clone())
    }
}

/// Assigns a fresh anonymous identity to a visitor with no known id.
#[derive(Clone, Debug, Default)]
pub struct GeneratedUserContext {
    id_gen: IdGenerator,
}

impl GeneratedUserContext {
    /// Create a generating context.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            id_gen: IdGenerator::new(),
        }
    }
}

#[async_trait]
impl UserContext for GeneratedUserContext {
    async fn resolve(&self) -> Result<String, IdentityError> {
        let user_id = self.id_gen.generate_anonymous_id();
        debug!(user_id = %user_id, "Generated anonymous user id");
        Ok(user_id)
    }
}
