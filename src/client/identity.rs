use std::future::Future;

use serde::Serialize;

use crate::error::{Result, SkypathError};
use crate::graph::ActorId;

/// A resolved actor: canonical identifier plus how to show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: ActorId,
    pub handle: String,
    pub display_name: Option<String>,
}

/// Turns a user-typed handle or DID into an `Identity`.
pub trait IdentityResolver {
    /// # Errors
    ///
    /// `SkypathError::IdentityNotFound` when nothing matches `input`.
    fn resolve(&self, input: &str) -> impl Future<Output = Result<Identity>> + Send;
}

/// Trim whitespace and a leading `@` from a typed handle.
pub fn normalize_actor_input(input: &str) -> Result<&str> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix('@').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(SkypathError::InvalidInput(
            "actor handle or DID cannot be empty".to_string(),
        ));
    }
    Ok(trimmed)
}
