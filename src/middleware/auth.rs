// Authenticated user as injected into request extensions

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::jwt::TokenMode;

/// Authenticated user information extracted from a validated JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub token_id: String,
    pub email: String,
    pub plan: String,
    /// Which key validated the token (session = OAuth, bearer = password)
    pub token_mode: TokenMode,
    pub exp: u64,
}

impl AuthenticatedUser {
    /// The user id as a Uuid. The claim was written from a Uuid, so a parse
    /// failure means a forged or corrupted token.
    pub fn uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.user_id).ok()
    }
}
