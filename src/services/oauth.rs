// OAuth id_token verification against the provider's tokeninfo endpoint.
// The backend never handles the OAuth dance itself; the frontend obtains an
// id_token and we confirm it with the provider before minting a session.

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::app_config::{config, OAuthConfig};

#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("Token verification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider rejected the token")]
    TokenRejected,

    #[error("Token was issued for a different client")]
    AudienceMismatch,

    #[error("Token is missing a verified email")]
    MissingEmail,
}

/// Identity extracted from a verified id_token
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub provider: String,
    pub subject: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    aud: String,
    sub: String,
    email: Option<String>,
    email_verified: Option<String>,
    name: Option<String>,
}

pub struct OAuthVerifier {
    client: reqwest::Client,
    config: OAuthConfig,
}

impl OAuthVerifier {
    pub fn new(config: OAuthConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self { client, config }
    }

    pub fn from_config() -> Self {
        Self::new(config().oauth.clone())
    }

    /// Verify an id_token with the provider and extract the identity.
    pub async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedIdentity, OAuthError> {
        let response = self
            .client
            .get(&self.config.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "tokeninfo endpoint rejected id_token");
            return Err(OAuthError::TokenRejected);
        }

        let info: TokenInfoResponse = response.json().await?;

        if info.aud != self.config.client_id {
            warn!("id_token audience does not match configured client id");
            return Err(OAuthError::AudienceMismatch);
        }

        let email = match (info.email, info.email_verified.as_deref()) {
            (Some(email), Some("true")) => email,
            _ => return Err(OAuthError::MissingEmail),
        };

        let name = info.name.unwrap_or_else(|| email.clone());

        Ok(VerifiedIdentity {
            provider: self.config.provider.clone(),
            subject: info.sub,
            email,
            name,
        })
    }
}
