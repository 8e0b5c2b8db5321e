// Dual-mode JWT issuance and validation with HS256.
// Session tokens are minted after OAuth sign-in, bearer tokens after
// email/password login. Each mode signs with its own secret, so a token
// minted in one mode never validates in the other by accident.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("JWT encoding error: {0}")]
    EncodingError(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Clock error: {0}")]
    ClockError(String),
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            ErrorKind::InvalidToken | ErrorKind::InvalidSignature => JwtError::InvalidToken,
            _ => JwtError::EncodingError(err.to_string()),
        }
    }
}

/// Which signing key a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TokenMode {
    /// Minted after OAuth sign-in
    Session,
    /// Minted after email/password login
    Bearer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub jti: String,
    pub email: String,
    pub plan: String,
    pub aud: String,
    pub iss: String,
    pub iat: u64,
    pub exp: u64,
}

/// Keys and validation settings for both token modes
#[derive(Clone)]
pub struct JwtConfig {
    pub session_expiry: u64,
    pub bearer_expiry: u64,
    pub algorithm: Algorithm,
    pub audience: String,
    pub issuer: String,

    session_encoding_key: EncodingKey,
    session_decoding_key: DecodingKey,
    bearer_encoding_key: EncodingKey,
    bearer_decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("session_expiry", &self.session_expiry)
            .field("bearer_expiry", &self.bearer_expiry)
            .field("algorithm", &self.algorithm)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("session_encoding_key", &"<redacted>")
            .field("session_decoding_key", &"<redacted>")
            .field("bearer_encoding_key", &"<redacted>")
            .field("bearer_decoding_key", &"<redacted>")
            .finish()
    }
}

impl JwtConfig {
    fn build_from_params(
        session_secret: &str,
        bearer_secret: &str,
        session_expiry: u64,
        bearer_expiry: u64,
        audience: String,
        issuer: String,
    ) -> Self {
        JwtConfig {
            session_expiry,
            bearer_expiry,
            algorithm: Algorithm::HS256,
            audience,
            issuer,
            session_encoding_key: EncodingKey::from_secret(session_secret.as_bytes()),
            session_decoding_key: DecodingKey::from_secret(session_secret.as_bytes()),
            bearer_encoding_key: EncodingKey::from_secret(bearer_secret.as_bytes()),
            bearer_decoding_key: DecodingKey::from_secret(bearer_secret.as_bytes()),
        }
    }

    /// Create JWT config from centralized app configuration
    pub fn from_env() -> Self {
        let cfg = crate::app_config::config();
        Self::build_from_params(
            &cfg.jwt_session_secret,
            &cfg.jwt_bearer_secret,
            cfg.jwt_session_expiry,
            cfg.jwt_bearer_expiry,
            cfg.jwt_audience.clone(),
            cfg.jwt_issuer.clone(),
        )
    }

    /// Deterministic config for tests, independent of the lazy static
    #[cfg(test)]
    pub fn for_test() -> Self {
        Self::build_from_params(
            "test-session-secret-hs256-32bytes!!",
            "test-bearer-secret-hs256-32bytes!!!",
            86400,
            3600,
            "test.m404.io".to_string(),
            "test.m404.io".to_string(),
        )
    }

    fn encoding_key(&self, mode: TokenMode) -> &EncodingKey {
        match mode {
            TokenMode::Session => &self.session_encoding_key,
            TokenMode::Bearer => &self.bearer_encoding_key,
        }
    }

    fn decoding_key(&self, mode: TokenMode) -> &DecodingKey {
        match mode {
            TokenMode::Session => &self.session_decoding_key,
            TokenMode::Bearer => &self.bearer_decoding_key,
        }
    }

    fn expiry(&self, mode: TokenMode) -> u64 {
        match mode {
            TokenMode::Session => self.session_expiry,
            TokenMode::Bearer => self.bearer_expiry,
        }
    }
}

pub struct JwtService {
    config: JwtConfig,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(JwtConfig::from_env())
    }

    /// Mint a token in the given mode.
    pub fn generate_token(
        &self,
        mode: TokenMode,
        user_id: &str,
        email: &str,
        plan: &str,
    ) -> Result<String, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| JwtError::ClockError(e.to_string()))?
            .as_secs();

        let claims = TokenClaims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            email: email.to_string(),
            plan: plan.to_string(),
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
            iat: now,
            exp: now + self.config.expiry(mode),
        };

        let header = Header::new(self.config.algorithm);
        encode(&header, &claims, self.config.encoding_key(mode)).map_err(Into::into)
    }

    /// Validate a token against one mode's key.
    pub fn validate_token(&self, mode: TokenMode, token: &str) -> Result<TokenClaims, JwtError> {
        let mut validation = Validation::new(self.config.algorithm);
        validation.set_audience(&[self.config.audience.clone()]);
        validation.set_issuer(&[self.config.issuer.clone()]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;

        let token_data = decode::<TokenClaims>(token, self.config.decoding_key(mode), &validation)?;
        Ok(token_data.claims)
    }

    /// Validate a token of unknown provenance: session first, then bearer.
    /// An expired session token is reported as expired rather than being
    /// retried against the bearer key, so the caller gets the right error.
    pub fn resolve_token(&self, token: &str) -> Result<(TokenClaims, TokenMode), JwtError> {
        match self.validate_token(TokenMode::Session, token) {
            Ok(claims) => Ok((claims, TokenMode::Session)),
            Err(JwtError::TokenExpired) => Err(JwtError::TokenExpired),
            Err(_) => self
                .validate_token(TokenMode::Bearer, token)
                .map(|claims| (claims, TokenMode::Bearer)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(JwtConfig::for_test())
    }

    #[test]
    fn test_session_token_roundtrip() {
        let svc = service();
        let token = svc
            .generate_token(TokenMode::Session, "user-1", "a@example.com", "free")
            .unwrap();

        let claims = svc.validate_token(TokenMode::Session, &token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.plan, "free");
    }

    #[test]
    fn test_modes_use_distinct_keys() {
        let svc = service();
        let session = svc
            .generate_token(TokenMode::Session, "user-1", "a@example.com", "pro")
            .unwrap();
        let bearer = svc
            .generate_token(TokenMode::Bearer, "user-1", "a@example.com", "pro")
            .unwrap();

        assert!(svc.validate_token(TokenMode::Bearer, &session).is_err());
        assert!(svc.validate_token(TokenMode::Session, &bearer).is_err());
    }

    #[test]
    fn test_resolve_identifies_mode() {
        let svc = service();
        let session = svc
            .generate_token(TokenMode::Session, "u", "a@example.com", "free")
            .unwrap();
        let bearer = svc
            .generate_token(TokenMode::Bearer, "u", "a@example.com", "free")
            .unwrap();

        assert_eq!(svc.resolve_token(&session).unwrap().1, TokenMode::Session);
        assert_eq!(svc.resolve_token(&bearer).unwrap().1, TokenMode::Bearer);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let svc = service();
        assert!(matches!(
            svc.resolve_token("not.a.token"),
            Err(JwtError::InvalidToken) | Err(JwtError::EncodingError(_))
        ));
    }
}
