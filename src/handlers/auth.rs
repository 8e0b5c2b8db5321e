// Authentication handlers: password register/login, OAuth sign-in, and
// token introspection. Password logins get a bearer-mode token, OAuth
// sign-ins a session-mode token; the middleware accepts either.

use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use axum_extra::{headers::UserAgent, TypedHeader};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    middleware::AuthenticatedUser,
    models::user::{NewUser, User, UserError},
    services::jwt::TokenMode,
    utils::{hash_password, log_auth_failure, trim_and_validate_field, verify_password, AuthError},
};

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom = "validate_password")]
    pub password: String,

    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub full_name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OAuthLoginRequest {
    #[validate(length(min = 1, message = "id_token is required"))]
    pub id_token: String,
}

/// Wrapper every auth endpoint responds with
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub plan: String,
    pub plan_expires_at: Option<DateTime<Utc>>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            plan: user.effective_plan().as_str().to_string(),
            plan_expires_at: user.plan_expires_at,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user: UserInfo,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenStatus {
    pub valid: bool,
    pub user_id: String,
    pub email: String,
    pub plan: String,
    pub token_mode: TokenMode,
    pub expires_at: u64,
}

/// Password strength check: 8+ characters mixing upper, lower, digit and
/// special.
fn validate_password(password: &str) -> Result<(), validator::ValidationError> {
    if password.len() < 8 {
        return Err(validator::ValidationError::new(
            "Password must be at least 8 characters",
        ));
    }

    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_special = password.chars().any(|c| !c.is_alphanumeric());

    if !has_upper || !has_lower || !has_digit || !has_special {
        return Err(validator::ValidationError::new(
            "Password must contain uppercase, lowercase, digit and special character",
        ));
    }

    Ok(())
}

fn validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// HANDLERS
// =============================================================================

/// POST /auth/register - create a password-backed account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = SessionResponse),
        (status = 400, description = "Validation failure"),
        (status = 409, description = "Email already registered"),
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if let Err(errors) = req.validate() {
        return Err(AuthError::ValidationError(validation_message(&errors)));
    }

    // length(min = 1) lets whitespace-only names through
    let full_name = trim_and_validate_field(&req.full_name, true)
        .map_err(|_| AuthError::ValidationError("Full name cannot be empty".to_string()))?;

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!("password hashing failed: {}", e);
        AuthError::InternalError
    })?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    let new_user = NewUser {
        email: req.email.trim().to_lowercase(),
        password_hash: Some(password_hash),
        full_name,
        plan: "free".to_string(),
        oauth_provider: None,
        oauth_subject: None,
    };

    let user = match User::create(&mut conn, new_user).await {
        Ok(user) => user,
        Err(UserError::Database(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ))) => return Err(AuthError::EmailTaken),
        Err(e) => return Err(AuthError::DatabaseError(e.to_string())),
    };

    // Best effort: signup never fails because the mail provider is down
    state
        .email_service
        .send_welcome_email(&mut conn, &user)
        .await;

    let access_token = state
        .jwt_service
        .generate_token(
            TokenMode::Bearer,
            &user.id.to_string(),
            &user.email,
            &user.plan,
        )
        .map_err(|e| AuthError::TokenError(e.to_string()))?;

    tracing::info!(user_id = %user.id, "new user registered");

    let response = AuthResponse {
        success: true,
        data: Some(SessionResponse {
            user: UserInfo::from(&user),
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: crate::app_config::config().jwt_bearer_expiry,
        }),
        message: "User registered successfully".to_string(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login - password login, issues a bearer-mode token
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = SessionResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many attempts"),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    user_agent: Option<TypedHeader<UserAgent>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if let Err(errors) = req.validate() {
        return Err(AuthError::ValidationError(validation_message(&errors)));
    }

    let email = req.email.trim().to_lowercase();
    let ip = addr.ip().to_string();
    let user_agent = user_agent.map(|TypedHeader(ua)| ua.to_string());

    if crate::app_config::config().enable_rate_limiting {
        let result = state.rate_limit_service.check_login(&ip, &email);
        if !result.allowed {
            let error = AuthError::RateLimited {
                retry_after_seconds: result.retry_after,
            };
            log_auth_failure(&email, &ip, &error, user_agent.as_deref());
            return Err(error);
        }
    }

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    let user = match User::find_by_email(&mut conn, &email).await {
        Ok(user) => user,
        Err(UserError::NotFound) => {
            let error = AuthError::InvalidCredentials;
            log_auth_failure(&email, &ip, &error, user_agent.as_deref());
            return Err(error);
        },
        Err(e) => return Err(AuthError::DatabaseError(e.to_string())),
    };

    if !user.is_active {
        let error = AuthError::AccountInactive;
        log_auth_failure(&email, &ip, &error, user_agent.as_deref());
        return Err(error);
    }

    // OAuth-only accounts carry no password hash
    let stored_hash = match user.password_hash.as_deref() {
        Some(hash) => hash,
        None => {
            let error = AuthError::OAuthAccount;
            log_auth_failure(&email, &ip, &error, user_agent.as_deref());
            return Err(error);
        },
    };

    match verify_password(&req.password, stored_hash) {
        Ok(true) => {},
        Ok(false) => {
            let error = AuthError::InvalidCredentials;
            log_auth_failure(&email, &ip, &error, user_agent.as_deref());
            return Err(error);
        },
        Err(e) => {
            tracing::error!("password verification failed: {}", e);
            return Err(AuthError::InternalError);
        },
    }

    let access_token = state
        .jwt_service
        .generate_token(
            TokenMode::Bearer,
            &user.id.to_string(),
            &user.email,
            &user.plan,
        )
        .map_err(|e| AuthError::TokenError(e.to_string()))?;

    tracing::info!(user_id = %user.id, "user logged in");

    let response = AuthResponse {
        success: true,
        data: Some(SessionResponse {
            user: UserInfo::from(&user),
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: crate::app_config::config().jwt_bearer_expiry,
        }),
        message: "Login successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// POST /auth/oauth - sign in with a provider id_token, issues a
/// session-mode token. First sign-in creates the account; an existing
/// password account with the same email is linked to the OAuth identity.
#[utoipa::path(
    post,
    path = "/api/v1/auth/oauth",
    request_body = OAuthLoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 401, description = "Provider rejected the token"),
    ),
    tag = "auth"
)]
pub async fn oauth_login(
    State(state): State<AppState>,
    Json(req): Json<OAuthLoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if let Err(errors) = req.validate() {
        return Err(AuthError::ValidationError(validation_message(&errors)));
    }

    let identity = state
        .oauth_verifier
        .verify_id_token(&req.id_token)
        .await
        .map_err(|e| AuthError::OAuthVerification(e.to_string()))?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    let user = match User::find_by_oauth(&mut conn, &identity.provider, &identity.subject).await {
        Ok(user) => user,
        Err(UserError::NotFound) => {
            // Link to an existing password account or create a fresh one
            match User::find_by_email(&mut conn, &identity.email).await {
                Ok(existing) => {
                    use crate::schema::users::dsl::*;
                    use diesel::prelude::*;
                    use diesel_async::RunQueryDsl;

                    diesel::update(users.filter(id.eq(existing.id)))
                        .set((
                            oauth_provider.eq(Some(identity.provider.clone())),
                            oauth_subject.eq(Some(identity.subject.clone())),
                            updated_at.eq(Utc::now()),
                        ))
                        .get_result::<User>(&mut conn)
                        .await
                        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
                },
                Err(UserError::NotFound) => {
                    let created = User::create(
                        &mut conn,
                        NewUser {
                            email: identity.email.to_lowercase(),
                            password_hash: None,
                            full_name: identity.name.clone(),
                            plan: "free".to_string(),
                            oauth_provider: Some(identity.provider.clone()),
                            oauth_subject: Some(identity.subject.clone()),
                        },
                    )
                    .await
                    .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

                    state
                        .email_service
                        .send_welcome_email(&mut conn, &created)
                        .await;

                    created
                },
                Err(e) => return Err(AuthError::DatabaseError(e.to_string())),
            }
        },
        Err(e) => return Err(AuthError::DatabaseError(e.to_string())),
    };

    if !user.is_active {
        return Err(AuthError::AccountInactive);
    }

    let access_token = state
        .jwt_service
        .generate_token(
            TokenMode::Session,
            &user.id.to_string(),
            &user.email,
            &user.plan,
        )
        .map_err(|e| AuthError::TokenError(e.to_string()))?;

    tracing::info!(user_id = %user.id, provider = %identity.provider, "oauth sign-in");

    let response = AuthResponse {
        success: true,
        data: Some(SessionResponse {
            user: UserInfo::from(&user),
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: crate::app_config::config().jwt_session_expiry,
        }),
        message: "Login successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// GET /auth/me - current account with the live (not token-cached) plan
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<impl IntoResponse, AuthError> {
    let user_id = auth_user.uuid().ok_or(AuthError::InvalidToken)?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    let user = match User::find_by_id(&mut conn, user_id).await {
        Ok(user) => user,
        Err(UserError::NotFound) => return Err(AuthError::InvalidToken),
        Err(e) => return Err(AuthError::DatabaseError(e.to_string())),
    };

    let response = AuthResponse {
        success: true,
        data: Some(UserInfo::from(&user)),
        message: "OK".to_string(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// POST /auth/validate - introspect the presented token
#[utoipa::path(
    post,
    path = "/api/v1/auth/validate",
    responses(
        (status = 200, description = "Token is valid", body = TokenStatus),
        (status = 401, description = "Token is invalid or expired"),
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn validate_token(auth_user: AuthenticatedUser) -> impl IntoResponse {
    let response = AuthResponse {
        success: true,
        data: Some(TokenStatus {
            valid: true,
            user_id: auth_user.user_id,
            email: auth_user.email,
            plan: auth_user.plan,
            token_mode: auth_user.token_mode,
            expires_at: auth_user.exp,
        }),
        message: "Token is valid".to_string(),
    };

    (StatusCode::OK, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_strength_rules() {
        assert!(validate_password("Str0ng!pass").is_ok());
        assert!(validate_password("short1!A").is_ok());

        assert!(validate_password("weak").is_err());
        assert!(validate_password("alllowercase1!").is_err());
        assert!(validate_password("ALLUPPERCASE1!").is_err());
        assert!(validate_password("NoDigits!!").is_err());
        assert!(validate_password("NoSpecial123").is_err());
    }

    #[test]
    fn test_validation_message_collects_field_errors() {
        let req = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "Str0ng!pass".to_string(),
            full_name: "Someone".to_string(),
        };

        let errors = req.validate().unwrap_err();
        let message = validation_message(&errors);
        assert!(message.contains("Invalid email format"));
    }
}
