// Public contact form: rate limited per IP, persisted first, then a
// best-effort notification to the support inbox.

use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use utoipa::ToSchema;
use validator::Validate;

use crate::{app::AppState, models::contact::NewContactMessage, utils::ServiceError};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 255, message = "Subject must be 1-255 characters"))]
    pub subject: String,

    #[validate(length(min = 1, max = 10000, message = "Message must be 1-10000 characters"))]
    pub body: String,
}

/// POST /contact
#[utoipa::path(
    post,
    path = "/api/v1/contact",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Message received"),
        (status = 400, description = "Validation failure"),
        (status = 429, description = "Too many submissions"),
    ),
    tag = "contact"
)]
pub async fn submit_contact(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<ContactRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    req.validate()?;

    let ip = addr.ip().to_string();

    if crate::app_config::config().enable_rate_limiting {
        let result = state.rate_limit_service.check_contact(&ip);
        if !result.allowed {
            return Err(ServiceError::RateLimited {
                retry_after_seconds: result.retry_after,
            });
        }
    }

    let message = NewContactMessage {
        name: req.name.trim().to_string(),
        email: req.email.trim().to_lowercase(),
        subject: req.subject.trim().to_string(),
        body: req.body,
    };

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    {
        use crate::schema::contact_messages::dsl;
        diesel::insert_into(dsl::contact_messages)
            .values(&message)
            .execute(&mut conn)
            .await?;
    }

    // The row is saved; notification failure is the support team's
    // problem, not the visitor's
    state
        .email_service
        .send_contact_notification(&message.name, &message.email, &message.subject, &message.body)
        .await;

    tracing::info!(ip = %ip, "contact message received");

    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}
