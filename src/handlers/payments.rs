// Checkout endpoints for the pro upgrade. The gateway protocol is fixed:
// we create an order server-side, the client completes checkout against
// the gateway, then posts back the (order, payment, signature) triple for
// verification.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    middleware::AuthenticatedUser,
    models::{payment::Payment, user::User},
    utils::ServiceError,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1, message = "order_id is required"))]
    pub order_id: String,

    #[validate(length(min = 1, message = "payment_id is required"))]
    pub payment_id: String,

    #[validate(length(min = 1, message = "signature is required"))]
    pub signature: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub plan: String,
    pub plan_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentHistoryEntry {
    pub id: Uuid,
    pub order_id: String,
    pub amount_cents: i32,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Payment> for PaymentHistoryEntry {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            order_id: payment.provider_order_id,
            amount_cents: payment.amount_cents,
            currency: payment.currency,
            status: payment.status,
            created_at: payment.created_at,
            completed_at: payment.completed_at,
        }
    }
}

async fn load_caller(
    state: &AppState,
    auth_user: &AuthenticatedUser,
) -> Result<User, ServiceError> {
    let user_id = auth_user.uuid().ok_or(ServiceError::Unauthorized)?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    Ok(User::find_by_id(&mut conn, user_id).await?)
}

// =============================================================================
// HANDLERS
// =============================================================================

/// POST /payments/order - create a gateway order for the pro plan
#[utoipa::path(
    post,
    path = "/api/v1/payments/order",
    responses(
        (status = 201, description = "Order created", body = CheckoutOrder),
        (status = 502, description = "Gateway unavailable"),
    ),
    security(("bearer_auth" = [])),
    tag = "payments"
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let user = load_caller(&state, &auth_user).await?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    let order = state.payment_service.create_order(&mut conn, &user).await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// POST /payments/verify - verify the checkout signature and apply the
/// upgrade. Mismatched signatures are 400; replaying a completed order is
/// 409.
#[utoipa::path(
    post,
    path = "/api/v1/payments/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified, plan upgraded", body = VerifyPaymentResponse),
        (status = 400, description = "Signature mismatch"),
        (status = 404, description = "Unknown order"),
        (status = 409, description = "Order already completed"),
    ),
    security(("bearer_auth" = [])),
    tag = "payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    req.validate()?;

    let user = load_caller(&state, &auth_user).await?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    state
        .payment_service
        .verify_and_upgrade(&mut conn, &user, &req.order_id, &req.payment_id, &req.signature)
        .await?;

    // Re-read for the post-upgrade expiry
    let upgraded = User::find_by_id(&mut conn, user.id).await?;

    Ok(Json(VerifyPaymentResponse {
        success: true,
        plan: upgraded.plan,
        plan_expires_at: upgraded.plan_expires_at,
    }))
}

/// GET /payments/history - the caller's orders, newest first
#[utoipa::path(
    get,
    path = "/api/v1/payments/history",
    responses((status = 200, description = "Payment history", body = [PaymentHistoryEntry])),
    security(("bearer_auth" = [])),
    tag = "payments"
)]
pub async fn payment_history(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let user_id = auth_user.uuid().ok_or(ServiceError::Unauthorized)?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    let payments = Payment::find_by_user_id(&mut conn, user_id).await?;
    let history: Vec<PaymentHistoryEntry> =
        payments.into_iter().map(PaymentHistoryEntry::from).collect();

    Ok(Json(history))
}
