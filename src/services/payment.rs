// Payment gateway integration: order creation, signature verification and
// the plan upgrade that follows a verified payment.
//
// The gateway protocol is checkout-style: the backend creates an order
// server-side, the browser completes the payment, and the frontend posts
// back (order_id, payment_id, signature) where signature is
// HMAC-SHA256(key_secret, "{order_id}|{payment_id}") hex-encoded.

use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use ring::hmac;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app_config::{config, PaymentConfig};
use crate::models::payment::{NewPayment, Payment, PaymentStatus};
use crate::models::user::{User, UserError, UserUpdate};

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Order not found")]
    OrderNotFound,

    #[error("Order does not belong to this user")]
    WrongOwner,

    #[error("Order already completed")]
    AlreadyCompleted,

    #[error("Signature verification failed")]
    SignatureMismatch,

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("User error: {0}")]
    User(#[from] UserError),
}

/// Order as returned by the gateway's create-order endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

/// What the frontend needs to open the checkout widget
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutOrder {
    pub order_id: String,
    pub amount_cents: i32,
    pub currency: String,
    pub key_id: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderBody {
    amount: i64,
    currency: String,
    receipt: String,
}

pub struct PaymentService {
    client: reqwest::Client,
    config: PaymentConfig,
}

impl PaymentService {
    pub fn new(config: PaymentConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self { client, config }
    }

    pub fn from_config() -> Self {
        Self::new(config().payment.clone())
    }

    /// Create an order at the gateway and record it locally with status
    /// "created". The gateway amount is in minor units, same as our cents.
    pub async fn create_order(
        &self,
        conn: &mut AsyncPgConnection,
        user: &User,
    ) -> Result<CheckoutOrder, PaymentError> {
        let receipt = format!("pro-{}", Uuid::new_v4());
        let body = CreateOrderBody {
            amount: i64::from(self.config.pro_price_cents),
            currency: self.config.currency.clone(),
            receipt,
        };

        let response = self
            .client
            .post(format!("{}/orders", self.config.api_url))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, "gateway rejected order creation");
            return Err(PaymentError::Gateway(format!(
                "order creation failed with status {}: {}",
                status, text
            )));
        }

        let order: GatewayOrder = response.json().await?;

        {
            use crate::schema::payments::dsl::*;
            diesel::insert_into(payments)
                .values(&NewPayment {
                    user_id: user.id,
                    provider: "razorpay".to_string(),
                    provider_order_id: order.id.clone(),
                    amount_cents: self.config.pro_price_cents,
                    currency: self.config.currency.clone(),
                    status: PaymentStatus::Created.as_str().to_string(),
                })
                .execute(conn)
                .await?;
        }

        info!(user_id = %user.id, order_id = %order.id, "payment order created");

        Ok(CheckoutOrder {
            order_id: order.id,
            amount_cents: self.config.pro_price_cents,
            currency: self.config.currency.clone(),
            key_id: self.config.key_id.clone(),
        })
    }

    /// Check the checkout callback signature in constant time.
    pub fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_signature_with_secret(&self.config.key_secret, order_id, payment_id, signature)
    }

    /// Verify a completed checkout and upgrade the payer to pro.
    ///
    /// The whole step runs in one transaction: mark the payment completed
    /// and extend the plan, or neither. Replaying an already-completed
    /// order is rejected before any write happens.
    pub async fn verify_and_upgrade(
        &self,
        conn: &mut AsyncPgConnection,
        payer: &User,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<Payment, PaymentError> {
        let payment = Payment::find_by_order_id(conn, order_id)
            .await?
            .ok_or(PaymentError::OrderNotFound)?;

        if payment.user_id != payer.id {
            return Err(PaymentError::WrongOwner);
        }

        if payment.status == PaymentStatus::Completed.as_str() {
            return Err(PaymentError::AlreadyCompleted);
        }

        if !self.verify_signature(order_id, payment_id, signature) {
            use crate::schema::payments::dsl;
            diesel::update(dsl::payments.filter(dsl::id.eq(payment.id)))
                .set((
                    dsl::status.eq(PaymentStatus::Failed.as_str()),
                    dsl::failure_reason.eq("signature mismatch"),
                    dsl::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn)
                .await?;

            warn!(user_id = %payer.id, order_id = %order_id, "payment signature mismatch");
            return Err(PaymentError::SignatureMismatch);
        }

        let new_expiry = extend_expiry(
            payer.plan_expires_at,
            Utc::now(),
            self.config.pro_duration_days,
        );

        let payment_id_owned = payment_id.to_string();
        let payment_row_id = payment.id;
        let payer_id = payer.id;

        let updated = conn
            .transaction::<_, PaymentError, _>(|tx| {
                async move {
                    let updated: Payment = {
                        use crate::schema::payments::dsl;
                        diesel::update(dsl::payments.filter(dsl::id.eq(payment_row_id)))
                            .set((
                                dsl::status.eq(PaymentStatus::Completed.as_str()),
                                dsl::provider_payment_id.eq(payment_id_owned),
                                dsl::signature_verified.eq(true),
                                dsl::completed_at.eq(diesel::dsl::now),
                                dsl::updated_at.eq(diesel::dsl::now),
                            ))
                            .get_result(tx)
                            .await?
                    };

                    User::update(
                        tx,
                        payer_id,
                        UserUpdate {
                            plan: Some("pro".to_string()),
                            plan_expires_at: Some(Some(new_expiry)),
                            updated_at: Some(Utc::now()),
                            ..Default::default()
                        },
                    )
                    .await?;

                    Ok(updated)
                }
                .scope_boxed()
            })
            .await?;

        info!(
            user_id = %payer.id,
            order_id = %order_id,
            plan_expires_at = %new_expiry,
            "payment verified, user upgraded to pro"
        );

        Ok(updated)
    }
}

/// HMAC-SHA256 over "{order_id}|{payment_id}", compared against the
/// hex-encoded signature without early exit.
pub fn verify_signature_with_secret(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let payload = format!("{}|{}", order_id, payment_id);
    let tag = hmac::sign(&key, payload.as_bytes());

    let expected_hex = hex_encode(tag.as_ref());
    let provided = signature.trim().to_ascii_lowercase();

    if expected_hex.len() != provided.len() {
        return false;
    }

    expected_hex.as_bytes().ct_eq(provided.as_bytes()).into()
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        // write! to a String cannot fail
        let _ = write!(out, "{:02x}", b);
    }
    out
}

/// Build the expected signature for a pair of IDs. Used by tests and the
/// local checkout simulator.
pub fn sign_order(secret: &str, order_id: &str, payment_id: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let payload = format!("{}|{}", order_id, payment_id);
    hex_encode(hmac::sign(&key, payload.as_bytes()).as_ref())
}

/// Apply the plan-expiry extension rule without touching the database.
/// Renewals stack onto a still-valid expiry; lapsed plans restart from now.
pub fn extend_expiry(
    current: Option<chrono::DateTime<Utc>>,
    now: chrono::DateTime<Utc>,
    duration_days: i64,
) -> chrono::DateTime<Utc> {
    let base = match current {
        Some(existing) if existing > now => existing,
        _ => now,
    };
    base + Duration::days(duration_days)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-gateway-secret";

    #[test]
    fn test_valid_signature_accepted() {
        let sig = sign_order(SECRET, "order_123", "pay_456");
        assert!(verify_signature_with_secret(SECRET, "order_123", "pay_456", &sig));
    }

    #[test]
    fn test_signature_case_insensitive_hex() {
        let sig = sign_order(SECRET, "order_123", "pay_456").to_uppercase();
        assert!(verify_signature_with_secret(SECRET, "order_123", "pay_456", &sig));
    }

    #[test]
    fn test_tampered_ids_rejected() {
        let sig = sign_order(SECRET, "order_123", "pay_456");
        assert!(!verify_signature_with_secret(SECRET, "order_999", "pay_456", &sig));
        assert!(!verify_signature_with_secret(SECRET, "order_123", "pay_999", &sig));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let sig = sign_order("other-secret", "order_123", "pay_456");
        assert!(!verify_signature_with_secret(SECRET, "order_123", "pay_456", &sig));
    }

    #[test]
    fn test_garbage_signature_rejected() {
        assert!(!verify_signature_with_secret(SECRET, "order_123", "pay_456", "zz"));
        assert!(!verify_signature_with_secret(SECRET, "order_123", "pay_456", ""));
    }

    #[test]
    fn test_extend_expiry_from_now_when_lapsed() {
        let now = Utc::now();
        let expiry = extend_expiry(Some(now - Duration::days(5)), now, 30);
        assert_eq!(expiry, now + Duration::days(30));

        let fresh = extend_expiry(None, now, 30);
        assert_eq!(fresh, now + Duration::days(30));
    }

    #[test]
    fn test_extend_expiry_stacks_on_active_plan() {
        let now = Utc::now();
        let current = now + Duration::days(10);
        let expiry = extend_expiry(Some(current), now, 30);
        assert_eq!(expiry, current + Duration::days(30));
    }
}
