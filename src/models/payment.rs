use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::payments;

#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, AsChangeset,
)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub provider_order_id: String,
    pub provider_payment_id: Option<String>,
    pub amount_cents: i32,
    pub currency: String,
    pub status: String,
    pub signature_verified: bool,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub provider: String,
    pub provider_order_id: String,
    pub amount_cents: i32,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Created,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "created",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "created" => Some(PaymentStatus::Created),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

impl Payment {
    pub async fn find_by_user_id(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::payments::dsl;

        dsl::payments
            .filter(dsl::user_id.eq(user_id))
            .order(dsl::created_at.desc())
            .load::<Self>(conn)
            .await
    }

    pub async fn find_by_order_id(
        conn: &mut AsyncPgConnection,
        order_id: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        use crate::schema::payments::dsl;

        dsl::payments
            .filter(dsl::provider_order_id.eq(order_id))
            .first::<Self>(conn)
            .await
            .optional()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_conversion() {
        assert_eq!(PaymentStatus::Created.as_str(), "created");
        assert_eq!(
            PaymentStatus::from_string("completed"),
            Some(PaymentStatus::Completed)
        );
        assert_eq!(PaymentStatus::from_string("refunded"), None);
    }
}
