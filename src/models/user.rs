// User database model and plan tier handling

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::schema::users;

/// Subscription plan tier gating page quota and feature access
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, diesel::expression::AsExpression,
)]
#[diesel(sql_type = diesel::sql_types::Text)]
pub enum Plan {
    Free, // $0 - 1 accessible page
    Pro,  // Paid monthly - 50 accessible pages, all widgets
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            _ => Err(format!("Invalid plan: {}", s)),
        }
    }
}

impl<DB> diesel::deserialize::FromSql<diesel::sql_types::Text, DB> for Plan
where
    DB: diesel::backend::Backend,
    String: diesel::deserialize::FromSql<diesel::sql_types::Text, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
        let value = String::from_sql(bytes)?;
        Self::from_str(&value).map_err(|e| e.into())
    }
}

impl<DB> diesel::serialize::ToSql<diesel::sql_types::Text, DB> for Plan
where
    DB: diesel::backend::Backend,
    str: diesel::serialize::ToSql<diesel::sql_types::Text, DB>,
{
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, DB>,
    ) -> diesel::serialize::Result {
        self.as_str().to_sql(out)
    }
}

/// User database model - queryable from database
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub full_name: String,
    pub plan: String, // Converted to Plan via plan_enum()
    pub plan_expires_at: Option<DateTime<Utc>>,
    pub is_admin: bool,
    pub is_active: bool,
    pub oauth_provider: Option<String>,
    pub oauth_subject: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user for insertion
#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub full_name: String,
    pub plan: String,
    pub oauth_provider: Option<String>,
    pub oauth_subject: Option<String>,
}

/// User update struct
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password_hash: Option<Option<String>>,
    pub full_name: Option<String>,
    pub plan: Option<String>,
    pub plan_expires_at: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Errors for user operations
#[derive(thiserror::Error, Debug)]
pub enum UserError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("User not found")]
    NotFound,

    #[error("Invalid user ID format")]
    InvalidId,

    #[error("Connection pool error")]
    Pool(String),
}

impl User {
    /// Find user by ID
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::*;

        users
            .filter(id.eq(user_id))
            .first::<User>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => UserError::NotFound,
                _ => UserError::Database(e),
            })
    }

    /// Find user by email (case-insensitive)
    pub async fn find_by_email(
        conn: &mut AsyncPgConnection,
        email_str: &str,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::*;
        use diesel::PgTextExpressionMethods;

        users
            .filter(email.ilike(email_str))
            .first::<User>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => UserError::NotFound,
                _ => UserError::Database(e),
            })
    }

    /// Find user by OAuth identity
    pub async fn find_by_oauth(
        conn: &mut AsyncPgConnection,
        provider: &str,
        subject: &str,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::*;

        users
            .filter(oauth_provider.eq(provider))
            .filter(oauth_subject.eq(subject))
            .first::<User>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => UserError::NotFound,
                _ => UserError::Database(e),
            })
    }

    /// Create a new user
    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_user: NewUser,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::*;

        diesel::insert_into(users)
            .values(&new_user)
            .get_result::<User>(conn)
            .await
            .map_err(UserError::Database)
    }

    /// Update user
    pub async fn update(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        update: UserUpdate,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::*;

        diesel::update(users.filter(id.eq(user_id)))
            .set(&update)
            .get_result::<User>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => UserError::NotFound,
                _ => UserError::Database(e),
            })
    }

    /// Get user's stored plan as enum
    pub fn plan_enum(&self) -> Plan {
        Plan::from_str(&self.plan).unwrap_or_else(|e| {
            tracing::warn!(
                "Invalid plan '{}' for user {}, defaulting to Free: {}",
                self.plan,
                self.id,
                e
            );
            Plan::Free
        })
    }

    /// Get the plan the user effectively has right now (expired pro behaves as free)
    pub fn effective_plan(&self) -> Plan {
        crate::services::plan::effective_plan(self.plan_enum(), self.plan_expires_at, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_user(plan: &str, plan_expires_at: Option<DateTime<Utc>>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            password_hash: Some("hash".to_string()),
            full_name: "Test User".to_string(),
            plan: plan.to_string(),
            plan_expires_at,
            is_admin: false,
            is_active: true,
            oauth_provider: None,
            oauth_subject: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_plan_conversion() {
        assert_eq!(Plan::Free.as_str(), "free");
        assert_eq!(Plan::Pro.as_str(), "pro");

        assert_eq!(Plan::from_str("free"), Ok(Plan::Free));
        assert_eq!(Plan::from_str("pro"), Ok(Plan::Pro));
        assert!(Plan::from_str("enterprise").is_err());
    }

    #[test]
    fn test_invalid_plan_defaults_to_free() {
        let user = test_user("platinum", None);
        assert_eq!(user.plan_enum(), Plan::Free);
    }

    #[test]
    fn test_effective_plan_expired_pro_behaves_as_free() {
        let expired = test_user("pro", Some(Utc::now() - Duration::days(1)));
        assert_eq!(expired.effective_plan(), Plan::Free);

        let current = test_user("pro", Some(Utc::now() + Duration::days(10)));
        assert_eq!(current.effective_plan(), Plan::Pro);
    }
}
