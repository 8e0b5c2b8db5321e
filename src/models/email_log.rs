// Idempotency bookkeeping for transactional mails ("has this email already been sent")

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use uuid::Uuid;

use crate::schema::email_log;

/// Transactional email kinds tracked for idempotency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Welcome,
    Followup,
}

impl EmailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailKind::Welcome => "welcome",
            EmailKind::Followup => "followup",
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = email_log)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EmailLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = email_log)]
pub struct NewEmailLogEntry {
    pub user_id: Uuid,
    pub kind: String,
}

impl EmailLogEntry {
    /// Whether a mail of this kind was already sent to the user
    pub async fn was_sent(
        conn: &mut AsyncPgConnection,
        target_user: Uuid,
        mail_kind: EmailKind,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::email_log::dsl::*;
        use diesel::dsl::count_star;

        let count: i64 = email_log
            .filter(user_id.eq(target_user))
            .filter(kind.eq(mail_kind.as_str()))
            .select(count_star())
            .first(conn)
            .await?;

        Ok(count > 0)
    }

    /// Claim a mail before sending; the unique (user_id, kind) constraint
    /// makes this safe to race - the duplicate insert loses and the caller
    /// treats the conflict as already-sent.
    pub async fn record_sent(
        conn: &mut AsyncPgConnection,
        target_user: Uuid,
        mail_kind: EmailKind,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::email_log::dsl::*;

        let inserted = diesel::insert_into(email_log)
            .values(&NewEmailLogEntry {
                user_id: target_user,
                kind: mail_kind.as_str().to_string(),
            })
            .on_conflict((user_id, kind))
            .do_nothing()
            .execute(conn)
            .await?;

        Ok(inserted > 0)
    }

    /// Drop a claim whose delivery failed so a later pass can retry the mail.
    pub async fn release(
        conn: &mut AsyncPgConnection,
        target_user: Uuid,
        mail_kind: EmailKind,
    ) -> Result<(), diesel::result::Error> {
        use crate::schema::email_log::dsl::*;

        diesel::delete(
            email_log
                .filter(user_id.eq(target_user))
                .filter(kind.eq(mail_kind.as_str())),
        )
        .execute(conn)
        .await?;

        Ok(())
    }
}
