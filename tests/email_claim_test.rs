// The email_log claim cycle that keeps transactional mails one-per-user:
// the first claim wins, a lost race is reported as already-sent, and a
// claim released after a failed delivery makes the user eligible again on
// the next follow-up pass.
//
// Needs a live database; set TEST_DATABASE_URL to run these.

use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use m404_backend_core::models::email_log::{EmailKind, EmailLogEntry};
use m404_backend_core::models::user::{NewUser, User};
use m404_backend_core::schema::{email_log, users};

async fn test_conn() -> Option<AsyncPgConnection> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    AsyncPgConnection::establish(&url).await.ok()
}

async fn create_user(conn: &mut AsyncPgConnection) -> User {
    User::create(
        conn,
        NewUser {
            email: format!("claim-{}@example.com", Uuid::new_v4()),
            password_hash: None,
            full_name: "Claim Cycle".to_string(),
            plan: "free".to_string(),
            oauth_provider: None,
            oauth_subject: None,
        },
    )
    .await
    .expect("user insert failed")
}

async fn cleanup(conn: &mut AsyncPgConnection, user: &User) {
    diesel::delete(email_log::table.filter(email_log::user_id.eq(user.id)))
        .execute(conn)
        .await
        .expect("email_log cleanup failed");
    diesel::delete(users::table.filter(users::id.eq(user.id)))
        .execute(conn)
        .await
        .expect("user cleanup failed");
}

#[tokio::test]
async fn first_claim_wins_and_duplicates_lose() {
    let Some(mut conn) = test_conn().await else {
        return;
    };
    let user = create_user(&mut conn).await;

    assert!(EmailLogEntry::record_sent(&mut conn, user.id, EmailKind::Welcome)
        .await
        .unwrap());
    assert!(!EmailLogEntry::record_sent(&mut conn, user.id, EmailKind::Welcome)
        .await
        .unwrap());
    assert!(EmailLogEntry::was_sent(&mut conn, user.id, EmailKind::Welcome)
        .await
        .unwrap());

    // The two kinds are tracked independently
    assert!(!EmailLogEntry::was_sent(&mut conn, user.id, EmailKind::Followup)
        .await
        .unwrap());

    cleanup(&mut conn, &user).await;
}

#[tokio::test]
async fn released_claim_can_be_claimed_again() {
    let Some(mut conn) = test_conn().await else {
        return;
    };
    let user = create_user(&mut conn).await;

    // Claim, then simulate a delivery failure releasing the claim
    assert!(EmailLogEntry::record_sent(&mut conn, user.id, EmailKind::Followup)
        .await
        .unwrap());
    EmailLogEntry::release(&mut conn, user.id, EmailKind::Followup)
        .await
        .unwrap();

    // The user is eligible again: no row, and a fresh claim succeeds
    assert!(!EmailLogEntry::was_sent(&mut conn, user.id, EmailKind::Followup)
        .await
        .unwrap());
    assert!(EmailLogEntry::record_sent(&mut conn, user.id, EmailKind::Followup)
        .await
        .unwrap());

    cleanup(&mut conn, &user).await;
}
