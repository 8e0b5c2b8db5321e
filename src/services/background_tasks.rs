// Periodic maintenance tasks: cache and limiter sweeps, plan-expiry
// downgrades and the follow-up email pass. Each loop owns its own interval
// and logs what it did; a failing pass waits for the next tick instead of
// killing the loop.

use chrono::{Duration as ChronoDuration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use std::time::Duration;
use tracing::{error, info};

use crate::app::AppState;
use crate::app_config::config;
use crate::models::email_log::EmailKind;
use crate::models::user::User;

/// How often the downgrade and follow-up passes run
const MAINTENANCE_INTERVAL_SECS: u64 = 3600;

pub struct BackgroundTaskManager {
    state: AppState,
}

impl BackgroundTaskManager {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Spawn all periodic loops. Handles are detached; the tasks live as
    /// long as the process.
    pub fn start_all_tasks(&self) {
        info!("Starting background maintenance tasks");

        self.spawn_sweep_loop();
        self.spawn_maintenance_loop();
    }

    fn spawn_sweep_loop(&self) {
        let state = self.state.clone();
        let sweep_interval = Duration::from_secs(config().cache.sweep_interval_seconds);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            // First tick fires immediately; skip it
            interval.tick().await;

            loop {
                interval.tick().await;

                let pages_dropped = state.page_cache.sweep();
                let summaries_dropped = state.summary_cache.sweep();
                let limiter_keys_dropped = state.rate_limit_service.sweep();

                if pages_dropped + summaries_dropped + limiter_keys_dropped > 0 {
                    info!(
                        pages_dropped,
                        summaries_dropped, limiter_keys_dropped, "periodic sweep completed"
                    );
                }
            }
        });
    }

    fn spawn_maintenance_loop(&self) {
        let state = self.state.clone();

        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(MAINTENANCE_INTERVAL_SECS));
            interval.tick().await;

            loop {
                interval.tick().await;

                if let Err(e) = downgrade_expired_pro_users(&state).await {
                    error!("plan downgrade pass failed: {}", e);
                }

                if let Err(e) = send_pending_followups(&state).await {
                    error!("follow-up email pass failed: {}", e);
                }
            }
        });
    }
}

/// Persist the expiry rule: pro users whose plan_expires_at has passed are
/// written back to free. Reads already treat them as free via
/// effective_plan; this keeps the stored rows honest.
async fn downgrade_expired_pro_users(state: &AppState) -> anyhow::Result<()> {
    use crate::schema::users::dsl::*;

    let mut conn = state.diesel_pool.get().await?;

    let downgraded = diesel::update(
        users
            .filter(plan.eq("pro"))
            .filter(plan_expires_at.le(Utc::now()).and(plan_expires_at.is_not_null())),
    )
    .set((
        plan.eq("free"),
        plan_expires_at.eq(None::<chrono::DateTime<Utc>>),
        updated_at.eq(diesel::dsl::now),
    ))
    .execute(&mut conn)
    .await?;

    if downgraded > 0 {
        info!(downgraded, "expired pro plans downgraded to free");
    }

    Ok(())
}

/// Send the getting-started follow-up to users who signed up long enough
/// ago and have not received one. The per-user email_log claim keeps this
/// idempotent across passes and instances; a failed delivery releases its
/// claim, so the user is selected again on the next pass.
async fn send_pending_followups(state: &AppState) -> anyhow::Result<()> {
    use crate::schema::{email_log, users};

    let delay_days = config().email.followup_delay_days;
    let cutoff = Utc::now() - ChronoDuration::days(delay_days);

    let mut conn = state.diesel_pool.get().await?;

    let already_sent = email_log::table
        .filter(email_log::kind.eq(EmailKind::Followup.as_str()))
        .select(email_log::user_id);

    let due: Vec<User> = users::table
        .filter(users::created_at.le(cutoff))
        .filter(users::is_active.eq(true))
        .filter(users::id.ne_all(already_sent))
        .limit(100)
        .load(&mut conn)
        .await?;

    if due.is_empty() {
        return Ok(());
    }

    info!(count = due.len(), "sending follow-up emails");

    for user in due {
        // send_followup_email claims the log row itself and swallows
        // delivery failures
        state.email_service.send_followup_email(&mut conn, &user).await;
    }

    Ok(())
}

/// Initialize background tasks (call this in main.rs)
pub fn initialize_background_tasks(state: AppState) {
    let task_manager = BackgroundTaskManager::new(state);
    task_manager.start_all_tasks();
}
