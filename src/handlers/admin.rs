// Admin endpoints, gated on the is_admin flag of the caller's account
// row (not the token, so revoking admin takes effect immediately).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::AuthenticatedUser,
    models::{contact::ContactMessage, user::User},
    utils::ServiceError,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminUserEntry {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub plan: String,
    pub plan_expires_at: Option<DateTime<Utc>>,
    pub is_admin: bool,
    pub is_active: bool,
    pub page_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlatformStats {
    pub total_users: i64,
    pub pro_users: i64,
    pub total_pages: i64,
    pub total_views: i64,
    pub total_conversions: i64,
    pub total_revenue_cents: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MessagesQuery {
    pub limit: Option<i64>,
}

/// Load the caller and require the admin flag
async fn require_admin(
    state: &AppState,
    auth_user: &AuthenticatedUser,
) -> Result<User, ServiceError> {
    let user_id = auth_user.uuid().ok_or(ServiceError::Unauthorized)?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    let user = User::find_by_id(&mut conn, user_id).await?;
    if !user.is_admin {
        return Err(ServiceError::Forbidden);
    }

    Ok(user)
}

// =============================================================================
// HANDLERS
// =============================================================================

/// GET /admin/users - every account with its page count, newest first
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    responses(
        (status = 200, description = "Users", body = [AdminUserEntry]),
        (status = 403, description = "Not an admin"),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&state, &auth_user).await?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    let users = {
        use crate::schema::users::dsl;
        dsl::users
            .order(dsl::created_at.desc())
            .load::<User>(&mut conn)
            .await?
    };

    let counts: HashMap<Uuid, i64> = {
        use crate::schema::pages::dsl;
        dsl::pages
            .group_by(dsl::user_id)
            .select((dsl::user_id, diesel::dsl::count_star()))
            .load::<(Uuid, i64)>(&mut conn)
            .await?
            .into_iter()
            .collect()
    };

    let entries: Vec<AdminUserEntry> = users
        .into_iter()
        .map(|user| AdminUserEntry {
            page_count: counts.get(&user.id).copied().unwrap_or(0),
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            plan: user.plan,
            plan_expires_at: user.plan_expires_at,
            is_admin: user.is_admin,
            is_active: user.is_active,
            created_at: user.created_at,
        })
        .collect();

    Ok(Json(entries))
}

/// POST /admin/users/{id}/suspend - deactivate the account and flip its
/// pages to suspended, in one transaction
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/suspend",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "Suspended"),
        (status = 400, description = "Cannot act on your own account"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such user"),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn suspend_user(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(target_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let admin = require_admin(&state, &auth_user).await?;
    if admin.id == target_id {
        return Err(ServiceError::ValidationError(
            "Cannot act on your own account".to_string(),
        ));
    }

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    User::find_by_id(&mut conn, target_id).await?;

    let page_ids = conn
        .transaction::<_, diesel::result::Error, _>(|tx| {
            async move {
                {
                    use crate::schema::users::dsl;
                    diesel::update(dsl::users.filter(dsl::id.eq(target_id)))
                        .set((dsl::is_active.eq(false), dsl::updated_at.eq(Utc::now())))
                        .execute(tx)
                        .await?;
                }

                use crate::schema::pages::dsl;
                let ids = diesel::update(
                    dsl::pages
                        .filter(dsl::user_id.eq(target_id))
                        .filter(dsl::status.ne("suspended")),
                )
                .set((dsl::status.eq("suspended"), dsl::updated_at.eq(Utc::now())))
                .returning(dsl::id)
                .get_results::<Uuid>(tx)
                .await?;

                Ok(ids)
            }
            .scope_boxed()
        })
        .await?;

    for page_id in &page_ids {
        state.page_cache.invalidate(&format!("page:{}", page_id));
    }

    tracing::info!(admin_id = %admin.id, user_id = %target_id, pages = page_ids.len(), "user suspended");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/users/{id}/activate - reactivate the account and restore
/// its suspended pages to active
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/activate",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "Activated"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such user"),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn activate_user(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(target_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let admin = require_admin(&state, &auth_user).await?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    User::find_by_id(&mut conn, target_id).await?;

    conn.transaction::<_, diesel::result::Error, _>(|tx| {
        async move {
            {
                use crate::schema::users::dsl;
                diesel::update(dsl::users.filter(dsl::id.eq(target_id)))
                    .set((dsl::is_active.eq(true), dsl::updated_at.eq(Utc::now())))
                    .execute(tx)
                    .await?;
            }
            {
                use crate::schema::pages::dsl;
                diesel::update(
                    dsl::pages
                        .filter(dsl::user_id.eq(target_id))
                        .filter(dsl::status.eq("suspended")),
                )
                .set((dsl::status.eq("active"), dsl::updated_at.eq(Utc::now())))
                .execute(tx)
                .await?;
            }
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    tracing::info!(admin_id = %admin.id, user_id = %target_id, "user activated");

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /admin/users/{id} - remove the account and all dependent rows.
/// Cascading is done manually so the deletion order respects the foreign
/// keys.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Cannot act on your own account"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such user"),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(target_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let admin = require_admin(&state, &auth_user).await?;
    if admin.id == target_id {
        return Err(ServiceError::ValidationError(
            "Cannot act on your own account".to_string(),
        ));
    }

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    User::find_by_id(&mut conn, target_id).await?;

    let page_ids = conn
        .transaction::<_, diesel::result::Error, _>(|tx| {
            async move {
                let owned_pages: Vec<Uuid> = {
                    use crate::schema::pages::dsl;
                    dsl::pages
                        .filter(dsl::user_id.eq(target_id))
                        .select(dsl::id)
                        .load::<Uuid>(tx)
                        .await?
                };

                {
                    use crate::schema::analytics_events::dsl;
                    diesel::delete(
                        dsl::analytics_events.filter(dsl::page_id.eq_any(&owned_pages)),
                    )
                    .execute(tx)
                    .await?;
                }
                {
                    use crate::schema::page_analytics::dsl;
                    diesel::delete(dsl::page_analytics.filter(dsl::page_id.eq_any(&owned_pages)))
                        .execute(tx)
                        .await?;
                }
                {
                    use crate::schema::collected_emails::dsl;
                    diesel::delete(
                        dsl::collected_emails.filter(dsl::page_id.eq_any(&owned_pages)),
                    )
                    .execute(tx)
                    .await?;
                }
                {
                    use crate::schema::pages::dsl;
                    diesel::delete(dsl::pages.filter(dsl::user_id.eq(target_id)))
                        .execute(tx)
                        .await?;
                }
                {
                    use crate::schema::payments::dsl;
                    diesel::delete(dsl::payments.filter(dsl::user_id.eq(target_id)))
                        .execute(tx)
                        .await?;
                }
                {
                    use crate::schema::email_log::dsl;
                    diesel::delete(dsl::email_log.filter(dsl::user_id.eq(target_id)))
                        .execute(tx)
                        .await?;
                }
                {
                    use crate::schema::users::dsl;
                    diesel::delete(dsl::users.filter(dsl::id.eq(target_id)))
                        .execute(tx)
                        .await?;
                }

                Ok(owned_pages)
            }
            .scope_boxed()
        })
        .await?;

    for page_id in &page_ids {
        state.page_cache.invalidate(&format!("page:{}", page_id));
        state
            .summary_cache
            .invalidate_prefix(&format!("summary:page:{}", page_id));
    }
    state
        .summary_cache
        .invalidate_prefix(&format!("summary:account:{}", target_id));

    tracing::info!(admin_id = %admin.id, user_id = %target_id, "user deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// GET /admin/messages - recent contact-form submissions
#[utoipa::path(
    get,
    path = "/api/v1/admin/messages",
    params(("limit" = Option<i64>, Query, description = "Max rows, default 100")),
    responses(
        (status = 200, description = "Messages", body = [ContactMessage]),
        (status = 403, description = "Not an admin"),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Query(query): Query<MessagesQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&state, &auth_user).await?;

    let limit = query.limit.unwrap_or(100).clamp(1, 500);

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    let messages = {
        use crate::schema::contact_messages::dsl;
        dsl::contact_messages
            .order(dsl::created_at.desc())
            .limit(limit)
            .load::<ContactMessage>(&mut conn)
            .await?
    };

    Ok(Json(messages))
}

/// GET /admin/stats - platform-wide counters
#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    responses(
        (status = 200, description = "Platform stats", body = PlatformStats),
        (status = 403, description = "Not an admin"),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn platform_stats(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&state, &auth_user).await?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    let total_users = {
        use crate::schema::users::dsl;
        dsl::users.count().get_result::<i64>(&mut conn).await?
    };

    let pro_users = {
        use crate::schema::users::dsl;
        dsl::users
            .filter(dsl::plan.eq("pro"))
            .count()
            .get_result::<i64>(&mut conn)
            .await?
    };

    let total_pages = {
        use crate::schema::pages::dsl;
        dsl::pages.count().get_result::<i64>(&mut conn).await?
    };

    // SUM(bigint) comes back as numeric from Postgres, so fold here
    let rows: Vec<(i64, i64, i64)> = {
        use crate::schema::page_analytics::dsl;
        dsl::page_analytics
            .select((dsl::views, dsl::conversions, dsl::revenue_cents))
            .load(&mut conn)
            .await?
    };

    let mut stats = PlatformStats {
        total_users,
        pro_users,
        total_pages,
        total_views: 0,
        total_conversions: 0,
        total_revenue_cents: 0,
    };
    for (views, conversions, revenue_cents) in rows {
        stats.total_views += views;
        stats.total_conversions += conversions;
        stats.total_revenue_cents += revenue_cents;
    }

    Ok(Json(stats))
}
