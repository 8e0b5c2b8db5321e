// Dashboard analytics: per-page and per-account summaries over the daily
// aggregates, plus a raw event tail for debugging a page's traffic.
// Summaries are cached briefly; the tracking endpoint writes often and
// the dashboard polls.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::AuthenticatedUser,
    models::analytics::AnalyticsEvent,
    services::analytics,
    utils::ServiceError,
};

const DEFAULT_RANGE_DAYS: i64 = 30;
const MAX_RANGE_DAYS: i64 = 365;
const DEFAULT_EVENT_LIMIT: i64 = 50;
const MAX_EVENT_LIMIT: i64 = 200;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RangeQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EventsQuery {
    pub limit: Option<i64>,
}

fn clamp_days(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_RANGE_DAYS).clamp(1, MAX_RANGE_DAYS)
}

/// Ownership gate shared by the per-page endpoints
async fn assert_page_owner(
    state: &AppState,
    auth_user: &AuthenticatedUser,
    page_id: Uuid,
) -> Result<Uuid, ServiceError> {
    let owner = auth_user.uuid().ok_or(ServiceError::Unauthorized)?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    let found = {
        use crate::schema::pages::dsl;
        dsl::pages
            .filter(dsl::id.eq(page_id))
            .filter(dsl::user_id.eq(owner))
            .select(dsl::id)
            .first::<Uuid>(&mut conn)
            .await
            .optional()?
    };

    found.ok_or(ServiceError::NotFound)?;
    Ok(owner)
}

// =============================================================================
// HANDLERS
// =============================================================================

/// GET /analytics/pages/{id}?days=30 - daily series + totals for one page
#[utoipa::path(
    get,
    path = "/api/v1/analytics/pages/{id}",
    params(
        ("id" = Uuid, Path, description = "Page id"),
        ("days" = Option<i64>, Query, description = "Trailing range, default 30"),
    ),
    responses(
        (status = 200, description = "Page summary", body = analytics::PageSummary),
        (status = 404, description = "Not found or not yours"),
    ),
    security(("bearer_auth" = [])),
    tag = "analytics"
)]
pub async fn page_summary(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(page_id): Path<Uuid>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    assert_page_owner(&state, &auth_user, page_id).await?;

    let days = clamp_days(query.days);
    let cache_key = format!("summary:page:{}:{}", page_id, days);

    if let Some(cached) = state.summary_cache.get(&cache_key) {
        return Ok(Json(cached));
    }

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    let summary = analytics::page_summary(&mut conn, page_id, days).await?;
    let value = serde_json::to_value(&summary)
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    state.summary_cache.set(cache_key, value.clone());

    Ok(Json(value))
}

/// GET /analytics/summary?days=30 - account-wide totals
#[utoipa::path(
    get,
    path = "/api/v1/analytics/summary",
    params(("days" = Option<i64>, Query, description = "Trailing range, default 30")),
    responses(
        (status = 200, description = "Account summary", body = analytics::AccountSummary),
    ),
    security(("bearer_auth" = [])),
    tag = "analytics"
)]
pub async fn account_summary(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let owner = auth_user.uuid().ok_or(ServiceError::Unauthorized)?;

    let days = clamp_days(query.days);
    let cache_key = format!("summary:account:{}:{}", owner, days);

    if let Some(cached) = state.summary_cache.get(&cache_key) {
        return Ok(Json(cached));
    }

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    let summary = analytics::account_summary(&mut conn, owner, days).await?;
    let value = serde_json::to_value(&summary)
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    state.summary_cache.set(cache_key, value.clone());

    Ok(Json(value))
}

/// GET /analytics/pages/{id}/events?limit=50 - newest raw events first
#[utoipa::path(
    get,
    path = "/api/v1/analytics/pages/{id}/events",
    params(
        ("id" = Uuid, Path, description = "Page id"),
        ("limit" = Option<i64>, Query, description = "Max rows, default 50, cap 200"),
    ),
    responses(
        (status = 200, description = "Raw events", body = [AnalyticsEvent]),
        (status = 404, description = "Not found or not yours"),
    ),
    security(("bearer_auth" = [])),
    tag = "analytics"
)]
pub async fn recent_events(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(page_id): Path<Uuid>,
    Query(query): Query<EventsQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    assert_page_owner(&state, &auth_user, page_id).await?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT);

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    let events = {
        use crate::schema::analytics_events::dsl;
        dsl::analytics_events
            .filter(dsl::page_id.eq(page_id))
            .order(dsl::occurred_at.desc())
            .limit(limit)
            .load::<AnalyticsEvent>(&mut conn)
            .await?
    };

    Ok(Json(events))
}
