// Public embed endpoints, served with open CORS: the widget script on a
// visitor's broken page fetches its config here and posts events back.
// These routes are unauthenticated by design; what they expose is limited
// to active, quota-accessible pages.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use axum_extra::{headers::UserAgent, TypedHeader};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    models::{
        analytics::EventType,
        contact::NewCollectedEmail,
        page::{Page, PublicPageConfig},
        user::User,
    },
    services::{
        analytics::{self, TrackedEvent},
        plan,
    },
    utils::{trim_optional_field, ServiceError},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct TrackEventRequest {
    pub event_type: String,
    pub feature: Option<String>,
    pub revenue_cents: Option<i64>,
    pub referrer: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CollectEmailRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub feature: Option<String>,
}

/// Load a page and decide whether the embed may see it: must be active
/// and inside the owner's quota.
async fn load_servable_page(
    state: &AppState,
    page_id: Uuid,
) -> Result<PublicPageConfig, ServiceError> {
    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    let page = {
        use crate::schema::pages::dsl;
        dsl::pages
            .filter(dsl::id.eq(page_id))
            .filter(dsl::status.eq("active"))
            .first::<Page>(&mut conn)
            .await
            .optional()?
            .ok_or(ServiceError::NotFound)?
    };

    let owner = User::find_by_id(&mut conn, page.user_id).await?;

    let index = {
        use crate::schema::pages::dsl;
        dsl::pages
            .filter(dsl::user_id.eq(page.user_id))
            .filter(dsl::created_at.lt(page.created_at))
            .count()
            .get_result::<i64>(&mut conn)
            .await? as usize
    };

    if !plan::is_page_accessible(index, owner.plan_enum(), owner.plan_expires_at, Utc::now()) {
        return Err(ServiceError::NotFound);
    }

    Ok(PublicPageConfig::from(&page))
}

// =============================================================================
// HANDLERS
// =============================================================================

/// GET /p/{id}/config - embed config, cached for the TTL configured on
/// the page cache
#[utoipa::path(
    get,
    path = "/p/{id}/config",
    params(("id" = Uuid, Path, description = "Page id")),
    responses(
        (status = 200, description = "Public page config", body = PublicPageConfig),
        (status = 404, description = "No such page, or not servable"),
    ),
    tag = "embed"
)]
pub async fn get_public_config(
    State(state): State<AppState>,
    Path(page_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let cache_key = format!("page:{}", page_id);

    if let Some(config) = state.page_cache.get(&cache_key) {
        return Ok(Json(config));
    }

    let config = load_servable_page(&state, page_id).await?;
    state.page_cache.set(cache_key, config.clone());

    Ok(Json(config))
}

/// POST /p/{id}/track - ingest a view or conversion event.
///
/// Bot-scored traffic above the threshold is silently dropped; the
/// response is indistinguishable from an accepted event so scrapers learn
/// nothing.
#[utoipa::path(
    post,
    path = "/p/{id}/track",
    params(("id" = Uuid, Path, description = "Page id")),
    request_body = TrackEventRequest,
    responses(
        (status = 202, description = "Event accepted"),
        (status = 400, description = "Unknown event type"),
        (status = 404, description = "No such page"),
    ),
    tag = "embed"
)]
pub async fn track_event(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    user_agent: Option<TypedHeader<UserAgent>>,
    Path(page_id): Path<Uuid>,
    Json(req): Json<TrackEventRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let event_type = EventType::from_string(&req.event_type).ok_or_else(|| {
        ServiceError::ValidationError(format!("Unknown event type: {}", req.event_type))
    })?;

    let ip = addr.ip().to_string();
    let user_agent = user_agent.map(|TypedHeader(ua)| ua.to_string());

    if state
        .bot_score_client
        .should_block(Some(&ip), user_agent.as_deref())
        .await
    {
        tracing::debug!(page_id = %page_id, "dropping bot-scored event");
        return Ok((StatusCode::ACCEPTED, Json(json!({ "success": true }))));
    }

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    // Cheap existence check so junk ids do not pollute the event log
    let exists = {
        use crate::schema::pages::dsl;
        dsl::pages
            .filter(dsl::id.eq(page_id))
            .select(dsl::id)
            .first::<Uuid>(&mut conn)
            .await
            .optional()?
            .is_some()
    };
    if !exists {
        return Err(ServiceError::NotFound);
    }

    let event = TrackedEvent {
        page_id,
        event_type,
        feature: trim_optional_field(req.feature.as_ref()),
        revenue_cents: req.revenue_cents.unwrap_or(0).max(0),
        referrer: trim_optional_field(req.referrer.as_ref()),
        user_agent,
        ip_address: Some(ip),
    };

    analytics::ingest_event(&mut conn, event).await?;

    Ok((StatusCode::ACCEPTED, Json(json!({ "success": true }))))
}

/// POST /p/{id}/collect - email-capture widget submissions. Duplicates
/// per (page, email) are absorbed: the widget always sees success.
#[utoipa::path(
    post,
    path = "/p/{id}/collect",
    params(("id" = Uuid, Path, description = "Page id")),
    request_body = CollectEmailRequest,
    responses(
        (status = 201, description = "Email stored (or already known)"),
        (status = 400, description = "Invalid email"),
        (status = 404, description = "No such page"),
    ),
    tag = "embed"
)]
pub async fn collect_email(
    State(state): State<AppState>,
    Path(page_id): Path<Uuid>,
    Json(req): Json<CollectEmailRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    req.validate()?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    let inserted = {
        use crate::schema::collected_emails::dsl;
        diesel::insert_into(dsl::collected_emails)
            .values(&NewCollectedEmail {
                page_id,
                email: req.email.trim().to_lowercase(),
                source_feature: trim_optional_field(req.feature.as_ref()),
            })
            .on_conflict((dsl::page_id, dsl::email))
            .do_nothing()
            .execute(&mut conn)
            .await?
    };

    if inserted > 0 {
        tracing::debug!(page_id = %page_id, "collected email");
    }

    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}
