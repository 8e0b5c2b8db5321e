// Page CRUD. Every row access is ownership-checked against the
// authenticated user; accessibility (whether a page falls inside the
// owner's plan quota) is computed from creation order, never stored.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    middleware::AuthenticatedUser,
    models::{
        page::{
            validate_monetization_features, validate_social_links, CreatePageRequest, NewPage,
            Page, PageResponse, PageStatus, UpdatePage, UpdatePageRequest,
        },
        user::User,
    },
    services::plan,
    utils::ServiceError,
};

async fn get_conn(
    state: &AppState,
) -> Result<
    bb8::PooledConnection<
        '_,
        diesel_async::pooled_connection::AsyncDieselConnectionManager<AsyncPgConnection>,
    >,
    ServiceError,
> {
    state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))
}

fn auth_uuid(auth_user: &AuthenticatedUser) -> Result<Uuid, ServiceError> {
    auth_user.uuid().ok_or(ServiceError::Unauthorized)
}

/// Load a page and enforce ownership. A page owned by someone else is
/// indistinguishable from a missing one.
async fn find_owned_page(
    conn: &mut AsyncPgConnection,
    owner: Uuid,
    page_id: Uuid,
) -> Result<Page, ServiceError> {
    use crate::schema::pages::dsl;

    let page = dsl::pages
        .filter(dsl::id.eq(page_id))
        .filter(dsl::user_id.eq(owner))
        .first::<Page>(conn)
        .await
        .optional()?
        .ok_or(ServiceError::NotFound)?;

    Ok(page)
}

async fn count_pages(conn: &mut AsyncPgConnection, owner: Uuid) -> Result<i64, ServiceError> {
    use crate::schema::pages::dsl;

    let count = dsl::pages
        .filter(dsl::user_id.eq(owner))
        .count()
        .get_result::<i64>(conn)
        .await?;

    Ok(count)
}

/// Creation-order index of a page among its owner's pages (0 = oldest).
async fn page_index(
    conn: &mut AsyncPgConnection,
    owner: Uuid,
    page: &Page,
) -> Result<usize, ServiceError> {
    use crate::schema::pages::dsl;

    let older = dsl::pages
        .filter(dsl::user_id.eq(owner))
        .filter(dsl::created_at.lt(page.created_at))
        .count()
        .get_result::<i64>(conn)
        .await?;

    Ok(older as usize)
}

fn check_blobs(
    social_links: Option<&serde_json::Value>,
    monetization_features: Option<&serde_json::Value>,
) -> Result<(), ServiceError> {
    if let Some(links) = social_links {
        validate_social_links(links).map_err(ServiceError::ValidationError)?;
    }
    if let Some(features) = monetization_features {
        validate_monetization_features(features).map_err(ServiceError::ValidationError)?;
    }
    Ok(())
}

// =============================================================================
// HANDLERS
// =============================================================================

/// POST /pages - create a page, enforcing the plan quota
#[utoipa::path(
    post,
    path = "/api/v1/pages",
    request_body = CreatePageRequest,
    responses(
        (status = 201, description = "Page created", body = PageResponse),
        (status = 402, description = "Plan quota exceeded"),
        (status = 409, description = "Slug already taken"),
    ),
    security(("bearer_auth" = [])),
    tag = "pages"
)]
pub async fn create_page(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<CreatePageRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    req.validate()?;
    check_blobs(req.social_links.as_ref(), req.monetization_features.as_ref())?;

    let owner = auth_uuid(&auth_user)?;
    let mut conn = get_conn(&state).await?;

    let user = User::find_by_id(&mut conn, owner).await?;
    let limit = plan::page_limit(user.effective_plan());
    let existing = count_pages(&mut conn, owner).await?;

    if existing as usize >= limit {
        return Err(ServiceError::PlanLimitExceeded(format!(
            "Your plan allows {} page{}. Upgrade to Pro for more.",
            limit,
            if limit == 1 { "" } else { "s" }
        )));
    }

    let now = Utc::now();
    let new_page = NewPage {
        id: Uuid::new_v4(),
        user_id: owner,
        title: req.title.trim().to_string(),
        slug: req.slug.clone(),
        status: PageStatus::Active.as_str().to_string(),
        config: req.config.unwrap_or_else(|| json!({})),
        social_links: req.social_links.unwrap_or_else(|| json!([])),
        monetization_features: req.monetization_features.unwrap_or_else(|| json!([])),
        created_at: now,
        updated_at: now,
    };

    let page = {
        use crate::schema::pages::dsl;
        diesel::insert_into(dsl::pages)
            .values(&new_page)
            .get_result::<Page>(&mut conn)
            .await?
    };

    tracing::info!(user_id = %owner, page_id = %page.id, "page created");

    // The new page is the newest, so its index is the previous count
    let accessible = plan::is_page_accessible(
        existing as usize,
        user.plan_enum(),
        user.plan_expires_at,
        now,
    );

    Ok((
        StatusCode::CREATED,
        Json(PageResponse::from_page(page, accessible)),
    ))
}

/// GET /pages - list the caller's pages, oldest first, with quota flags
#[utoipa::path(
    get,
    path = "/api/v1/pages",
    responses((status = 200, description = "Pages", body = [PageResponse])),
    security(("bearer_auth" = [])),
    tag = "pages"
)]
pub async fn list_pages(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let owner = auth_uuid(&auth_user)?;
    let mut conn = get_conn(&state).await?;

    let user = User::find_by_id(&mut conn, owner).await?;

    let pages = {
        use crate::schema::pages::dsl;
        dsl::pages
            .filter(dsl::user_id.eq(owner))
            .order(dsl::created_at.asc())
            .load::<Page>(&mut conn)
            .await?
    };

    let now = Utc::now();
    let responses: Vec<PageResponse> = pages
        .into_iter()
        .enumerate()
        .map(|(index, page)| {
            let accessible =
                plan::is_page_accessible(index, user.plan_enum(), user.plan_expires_at, now);
            PageResponse::from_page(page, accessible)
        })
        .collect();

    Ok(Json(responses))
}

/// GET /pages/{id}
#[utoipa::path(
    get,
    path = "/api/v1/pages/{id}",
    params(("id" = Uuid, Path, description = "Page id")),
    responses(
        (status = 200, description = "Page", body = PageResponse),
        (status = 404, description = "Not found or not yours"),
    ),
    security(("bearer_auth" = [])),
    tag = "pages"
)]
pub async fn get_page(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(page_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let owner = auth_uuid(&auth_user)?;
    let mut conn = get_conn(&state).await?;

    let user = User::find_by_id(&mut conn, owner).await?;
    let page = find_owned_page(&mut conn, owner, page_id).await?;
    let index = page_index(&mut conn, owner, &page).await?;

    let accessible =
        plan::is_page_accessible(index, user.plan_enum(), user.plan_expires_at, Utc::now());

    Ok(Json(PageResponse::from_page(page, accessible)))
}

/// PUT /pages/{id}
#[utoipa::path(
    put,
    path = "/api/v1/pages/{id}",
    params(("id" = Uuid, Path, description = "Page id")),
    request_body = UpdatePageRequest,
    responses(
        (status = 200, description = "Updated page", body = PageResponse),
        (status = 403, description = "Status change not permitted"),
        (status = 404, description = "Not found or not yours"),
    ),
    security(("bearer_auth" = [])),
    tag = "pages"
)]
pub async fn update_page(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(page_id): Path<Uuid>,
    Json(req): Json<UpdatePageRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    req.validate()?;
    check_blobs(req.social_links.as_ref(), req.monetization_features.as_ref())?;

    let owner = auth_uuid(&auth_user)?;
    let mut conn = get_conn(&state).await?;

    let user = User::find_by_id(&mut conn, owner).await?;
    let page = find_owned_page(&mut conn, owner, page_id).await?;

    if let Some(status) = req.status.as_deref() {
        let status = PageStatus::from_string(status).map_err(ServiceError::ValidationError)?;

        // Suspension is an admin action, in both directions
        if !user.is_admin
            && (status == PageStatus::Suspended || page.status == PageStatus::Suspended.as_str())
        {
            return Err(ServiceError::Forbidden);
        }
    } else if page.status == PageStatus::Suspended.as_str() && !user.is_admin {
        return Err(ServiceError::Forbidden);
    }

    let update = UpdatePage {
        title: req.title.map(|t| t.trim().to_string()),
        slug: req.slug,
        status: req.status,
        config: req.config,
        social_links: req.social_links,
        monetization_features: req.monetization_features,
        updated_at: Utc::now(),
    };

    let updated = {
        use crate::schema::pages::dsl;
        diesel::update(dsl::pages.filter(dsl::id.eq(page_id)))
            .set(&update)
            .get_result::<Page>(&mut conn)
            .await?
    };

    // Embed config is stale now
    state.page_cache.invalidate(&format!("page:{}", page_id));

    let index = page_index(&mut conn, owner, &updated).await?;
    let accessible =
        plan::is_page_accessible(index, user.plan_enum(), user.plan_expires_at, Utc::now());

    Ok(Json(PageResponse::from_page(updated, accessible)))
}

/// DELETE /pages/{id} - removes the page and its dependent rows in one
/// transaction
#[utoipa::path(
    delete,
    path = "/api/v1/pages/{id}",
    params(("id" = Uuid, Path, description = "Page id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not yours"),
    ),
    security(("bearer_auth" = [])),
    tag = "pages"
)]
pub async fn delete_page(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(page_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let owner = auth_uuid(&auth_user)?;
    let mut conn = get_conn(&state).await?;

    find_owned_page(&mut conn, owner, page_id).await?;

    conn.transaction::<_, diesel::result::Error, _>(|tx| {
        async move {
            {
                use crate::schema::analytics_events::dsl;
                diesel::delete(dsl::analytics_events.filter(dsl::page_id.eq(page_id)))
                    .execute(tx)
                    .await?;
            }
            {
                use crate::schema::page_analytics::dsl;
                diesel::delete(dsl::page_analytics.filter(dsl::page_id.eq(page_id)))
                    .execute(tx)
                    .await?;
            }
            {
                use crate::schema::collected_emails::dsl;
                diesel::delete(dsl::collected_emails.filter(dsl::page_id.eq(page_id)))
                    .execute(tx)
                    .await?;
            }
            {
                use crate::schema::pages::dsl;
                diesel::delete(dsl::pages.filter(dsl::id.eq(page_id)))
                    .execute(tx)
                    .await?;
            }
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    state.page_cache.invalidate(&format!("page:{}", page_id));
    state
        .summary_cache
        .invalidate_prefix(&format!("summary:page:{}", page_id));
    state
        .summary_cache
        .invalidate_prefix(&format!("summary:account:{}", owner));

    tracing::info!(user_id = %owner, page_id = %page_id, "page deleted");

    Ok(StatusCode::NO_CONTENT)
}
