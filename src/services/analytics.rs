// Event ingestion and dashboard summaries.
// Every tracked event is written twice inside one transaction: a raw row in
// analytics_events for the audit trail, and an upsert into the per-day
// aggregate that the dashboard reads.

use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::analytics::{EventType, NewAnalyticsEvent, NewPageAnalytics, PageAnalytics};

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}

/// Incoming event from the public tracking endpoint, already validated by
/// the handler.
#[derive(Debug, Clone)]
pub struct TrackedEvent {
    pub page_id: Uuid,
    pub event_type: EventType,
    pub feature: Option<String>,
    pub revenue_cents: i64,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// Totals for one page over the requested range
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PageSummary {
    pub page_id: Uuid,
    pub total_views: i64,
    pub total_conversions: i64,
    pub total_revenue_cents: i64,
    pub days: Vec<DaySummary>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DaySummary {
    pub day: chrono::NaiveDate,
    pub views: i64,
    pub conversions: i64,
    pub revenue_cents: i64,
}

/// Account-wide totals across all of a user's pages
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountSummary {
    pub total_views: i64,
    pub total_conversions: i64,
    pub total_revenue_cents: i64,
    pub page_count: i64,
}

/// Record one event: raw log insert plus daily-aggregate upsert, atomically.
pub async fn ingest_event(
    conn: &mut AsyncPgConnection,
    event: TrackedEvent,
) -> Result<(), AnalyticsError> {
    let today = Utc::now().date_naive();

    let (view_delta, conversion_delta) = match event.event_type {
        EventType::View => (1i64, 0i64),
        EventType::Conversion => (0i64, 1i64),
    };
    let revenue_delta = event.revenue_cents;

    conn.transaction::<_, diesel::result::Error, _>(|tx| {
        async move {
            {
                use crate::schema::analytics_events::dsl::*;
                diesel::insert_into(analytics_events)
                    .values(&NewAnalyticsEvent {
                        page_id: event.page_id,
                        event_type: event.event_type.as_str().to_string(),
                        feature: event.feature,
                        revenue_cents: event.revenue_cents,
                        referrer: event.referrer,
                        user_agent: event.user_agent,
                        ip_address: event.ip_address,
                    })
                    .execute(tx)
                    .await?;
            }

            {
                use crate::schema::page_analytics::dsl::*;
                diesel::insert_into(page_analytics)
                    .values(&NewPageAnalytics {
                        page_id: event.page_id,
                        day: today,
                        views: view_delta,
                        conversions: conversion_delta,
                        revenue_cents: revenue_delta,
                    })
                    .on_conflict((page_id, day))
                    .do_update()
                    .set((
                        views.eq(views + excluded(views)),
                        conversions.eq(conversions + excluded(conversions)),
                        revenue_cents.eq(revenue_cents + excluded(revenue_cents)),
                        updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(tx)
                    .await?;
            }

            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    Ok(())
}

/// Per-page summary over the trailing `range_days`, oldest day first.
pub async fn page_summary(
    conn: &mut AsyncPgConnection,
    target_page: Uuid,
    range_days: i64,
) -> Result<PageSummary, AnalyticsError> {
    use crate::schema::page_analytics::dsl::*;

    let since = (Utc::now() - Duration::days(range_days)).date_naive();

    let rows: Vec<PageAnalytics> = page_analytics
        .filter(page_id.eq(target_page))
        .filter(day.ge(since))
        .order(day.asc())
        .load(conn)
        .await?;

    let mut summary = PageSummary {
        page_id: target_page,
        total_views: 0,
        total_conversions: 0,
        total_revenue_cents: 0,
        days: Vec::with_capacity(rows.len()),
    };

    for row in rows {
        summary.total_views += row.views;
        summary.total_conversions += row.conversions;
        summary.total_revenue_cents += row.revenue_cents;
        summary.days.push(DaySummary {
            day: row.day,
            views: row.views,
            conversions: row.conversions,
            revenue_cents: row.revenue_cents,
        });
    }

    Ok(summary)
}

/// Account-wide totals across every page the user owns.
pub async fn account_summary(
    conn: &mut AsyncPgConnection,
    owner: Uuid,
    range_days: i64,
) -> Result<AccountSummary, AnalyticsError> {
    use crate::schema::{page_analytics, pages};

    let since = (Utc::now() - Duration::days(range_days)).date_naive();

    // SUM(bigint) comes back as numeric from Postgres, so fold here instead
    let rows: Vec<(i64, i64, i64)> = page_analytics::table
        .inner_join(pages::table)
        .filter(pages::user_id.eq(owner))
        .filter(page_analytics::day.ge(since))
        .select((
            page_analytics::views,
            page_analytics::conversions,
            page_analytics::revenue_cents,
        ))
        .load(conn)
        .await?;

    let page_count: i64 = pages::table
        .filter(pages::user_id.eq(owner))
        .count()
        .get_result(conn)
        .await?;

    let mut summary = AccountSummary {
        total_views: 0,
        total_conversions: 0,
        total_revenue_cents: 0,
        page_count,
    };
    for (views, conversions, revenue_cents) in rows {
        summary.total_views += views;
        summary.total_conversions += conversions;
        summary.total_revenue_cents += revenue_cents;
    }

    Ok(summary)
}
