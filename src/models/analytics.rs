// Analytics rows: per-page daily aggregates plus the raw event log

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::{analytics_events, page_analytics};

/// Tracked event kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    View,
    Conversion,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::View => "view",
            EventType::Conversion => "conversion",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "view" => Some(EventType::View),
            "conversion" => Some(EventType::Conversion),
            _ => None,
        }
    }
}

/// Daily aggregate row, upserted by the tracking endpoint
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = page_analytics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PageAnalytics {
    pub id: Uuid,
    pub page_id: Uuid,
    pub day: NaiveDate,
    pub views: i64,
    pub conversions: i64,
    pub revenue_cents: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = page_analytics)]
pub struct NewPageAnalytics {
    pub page_id: Uuid,
    pub day: NaiveDate,
    pub views: i64,
    pub conversions: i64,
    pub revenue_cents: i64,
}

/// Raw event log row
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = analytics_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AnalyticsEvent {
    pub id: Uuid,
    pub page_id: Uuid,
    pub event_type: String,
    pub feature: Option<String>,
    pub revenue_cents: i64,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = analytics_events)]
pub struct NewAnalyticsEvent {
    pub page_id: Uuid,
    pub event_type: String,
    pub feature: Option<String>,
    pub revenue_cents: i64,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_conversion() {
        assert_eq!(EventType::View.as_str(), "view");
        assert_eq!(EventType::Conversion.as_str(), "conversion");
        assert_eq!(EventType::from_string("view"), Some(EventType::View));
        assert_eq!(EventType::from_string("click"), None);
    }
}
