// Page model - a user-configured 404 landing page with monetization widgets

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::schema::pages;

lazy_static! {
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9][a-z0-9-]{1,98}[a-z0-9]$").unwrap();
}

/// Known monetization widget types accepted in the features blob
pub const KNOWN_FEATURE_TYPES: &[&str] = &[
    "affiliate_links",
    "email_capture",
    "donation_button",
    "countdown_offer",
    "sponsored_banner",
    "product_showcase",
];

/// Page status lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PageStatus {
    Active,
    Draft,
    Archived,
    Suspended,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Active => "active",
            PageStatus::Draft => "draft",
            PageStatus::Archived => "archived",
            PageStatus::Suspended => "suspended",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, String> {
        match s {
            "active" => Ok(PageStatus::Active),
            "draft" => Ok(PageStatus::Draft),
            "archived" => Ok(PageStatus::Archived),
            "suspended" => Ok(PageStatus::Suspended),
            _ => Err(format!("Invalid page status: {}", s)),
        }
    }
}

// =============================================================================
// DATABASE MODELS
// =============================================================================

/// Page model representing a database record
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, Deserialize, ToSchema)]
#[diesel(table_name = pages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Page {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub config: JsonValue,
    pub social_links: JsonValue,
    pub monetization_features: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New page for insertion
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pages)]
pub struct NewPage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub config: JsonValue,
    pub social_links: JsonValue,
    pub monetization_features: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Update page fields
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = pages)]
pub struct UpdatePage {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub status: Option<String>,
    pub config: Option<JsonValue>,
    pub social_links: Option<JsonValue>,
    pub monetization_features: Option<JsonValue>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// REQUEST/RESPONSE DTOs
// =============================================================================

/// Request to create a new page
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePageRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 3, max = 100, message = "Slug must be 3-100 characters"))]
    #[validate(regex(
        path = "SLUG_REGEX",
        message = "Slug can only contain lowercase letters, numbers, and hyphens"
    ))]
    pub slug: String,

    pub config: Option<JsonValue>,
    pub social_links: Option<JsonValue>,
    pub monetization_features: Option<JsonValue>,
}

/// Request to update an existing page
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePageRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 3, max = 100, message = "Slug must be 3-100 characters"))]
    #[validate(regex(
        path = "SLUG_REGEX",
        message = "Slug can only contain lowercase letters, numbers, and hyphens"
    ))]
    pub slug: Option<String>,

    pub status: Option<String>,
    pub config: Option<JsonValue>,
    pub social_links: Option<JsonValue>,
    pub monetization_features: Option<JsonValue>,
}

/// Page as returned by the API, with the computed accessibility flag
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PageResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub config: JsonValue,
    pub social_links: JsonValue,
    pub monetization_features: JsonValue,
    /// Whether this page falls inside the owner's plan quota
    pub accessible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PageResponse {
    pub fn from_page(page: Page, accessible: bool) -> Self {
        Self {
            id: page.id,
            title: page.title,
            slug: page.slug,
            status: page.status,
            config: page.config,
            social_links: page.social_links,
            monetization_features: page.monetization_features,
            accessible,
            created_at: page.created_at,
            updated_at: page.updated_at,
        }
    }
}

/// Public projection of a page served to the embed script
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicPageConfig {
    pub id: Uuid,
    pub title: String,
    pub config: JsonValue,
    pub social_links: JsonValue,
    pub monetization_features: JsonValue,
}

impl From<&Page> for PublicPageConfig {
    fn from(page: &Page) -> Self {
        Self {
            id: page.id,
            title: page.title.clone(),
            config: page.config.clone(),
            social_links: page.social_links.clone(),
            monetization_features: page.monetization_features.clone(),
        }
    }
}

// =============================================================================
// JSON BLOB CHECKS
// =============================================================================

/// Ad hoc field checks applied to the social_links blob at save time.
/// Expects an array of objects each carrying a `url` that parses.
pub fn validate_social_links(value: &JsonValue) -> Result<(), String> {
    let items = value
        .as_array()
        .ok_or_else(|| "social_links must be an array".to_string())?;

    for (i, item) in items.iter().enumerate() {
        let obj = item
            .as_object()
            .ok_or_else(|| format!("social_links[{}] must be an object", i))?;

        let url_str = obj
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| format!("social_links[{}] is missing a url", i))?;

        url::Url::parse(url_str).map_err(|_| format!("social_links[{}] has an invalid url", i))?;
    }

    Ok(())
}

/// Ad hoc field checks applied to the monetization_features blob at save time.
/// Expects an array of objects each carrying a known `type`; the rest of the
/// object is arbitrary widget configuration and is stored as-is.
pub fn validate_monetization_features(value: &JsonValue) -> Result<(), String> {
    let items = value
        .as_array()
        .ok_or_else(|| "monetization_features must be an array".to_string())?;

    for (i, item) in items.iter().enumerate() {
        let obj = item
            .as_object()
            .ok_or_else(|| format!("monetization_features[{}] must be an object", i))?;

        let feature_type = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| format!("monetization_features[{}] is missing a type", i))?;

        if !KNOWN_FEATURE_TYPES.contains(&feature_type) {
            return Err(format!(
                "monetization_features[{}] has unknown type '{}'",
                i, feature_type
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_status_conversion() {
        assert_eq!(PageStatus::Active.as_str(), "active");
        assert_eq!(PageStatus::Draft.as_str(), "draft");
        assert_eq!(PageStatus::Archived.as_str(), "archived");
        assert_eq!(PageStatus::Suspended.as_str(), "suspended");

        assert_eq!(PageStatus::from_string("active"), Ok(PageStatus::Active));
        assert!(PageStatus::from_string("deleted").is_err());
    }

    #[test]
    fn test_slug_validation() {
        let valid = CreatePageRequest {
            title: "My 404".to_string(),
            slug: "my-404-page".to_string(),
            config: None,
            social_links: None,
            monetization_features: None,
        };
        assert!(valid.validate().is_ok());

        let invalid = CreatePageRequest {
            title: "My 404".to_string(),
            slug: "Bad Slug!".to_string(),
            config: None,
            social_links: None,
            monetization_features: None,
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_social_links_checks() {
        assert!(validate_social_links(&json!([
            {"platform": "twitter", "url": "https://twitter.com/foo"}
        ]))
        .is_ok());

        assert!(validate_social_links(&json!({"url": "https://x.com"})).is_err());
        assert!(validate_social_links(&json!([{"platform": "twitter"}])).is_err());
        assert!(validate_social_links(&json!([{"url": "not a url"}])).is_err());
    }

    #[test]
    fn test_monetization_feature_checks() {
        assert!(validate_monetization_features(&json!([
            {"type": "email_capture", "heading": "Stay in touch"},
            {"type": "donation_button", "target": "https://pay.example.com"}
        ]))
        .is_ok());

        assert!(validate_monetization_features(&json!([{"type": "crypto_miner"}])).is_err());
        assert!(validate_monetization_features(&json!([{"heading": "no type"}])).is_err());
    }
}
