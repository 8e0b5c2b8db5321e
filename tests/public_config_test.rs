// The embed endpoint serves a projection of the page, not the row itself.
// Whatever the dashboard stores, the public config must never leak the
// owner id, lifecycle status, or timestamps.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use m404_backend_core::models::page::{Page, PublicPageConfig};

fn sample_page() -> Page {
    Page {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        title: "Oops, that page moved".to_string(),
        slug: "main-404".to_string(),
        status: "active".to_string(),
        config: json!({"theme": "dark", "headline": "Lost?"}),
        social_links: json!([{"platform": "twitter", "url": "https://twitter.com/acme"}]),
        monetization_features: json!([{"type": "email_capture", "heading": "Stay posted"}]),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn projection_carries_widget_configuration() {
    let page = sample_page();
    let config = PublicPageConfig::from(&page);

    assert_eq!(config.id, page.id);
    assert_eq!(config.title, page.title);
    assert_eq!(config.config["theme"], "dark");
    assert_eq!(config.monetization_features[0]["type"], "email_capture");
}

#[test]
fn projection_does_not_leak_private_fields() {
    let page = sample_page();
    let serialized = serde_json::to_value(PublicPageConfig::from(&page)).unwrap();

    let obj = serialized.as_object().unwrap();
    assert!(!obj.contains_key("user_id"));
    assert!(!obj.contains_key("status"));
    assert!(!obj.contains_key("slug"));
    assert!(!obj.contains_key("created_at"));
    assert!(!obj.contains_key("updated_at"));
}
