// HTTP handlers, grouped per resource. Route builders return
// Router<AppState> so lib.rs can nest them under /api/v1 and layer the
// auth middleware where needed.

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod contact;
pub mod docs;
pub mod pages;
pub mod payments;
pub mod track;

use crate::app::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};

/// Authentication routes; /me and /validate need the auth layer
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/oauth", post(auth::oauth_login))
}

pub fn auth_protected_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(auth::get_current_user))
        .route("/validate", post(auth::validate_token))
}

/// Page CRUD, all authenticated
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(pages::create_page).get(pages::list_pages))
        .route("/{id}", get(pages::get_page))
        .route("/{id}", put(pages::update_page))
        .route("/{id}", delete(pages::delete_page))
}

/// Dashboard analytics, all authenticated
pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/summary", get(analytics::account_summary))
        .route("/pages/{id}", get(analytics::page_summary))
        .route("/pages/{id}/events", get(analytics::recent_events))
}

/// Checkout, all authenticated
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/order", post(payments::create_order))
        .route("/verify", post(payments::verify_payment))
        .route("/history", get(payments::payment_history))
}

/// Admin endpoints; the is_admin gate lives in the handlers
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/suspend", post(admin::suspend_user))
        .route("/users/{id}/activate", post(admin::activate_user))
        .route("/messages", get(admin::list_messages))
        .route("/stats", get(admin::platform_stats))
}

/// Public embed endpoints, mounted at /p with open CORS
pub fn embed_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}/config", get(track::get_public_config))
        .route("/{id}/track", post(track::track_event))
        .route("/{id}/collect", post(track::collect_email))
}

/// Public contact form
pub fn contact_routes() -> Router<AppState> {
    Router::new().route("/contact", post(contact::submit_contact))
}

/// Swagger UI + OpenAPI JSON, mounted only when enabled
pub fn docs_routes() -> Router<AppState> {
    Router::new()
        .route("/docs", get(docs::serve_swagger_ui))
        .route("/docs/openapi.json", get(docs::serve_openapi_spec))
}
