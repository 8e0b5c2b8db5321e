// API documentation: utoipa-derived OpenAPI spec plus an embedded
// Swagger UI page, both mounted only when ENABLE_SWAGGER_UI is set.

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "404 Monetizer API",
        description = "Backend API for customizable, monetized 404 landing pages",
        version = "0.1.0",
    ),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::oauth_login,
        handlers::auth::get_current_user,
        handlers::auth::validate_token,
        handlers::pages::create_page,
        handlers::pages::list_pages,
        handlers::pages::get_page,
        handlers::pages::update_page,
        handlers::pages::delete_page,
        handlers::track::get_public_config,
        handlers::track::track_event,
        handlers::track::collect_email,
        handlers::analytics::page_summary,
        handlers::analytics::account_summary,
        handlers::analytics::recent_events,
        handlers::payments::create_order,
        handlers::payments::verify_payment,
        handlers::payments::payment_history,
        handlers::contact::submit_contact,
        handlers::admin::list_users,
        handlers::admin::suspend_user,
        handlers::admin::activate_user,
        handlers::admin::delete_user,
        handlers::admin::list_messages,
        handlers::admin::platform_stats,
    ),
    components(schemas(
        handlers::auth::RegisterRequest,
        handlers::auth::LoginRequest,
        handlers::auth::OAuthLoginRequest,
        handlers::auth::UserInfo,
        handlers::auth::SessionResponse,
        handlers::auth::TokenStatus,
        handlers::payments::VerifyPaymentRequest,
        handlers::payments::VerifyPaymentResponse,
        handlers::payments::PaymentHistoryEntry,
        handlers::contact::ContactRequest,
        handlers::track::TrackEventRequest,
        handlers::track::CollectEmailRequest,
        handlers::admin::AdminUserEntry,
        handlers::admin::PlatformStats,
        crate::models::page::CreatePageRequest,
        crate::models::page::UpdatePageRequest,
        crate::models::page::PageResponse,
        crate::models::page::PublicPageConfig,
        crate::models::analytics::AnalyticsEvent,
        crate::models::contact::ContactMessage,
        crate::services::analytics::PageSummary,
        crate::services::analytics::DaySummary,
        crate::services::analytics::AccountSummary,
        crate::services::payment::CheckoutOrder,
        crate::services::jwt::TokenMode,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and token introspection"),
        (name = "pages", description = "404 page management"),
        (name = "embed", description = "Public widget endpoints"),
        (name = "analytics", description = "Dashboard analytics"),
        (name = "payments", description = "Pro plan checkout"),
        (name = "contact", description = "Contact form"),
        (name = "admin", description = "Administration"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serve the OpenAPI JSON at /api/v1/docs/openapi.json
pub async fn serve_openapi_spec() -> Response {
    match ApiDoc::openapi().to_json() {
        Ok(spec) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            spec,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to serialize OpenAPI spec: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

/// Serve the Swagger UI shell at /api/v1/docs
pub async fn serve_swagger_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>404 Monetizer API Documentation</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui.css" />
    <style>
        body {
            margin: 0;
            padding: 0;
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
        }
        #swagger-ui {
            max-width: 1460px;
            margin: 0 auto;
            padding: 20px;
        }
        .topbar {
            display: none;
        }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api/v1/docs/openapi.json",
                dom_id: "#swagger-ui",
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "BaseLayout",
                tryItOutEnabled: true,
                persistAuthorization: true
            });
        };
    </script>
</body>
</html>"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_serializes() {
        let spec = ApiDoc::openapi();
        let json = spec.to_json().expect("spec should serialize");
        assert!(json.contains("/api/v1/auth/login"));
        assert!(json.contains("/p/{id}/track"));
    }
}
