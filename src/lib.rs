// Library exports for the 404 Monetizer backend

pub mod app;
pub mod app_config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

pub use app::AppState;
pub use app_config::{AppConfig, CONFIG};
pub use db::DieselPool;
pub use middleware::{auth_middleware, AuthenticatedUser};
pub use services::{
    AnalyticsError, EmailService, JwtConfig, JwtError, JwtService, OAuthVerifier, PaymentService,
    RateLimitConfig, RateLimitResult, RateLimitService, SimpleCache,
};
pub use utils::ServiceError;

use std::sync::Arc;
use tracing::info;

/// Wire up every service and return the shared state. Callers still need
/// to start the background tasks and build the router.
pub async fn initialize_app_state() -> Result<AppState, Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = app_config::config();

    info!("Initializing database pool...");
    let db_config = db::DieselDatabaseConfig::default();
    let diesel_pool = db::create_diesel_pool(db_config).await?;

    if migrations::should_run_migrations() {
        info!("Running embedded migrations...");
        let migration_config = migrations::MigrationConfig::default();
        migrations::run_all_migrations(&diesel_pool, migration_config)
            .await
            .map_err(|e| format!("Migration failed: {}", e))?;
    }

    let jwt_service = Arc::new(JwtService::from_env());
    let rate_limit_service = Arc::new(RateLimitService::from_config());
    let email_service = Arc::new(EmailService::new(config.email.clone())?);
    let oauth_verifier = Arc::new(OAuthVerifier::from_config());
    let payment_service = Arc::new(PaymentService::from_config());
    let bot_score_client = Arc::new(utils::BotScoreClient::from_config());

    let page_cache = Arc::new(SimpleCache::from_config());
    let summary_cache = Arc::new(SimpleCache::from_config());

    Ok(AppState {
        diesel_pool,
        jwt_service,
        rate_limit_service,
        email_service,
        oauth_verifier,
        payment_service,
        page_cache,
        summary_cache,
        bot_score_client,
    })
}

/// Assemble the full router: authenticated API under /api/v1, public
/// embed endpoints under /p with open CORS, docs when enabled.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{middleware::from_fn_with_state, routing::get, Router};

    let config = app_config::config();

    let protected = Router::new()
        .nest("/auth", handlers::auth_protected_routes())
        .nest("/pages", handlers::page_routes())
        .nest("/analytics", handlers::analytics_routes())
        .nest("/payments", handlers::payment_routes())
        .nest("/admin", handlers::admin_routes())
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let mut api = Router::new()
        .route("/health", get(health_check))
        .nest("/auth", handlers::auth_routes())
        .merge(handlers::contact_routes())
        .merge(protected);

    if config.enable_swagger_ui {
        api = api.merge(handlers::docs_routes());
    }

    let api = api.layer(axum::middleware::from_fn(
        middleware::dynamic_cors_middleware,
    ));

    let embed = handlers::embed_routes().layer(middleware::public_cors_layer());

    Router::new()
        .nest("/api/v1", api)
        .nest("/p", embed)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /api/v1/health - component health report, 503 when degraded
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    use axum::http::StatusCode;
    use axum::Json;

    let mut overall_healthy = true;
    let timestamp = chrono::Utc::now().to_rfc3339();

    let postgres_health = match db::check_diesel_health(&state.diesel_pool).await {
        Ok(_) => serde_json::json!({
            "status": "healthy",
            "error": null
        }),
        Err(e) => {
            overall_healthy = false;
            serde_json::json!({
                "status": "unhealthy",
                "error": format!("Database connection failed: {}", e)
            })
        },
    };

    let response = serde_json::json!({
        "status": if overall_healthy { "healthy" } else { "degraded" },
        "service": "m404-backend",
        "timestamp": timestamp,
        "components": {
            "postgresql": postgres_health,
            "page_cache": serde_json::json!({
                "status": "healthy",
                "entries": state.page_cache.len()
            })
        }
    });

    if overall_healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
