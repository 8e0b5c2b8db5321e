// Application state and configuration
use std::sync::Arc;

use crate::{
    db::DieselPool,
    models::page::PublicPageConfig,
    services::{
        cache::SimpleCache, EmailService, JwtService, OAuthVerifier, PaymentService,
        RateLimitService,
    },
    utils::bot_score::BotScoreClient,
};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub diesel_pool: DieselPool,
    pub jwt_service: Arc<JwtService>,
    pub rate_limit_service: Arc<RateLimitService>,
    pub email_service: Arc<EmailService>,
    pub oauth_verifier: Arc<OAuthVerifier>,
    pub payment_service: Arc<PaymentService>,
    /// Cached embed configs keyed by page id
    pub page_cache: Arc<SimpleCache<PublicPageConfig>>,
    /// Cached dashboard summaries keyed by "summary:{scope}:{id}:{days}"
    pub summary_cache: Arc<SimpleCache<serde_json::Value>>,
    pub bot_score_client: Arc<BotScoreClient>,
}
