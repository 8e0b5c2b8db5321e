// Services module - business logic layer for the application

pub mod analytics;
pub mod background_tasks;
pub mod cache;
pub mod email;
pub mod jwt;
pub mod oauth;
pub mod payment;
pub mod plan;
pub mod rate_limit;

// Re-export commonly used services
pub use analytics::{AccountSummary, AnalyticsError, PageSummary, TrackedEvent};
pub use background_tasks::initialize_background_tasks;
pub use cache::SimpleCache;
pub use email::{EmailError, EmailService};
pub use jwt::{JwtConfig, JwtError, JwtService, TokenClaims, TokenMode};
pub use oauth::{OAuthError, OAuthVerifier, VerifiedIdentity};
pub use payment::{CheckoutOrder, PaymentError, PaymentService};
pub use rate_limit::{RateLimitConfig, RateLimitResult, RateLimitService};
