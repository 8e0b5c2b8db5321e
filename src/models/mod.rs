pub mod analytics;
pub mod contact;
pub mod email_log;
pub mod page;
pub mod payment;
pub mod user;

// Re-export common types
pub use analytics::{AnalyticsEvent, EventType, NewAnalyticsEvent, NewPageAnalytics, PageAnalytics};
pub use contact::{CollectedEmail, ContactMessage, NewCollectedEmail, NewContactMessage};
pub use email_log::{EmailKind, EmailLogEntry, NewEmailLogEntry};
pub use page::{
    CreatePageRequest, NewPage, Page, PageResponse, PageStatus, PublicPageConfig, UpdatePage,
    UpdatePageRequest,
};
pub use payment::{NewPayment, Payment, PaymentStatus};
pub use user::{NewUser, Plan, User, UserError, UserUpdate};
