// Shared types for the email module

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Failed to send email: {0}")]
    SendError(String),

    #[error("Template rendering error: {0}")]
    TemplateError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Service unavailable")]
    ServiceUnavailable,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Generic email message, provider-agnostic
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
    pub reply_to: Option<String>,
}

impl EmailMessage {
    pub fn new(from: String, to: Vec<String>, subject: String, html: String) -> Self {
        Self {
            from,
            to,
            subject,
            html,
            text: None,
            reply_to: None,
        }
    }

    pub fn with_text(mut self, text: String) -> Self {
        self.text = Some(text);
        self
    }

    pub fn with_reply_to(mut self, reply_to: String) -> Self {
        self.reply_to = Some(reply_to);
        self
    }
}

/// Trait that all email builders implement
pub trait EmailBuilder {
    fn build(&self) -> Result<EmailMessage, EmailError>;
}

/// Template data for the welcome email
#[derive(Serialize)]
pub struct WelcomeEmailData {
    pub user_name: String,
    pub app_name: String,
    pub dashboard_url: String,
    pub support_email: String,
}

/// Template data for the getting-started follow-up email
#[derive(Serialize)]
pub struct FollowupEmailData {
    pub user_name: String,
    pub app_name: String,
    pub dashboard_url: String,
    pub support_email: String,
}

/// Template data for the contact-form notification sent to support
#[derive(Serialize)]
pub struct ContactNotificationData {
    pub sender_name: String,
    pub sender_email: String,
    pub subject: String,
    pub body: String,
    pub received_at: String,
    pub app_name: String,
}

/// Wire format for the HTTP email API.
/// Optional fields are omitted from the JSON payload when `None`.
#[derive(Debug, Serialize)]
pub struct ApiEmailPayload {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl From<EmailMessage> for ApiEmailPayload {
    fn from(message: EmailMessage) -> Self {
        Self {
            from: message.from,
            to: message.to,
            subject: message.subject,
            html: message.html,
            text: message.text,
            reply_to: message.reply_to,
        }
    }
}
