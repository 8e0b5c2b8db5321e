// Email service: template registration, per-kind send methods and the
// idempotency bookkeeping that keeps transactional mails one-per-user.

pub mod builders;
pub mod sender;
pub mod types;

use self::types::EmailBuilder;
use crate::app_config::EmailConfig;
use crate::models::email_log::{EmailKind, EmailLogEntry};
use crate::models::user::User;
use anyhow::Result;
use builders::{ContactNotificationBuilder, FollowupEmailBuilder, WelcomeEmailBuilder};
use diesel_async::AsyncPgConnection;
use handlebars::Handlebars;
use sender::EmailSender;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct EmailService {
    sender: EmailSender,
    config: EmailConfig,
    templates: Arc<Handlebars<'static>>,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Result<Self> {
        let mut templates = Handlebars::new();
        Self::register_templates(&mut templates)?;

        let sender = EmailSender::new(config.api_key.clone(), config.api_url.clone())
            .with_max_retries(3)
            .with_retry_delay(std::time::Duration::from_secs(1));

        Ok(Self {
            sender,
            config,
            templates: Arc::new(templates),
        })
    }

    fn register_templates(templates: &mut Handlebars) -> Result<(), types::EmailError> {
        let welcome_template = include_str!("../../templates/email/welcome.html");
        templates
            .register_template_string("welcome", welcome_template)
            .map_err(|e| types::EmailError::TemplateError(e.to_string()))?;

        let followup_template = include_str!("../../templates/email/followup.html");
        templates
            .register_template_string("followup", followup_template)
            .map_err(|e| types::EmailError::TemplateError(e.to_string()))?;

        let contact_template = include_str!("../../templates/email/contact_notification.html");
        templates
            .register_template_string("contact_notification", contact_template)
            .map_err(|e| types::EmailError::TemplateError(e.to_string()))?;

        Ok(())
    }

    /// Send the welcome mail once per user. The email_log row is claimed
    /// before sending; a concurrent claim losing the insert means another
    /// worker is already on it. A failed build or delivery releases the
    /// claim again, so the next pass over the user retries the mail.
    ///
    /// Delivery failures are logged and swallowed - signup must never fail
    /// because the mail provider is down.
    #[instrument(skip(self, conn, user), fields(user_id = %user.id))]
    pub async fn send_welcome_email(&self, conn: &mut AsyncPgConnection, user: &User) {
        self.send_once(conn, user, EmailKind::Welcome).await;
    }

    /// Send the getting-started follow-up once per user.
    #[instrument(skip(self, conn, user), fields(user_id = %user.id))]
    pub async fn send_followup_email(&self, conn: &mut AsyncPgConnection, user: &User) {
        self.send_once(conn, user, EmailKind::Followup).await;
    }

    async fn send_once(&self, conn: &mut AsyncPgConnection, user: &User, kind: EmailKind) {
        let claimed = match EmailLogEntry::record_sent(conn, user.id, kind).await {
            Ok(claimed) => claimed,
            Err(e) => {
                warn!(kind = kind.as_str(), "email log insert failed: {}", e);
                return;
            },
        };

        if !claimed {
            return;
        }

        let message = match kind {
            EmailKind::Welcome => WelcomeEmailBuilder::new(
                &user.email,
                &user.full_name,
                &self.config,
                &self.templates,
            )
            .build(),
            EmailKind::Followup => FollowupEmailBuilder::new(
                &user.email,
                &user.full_name,
                &self.config,
                &self.templates,
            )
            .build(),
        };

        match message {
            Ok(message) => match self.sender.send_with_retry(message).await {
                Ok(()) => info!(kind = kind.as_str(), "transactional email sent"),
                Err(e) => {
                    warn!(kind = kind.as_str(), "email delivery failed: {}", e);
                    self.release_claim(conn, user.id, kind).await;
                },
            },
            Err(e) => {
                warn!(kind = kind.as_str(), "email build failed: {}", e);
                self.release_claim(conn, user.id, kind).await;
            },
        }
    }

    /// Undo a claim after a failed send. If the delete itself fails the
    /// claim row stays and the mail is lost; that is logged loudly.
    async fn release_claim(&self, conn: &mut AsyncPgConnection, user_id: Uuid, kind: EmailKind) {
        if let Err(e) = EmailLogEntry::release(conn, user_id, kind).await {
            warn!(
                kind = kind.as_str(),
                %user_id,
                "failed to release email claim, mail will not be retried: {}",
                e
            );
        }
    }

    /// Forward a contact-form submission to the support inbox. Failures are
    /// logged and swallowed; the message row is already persisted.
    #[instrument(skip(self, body))]
    pub async fn send_contact_notification(
        &self,
        sender_name: &str,
        sender_email: &str,
        subject: &str,
        body: &str,
    ) {
        let builder = ContactNotificationBuilder::new(
            sender_name,
            sender_email,
            subject,
            body,
            &self.config,
            &self.templates,
        );

        match builder.build() {
            Ok(message) => {
                if let Err(e) = self.sender.send_with_retry(message).await {
                    warn!("contact notification delivery failed: {}", e);
                }
            },
            Err(e) => warn!("contact notification build failed: {}", e),
        }
    }

    pub async fn health_check(&self) -> Result<(), EmailError> {
        self.sender.health_check().await
    }
}

pub use types::{EmailError, EmailMessage};

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> EmailConfig {
        EmailConfig {
            api_key: "test_key".to_string(),
            api_url: "https://api.resend.com/emails".to_string(),
            from_email: "noreply@test.com".to_string(),
            from_name: "Test App".to_string(),
            support_email: "support@test.com".to_string(),
            dashboard_url: "https://dashboard.test.com".to_string(),
            followup_delay_days: 3,
        }
    }

    #[test]
    fn test_email_service_creation() {
        let config = create_test_config();
        let service = EmailService::new(config);
        assert!(service.is_ok());
    }
}
