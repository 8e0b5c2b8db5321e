// Builders for each transactional email kind

use super::types::{
    ContactNotificationData, EmailBuilder, EmailError, EmailMessage, FollowupEmailData,
    WelcomeEmailData,
};
use crate::app_config::EmailConfig;
use handlebars::Handlebars;
use tracing::instrument;

/// Welcome email sent right after signup
pub struct WelcomeEmailBuilder<'a> {
    to_email: &'a str,
    user_name: &'a str,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> WelcomeEmailBuilder<'a> {
    pub fn new(
        to_email: &'a str,
        user_name: &'a str,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            to_email,
            user_name,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for WelcomeEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let data = WelcomeEmailData {
            user_name: self.user_name.to_string(),
            app_name: self.config.from_name.clone(),
            dashboard_url: self.config.dashboard_url.clone(),
            support_email: self.config.support_email.clone(),
        };

        let html = self
            .templates
            .render("welcome", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "Welcome to {}, {}!\n\n\
            Your account is ready. Create your first 404 page and start turning \
            dead links into revenue:\n\
            {}\n\n\
            If you have any questions, contact us at {}.\n\n\
            Best regards,\n\
            The {} Team",
            self.config.from_name,
            self.user_name,
            self.config.dashboard_url,
            self.config.support_email,
            self.config.from_name
        );

        Ok(EmailMessage::new(
            format!("{} <{}>", self.config.from_name, self.config.from_email),
            vec![self.to_email.to_string()],
            format!("Welcome to {}!", self.config.from_name),
            html,
        )
        .with_text(text))
    }
}

/// Getting-started follow-up, sent a few days after signup
pub struct FollowupEmailBuilder<'a> {
    to_email: &'a str,
    user_name: &'a str,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> FollowupEmailBuilder<'a> {
    pub fn new(
        to_email: &'a str,
        user_name: &'a str,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            to_email,
            user_name,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for FollowupEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let data = FollowupEmailData {
            user_name: self.user_name.to_string(),
            app_name: self.config.from_name.clone(),
            dashboard_url: self.config.dashboard_url.clone(),
            support_email: self.config.support_email.clone(),
        };

        let html = self
            .templates
            .render("followup", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "Hi {},\n\n\
            How is your 404 page doing? A few ideas to get more out of it:\n\n\
            - Add an email capture widget to grow your list\n\
            - Enable affiliate links that match your audience\n\
            - Check your analytics dashboard to see what converts\n\n\
            Your dashboard: {}\n\n\
            Questions? Reply to this email or reach us at {}.\n\n\
            Best regards,\n\
            The {} Team",
            self.user_name,
            self.config.dashboard_url,
            self.config.support_email,
            self.config.from_name
        );

        Ok(EmailMessage::new(
            format!("{} <{}>", self.config.from_name, self.config.from_email),
            vec![self.to_email.to_string()],
            format!("Getting the most out of {}", self.config.from_name),
            html,
        )
        .with_text(text)
        .with_reply_to(self.config.support_email.clone()))
    }
}

/// Notification to the support inbox when someone submits the contact form
pub struct ContactNotificationBuilder<'a> {
    sender_name: &'a str,
    sender_email: &'a str,
    subject: &'a str,
    body: &'a str,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> ContactNotificationBuilder<'a> {
    pub fn new(
        sender_name: &'a str,
        sender_email: &'a str,
        subject: &'a str,
        body: &'a str,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            sender_name,
            sender_email,
            subject,
            body,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for ContactNotificationBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let data = ContactNotificationData {
            sender_name: self.sender_name.to_string(),
            sender_email: self.sender_email.to_string(),
            subject: self.subject.to_string(),
            body: self.body.to_string(),
            received_at: chrono::Utc::now()
                .format("%B %d, %Y at %H:%M UTC")
                .to_string(),
            app_name: self.config.from_name.clone(),
        };

        let html = self
            .templates
            .render("contact_notification", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "New contact form submission\n\n\
            From: {} <{}>\n\
            Received: {}\n\
            Subject: {}\n\n\
            {}",
            self.sender_name, self.sender_email, data.received_at, self.subject, self.body
        );

        // Reply-to points at the person who wrote in so support can answer
        // directly from their inbox.
        Ok(EmailMessage::new(
            format!("{} <{}>", self.config.from_name, self.config.from_email),
            vec![self.config.support_email.clone()],
            format!("[Contact] {}", self.subject),
            html,
        )
        .with_text(text)
        .with_reply_to(self.sender_email.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_config() -> EmailConfig {
        EmailConfig {
            api_key: "test_key".to_string(),
            api_url: "https://api.resend.com/emails".to_string(),
            from_email: "noreply@example.com".to_string(),
            from_name: "Test App".to_string(),
            support_email: "support@example.com".to_string(),
            dashboard_url: "https://dashboard.example.com".to_string(),
            followup_delay_days: 3,
        }
    }

    fn setup_test_templates() -> Handlebars<'static> {
        let mut templates = Handlebars::new();
        templates
            .register_template_string("welcome", "Welcome {{user_name}}!")
            .unwrap();
        templates
            .register_template_string("followup", "Hi {{user_name}}, visit {{dashboard_url}}")
            .unwrap();
        templates
            .register_template_string(
                "contact_notification",
                "From {{sender_name}}: {{body}}",
            )
            .unwrap();
        templates
    }

    #[test]
    fn test_welcome_email_builder() {
        let config = setup_test_config();
        let templates = setup_test_templates();
        let builder = WelcomeEmailBuilder::new("user@example.com", "John Doe", &config, &templates);

        let message = builder.build().unwrap();
        assert_eq!(message.to, vec!["user@example.com"]);
        assert_eq!(message.subject, "Welcome to Test App!");
        assert!(message.text.is_some());
    }

    #[test]
    fn test_followup_email_builder() {
        let config = setup_test_config();
        let templates = setup_test_templates();
        let builder =
            FollowupEmailBuilder::new("user@example.com", "John Doe", &config, &templates);

        let message = builder.build().unwrap();
        assert_eq!(message.to, vec!["user@example.com"]);
        assert_eq!(message.subject, "Getting the most out of Test App");
        assert_eq!(message.reply_to, Some("support@example.com".to_string()));
    }

    #[test]
    fn test_contact_notification_goes_to_support() {
        let config = setup_test_config();
        let templates = setup_test_templates();
        let builder = ContactNotificationBuilder::new(
            "Jane Visitor",
            "jane@example.com",
            "Billing question",
            "How do I cancel?",
            &config,
            &templates,
        );

        let message = builder.build().unwrap();
        assert_eq!(message.to, vec!["support@example.com"]);
        assert_eq!(message.subject, "[Contact] Billing question");
        assert_eq!(message.reply_to, Some("jane@example.com".to_string()));
        assert!(message.text.unwrap().contains("How do I cancel?"));
    }
}
