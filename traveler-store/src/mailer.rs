//! Email delivery for booking confirmations, reports and reminders.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;
use traveler_core::models::{Booking, Flight};
use traveler_core::notify::{self, EmailContent, Notifier};
use traveler_core::report::{ReportRow, ReportWindow};
use traveler_core::CoreResult;
use traveler_shared::Masked;

use crate::app_config::MailConfig;
use crate::error::StoreError;

fn compose(from_header: &str, to: &str, content: EmailContent) -> Result<Message, StoreError> {
    Message::builder()
        .from(
            from_header
                .parse()
                .map_err(|e| StoreError::Mail(format!("Invalid from address: {e}")))?,
        )
        .to(to
            .parse()
            .map_err(|e| StoreError::Mail(format!("Invalid to address: {e}")))?)
        .subject(content.subject)
        .header(ContentType::TEXT_PLAIN)
        .body(content.body)
        .map_err(|e| StoreError::Mail(format!("Failed to build email: {e}")))
}

/// SMTP mailer using Lettre.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
    from_header: String,
}

impl SmtpMailer {
    /// # Errors
    ///
    /// Returns error if the relay host cannot be resolved into a TLS transport.
    pub fn new(config: &MailConfig) -> Result<Self, StoreError> {
        let credentials = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());
        let transport = SmtpTransport::relay(&config.smtp_host)
            .map_err(|e| StoreError::Mail(format!("SMTP relay error: {e}")))?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_header: format!("{} <{}>", config.from_name, config.from_email),
        })
    }

    async fn deliver(&self, to: &str, content: EmailContent) -> Result<(), StoreError> {
        let email = compose(&self.from_header, to, content)?;
        let mailer = self.transport.clone();

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| StoreError::Mail(format!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| StoreError::Mail(format!("Email task failed: {e}")))??;

        info!(to = %Masked(to), "Email sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpMailer {
    async fn booking_confirmed(&self, booking: &Booking, flight: &Flight) -> CoreResult<()> {
        Ok(self
            .deliver(&booking.user_email, notify::booking_confirmation(booking, flight))
            .await?)
    }

    async fn report_ready(&self, recipient: &str, window: &ReportWindow, rows: &[ReportRow]) -> CoreResult<()> {
        Ok(self.deliver(recipient, notify::report_ready(window, rows)).await?)
    }

    async fn departure_reminder(&self, row: &ReportRow) -> CoreResult<()> {
        Ok(self.deliver(&row.user_email.0, notify::departure_reminder(row)).await?)
    }
}

/// Logs emails instead of sending them. Used when no SMTP relay is configured.
#[derive(Clone, Debug, Default)]
pub struct ConsoleMailer;

impl ConsoleMailer {
    pub const fn new() -> Self {
        Self
    }

    fn deliver(&self, to: &str, content: EmailContent) {
        info!(
            to = %Masked(to),
            subject = %content.subject,
            body_len = content.body.len(),
            "Email (console mode)"
        );
    }
}

#[async_trait]
impl Notifier for ConsoleMailer {
    async fn booking_confirmed(&self, booking: &Booking, flight: &Flight) -> CoreResult<()> {
        self.deliver(&booking.user_email, notify::booking_confirmation(booking, flight));
        Ok(())
    }

    async fn report_ready(&self, recipient: &str, window: &ReportWindow, rows: &[ReportRow]) -> CoreResult<()> {
        self.deliver(recipient, notify::report_ready(window, rows));
        Ok(())
    }

    async fn departure_reminder(&self, row: &ReportRow) -> CoreResult<()> {
        self.deliver(&row.user_email.0, notify::departure_reminder(row));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FROM: &str = "Traveler <noreply@example.com>";

    fn content() -> EmailContent {
        EmailContent {
            subject: "Hello".to_string(),
            body: "Body".to_string(),
        }
    }

    #[test]
    fn test_compose_valid_message() {
        let message = compose(FROM, "traveler@example.com", content()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("noreply@example.com"));
        assert!(raw.contains("traveler@example.com"));
    }

    #[test]
    fn test_compose_rejects_bad_addresses() {
        assert!(matches!(
            compose(FROM, "not-an-address", content()),
            Err(StoreError::Mail(_))
        ));
        assert!(matches!(
            compose("nobody", "traveler@example.com", content()),
            Err(StoreError::Mail(_))
        ));
    }

    #[tokio::test]
    async fn test_console_mailer_never_fails() {
        let window = ReportWindow {
            start: chrono::NaiveDate::from_ymd_opt(2019, 6, 1).unwrap(),
            end: chrono::NaiveDate::from_ymd_opt(2019, 6, 30).unwrap(),
        };
        assert!(ConsoleMailer::new().report_ready("admin@example.com", &window, &[]).await.is_ok());
    }
}
