/// Delivery of one-time codes by email
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::otp::OtpPurpose;
use crate::config::EmailConfig;
use crate::error::{AppError, AppResult};
use crate::logging::mask_email;

#[async_trait::async_trait]
pub trait CodeMailer: Send + Sync {
    async fn send_code(&self, recipient: &str, purpose: OtpPurpose, code: &str) -> AppResult<()>;
}

/// Async email transport wrapper (SMTP or no-op)
#[derive(Clone)]
pub struct EmailService {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl EmailService {
    /// Build email service from configuration
    ///
    /// If SMTP host is empty, operates in no-op mode (logs only). Production
    /// deployments must configure a host.
    pub fn new(config: &EmailConfig, production: bool) -> AppResult<Self> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| AppError::Internal(format!("Invalid SMTP_FROM address: {}", e)))?;

        let transport = if config.smtp_host.trim().is_empty() {
            if production {
                return Err(AppError::Internal(
                    "SMTP_HOST is required in production".into(),
                ));
            }
            warn!("SMTP host not configured; codes will be logged instead of sent");
            None
        } else {
            let builder = if config.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            }
            .map_err(|e| AppError::Internal(format!("Failed to configure SMTP transport: {}", e)))?
            .port(config.smtp_port);

            let builder = if let (Some(username), Some(password)) =
                (&config.smtp_username, &config.smtp_password)
            {
                builder.credentials(Credentials::new(username.to_string(), password.to_string()))
            } else {
                builder
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    /// Check if SMTP transport is enabled
    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    fn compose(purpose: OtpPurpose, code: &str) -> (&'static str, String) {
        match purpose {
            OtpPurpose::Login => (
                "Your login code",
                format!("Your login code is {code}. It can be used once."),
            ),
            OtpPurpose::Reset => (
                "Reset your password",
                format!("Your password reset code is {code}. It can be used once."),
            ),
        }
    }
}

#[async_trait::async_trait]
impl CodeMailer for EmailService {
    async fn send_code(&self, recipient: &str, purpose: OtpPurpose, code: &str) -> AppResult<()> {
        let (subject, body) = Self::compose(purpose, code);

        if let Some(transport) = &self.transport {
            let to = recipient.parse::<Mailbox>().map_err(|e| {
                AppError::Validation(format!("Invalid recipient email address: {}", e))
            })?;

            let email = Message::builder()
                .from(self.from.clone())
                .to(to)
                .subject(subject)
                .header(header::ContentType::TEXT_PLAIN)
                .body(body)
                .map_err(|e| AppError::Internal(format!("Failed to build email message: {}", e)))?;

            transport
                .send(email)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;
            info!(subject, recipient = %mask_email(recipient), "email sent");
        } else {
            info!(
                subject,
                recipient = %mask_email(recipient),
                "email delivery disabled; message not sent"
            );
            debug!(recipient = %mask_email(recipient), code, "undelivered one-time code");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_host_disables_transport() {
        let service = EmailService::new(&EmailConfig::default(), false).unwrap();
        assert!(!service.is_enabled());
    }

    #[test]
    fn bad_sender_rejected() {
        let config = EmailConfig {
            smtp_from: "not an address".into(),
            ..EmailConfig::default()
        };
        assert!(EmailService::new(&config, false).is_err());
    }

    #[tokio::test]
    async fn no_op_mode_succeeds() {
        let service = EmailService::new(&EmailConfig::default(), false).unwrap();
        service
            .send_code("a@x.io", OtpPurpose::Login, "123456")
            .await
            .unwrap();
    }

    #[test]
    fn log_only_mode_refused_in_production() {
        assert!(matches!(
            EmailService::new(&EmailConfig::default(), true),
            Err(AppError::Internal(_))
        ));

        let config = EmailConfig {
            smtp_host: "smtp.example.com".into(),
            ..EmailConfig::default()
        };
        assert!(EmailService::new(&config, true).unwrap().is_enabled());
    }

    #[test]
    fn body_carries_code() {
        let (_, body) = EmailService::compose(OtpPurpose::Reset, "654321");
        assert!(body.contains("654321"));
    }
}
