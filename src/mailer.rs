use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::Config;
use crate::error::{AppError, Result};

/// Outgoing-mail collaborator.
///
/// Without an SMTP relay configured the mailer runs in log-only mode:
/// sends report `false` so callers can degrade (registration proceeds,
/// password reset responds with `mail_sent: false`).
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl Mailer {
    pub fn new(config: &Config) -> Result<Self> {
        let from: Mailbox = config
            .mail_from
            .parse()
            .map_err(|e| AppError::Mail(format!("Invalid MAIL_FROM: {}", e)))?;

        let transport = match &config.smtp_host {
            Some(host) => {
                let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                    .map_err(|e| AppError::Mail(format!("SMTP relay setup failed: {}", e)))?;

                if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
                    builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
                }

                tracing::info!("✅ SMTP transport configured for {}", host);
                Some(builder.build())
            }
            None => {
                tracing::warn!("⚠️ SMTP_HOST not set - outgoing mail will only be logged");
                None
            }
        };

        Ok(Self { transport, from })
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> Result<bool> {
        let Some(transport) = &self.transport else {
            tracing::info!("📧 [log-only] To: {} / Subject: {}", to, subject);
            return Ok(false);
        };

        let to: Mailbox = to
            .parse()
            .map_err(|e| AppError::Mail(format!("Invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body)
            .map_err(|e| AppError::Mail(format!("Message build failed: {}", e)))?;

        transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(format!("SMTP send failed: {}", e)))?;

        Ok(true)
    }

    /// Sends the six-digit verification code.
    pub async fn send_verification_email(&self, to: &str, code: &str) -> Result<bool> {
        self.send(
            to,
            "Verify your PrintHub account",
            format!(
                "Welcome to PrintHub!\n\nYour verification code is: {}\n\n\
                 Enter it on the verification page to activate your account.\n",
                code
            ),
        )
        .await
    }

    /// Sends the temporary password issued by account recovery.
    pub async fn send_temp_password_email(&self, to: &str, temp_password: &str) -> Result<bool> {
        self.send(
            to,
            "Your PrintHub temporary password",
            format!(
                "A password reset was requested for your account.\n\n\
                 Temporary password: {}\n\n\
                 Sign in with it and change your password immediately.\n",
                temp_password
            ),
        )
        .await
    }
}
