use crate::config::EmailConfig;
use crate::error::app_error::AppError;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// Outbound mail collaborator. The verification flow only needs recipient, subject and body.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    /// Returns `Ok(false)` when delivery is switched off and nothing left the process.
    async fn send_email(&self, to_email: &str, subject: &str, text_body: &str, html_body: &str) -> Result<bool, AppError>;
}

pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl Mailer for EmailService {
    async fn send_email(&self, to_email: &str, subject: &str, text_body: &str, html_body: &str) -> Result<bool, AppError> {
        if !self.config.enabled {
            tracing::warn!("Email service is disabled, skipping \"{}\" email to {}", subject, to_email);
            return Ok(false);
        }

        let email = Message::builder()
            .from(
                format!("{} <{}>", self.config.from_name, self.config.from_address)
                    .parse()
                    .map_err(|e| AppError::email(format!("Invalid from address: {}", e)))?,
            )
            .to(to_email.parse().map_err(|e| AppError::email(format!("Invalid to address: {}", e)))?)
            .subject(subject)
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::email(format!("Failed to build email: {}", e)))?;

        let creds = Credentials::new(self.config.smtp_username.clone(), self.config.smtp_password.clone());

        let mailer = SmtpTransport::relay(&self.config.smtp_host)
            .map_err(|e| AppError::email(format!("Failed to create SMTP transport: {}", e)))?
            .credentials(creds)
            .port(self.config.smtp_port)
            .build();

        // SmtpTransport blocks; keep it off the async workers.
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::email(format!("Failed to spawn email sending task: {}", e)))?;

        result.map_err(|e| AppError::email(format!("Failed to send email: {}", e)))?;

        tracing::info!("\"{}\" email sent successfully to {}", subject, to_email);
        Ok(true)
    }
}

pub const ACTIVATION_SUBJECT: &str = "Activate Your Account";

pub fn activation_link(base_url: &str, token: &uuid::Uuid) -> String {
    format!("{}/verify/{}/", base_url.trim_end_matches('/'), token)
}

pub fn activation_email_text(username: &str, link: &str) -> String {
    format!(
        "Hi {username},\n\n\
         Thank you for signing up for YogaSathi.\n\n\
         Please confirm your email address to activate your account:\n\n\
         {link}\n\n\
         If you did not create an account, you can ignore this email.\n"
    )
}

pub fn activation_email_html(username: &str, link: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{ACTIVATION_SUBJECT}</title>
</head>
<body style="font-family: Arial, sans-serif; color: #333333;">
    <h1>Welcome to YogaSathi</h1>
    <p>Hi {username},</p>
    <p>Thank you for signing up. Please confirm your email address to activate your account.</p>
    <p><a href="{link}" style="background-color: #4caf50; color: #ffffff; padding: 10px 20px; text-decoration: none;">Activate account</a></p>
    <p>Or copy this link into your browser:<br>{link}</p>
    <p>If you did not create an account, you can ignore this email.</p>
</body>
</html>
"#
    )
}
