use crate::database::user::UserRepository;
use crate::database::verification::VerificationTokenRepository;
use crate::error::app_error::AppError;
use crate::models::user::User;
use crate::models::verification::{IssuedVerification, VerificationOutcome};
use crate::service::email::{ACTIVATION_SUBJECT, Mailer, activation_email_html, activation_email_text, activation_link};
use tracing::{info, warn};
use uuid::Uuid;

/// Issues activation tokens for new accounts and exchanges them for activation.
pub struct VerificationService<'a, R, M> {
    repository: &'a R,
    mailer: &'a M,
    base_url: &'a str,
}

impl<'a, R, M> VerificationService<'a, R, M>
where
    R: UserRepository + VerificationTokenRepository,
    M: Mailer,
{
    pub fn new(repository: &'a R, mailer: &'a M, base_url: &'a str) -> Self {
        VerificationService { repository, mailer, base_url }
    }

    /// Stores a fresh token for an inactive account and emails the activation link.
    ///
    /// A failed or disabled send keeps the account and token; it is reported through `email_sent`.
    pub async fn issue(&self, user: &User) -> Result<IssuedVerification, AppError> {
        if user.is_active {
            return Err(AppError::BadRequest("Account is already active".to_string()));
        }

        let token = self.repository.create_verification_token(&user.id, &Uuid::new_v4()).await?;

        let link = activation_link(self.base_url, &token.token);
        let text_body = activation_email_text(&user.username, &link);
        let html_body = activation_email_html(&user.username, &link);

        let email_sent = match self.mailer.send_email(&user.email, ACTIVATION_SUBJECT, &text_body, &html_body).await {
            Ok(sent) => sent,
            Err(e) => {
                warn!(user_id = %user.id, error = ?e, "failed to send activation email");
                false
            }
        };

        Ok(IssuedVerification { token, email_sent })
    }

    /// Exchanges a token taken from the verification link for account activation.
    pub async fn exchange(&self, raw_token: &str) -> Result<VerificationOutcome, AppError> {
        let value = Uuid::try_parse(raw_token.trim())?;

        let token = self
            .repository
            .get_verification_token(&value)
            .await?
            .ok_or(AppError::InvalidOrExpiredToken)?;

        let user = self
            .repository
            .get_user_by_id(&token.user_id)
            .await?
            .ok_or(AppError::InvalidOrExpiredToken)?;

        if user.is_active {
            info!(user_id = %user.id, "verification link reused for an active account");
            return Ok(VerificationOutcome::AlreadyVerified);
        }

        if self.repository.activate_user_with_token(&token).await? {
            info!(user_id = %user.id, "account verified");
            Ok(VerificationOutcome::Verified)
        } else {
            info!(user_id = %user.id, "account was activated by a concurrent verification");
            Ok(VerificationOutcome::AlreadyVerified)
        }
    }
}
