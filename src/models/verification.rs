use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Single-use proof of email ownership. The row exists only while the token is unexchanged.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct VerificationToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful token exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The account was inactive and has just been activated.
    Verified,
    /// The account was already active; nothing changed.
    AlreadyVerified,
}

impl VerificationOutcome {
    pub fn title(&self) -> &'static str {
        match self {
            VerificationOutcome::Verified => "Account verified",
            VerificationOutcome::AlreadyVerified => "Account already verified",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            VerificationOutcome::Verified => "Thank you for confirming your email. Your account is now active and you can log in.",
            VerificationOutcome::AlreadyVerified => "Your account has already been verified. You can log in.",
        }
    }
}

/// The stored token and whether the activation email went out.
#[derive(Debug)]
pub struct IssuedVerification {
    pub token: VerificationToken,
    pub email_sent: bool,
}
