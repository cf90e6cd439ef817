use crate::database::user::{UserRepository, dummy_verify, verify_password};
use crate::database::verification::VerificationTokenRepository;
use crate::error::app_error::AppError;
use crate::models::user::{SignupRequest, User};
use crate::models::verification::IssuedVerification;
use crate::service::email::Mailer;
use crate::service::verification::VerificationService;
use tracing::{info, warn};
use validator::Validate;

pub struct AuthService<'a, R, M> {
    repository: &'a R,
    verification: VerificationService<'a, R, M>,
}

impl<'a, R, M> AuthService<'a, R, M>
where
    R: UserRepository + VerificationTokenRepository,
    M: Mailer,
{
    pub fn new(repository: &'a R, mailer: &'a M, base_url: &'a str) -> Self {
        AuthService {
            repository,
            verification: VerificationService::new(repository, mailer, base_url),
        }
    }

    /// Creates an inactive account and issues its activation token.
    ///
    /// If no token can be stored the account is removed again so the same signup can be retried.
    pub async fn signup(&self, request: &SignupRequest) -> Result<(User, IssuedVerification), AppError> {
        request.validate()?;

        if self.repository.get_user_by_username(&request.username).await?.is_some() {
            return Err(AppError::UserAlreadyExists(request.username.clone()));
        }
        if self.repository.get_user_by_email(&request.email).await?.is_some() {
            return Err(AppError::UserAlreadyExists(request.email.clone()));
        }

        let user = self.repository.create_user(&request.username, &request.email, &request.password).await?;
        info!(user_id = %user.id, "account created, awaiting verification");

        match self.verification.issue(&user).await {
            Ok(issued) => Ok((user, issued)),
            Err(err) => {
                warn!(user_id = %user.id, error = ?err, "could not issue activation token, removing account");
                self.repository.delete_unverified_user(&user.id).await?;
                Err(err)
            }
        }
    }

    /// Checks credentials, then refuses accounts that have not been verified.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError> {
        let Some(user) = self.repository.get_user_by_username(username).await? else {
            dummy_verify(password);
            return Err(AppError::InvalidCredentials);
        };

        verify_password(&user, password)?;

        if !user.is_active {
            return Err(AppError::AccountNotVerified);
        }

        Ok(user)
    }
}
