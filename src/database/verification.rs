use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::{AppError, is_unique_violation};
use crate::models::verification::VerificationToken;
use uuid::Uuid;

#[async_trait::async_trait]
pub trait VerificationTokenRepository {
    /// Stores a token for the account. Fails with `TokenAlreadyIssued` if one is outstanding.
    async fn create_verification_token(&self, user_id: &Uuid, token: &Uuid) -> Result<VerificationToken, AppError>;
    async fn get_verification_token(&self, token: &Uuid) -> Result<Option<VerificationToken>, AppError>;
    /// Activates the owner of `token` and deletes the token as one step.
    ///
    /// Returns `false` when the owner was already active, meaning another exchange won.
    async fn activate_user_with_token(&self, token: &VerificationToken) -> Result<bool, AppError>;
}

#[async_trait::async_trait]
impl VerificationTokenRepository for PostgresRepository {
    async fn create_verification_token(&self, user_id: &Uuid, token: &Uuid) -> Result<VerificationToken, AppError> {
        let token = sqlx::query_as::<_, VerificationToken>(
            r#"
            INSERT INTO verification_token (user_id, token)
            VALUES ($1, $2)
            RETURNING id, user_id, token, created_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::TokenAlreadyIssued
            } else {
                AppError::db("Failed to create verification token", e)
            }
        })?;

        Ok(token)
    }

    async fn get_verification_token(&self, token: &Uuid) -> Result<Option<VerificationToken>, AppError> {
        let token = sqlx::query_as::<_, VerificationToken>(
            r#"
            SELECT id, user_id, token, created_at
            FROM verification_token
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn activate_user_with_token(&self, token: &VerificationToken) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        // The row lock taken here serializes concurrent exchanges; the loser sees zero rows.
        let activated = sqlx::query(
            r#"
            UPDATE users
            SET is_active = TRUE
            WHERE id = $1
              AND is_active = FALSE
            "#,
        )
        .bind(token.user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::db("Failed to activate user", e))?
        .rows_affected()
            == 1;

        sqlx::query("DELETE FROM verification_token WHERE id = $1")
            .bind(token.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::db("Failed to delete verification token", e))?;

        tx.commit().await?;

        Ok(activated)
    }
}
