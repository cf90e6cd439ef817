use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::session::{Session, SessionUser};
use chrono::{Duration, Utc};
use uuid::Uuid;

#[async_trait::async_trait]
pub trait SessionRepository {
    /// Opens a login session lasting `ttl`, pruning the user's lapsed sessions in the same step.
    async fn open_session(&self, user_id: &Uuid, ttl: Duration) -> Result<Session, AppError>;
    /// Resolves a live session to its account. Lapsed sessions and inactive accounts yield `None`.
    async fn find_session_user(&self, session_id: &Uuid) -> Result<Option<SessionUser>, AppError>;
    /// Returns `true` when the session had lapsed and was removed.
    async fn purge_expired_session(&self, session_id: &Uuid) -> Result<bool, AppError>;
    async fn close_session(&self, session_id: &Uuid) -> Result<(), AppError>;
}

#[async_trait::async_trait]
impl SessionRepository for PostgresRepository {
    async fn open_session(&self, user_id: &Uuid, ttl: Duration) -> Result<Session, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_session WHERE user_id = $1 AND expires_at <= now()")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::db("Failed to prune lapsed login sessions", e))?;

        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO user_session (user_id, expires_at)
            VALUES ($1, $2)
            RETURNING id, user_id, created_at, expires_at
            "#,
        )
        .bind(user_id)
        .bind(Utc::now() + ttl)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::db("Failed to open login session", e))?;

        tx.commit().await?;

        Ok(session)
    }

    async fn find_session_user(&self, session_id: &Uuid) -> Result<Option<SessionUser>, AppError> {
        let user = sqlx::query_as::<_, SessionUser>(
            r#"
            SELECT u.id, u.username
            FROM user_session s
            JOIN users u ON u.id = s.user_id
            WHERE s.id = $1
              AND s.expires_at > now()
              AND u.is_active
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn purge_expired_session(&self, session_id: &Uuid) -> Result<bool, AppError> {
        let purged = sqlx::query("DELETE FROM user_session WHERE id = $1 AND expires_at <= now()")
            .bind(session_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(purged > 0)
    }

    async fn close_session(&self, session_id: &Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_session WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
