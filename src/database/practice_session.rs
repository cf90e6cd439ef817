use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::practice_session::{NewYogaSession, YogaSession};

#[async_trait::async_trait]
pub trait PracticeSessionRepository {
    async fn create_practice_session(&self, session: &NewYogaSession) -> Result<YogaSession, AppError>;
}

#[async_trait::async_trait]
impl PracticeSessionRepository for PostgresRepository {
    async fn create_practice_session(&self, session: &NewYogaSession) -> Result<YogaSession, AppError> {
        let session = sqlx::query_as::<_, YogaSession>(
            r#"
            INSERT INTO yoga_session (duration_seconds, total_frames, bad_frames, start_time)
            VALUES ($1, $2, $3, now())
            RETURNING id, duration_seconds, total_frames, bad_frames, start_time
            "#,
        )
        .bind(session.duration_seconds)
        .bind(session.total_frames)
        .bind(session.bad_frames)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::db("Failed to create yoga session", e))?;

        Ok(session)
    }
}
