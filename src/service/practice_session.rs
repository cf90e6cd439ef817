use crate::database::practice_session::PracticeSessionRepository;
use crate::error::app_error::AppError;
use crate::models::practice_session::{NewYogaSession, SessionSubmission, YogaSession};
use tracing::{debug, info};

pub struct SessionRecorder<'a, R> {
    repository: &'a R,
}

impl<'a, R: PracticeSessionRepository> SessionRecorder<'a, R> {
    pub fn new(repository: &'a R) -> Self {
        SessionRecorder { repository }
    }

    /// Validates a raw submission body and stores it as a new, immutable session row.
    pub async fn record(&self, body: &str) -> Result<YogaSession, AppError> {
        let new_session = parse_submission(body)?;
        let session = self.repository.create_practice_session(&new_session).await?;

        info!(
            session_id = %session.id,
            duration_seconds = session.duration_seconds,
            posture_quality = session.posture_quality_percentage(),
            "yoga session recorded"
        );

        Ok(session)
    }
}

pub(crate) fn parse_submission(body: &str) -> Result<NewYogaSession, AppError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        debug!(error = %e, "session submission is not valid JSON");
        AppError::InvalidPayload("Invalid JSON".to_string())
    })?;

    if !value.is_object() {
        return Err(AppError::InvalidPayload("Invalid JSON".to_string()));
    }

    let submission: SessionSubmission = serde_json::from_value(value).map_err(|e| {
        debug!(error = %e, "session submission has invalid field values");
        AppError::InvalidPayload("Invalid session data".to_string())
    })?;

    let duration = submission.duration.ok_or(AppError::MissingField("duration"))?;
    let total_frames = submission.total_frames.ok_or(AppError::MissingField("totalFrames"))?;
    let bad_frames = submission.bad_frames.ok_or(AppError::MissingField("badFrames"))?;

    if bad_frames > total_frames {
        return Err(AppError::InvalidPayload("badFrames cannot exceed totalFrames".to_string()));
    }

    Ok(NewYogaSession {
        duration_seconds: i64::from(duration),
        total_frames: i64::from(total_frames),
        bad_frames: i64::from(bad_frames),
    })
}
