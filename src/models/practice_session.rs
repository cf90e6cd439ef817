use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use serde::de::{Deserializer, Error as _};
use uuid::Uuid;

/// One persisted summary of a practice session. Rows are immutable once written.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct YogaSession {
    pub id: Uuid,
    pub duration_seconds: i64,
    pub total_frames: i64,
    pub bad_frames: i64,
    pub start_time: DateTime<Utc>,
}

impl YogaSession {
    pub fn posture_quality_percentage(&self) -> f64 {
        posture_quality_percentage(self.total_frames, self.bad_frames)
    }
}

/// Share of good frames, rounded to two decimals. Zero when no frames were captured.
pub fn posture_quality_percentage(total_frames: i64, bad_frames: i64) -> f64 {
    if total_frames == 0 {
        return 0.0;
    }
    let good_frames = (total_frames - bad_frames) as f64;
    let percentage = good_frames / total_frames as f64 * 100.0;
    (percentage * 100.0).round() / 100.0
}

/// Raw submission from the practice page. Every field is optional here so that an absent
/// field can be told apart from a malformed body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSubmission {
    #[serde(default, deserialize_with = "whole_count")]
    pub duration: Option<u32>,
    #[serde(default, deserialize_with = "whole_count")]
    pub total_frames: Option<u32>,
    #[serde(default, deserialize_with = "whole_count")]
    pub bad_frames: Option<u32>,
}

/// Accepts any non-negative JSON number without a fractional part, so `120` and `120.0` agree.
fn whole_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };

    number
        .as_u64()
        .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
        .and_then(|n| u32::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("expected a whole non-negative count, got {number}")))
}

/// Validated values ready to be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewYogaSession {
    pub duration_seconds: i64,
    pub total_frames: i64,
    pub bad_frames: i64,
}

#[derive(Debug, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SessionSaveResponse {
    pub status: ResponseStatus,
    pub message: String,
}

impl SessionSaveResponse {
    pub fn success() -> Self {
        Self {
            status: ResponseStatus::Success,
            message: "Session saved successfully!".to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn quality_for_documented_example() {
        assert_eq!(posture_quality_percentage(100, 10), 90.0);
    }

    #[test]
    fn quality_is_zero_without_frames() {
        assert_eq!(posture_quality_percentage(0, 0), 0.0);
    }

    #[test]
    fn quality_rounds_to_two_decimals() {
        assert_eq!(posture_quality_percentage(3, 1), 66.67);
        assert_eq!(posture_quality_percentage(7, 0), 100.0);
    }

    #[test]
    fn response_status_serializes_lowercase() {
        let body = serde_json::to_value(SessionSaveResponse::error("Missing data")).unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Missing data");
    }

    #[test]
    fn submission_accepts_camel_case_fields() {
        let submission: SessionSubmission = serde_json::from_str(r#"{"duration":120,"totalFrames":100,"badFrames":10}"#).unwrap();
        assert_eq!(submission.duration, Some(120));
        assert_eq!(submission.total_frames, Some(100));
        assert_eq!(submission.bad_frames, Some(10));
    }

    #[test]
    fn submission_accepts_whole_floats() {
        let submission: SessionSubmission = serde_json::from_str(r#"{"duration":120.0,"totalFrames":100,"badFrames":0.0}"#).unwrap();
        assert_eq!(submission.duration, Some(120));
        assert_eq!(submission.bad_frames, Some(0));
    }

    #[test]
    fn submission_rejects_fractions_and_negatives() {
        assert!(serde_json::from_str::<SessionSubmission>(r#"{"duration":12.5}"#).is_err());
        assert!(serde_json::from_str::<SessionSubmission>(r#"{"totalFrames":-3}"#).is_err());
        assert!(serde_json::from_str::<SessionSubmission>(r#"{"badFrames":"ten"}"#).is_err());
        assert!(serde_json::from_str::<SessionSubmission>(r#"{"duration":1e12}"#).is_err());
    }

    #[test]
    fn submission_treats_null_as_absent() {
        let submission: SessionSubmission = serde_json::from_str(r#"{"duration":null}"#).unwrap();
        assert_eq!(submission.duration, None);
        assert_eq!(submission.total_frames, None);
    }

    proptest! {
        #[test]
        fn quality_matches_formula(total in 1i64..1_000_000, bad_ratio in 0.0f64..=1.0) {
            let bad = (total as f64 * bad_ratio).floor() as i64;
            let exact = 100.0 * (total - bad) as f64 / total as f64;
            let actual = posture_quality_percentage(total, bad);
            prop_assert!((actual - exact).abs() <= 0.005 + 1e-9);
            prop_assert!(((actual * 100.0).round() - actual * 100.0).abs() < 1e-6);
            prop_assert!((0.0..=100.0).contains(&actual));
        }
    }
}
