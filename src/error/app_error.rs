use rocket::http::Status;
use rocket::response::Responder;
use rocket::{Request, Response};
use rocket_okapi::OpenApiError;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::response::OpenApiResponderInner;
use std::io::Cursor;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error")]
    Db {
        message: String,
        #[source]
        source: sqlx::error::Error,
    },
    #[error("User not found")]
    UserNotFound,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Your account has not been verified yet. Please check your email for the activation link.")]
    AccountNotVerified,
    #[error("Internal server error")]
    PasswordHash { message: String },
    #[error("User {0} already exists")]
    UserAlreadyExists(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidPayload(String),
    #[error("Missing data: {0}")]
    MissingField(&'static str),
    #[error("Malformed verification token")]
    MalformedToken {
        #[source]
        source: uuid::Error,
    },
    #[error("Invalid or expired verification link")]
    InvalidOrExpiredToken,
    #[error("A verification token has already been issued for this account")]
    TokenAlreadyIssued,
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),
    #[error("Internal server error")]
    Email { message: String },
}

impl AppError {
    pub fn db(message: impl Into<String>, source: sqlx::error::Error) -> Self {
        Self::Db {
            message: message.into(),
            source,
        }
    }

    pub fn password_hash(message: impl Into<String>, source: password_hash::Error) -> Self {
        Self::PasswordHash {
            message: format!("{}: {}", message.into(), source),
        }
    }

    pub fn email(message: impl Into<String>) -> Self {
        Self::Email { message: message.into() }
    }

    /// True for failures whose detail must stay in the logs.
    pub fn is_internal(&self) -> bool {
        Status::from(self).class().is_server_error()
    }
}

impl From<password_hash::Error> for AppError {
    fn from(e: password_hash::Error) -> Self {
        AppError::password_hash("Password hashing failed", e)
    }
}

impl From<uuid::Error> for AppError {
    fn from(e: uuid::Error) -> Self {
        AppError::MalformedToken { source: e }
    }
}

impl From<&AppError> for Status {
    fn from(e: &AppError) -> Self {
        match e {
            AppError::UserNotFound => Status::NotFound,
            AppError::InvalidCredentials => Status::Unauthorized,
            AppError::AccountNotVerified => Status::Forbidden,
            AppError::PasswordHash { .. } => Status::InternalServerError,
            AppError::Db { .. } => Status::InternalServerError,
            AppError::Unauthorized => Status::Unauthorized,
            AppError::UserAlreadyExists(_) => Status::Conflict,
            AppError::BadRequest(_) => Status::BadRequest,
            AppError::NotFound(_) => Status::NotFound,
            AppError::InvalidPayload(_) => Status::BadRequest,
            AppError::MissingField(_) => Status::BadRequest,
            AppError::MalformedToken { .. } => Status::BadRequest,
            AppError::InvalidOrExpiredToken => Status::BadRequest,
            AppError::TokenAlreadyIssued => Status::Conflict,
            AppError::ValidationError(_) => Status::BadRequest,
            AppError::Email { .. } => Status::InternalServerError,
        }
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &Request<'_>) -> rocket::response::Result<'static> {
        let method = req.method();
        let uri = req.uri();

        let request_id = req
            .local_cache(|| None::<crate::middleware::RequestId>)
            .as_ref()
            .map(|r| r.0.as_str())
            .unwrap_or("unknown");

        let user_id = req
            .local_cache(|| None::<crate::auth::CurrentUser>)
            .as_ref()
            .map(|u| u.id.to_string())
            .unwrap_or_else(|| "anonymous".to_string());

        error!(
            error = ?self,
            request_id = %request_id,
            user_id = %user_id,
            method = %method,
            uri = %uri,
            "request failed"
        );

        let status = Status::from(&self);
        let body = self.to_string();

        Response::build().status(status).sized_body(body.len(), Cursor::new(body)).ok()
    }
}

impl OpenApiResponderInner for AppError {
    fn responses(_gen: &mut OpenApiGenerator) -> Result<Responses, OpenApiError> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response as OpenApiResponse};
        let mut responses = Responses::default();
        for (code, description) in [
            ("400", "Bad Request"),
            ("401", "Unauthorized"),
            ("403", "Account Not Verified"),
            ("409", "Conflict"),
            ("500", "Internal Server Error"),
        ] {
            responses.responses.insert(
                code.to_string(),
                RefOr::Object(OpenApiResponse {
                    description: description.to_string(),
                    ..Default::default()
                }),
            );
        }
        Ok(responses)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            _ => AppError::db("Database error", e),
        }
    }
}

/// Returns true when the error is a violation of a UNIQUE constraint.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_bad_request() {
        assert_eq!(Status::from(&AppError::MissingField("duration")), Status::BadRequest);
        assert_eq!(Status::from(&AppError::InvalidPayload("Invalid JSON".to_string())), Status::BadRequest);
        assert_eq!(Status::from(&AppError::InvalidOrExpiredToken), Status::BadRequest);

        let malformed: AppError = uuid::Uuid::parse_str("not-a-token").unwrap_err().into();
        assert!(matches!(malformed, AppError::MalformedToken { .. }));
        assert_eq!(Status::from(&malformed), Status::BadRequest);
    }

    #[test]
    fn not_verified_is_distinct_from_invalid_credentials() {
        assert_ne!(Status::from(&AppError::AccountNotVerified), Status::from(&AppError::InvalidCredentials));
        assert_ne!(AppError::AccountNotVerified.to_string(), AppError::InvalidCredentials.to_string());
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::email("SMTP relay refused connection");
        assert!(err.is_internal());
        assert_eq!(err.to_string(), "Internal server error");
        assert!(!AppError::MissingField("badFrames").is_internal());
    }

    #[test]
    fn missing_field_names_the_field() {
        assert_eq!(AppError::MissingField("totalFrames").to_string(), "Missing data: totalFrames");
    }
}
