use crate::database::postgres_repository::PostgresRepository;
use crate::database::session::SessionRepository;
use crate::error::app_error::AppError;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{FromRequest, Outcome as RequestOutcome, Request};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{Object, SecurityRequirement, SecurityScheme, SecuritySchemeData};
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

/// Private cookie holding the login session id.
pub const SESSION_COOKIE: &str = "user";

const SECURITY_SCHEME_NAME: &str = "sessionCookie";

/// A verified account with a live login session.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
}

/// Maps a session cookie value to its account. Anything that does not resolve is `None`;
/// a lapsed session is purged on the way out.
pub(crate) async fn resolve_session<R: SessionRepository>(repository: &R, cookie_value: &str) -> Result<Option<CurrentUser>, AppError> {
    let Ok(session_id) = Uuid::try_parse(cookie_value) else {
        debug!("ignoring malformed session cookie");
        return Ok(None);
    };

    if let Some(user) = repository.find_session_user(&session_id).await? {
        return Ok(Some(CurrentUser {
            id: user.id,
            username: user.username,
        }));
    }

    match repository.purge_expired_session(&session_id).await {
        Ok(true) => debug!(session_id = %session_id, "purged lapsed login session"),
        Ok(false) => {}
        Err(err) => warn!(session_id = %session_id, error = ?err, "failed to purge lapsed login session"),
    }

    Ok(None)
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = AppError;

    async fn from_request(req: &'r Request<'_>) -> RequestOutcome<Self, Self::Error> {
        let Some(cookie) = req.cookies().get_private(SESSION_COOKIE) else {
            return Outcome::Error((Status::Unauthorized, AppError::Unauthorized));
        };
        let Some(pool) = req.rocket().state::<PgPool>() else {
            return Outcome::Error((Status::InternalServerError, AppError::Unauthorized));
        };

        let repository = PostgresRepository { pool: pool.clone() };
        match resolve_session(&repository, cookie.value()).await {
            Ok(Some(user)) => {
                req.local_cache(|| Some(user.clone()));
                Outcome::Success(user)
            }
            Ok(None) => Outcome::Error((Status::Unauthorized, AppError::Unauthorized)),
            Err(err) => Outcome::Error((Status::InternalServerError, err)),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for CurrentUser {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        let scheme = SecurityScheme {
            description: Some("Session cookie set by POST /api/users/login. Only verified accounts can log in.".to_string()),
            data: SecuritySchemeData::ApiKey {
                name: SESSION_COOKIE.to_string(),
                location: "cookie".to_string(),
            },
            extensions: Object::default(),
        };

        let mut requirement = SecurityRequirement::new();
        requirement.insert(SECURITY_SCHEME_NAME.to_string(), Vec::new());

        Ok(RequestHeaderInput::Security(SECURITY_SCHEME_NAME.to_string(), scheme, requirement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::user::UserRepository;
    use crate::test_utils::MockRepository;
    use chrono::Duration;

    async fn active_user(repo: &MockRepository) -> Uuid {
        let user = repo.create_user("shanti", "shanti@example.com", "lotus-position").await.unwrap();
        repo.set_active(&user.id, true);
        user.id
    }

    #[tokio::test]
    async fn test_live_session_resolves_to_account() {
        let repo = MockRepository::default();
        let user_id = active_user(&repo).await;
        let session = repo.open_session(&user_id, Duration::hours(1)).await.unwrap();

        let current = resolve_session(&repo, &session.id.to_string()).await.unwrap().unwrap();

        assert_eq!(current.id, user_id);
        assert_eq!(current.username, "shanti");
    }

    #[tokio::test]
    async fn test_malformed_cookie_does_not_resolve() {
        let repo = MockRepository::default();

        assert!(resolve_session(&repo, "not-a-session").await.unwrap().is_none());
        assert!(resolve_session(&repo, "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lapsed_session_is_purged() {
        let repo = MockRepository::default();
        let user_id = active_user(&repo).await;
        let session = repo.open_session(&user_id, Duration::seconds(-1)).await.unwrap();

        assert!(resolve_session(&repo, &session.id.to_string()).await.unwrap().is_none());
        assert_eq!(repo.session_count(), 0);
    }

    #[tokio::test]
    async fn test_session_of_inactive_account_does_not_resolve() {
        let repo = MockRepository::default();
        let user_id = active_user(&repo).await;
        let session = repo.open_session(&user_id, Duration::hours(1)).await.unwrap();
        repo.set_active(&user_id, false);

        assert!(resolve_session(&repo, &session.id.to_string()).await.unwrap().is_none());
        // Still live, only the account is inactive.
        assert_eq!(repo.session_count(), 1);
    }

    #[tokio::test]
    async fn test_purge_failure_still_rejects_session() {
        let repo = MockRepository::default();
        repo.fail_session_purge();

        let result = resolve_session(&repo, &Uuid::new_v4().to_string()).await;

        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_opening_a_session_prunes_lapsed_ones() {
        let repo = MockRepository::default();
        let user_id = active_user(&repo).await;
        repo.open_session(&user_id, Duration::seconds(-1)).await.unwrap();

        let live = repo.open_session(&user_id, Duration::hours(1)).await.unwrap();

        assert_eq!(repo.session_count(), 1);
        assert!(repo.find_session_user(&live.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_closed_session_does_not_resolve() {
        let repo = MockRepository::default();
        let user_id = active_user(&repo).await;
        let session = repo.open_session(&user_id, Duration::hours(1)).await.unwrap();

        repo.close_session(&session.id).await.unwrap();

        assert!(resolve_session(&repo, &session.id.to_string()).await.unwrap().is_none());
    }
}
