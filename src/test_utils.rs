use crate::database::practice_session::PracticeSessionRepository;
use crate::database::session::SessionRepository;
use crate::database::user::{UserRepository, password_hash};
use crate::database::verification::VerificationTokenRepository;
use crate::config::Config;
use crate::error::app_error::AppError;
use crate::models::practice_session::{NewYogaSession, YogaSession};
use crate::models::session::{Session, SessionUser};
use crate::models::user::User;
use crate::models::verification::VerificationToken;
use crate::service::email::Mailer;
use chrono::{Duration, Utc};
use rocket::local::asynchronous::Client;
use sqlx::postgres::PgPoolOptions;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct MockState {
    users: Vec<User>,
    tokens: Vec<VerificationToken>,
    practice_sessions: Vec<YogaSession>,
    login_sessions: Vec<Session>,
    activate_after_lookup: Option<Uuid>,
    fail_next_token_insert: bool,
    fail_session_purge: bool,
}

/// In-memory stand-in for Postgres, enforcing the same uniqueness rules as the schema.
#[derive(Default)]
pub struct MockRepository {
    state: Mutex<MockState>,
}

impl MockRepository {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn practice_sessions(&self) -> Vec<YogaSession> {
        self.state().practice_sessions.clone()
    }

    pub fn set_active(&self, user_id: &Uuid, is_active: bool) {
        if let Some(user) = self.state().users.iter_mut().find(|u| u.id == *user_id) {
            user.is_active = is_active;
        }
    }

    /// Simulates a concurrent exchange that activates the user right after the next lookup.
    pub fn activate_after_next_lookup(&self, user_id: &Uuid) {
        self.state().activate_after_lookup = Some(*user_id);
    }

    /// The next verification token insert fails as if the database dropped the connection.
    pub fn fail_next_token_insert(&self) {
        self.state().fail_next_token_insert = true;
    }

    pub fn fail_session_purge(&self) {
        self.state().fail_session_purge = true;
    }

    pub fn session_count(&self) -> usize {
        self.state().login_sessions.len()
    }
}

#[async_trait::async_trait]
impl PracticeSessionRepository for MockRepository {
    async fn create_practice_session(&self, session: &NewYogaSession) -> Result<YogaSession, AppError> {
        let session = YogaSession {
            id: Uuid::new_v4(),
            duration_seconds: session.duration_seconds,
            total_frames: session.total_frames,
            bad_frames: session.bad_frames,
            start_time: Utc::now(),
        };
        self.state().practice_sessions.push(session.clone());
        Ok(session)
    }
}

#[async_trait::async_trait]
impl UserRepository for MockRepository {
    async fn create_user(&self, username: &str, email: &str, password: &str) -> Result<User, AppError> {
        let (_, password_hash) = password_hash(password)?;
        let mut state = self.state();
        if state.users.iter().any(|u| u.username == username || u.email == email) {
            return Err(AppError::UserAlreadyExists(username.to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            is_active: false,
            created_at: Utc::now(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.state().users.iter().find(|u| u.username == username).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.state().users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError> {
        let mut state = self.state();
        let user = state.users.iter().find(|u| u.id == *id).cloned();

        if state.activate_after_lookup == Some(*id) {
            state.activate_after_lookup = None;
            if let Some(stored) = state.users.iter_mut().find(|u| u.id == *id) {
                stored.is_active = true;
            }
        }

        Ok(user)
    }

    async fn delete_unverified_user(&self, id: &Uuid) -> Result<(), AppError> {
        let mut state = self.state();
        state.users.retain(|u| u.id != *id || u.is_active);
        state.tokens.retain(|t| t.user_id != *id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl VerificationTokenRepository for MockRepository {
    async fn create_verification_token(&self, user_id: &Uuid, token: &Uuid) -> Result<VerificationToken, AppError> {
        let mut state = self.state();
        if std::mem::take(&mut state.fail_next_token_insert) {
            return Err(AppError::db("Failed to create verification token", sqlx::Error::PoolTimedOut));
        }
        if state.tokens.iter().any(|t| t.user_id == *user_id || t.token == *token) {
            return Err(AppError::TokenAlreadyIssued);
        }

        let token = VerificationToken {
            id: Uuid::new_v4(),
            user_id: *user_id,
            token: *token,
            created_at: Utc::now(),
        };
        state.tokens.push(token.clone());
        Ok(token)
    }

    async fn get_verification_token(&self, token: &Uuid) -> Result<Option<VerificationToken>, AppError> {
        Ok(self.state().tokens.iter().find(|t| t.token == *token).cloned())
    }

    async fn activate_user_with_token(&self, token: &VerificationToken) -> Result<bool, AppError> {
        let mut state = self.state();
        let activated = match state.users.iter_mut().find(|u| u.id == token.user_id && !u.is_active) {
            Some(user) => {
                user.is_active = true;
                true
            }
            None => false,
        };
        state.tokens.retain(|t| t.id != token.id);
        Ok(activated)
    }
}

#[async_trait::async_trait]
impl SessionRepository for MockRepository {
    async fn open_session(&self, user_id: &Uuid, ttl: Duration) -> Result<Session, AppError> {
        let now = Utc::now();
        let mut state = self.state();
        state.login_sessions.retain(|s| s.user_id != *user_id || s.expires_at > now);

        let session = Session {
            id: Uuid::new_v4(),
            user_id: *user_id,
            created_at: now,
            expires_at: now + ttl,
        };
        state.login_sessions.push(session.clone());
        Ok(session)
    }

    async fn find_session_user(&self, session_id: &Uuid) -> Result<Option<SessionUser>, AppError> {
        let state = self.state();
        let now = Utc::now();
        let user = state
            .login_sessions
            .iter()
            .find(|s| s.id == *session_id && s.expires_at > now)
            .and_then(|s| state.users.iter().find(|u| u.id == s.user_id && u.is_active))
            .map(|u| SessionUser {
                id: u.id,
                username: u.username.clone(),
            });
        Ok(user)
    }

    async fn purge_expired_session(&self, session_id: &Uuid) -> Result<bool, AppError> {
        let mut state = self.state();
        if state.fail_session_purge {
            return Err(AppError::db("Failed to purge login session", sqlx::Error::PoolTimedOut));
        }
        let now = Utc::now();
        let before = state.login_sessions.len();
        state.login_sessions.retain(|s| s.id != *session_id || s.expires_at > now);
        Ok(state.login_sessions.len() < before)
    }

    async fn close_session(&self, session_id: &Uuid) -> Result<(), AppError> {
        self.state().login_sessions.retain(|s| s.id != *session_id);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
}

/// Records outgoing mail instead of talking to SMTP.
#[derive(Default)]
pub struct MockMailer {
    sent: Mutex<Vec<SentEmail>>,
    fail: bool,
}

impl MockMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Mailer for MockMailer {
    async fn send_email(&self, to_email: &str, subject: &str, text_body: &str, _html_body: &str) -> Result<bool, AppError> {
        if self.fail {
            return Err(AppError::email("SMTP relay unavailable"));
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to_email.to_string(),
            subject: subject.to_string(),
            text_body: text_body.to_string(),
        });
        Ok(true)
    }
}

/// Client for the root pages backed by a pool that never connects. Requests that get as far as
/// the database fail; everything rejected before that is served normally.
pub async fn root_client() -> Client {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://yogasathi@localhost/yogasathi_test")
        .expect("lazy pool");
    let rocket = crate::mount_root_routes(rocket::build().manage(pool).manage(Config::default()));
    Client::tracked(rocket).await.expect("valid rocket instance")
}
