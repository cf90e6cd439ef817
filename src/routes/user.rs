use crate::auth::{CurrentUser, SESSION_COOKIE};
use crate::config::Config;
use crate::database::postgres_repository::PostgresRepository;
use crate::database::session::SessionRepository;
use crate::database::user::UserRepository;
use crate::error::app_error::AppError;
use crate::models::user::{LoginRequest, SignupRequest, SignupResponse, UserResponse};
use crate::service::auth::AuthService;
use crate::service::email::EmailService;
use chrono::Duration;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::response::Redirect;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::openapi;
use sqlx::PgPool;
use validator::Validate;

/// Create an inactive account and send its activation email
#[openapi(tag = "Users")]
#[post("/", data = "<payload>")]
pub async fn signup(pool: &State<PgPool>, config: &State<Config>, payload: Json<SignupRequest>) -> Result<(Status, Json<SignupResponse>), AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let mailer = EmailService::new(config.email.clone());
    let service = AuthService::new(&repo, &mailer, &config.site.base_url);

    let (user, issued) = service.signup(&payload).await?;
    let message = if issued.email_sent {
        "Please check your email to activate your account."
    } else {
        "Your account was created, but we could not send the activation email."
    };

    Ok((
        Status::Created,
        Json(SignupResponse {
            user: UserResponse::from(&user),
            email_sent: issued.email_sent,
            message: message.to_string(),
        }),
    ))
}

/// Opens a login session for a verified account and sends the browser home.
#[post("/login", data = "<payload>")]
pub async fn login(pool: &State<PgPool>, config: &State<Config>, cookies: &CookieJar<'_>, payload: Json<LoginRequest>) -> Result<Redirect, AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let mailer = EmailService::new(config.email.clone());
    let service = AuthService::new(&repo, &mailer, &config.site.base_url);

    let user = service.authenticate(&payload.username, &payload.password).await?;

    let session = repo.open_session(&user.id, Duration::seconds(config.session.ttl_seconds)).await?;

    cookies.add_private(
        Cookie::build((SESSION_COOKIE, session.id.to_string()))
            .path("/")
            .http_only(true)
            .secure(config.session.cookie_secure)
            .same_site(SameSite::Lax)
            .build(),
    );
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Redirect::to("/"))
}

#[post("/logout")]
pub async fn logout(pool: &State<PgPool>, cookies: &CookieJar<'_>) -> Result<Status, AppError> {
    if let Some(cookie) = cookies.get_private(SESSION_COOKIE)
        && let Ok(session_id) = uuid::Uuid::try_parse(cookie.value())
    {
        let repo = PostgresRepository { pool: pool.inner().clone() };
        repo.close_session(&session_id).await?;
    }

    cookies.remove_private(Cookie::build(SESSION_COOKIE).path("/").build());
    Ok(Status::Ok)
}

/// Return the logged-in user
#[openapi(tag = "Users")]
#[get("/me")]
pub async fn get_me(pool: &State<PgPool>, current_user: CurrentUser) -> Result<Json<UserResponse>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let user = repo.get_user_by_id(&current_user.id).await?.ok_or(AppError::UserNotFound)?;
    Ok(Json(UserResponse::from(&user)))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    let (mut routes, openapi) = rocket_okapi::openapi_get_routes_spec![signup, get_me];
    routes.extend(rocket::routes![login, logout]);
    (routes, openapi)
}
