use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::practice_session::SessionSaveResponse;
use crate::service::practice_session::SessionRecorder;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, routes};
use sqlx::PgPool;
use tracing::{error, warn};

type SaveResponse = (Status, Json<SessionSaveResponse>);

/// Saves yoga session data sent from the practice page.
#[rocket::post("/save_session", data = "<body>")]
pub async fn save_session(pool: &State<PgPool>, body: String) -> SaveResponse {
    let repo = PostgresRepository { pool: pool.inner().clone() };

    match SessionRecorder::new(&repo).record(&body).await {
        Ok(_) => (Status::Ok, Json(SessionSaveResponse::success())),
        Err(err) => save_error_response(&err),
    }
}

#[rocket::get("/save_session")]
pub fn save_session_get() -> SaveResponse {
    method_not_allowed()
}

#[rocket::put("/save_session")]
pub fn save_session_put() -> SaveResponse {
    method_not_allowed()
}

#[rocket::patch("/save_session")]
pub fn save_session_patch() -> SaveResponse {
    method_not_allowed()
}

#[rocket::delete("/save_session")]
pub fn save_session_delete() -> SaveResponse {
    method_not_allowed()
}

fn method_not_allowed() -> SaveResponse {
    (Status::MethodNotAllowed, Json(SessionSaveResponse::error("Invalid request method")))
}

fn save_error_response(err: &AppError) -> SaveResponse {
    let status = Status::from(err);
    if err.is_internal() {
        error!(error = ?err, "failed to save yoga session");
        (status, Json(SessionSaveResponse::error("Failed to save session")))
    } else {
        warn!(error = %err, "rejected yoga session submission");
        (status, Json(SessionSaveResponse::error(err.to_string())))
    }
}

pub fn routes() -> Vec<rocket::Route> {
    routes![save_session, save_session_get, save_session_put, save_session_patch, save_session_delete]
}
