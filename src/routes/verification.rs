use crate::config::Config;
use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::verification::VerificationOutcome;
use crate::service::email::EmailService;
use crate::service::verification::VerificationService;
use rocket::response::content::RawHtml;
use rocket::{State, get, routes};
use sqlx::PgPool;

/// Landing page for the link in the activation email.
#[get("/verify/<token>")]
pub async fn verify_email(pool: &State<PgPool>, config: &State<Config>, token: &str) -> Result<RawHtml<String>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let mailer = EmailService::new(config.email.clone());
    let service = VerificationService::new(&repo, &mailer, &config.site.base_url);

    let outcome = service.exchange(token).await?;
    Ok(RawHtml(verification_page(outcome)))
}

fn verification_page(outcome: VerificationOutcome) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} | YogaSathi</title>
</head>
<body>
    <main>
        <h1>{title}</h1>
        <p>{message}</p>
        <p><a href="/">Back to YogaSathi</a></p>
    </main>
</body>
</html>
"#,
        title = outcome.title(),
        message = outcome.message(),
    )
}

pub fn routes() -> Vec<rocket::Route> {
    routes![verify_email]
}
