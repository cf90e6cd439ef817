pub mod error;
pub mod health;
pub mod practice_session;
pub mod user;
pub mod verification;
