pub mod health;
pub mod practice_session;
pub mod session;
pub mod user;
pub mod verification;
