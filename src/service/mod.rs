pub mod auth;
pub mod email;
pub mod practice_session;
pub mod verification;
