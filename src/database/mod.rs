pub mod postgres_repository;
pub mod practice_session;
pub mod session;
pub mod user;
pub mod verification;
