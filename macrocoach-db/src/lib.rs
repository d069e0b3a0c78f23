pub mod assessment;
pub mod connection;
pub mod meal;
pub mod message;
pub mod metrics;
pub mod plan;
mod row;
pub mod user;

use macrocoach_model::assessment::AssessmentStatus;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("DATABASE_URL must be set")]
    MissingUrl,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0} already exists")]
    Duplicate(&'static str),
    #[error("cannot move assessment from {from} to {to}")]
    InvalidTransition {
        from: AssessmentStatus,
        to: AssessmentStatus,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
