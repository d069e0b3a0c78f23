pub mod assessment;
pub mod calculator;
pub mod meal;
pub mod message;
pub mod metrics;
pub mod plan;
pub mod presenter;
pub mod profile;
pub mod user;
