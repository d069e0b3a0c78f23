pub mod config;
pub mod error;
pub mod routes;
pub mod session;

use macrocoach_db::{
    assessment::AssessmentStore, meal::MealStore, message::MessageStore, metrics::MetricsStore,
    plan::PlanStore, user::UserStore,
};

pub struct AppState {
    pub users: Box<dyn UserStore>,
    pub metrics: Box<dyn MetricsStore>,
    pub messages: Box<dyn MessageStore>,
    pub assessments: Box<dyn AssessmentStore>,
    pub meals: Box<dyn MealStore>,
    pub plans: Box<dyn PlanStore>,
}
