use std::error::Error;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use log::info;
use macrocoach_api::{config::Config, routes, AppState};
use macrocoach_db::{
    assessment::AssessmentStoreImpl, connection::Connection, meal::MealStoreImpl,
    message::MessageStoreImpl, metrics::MetricsStoreImpl, plan::PlanStoreImpl,
    user::UserStoreImpl,
};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    log4rs::init_file("log4rs.yml", Default::default())?;
    dotenv::dotenv().ok();
    let config = Config::from_file("config.ron")?;

    info!("Connecting to database");
    let conn = Connection::establish().await?;
    let state = web::Data::new(AppState {
        users: Box::new(UserStoreImpl::new(conn.clone())),
        metrics: Box::new(MetricsStoreImpl::new(conn.clone())),
        messages: Box::new(MessageStoreImpl::new(conn.clone())),
        assessments: Box::new(AssessmentStoreImpl::new(conn.clone())),
        meals: Box::new(MealStoreImpl::new(conn.clone())),
        plans: Box::new(PlanStoreImpl::new(conn.clone())),
    });

    info!("Listening on {}:{}", config.host, config.port);
    let allowed_origin = config.allowed_origin.clone();
    HttpServer::new(move || {
        let cors = match &allowed_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header(),
            None => Cors::default(),
        };
        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
