use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use chrono::Utc;

mod config;
mod db;
mod handlers;
mod middleware;
mod models;
mod services;

use config::Config;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("Starting server at {}:{}", config.host, config.port);

    let pool = db::connect(&config).await.map_err(std::io::Error::other)?;

    db::migrate(&pool).await.map_err(std::io::Error::other)?;
    log::info!("Database migrations completed");

    if config.seed_default_achievements {
        if let Err(e) = services::achievements::seed_default_achievements(&pool, Utc::now()).await
        {
            log::warn!("Could not seed default achievements: {}", e);
        }
    }

    let app_state = web::Data::new(models::AppState {
        db: pool,
        config: config.clone(),
    });

    HttpServer::new(move || {
        let allowed_origins = app_state.config.cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                let origin_str = origin.to_str().unwrap_or("");
                allowed_origins
                    .iter()
                    .any(|allowed| origin_str.starts_with(allowed))
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type"])
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
