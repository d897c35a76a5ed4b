use actix_web::{web, HttpRequest, HttpResponse, Result};
use chrono::Utc;
use shared::ApiSuccess;

use crate::handlers::internal_error;
use crate::middleware::auth::authenticate;
use crate::models::AppState;
use crate::services::achievements as achievement_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/achievements")
            .route("", web::get().to(list_achievements))
            .route("/unlocked", web::get().to(list_unlocked)),
    );
}

async fn list_achievements(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let today = Utc::now().date_naive();
    match achievement_service::achievement_status(
        &state.db,
        &user_id,
        &state.config.level_curve,
        today,
    )
    .await
    {
        Ok(statuses) => Ok(HttpResponse::Ok().json(ApiSuccess::new(statuses))),
        Err(e) => {
            log::error!("Error loading achievements: {:?}", e);
            Ok(internal_error("Failed to load achievements"))
        }
    }
}

async fn list_unlocked(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match achievement_service::list_unlocked(&state.db, &user_id).await {
        Ok(unlocked) => Ok(HttpResponse::Ok().json(ApiSuccess::new(unlocked))),
        Err(e) => {
            log::error!("Error loading unlocked achievements: {:?}", e);
            Ok(internal_error("Failed to load unlocked achievements"))
        }
    }
}
