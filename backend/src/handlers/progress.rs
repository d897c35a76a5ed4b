use actix_web::{web, HttpRequest, HttpResponse, Result};
use chrono::Utc;
use serde::Deserialize;
use shared::ApiSuccess;

use crate::handlers::internal_error;
use crate::middleware::auth::authenticate;
use crate::models::AppState;
use crate::services::{progress, streaks, xp};

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 500;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/progress")
            .route("/level", web::get().to(get_level))
            .route("/xp", web::get().to(get_xp_history))
            .route("/xp/breakdown", web::get().to(get_xp_breakdown))
            .route("/streak", web::get().to(get_streak))
            .route("/streak/recalculate", web::post().to(recalculate_streak)),
    );
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<i64>,
}

async fn get_level(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let today = Utc::now().date_naive();
    match progress::get_level_info(&state.db, &user_id, &state.config.level_curve, today).await {
        Ok(info) => Ok(HttpResponse::Ok().json(ApiSuccess::new(info))),
        Err(e) => {
            log::error!("Error loading level info: {:?}", e);
            Ok(internal_error("Failed to load level info"))
        }
    }
}

async fn get_xp_history(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    match xp::list_entries(&state.db, &user_id, limit).await {
        Ok(entries) => Ok(HttpResponse::Ok().json(ApiSuccess::new(entries))),
        Err(e) => {
            log::error!("Error loading XP history: {:?}", e);
            Ok(internal_error("Failed to load XP history"))
        }
    }
}

async fn get_xp_breakdown(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match xp::breakdown(&state.db, &user_id, Utc::now()).await {
        Ok(breakdown) => Ok(HttpResponse::Ok().json(ApiSuccess::new(breakdown))),
        Err(e) => {
            log::error!("Error loading XP breakdown: {:?}", e);
            Ok(internal_error("Failed to load XP breakdown"))
        }
    }
}

async fn get_streak(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match streaks::get_streak(&state.db, &user_id).await {
        Ok(streak) => {
            let today = Utc::now().date_naive();
            let mut info = streak.to_info();
            info.current_streak = streak.effective_current(today);
            Ok(HttpResponse::Ok().json(ApiSuccess::new(info)))
        }
        Err(e) => {
            log::error!("Error loading streak: {:?}", e);
            Ok(internal_error("Failed to load streak"))
        }
    }
}

async fn recalculate_streak(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match streaks::recalculate_streak(&state.db, &user_id, Utc::now()).await {
        Ok(streak) => Ok(HttpResponse::Ok().json(ApiSuccess::new(streak))),
        Err(e) => {
            log::error!("Error recalculating streak: {:?}", e);
            Ok(internal_error("Failed to recalculate streak"))
        }
    }
}
