use actix_web::{web, HttpRequest, HttpResponse, Result};
use chrono::Utc;
use shared::{ApiSuccess, GenerateReviewRequest};

use crate::handlers::internal_error;
use crate::middleware::auth::authenticate;
use crate::models::AppState;
use crate::services::reviews as review_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reviews")
            .route("", web::get().to(list_reviews))
            .route("/generate", web::post().to(generate_review))
            .route("/summary", web::get().to(get_summary)),
    );
}

async fn list_reviews(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match review_service::list_reviews(&state.db, &user_id).await {
        Ok(reviews) => Ok(HttpResponse::Ok().json(ApiSuccess::new(reviews))),
        Err(e) => {
            log::error!("Error listing weekly reviews: {:?}", e);
            Ok(internal_error("Failed to list weekly reviews"))
        }
    }
}

/// Generates the review for the week containing `week_start`, or the
/// current week when no body is sent.
async fn generate_review(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: Option<web::Json<GenerateReviewRequest>>,
) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let now = Utc::now();
    let week_of = body
        .and_then(|b| b.into_inner().week_start)
        .unwrap_or_else(|| now.date_naive());

    match review_service::generate_weekly_review(&state.db, &user_id, week_of, now).await {
        Ok(review) => Ok(HttpResponse::Ok().json(ApiSuccess::new(review))),
        Err(e) => {
            log::error!("Error generating weekly review: {:?}", e);
            Ok(internal_error("Failed to generate weekly review"))
        }
    }
}

async fn get_summary(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match review_service::performance_summary(&state.db, &user_id).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(ApiSuccess::new(summary))),
        Err(e) => {
            log::error!("Error building performance summary: {:?}", e);
            Ok(internal_error("Failed to build performance summary"))
        }
    }
}
