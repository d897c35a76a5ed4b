use actix_web::{http::StatusCode, web, HttpResponse};
use shared::ApiError;
use uuid::Uuid;

pub mod achievements;
pub mod auth;
pub mod categories;
pub mod leaderboard;
pub mod progress;
pub mod reviews;
pub mod tasks;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(auth::configure)
            .configure(categories::configure)
            .configure(tasks::configure)
            .configure(progress::configure)
            .configure(achievements::configure)
            .configure(reviews::configure)
            .configure(leaderboard::configure),
    );
}

pub(crate) fn error_response(
    status: StatusCode,
    error: &str,
    message: impl Into<String>,
) -> HttpResponse {
    HttpResponse::build(status).json(ApiError {
        error: error.to_string(),
        message: message.into(),
    })
}

pub(crate) fn internal_error(message: &str) -> HttpResponse {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
}

/// Parses an id taken from the path, answering 400 when it is malformed.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, HttpResponse> {
    Uuid::parse_str(raw).map_err(|_| {
        error_response(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("Invalid {} ID format", what),
        )
    })
}
