use actix_web::{HttpRequest, HttpResponse};
use shared::ApiError;
use thiserror::Error;
use uuid::Uuid;

use crate::services::auth as auth_service;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthMiddlewareError {
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Invalid authorization token")]
    InvalidToken,
}

/// Extract user ID from the Authorization header
pub fn extract_user_id(req: &HttpRequest, jwt_secret: &str) -> Result<Uuid, AuthMiddlewareError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .ok_or(AuthMiddlewareError::MissingToken)?;

    let token = auth_header
        .to_str()
        .map_err(|_| AuthMiddlewareError::InvalidToken)?
        .strip_prefix("Bearer ")
        .ok_or(AuthMiddlewareError::InvalidToken)?;

    auth_service::verify_jwt(token, jwt_secret).map_err(|_| AuthMiddlewareError::InvalidToken)
}

/// Like [`extract_user_id`], but hands back the 401 response to return
/// when the caller is not authenticated.
pub fn authenticate(req: &HttpRequest, jwt_secret: &str) -> Result<Uuid, HttpResponse> {
    extract_user_id(req, jwt_secret).map_err(|e| {
        log::debug!("Rejected request to {}: {}", req.path(), e);
        HttpResponse::Unauthorized().json(ApiError {
            error: "unauthorized".to_string(),
            message: "Invalid or missing token".to_string(),
        })
    })
}
