use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Result};
use shared::{ApiSuccess, CreateCategoryRequest, UpdateCategoryRequest};

use crate::handlers::{error_response, internal_error, parse_id};
use crate::middleware::auth::authenticate;
use crate::models::AppState;
use crate::services::categories::{self as category_service, CategoryError};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/categories")
            .route("", web::get().to(list_categories))
            .route("", web::post().to(create_category))
            .route("/{category_id}", web::get().to(get_category))
            .route("/{category_id}", web::put().to(update_category))
            .route("/{category_id}", web::delete().to(delete_category)),
    );
}

fn category_error_response(e: CategoryError, action: &str) -> HttpResponse {
    match e {
        CategoryError::NotFound => {
            error_response(StatusCode::NOT_FOUND, "not_found", "Category not found")
        }
        CategoryError::DuplicateName => error_response(
            StatusCode::CONFLICT,
            "duplicate_name",
            "A category with this name already exists",
        ),
        CategoryError::InUse => error_response(
            StatusCode::CONFLICT,
            "category_in_use",
            "Category still has tasks",
        ),
        CategoryError::EmptyName | CategoryError::InvalidMultiplier => {
            error_response(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
        }
        CategoryError::DatabaseError(_) => {
            log::error!("Error trying to {} category: {:?}", action, e);
            internal_error(&format!("Failed to {} category", action))
        }
    }
}

async fn list_categories(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match category_service::list_categories(&state.db, &user_id).await {
        Ok(categories) => Ok(HttpResponse::Ok().json(ApiSuccess::new(categories))),
        Err(e) => Ok(category_error_response(e, "list")),
    }
}

async fn create_category(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateCategoryRequest>,
) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match category_service::create_category(&state.db, &user_id, &body).await {
        Ok(category) => Ok(HttpResponse::Created().json(ApiSuccess::new(category))),
        Err(e) => Ok(category_error_response(e, "create")),
    }
}

async fn get_category(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let category_id = match parse_id(&path, "category") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match category_service::get_category(&state.db, &user_id, &category_id).await {
        Ok(Some(category)) => Ok(HttpResponse::Ok().json(ApiSuccess::new(category))),
        Ok(None) => Ok(category_error_response(CategoryError::NotFound, "get")),
        Err(e) => Ok(category_error_response(e, "get")),
    }
}

async fn update_category(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpdateCategoryRequest>,
) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let category_id = match parse_id(&path, "category") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match category_service::update_category(&state.db, &user_id, &category_id, &body).await {
        Ok(category) => Ok(HttpResponse::Ok().json(ApiSuccess::new(category))),
        Err(e) => Ok(category_error_response(e, "update")),
    }
}

async fn delete_category(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let category_id = match parse_id(&path, "category") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match category_service::delete_category(&state.db, &user_id, &category_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(category_error_response(e, "delete")),
    }
}
