use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Result};
use shared::{ApiSuccess, AuthResponse, CreateUserRequest, LoginRequest, User};

use crate::handlers::{error_response, internal_error};
use crate::middleware::auth::authenticate;
use crate::models::AppState;
use crate::services::auth::{self as auth_service, AuthError};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/me", web::get().to(get_current_user)),
    );
}

fn token_response(state: &AppState, user: User, status: StatusCode) -> HttpResponse {
    match auth_service::create_jwt(
        &user.id,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    ) {
        Ok(token) => HttpResponse::build(status).json(ApiSuccess::new(AuthResponse { token, user })),
        Err(e) => {
            log::error!("JWT creation error: {:?}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "jwt_error",
                "Failed to create token",
            )
        }
    }
}

async fn register(
    state: web::Data<AppState>,
    body: web::Json<CreateUserRequest>,
) -> Result<HttpResponse> {
    let request = body.into_inner();

    if request.password.len() < 8 {
        return Ok(error_response(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "Password must be at least 8 characters",
        ));
    }

    match auth_service::register_user(&state.db, &request).await {
        Ok(user) => Ok(token_response(&state, user, StatusCode::CREATED)),
        Err(AuthError::MissingFields) => Ok(error_response(
            StatusCode::BAD_REQUEST,
            "validation_error",
            AuthError::MissingFields.to_string(),
        )),
        Err(AuthError::UserAlreadyExists) => Ok(error_response(
            StatusCode::CONFLICT,
            "user_exists",
            "Username or email is already taken",
        )),
        Err(e) => {
            log::error!("Registration error: {:?}", e);
            Ok(internal_error("Failed to register user"))
        }
    }
}

async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> Result<HttpResponse> {
    match auth_service::login_user(&state.db, &body).await {
        Ok(user) => Ok(token_response(&state, user, StatusCode::OK)),
        Err(AuthError::InvalidCredentials) => Ok(error_response(
            StatusCode::UNAUTHORIZED,
            "authentication_error",
            "Invalid username or password",
        )),
        Err(e) => {
            log::error!("Login error: {:?}", e);
            Ok(internal_error("Failed to log in"))
        }
    }
}

async fn get_current_user(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match auth_service::get_user_by_id(&state.db, &user_id).await {
        Ok(Some(user)) => Ok(HttpResponse::Ok().json(ApiSuccess::new(user))),
        Ok(None) => Ok(error_response(
            StatusCode::NOT_FOUND,
            "not_found",
            "User not found",
        )),
        Err(e) => {
            log::error!("Error fetching user: {:?}", e);
            Ok(internal_error("Failed to fetch user"))
        }
    }
}
