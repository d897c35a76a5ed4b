use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Result};
use chrono::Utc;
use shared::{ApiSuccess, CreateTaskRequest, UpdateTaskRequest};

use crate::handlers::{error_response, internal_error, parse_id};
use crate::middleware::auth::authenticate;
use crate::models::AppState;
use crate::services::completion::{self, CompletionError};
use crate::services::tasks::{self as task_service, TaskError, TaskFilter};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tasks")
            .route("", web::get().to(list_tasks))
            .route("", web::post().to(create_task))
            .route("/stats", web::get().to(task_stats))
            .route("/{task_id}", web::get().to(get_task))
            .route("/{task_id}", web::put().to(update_task))
            .route("/{task_id}", web::delete().to(delete_task))
            .route("/{task_id}/complete", web::post().to(complete_task)),
    );
}

fn task_error_response(e: TaskError, action: &str) -> HttpResponse {
    match e {
        TaskError::NotFound => error_response(StatusCode::NOT_FOUND, "not_found", "Task not found"),
        TaskError::Completed => error_response(
            StatusCode::CONFLICT,
            "task_completed",
            "Completed tasks cannot be changed",
        ),
        TaskError::CategoryNotFound | TaskError::EmptyTitle => {
            error_response(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
        }
        TaskError::DatabaseError(_) => {
            log::error!("Error trying to {} task: {:?}", action, e);
            internal_error(&format!("Failed to {} task", action))
        }
    }
}

async fn list_tasks(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<TaskFilter>,
) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match task_service::list_tasks(&state.db, &user_id, &query).await {
        Ok(tasks) => Ok(HttpResponse::Ok().json(ApiSuccess::new(tasks))),
        Err(e) => Ok(task_error_response(e, "list")),
    }
}

async fn create_task(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match task_service::create_task(&state.db, &user_id, &body).await {
        Ok(task) => Ok(HttpResponse::Created().json(ApiSuccess::new(task))),
        Err(e) => Ok(task_error_response(e, "create")),
    }
}

async fn task_stats(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match task_service::task_stats(&state.db, &user_id, Utc::now()).await {
        Ok(stats) => Ok(HttpResponse::Ok().json(ApiSuccess::new(stats))),
        Err(e) => Ok(task_error_response(e, "summarize")),
    }
}

async fn get_task(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let task_id = match parse_id(&path, "task") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match task_service::get_task(&state.db, &user_id, &task_id).await {
        Ok(Some(task)) => Ok(HttpResponse::Ok().json(ApiSuccess::new(task))),
        Ok(None) => Ok(task_error_response(TaskError::NotFound, "get")),
        Err(e) => Ok(task_error_response(e, "get")),
    }
}

async fn update_task(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let task_id = match parse_id(&path, "task") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match task_service::update_task(&state.db, &user_id, &task_id, &body).await {
        Ok(task) => Ok(HttpResponse::Ok().json(ApiSuccess::new(task))),
        Err(e) => Ok(task_error_response(e, "update")),
    }
}

async fn delete_task(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let task_id = match parse_id(&path, "task") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match task_service::delete_task(&state.db, &user_id, &task_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(task_error_response(e, "delete")),
    }
}

async fn complete_task(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let task_id = match parse_id(&path, "task") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let result = completion::complete_task(
        &state.db,
        &state.config.level_curve,
        &state.config.timing_policy,
        &task_id,
        &user_id,
        Utc::now(),
    )
    .await;

    match result {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiSuccess::new(result))),
        Err(CompletionError::NotFound) => Ok(error_response(
            StatusCode::NOT_FOUND,
            "not_found",
            "Task not found",
        )),
        Err(e @ CompletionError::AlreadyCompleted) => Ok(error_response(
            StatusCode::CONFLICT,
            "already_completed",
            e.to_string(),
        )),
        Err(CompletionError::TimingRestriction(reason)) => Ok(error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "timing_restriction",
            reason,
        )),
        Err(e @ CompletionError::InvalidOrdering { .. }) => {
            log::warn!("Rejected out-of-order completion of task {}: {}", task_id, e);
            Ok(error_response(
                StatusCode::CONFLICT,
                "invalid_ordering",
                e.to_string(),
            ))
        }
        Err(e) => {
            log::error!("Error completing task {}: {:?}", task_id, e);
            Ok(internal_error("Failed to complete task"))
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};
    use serde_json::{json, Value};

    use crate::db::test_support::{create_category, create_user, test_pool};
    use crate::handlers::configure_routes;
    use crate::handlers::test_support::{bearer, test_state};

    #[actix_web::test]
    async fn test_create_and_complete_task() {
        let pool = test_pool().await;
        let user_id = create_user(&pool, "doer").await;
        let category_id = create_category(&pool, &user_id, "Learning", 1.5).await;
        let app = test::init_service(
            App::new()
                .app_data(test_state(pool))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/tasks")
            .insert_header(bearer(&user_id))
            .set_json(json!({
                "title": "Read chapter 3",
                "category_id": category_id,
                "difficulty": "medium"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        let body: Value = test::read_body_json(resp).await;
        let task_id = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["xp_value"], 30);

        let req = test::TestRequest::post()
            .uri(&format!("/api/tasks/{}/complete", task_id))
            .insert_header(bearer(&user_id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["xp_earned"], 30);
        assert_eq!(body["data"]["total_xp"], 30);
        assert_eq!(body["data"]["current_streak"], 1);
        assert_eq!(body["data"]["timing_status"], "no_deadline");

        let req = test::TestRequest::post()
            .uri(&format!("/api/tasks/{}/complete", task_id))
            .insert_header(bearer(&user_id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 409);

        let req = test::TestRequest::put()
            .uri(&format!("/api/tasks/{}", task_id))
            .insert_header(bearer(&user_id))
            .set_json(json!({ "title": "Rewrite history" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 409);

        let req = test::TestRequest::get()
            .uri("/api/tasks?completed=true")
            .insert_header(bearer(&user_id))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::get()
            .uri("/api/tasks/stats")
            .insert_header(bearer(&user_id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["completed_tasks"], 1);
    }

    #[actix_web::test]
    async fn test_complete_unknown_or_foreign_task() {
        let pool = test_pool().await;
        let owner = create_user(&pool, "owner").await;
        let intruder = create_user(&pool, "intruder").await;
        let category_id = create_category(&pool, &owner, "Work", 1.0).await;
        let app = test::init_service(
            App::new()
                .app_data(test_state(pool))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/tasks")
            .insert_header(bearer(&owner))
            .set_json(json!({ "title": "Mine", "category_id": category_id }))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        let task_id = body["data"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/api/tasks/{}/complete", task_id))
            .insert_header(bearer(&intruder))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);

        let req = test::TestRequest::post()
            .uri(&format!("/api/tasks/{}/complete", uuid::Uuid::new_v4()))
            .insert_header(bearer(&owner))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);

        let req = test::TestRequest::post()
            .uri(&format!("/api/tasks/{}/complete", task_id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);
    }

    #[actix_web::test]
    async fn test_create_task_rejects_unknown_difficulty() {
        let pool = test_pool().await;
        let user_id = create_user(&pool, "picky").await;
        let category_id = create_category(&pool, &user_id, "Work", 1.0).await;
        let app = test::init_service(
            App::new()
                .app_data(test_state(pool))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/tasks")
            .insert_header(bearer(&user_id))
            .set_json(json!({
                "title": "Impossible",
                "category_id": category_id,
                "difficulty": "legendary"
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }
}
