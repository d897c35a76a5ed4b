use actix_web::{web, HttpRequest, HttpResponse, Result};
use chrono::Utc;
use serde::Deserialize;
use shared::{ApiSuccess, LeaderboardPeriod};

use crate::handlers::internal_error;
use crate::middleware::auth::authenticate;
use crate::models::AppState;
use crate::services::leaderboard as leaderboard_service;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/leaderboard", web::get().to(get_leaderboard));
}

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    #[serde(default)]
    period: LeaderboardPeriod,
    limit: Option<usize>,
}

async fn get_leaderboard(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<LeaderboardQuery>,
) -> Result<HttpResponse> {
    let user_id = match authenticate(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    match leaderboard_service::leaderboard(&state.db, &user_id, query.period, limit, Utc::now())
        .await
    {
        Ok(board) => Ok(HttpResponse::Ok().json(ApiSuccess::new(board))),
        Err(e) => {
            log::error!("Error building leaderboard: {:?}", e);
            Ok(internal_error("Failed to build leaderboard"))
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};
    use chrono::Utc;
    use serde_json::Value;

    use crate::db::test_support::{create_category, create_user, test_pool};
    use crate::handlers::configure_routes;
    use crate::handlers::test_support::{bearer, test_state};
    use crate::services::completion::complete_task;
    use crate::services::leveling::LevelCurve;
    use crate::services::tasks::create_task;
    use crate::services::timing::TimingPolicy;
    use shared::{CreateTaskRequest, Difficulty};

    #[actix_web::test]
    async fn test_leaderboard_includes_caller() {
        let pool = test_pool().await;
        let user_id = create_user(&pool, "champion").await;
        let category = create_category(&pool, &user_id, "Work", 1.0).await;
        let task = create_task(
            &pool,
            &user_id,
            &CreateTaskRequest {
                title: "Ship it".to_string(),
                description: None,
                category_id: category,
                difficulty: Some(Difficulty::Easy),
                priority: None,
                due_date: None,
            },
        )
        .await
        .unwrap();
        complete_task(
            &pool,
            &LevelCurve::default(),
            &TimingPolicy::default(),
            &task.id,
            &user_id,
            Utc::now(),
        )
        .await
        .unwrap();

        let app = test::init_service(
            App::new()
                .app_data(test_state(pool))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/leaderboard?period=all_time&limit=5")
            .insert_header(bearer(&user_id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["period"], "all_time");
        assert_eq!(body["data"]["entries"][0]["username"], "champion");
        assert_eq!(body["data"]["current_user"]["rank"], 1);
        assert_eq!(body["data"]["current_user"]["tasks_completed"], 1);

        let req = test::TestRequest::get()
            .uri("/api/leaderboard?period=yearly")
            .insert_header(bearer(&user_id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }

    #[actix_web::test]
    async fn test_leaderboard_requires_token() {
        let app = test::init_service(
            App::new()
                .app_data(test_state(test_pool().await))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/leaderboard").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);
    }
}
