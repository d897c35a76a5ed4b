use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::models::CategoryRow;
use shared::{Category, CreateCategoryRequest, UpdateCategoryRequest};

pub const DEFAULT_COLOR: &str = "#007bff";

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("Category not found")]
    NotFound,
    #[error("Category name already exists")]
    DuplicateName,
    #[error("Category name must not be empty")]
    EmptyName,
    #[error("XP multiplier must be a positive number")]
    InvalidMultiplier,
    #[error("Category still has tasks")]
    InUse,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Categories every new account starts with: name, description, color and
/// XP multiplier.
const DEFAULT_CATEGORIES: &[(&str, &str, &str, f64)] = &[
    ("Work", "Professional tasks and projects", "#007bff", 1.2),
    ("Personal", "Personal errands and chores", "#28a745", 1.0),
    ("Health & Fitness", "Exercise, nutrition and wellbeing", "#dc3545", 1.3),
    ("Learning", "Study, courses and reading", "#ffc107", 1.4),
    ("Social", "Friends, family and community", "#17a2b8", 1.0),
    ("Home", "Household maintenance", "#6f42c1", 0.9),
    ("Finance", "Budgeting, bills and paperwork", "#fd7e14", 1.1),
    ("Creative", "Art, writing and side projects", "#e83e8c", 1.2),
];

fn validate_multiplier(multiplier: f64) -> Result<f64, CategoryError> {
    if multiplier.is_finite() && multiplier > 0.0 {
        Ok(multiplier)
    } else {
        Err(CategoryError::InvalidMultiplier)
    }
}

fn validate_name(name: &str) -> Result<String, CategoryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CategoryError::EmptyName);
    }
    Ok(name.to_string())
}

fn map_unique_violation(e: sqlx::Error) -> CategoryError {
    match e {
        sqlx::Error::Database(ref db) if db.message().contains("UNIQUE constraint failed") => {
            CategoryError::DuplicateName
        }
        e => CategoryError::DatabaseError(e),
    }
}

/// Inserts the default categories for a freshly registered user.
pub async fn create_default_categories(
    conn: &mut SqliteConnection,
    user_id: &Uuid,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    for &(name, description, color, multiplier) in DEFAULT_CATEGORIES {
        sqlx::query(
            r#"
            INSERT INTO categories (id, user_id, name, description, color, xp_multiplier, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(name)
        .bind(description)
        .bind(color)
        .bind(multiplier)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub async fn create_category(
    pool: &SqlitePool,
    user_id: &Uuid,
    request: &CreateCategoryRequest,
) -> Result<Category, CategoryError> {
    let name = validate_name(&request.name)?;
    let xp_multiplier = validate_multiplier(request.xp_multiplier.unwrap_or(1.0))?;
    let id = Uuid::new_v4();
    let now = Utc::now();
    let description = request.description.clone().unwrap_or_default();
    let color = request
        .color
        .clone()
        .unwrap_or_else(|| DEFAULT_COLOR.to_string());

    sqlx::query(
        r#"
        INSERT INTO categories (id, user_id, name, description, color, xp_multiplier, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(&name)
    .bind(&description)
    .bind(&color)
    .bind(xp_multiplier)
    .bind(now)
    .execute(pool)
    .await
    .map_err(map_unique_violation)?;

    Ok(Category {
        id,
        user_id: *user_id,
        name,
        description,
        color,
        xp_multiplier,
        created_at: now,
    })
}

pub async fn get_category(
    pool: &SqlitePool,
    user_id: &Uuid,
    category_id: &Uuid,
) -> Result<Option<Category>, CategoryError> {
    let category: Option<CategoryRow> =
        sqlx::query_as("SELECT * FROM categories WHERE id = ? AND user_id = ?")
            .bind(category_id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(pool)
            .await?;

    Ok(category.map(|c| c.to_shared()))
}

pub async fn list_categories(
    pool: &SqlitePool,
    user_id: &Uuid,
) -> Result<Vec<Category>, CategoryError> {
    let categories: Vec<CategoryRow> =
        sqlx::query_as("SELECT * FROM categories WHERE user_id = ? ORDER BY name ASC")
            .bind(user_id.to_string())
            .fetch_all(pool)
            .await?;

    Ok(categories.into_iter().map(|c| c.to_shared()).collect())
}

pub async fn update_category(
    pool: &SqlitePool,
    user_id: &Uuid,
    category_id: &Uuid,
    request: &UpdateCategoryRequest,
) -> Result<Category, CategoryError> {
    let mut category: CategoryRow =
        sqlx::query_as("SELECT * FROM categories WHERE id = ? AND user_id = ?")
            .bind(category_id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(pool)
            .await?
            .ok_or(CategoryError::NotFound)?;

    if let Some(ref name) = request.name {
        category.name = validate_name(name)?;
    }
    if let Some(ref description) = request.description {
        category.description = description.clone();
    }
    if let Some(ref color) = request.color {
        category.color = color.clone();
    }
    if let Some(multiplier) = request.xp_multiplier {
        category.xp_multiplier = validate_multiplier(multiplier)?;
    }

    sqlx::query(
        r#"
        UPDATE categories
        SET name = ?, description = ?, color = ?, xp_multiplier = ?
        WHERE id = ?
        "#,
    )
    .bind(&category.name)
    .bind(&category.description)
    .bind(&category.color)
    .bind(category.xp_multiplier)
    .bind(category_id.to_string())
    .execute(pool)
    .await
    .map_err(map_unique_violation)?;

    Ok(category.to_shared())
}

/// Deletes a category that no task refers to.
pub async fn delete_category(
    pool: &SqlitePool,
    user_id: &Uuid,
    category_id: &Uuid,
) -> Result<(), CategoryError> {
    if get_category(pool, user_id, category_id).await?.is_none() {
        return Err(CategoryError::NotFound);
    }

    let task_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE category_id = ?")
        .bind(category_id.to_string())
        .fetch_one(pool)
        .await?;

    if task_count > 0 {
        return Err(CategoryError::InUse);
    }

    sqlx::query("DELETE FROM categories WHERE id = ? AND user_id = ?")
        .bind(category_id.to_string())
        .bind(user_id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{create_user, test_pool};

    fn request(name: &str, multiplier: Option<f64>) -> CreateCategoryRequest {
        CreateCategoryRequest {
            name: name.to_string(),
            description: None,
            color: None,
            xp_multiplier: multiplier,
        }
    }

    #[tokio::test]
    async fn test_create_category_defaults() {
        let pool = test_pool().await;
        let user_id = create_user(&pool, "maker").await;

        let category = create_category(&pool, &user_id, &request("  Errands ", None))
            .await
            .unwrap();

        assert_eq!(category.name, "Errands");
        assert_eq!(category.color, DEFAULT_COLOR);
        assert_eq!(category.xp_multiplier, 1.0);

        let fetched = get_category(&pool, &user_id, &category.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Errands");
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected() {
        let pool = test_pool().await;
        let user_id = create_user(&pool, "dupe").await;

        create_category(&pool, &user_id, &request("Work", None)).await.unwrap();
        let result = create_category(&pool, &user_id, &request("Work", Some(2.0))).await;
        assert!(matches!(result, Err(CategoryError::DuplicateName)));

        // names are only unique per user
        let other = create_user(&pool, "other").await;
        assert!(create_category(&pool, &other, &request("Work", None)).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_multiplier_and_name_are_rejected() {
        let pool = test_pool().await;
        let user_id = create_user(&pool, "validator").await;

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = create_category(&pool, &user_id, &request("Bad", Some(bad))).await;
            assert!(matches!(result, Err(CategoryError::InvalidMultiplier)));
        }

        let result = create_category(&pool, &user_id, &request("   ", None)).await;
        assert!(matches!(result, Err(CategoryError::EmptyName)));
    }

    #[tokio::test]
    async fn test_update_category() {
        let pool = test_pool().await;
        let user_id = create_user(&pool, "updater").await;
        let category = create_category(&pool, &user_id, &request("Study", None))
            .await
            .unwrap();

        let updated = update_category(
            &pool,
            &user_id,
            &category.id,
            &UpdateCategoryRequest {
                xp_multiplier: Some(1.5),
                color: Some("#ffc107".to_string()),
                ..UpdateCategoryRequest::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "Study");
        assert_eq!(updated.xp_multiplier, 1.5);
        assert_eq!(updated.color, "#ffc107");

        let result = update_category(
            &pool,
            &user_id,
            &category.id,
            &UpdateCategoryRequest {
                xp_multiplier: Some(0.0),
                ..UpdateCategoryRequest::default()
            },
        )
        .await;
        assert!(matches!(result, Err(CategoryError::InvalidMultiplier)));
    }

    #[tokio::test]
    async fn test_categories_are_private() {
        let pool = test_pool().await;
        let owner = create_user(&pool, "private").await;
        let other = create_user(&pool, "snoop").await;
        let category = create_category(&pool, &owner, &request("Secret", None))
            .await
            .unwrap();

        assert!(get_category(&pool, &other, &category.id).await.unwrap().is_none());
        assert!(list_categories(&pool, &other).await.unwrap().is_empty());
        let result = delete_category(&pool, &other, &category.id).await;
        assert!(matches!(result, Err(CategoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_category_in_use() {
        let pool = test_pool().await;
        let user_id = create_user(&pool, "deleter").await;
        let used = create_category(&pool, &user_id, &request("Used", None)).await.unwrap();
        let unused = create_category(&pool, &user_id, &request("Unused", None)).await.unwrap();

        let now = Utc::now();
        sqlx::query(
            "INSERT INTO tasks (id, user_id, category_id, title, difficulty, priority, created_at, updated_at) VALUES (?, ?, ?, 'Task', 'easy', 'low', ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(used.id.to_string())
        .bind(now)
        .bind(now)
        .execute(&pool)
        .await
        .unwrap();

        let result = delete_category(&pool, &user_id, &used.id).await;
        assert!(matches!(result, Err(CategoryError::InUse)));

        delete_category(&pool, &user_id, &unused.id).await.unwrap();
        let names: Vec<String> = list_categories(&pool, &user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Used".to_string()]);
    }

    #[tokio::test]
    async fn test_default_categories() {
        let pool = test_pool().await;
        let user_id = create_user(&pool, "newcomer").await;
        {
            let mut conn = pool.acquire().await.unwrap();
            create_default_categories(&mut conn, &user_id, Utc::now())
                .await
                .unwrap();
        }

        let categories = list_categories(&pool, &user_id).await.unwrap();
        assert_eq!(categories.len(), DEFAULT_CATEGORIES.len());
        let learning = categories.iter().find(|c| c.name == "Learning").unwrap();
        assert_eq!(learning.xp_multiplier, 1.4);
    }
}
