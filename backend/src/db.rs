use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::Config;

/// Opens the pool. Foreign keys are enforced and writers wait on each
/// other for up to five seconds instead of failing with `SQLITE_BUSY`.
pub async fn connect(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect_with(connect_options(&config.database_url)?)
        .await
}

fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    Ok(SqliteConnectOptions::from_str(database_url)?
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5)))
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
pub mod test_support {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    /// In-memory database with the schema applied. A single connection that
    /// never expires keeps the database alive for the whole test.
    pub async fn test_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        migrate(&pool).await.unwrap();
        pool
    }

    /// Database file under `dir` with the production connection settings,
    /// for tests that need several connections writing at once.
    pub async fn file_pool(dir: &std::path::Path, max_connections: u32) -> SqlitePool {
        let url = format!("sqlite:{}?mode=rwc", dir.join("levelup.db").display());
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options(&url).unwrap())
            .await
            .unwrap();
        migrate(&pool).await.unwrap();
        pool
    }

    /// Inserts a bare user row and returns its id.
    pub async fn create_user(pool: &SqlitePool, username: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(username)
        .bind(format!("{}@example.com", username))
        .bind("not-a-real-hash")
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    /// Inserts a category for `user_id` and returns its id.
    pub async fn create_category(
        pool: &SqlitePool,
        user_id: &Uuid,
        name: &str,
        xp_multiplier: f64,
    ) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO categories (id, user_id, name, description, color, xp_multiplier, created_at) VALUES (?, ?, ?, '', '#007bff', ?, ?)",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(name)
        .bind(xp_multiplier)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
        id
    }
}
