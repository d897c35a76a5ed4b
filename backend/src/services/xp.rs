use chrono::{DateTime, Duration, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{XpActionTotalRow, XpLogRow};
use shared::{Difficulty, XpAction, XpBreakdown, XpLogEntry};

#[derive(Debug, Error)]
pub enum XpError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// What a ledger entry was awarded for. The stored action follows from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XpSource {
    Task(Uuid),
    Streak,
    Achievement(Uuid),
}

impl XpSource {
    pub fn action(&self) -> XpAction {
        match self {
            XpSource::Task(_) => XpAction::TaskComplete,
            XpSource::Streak => XpAction::StreakBonus,
            XpSource::Achievement(_) => XpAction::Achievement,
        }
    }

    fn task_id(&self) -> Option<Uuid> {
        match self {
            XpSource::Task(id) => Some(*id),
            _ => None,
        }
    }

    fn achievement_id(&self) -> Option<Uuid> {
        match self {
            XpSource::Achievement(id) => Some(*id),
            _ => None,
        }
    }
}

/// XP for completing a task: the difficulty's base XP scaled by the
/// category multiplier, rounded half up, never below 1.
pub fn task_xp(difficulty: Difficulty, xp_multiplier: f64) -> i64 {
    let scaled = (difficulty.base_xp() as f64 * xp_multiplier + 0.5).floor();
    if scaled.is_finite() {
        (scaled as i64).max(1)
    } else {
        1
    }
}

/// Appends a ledger entry. Non-positive amounts are not recorded and yield
/// `None`.
pub async fn append(
    conn: &mut SqliteConnection,
    user_id: &Uuid,
    source: XpSource,
    amount: i64,
    description: &str,
    now: DateTime<Utc>,
) -> Result<Option<XpLogEntry>, XpError> {
    if amount <= 0 {
        return Ok(None);
    }

    let id = Uuid::new_v4();
    let action = source.action();

    sqlx::query(
        r#"
        INSERT INTO xp_logs (id, user_id, action, amount, task_id, achievement_id, description, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(action.as_str())
    .bind(amount)
    .bind(source.task_id().map(|t| t.to_string()))
    .bind(source.achievement_id().map(|a| a.to_string()))
    .bind(description)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(Some(XpLogEntry {
        id,
        user_id: *user_id,
        action,
        amount,
        task_id: source.task_id(),
        achievement_id: source.achievement_id(),
        description: description.to_string(),
        created_at: now,
    }))
}

/// Sum of all of a user's ledger entries.
pub async fn total_xp(conn: &mut SqliteConnection, user_id: &Uuid) -> Result<i64, XpError> {
    let total: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM xp_logs WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_one(&mut *conn)
            .await?;

    Ok(total)
}

/// Most recent entries first.
pub async fn list_entries(
    pool: &SqlitePool,
    user_id: &Uuid,
    limit: i64,
) -> Result<Vec<XpLogEntry>, XpError> {
    let rows: Vec<XpLogRow> = sqlx::query_as(
        "SELECT * FROM xp_logs WHERE user_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
    )
    .bind(user_id.to_string())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().filter_map(|r| r.to_shared()).collect())
}

/// Totals per action plus everything earned in the seven days before `now`.
pub async fn breakdown(
    pool: &SqlitePool,
    user_id: &Uuid,
    now: DateTime<Utc>,
) -> Result<XpBreakdown, XpError> {
    let totals: Vec<XpActionTotalRow> = sqlx::query_as(
        r#"
        SELECT action, COALESCE(SUM(amount), 0) AS total_xp, COUNT(*) AS count
        FROM xp_logs
        WHERE user_id = ?
        GROUP BY action
        ORDER BY total_xp DESC
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    let rows: Vec<XpLogRow> = sqlx::query_as(
        "SELECT * FROM xp_logs WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    let since = now - Duration::days(7);
    let recent_activity: Vec<XpLogEntry> = rows
        .iter()
        .filter(|r| r.created_at >= since)
        .filter_map(|r| r.to_shared())
        .collect();

    let by_action: Vec<_> = totals.iter().filter_map(|t| t.to_shared()).collect();
    let total_xp = by_action.iter().map(|t| t.total_xp).sum();

    Ok(XpBreakdown {
        by_action,
        recent_activity,
        total_xp,
    })
}
