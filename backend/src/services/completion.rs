use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CategoryRow, TaskRow};
use crate::services::achievements::{self, AchievementError};
use crate::services::leveling::LevelCurve;
use crate::services::streaks::{self, StreakError};
use crate::services::timing::{self, TimingPolicy};
use crate::services::xp::{self, XpError, XpSource};
use shared::CompletionResult;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Task not found")]
    NotFound,
    #[error("Task is already completed")]
    AlreadyCompleted,
    #[error("{0}")]
    TimingRestriction(String),
    #[error("Completion on {attempted} precedes the last recorded completion on {last}")]
    InvalidOrdering {
        last: NaiveDate,
        attempted: NaiveDate,
    },
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl From<StreakError> for CompletionError {
    fn from(e: StreakError) -> Self {
        match e {
            StreakError::InvalidOrdering { last, attempted } => {
                CompletionError::InvalidOrdering { last, attempted }
            }
            StreakError::DatabaseError(e) => CompletionError::DatabaseError(e),
        }
    }
}

impl From<XpError> for CompletionError {
    fn from(e: XpError) -> Self {
        match e {
            XpError::DatabaseError(e) => CompletionError::DatabaseError(e),
        }
    }
}

impl From<AchievementError> for CompletionError {
    fn from(e: AchievementError) -> Self {
        match e {
            AchievementError::DatabaseError(e) => CompletionError::DatabaseError(e),
        }
    }
}

/// Completes a task and applies everything that follows from it: task XP,
/// the streak and its bonus, and newly earned achievements. All of it is
/// committed in one transaction or not at all.
pub async fn complete_task(
    pool: &SqlitePool,
    curve: &LevelCurve,
    policy: &TimingPolicy,
    task_id: &Uuid,
    user_id: &Uuid,
    now: DateTime<Utc>,
) -> Result<CompletionResult, CompletionError> {
    let mut tx = pool.begin().await?;

    // Write before reading so concurrent completions for this user queue
    // on the database lock instead of reading stale totals.
    streaks::touch_profile(&mut tx, user_id, now).await?;

    let task: TaskRow = sqlx::query_as("SELECT * FROM tasks WHERE id = ? AND user_id = ?")
        .bind(task_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CompletionError::NotFound)?;
    let mut task = task.to_shared();

    if task.is_completed {
        return Err(CompletionError::AlreadyCompleted);
    }

    if let Err(reason) = policy.check(task.difficulty, task.created_at, task.due_date, now) {
        log::debug!("Completion of task {} refused: {}", task.id, reason);
        return Err(CompletionError::TimingRestriction(reason));
    }

    let category: Option<CategoryRow> = sqlx::query_as("SELECT * FROM categories WHERE id = ?")
        .bind(task.category_id.to_string())
        .fetch_optional(&mut *tx)
        .await?;
    let multiplier = category.map(|c| c.xp_multiplier).unwrap_or(1.0);

    let old_total = xp::total_xp(&mut tx, user_id).await?;
    let old_level = curve.level_for(old_total).level;

    let xp_earned = xp::task_xp(task.difficulty, multiplier);

    let updated = sqlx::query(
        r#"
        UPDATE tasks SET is_completed = 1, completed_at = ?, xp_value = ?, updated_at = ?
        WHERE id = ? AND user_id = ? AND is_completed = 0
        "#,
    )
    .bind(now)
    .bind(xp_earned)
    .bind(now)
    .bind(task_id.to_string())
    .bind(user_id.to_string())
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(CompletionError::AlreadyCompleted);
    }

    task.is_completed = true;
    task.completed_at = Some(now);
    task.xp_value = xp_earned;
    task.updated_at = now;

    xp::append(
        &mut tx,
        user_id,
        XpSource::Task(task.id),
        xp_earned,
        &format!("Completed task: {}", task.title),
        now,
    )
    .await?;

    let today = now.date_naive();
    let streak = streaks::record_completion(&mut tx, user_id, today, now).await?;

    let mut streak_bonus_xp = 0;
    if let Some(bonus) = streaks::streak_bonus(&streak) {
        xp::append(
            &mut tx,
            user_id,
            XpSource::Streak,
            bonus,
            &format!("{}-day streak bonus", streak.current_streak),
            now,
        )
        .await?;
        streak_bonus_xp = bonus;
    }

    let stats = achievements::gather_stats(&mut tx, user_id, curve, today).await?;
    let new_achievements = achievements::evaluate(&mut tx, user_id, &stats, now).await?;
    let achievement_xp: i64 = new_achievements
        .iter()
        .map(|a| a.achievement.xp_reward)
        .sum();

    let total_xp = xp::total_xp(&mut tx, user_id).await?;
    let progress = curve.level_for(total_xp);

    tx.commit().await?;

    let timing_status = timing::classify(task.created_at, task.due_date, now);

    log::info!(
        "User {} completed task {} for {} XP (streak {}, level {} -> {})",
        user_id,
        task.id,
        xp_earned,
        streak.current_streak,
        old_level,
        progress.level
    );

    Ok(CompletionResult {
        task,
        xp_earned,
        streak_bonus_xp,
        achievement_xp,
        total_xp,
        leveled_up: progress.level > old_level,
        old_level,
        new_level: progress.level,
        progress,
        new_achievements,
        current_streak: streak.current_streak,
        longest_streak: streak.longest_streak,
        timing_status,
    })
}
