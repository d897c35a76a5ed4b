use chrono::NaiveDate;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::services::leveling::LevelCurve;
use crate::services::streaks;
use crate::services::xp::{self, XpError};
use shared::LevelInfo;

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl From<XpError> for ProgressError {
    fn from(err: XpError) -> Self {
        match err {
            XpError::DatabaseError(e) => ProgressError::DatabaseError(e),
        }
    }
}

/// Level and streak snapshot for a user. A streak whose last completion is
/// older than yesterday is reported as 0.
pub async fn get_level_info(
    pool: &SqlitePool,
    user_id: &Uuid,
    curve: &LevelCurve,
    today: NaiveDate,
) -> Result<LevelInfo, ProgressError> {
    let mut conn = pool.acquire().await?;
    let total_xp = xp::total_xp(&mut conn, user_id).await?;
    let streak = streaks::load_state(&mut conn, user_id).await?;

    let progress = curve.level_for(total_xp);

    Ok(LevelInfo {
        total_xp,
        current_level: progress.level,
        xp_for_current_level: progress.xp_for_current_level,
        xp_for_next_level: progress.xp_for_next_level,
        xp_progress_in_level: progress.xp_into_level,
        xp_needed_for_next_level: progress.xp_to_next_level,
        progress_percentage: progress.progress_percentage(),
        current_streak: streak.effective_current(today),
        longest_streak: streak.longest_streak,
        last_completion_date: streak.last_completion_date,
    })
}
