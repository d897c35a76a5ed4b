use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::models::ProgressProfileRow;
use shared::StreakInfo;

/// Every streak that reaches a multiple of this many days earns a bonus.
pub const STREAK_BONUS_INTERVAL: i32 = 7;
pub const STREAK_BONUS_XP_PER_DAY: i64 = 5;

#[derive(Debug, Error)]
pub enum StreakError {
    #[error("Completion on {attempted} precedes the last recorded completion on {last}")]
    InvalidOrdering {
        last: NaiveDate,
        attempted: NaiveDate,
    },
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakState {
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_completion_date: Option<NaiveDate>,
}

/// Outcome of recording one completion day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakUpdate {
    pub current_streak: i32,
    pub longest_streak: i32,
    /// False when the day had already been counted.
    pub extended: bool,
}

impl StreakState {
    /// Counts a completion on `date`: a second completion on the same day
    /// changes nothing, the following day extends the streak and any later
    /// day starts a new one.
    pub fn advance(&mut self, date: NaiveDate) -> Result<StreakUpdate, StreakError> {
        let extended = match self.last_completion_date {
            Some(last) if date < last => {
                return Err(StreakError::InvalidOrdering {
                    last,
                    attempted: date,
                })
            }
            Some(last) if date == last => false,
            Some(last) if last.succ_opt() == Some(date) => {
                self.current_streak += 1;
                true
            }
            _ => {
                self.current_streak = 1;
                true
            }
        };

        self.last_completion_date = Some(date);
        self.longest_streak = self.longest_streak.max(self.current_streak);

        Ok(StreakUpdate {
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            extended,
        })
    }

    /// The streak as seen on `today`: one that was not continued yesterday
    /// or today has lapsed.
    pub fn effective_current(&self, today: NaiveDate) -> i32 {
        match self.last_completion_date {
            Some(last) if last >= today - Duration::days(1) => self.current_streak,
            _ => 0,
        }
    }

    pub fn to_info(&self) -> StreakInfo {
        StreakInfo {
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            last_completion_date: self.last_completion_date,
        }
    }
}

impl From<&ProgressProfileRow> for StreakState {
    fn from(row: &ProgressProfileRow) -> Self {
        Self {
            current_streak: row.current_streak,
            longest_streak: row.longest_streak,
            last_completion_date: row.last_completion_date,
        }
    }
}

/// Bonus XP owed for an update, if the streak was just extended onto a
/// multiple of seven days.
pub fn streak_bonus(update: &StreakUpdate) -> Option<i64> {
    (update.extended
        && update.current_streak > 0
        && update.current_streak % STREAK_BONUS_INTERVAL == 0)
        .then(|| update.current_streak as i64 * STREAK_BONUS_XP_PER_DAY)
}

/// Rebuilds a streak from completion dates in any order.
pub fn streak_from_dates(dates: &[NaiveDate]) -> StreakState {
    let mut sorted = dates.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut state = StreakState::default();
    for date in sorted {
        // ascending, so advance never reports InvalidOrdering
        state.advance(date).ok();
    }
    state
}

/// Ensures the user's progress row exists and writes to it. Run first in a
/// transaction, this takes the database write lock before anything is read.
pub async fn touch_profile(
    conn: &mut SqliteConnection,
    user_id: &Uuid,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO progress_profiles (user_id, updated_at) VALUES (?, ?)
        ON CONFLICT(user_id) DO UPDATE SET updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id.to_string())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn load_state(
    conn: &mut SqliteConnection,
    user_id: &Uuid,
) -> Result<StreakState, sqlx::Error> {
    let row: Option<ProgressProfileRow> = sqlx::query_as(
        "SELECT current_streak, longest_streak, last_completion_date FROM progress_profiles WHERE user_id = ?",
    )
    .bind(user_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.as_ref().map(StreakState::from).unwrap_or_default())
}

async fn save_state(
    conn: &mut SqliteConnection,
    user_id: &Uuid,
    state: &StreakState,
    now: DateTime<Utc>,
) -> Result<(), StreakError> {
    sqlx::query(
        r#"
        INSERT INTO progress_profiles (user_id, current_streak, longest_streak, last_completion_date, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            current_streak = excluded.current_streak,
            longest_streak = excluded.longest_streak,
            last_completion_date = excluded.last_completion_date,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id.to_string())
    .bind(state.current_streak)
    .bind(state.longest_streak)
    .bind(state.last_completion_date)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Records a completion on `date` against the stored streak.
pub async fn record_completion(
    conn: &mut SqliteConnection,
    user_id: &Uuid,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<StreakUpdate, StreakError> {
    let mut state = load_state(conn, user_id).await?;
    let update = state.advance(date)?;
    if update.extended {
        save_state(conn, user_id, &state, now).await?;
    }
    Ok(update)
}

pub async fn get_streak(pool: &SqlitePool, user_id: &Uuid) -> Result<StreakState, StreakError> {
    let mut conn = pool.acquire().await?;
    Ok(load_state(&mut conn, user_id).await?)
}

/// Recomputes the stored streak from the user's completed tasks.
pub async fn recalculate_streak(
    pool: &SqlitePool,
    user_id: &Uuid,
    now: DateTime<Utc>,
) -> Result<StreakInfo, StreakError> {
    let mut tx = pool.begin().await?;
    touch_profile(&mut tx, user_id, now).await?;

    let completed: Vec<Option<DateTime<Utc>>> = sqlx::query_scalar(
        "SELECT completed_at FROM tasks WHERE user_id = ? AND is_completed = 1",
    )
    .bind(user_id.to_string())
    .fetch_all(&mut *tx)
    .await?;

    let dates: Vec<NaiveDate> = completed
        .into_iter()
        .flatten()
        .map(|c| c.date_naive())
        .collect();
    let state = streak_from_dates(&dates);
    save_state(&mut tx, user_id, &state, now).await?;

    tx.commit().await?;

    log::info!(
        "Recalculated streak for user {}: current {}, longest {}",
        user_id,
        state.current_streak,
        state.longest_streak
    );

    Ok(state.to_info())
}
