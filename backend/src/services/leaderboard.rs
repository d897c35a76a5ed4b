use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{TaskRow, UserRow, XpLogRow};
use crate::services::{streaks, timing};
use shared::{Leaderboard, LeaderboardEntry, LeaderboardPeriod, TimingStatus};

const TASK_POINTS: i64 = 10;
const STREAK_POINTS: i64 = 5;
const PUNCTUALITY_POINTS: i64 = 2;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Share of deadline tasks finished early or on time, 0-100. Users without
/// any deadline task count as fully punctual.
pub fn punctuality_rate(statuses: &[TimingStatus]) -> i32 {
    let timed = statuses
        .iter()
        .filter(|s| **s != TimingStatus::NoDeadline)
        .count();
    if timed == 0 {
        return 100;
    }
    let punctual = statuses
        .iter()
        .filter(|s| matches!(s, TimingStatus::Early | TimingStatus::OnTime))
        .count();
    ((punctual as f64 / timed as f64) * 100.0) as i32
}

pub fn score(tasks_completed: i64, total_xp: i64, current_streak: i32, punctuality_rate: i32) -> i64 {
    tasks_completed * TASK_POINTS
        + total_xp
        + current_streak as i64 * STREAK_POINTS
        + punctuality_rate as i64 * PUNCTUALITY_POINTS
}

/// Orders entries by score, highest first, with ties going to the
/// alphabetically first username, and numbers them from 1.
pub fn rank(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.username.cmp(&b.username)));
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i as i64 + 1;
    }
    entries
}

/// Ranks every user who completed a task in the period. Scores combine
/// completions and XP inside the window with the current streak and the
/// all-time punctuality rate.
pub async fn leaderboard(
    pool: &SqlitePool,
    user_id: &Uuid,
    period: LeaderboardPeriod,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Leaderboard, LeaderboardError> {
    let since = period.start(now);
    let in_window = |at: &DateTime<Utc>| since.map_or(true, |start| *at >= start) && *at <= now;

    let tasks: Vec<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE is_completed = 1")
        .fetch_all(pool)
        .await?;

    let mut statuses: HashMap<&str, Vec<TimingStatus>> = HashMap::new();
    let mut completed_in_window: HashMap<&str, i64> = HashMap::new();
    for task in &tasks {
        let completed_at = match task.completed_at {
            Some(c) => c,
            None => continue,
        };
        statuses
            .entry(task.user_id.as_str())
            .or_default()
            .push(timing::classify(task.created_at, task.due_date, completed_at));
        if in_window(&completed_at) {
            *completed_in_window.entry(task.user_id.as_str()).or_default() += 1;
        }
    }

    let xp_rows: Vec<XpLogRow> = sqlx::query_as("SELECT * FROM xp_logs").fetch_all(pool).await?;
    let mut xp_in_window: HashMap<&str, i64> = HashMap::new();
    for row in xp_rows.iter().filter(|r| in_window(&r.created_at)) {
        *xp_in_window.entry(row.user_id.as_str()).or_default() += row.amount;
    }

    let users: Vec<UserRow> = sqlx::query_as("SELECT * FROM users").fetch_all(pool).await?;

    let mut conn = pool.acquire().await?;
    let today = now.date_naive();
    let mut entries = Vec::new();
    for user in &users {
        let tasks_completed = match completed_in_window.get(user.id.as_str()) {
            Some(count) => *count,
            None => continue,
        };
        let id = Uuid::parse_str(&user.id).unwrap_or_default();
        let current_streak = streaks::load_state(&mut conn, &id)
            .await?
            .effective_current(today);
        let total_xp = xp_in_window.get(user.id.as_str()).copied().unwrap_or(0);
        let punctuality = punctuality_rate(
            statuses
                .get(user.id.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default(),
        );

        entries.push(LeaderboardEntry {
            rank: 0,
            user_id: id,
            username: user.username.clone(),
            score: score(tasks_completed, total_xp, current_streak, punctuality),
            tasks_completed,
            total_xp,
            current_streak,
            punctuality_rate: punctuality,
        });
    }

    let ranked = rank(entries);
    let current_user = ranked.iter().find(|e| e.user_id == *user_id).cloned();

    log::debug!("Leaderboard {:?}: {} ranked users", period, ranked.len());

    Ok(Leaderboard {
        period,
        entries: ranked.into_iter().take(limit).collect(),
        current_user,
    })
}
