use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AchievementRow, UserAchievementRow};
use crate::services::leveling::LevelCurve;
use crate::services::streaks;
use crate::services::timing;
use crate::services::xp::{self, XpError, XpSource};
use shared::{Achievement, AchievementStatus, AchievementType, TimingStatus, UnlockedAchievement};

#[derive(Debug, Error)]
pub enum AchievementError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl From<XpError> for AchievementError {
    fn from(e: XpError) -> Self {
        match e {
            XpError::DatabaseError(e) => AchievementError::DatabaseError(e),
        }
    }
}

/// The figures achievements are measured against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserStats {
    pub tasks_completed: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub total_xp: i64,
    pub level: i64,
    pub category_counts: HashMap<Uuid, i64>,
    pub early_completions: i64,
}

/// The stat an achievement's threshold is compared with.
pub fn stat_for(achievement: &Achievement, stats: &UserStats) -> i64 {
    match achievement.achievement_type {
        AchievementType::TaskCount => stats.tasks_completed,
        AchievementType::Streak => stats.current_streak,
        AchievementType::Level => stats.level,
        AchievementType::Xp => stats.total_xp,
        AchievementType::Category => match achievement.category_id {
            Some(id) => stats.category_counts.get(&id).copied().unwrap_or(0),
            None => stats.category_counts.values().copied().max().unwrap_or(0),
        },
        AchievementType::EarlyCompletion => stats.early_completions,
    }
}

/// Achievements not yet unlocked whose stat has reached the threshold.
pub fn newly_crossed<'a>(
    achievements: &'a [Achievement],
    unlocked: &HashSet<Uuid>,
    stats: &UserStats,
) -> Vec<&'a Achievement> {
    achievements
        .iter()
        .filter(|a| !unlocked.contains(&a.id))
        .filter(|a| stat_for(a, stats) >= a.threshold)
        .collect()
}

pub async fn list_achievements(
    conn: &mut SqliteConnection,
) -> Result<Vec<Achievement>, AchievementError> {
    let rows: Vec<AchievementRow> =
        sqlx::query_as("SELECT * FROM achievements ORDER BY achievement_type, threshold")
            .fetch_all(&mut *conn)
            .await?;

    Ok(rows.iter().filter_map(|r| r.to_shared()).collect())
}

async fn unlock_rows(
    conn: &mut SqliteConnection,
    user_id: &Uuid,
) -> Result<Vec<UserAchievementRow>, AchievementError> {
    let rows: Vec<UserAchievementRow> = sqlx::query_as(
        "SELECT achievement_id, progress, unlocked_at FROM user_achievements WHERE user_id = ? ORDER BY unlocked_at DESC",
    )
    .bind(user_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Reads the user's current stats. Early completions are classified here
/// rather than in SQL because timestamps are stored as text.
pub async fn gather_stats(
    conn: &mut SqliteConnection,
    user_id: &Uuid,
    curve: &LevelCurve,
    today: NaiveDate,
) -> Result<UserStats, AchievementError> {
    let tasks_completed: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE user_id = ? AND is_completed = 1")
            .bind(user_id.to_string())
            .fetch_one(&mut *conn)
            .await?;

    let per_category: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT category_id, COUNT(*) FROM tasks
        WHERE user_id = ? AND is_completed = 1
        GROUP BY category_id
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    let category_counts = per_category
        .into_iter()
        .filter_map(|(id, count)| Uuid::parse_str(&id).ok().map(|id| (id, count)))
        .collect();

    let deadlines: Vec<(DateTime<Utc>, Option<DateTime<Utc>>, Option<DateTime<Utc>>)> =
        sqlx::query_as(
            r#"
            SELECT created_at, due_date, completed_at FROM tasks
            WHERE user_id = ? AND is_completed = 1 AND due_date IS NOT NULL
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    let early_completions = deadlines
        .iter()
        .filter_map(|(created, due, completed)| {
            completed.map(|c| timing::classify(*created, *due, c))
        })
        .filter(|status| *status == TimingStatus::Early)
        .count() as i64;

    let streak = streaks::load_state(conn, user_id).await?;
    let total_xp = xp::total_xp(conn, user_id).await?;

    Ok(UserStats {
        tasks_completed,
        current_streak: streak.effective_current(today) as i64,
        longest_streak: streak.longest_streak as i64,
        total_xp,
        level: curve.level_for(total_xp).level as i64,
        category_counts,
        early_completions,
    })
}

/// Unlocks every achievement `stats` now satisfies and credits its reward.
/// Rewards earned here are not fed back into `stats`; anything they would
/// unlock is picked up on the next evaluation.
pub async fn evaluate(
    conn: &mut SqliteConnection,
    user_id: &Uuid,
    stats: &UserStats,
    now: DateTime<Utc>,
) -> Result<Vec<UnlockedAchievement>, AchievementError> {
    let achievements = list_achievements(conn).await?;
    let unlocked: HashSet<Uuid> = unlock_rows(conn, user_id)
        .await?
        .iter()
        .filter_map(|r| Uuid::parse_str(&r.achievement_id).ok())
        .collect();

    let mut newly_unlocked = Vec::new();

    for achievement in newly_crossed(&achievements, &unlocked, stats) {
        let progress = stat_for(achievement, stats);

        let result = sqlx::query(
            r#"
            INSERT INTO user_achievements (id, user_id, achievement_id, progress, unlocked_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, achievement_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(achievement.id.to_string())
        .bind(progress)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() != 1 {
            continue;
        }

        xp::append(
            conn,
            user_id,
            XpSource::Achievement(achievement.id),
            achievement.xp_reward,
            &format!("Achievement unlocked: {}", achievement.name),
            now,
        )
        .await?;

        log::info!(
            "User {} unlocked achievement '{}' (+{} XP)",
            user_id,
            achievement.name,
            achievement.xp_reward
        );

        newly_unlocked.push(UnlockedAchievement {
            achievement: achievement.clone(),
            progress,
            unlocked_at: now,
        });
    }

    Ok(newly_unlocked)
}

/// Every achievement with the user's progress toward it. Hidden ones are
/// left out until unlocked.
pub async fn achievement_status(
    pool: &SqlitePool,
    user_id: &Uuid,
    curve: &LevelCurve,
    today: NaiveDate,
) -> Result<Vec<AchievementStatus>, AchievementError> {
    let mut conn = pool.acquire().await?;

    let stats = gather_stats(&mut conn, user_id, curve, today).await?;
    let achievements = list_achievements(&mut conn).await?;
    let unlocked: HashMap<Uuid, DateTime<Utc>> = unlock_rows(&mut conn, user_id)
        .await?
        .iter()
        .filter_map(|r| {
            Uuid::parse_str(&r.achievement_id)
                .ok()
                .map(|id| (id, r.unlocked_at))
        })
        .collect();

    Ok(achievements
        .into_iter()
        .filter_map(|achievement| {
            let unlocked_at = unlocked.get(&achievement.id).copied();
            if achievement.is_hidden && unlocked_at.is_none() {
                return None;
            }
            let progress = stat_for(&achievement, &stats);
            Some(AchievementStatus::new(achievement, unlocked_at, progress))
        })
        .collect())
}

/// Achievements the user has unlocked, most recent first.
pub async fn list_unlocked(
    pool: &SqlitePool,
    user_id: &Uuid,
) -> Result<Vec<UnlockedAchievement>, AchievementError> {
    let mut conn = pool.acquire().await?;

    let by_id: HashMap<Uuid, Achievement> = list_achievements(&mut conn)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    Ok(unlock_rows(&mut conn, user_id)
        .await?
        .into_iter()
        .filter_map(|row| {
            let id = Uuid::parse_str(&row.achievement_id).ok()?;
            by_id.get(&id).map(|achievement| UnlockedAchievement {
                achievement: achievement.clone(),
                progress: row.progress,
                unlocked_at: row.unlocked_at,
            })
        })
        .collect())
}

struct DefaultAchievement {
    name: &'static str,
    description: &'static str,
    achievement_type: AchievementType,
    icon: &'static str,
    threshold: i64,
    xp_reward: i64,
    is_hidden: bool,
}

const fn default_achievement(
    achievement_type: AchievementType,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    threshold: i64,
    xp_reward: i64,
    is_hidden: bool,
) -> DefaultAchievement {
    DefaultAchievement {
        name,
        description,
        achievement_type,
        icon,
        threshold,
        xp_reward,
        is_hidden,
    }
}

const DEFAULT_ACHIEVEMENTS: &[DefaultAchievement] = &[
    default_achievement(AchievementType::TaskCount, "First Steps", "Complete your first task", "🎯", 1, 25, false),
    default_achievement(AchievementType::TaskCount, "Getting Started", "Complete 10 tasks", "📝", 10, 100, false),
    default_achievement(AchievementType::TaskCount, "Task Master", "Complete 50 tasks", "⭐", 50, 250, false),
    default_achievement(AchievementType::TaskCount, "Productivity Legend", "Complete 100 tasks", "🏆", 100, 500, false),
    default_achievement(AchievementType::TaskCount, "Task Conqueror", "Complete 500 tasks", "👑", 500, 1000, true),
    default_achievement(AchievementType::Streak, "Consistency", "Maintain a 3-day streak", "🔥", 3, 50, false),
    default_achievement(AchievementType::Streak, "Weekly Warrior", "Maintain a 7-day streak", "🌟", 7, 150, false),
    default_achievement(AchievementType::Streak, "Monthly Master", "Maintain a 30-day streak", "🎖️", 30, 500, false),
    default_achievement(AchievementType::Streak, "Unstoppable", "Maintain a 100-day streak", "💎", 100, 1500, true),
    default_achievement(AchievementType::Level, "Level Up!", "Reach level 5", "🆙", 5, 100, false),
    default_achievement(AchievementType::Level, "Rising Star", "Reach level 10", "🌠", 10, 250, false),
    default_achievement(AchievementType::Level, "Expert Level", "Reach level 25", "🎓", 25, 750, false),
    default_achievement(AchievementType::Level, "Grandmaster", "Reach level 50", "🧙‍♂️", 50, 2000, true),
    default_achievement(AchievementType::Xp, "First Thousand", "Earn 1,000 XP", "💰", 1000, 100, false),
    default_achievement(AchievementType::Xp, "XP Collector", "Earn 5,000 XP", "💎", 5000, 500, false),
    default_achievement(AchievementType::Xp, "XP Millionaire", "Earn 10,000 XP", "🏦", 10000, 1000, true),
    default_achievement(AchievementType::Category, "Category Specialist", "Complete 25 tasks in any single category", "🎯", 25, 200, false),
    default_achievement(AchievementType::Category, "Category Expert", "Complete 50 tasks in any single category", "🏅", 50, 400, false),
    default_achievement(AchievementType::Category, "Category Master", "Complete 100 tasks in any single category", "🎖️", 100, 800, true),
    default_achievement(AchievementType::EarlyCompletion, "Ahead of Schedule", "Complete 10 tasks early", "⏱️", 10, 150, false),
    default_achievement(AchievementType::EarlyCompletion, "Time Lord", "Complete 50 tasks early", "⌛", 50, 600, true),
];

/// Installs the default catalogue when no achievements exist yet. Returns
/// how many were inserted.
pub async fn seed_default_achievements(
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> Result<usize, AchievementError> {
    let mut tx = pool.begin().await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM achievements")
        .fetch_one(&mut *tx)
        .await?;
    if existing > 0 {
        return Ok(0);
    }

    for a in DEFAULT_ACHIEVEMENTS {
        sqlx::query(
            r#"
            INSERT INTO achievements (id, name, description, achievement_type, icon, threshold, xp_reward, is_hidden, category_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(a.name)
        .bind(a.description)
        .bind(a.achievement_type.as_str())
        .bind(a.icon)
        .bind(a.threshold)
        .bind(a.xp_reward)
        .bind(a.is_hidden)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    log::info!("Seeded {} default achievements", DEFAULT_ACHIEVEMENTS.len());

    Ok(DEFAULT_ACHIEVEMENTS.len())
}
