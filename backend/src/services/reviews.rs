use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CategoryRow, TaskRow, WeeklyReviewRow, XpLogRow};
use crate::services::timing;
use shared::{
    performance_grade, CategoryPerformance, PerformanceSummary, ReviewTrend, TimingStatus,
    WeeklyReview,
};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Monday of the week containing `date`.
pub fn get_week_start(date: NaiveDate) -> NaiveDate {
    date - chrono::Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Sunday of the week starting on `week_start`.
pub fn get_week_end(week_start: NaiveDate) -> NaiveDate {
    week_start + chrono::Duration::days(6)
}

/// What happened in one week, before it is scored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeekFigures {
    pub total_tasks: i64,
    pub total_xp: i64,
    pub early: i64,
    pub on_time: i64,
    pub late: i64,
    pub category_breakdown: BTreeMap<String, CategoryPerformance>,
}

/// Timing (up to 100) plus productivity (up to 50), capped at 100.
pub fn performance_score(figures: &WeekFigures) -> i32 {
    let timing_score = if figures.total_tasks > 0 {
        (((figures.early as f64 * 2.0 + figures.on_time as f64 * 1.5)
            / figures.total_tasks as f64)
            * 50.0)
            .min(100.0)
    } else {
        0.0
    };
    let productivity_score = (figures.total_tasks as f64 / 7.0 * 20.0).min(50.0);

    ((timing_score + productivity_score) as i32).clamp(0, 100)
}

pub fn suggestions(figures: &WeekFigures) -> Vec<String> {
    let mut suggestions = Vec::new();

    if figures.total_tasks < 5 {
        suggestions.push(
            "📈 Try to complete at least 5 tasks per week to maintain good productivity."
                .to_string(),
        );
    } else if figures.total_tasks >= 20 {
        suggestions.push(
            "🌟 Excellent productivity! You completed a high number of tasks this week."
                .to_string(),
        );
    }

    let timed = figures.early + figures.on_time + figures.late;
    if timed > 0 {
        let late_pct = figures.late as f64 / timed as f64 * 100.0;
        let early_pct = figures.early as f64 / timed as f64 * 100.0;

        if late_pct > 30.0 {
            suggestions.push(
                "⏰ Consider setting more realistic deadlines - 30%+ of your tasks were completed late."
                    .to_string(),
            );
            suggestions.push(
                "💡 Try breaking larger tasks into smaller, more manageable chunks.".to_string(),
            );
        } else if early_pct > 60.0 {
            suggestions.push(
                "🚀 Great time management! You're completing tasks early consistently."
                    .to_string(),
            );
            suggestions.push(
                "🎯 Consider taking on more challenging tasks to maximize your XP potential."
                    .to_string(),
            );
        } else if figures.late == 0 && figures.early > 0 {
            suggestions.push(
                "⭐ Perfect timing! No late completions this week - keep it up!".to_string(),
            );
        }
    }

    let most = figures
        .category_breakdown
        .iter()
        .max_by_key(|(_, p)| p.count);
    let least = figures
        .category_breakdown
        .iter()
        .min_by_key(|(_, p)| p.count);

    if let Some((name, performance)) = most {
        if performance.count >= 3 {
            suggestions.push(format!(
                "🔥 You're crushing it in {}! Consider leveraging this momentum.",
                name
            ));
        }
    }
    if let Some((name, performance)) = least {
        if figures.category_breakdown.len() > 1 && performance.count == 1 {
            suggestions.push(format!(
                "📚 Consider focusing more on {} tasks for better balance.",
                name
            ));
        }
    }

    if suggestions.is_empty() {
        suggestions
            .push("✨ Keep up the good work! Your task management is on track.".to_string());
    }

    suggestions
}

async fn week_figures(
    pool: &SqlitePool,
    user_id: &Uuid,
    week_start: NaiveDate,
    week_end: NaiveDate,
) -> Result<WeekFigures, ReviewError> {
    let in_week = |at: &DateTime<Utc>| {
        let day = at.date_naive();
        day >= week_start && day <= week_end
    };

    let tasks: Vec<TaskRow> =
        sqlx::query_as("SELECT * FROM tasks WHERE user_id = ? AND is_completed = 1")
            .bind(user_id.to_string())
            .fetch_all(pool)
            .await?;

    let category_names: HashMap<String, String> = sqlx::query_as::<_, CategoryRow>(
        "SELECT * FROM categories WHERE user_id = ?",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|c| (c.id, c.name))
    .collect();

    let task_entries: Vec<XpLogRow> = sqlx::query_as(
        "SELECT * FROM xp_logs WHERE user_id = ? AND action = 'task_complete'",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    let xp_by_task: HashMap<&str, i64> = task_entries
        .iter()
        .filter_map(|e| e.task_id.as_deref().map(|t| (t, e.amount)))
        .collect();

    let mut figures = WeekFigures {
        total_xp: task_entries
            .iter()
            .filter(|e| in_week(&e.created_at))
            .map(|e| e.amount)
            .sum(),
        ..WeekFigures::default()
    };

    for task in &tasks {
        let completed_at = match task.completed_at {
            Some(c) if in_week(&c) => c,
            _ => continue,
        };

        figures.total_tasks += 1;

        match timing::classify(task.created_at, task.due_date, completed_at) {
            TimingStatus::Early => figures.early += 1,
            TimingStatus::OnTime => figures.on_time += 1,
            TimingStatus::Late => figures.late += 1,
            TimingStatus::NoDeadline => {}
        }

        let name = category_names
            .get(&task.category_id)
            .cloned()
            .unwrap_or_else(|| "Uncategorized".to_string());
        let entry = figures.category_breakdown.entry(name).or_default();
        entry.count += 1;
        entry.total_xp += xp_by_task.get(task.id.as_str()).copied().unwrap_or(0);
    }

    Ok(figures)
}

/// Builds (or rebuilds) the review of the week containing `week_of`.
pub async fn generate_weekly_review(
    pool: &SqlitePool,
    user_id: &Uuid,
    week_of: NaiveDate,
    now: DateTime<Utc>,
) -> Result<WeeklyReview, ReviewError> {
    let week_start = get_week_start(week_of);
    let week_end = get_week_end(week_start);

    let figures = week_figures(pool, user_id, week_start, week_end).await?;
    let score = performance_score(&figures);
    let suggestions = suggestions(&figures);

    sqlx::query(
        r#"
        INSERT INTO weekly_reviews (id, user_id, week_start, week_end, total_tasks, total_xp, early_completions, on_time_completions, late_completions, performance_score, suggestions, category_breakdown, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id, week_start) DO UPDATE SET
            week_end = excluded.week_end,
            total_tasks = excluded.total_tasks,
            total_xp = excluded.total_xp,
            early_completions = excluded.early_completions,
            on_time_completions = excluded.on_time_completions,
            late_completions = excluded.late_completions,
            performance_score = excluded.performance_score,
            suggestions = excluded.suggestions,
            category_breakdown = excluded.category_breakdown,
            created_at = excluded.created_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id.to_string())
    .bind(week_start)
    .bind(week_end)
    .bind(figures.total_tasks)
    .bind(figures.total_xp)
    .bind(figures.early)
    .bind(figures.on_time)
    .bind(figures.late)
    .bind(score)
    .bind(serde_json::to_string(&suggestions)?)
    .bind(serde_json::to_string(&figures.category_breakdown)?)
    .bind(now)
    .execute(pool)
    .await?;

    // Re-read; on regeneration the row keeps its original id
    let row: WeeklyReviewRow =
        sqlx::query_as("SELECT * FROM weekly_reviews WHERE user_id = ? AND week_start = ?")
            .bind(user_id.to_string())
            .bind(week_start)
            .fetch_one(pool)
            .await?;

    log::info!(
        "Generated weekly review for user {} (week of {}): {} tasks, score {}",
        user_id,
        week_start,
        figures.total_tasks,
        score
    );

    Ok(row.to_shared())
}

/// Reviews, most recent week first.
pub async fn list_reviews(
    pool: &SqlitePool,
    user_id: &Uuid,
) -> Result<Vec<WeeklyReview>, ReviewError> {
    let rows: Vec<WeeklyReviewRow> = sqlx::query_as(
        "SELECT * FROM weekly_reviews WHERE user_id = ? ORDER BY week_start DESC",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| r.to_shared()).collect())
}

/// Compares the newest of the given scores with the oldest.
pub fn trend(recent_scores: &[i32]) -> ReviewTrend {
    match (recent_scores.first(), recent_scores.last()) {
        (Some(newest), Some(oldest)) if recent_scores.len() >= 2 => {
            if *newest > oldest + 5 {
                ReviewTrend::Improving
            } else if *newest < oldest - 5 {
                ReviewTrend::Declining
            } else {
                ReviewTrend::Stable
            }
        }
        _ => ReviewTrend::Stable,
    }
}

pub async fn performance_summary(
    pool: &SqlitePool,
    user_id: &Uuid,
) -> Result<PerformanceSummary, ReviewError> {
    let reviews = list_reviews(pool, user_id).await?;

    let total_weeks_reviewed = reviews.len() as i64;
    let average_performance_score = if reviews.is_empty() {
        0.0
    } else {
        let sum: i64 = reviews.iter().map(|r| r.performance_score as i64).sum();
        ((sum as f64 / reviews.len() as f64) * 10.0).round() / 10.0
    };

    let mut grade_distribution = BTreeMap::new();
    for review in &reviews {
        *grade_distribution
            .entry(performance_grade(review.performance_score).to_string())
            .or_insert(0) += 1;
    }

    let recent_scores: Vec<i32> = reviews
        .iter()
        .take(4)
        .map(|r| r.performance_score)
        .collect();

    Ok(PerformanceSummary {
        total_weeks_reviewed,
        average_performance_score,
        total_xp_earned: reviews.iter().map(|r| r.total_xp).sum(),
        grade_distribution,
        recent_trend: trend(&recent_scores),
        recent_scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{create_category, create_user, test_pool};
    use crate::services::completion;
    use crate::services::leveling::LevelCurve;
    use crate::services::timing::TimingPolicy;
    use chrono::{Duration, TimeZone};

    fn figures(total: i64, early: i64, on_time: i64, late: i64) -> WeekFigures {
        WeekFigures {
            total_tasks: total,
            early,
            on_time,
            late,
            ..WeekFigures::default()
        }
    }

    #[test]
    fn test_get_week_start_is_monday() {
        let friday = NaiveDate::from_ymd_opt(2024, 1, 12).unwrap();
        assert_eq!(
            get_week_start(friday),
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
        );

        let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        assert_eq!(get_week_start(monday), monday);

        let sunday = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
        assert_eq!(get_week_start(sunday), monday);
    }

    #[test]
    fn test_get_week_end() {
        let week_start = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        assert_eq!(
            get_week_end(week_start),
            NaiveDate::from_ymd_opt(2024, 1, 14).unwrap()
        );
    }

    #[test]
    fn test_performance_score() {
        assert_eq!(performance_score(&WeekFigures::default()), 0);
        // timing: (2*2 + 1*1.5) / 5 * 50 = 55, productivity: 5/7*20 = 14.28
        assert_eq!(performance_score(&figures(5, 2, 1, 1)), 69);
        // both parts saturate
        assert_eq!(performance_score(&figures(35, 35, 0, 0)), 100);
        // no deadlines at all still earns productivity
        assert_eq!(performance_score(&figures(7, 0, 0, 0)), 20);
    }

    #[test]
    fn test_suggestions_for_a_quiet_week() {
        let suggestions = suggestions(&figures(2, 0, 0, 0));
        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].contains("at least 5 tasks"));
    }

    #[test]
    fn test_suggestions_for_late_week() {
        let suggestions = suggestions(&figures(10, 1, 1, 2));
        assert!(suggestions.iter().any(|s| s.contains("realistic deadlines")));
        assert!(suggestions.iter().any(|s| s.contains("smaller")));
    }

    #[test]
    fn test_suggestions_for_categories() {
        let mut f = figures(6, 0, 0, 0);
        f.category_breakdown.insert(
            "Work".to_string(),
            CategoryPerformance { count: 5, total_xp: 100 },
        );
        f.category_breakdown.insert(
            "Home".to_string(),
            CategoryPerformance { count: 1, total_xp: 9 },
        );

        let suggestions = suggestions(&f);
        assert!(suggestions.iter().any(|s| s.contains("crushing it in Work")));
        assert!(suggestions.iter().any(|s| s.contains("more on Home")));
    }

    #[test]
    fn test_suggestions_fallback() {
        let suggestions = suggestions(&figures(10, 0, 0, 0));
        assert_eq!(
            suggestions,
            vec!["✨ Keep up the good work! Your task management is on track.".to_string()]
        );
    }

    #[test]
    fn test_trend() {
        assert_eq!(trend(&[]), ReviewTrend::Stable);
        assert_eq!(trend(&[80]), ReviewTrend::Stable);
        assert_eq!(trend(&[80, 70, 60, 70]), ReviewTrend::Improving);
        assert_eq!(trend(&[60, 70, 80]), ReviewTrend::Declining);
        assert_eq!(trend(&[75, 70]), ReviewTrend::Stable);
    }

    #[tokio::test]
    async fn test_generate_weekly_review() {
        let pool = test_pool().await;
        let user_id = create_user(&pool, "planner").await;
        let work = create_category(&pool, &user_id, "Work", 1.5).await;
        let curve = LevelCurve::default();
        let policy = TimingPolicy::default();

        // Monday 2024-06-03 .. Sunday 2024-06-09
        let monday = Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap();
        let due = [Some(monday + Duration::hours(10)), Some(monday + Duration::hours(1)), None];
        for due_date in due {
            let task_id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO tasks (id, user_id, category_id, title, difficulty, priority, due_date, created_at, updated_at) VALUES (?, ?, ?, 'Task', 'medium', 'medium', ?, ?, ?)",
            )
            .bind(task_id.to_string())
            .bind(user_id.to_string())
            .bind(work.to_string())
            .bind(due_date)
            .bind(monday)
            .bind(monday)
            .execute(&pool)
            .await
            .unwrap();

            completion::complete_task(
                &pool,
                &curve,
                &policy,
                &task_id,
                &user_id,
                monday + Duration::hours(2),
            )
            .await
            .unwrap();
        }

        let review = generate_weekly_review(
            &pool,
            &user_id,
            NaiveDate::from_ymd_opt(2024, 6, 6).unwrap(),
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(review.week_start, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        assert_eq!(review.week_end, NaiveDate::from_ymd_opt(2024, 6, 9).unwrap());
        assert_eq!(review.total_tasks, 3);
        assert_eq!(review.total_xp, 90);
        assert_eq!(review.early_completions, 1);
        assert_eq!(review.on_time_completions, 0);
        assert_eq!(review.late_completions, 1);
        assert_eq!(review.category_breakdown["Work"].count, 3);
        assert_eq!(review.category_breakdown["Work"].total_xp, 90);
        assert!(!review.suggestions.is_empty());

        // regenerating replaces rather than duplicates
        let again = generate_weekly_review(
            &pool,
            &user_id,
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(again.id, review.id);
        assert_eq!(list_reviews(&pool, &user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_performance_summary() {
        let pool = test_pool().await;
        let user_id = create_user(&pool, "summary").await;

        let empty = performance_summary(&pool, &user_id).await.unwrap();
        assert_eq!(empty.total_weeks_reviewed, 0);
        assert_eq!(empty.recent_trend, ReviewTrend::Stable);

        for (week, score, xp) in [(3, 50, 100), (10, 62, 150), (17, 91, 300)] {
            sqlx::query(
                "INSERT INTO weekly_reviews (id, user_id, week_start, week_end, total_xp, performance_score, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(user_id.to_string())
            .bind(NaiveDate::from_ymd_opt(2024, 6, week).unwrap())
            .bind(NaiveDate::from_ymd_opt(2024, 6, week + 6).unwrap())
            .bind(xp)
            .bind(score)
            .bind(Utc::now())
            .execute(&pool)
            .await
            .unwrap();
        }

        let summary = performance_summary(&pool, &user_id).await.unwrap();
        assert_eq!(summary.total_weeks_reviewed, 3);
        assert_eq!(summary.average_performance_score, 67.7);
        assert_eq!(summary.total_xp_earned, 550);
        assert_eq!(summary.recent_scores, vec![91, 62, 50]);
        assert_eq!(summary.recent_trend, ReviewTrend::Improving);
        assert_eq!(summary.grade_distribution["A+"], 1);
        assert_eq!(summary.grade_distribution["D"], 1);
        assert_eq!(summary.grade_distribution["F"], 1);
    }
}
