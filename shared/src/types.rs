use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Returned by the `FromStr` impls of the enums below when a stored or
/// submitted value is not one of the known variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ============================================================================
// User Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// ============================================================================
// Task Types
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }

    /// XP awarded for this difficulty before the category multiplier.
    pub fn base_xp(&self) -> i64 {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 20,
            Difficulty::Hard => 40,
            Difficulty::Expert => 100,
        }
    }
}

impl FromStr for Difficulty {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "expert" => Ok(Difficulty::Expert),
            _ => Err(ParseEnumError::new("difficulty", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(ParseEnumError::new("priority", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub xp_value: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub difficulty: Option<Difficulty>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub difficulty: Option<Difficulty>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
}

/// How a completion relates to the task's due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingStatus {
    NoDeadline,
    Early,
    OnTime,
    Late,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTaskStats {
    pub category_id: Uuid,
    pub name: String,
    pub total: i64,
    pub completed: i64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStats {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub pending_tasks: i64,
    pub completion_rate: f64,
    pub recent_completed: i64,
    pub category_breakdown: Vec<CategoryTaskStats>,
}

// ============================================================================
// Category Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub color: String,
    pub xp_multiplier: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub xp_multiplier: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub xp_multiplier: Option<f64>,
}

// ============================================================================
// XP Ledger Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpAction {
    TaskComplete,
    StreakBonus,
    Achievement,
}

impl XpAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            XpAction::TaskComplete => "task_complete",
            XpAction::StreakBonus => "streak_bonus",
            XpAction::Achievement => "achievement",
        }
    }
}

impl FromStr for XpAction {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "task_complete" => Ok(XpAction::TaskComplete),
            "streak_bonus" => Ok(XpAction::StreakBonus),
            "achievement" => Ok(XpAction::Achievement),
            _ => Err(ParseEnumError::new("xp action", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: XpAction,
    pub amount: i64,
    pub task_id: Option<Uuid>,
    pub achievement_id: Option<Uuid>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpActionTotal {
    pub action: XpAction,
    pub total_xp: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpBreakdown {
    pub by_action: Vec<XpActionTotal>,
    pub recent_activity: Vec<XpLogEntry>,
    pub total_xp: i64,
}

// ============================================================================
// Level & Streak Types
// ============================================================================

/// Position of a total XP value on the level curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: i32,
    /// Cumulative XP at which `level` was reached.
    pub xp_for_current_level: i64,
    /// Cumulative XP at which `level + 1` is reached.
    pub xp_for_next_level: i64,
    pub xp_into_level: i64,
    pub xp_to_next_level: i64,
}

impl LevelProgress {
    pub fn progress_percentage(&self) -> f64 {
        let span = self.xp_for_next_level - self.xp_for_current_level;
        if span <= 0 {
            return 100.0;
        }
        ((self.xp_into_level as f64 / span as f64) * 100.0).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelInfo {
    pub total_xp: i64,
    pub current_level: i32,
    pub xp_for_current_level: i64,
    pub xp_for_next_level: i64,
    pub xp_progress_in_level: i64,
    pub xp_needed_for_next_level: i64,
    pub progress_percentage: f64,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_completion_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakInfo {
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_completion_date: Option<NaiveDate>,
}

// ============================================================================
// Achievement Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementType {
    TaskCount,
    Streak,
    Level,
    Category,
    Xp,
    EarlyCompletion,
}

impl AchievementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementType::TaskCount => "task_count",
            AchievementType::Streak => "streak",
            AchievementType::Level => "level",
            AchievementType::Category => "category",
            AchievementType::Xp => "xp",
            AchievementType::EarlyCompletion => "early_completion",
        }
    }
}

impl FromStr for AchievementType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "task_count" => Ok(AchievementType::TaskCount),
            "streak" => Ok(AchievementType::Streak),
            "level" => Ok(AchievementType::Level),
            "category" => Ok(AchievementType::Category),
            "xp" => Ok(AchievementType::Xp),
            "early_completion" => Ok(AchievementType::EarlyCompletion),
            _ => Err(ParseEnumError::new("achievement type", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub achievement_type: AchievementType,
    pub icon: String,
    pub threshold: i64,
    pub xp_reward: i64,
    pub is_hidden: bool,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementStatus {
    pub achievement: Achievement,
    pub is_unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub progress: i64,
    pub threshold: i64,
    pub progress_percentage: f64,
}

impl AchievementStatus {
    pub fn new(achievement: Achievement, unlocked_at: Option<DateTime<Utc>>, progress: i64) -> Self {
        let threshold = achievement.threshold;
        let is_unlocked = unlocked_at.is_some();
        let progress_percentage = if is_unlocked || threshold <= 0 {
            100.0
        } else {
            ((progress as f64 / threshold as f64) * 100.0).min(100.0)
        };

        Self {
            achievement,
            is_unlocked,
            unlocked_at,
            progress,
            threshold,
            progress_percentage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockedAchievement {
    pub achievement: Achievement,
    pub progress: i64,
    pub unlocked_at: DateTime<Utc>,
}

// ============================================================================
// Completion Types
// ============================================================================

/// Everything a single task completion changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResult {
    pub task: Task,
    pub xp_earned: i64,
    pub streak_bonus_xp: i64,
    pub achievement_xp: i64,
    pub total_xp: i64,
    pub leveled_up: bool,
    pub old_level: i32,
    pub new_level: i32,
    pub progress: LevelProgress,
    pub new_achievements: Vec<UnlockedAchievement>,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub timing_status: TimingStatus,
}

// ============================================================================
// Weekly Review Types
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPerformance {
    pub count: i64,
    pub total_xp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyReview {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total_tasks: i64,
    pub total_xp: i64,
    pub early_completions: i64,
    pub on_time_completions: i64,
    pub late_completions: i64,
    pub performance_score: i32,
    pub performance_grade: String,
    pub completion_rate: i32,
    pub punctuality_score: i32,
    pub suggestions: Vec<String>,
    pub category_breakdown: BTreeMap<String, CategoryPerformance>,
    pub created_at: DateTime<Utc>,
}

/// Share of tasks with a deadline that were not late, 0-100.
pub fn completion_rate(early: i64, on_time: i64, late: i64) -> i32 {
    let timed = early + on_time + late;
    if timed == 0 {
        return 0;
    }
    (((early + on_time) as f64 / timed as f64) * 100.0) as i32
}

/// Early completions count double, late ones nothing, 0-100.
pub fn punctuality_score(early: i64, on_time: i64, late: i64) -> i32 {
    let timed = early + on_time + late;
    if timed == 0 {
        return 100;
    }
    (((early * 2 + on_time) as f64 / (timed * 2) as f64) * 100.0) as i32
}

pub fn performance_grade(score: i32) -> &'static str {
    match score {
        s if s >= 90 => "A+",
        s if s >= 85 => "A",
        s if s >= 80 => "B+",
        s if s >= 75 => "B",
        s if s >= 70 => "C+",
        s if s >= 65 => "C",
        s if s >= 60 => "D",
        _ => "F",
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateReviewRequest {
    pub week_start: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewTrend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_weeks_reviewed: i64,
    pub average_performance_score: f64,
    pub total_xp_earned: i64,
    pub grade_distribution: BTreeMap<String, i64>,
    pub recent_trend: ReviewTrend,
    pub recent_scores: Vec<i32>,
}

// ============================================================================
// Leaderboard Types
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardPeriod {
    Daily,
    #[default]
    Weekly,
    Monthly,
    AllTime,
}

impl LeaderboardPeriod {
    /// Start of the scoring window ending at `now`; `None` for all time.
    pub fn start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            LeaderboardPeriod::Daily => Some(now - Duration::days(1)),
            LeaderboardPeriod::Weekly => Some(now - Duration::days(7)),
            LeaderboardPeriod::Monthly => Some(now - Duration::days(30)),
            LeaderboardPeriod::AllTime => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: Uuid,
    pub username: String,
    pub score: i64,
    pub tasks_completed: i64,
    pub total_xp: i64,
    pub current_streak: i32,
    pub punctuality_rate: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    pub period: LeaderboardPeriod,
    pub entries: Vec<LeaderboardEntry>,
    /// The caller's own row, even when it falls outside `entries`.
    pub current_user: Option<LeaderboardEntry>,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSuccess<T> {
    pub data: T,
}

impl<T> ApiSuccess<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_from_str() {
        assert_eq!("easy".parse(), Ok(Difficulty::Easy));
        assert_eq!("MEDIUM".parse(), Ok(Difficulty::Medium));
        assert_eq!("Hard".parse(), Ok(Difficulty::Hard));
        assert_eq!("expert".parse(), Ok(Difficulty::Expert));
        let err = "legendary".parse::<Difficulty>().unwrap_err();
        assert_eq!(err.to_string(), "invalid difficulty: legendary");
    }

    #[test]
    fn test_difficulty_base_xp() {
        assert_eq!(Difficulty::Easy.base_xp(), 10);
        assert_eq!(Difficulty::Medium.base_xp(), 20);
        assert_eq!(Difficulty::Hard.base_xp(), 40);
        assert_eq!(Difficulty::Expert.base_xp(), 100);
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!("low".parse(), Ok(Priority::Low));
        assert_eq!("Urgent".parse(), Ok(Priority::Urgent));
        assert!("whenever".parse::<Priority>().is_err());
    }

    #[test]
    fn test_achievement_type_from_str() {
        assert_eq!("task_count".parse(), Ok(AchievementType::TaskCount));
        assert_eq!("STREAK".parse(), Ok(AchievementType::Streak));
        assert_eq!("early_completion".parse(), Ok(AchievementType::EarlyCompletion));
        assert!("special".parse::<AchievementType>().is_err());
    }

    #[test]
    fn test_xp_action_from_str() {
        assert_eq!("task_complete".parse(), Ok(XpAction::TaskComplete));
        assert_eq!("streak_bonus".parse(), Ok(XpAction::StreakBonus));
        assert_eq!("achievement".parse(), Ok(XpAction::Achievement));
        assert!("daily_login".parse::<XpAction>().is_err());
    }

    #[test]
    fn test_create_task_request_rejects_unknown_difficulty() {
        let json = serde_json::json!({
            "title": "Write report",
            "category_id": Uuid::new_v4(),
            "difficulty": "legendary"
        });
        assert!(serde_json::from_value::<CreateTaskRequest>(json).is_err());
    }

    #[test]
    fn test_timing_status_serializes_snake_case() {
        let value = serde_json::to_value(TimingStatus::OnTime).unwrap();
        assert_eq!(value, serde_json::json!("on_time"));
    }

    #[test]
    fn test_level_progress_percentage() {
        let progress = LevelProgress {
            level: 2,
            xp_for_current_level: 200,
            xp_for_next_level: 500,
            xp_into_level: 150,
            xp_to_next_level: 150,
        };
        assert_eq!(progress.progress_percentage(), 50.0);
    }

    fn achievement(threshold: i64) -> Achievement {
        Achievement {
            id: Uuid::new_v4(),
            name: "Getting Started".to_string(),
            description: "Complete 10 tasks".to_string(),
            achievement_type: AchievementType::TaskCount,
            icon: "📝".to_string(),
            threshold,
            xp_reward: 100,
            is_hidden: false,
            category_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_achievement_status_percentage() {
        let status = AchievementStatus::new(achievement(10), None, 4);
        assert!(!status.is_unlocked);
        assert_eq!(status.threshold, 10);
        assert_eq!(status.progress_percentage, 40.0);

        let over = AchievementStatus::new(achievement(10), None, 25);
        assert_eq!(over.progress_percentage, 100.0);

        let unlocked = AchievementStatus::new(achievement(10), Some(Utc::now()), 3);
        assert!(unlocked.is_unlocked);
        assert_eq!(unlocked.progress_percentage, 100.0);
    }

    #[test]
    fn test_weekly_review_rates() {
        assert_eq!(completion_rate(2, 1, 1), 75);
        assert_eq!(punctuality_score(2, 1, 1), 62);

        assert_eq!(completion_rate(0, 0, 0), 0);
        assert_eq!(punctuality_score(0, 0, 0), 100);
    }

    #[test]
    fn test_leaderboard_period_window() {
        let now = Utc::now();
        assert_eq!(LeaderboardPeriod::Daily.start(now), Some(now - Duration::days(1)));
        assert_eq!(LeaderboardPeriod::Monthly.start(now), Some(now - Duration::days(30)));
        assert_eq!(LeaderboardPeriod::AllTime.start(now), None);

        let period: LeaderboardPeriod = serde_json::from_value(serde_json::json!("all_time")).unwrap();
        assert_eq!(period, LeaderboardPeriod::AllTime);
        assert!(serde_json::from_value::<LeaderboardPeriod>(serde_json::json!("yearly")).is_err());
    }

    #[test]
    fn test_performance_grade_boundaries() {
        assert_eq!(performance_grade(100), "A+");
        assert_eq!(performance_grade(90), "A+");
        assert_eq!(performance_grade(89), "A");
        assert_eq!(performance_grade(80), "B+");
        assert_eq!(performance_grade(60), "D");
        assert_eq!(performance_grade(59), "F");
    }

    #[test]
    fn test_api_success() {
        let success = ApiSuccess::new("test data");
        assert_eq!(success.data, "test data");
    }
}
