use chrono::{DateTime, Duration, Utc};
use shared::{Difficulty, TimingStatus};

/// Optional restrictions on when a task with a due date may be completed.
/// The default places no restriction at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingPolicy {
    /// Refuse completions that come too soon after creation.
    pub enforce_minimum_age: bool,
    pub allow_late_completion: bool,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            enforce_minimum_age: false,
            allow_late_completion: true,
        }
    }
}

/// How long a task with a due date must exist before it can be completed.
pub fn minimum_age(difficulty: Difficulty) -> Duration {
    match difficulty {
        Difficulty::Easy => Duration::minutes(15),
        Difficulty::Medium => Duration::hours(1),
        Difficulty::Hard => Duration::hours(4),
        Difficulty::Expert => Duration::days(1),
    }
}

impl TimingPolicy {
    /// Returns the rejection reason when the policy forbids completing the
    /// task at `now`. Tasks without a due date are never restricted.
    pub fn check(
        &self,
        difficulty: Difficulty,
        created_at: DateTime<Utc>,
        due_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), String> {
        let due_date = match due_date {
            Some(d) => d,
            None => return Ok(()),
        };

        if self.enforce_minimum_age {
            let age = now - created_at;
            let required = minimum_age(difficulty);
            if age < required {
                return Err(format!(
                    "Task created too recently. Wait {} before completing this {} task.",
                    format_wait(required - age),
                    difficulty.as_str()
                ));
            }
        }

        if !self.allow_late_completion && now > due_date {
            return Err(format!(
                "Task was due {}; late completion is not allowed",
                due_date.format("%Y-%m-%d %H:%M UTC")
            ));
        }

        Ok(())
    }
}

fn format_wait(remaining: Duration) -> String {
    let hours = remaining.num_hours();
    let minutes = remaining.num_minutes() % 60;
    if hours > 0 {
        format!("{} hours and {} minutes", hours, minutes)
    } else {
        format!("{} minutes", minutes)
    }
}

/// Classifies a completion against the task's deadline. A completion is
/// early when at least a quarter of the created-to-due window was left.
pub fn classify(
    created_at: DateTime<Utc>,
    due_date: Option<DateTime<Utc>>,
    completed_at: DateTime<Utc>,
) -> TimingStatus {
    let due_date = match due_date {
        Some(d) => d,
        None => return TimingStatus::NoDeadline,
    };

    if completed_at > due_date {
        return TimingStatus::Late;
    }

    let window = (due_date - created_at).num_seconds();
    if window <= 0 {
        return TimingStatus::OnTime;
    }

    let remaining = (due_date - completed_at).num_seconds();
    if remaining as f64 / window as f64 >= 0.25 {
        TimingStatus::Early
    } else {
        TimingStatus::OnTime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_default_policy_allows_everything() {
        let policy = TimingPolicy::default();
        // created a second ago, due yesterday
        let now = at(12);
        assert!(policy
            .check(Difficulty::Expert, now, Some(at(0)), now)
            .is_ok());
    }

    #[test]
    fn test_tasks_without_due_date_are_never_restricted() {
        let policy = TimingPolicy {
            enforce_minimum_age: true,
            allow_late_completion: false,
        };
        assert!(policy.check(Difficulty::Expert, at(12), None, at(12)).is_ok());
    }

    #[test]
    fn test_minimum_age_rejects_fresh_tasks() {
        let policy = TimingPolicy {
            enforce_minimum_age: true,
            ..TimingPolicy::default()
        };
        let created = at(10);
        let now = created + Duration::minutes(20);

        let reason = policy
            .check(Difficulty::Hard, created, Some(at(23)), now)
            .unwrap_err();
        assert_eq!(
            reason,
            "Task created too recently. Wait 3 hours and 40 minutes before completing this hard task."
        );

        let reason = policy
            .check(Difficulty::Medium, created, Some(at(23)), now)
            .unwrap_err();
        assert_eq!(
            reason,
            "Task created too recently. Wait 40 minutes before completing this medium task."
        );

        assert!(policy
            .check(Difficulty::Easy, created, Some(at(23)), now)
            .is_ok());
    }

    #[test]
    fn test_late_completion_can_be_disallowed() {
        let policy = TimingPolicy {
            allow_late_completion: false,
            ..TimingPolicy::default()
        };
        let reason = policy
            .check(Difficulty::Easy, at(0), Some(at(6)), at(7))
            .unwrap_err();
        assert_eq!(
            reason,
            "Task was due 2024-06-01 06:00 UTC; late completion is not allowed"
        );
        assert!(policy
            .check(Difficulty::Easy, at(0), Some(at(6)), at(6))
            .is_ok());
    }

    #[test]
    fn test_minimum_age_by_difficulty() {
        assert_eq!(minimum_age(Difficulty::Easy), Duration::minutes(15));
        assert_eq!(minimum_age(Difficulty::Medium), Duration::hours(1));
        assert_eq!(minimum_age(Difficulty::Hard), Duration::hours(4));
        assert_eq!(minimum_age(Difficulty::Expert), Duration::days(1));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(at(0), None, at(5)), TimingStatus::NoDeadline);
        // 8 of 10 hours left
        assert_eq!(classify(at(0), Some(at(10)), at(2)), TimingStatus::Early);
        // exactly a quarter left
        assert_eq!(
            classify(at(0), Some(at(8)), at(6)),
            TimingStatus::Early
        );
        assert_eq!(classify(at(0), Some(at(10)), at(9)), TimingStatus::OnTime);
        assert_eq!(classify(at(0), Some(at(10)), at(10)), TimingStatus::OnTime);
        assert_eq!(classify(at(0), Some(at(10)), at(11)), TimingStatus::Late);
    }

    #[test]
    fn test_classify_with_due_date_before_creation() {
        assert_eq!(classify(at(5), Some(at(3)), at(2)), TimingStatus::OnTime);
    }
}
