use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::GoalStatus;

/// One row of an employee's performance history.
///
/// A goal with several feedback entries appears once per entry; a goal
/// without feedback appears once with `feedback_text` empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub description: String,
    pub due_date: NaiveDate,
    pub status: GoalStatus,
    pub feedback_text: Option<String>,
}

/// Aggregate metrics for one employee or for everyone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Insights {
    pub completed_goals: i64,
    pub total_tasks: i64,
    pub avg_tasks_per_goal: f64,
    /// Shortest and longest time from goal creation to due date. Unavailable
    /// until goals record when they were created.
    pub min_days: Option<Duration>,
    pub max_days: Option<Duration>,
}
