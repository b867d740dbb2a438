use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An objective a manager assigns to one of their direct reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub description: String,
    pub due_date: NaiveDate,
    pub status: GoalStatus,
    /// The employee working towards the goal.
    pub employee_id: i64,
    /// The manager who set the goal.
    pub manager_id: i64,
}

/// Progress of a goal.
///
/// Any status may be set at any time; there is no transition guard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GoalStatus {
    Draft,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
}

impl GoalStatus {
    pub const ALL: [GoalStatus; 4] = [
        Self::Draft,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Draft" => Some(Self::Draft),
            "In Progress" => Some(Self::InProgress),
            "Completed" => Some(Self::Completed),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Input for creating a goal. New goals always start as [`GoalStatus::Draft`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGoalInput {
    pub description: String,
    pub due_date: NaiveDate,
    pub employee_id: i64,
    pub manager_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in GoalStatus::ALL {
            assert_eq!(GoalStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert_eq!(GoalStatus::from_str("in progress"), None);
        assert_eq!(GoalStatus::from_str(""), None);
    }
}
