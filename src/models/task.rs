use serde::{Deserialize, Serialize};

/// A unit of work an employee logs against one of their goals.
///
/// Tasks are created unapproved. Only a manager of the goal's employee flips
/// `is_approved`, and it never goes back to false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub description: String,
    pub goal_id: i64,
    pub employee_id: i64,
    pub is_approved: bool,
}

/// Input for logging a task against a goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub description: String,
    pub goal_id: i64,
    /// Expected to match the goal's employee.
    pub employee_id: i64,
}
