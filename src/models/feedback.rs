use serde::{Deserialize, Serialize};

/// Manager-authored commentary on a goal. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub text: String,
    pub goal_id: i64,
    /// The manager who wrote the feedback.
    pub manager_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeedbackInput {
    pub text: String,
    pub goal_id: i64,
    pub manager_id: i64,
}
