use serde::{Deserialize, Serialize};

/// A person who can log in. Managers are employees with direct reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    /// The employee's manager, if any.
    pub manager_id: Option<i64>,
}

/// One entry of a seed file.
///
/// `manager` refers to another entry by name; that entry must appear earlier
/// in the file so its id is known when this one is inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedEmployee {
    pub name: String,
    #[serde(default)]
    pub manager: Option<String>,
}
