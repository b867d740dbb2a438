//! Goals & Tasks tab.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Form,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};

use super::{
    employee_options, format_date, load, managed_goal, managed_reports, pick_report, render_tab,
    Outcome, Page,
};
use crate::db::Database;
use crate::models::*;
use crate::session::SessionContext;
use crate::web::views::{Notice, SelectOption, Tab};
use crate::web::AppState;

#[derive(Serialize)]
struct GoalsPage {
    is_manager: bool,
    my_goals: Vec<GoalRow>,
    /// Direct reports, for the new-goal form and the tracking selector.
    reports: Vec<SelectOption>,
    /// Own goals a task can be logged against.
    goal_options: Vec<SelectOption>,
    tracked_name: Option<String>,
    tracked_goals: Vec<TrackedGoal>,
}

#[derive(Serialize)]
struct GoalRow {
    id: i64,
    description: String,
    due_date: String,
    status: &'static str,
}

impl From<&Goal> for GoalRow {
    fn from(goal: &Goal) -> Self {
        Self {
            id: goal.id,
            description: goal.description.clone(),
            due_date: format_date(goal.due_date),
            status: goal.status.as_str(),
        }
    }
}

#[derive(Serialize)]
struct TaskRow {
    id: i64,
    description: String,
    approved: bool,
}

#[derive(Serialize)]
struct TrackedGoal {
    /// Employee the goal belongs to, echoed back by the forms so the page
    /// re-renders on the same person.
    employee_id: i64,
    goal: GoalRow,
    tasks: Vec<TaskRow>,
    pending: Vec<SelectOption>,
    statuses: Vec<SelectOption>,
}

// Select fields arrive as empty strings when nothing is chosen, so every id
// is optional and blanks read as `None`.

#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct TrackQuery {
    /// Direct report whose progress a manager is looking at.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub employee: Option<i64>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct CreateGoalForm {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub employee_id: Option<i64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: String,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct GoalStatusForm {
    #[serde(default)]
    pub status: String,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub employee: Option<i64>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct LogTaskForm {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub goal_id: Option<i64>,
    #[serde(default)]
    pub description: String,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct ApproveTaskForm {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub task_id: Option<i64>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub employee: Option<i64>,
}

pub async fn goals_page(
    State(state): State<AppState>,
    session: SessionContext,
    Query(query): Query<TrackQuery>,
) -> Page {
    render(&state, &session, query.employee, StatusCode::OK, Vec::new())
}

pub async fn create_goal(
    State(state): State<AppState>,
    session: SessionContext,
    Form(form): Form<CreateGoalForm>,
) -> Page {
    let employee_id = form.employee_id;
    let (status, notices) = set_goal(&state.db, &session, form)
        .unwrap_or_else(|outcome| outcome)
        .into_parts();
    render(&state, &session, employee_id, status, notices)
}

pub async fn update_goal_status(
    State(state): State<AppState>,
    session: SessionContext,
    Path(goal_id): Path<i64>,
    Form(form): Form<GoalStatusForm>,
) -> Page {
    let (status, notices) = change_status(&state.db, &session, goal_id, &form.status)
        .unwrap_or_else(|outcome| outcome)
        .into_parts();
    render(&state, &session, form.employee, status, notices)
}

pub async fn log_task(
    State(state): State<AppState>,
    session: SessionContext,
    Form(form): Form<LogTaskForm>,
) -> Page {
    let (status, notices) = add_task(&state.db, &session, form)
        .unwrap_or_else(|outcome| outcome)
        .into_parts();
    render(&state, &session, None, status, notices)
}

pub async fn approve_task(
    State(state): State<AppState>,
    session: SessionContext,
    Form(form): Form<ApproveTaskForm>,
) -> Page {
    let (status, notices) = approve(&state.db, &session, form.task_id)
        .unwrap_or_else(|outcome| outcome)
        .into_parts();
    render(&state, &session, form.employee, status, notices)
}

fn set_goal(db: &Database, session: &SessionContext, form: CreateGoalForm) -> Result<Outcome, Outcome> {
    let description = form.description.trim();
    let (Some(employee_id), Some(due_date)) = (form.employee_id, parse_due_date(&form.due_date))
    else {
        return Err(Outcome::warning("Please fill in all fields."));
    };
    if description.is_empty() {
        return Err(Outcome::warning("Please fill in all fields."));
    }

    let reports = managed_reports(db, session)?;
    let report = reports
        .iter()
        .find(|report| report.id == employee_id)
        .ok_or_else(|| Outcome::forbidden("You can only set goals for your direct reports."))?;

    db.create_goal(CreateGoalInput {
        description: description.to_string(),
        due_date,
        employee_id: report.id,
        manager_id: session.employee_id,
    })
    .map_err(|e| Outcome::failed("set goal", &e))?;

    Ok(Outcome::success(format!(
        "Goal set for {} successfully!",
        report.name
    )))
}

fn change_status(
    db: &Database,
    session: &SessionContext,
    goal_id: i64,
    status: &str,
) -> Result<Outcome, Outcome> {
    if status.trim().is_empty() {
        return Err(Outcome::warning("Please fill in all fields."));
    }
    let status = GoalStatus::from_str(status)
        .ok_or_else(|| Outcome::warning("Please choose a valid status."))?;
    managed_goal(db, session, goal_id)?;

    match db.update_goal_status(goal_id, status) {
        Ok(true) => Ok(Outcome::success("Goal status updated successfully!")),
        Ok(false) => Err(Outcome::not_found("Goal not found.")),
        Err(e) => Err(Outcome::failed("update status", &e)),
    }
}

fn add_task(db: &Database, session: &SessionContext, form: LogTaskForm) -> Result<Outcome, Outcome> {
    let description = form.description.trim();
    let Some(goal_id) = form.goal_id.filter(|_| !description.is_empty()) else {
        return Err(Outcome::warning("Please fill in all fields."));
    };

    let goal = db
        .get_goal(goal_id)
        .map_err(|e| Outcome::failed("load the goal", &e))?
        .ok_or_else(|| Outcome::not_found("Goal not found."))?;
    if goal.employee_id != session.employee_id {
        return Err(Outcome::forbidden(
            "You can only log tasks against your own goals.",
        ));
    }

    db.create_task(CreateTaskInput {
        description: description.to_string(),
        goal_id: goal.id,
        employee_id: session.employee_id,
    })
    .map_err(|e| Outcome::failed("log task", &e))?;

    Ok(Outcome::success(
        "Task logged successfully, awaiting manager approval!",
    ))
}

fn approve(
    db: &Database,
    session: &SessionContext,
    task_id: Option<i64>,
) -> Result<Outcome, Outcome> {
    let task_id = task_id.ok_or_else(|| Outcome::warning("Please select a task to approve."))?;
    let task = db
        .get_task(task_id)
        .map_err(|e| Outcome::failed("load the task", &e))?
        .ok_or_else(|| Outcome::not_found("Task not found."))?;
    managed_goal(db, session, task.goal_id)?;

    match db.approve_task(task_id) {
        Ok(true) => Ok(Outcome::success("Task approved!")),
        Ok(false) => Err(Outcome::not_found("Task not found.")),
        Err(e) => Err(Outcome::failed("approve task", &e)),
    }
}

fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn render(
    state: &AppState,
    session: &SessionContext,
    track: Option<i64>,
    status: StatusCode,
    mut notices: Vec<Notice>,
) -> Page {
    let db = &state.db;
    let my_goals = load(
        &mut notices,
        "your goals",
        db.get_goals_for_employee(session.employee_id),
    );

    let mut page = GoalsPage {
        is_manager: session.is_manager(),
        my_goals: my_goals.iter().map(GoalRow::from).collect(),
        reports: Vec::new(),
        goal_options: Vec::new(),
        tracked_name: None,
        tracked_goals: Vec::new(),
    };

    if session.is_manager() {
        let reports = load(
            &mut notices,
            "your direct reports",
            db.get_employees_by_manager(session.employee_id),
        );
        let tracked = pick_report(&reports, track);

        if let Some(tracked) = tracked {
            let goals = load(
                &mut notices,
                "goals",
                db.get_goals_for_employee(tracked.id),
            );
            page.tracked_name = Some(tracked.name.clone());
            for goal in &goals {
                page.tracked_goals.push(track_goal(db, &mut notices, goal));
            }
        }
        page.reports = employee_options(&reports, tracked.map(|e| e.id));
    } else {
        page.goal_options = my_goals
            .iter()
            .map(|goal| SelectOption::new(goal.id, goal.description.as_str(), false))
            .collect();
        for goal in &my_goals {
            page.tracked_goals.push(track_goal(db, &mut notices, goal));
        }
    }

    render_tab(state, Tab::Goals, session, status, &notices, &page)
}

fn track_goal(db: &Database, notices: &mut Vec<Notice>, goal: &Goal) -> TrackedGoal {
    let tasks = load(notices, "tasks", db.get_tasks_for_goal(goal.id));

    TrackedGoal {
        employee_id: goal.employee_id,
        goal: GoalRow::from(goal),
        pending: tasks
            .iter()
            .filter(|task| !task.is_approved)
            .map(|task| SelectOption::new(task.id, format!("#{} {}", task.id, task.description), false))
            .collect(),
        tasks: tasks
            .iter()
            .map(|task| TaskRow {
                id: task.id,
                description: task.description.clone(),
                approved: task.is_approved,
            })
            .collect(),
        statuses: GoalStatus::ALL
            .iter()
            .map(|s| SelectOption::new(s.as_str(), s.as_str(), *s == goal.status))
            .collect(),
    }
}
