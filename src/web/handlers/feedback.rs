//! Feedback tab.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Form,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};

use super::{employee_options, load, managed_goal, pick_report, render_tab, Outcome, Page};
use crate::db::Database;
use crate::models::*;
use crate::session::SessionContext;
use crate::web::views::{Notice, SelectOption, Tab};
use crate::web::AppState;

#[derive(Serialize)]
struct FeedbackPage {
    is_manager: bool,
    reports: Vec<SelectOption>,
    selected_id: Option<i64>,
    selected_name: Option<String>,
    goal_options: Vec<SelectOption>,
    /// Own goals for employees; the selected report's goals for managers.
    goals: Vec<GoalFeedback>,
}

#[derive(Serialize)]
struct GoalFeedback {
    description: String,
    items: Vec<FeedbackItem>,
}

#[derive(Serialize)]
struct FeedbackItem {
    author: String,
    text: String,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct FeedbackQuery {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub employee: Option<i64>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub goal_id: Option<i64>,
    #[serde(default)]
    pub text: String,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub employee: Option<i64>,
}

pub async fn feedback_page(
    State(state): State<AppState>,
    session: SessionContext,
    Query(query): Query<FeedbackQuery>,
) -> Page {
    render(&state, &session, query.employee, StatusCode::OK, Vec::new())
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    session: SessionContext,
    Form(form): Form<FeedbackForm>,
) -> Page {
    let employee = form.employee;
    let (status, notices) = submit(&state.db, &session, form)
        .unwrap_or_else(|outcome| outcome)
        .into_parts();
    render(&state, &session, employee, status, notices)
}

fn submit(db: &Database, session: &SessionContext, form: FeedbackForm) -> Result<Outcome, Outcome> {
    let text = form.text.trim();
    let Some(goal_id) = form.goal_id.filter(|_| !text.is_empty()) else {
        return Err(Outcome::warning("Please fill in all fields."));
    };

    let goal = managed_goal(db, session, goal_id)?;
    db.create_feedback(CreateFeedbackInput {
        text: text.to_string(),
        goal_id: goal.id,
        manager_id: session.employee_id,
    })
    .map_err(|e| Outcome::failed("submit feedback", &e))?;

    Ok(Outcome::success("Feedback submitted successfully!"))
}

fn render(
    state: &AppState,
    session: &SessionContext,
    selected: Option<i64>,
    status: StatusCode,
    mut notices: Vec<Notice>,
) -> Page {
    let db = &state.db;
    let mut page = FeedbackPage {
        is_manager: session.is_manager(),
        reports: Vec::new(),
        selected_id: None,
        selected_name: None,
        goal_options: Vec::new(),
        goals: Vec::new(),
    };

    if session.is_manager() {
        let reports = load(
            &mut notices,
            "your direct reports",
            db.get_employees_by_manager(session.employee_id),
        );
        let report = pick_report(&reports, selected);

        if let Some(report) = report {
            let goals = load(
                &mut notices,
                "goals",
                db.get_goals_for_employee(report.id),
            );
            page.selected_id = Some(report.id);
            page.selected_name = Some(report.name.clone());
            page.goal_options = goals
                .iter()
                .map(|goal| SelectOption::new(goal.id, goal.description.as_str(), false))
                .collect();
            page.goals = with_feedback(db, &mut notices, &goals);
        }
        page.reports = employee_options(&reports, report.map(|e| e.id));
    } else {
        let goals = load(
            &mut notices,
            "your goals",
            db.get_goals_for_employee(session.employee_id),
        );
        page.goals = with_feedback(db, &mut notices, &goals);
    }

    render_tab(state, Tab::Feedback, session, status, &notices, &page)
}

/// Feedback for each goal, attributed to the manager who wrote it.
fn with_feedback(db: &Database, notices: &mut Vec<Notice>, goals: &[Goal]) -> Vec<GoalFeedback> {
    let mut out = Vec::with_capacity(goals.len());
    for goal in goals {
        let feedback = load(notices, "feedback", db.get_feedback_for_goal(goal.id));
        let mut items = Vec::with_capacity(feedback.len());
        for entry in feedback {
            let author = load(notices, "feedback author", db.get_employee_by_id(entry.manager_id))
                .map(|manager| manager.name)
                .unwrap_or_else(|| format!("Employee #{}", entry.manager_id));
            items.push(FeedbackItem {
                author,
                text: entry.text,
            });
        }
        out.push(GoalFeedback {
            description: goal.description.clone(),
            items,
        });
    }
    out
}
