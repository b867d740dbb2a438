//! Business Insights tab.

use axum::{
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use super::{load, render_tab, Page};
use crate::session::SessionContext;
use crate::web::views::{SelectOption, Tab};
use crate::web::AppState;

const ALL_EMPLOYEES: &str = "all";

#[derive(Serialize)]
struct InsightsPage {
    scopes: Vec<SelectOption>,
    scope_label: String,
    completed_goals: i64,
    total_tasks: i64,
    avg_tasks_per_goal: String,
    has_spread: bool,
    min_days: Option<i64>,
    max_days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InsightsQuery {
    /// A direct report's id, or `all`.
    pub employee: Option<String>,
}

/// Managers can narrow the metrics to one direct report; otherwise they cover
/// everyone.
pub async fn insights_page(
    State(state): State<AppState>,
    session: SessionContext,
    Query(query): Query<InsightsQuery>,
) -> Page {
    let db = &state.db;
    let mut notices = Vec::new();
    let mut scopes = Vec::new();
    let mut scope = None;

    if session.is_manager() {
        let reports = load(
            &mut notices,
            "your direct reports",
            db.get_employees_by_manager(session.employee_id),
        );
        let requested = query
            .employee
            .as_deref()
            .filter(|raw| *raw != ALL_EMPLOYEES)
            .and_then(|raw| raw.parse::<i64>().ok());
        scope = requested
            .and_then(|id| reports.iter().find(|report| report.id == id))
            .cloned();

        if !reports.is_empty() {
            let scope_id = scope.as_ref().map(|s| s.id);
            scopes.push(SelectOption::new(
                ALL_EMPLOYEES,
                "All Employees",
                scope_id.is_none(),
            ));
            scopes.extend(reports.iter().map(|report| {
                SelectOption::new(report.id, report.name.as_str(), scope_id == Some(report.id))
            }));
        }
    }

    let scope_id = scope.as_ref().map(|report| report.id);
    let scope_label = scope
        .map(|report| report.name)
        .unwrap_or_else(|| "All Employees".to_string());
    let insights = load(&mut notices, "insights", db.get_insights(scope_id));

    let page = InsightsPage {
        scopes,
        scope_label,
        completed_goals: insights.completed_goals,
        total_tasks: insights.total_tasks,
        avg_tasks_per_goal: format!("{:.2}", insights.avg_tasks_per_goal),
        has_spread: insights.min_days.is_some() && insights.max_days.is_some(),
        min_days: insights.min_days.map(|d| d.num_days()),
        max_days: insights.max_days.map(|d| d.num_days()),
    };
    render_tab(&state, Tab::Insights, &session, StatusCode::OK, &notices, &page)
}
