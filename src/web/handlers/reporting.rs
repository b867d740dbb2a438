//! Reporting tab: goal and feedback history for one employee.

use axum::{
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};

use super::{employee_options, format_date, load, pick_report, render_tab, Page};
use crate::session::SessionContext;
use crate::web::views::{Notice, SelectOption, Tab};
use crate::web::AppState;

#[derive(Serialize)]
struct ReportingPage {
    reports: Vec<SelectOption>,
    target_name: String,
    rows: Vec<HistoryRow>,
}

#[derive(Serialize)]
struct HistoryRow {
    description: String,
    due_date: String,
    status: &'static str,
    feedback: String,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub employee: Option<i64>,
}

/// Managers see a direct report's history, everyone else their own.
pub async fn reporting_page(
    State(state): State<AppState>,
    session: SessionContext,
    Query(query): Query<ReportQuery>,
) -> Page {
    let db = &state.db;
    let mut notices = Vec::new();
    let mut target_id = session.employee_id;
    let mut target_name = session.name.clone();
    let mut reports = Vec::new();

    if session.is_manager() {
        let managed = load(
            &mut notices,
            "your direct reports",
            db.get_employees_by_manager(session.employee_id),
        );
        match pick_report(&managed, query.employee) {
            Some(report) => {
                target_id = report.id;
                target_name = report.name.clone();
            }
            None => notices.push(Notice::warning("You are not managing any employees.")),
        }
        reports = employee_options(&managed, Some(target_id));
    }

    let rows = load(
        &mut notices,
        "performance history",
        db.get_performance_history(target_id),
    )
    .into_iter()
    .map(|record| HistoryRow {
        description: record.description,
        due_date: format_date(record.due_date),
        status: record.status.as_str(),
        feedback: record.feedback_text.unwrap_or_default(),
    })
    .collect();

    let page = ReportingPage {
        reports,
        target_name,
        rows,
    };
    render_tab(&state, Tab::Reporting, &session, StatusCode::OK, &notices, &page)
}
