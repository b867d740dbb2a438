pub mod feedback;
pub mod goals;
pub mod insights;
pub mod reporting;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};

use super::views::{Notice, SelectOption, Tab};
use super::{session_token, AppState, SESSION_COOKIE};
use crate::db::{Database, StoreError, StoreResult};
use crate::models::*;
use crate::session::SessionContext;

/// A rendered page with its status, or a bare error when rendering itself failed.
pub type Page = Result<(StatusCode, Html<String>), (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

/// Unwrap a read for display. A failed read renders as empty and adds an
/// error notice, so the rest of the page still shows.
fn load<T: Default>(notices: &mut Vec<Notice>, what: &str, result: StoreResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Failed to load {}: {}", what, e);
            notices.push(Notice::error(format!("Could not load {what}.")));
            T::default()
        }
    }
}

/// Result of a form submission: the status for the re-rendered page and the
/// message to show on it.
pub(crate) struct Outcome {
    status: StatusCode,
    notice: Notice,
}

impl Outcome {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            notice: Notice::success(message),
        }
    }

    /// Incomplete input. Nothing was sent to the store.
    fn warning(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            notice: Notice::warning(message),
        }
    }

    fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            notice: Notice::error(message),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            notice: Notice::error(message),
        }
    }

    /// The store rejected the operation; nothing was applied.
    fn failed(action: &str, e: &StoreError) -> Self {
        tracing::error!("Failed to {}: {}", action, e);
        let (status, message) = if e.is_unavailable() {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Failed to {action}: the database is unavailable."),
            )
        } else {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {action}."),
            )
        };
        Self {
            status,
            notice: Notice::error(message),
        }
    }

    fn into_parts(self) -> (StatusCode, Vec<Notice>) {
        (self.status, vec![self.notice])
    }
}

fn render_tab<T: Serialize>(
    state: &AppState,
    tab: Tab,
    session: &SessionContext,
    status: StatusCode,
    notices: &[Notice],
    data: &T,
) -> Page {
    state
        .views
        .tab(tab, session, notices, data)
        .map(|html| (status, Html(html)))
        .map_err(internal_error)
}

// ============================================================
// Role checks and selections
// ============================================================

/// The session's direct reports, provided the session is a manager.
fn managed_reports(db: &Database, session: &SessionContext) -> Result<Vec<Employee>, Outcome> {
    if !session.is_manager() {
        return Err(Outcome::forbidden("Only managers can do that."));
    }
    db.get_employees_by_manager(session.employee_id)
        .map_err(|e| Outcome::failed("load your direct reports", &e))
}

/// A goal owned by one of the session's direct reports.
fn managed_goal(db: &Database, session: &SessionContext, goal_id: i64) -> Result<Goal, Outcome> {
    let reports = managed_reports(db, session)?;
    let goal = db
        .get_goal(goal_id)
        .map_err(|e| Outcome::failed("load the goal", &e))?
        .ok_or_else(|| Outcome::not_found("Goal not found."))?;

    if reports.iter().any(|report| report.id == goal.employee_id) {
        Ok(goal)
    } else {
        Err(Outcome::forbidden(
            "That goal does not belong to one of your direct reports.",
        ))
    }
}

/// The requested report if it is one of `reports`, otherwise the first one.
fn pick_report(reports: &[Employee], requested: Option<i64>) -> Option<&Employee> {
    requested
        .and_then(|id| reports.iter().find(|report| report.id == id))
        .or_else(|| reports.first())
}

fn employee_options(employees: &[Employee], selected: Option<i64>) -> Vec<SelectOption> {
    employees
        .iter()
        .map(|e| SelectOption::new(e.id, e.name.as_str(), Some(e.id) == selected))
        .collect()
}

fn format_date(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Login
// ============================================================

#[derive(Serialize)]
struct LoginPage {
    employees: Vec<SelectOption>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub employee_id: Option<i64>,
}

pub async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if state.current_session(&headers).is_some() {
        return Redirect::to(Tab::Goals.href()).into_response();
    }

    let mut notices = Vec::new();
    if session_token(&headers).is_some() {
        notices.push(Notice::info("Your session has expired. Please log in again."));
    }
    render_login(&state, StatusCode::OK, notices).into_response()
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let Some(employee_id) = form.employee_id else {
        let (status, notices) = Outcome::warning("Please select your name.").into_parts();
        return render_login(&state, status, notices).into_response();
    };

    match SessionContext::login(&state.db, employee_id) {
        Ok(Some(session)) => {
            if let Some(previous) = session_token(&headers) {
                state.sessions.remove(&previous);
            }
            let token = state.sessions.insert(session.clone());
            tracing::info!(
                employee_id = session.employee_id,
                role = ?session.role,
                live_sessions = state.sessions.live_count(),
                "Logged in"
            );
            let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
            (
                [(header::SET_COOKIE, cookie)],
                Redirect::to(Tab::Goals.href()),
            )
                .into_response()
        }
        Ok(None) => {
            let (status, notices) = Outcome::not_found("No employee with that id.").into_parts();
            render_login(&state, status, notices).into_response()
        }
        Err(e) => {
            let (status, notices) = Outcome::failed("log in", &e).into_parts();
            render_login(&state, status, notices).into_response()
        }
    }
}

fn render_login(state: &AppState, status: StatusCode, mut notices: Vec<Notice>) -> Page {
    let employees = match state.db.get_all_employees() {
        Ok(employees) if employees.is_empty() => {
            notices.push(Notice::error(
                "No employees found. Please populate the employees table in your database.",
            ));
            employees
        }
        Ok(employees) => employees,
        Err(e) => load(&mut notices, "employees", Err(e)),
    };

    let page = LoginPage {
        employees: employee_options(&employees, None),
    };
    state
        .views
        .login(&notices, &page)
        .map(|html| (status, Html(html)))
        .map_err(internal_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(id: i64, name: &str) -> Employee {
        Employee {
            id,
            name: name.to_string(),
            manager_id: Some(99),
        }
    }

    #[test]
    fn pick_report_prefers_the_requested_report() {
        let reports = vec![employee(1, "Alice"), employee(3, "Carol")];
        assert_eq!(pick_report(&reports, Some(3)).map(|e| e.id), Some(3));
    }

    #[test]
    fn pick_report_falls_back_to_first_for_strangers() {
        let reports = vec![employee(1, "Alice"), employee(3, "Carol")];
        assert_eq!(pick_report(&reports, Some(42)).map(|e| e.id), Some(1));
        assert_eq!(pick_report(&reports, None).map(|e| e.id), Some(1));
        assert!(pick_report(&[], Some(1)).is_none());
    }

    #[test]
    fn unavailable_store_maps_to_service_unavailable() {
        let pool = r2d2::Pool::builder()
            .connection_timeout(std::time::Duration::from_millis(50))
            .build_unchecked(r2d2_sqlite::SqliteConnectionManager::file(
                "/nonexistent/dir/perf.db",
            ));
        let err = Database::with_pool(pool).get_all_employees().unwrap_err();

        let outcome = Outcome::failed("set goal", &err);
        assert_eq!(outcome.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
