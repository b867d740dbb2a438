mod handlers;
pub mod views;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
    response::Redirect,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::db::Database;
use crate::session::{SessionContext, SessionStore};
use views::Views;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "perf_session";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub sessions: SessionStore,
    pub views: Views,
}

impl AppState {
    pub fn new(db: Database) -> anyhow::Result<Self> {
        Self::with_sessions(db, SessionStore::new())
    }

    pub fn with_sessions(db: Database, sessions: SessionStore) -> anyhow::Result<Self> {
        Ok(Self {
            db,
            sessions,
            views: Views::new()?,
        })
    }

    /// The session named by the request's cookie, if it is still live.
    pub fn current_session(&self, headers: &HeaderMap) -> Option<SessionContext> {
        session_token(headers).and_then(|token| self.sessions.get(&token))
    }
}

pub fn create_router(db: Database) -> anyhow::Result<Router> {
    Ok(router(AppState::new(db)?))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Login
        .route("/", get(handlers::login_page))
        .route("/login", post(handlers::login))
        // Goals & Tasks
        .route(
            "/goals",
            get(handlers::goals::goals_page).post(handlers::goals::create_goal),
        )
        .route("/goals/{id}/status", post(handlers::goals::update_goal_status))
        .route("/tasks", post(handlers::goals::log_task))
        .route("/tasks/approve", post(handlers::goals::approve_task))
        // Feedback
        .route(
            "/feedback",
            get(handlers::feedback::feedback_page).post(handlers::feedback::submit_feedback),
        )
        // Reporting and insights
        .route("/reporting", get(handlers::reporting::reporting_page))
        .route("/insights", get(handlers::insights::insights_page))
        // Health
        .route("/health", get(handlers::health))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Pages behind the login take the session as an extractor; requests without
/// one are sent back to the name picker.
impl FromRequestParts<AppState> for SessionContext {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state
            .current_session(&parts.headers)
            .ok_or_else(|| Redirect::to("/"))
    }
}

fn session_token(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}
