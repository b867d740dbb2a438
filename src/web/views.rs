//! HTML rendering with embedded handlebars templates.

use std::sync::Arc;

use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

use crate::session::{Role, SessionContext};

const TEMPLATES: &[(&str, &str)] = &[
    ("layout", include_str!("templates/layout.hbs")),
    ("login", include_str!("templates/login.hbs")),
    ("goals", include_str!("templates/goals.hbs")),
    ("feedback", include_str!("templates/feedback.hbs")),
    ("reporting", include_str!("templates/reporting.hbs")),
    ("insights", include_str!("templates/insights.hbs")),
];

/// The four pages available once logged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Goals,
    Feedback,
    Reporting,
    Insights,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Self::Goals, Self::Feedback, Self::Reporting, Self::Insights];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Goals => "Goals & Tasks",
            Self::Feedback => "Feedback",
            Self::Reporting => "Reporting",
            Self::Insights => "Business Insights",
        }
    }

    pub fn href(&self) -> &'static str {
        match self {
            Self::Goals => "/goals",
            Self::Feedback => "/feedback",
            Self::Reporting => "/reporting",
            Self::Insights => "/insights",
        }
    }

    fn template(&self) -> &'static str {
        match self {
            Self::Goals => "goals",
            Self::Feedback => "feedback",
            Self::Reporting => "reporting",
            Self::Insights => "insights",
        }
    }
}

/// A transient message shown above the page content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Info,
    Warning,
    Error,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, message)
    }

    fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// An `<option>` of a `<select>`.
#[derive(Debug, Clone, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl ToString, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.to_string(),
            label: label.into(),
            selected,
        }
    }
}

#[derive(Serialize)]
struct NavItem {
    label: &'static str,
    href: &'static str,
    active: bool,
}

#[derive(Serialize)]
struct UserInfo<'a> {
    name: &'a str,
    role: Role,
}

#[derive(Serialize)]
struct Layout<'a> {
    title: &'a str,
    user: Option<UserInfo<'a>>,
    tabs: Vec<NavItem>,
    notices: &'a [Notice],
    body: String,
}

/// Registry of compiled templates, shared by all handlers.
#[derive(Clone)]
pub struct Views {
    registry: Arc<Handlebars<'static>>,
}

impl Views {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        for (name, source) in TEMPLATES {
            registry.register_template_string(name, source)?;
        }
        Ok(Self {
            registry: Arc::new(registry),
        })
    }

    /// Render the name picker shown before login.
    pub fn login<T: Serialize>(&self, notices: &[Notice], data: &T) -> Result<String, RenderError> {
        let body = self.registry.render("login", data)?;
        self.registry.render(
            "layout",
            &Layout {
                title: "Login",
                user: None,
                tabs: Vec::new(),
                notices,
                body,
            },
        )
    }

    /// Render one tab inside the navigation layout.
    pub fn tab<T: Serialize>(
        &self,
        tab: Tab,
        session: &SessionContext,
        notices: &[Notice],
        data: &T,
    ) -> Result<String, RenderError> {
        let body = self.registry.render(tab.template(), data)?;
        let tabs = Tab::ALL
            .iter()
            .map(|t| NavItem {
                label: t.label(),
                href: t.href(),
                active: *t == tab,
            })
            .collect();

        self.registry.render(
            "layout",
            &Layout {
                title: tab.label(),
                user: Some(UserInfo {
                    name: &session.name,
                    role: session.role,
                }),
                tabs,
                notices,
                body,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manager() -> SessionContext {
        SessionContext {
            employee_id: 2,
            name: "Bob".to_string(),
            role: Role::Manager,
        }
    }

    #[test]
    fn all_templates_compile() {
        assert!(Views::new().is_ok());
    }

    #[test]
    fn layout_marks_the_active_tab() {
        let views = Views::new().unwrap();
        let html = views
            .tab(
                Tab::Reporting,
                &manager(),
                &[],
                &json!({ "target_name": "Bob", "rows": [] }),
            )
            .unwrap();

        assert!(html.contains(r#"<a href="/reporting" class="active">Reporting</a>"#));
        assert!(html.contains("Role: <strong>Manager</strong>"));
    }

    #[test]
    fn notices_are_escaped() {
        let views = Views::new().unwrap();
        let html = views
            .login(&[Notice::error("<script>")], &json!({ "employees": [] }))
            .unwrap();

        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
