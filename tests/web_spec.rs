use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use perf_manager::db::Database;
use perf_manager::models::*;
use perf_manager::web::create_router;

struct Fixture {
    server: TestServer,
    db: Database,
    bob: Employee,
    alice: Employee,
}

/// Bob manages Alice.
fn setup() -> Fixture {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let team = db
        .seed_employees(&[
            SeedEmployee { name: "Bob".to_string(), manager: None },
            SeedEmployee { name: "Alice".to_string(), manager: Some("Bob".to_string()) },
        ])
        .expect("Failed to seed");

    let app = create_router(db.clone()).expect("Failed to build router");
    Fixture {
        server: TestServer::new(app).expect("Failed to create test server"),
        db,
        bob: team[0].clone(),
        alice: team[1].clone(),
    }
}

/// Log in and return the cookie to send with later requests.
async fn login(server: &TestServer, employee: &Employee) -> HeaderValue {
    let response = server
        .post("/login")
        .form(&[("employee_id", employee.id.to_string())])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);

    let set_cookie = response.header(header::SET_COOKIE);
    let cookie = set_cookie
        .to_str()
        .expect("Cookie is not ASCII")
        .split(';')
        .next()
        .expect("Empty cookie")
        .to_string();
    HeaderValue::from_str(&cookie).expect("Invalid cookie")
}

fn create_goal(db: &Database, employee: &Employee, manager: &Employee) -> Goal {
    db.create_goal(CreateGoalInput {
        description: "Finish report".to_string(),
        due_date: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).expect("Invalid date"),
        employee_id: employee.id,
        manager_id: manager.id,
    })
    .expect("Failed to create goal")
}

mod login {
    use super::*;

    #[tokio::test]
    async fn lists_employees_to_pick_from() {
        let f = setup();

        let response = f.server.get("/").await;

        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("Alice"));
        assert!(body.contains("Bob"));
    }

    #[tokio::test]
    async fn asks_for_employees_when_there_are_none() {
        let db = Database::open_memory().expect("Failed to create database");
        db.migrate().expect("Failed to migrate");
        let server = TestServer::new(create_router(db).expect("Failed to build router"))
            .expect("Failed to create test server");

        let response = server.get("/").await;

        response.assert_status_ok();
        assert!(response
            .text()
            .contains("No employees found. Please populate the employees table in your database."));
    }

    #[tokio::test]
    async fn rejects_an_unknown_employee() {
        let f = setup();

        let response = f
            .server
            .post("/login")
            .form(&[("employee_id", "9999")])
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert!(response.text().contains("No employee with that id."));
    }

    #[tokio::test]
    async fn redirects_pages_without_a_session() {
        let f = setup();

        for path in ["/goals", "/feedback", "/reporting", "/insights"] {
            let response = f.server.get(path).await;
            response.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(response.header(header::LOCATION), "/");
        }
    }

    #[tokio::test]
    async fn shows_role_in_sidebar() {
        let f = setup();
        let cookie = login(&f.server, &f.bob).await;

        let response = f
            .server
            .get("/goals")
            .add_header(header::COOKIE, cookie)
            .await;

        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("Role: <strong>Manager</strong>"));
        assert!(body.contains(r#"<a href="/goals" class="active">Goals &amp; Tasks</a>"#));
    }
}

mod goals {
    use super::*;

    #[tokio::test]
    async fn employees_cannot_see_the_new_goal_form() {
        let f = setup();
        let cookie = login(&f.server, &f.alice).await;

        let response = f
            .server
            .get("/goals")
            .add_header(header::COOKIE, cookie)
            .await;

        response.assert_status_ok();
        let body = response.text();
        assert!(!body.contains("Set a New Goal"));
        assert!(body.contains("Log a New Task"));
        assert!(body.contains("You have no goals assigned."));
    }

    #[tokio::test]
    async fn manager_sets_a_draft_goal_for_a_report() {
        let f = setup();
        let cookie = login(&f.server, &f.bob).await;

        let response = f
            .server
            .post("/goals")
            .add_header(header::COOKIE, cookie)
            .form(&[
                ("employee_id", f.alice.id.to_string()),
                ("description", "Finish report".to_string()),
                ("due_date", "2025-01-01".to_string()),
            ])
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("Goal set for Alice successfully!"));

        let goals = f.db.get_goals_for_employee(f.alice.id).expect("Query failed");
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].description, "Finish report");
        assert_eq!(goals[0].status, GoalStatus::Draft);
        assert_eq!(goals[0].manager_id, f.bob.id);
    }

    #[tokio::test]
    async fn incomplete_goal_is_a_warning_and_writes_nothing() {
        let f = setup();
        let cookie = login(&f.server, &f.bob).await;

        let response = f
            .server
            .post("/goals")
            .add_header(header::COOKIE, cookie)
            .form(&[
                ("employee_id", f.alice.id.to_string()),
                ("description", "   ".to_string()),
                ("due_date", "2025-01-01".to_string()),
            ])
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.text().contains("Please fill in all fields."));
        assert!(f.db.get_goals_for_employee(f.alice.id).expect("Query failed").is_empty());
    }

    #[tokio::test]
    async fn employees_cannot_set_goals() {
        let f = setup();
        let cookie = login(&f.server, &f.alice).await;

        let response = f
            .server
            .post("/goals")
            .add_header(header::COOKIE, cookie)
            .form(&[
                ("employee_id", f.bob.id.to_string()),
                ("description", "Manage better".to_string()),
                ("due_date", "2025-01-01".to_string()),
            ])
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert!(f.db.get_goals_for_employee(f.bob.id).expect("Query failed").is_empty());
    }

    #[tokio::test]
    async fn manager_updates_goal_status() {
        let f = setup();
        let goal = create_goal(&f.db, &f.alice, &f.bob);
        let cookie = login(&f.server, &f.bob).await;

        let response = f
            .server
            .post(&format!("/goals/{}/status", goal.id))
            .add_header(header::COOKIE, cookie)
            .form(&[
                ("status", "In Progress".to_string()),
                ("employee", f.alice.id.to_string()),
            ])
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("Goal status updated successfully!"));
        let stored = f.db.get_goal(goal.id).expect("Query failed").expect("Goal missing");
        assert_eq!(stored.status, GoalStatus::InProgress);
    }

    #[tokio::test]
    async fn unknown_goal_status_update_is_not_found() {
        let f = setup();
        let cookie = login(&f.server, &f.bob).await;

        let response = f
            .server
            .post("/goals/9999/status")
            .add_header(header::COOKIE, cookie)
            .form(&[("status", "Completed")])
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }
}

mod tasks {
    use super::*;

    #[tokio::test]
    async fn employee_logs_a_task_and_manager_approves_it() {
        let f = setup();
        let goal = create_goal(&f.db, &f.alice, &f.bob);

        let alice = login(&f.server, &f.alice).await;
        let response = f
            .server
            .post("/tasks")
            .add_header(header::COOKIE, alice)
            .form(&[
                ("goal_id", goal.id.to_string()),
                ("description", "Draft outline".to_string()),
            ])
            .await;
        response.assert_status_ok();
        assert!(response
            .text()
            .contains("Task logged successfully, awaiting manager approval!"));

        let tasks = f.db.get_tasks_for_goal(goal.id).expect("Query failed");
        assert_eq!(tasks.len(), 1);
        assert!(!tasks[0].is_approved);

        let bob = login(&f.server, &f.bob).await;
        let response = f
            .server
            .post("/tasks/approve")
            .add_header(header::COOKIE, bob)
            .form(&[
                ("task_id", tasks[0].id.to_string()),
                ("employee", f.alice.id.to_string()),
            ])
            .await;
        response.assert_status_ok();
        assert!(response.text().contains("Task approved!"));

        let task = f.db.get_task(tasks[0].id).expect("Query failed").expect("Task missing");
        assert!(task.is_approved);
    }

    #[tokio::test]
    async fn employees_cannot_approve_their_own_tasks() {
        let f = setup();
        let goal = create_goal(&f.db, &f.alice, &f.bob);
        let task = f
            .db
            .create_task(CreateTaskInput {
                description: "Draft outline".to_string(),
                goal_id: goal.id,
                employee_id: f.alice.id,
            })
            .expect("Failed to create task");
        let cookie = login(&f.server, &f.alice).await;

        let response = f
            .server
            .post("/tasks/approve")
            .add_header(header::COOKIE, cookie)
            .form(&[("task_id", task.id.to_string())])
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        let stored = f.db.get_task(task.id).expect("Query failed").expect("Task missing");
        assert!(!stored.is_approved);
    }

    #[tokio::test]
    async fn task_without_description_is_a_warning() {
        let f = setup();
        let goal = create_goal(&f.db, &f.alice, &f.bob);
        let cookie = login(&f.server, &f.alice).await;

        let response = f
            .server
            .post("/tasks")
            .add_header(header::COOKIE, cookie)
            .form(&[("goal_id", goal.id.to_string()), ("description", String::new())])
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(f.db.get_tasks_for_goal(goal.id).expect("Query failed").is_empty());
    }
}

mod feedback {
    use super::*;

    #[tokio::test]
    async fn manager_feedback_reaches_the_employee() {
        let f = setup();
        let goal = create_goal(&f.db, &f.alice, &f.bob);

        let bob = login(&f.server, &f.bob).await;
        let response = f
            .server
            .post("/feedback")
            .add_header(header::COOKIE, bob)
            .form(&[
                ("goal_id", goal.id.to_string()),
                ("text", "Great progress".to_string()),
                ("employee", f.alice.id.to_string()),
            ])
            .await;
        response.assert_status_ok();
        assert!(response.text().contains("Feedback submitted successfully!"));

        let alice = login(&f.server, &f.alice).await;
        let response = f
            .server
            .get("/feedback")
            .add_header(header::COOKIE, alice)
            .await;
        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("Feedback for Goal: Finish report"));
        assert!(body.contains("From Bob:"));
        assert!(body.contains("Great progress"));
    }

    #[tokio::test]
    async fn employees_cannot_give_feedback() {
        let f = setup();
        let goal = create_goal(&f.db, &f.alice, &f.bob);
        let cookie = login(&f.server, &f.alice).await;

        let response = f
            .server
            .post("/feedback")
            .add_header(header::COOKIE, cookie)
            .form(&[("goal_id", goal.id.to_string()), ("text", "Self praise".to_string())])
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert!(f.db.get_feedback_for_goal(goal.id).expect("Query failed").is_empty());
    }
}

mod reporting {
    use super::*;

    #[tokio::test]
    async fn manager_sees_the_report_history() {
        let f = setup();
        let goal = create_goal(&f.db, &f.alice, &f.bob);
        f.db.create_feedback(CreateFeedbackInput {
            text: "Well structured".to_string(),
            goal_id: goal.id,
            manager_id: f.bob.id,
        })
        .expect("Failed to create feedback");
        let cookie = login(&f.server, &f.bob).await;

        let response = f
            .server
            .get("/reporting")
            .add_query_param("employee", f.alice.id)
            .add_header(header::COOKIE, cookie)
            .await;

        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("Performance History for Alice"));
        assert!(body.contains("<td>Finish report</td><td>2025-01-01</td><td>Draft</td><td>Well structured</td>"));
    }

    #[tokio::test]
    async fn employee_sees_their_own_history() {
        let f = setup();
        let cookie = login(&f.server, &f.alice).await;

        let response = f
            .server
            .get("/reporting")
            .add_header(header::COOKIE, cookie)
            .await;

        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("Performance History for Alice"));
        assert!(body.contains("No performance history found for this employee."));
    }
}

mod insights {
    use super::*;

    #[tokio::test]
    async fn shows_metrics_without_min_max_days() {
        let f = setup();
        let goal = create_goal(&f.db, &f.alice, &f.bob);
        f.db.update_goal_status(goal.id, GoalStatus::Completed)
            .expect("Update failed");
        let cookie = login(&f.server, &f.bob).await;

        let response = f
            .server
            .get("/insights")
            .add_header(header::COOKIE, cookie)
            .await;

        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("All Employees"));
        assert!(body.contains("0.00"));
        assert!(body.contains("Not enough data to calculate min/max days."));
    }

    #[tokio::test]
    async fn manager_narrows_to_one_report() {
        let f = setup();
        let cookie = login(&f.server, &f.bob).await;

        let response = f
            .server
            .get("/insights")
            .add_query_param("employee", f.alice.id)
            .add_header(header::COOKIE, cookie)
            .await;

        response.assert_status_ok();
        assert!(response
            .text()
            .contains("Showing metrics for <strong>Alice</strong>."));
    }
}

#[tokio::test]
async fn health_check_reports_ok() {
    let f = setup();

    let response = f.server.get("/health").await;

    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["status"], "ok");
}

mod blank_selections {
    use super::*;

    #[tokio::test]
    async fn goal_without_employee_is_a_warning() {
        let f = setup();
        let cookie = login(&f.server, &f.bob).await;

        let response = f
            .server
            .post("/goals")
            .add_header(header::COOKIE, cookie)
            .form(&[("description", "Finish report"), ("due_date", "2025-01-01")])
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.text().contains("Please fill in all fields."));
        assert!(f.db.get_goals_for_employee(f.alice.id).expect("Query failed").is_empty());
    }

    #[tokio::test]
    async fn task_with_empty_goal_is_a_warning() {
        let f = setup();
        create_goal(&f.db, &f.alice, &f.bob);
        let cookie = login(&f.server, &f.alice).await;

        let response = f
            .server
            .post("/tasks")
            .add_header(header::COOKIE, cookie)
            .form(&[("goal_id", ""), ("description", "Draft outline")])
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.text().contains("Please fill in all fields."));
        assert_eq!(f.db.get_total_tasks(None).expect("Query failed"), 0);
    }

    #[tokio::test]
    async fn feedback_with_empty_goal_is_a_warning() {
        let f = setup();
        let cookie = login(&f.server, &f.bob).await;

        let response = f
            .server
            .post("/feedback")
            .add_header(header::COOKIE, cookie)
            .form(&[("goal_id", ""), ("text", "Great progress"), ("employee", "")])
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.text().contains("Please fill in all fields."));
    }

    #[tokio::test]
    async fn approval_without_task_is_a_warning() {
        let f = setup();
        let cookie = login(&f.server, &f.bob).await;

        let response = f
            .server
            .post("/tasks/approve")
            .add_header(header::COOKIE, cookie)
            .form(&[("task_id", "")])
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.text().contains("Please select a task to approve."));
    }

    #[tokio::test]
    async fn status_update_without_status_is_a_warning() {
        let f = setup();
        let goal = create_goal(&f.db, &f.alice, &f.bob);
        let cookie = login(&f.server, &f.bob).await;

        let response = f
            .server
            .post(&format!("/goals/{}/status", goal.id))
            .add_header(header::COOKIE, cookie)
            .form(&[("employee", f.alice.id.to_string())])
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let stored = f.db.get_goal(goal.id).expect("Query failed").expect("Goal missing");
        assert_eq!(stored.status, GoalStatus::Draft);
    }

    #[tokio::test]
    async fn login_without_a_name_is_a_warning() {
        let f = setup();

        let response = f.server.post("/login").form(&[("employee_id", "")]).await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.text().contains("Please select your name."));
    }

    #[tokio::test]
    async fn blank_employee_query_falls_back_to_first_report() {
        let f = setup();
        let cookie = login(&f.server, &f.bob).await;

        let response = f
            .server
            .get("/reporting")
            .add_query_param("employee", "")
            .add_header(header::COOKIE, cookie)
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("Performance History for Alice"));
    }
}

mod sessions {
    use super::*;

    #[tokio::test]
    async fn stale_cookie_is_told_to_log_in_again() {
        let f = setup();
        let stale = format!("perf_session={}", uuid::Uuid::new_v4());

        let response = f
            .server
            .get("/")
            .add_header(header::COOKIE, HeaderValue::from_str(&stale).expect("Invalid cookie"))
            .await;

        response.assert_status_ok();
        assert!(response
            .text()
            .contains("Your session has expired. Please log in again."));
    }

    #[tokio::test]
    async fn logging_in_again_replaces_the_previous_session() {
        let f = setup();
        let first = login(&f.server, &f.bob).await;

        let response = f
            .server
            .post("/login")
            .add_header(header::COOKIE, first.clone())
            .form(&[("employee_id", f.alice.id.to_string())])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        let response = f
            .server
            .get("/goals")
            .add_header(header::COOKIE, first)
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
    }
}
