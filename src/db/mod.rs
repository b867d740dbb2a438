mod error;
mod schema;

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{Connection, OpenFlags, Row};
use uuid::Uuid;

use crate::models::*;

pub use error::{StoreError, StoreResult};

/// Handle to the relational store.
///
/// Cloning is cheap and shares the underlying pool. Every operation checks a
/// connection out for exactly one statement and hands it back when the guard
/// drops, so no operation can leak or close a connection another one uses.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

type Conn = PooledConnection<SqliteConnectionManager>;

fn init_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
}

impl Database {
    pub fn open(path: PathBuf, pool_size: u32) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;

        let manager = SqliteConnectionManager::file(&path).with_init(init_connection);
        let pool = Pool::builder().max_size(pool_size).build(manager)?;
        pool.get()?.pragma_update(None, "journal_mode", "WAL")?;

        tracing::debug!(path = %path.display(), pool_size, "Opened database");
        Ok(Self { pool })
    }

    /// A private in-memory database shared by all connections of the pool.
    pub fn open_memory() -> Result<Self> {
        let uri = format!(
            "file:perf-manager-{}?mode=memory&cache=shared",
            Uuid::new_v4()
        );
        let manager = SqliteConnectionManager::file(uri)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI,
            )
            .with_init(init_connection);

        // The database lives only while a connection is open, so idle
        // connections must never be reaped.
        let pool = Pool::builder()
            .max_size(4)
            .min_idle(Some(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: Pool<SqliteConnectionManager>) -> Self {
        Self { pool }
    }

    pub fn migrate(&self) -> StoreResult<()> {
        let mut conn = self.conn()?;
        schema::run_migrations(&mut conn)
    }

    fn conn(&self) -> StoreResult<Conn> {
        Ok(self.pool.get()?)
    }

    // ============================================================
    // Employee operations
    // ============================================================

    pub fn get_employee_by_id(&self, id: i64) -> StoreResult<Option<Employee>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT employee_id, name, manager_id FROM employees WHERE employee_id = ?",
        )?;

        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(employee_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn get_all_employees(&self) -> StoreResult<Vec<Employee>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT employee_id, name, manager_id FROM employees ORDER BY name, employee_id",
        )?;

        let employees = stmt
            .query_map([], employee_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(employees)
    }

    /// Direct reports of `manager_id`, ordered by name.
    pub fn get_employees_by_manager(&self, manager_id: i64) -> StoreResult<Vec<Employee>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT employee_id, name, manager_id FROM employees
             WHERE manager_id = ? ORDER BY name, employee_id",
        )?;

        let employees = stmt
            .query_map([manager_id], employee_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(employees)
    }

    pub fn add_employee(&self, name: &str, manager_id: Option<i64>) -> StoreResult<Employee> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO employees (name, manager_id) VALUES (?, ?)",
            (name, manager_id),
        )?;

        Ok(Employee {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            manager_id,
        })
    }

    /// Insert a batch of employees in one transaction.
    ///
    /// Managers are resolved by name against entries earlier in the batch or
    /// employees already stored. Nothing is inserted if any entry fails.
    pub fn seed_employees(&self, entries: &[SeedEmployee]) -> StoreResult<Vec<Employee>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut ids: HashMap<String, i64> = HashMap::new();
        {
            let mut stmt = tx.prepare("SELECT employee_id, name FROM employees")?;
            let existing = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(1)?, row.get::<_, i64>(0)?))
            })?;
            for entry in existing {
                let (name, id) = entry?;
                ids.insert(name, id);
            }
        }

        let mut inserted = Vec::with_capacity(entries.len());
        for entry in entries {
            let manager_id = match &entry.manager {
                Some(manager) => Some(*ids.get(manager).ok_or_else(|| {
                    StoreError::Seed(format!(
                        "manager '{}' of '{}' is not defined before it",
                        manager, entry.name
                    ))
                })?),
                None => None,
            };

            tx.execute(
                "INSERT INTO employees (name, manager_id) VALUES (?, ?)",
                (&entry.name, manager_id),
            )?;
            let id = tx.last_insert_rowid();
            ids.insert(entry.name.clone(), id);
            inserted.push(Employee {
                id,
                name: entry.name.clone(),
                manager_id,
            });
        }

        tx.commit()?;
        Ok(inserted)
    }

    // ============================================================
    // Goal operations
    // ============================================================

    /// Create a goal in the `Draft` state.
    pub fn create_goal(&self, input: CreateGoalInput) -> StoreResult<Goal> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO goals (description, due_date, status, employee_id, manager_id)
             VALUES (?, ?, 'Draft', ?, ?)",
            (
                &input.description,
                input.due_date.to_string(),
                input.employee_id,
                input.manager_id,
            ),
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(goal_id = id, employee_id = input.employee_id, "Created goal");

        Ok(Goal {
            id,
            description: input.description,
            due_date: input.due_date,
            status: GoalStatus::Draft,
            employee_id: input.employee_id,
            manager_id: input.manager_id,
        })
    }

    pub fn get_goal(&self, id: i64) -> StoreResult<Option<Goal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT goal_id, description, due_date, status, employee_id, manager_id
             FROM goals WHERE goal_id = ?",
        )?;

        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(goal_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn get_goals_for_employee(&self, employee_id: i64) -> StoreResult<Vec<Goal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT goal_id, description, due_date, status, employee_id, manager_id
             FROM goals WHERE employee_id = ? ORDER BY goal_id",
        )?;

        let goals = stmt
            .query_map([employee_id], goal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(goals)
    }

    /// Set a goal's status. Returns false when the goal does not exist.
    pub fn update_goal_status(&self, goal_id: i64, status: GoalStatus) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE goals SET status = ? WHERE goal_id = ?",
            (status.as_str(), goal_id),
        )?;
        Ok(rows > 0)
    }

    // ============================================================
    // Task operations
    // ============================================================

    pub fn create_task(&self, input: CreateTaskInput) -> StoreResult<Task> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tasks (description, goal_id, employee_id) VALUES (?, ?, ?)",
            (&input.description, input.goal_id, input.employee_id),
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(task_id = id, goal_id = input.goal_id, "Logged task");

        Ok(Task {
            id,
            description: input.description,
            goal_id: input.goal_id,
            employee_id: input.employee_id,
            is_approved: false,
        })
    }

    pub fn get_task(&self, id: i64) -> StoreResult<Option<Task>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT task_id, description, goal_id, employee_id, is_approved
             FROM tasks WHERE task_id = ?",
        )?;

        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(task_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn get_tasks_for_goal(&self, goal_id: i64) -> StoreResult<Vec<Task>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT task_id, description, goal_id, employee_id, is_approved
             FROM tasks WHERE goal_id = ? ORDER BY task_id",
        )?;

        let tasks = stmt
            .query_map([goal_id], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    /// Mark a task approved. Approving twice is harmless. Returns false when
    /// the task does not exist.
    pub fn approve_task(&self, task_id: i64) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute("UPDATE tasks SET is_approved = 1 WHERE task_id = ?", [task_id])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Feedback operations
    // ============================================================

    pub fn create_feedback(&self, input: CreateFeedbackInput) -> StoreResult<Feedback> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO feedback (feedback_text, goal_id, manager_id) VALUES (?, ?, ?)",
            (&input.text, input.goal_id, input.manager_id),
        )?;

        Ok(Feedback {
            id: conn.last_insert_rowid(),
            text: input.text,
            goal_id: input.goal_id,
            manager_id: input.manager_id,
        })
    }

    pub fn get_feedback_for_goal(&self, goal_id: i64) -> StoreResult<Vec<Feedback>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT feedback_id, feedback_text, goal_id, manager_id
             FROM feedback WHERE goal_id = ? ORDER BY feedback_id",
        )?;

        let feedback = stmt
            .query_map([goal_id], |row| {
                Ok(Feedback {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    goal_id: row.get(2)?,
                    manager_id: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(feedback)
    }

    // ============================================================
    // Reporting and insights
    // ============================================================

    /// Every goal of the employee joined with its feedback, latest due date
    /// first.
    pub fn get_performance_history(&self, employee_id: i64) -> StoreResult<Vec<PerformanceRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT g.description, g.due_date, g.status, f.feedback_text
             FROM goals g
             LEFT JOIN feedback f ON g.goal_id = f.goal_id
             WHERE g.employee_id = ?
             ORDER BY g.due_date DESC, g.goal_id, f.feedback_id",
        )?;

        let history = stmt
            .query_map([employee_id], |row| {
                Ok(PerformanceRecord {
                    description: row.get(0)?,
                    due_date: date_column(row, 1)?,
                    status: GoalStatus::from_str(&row.get::<_, String>(2)?)
                        .unwrap_or(GoalStatus::Draft),
                    feedback_text: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(history)
    }

    /// Number of completed goals, for one employee or for everyone.
    pub fn get_completed_goals_count(&self, employee_id: Option<i64>) -> StoreResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM goals
             WHERE status = 'Completed' AND (?1 IS NULL OR employee_id = ?1)",
            [employee_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Mean number of tasks over the goals that have any, or 0 without tasks.
    pub fn get_avg_tasks_per_goal(&self, employee_id: Option<i64>) -> StoreResult<f64> {
        let conn = self.conn()?;
        let avg: Option<f64> = conn.query_row(
            "SELECT AVG(task_count)
             FROM (
                 SELECT goal_id, COUNT(task_id) AS task_count
                 FROM tasks
                 WHERE ?1 IS NULL OR employee_id = ?1
                 GROUP BY goal_id
             ) AS goal_task_counts",
            [employee_id],
            |row| row.get(0),
        )?;
        Ok(avg.unwrap_or(0.0))
    }

    pub fn get_total_tasks(&self, employee_id: Option<i64>) -> StoreResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE ?1 IS NULL OR employee_id = ?1",
            [employee_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Shortest and longest span between a goal's creation and its due date.
    ///
    /// Goals carry no creation timestamp, so there is nothing to measure and
    /// both ends are always `None`.
    pub fn get_min_max_due_date_difference(
        &self,
    ) -> (Option<chrono::Duration>, Option<chrono::Duration>) {
        (None, None)
    }

    pub fn get_insights(&self, employee_id: Option<i64>) -> StoreResult<Insights> {
        let (min_days, max_days) = self.get_min_max_due_date_difference();
        Ok(Insights {
            completed_goals: self.get_completed_goals_count(employee_id)?,
            total_tasks: self.get_total_tasks(employee_id)?,
            avg_tasks_per_goal: self.get_avg_tasks_per_goal(employee_id)?,
            min_days,
            max_days,
        })
    }
}

pub fn default_database_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "perf-manager")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("perf-manager.db"))
}

fn employee_from_row(row: &Row) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: row.get(0)?,
        name: row.get(1)?,
        manager_id: row.get(2)?,
    })
}

fn goal_from_row(row: &Row) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: row.get(0)?,
        description: row.get(1)?,
        due_date: date_column(row, 2)?,
        status: GoalStatus::from_str(&row.get::<_, String>(3)?).unwrap_or(GoalStatus::Draft),
        employee_id: row.get(4)?,
        manager_id: row.get(5)?,
    })
}

fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        description: row.get(1)?,
        goal_id: row.get(2)?,
        employee_id: row.get(3)?,
        is_approved: row.get::<_, i64>(4)? != 0,
    })
}

/// Due dates are stored as `YYYY-MM-DD` text.
fn date_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
