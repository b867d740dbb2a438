use rusqlite::Connection;

use super::error::{StoreError, StoreResult};

struct Migration {
    version: &'static str,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "001",
        name: "initial",
        sql: include_str!("migrations/001_initial.sql"),
    },
    Migration {
        version: "002",
        name: "lookup_indexes",
        sql: include_str!("migrations/002_lookup_indexes.sql"),
    },
];

/// Bring the schema up to date. Each pending migration runs in its own
/// transaction and is recorded in `schema_migrations`.
pub fn run_migrations(conn: &mut Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )?;

    let mut applied = applied_versions(conn)?;
    if applied.is_empty() && has_table(conn, "employees")? {
        // Tables created outside the runner match the first migration.
        let initial = &MIGRATIONS[0];
        record(conn, initial)?;
        tracing::info!(version = initial.version, "Baselined existing database");
        applied.push(initial.version.to_string());
    }

    for migration in MIGRATIONS
        .iter()
        .filter(|m| !applied.iter().any(|v| v == m.version))
    {
        apply_migration(conn, migration)?;
    }
    Ok(())
}

fn applied_versions(conn: &Connection) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(versions)
}

fn has_table(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        [name],
        |row| row.get(0),
    )
}

fn record(conn: &Connection, migration: &Migration) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
        (
            migration.version,
            migration.name,
            chrono::Utc::now().to_rfc3339(),
        ),
    )?;
    Ok(())
}

fn apply_migration(conn: &mut Connection, migration: &Migration) -> StoreResult<()> {
    let failed = |source| StoreError::Migration {
        version: migration.version,
        name: migration.name,
        source,
    };

    let tx = conn.transaction().map_err(failed)?;
    tx.execute_batch(migration.sql).map_err(failed)?;
    record(&tx, migration).map_err(failed)?;
    tx.commit().map_err(failed)?;

    tracing::info!(
        version = migration.version,
        name = migration.name,
        "Applied migration"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_gets_every_migration() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        for table in ["employees", "goals", "tasks", "feedback"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }

        let versions = applied_versions(&conn).unwrap();
        assert_eq!(versions, vec!["001", "002"]);
    }

    #[test]
    fn rerunning_migrations_is_a_no_op() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        let versions = applied_versions(&conn).unwrap();
        assert_eq!(versions, vec!["001", "002"]);
    }

    #[test]
    fn hand_provisioned_database_is_baselined() {
        let mut conn = Connection::open_in_memory().unwrap();

        conn.execute_batch(
            "
            CREATE TABLE employees (employee_id INTEGER PRIMARY KEY, name TEXT NOT NULL, manager_id INTEGER);
            CREATE TABLE goals (goal_id INTEGER PRIMARY KEY, description TEXT, due_date TEXT, status TEXT, employee_id INTEGER, manager_id INTEGER);
            CREATE TABLE tasks (task_id INTEGER PRIMARY KEY, description TEXT, goal_id INTEGER, employee_id INTEGER, is_approved INTEGER DEFAULT 0);
            CREATE TABLE feedback (feedback_id INTEGER PRIMARY KEY, feedback_text TEXT, goal_id INTEGER, manager_id INTEGER);
            INSERT INTO employees (employee_id, name, manager_id) VALUES (2, 'Bob', NULL), (1, 'Alice', 2);
        ",
        )
        .unwrap();

        run_migrations(&mut conn).unwrap();

        let versions = applied_versions(&conn).unwrap();
        assert_eq!(versions, vec!["001", "002"]);

        let employees: i64 = conn
            .query_row("SELECT COUNT(*) FROM employees", [], |row| row.get(0))
            .unwrap();
        assert_eq!(employees, 2);
    }

    #[test]
    fn failed_migration_is_rolled_back_and_named() {
        let mut conn = Connection::open_in_memory().unwrap();
        let broken = Migration {
            version: "999",
            name: "broken",
            sql: "CREATE TABLE;",
        };
        conn.execute_batch(
            "CREATE TABLE schema_migrations (version TEXT PRIMARY KEY, name TEXT NOT NULL, applied_at TEXT NOT NULL)",
        )
        .unwrap();

        let err = apply_migration(&mut conn, &broken).unwrap_err();
        assert!(matches!(err, StoreError::Migration { version: "999", .. }));
        assert!(applied_versions(&conn).unwrap().is_empty());
    }
}
