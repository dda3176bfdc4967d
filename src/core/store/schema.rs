//! Database schema initialization

use miette::{IntoDiagnostic, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::SCHEMA_VERSION;

/// Create missing tables and verify the stored schema version
pub(super) fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            UNIQUE (product_id, name)
        );

        CREATE TABLE IF NOT EXISTS test_cases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category_id INTEGER NOT NULL REFERENCES categories(id),
            summary TEXT NOT NULL,
            text TEXT NOT NULL DEFAULT '',
            notes TEXT NOT NULL DEFAULT '',
            requirement TEXT NOT NULL DEFAULT '',
            script TEXT NOT NULL DEFAULT '',
            arguments TEXT NOT NULL DEFAULT '',
            extra_link TEXT NOT NULL DEFAULT '',
            author TEXT NOT NULL,
            create_date TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_test_cases_category ON test_cases(category_id);

        -- Tags are unique by name
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS test_case_tags (
            case_id INTEGER NOT NULL REFERENCES test_cases(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (case_id, tag_id)
        );
        CREATE INDEX IF NOT EXISTS idx_test_case_tags_tag ON test_case_tags(tag_id);

        -- Components are unique per product
        CREATE TABLE IF NOT EXISTS components (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            UNIQUE (product_id, name)
        );
        CREATE INDEX IF NOT EXISTS idx_components_name ON components(name);

        CREATE TABLE IF NOT EXISTS test_case_components (
            case_id INTEGER NOT NULL REFERENCES test_cases(id) ON DELETE CASCADE,
            component_id INTEGER NOT NULL REFERENCES components(id) ON DELETE CASCADE,
            PRIMARY KEY (case_id, component_id)
        );

        -- Notification CC list, one row per address
        CREATE TABLE IF NOT EXISTS test_case_cc (
            case_id INTEGER NOT NULL REFERENCES test_cases(id) ON DELETE CASCADE,
            email TEXT NOT NULL,
            PRIMARY KEY (case_id, email)
        );
        "#,
    )
    .into_diagnostic()?;

    let stored: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
        .optional()
        .into_diagnostic()?
        .flatten();

    match stored {
        None => {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .into_diagnostic()?;
        }
        Some(version) if version != SCHEMA_VERSION => {
            miette::bail!(
                "Database schema version {} is not supported (expected {})",
                version,
                SCHEMA_VERSION
            );
        }
        Some(_) => {}
    }

    Ok(())
}
