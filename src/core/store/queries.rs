//! Row-level reads and writes against the entity store
//!
//! Every function takes a borrowed connection so callers decide the
//! transactional scope; a `Transaction` derefs to `Connection`.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    parse_timestamp, CaseField, Category, Component, NewTestCase, Product, Tag, TestCase,
};

const CASE_COLUMNS: &str = "tc.id, tc.summary, tc.text, tc.notes, tc.requirement, tc.script, \
     tc.arguments, tc.extra_link, tc.author, tc.create_date, tc.category_id, c.product_id";

fn case_from_row(row: &Row<'_>) -> rusqlite::Result<TestCase> {
    Ok(TestCase {
        id: row.get(0)?,
        summary: row.get(1)?,
        text: row.get(2)?,
        notes: row.get(3)?,
        requirement: row.get(4)?,
        script: row.get(5)?,
        arguments: row.get(6)?,
        extra_link: row.get(7)?,
        author: row.get(8)?,
        create_date: parse_timestamp(row.get::<_, String>(9)?),
        category_id: row.get(10)?,
        product_id: row.get(11)?,
    })
}

fn component_from_row(row: &Row<'_>) -> rusqlite::Result<Component> {
    Ok(Component {
        id: row.get(0)?,
        name: row.get(1)?,
        product_id: row.get(2)?,
        description: row.get(3)?,
    })
}

fn collect_ids(conn: &Connection, sql: &str, case_id: i64) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![case_id], |row| row.get(0))?;
    rows.collect()
}

// =========================================================================
// Catalog
// =========================================================================

pub fn create_product(conn: &Connection, name: &str, description: &str) -> rusqlite::Result<Product> {
    conn.execute(
        "INSERT INTO products (name, description) VALUES (?1, ?2)",
        params![name, description],
    )?;
    Ok(Product {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        description: description.to_string(),
    })
}

pub fn find_product(conn: &Connection, name: &str) -> rusqlite::Result<Option<Product>> {
    conn.query_row(
        "SELECT id, name, description FROM products WHERE name = ?1",
        params![name],
        |row| {
            Ok(Product {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
            })
        },
    )
    .optional()
}

pub fn create_category(conn: &Connection, product_id: i64, name: &str) -> rusqlite::Result<Category> {
    conn.execute(
        "INSERT INTO categories (product_id, name) VALUES (?1, ?2)",
        params![product_id, name],
    )?;
    Ok(Category {
        id: conn.last_insert_rowid(),
        product_id,
        name: name.to_string(),
    })
}

pub fn find_category(conn: &Connection, product_id: i64, name: &str) -> rusqlite::Result<Option<Category>> {
    conn.query_row(
        "SELECT id, product_id, name FROM categories WHERE product_id = ?1 AND name = ?2",
        params![product_id, name],
        |row| {
            Ok(Category {
                id: row.get(0)?,
                product_id: row.get(1)?,
                name: row.get(2)?,
            })
        },
    )
    .optional()
}

pub fn create_component(
    conn: &Connection,
    product_id: i64,
    name: &str,
    description: &str,
) -> rusqlite::Result<Component> {
    conn.execute(
        "INSERT INTO components (product_id, name, description) VALUES (?1, ?2, ?3)",
        params![product_id, name, description],
    )?;
    Ok(Component {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        product_id,
        description: description.to_string(),
    })
}

/// Strict component lookup scoped to one product
pub fn find_component(
    conn: &Connection,
    name: &str,
    product_id: i64,
) -> rusqlite::Result<Option<Component>> {
    conn.query_row(
        "SELECT id, name, product_id, description FROM components WHERE name = ?1 AND product_id = ?2",
        params![name, product_id],
        component_from_row,
    )
    .optional()
}

// =========================================================================
// Tags
// =========================================================================

/// Strict tag lookup by name
pub fn find_tag(conn: &Connection, name: &str) -> rusqlite::Result<Option<Tag>> {
    conn.query_row(
        "SELECT id, name FROM tags WHERE name = ?1",
        params![name],
        |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
}

/// Resolve a tag by name, creating it when absent
pub fn get_or_create_tag(conn: &Connection, name: &str) -> rusqlite::Result<Tag> {
    conn.execute(
        "INSERT OR IGNORE INTO tags (name) VALUES (?1)",
        params![name],
    )?;
    conn.query_row(
        "SELECT id, name FROM tags WHERE name = ?1",
        params![name],
        |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
}

/// Attach a tag; returns false when the association already existed
pub fn attach_tag(conn: &Connection, case_id: i64, tag_id: i64) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO test_case_tags (case_id, tag_id) VALUES (?1, ?2)",
        params![case_id, tag_id],
    )?;
    Ok(inserted > 0)
}

/// Detach a tag; returns false when there was nothing to remove
pub fn detach_tag(conn: &Connection, case_id: i64, tag_id: i64) -> rusqlite::Result<bool> {
    let removed = conn.execute(
        "DELETE FROM test_case_tags WHERE case_id = ?1 AND tag_id = ?2",
        params![case_id, tag_id],
    )?;
    Ok(removed > 0)
}

pub fn case_tag_ids(conn: &Connection, case_id: i64) -> rusqlite::Result<Vec<i64>> {
    collect_ids(
        conn,
        "SELECT tag_id FROM test_case_tags WHERE case_id = ?1 ORDER BY tag_id",
        case_id,
    )
}

// =========================================================================
// Components
// =========================================================================

pub fn attach_component(conn: &Connection, case_id: i64, component_id: i64) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO test_case_components (case_id, component_id) VALUES (?1, ?2)",
        params![case_id, component_id],
    )?;
    Ok(inserted > 0)
}

pub fn detach_component(conn: &Connection, case_id: i64, component_id: i64) -> rusqlite::Result<bool> {
    let removed = conn.execute(
        "DELETE FROM test_case_components WHERE case_id = ?1 AND component_id = ?2",
        params![case_id, component_id],
    )?;
    Ok(removed > 0)
}

pub fn case_component_ids(conn: &Connection, case_id: i64) -> rusqlite::Result<Vec<i64>> {
    collect_ids(
        conn,
        "SELECT component_id FROM test_case_components WHERE case_id = ?1 ORDER BY component_id",
        case_id,
    )
}

pub fn case_components(conn: &Connection, case_id: i64) -> rusqlite::Result<Vec<Component>> {
    let mut stmt = conn.prepare(
        r#"SELECT cmp.id, cmp.name, cmp.product_id, cmp.description
           FROM test_case_components tcc
           JOIN components cmp ON cmp.id = tcc.component_id
           WHERE tcc.case_id = ?1
           ORDER BY cmp.id"#,
    )?;
    let rows = stmt.query_map(params![case_id], component_from_row)?;
    rows.collect()
}

// =========================================================================
// Notification CC
// =========================================================================

pub fn cc_list(conn: &Connection, case_id: i64) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT email FROM test_case_cc WHERE case_id = ?1 ORDER BY email")?;
    let rows = stmt.query_map(params![case_id], |row| row.get(0))?;
    rows.collect()
}

pub fn add_cc(conn: &Connection, case_id: i64, email: &str) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO test_case_cc (case_id, email) VALUES (?1, ?2)",
        params![case_id, email],
    )?;
    Ok(inserted > 0)
}

pub fn remove_cc(conn: &Connection, case_id: i64, email: &str) -> rusqlite::Result<bool> {
    let removed = conn.execute(
        "DELETE FROM test_case_cc WHERE case_id = ?1 AND email = ?2",
        params![case_id, email],
    )?;
    Ok(removed > 0)
}

// =========================================================================
// Test Cases
// =========================================================================

pub fn create_case(conn: &Connection, new: &NewTestCase) -> rusqlite::Result<TestCase> {
    conn.execute(
        r#"INSERT INTO test_cases (category_id, summary, text, author, create_date)
           VALUES (?1, ?2, ?3, ?4, ?5)"#,
        params![
            new.category_id,
            new.summary,
            new.text,
            new.author,
            Utc::now().to_rfc3339()
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_case(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_case(conn: &Connection, case_id: i64) -> rusqlite::Result<Option<TestCase>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM test_cases tc JOIN categories c ON c.id = tc.category_id WHERE tc.id = ?1",
            CASE_COLUMNS
        ),
        params![case_id],
        case_from_row,
    )
    .optional()
}

/// Overwrite one scalar field; the column comes from the closed `CaseField` set
pub fn set_case_field(
    conn: &Connection,
    case_id: i64,
    field: CaseField,
    value: &str,
) -> rusqlite::Result<usize> {
    conn.execute(
        &format!("UPDATE test_cases SET {} = ?1 WHERE id = ?2", field.column()),
        params![value, case_id],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::EntityStore;
    use tempfile::TempDir;

    fn store() -> (TempDir, EntityStore) {
        let tmp = TempDir::new().unwrap();
        let store = EntityStore::open(tmp.path().join("test.db")).unwrap();
        (tmp, store)
    }

    fn seed_case(conn: &Connection) -> TestCase {
        let product = create_product(conn, "StarCraft", "").unwrap();
        let category = create_category(conn, product.id, "--default--").unwrap();
        create_case(
            conn,
            &NewTestCase {
                category_id: category.id,
                summary: "Zerg rush".to_string(),
                text: String::new(),
                author: "tester".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_create_and_get_case_joins_product() {
        let (_tmp, store) = store();
        let conn = store.connect().unwrap();
        let case = seed_case(&conn);

        let loaded = get_case(&conn, case.id).unwrap().unwrap();
        assert_eq!(loaded.summary, "Zerg rush");
        assert_eq!(loaded.product_id, find_product(&conn, "StarCraft").unwrap().unwrap().id);
        assert!(get_case(&conn, case.id + 100).unwrap().is_none());
    }

    #[test]
    fn test_get_or_create_tag_reuses_existing() {
        let (_tmp, store) = store();
        let conn = store.connect().unwrap();

        let first = get_or_create_tag(&conn, "smoke").unwrap();
        let second = get_or_create_tag(&conn, "smoke").unwrap();
        assert_eq!(first, second);
        assert!(find_tag(&conn, "regression").unwrap().is_none());
    }

    #[test]
    fn test_attach_tag_reports_duplicates() {
        let (_tmp, store) = store();
        let conn = store.connect().unwrap();
        let case = seed_case(&conn);
        let tag = get_or_create_tag(&conn, "smoke").unwrap();

        assert!(attach_tag(&conn, case.id, tag.id).unwrap());
        assert!(!attach_tag(&conn, case.id, tag.id).unwrap());
        assert_eq!(case_tag_ids(&conn, case.id).unwrap(), vec![tag.id]);

        assert!(detach_tag(&conn, case.id, tag.id).unwrap());
        assert!(!detach_tag(&conn, case.id, tag.id).unwrap());
        assert!(case_tag_ids(&conn, case.id).unwrap().is_empty());
    }

    #[test]
    fn test_find_component_is_product_scoped() {
        let (_tmp, store) = store();
        let conn = store.connect().unwrap();
        let p1 = create_product(&conn, "P1", "").unwrap();
        let p2 = create_product(&conn, "P2", "").unwrap();
        let c = create_component(&conn, p2.id, "engine", "").unwrap();

        assert!(find_component(&conn, "engine", p1.id).unwrap().is_none());
        assert_eq!(find_component(&conn, "engine", p2.id).unwrap(), Some(c));
    }

    #[test]
    fn test_find_category_by_product_and_name() {
        let (_tmp, store) = store();
        let conn = store.connect().unwrap();
        let product = create_product(&conn, "StarCraft", "").unwrap();
        let category = create_category(&conn, product.id, "--default--").unwrap();

        assert_eq!(
            find_category(&conn, product.id, "--default--").unwrap(),
            Some(category)
        );
        assert!(find_category(&conn, product.id, "smoke").unwrap().is_none());
    }

    #[test]
    fn test_cc_list_is_a_set() {
        let (_tmp, store) = store();
        let conn = store.connect().unwrap();
        let case = seed_case(&conn);

        assert!(add_cc(&conn, case.id, "b@x.com").unwrap());
        assert!(add_cc(&conn, case.id, "a@x.com").unwrap());
        assert!(!add_cc(&conn, case.id, "a@x.com").unwrap());
        assert_eq!(cc_list(&conn, case.id).unwrap(), vec!["a@x.com", "b@x.com"]);

        assert!(!remove_cc(&conn, case.id, "c@x.com").unwrap());
        assert!(remove_cc(&conn, case.id, "a@x.com").unwrap());
        assert_eq!(cc_list(&conn, case.id).unwrap(), vec!["b@x.com"]);
    }

    #[test]
    fn test_set_case_field_allows_empty_string() {
        let (_tmp, store) = store();
        let conn = store.connect().unwrap();
        let case = seed_case(&conn);

        set_case_field(&conn, case.id, CaseField::Text, "steps").unwrap();
        set_case_field(&conn, case.id, CaseField::Notes, "").unwrap();
        let loaded = get_case(&conn, case.id).unwrap().unwrap();
        assert_eq!(loaded.text, "steps");
        assert_eq!(loaded.notes, "");
        assert_eq!(loaded.summary, "Zerg rush");
    }
}
