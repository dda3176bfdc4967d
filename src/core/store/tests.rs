use super::queries;
use super::*;
use tempfile::TempDir;

fn open_store() -> (TempDir, EntityStore) {
    let tmp = TempDir::new().unwrap();
    let store = EntityStore::open(tmp.path().join("nested/dir/casebook.db")).unwrap();
    (tmp, store)
}

#[test]
fn test_open_creates_parent_directories() {
    let (tmp, store) = open_store();
    assert!(store.path().exists());
    assert!(tmp.path().join("nested/dir").is_dir());
}

#[test]
fn test_reopen_keeps_data() {
    let (_tmp, store) = open_store();
    store
        .write(|tx| queries::create_product(tx, "Kiwi", "").map(|_| ()))
        .unwrap();

    let reopened = EntityStore::open(store.path()).unwrap();
    let product = reopened
        .read(|conn| queries::find_product(conn, "Kiwi"))
        .unwrap();
    assert!(product.is_some());
}

#[test]
fn test_write_rolls_back_on_error() {
    let (_tmp, store) = open_store();

    let result: std::result::Result<(), rusqlite::Error> = store.write(|tx| {
        queries::create_product(tx, "Doomed", "")?;
        Err(rusqlite::Error::QueryReturnedNoRows)
    });
    assert!(result.is_err());

    let product = store
        .read(|conn| queries::find_product(conn, "Doomed"))
        .unwrap();
    assert!(product.is_none());
}

#[test]
fn test_foreign_keys_are_enforced() {
    let (_tmp, store) = open_store();
    let result = store.write(|tx| queries::create_category(tx, 999, "orphan"));
    assert!(result.is_err());
}

#[test]
fn test_unsupported_schema_version_is_rejected() {
    let (_tmp, store) = open_store();
    store
        .write(|tx| tx.execute("UPDATE schema_version SET version = 99", []).map(|_| ()))
        .unwrap();

    assert!(EntityStore::open(store.path()).is_err());
}

#[test]
fn test_component_names_unique_per_product_only() {
    let (_tmp, store) = open_store();
    let result: std::result::Result<(), rusqlite::Error> = store.write(|tx| {
        let p1 = queries::create_product(tx, "P1", "")?;
        let p2 = queries::create_product(tx, "P2", "")?;
        queries::create_component(tx, p1.id, "ui", "")?;
        queries::create_component(tx, p2.id, "ui", "")?;
        Ok(())
    });
    assert!(result.is_ok());

    let duplicate = store.write(|tx| {
        let p1 = queries::find_product(tx, "P1")?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        queries::create_component(tx, p1.id, "ui", "")
    });
    assert!(duplicate.is_err());
}
