//! Test case mutation handlers
//!
//! Each handler is one unit of work: authorize, then read-check-mutate-commit
//! inside a single store transaction. A denied caller never reaches the store.

use std::collections::BTreeMap;

use rusqlite::Connection;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::core::permission::{Action, Caller, PermissionOracle};
use crate::core::store::{queries, CaseField, CaseRecord, CaseSummary, Component, EntityStore, TestCase};
use crate::rpc::filter::CaseFilter;
use crate::rpc::RpcError;

/// The `TestCase.*` operations over a store and a permission oracle
#[derive(Debug, Clone)]
pub struct TestCaseService<O> {
    store: EntityStore,
    oracle: O,
}

impl<O: PermissionOracle> TestCaseService<O> {
    pub fn new(store: EntityStore, oracle: O) -> Self {
        Self { store, oracle }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Fail with `Unauthorized` unless the oracle allows `action`
    pub fn authorize(&self, caller: &Caller, action: Action) -> Result<(), RpcError> {
        if self.oracle.authorize(caller, action) {
            Ok(())
        } else {
            warn!(user = %caller.username, %action, "permission denied");
            Err(RpcError::Unauthorized { action })
        }
    }

    /// Overwrite whitelisted scalar fields and return the updated record
    pub fn update(
        &self,
        caller: &Caller,
        case_id: i64,
        fields: &Map<String, Value>,
    ) -> Result<CaseRecord, RpcError> {
        self.authorize(caller, Action::ChangeTestCase)?;
        let changes = parse_update_fields(fields)?;

        self.store.write(|tx| {
            let case = load_case(tx, case_id)?;
            let mut written = 0;
            for (field, value) in &changes {
                if case.field(*field) != value.as_str() {
                    queries::set_case_field(tx, case_id, *field, value)?;
                    written += 1;
                }
            }
            debug!(case_id, fields = changes.len(), written, "test case updated");
            case_record(tx, case_id)
        })
    }

    /// Attach a tag by name, creating the tag if it does not exist yet
    pub fn add_tag(&self, caller: &Caller, case_id: i64, tag_name: &str) -> Result<(), RpcError> {
        self.authorize(caller, Action::AddTestCaseTag)?;
        let tag_name = normalize_tag(tag_name)?;

        self.store.write(|tx| {
            load_case(tx, case_id)?;
            let tag = queries::get_or_create_tag(tx, tag_name)?;
            let added = queries::attach_tag(tx, case_id, tag.id)?;
            debug!(case_id, tag = %tag.name, added, "add_tag");
            Ok(())
        })
    }

    /// Detach a tag by name; an unattached tag is left alone
    pub fn remove_tag(&self, caller: &Caller, case_id: i64, tag_name: &str) -> Result<(), RpcError> {
        self.authorize(caller, Action::DeleteTestCaseTag)?;
        let tag_name = normalize_tag(tag_name)?;

        self.store.write(|tx| {
            load_case(tx, case_id)?;
            let tag = queries::find_tag(tx, tag_name)?.ok_or_else(|| {
                RpcError::not_found("Tag", format!("no tag named '{}'", tag_name))
            })?;
            let removed = queries::detach_tag(tx, case_id, tag.id)?;
            debug!(case_id, tag = %tag.name, removed, "remove_tag");
            Ok(())
        })
    }

    /// Attach a component of the case's own product
    pub fn add_component(
        &self,
        caller: &Caller,
        case_id: i64,
        component_name: &str,
    ) -> Result<CaseRecord, RpcError> {
        self.authorize(caller, Action::AddTestCaseComponent)?;

        self.store.write(|tx| {
            let case = load_case(tx, case_id)?;
            let component = resolve_component(tx, &case, component_name)?;
            let added = queries::attach_component(tx, case_id, component.id)?;
            debug!(case_id, component_id = component.id, added, "add_component");
            case_record(tx, case_id)
        })
    }

    /// Detach a component of the case's own product
    pub fn remove_component(
        &self,
        caller: &Caller,
        case_id: i64,
        component_name: &str,
    ) -> Result<CaseRecord, RpcError> {
        self.authorize(caller, Action::DeleteTestCaseComponent)?;

        self.store.write(|tx| {
            let case = load_case(tx, case_id)?;
            let component = resolve_component(tx, &case, component_name)?;
            let removed = queries::detach_component(tx, case_id, component.id)?;
            debug!(case_id, component_id = component.id, removed, "remove_component");
            case_record(tx, case_id)
        })
    }

    pub fn get_components(&self, caller: &Caller, case_id: i64) -> Result<Vec<Component>, RpcError> {
        self.authorize(caller, Action::ViewTestCase)?;

        self.store.read(|conn| {
            load_case(conn, case_id)?;
            Ok(queries::case_components(conn, case_id)?)
        })
    }

    pub fn add_notification_cc(
        &self,
        caller: &Caller,
        case_id: i64,
        emails: &[String],
    ) -> Result<(), RpcError> {
        self.authorize(caller, Action::ChangeTestCase)?;
        validate_emails(emails)?;

        self.store.write(|tx| {
            load_case(tx, case_id)?;
            for email in emails {
                queries::add_cc(tx, case_id, email.trim())?;
            }
            debug!(case_id, count = emails.len(), "add_notification_cc");
            Ok(())
        })
    }

    /// Remove each address that is present; absent addresses are skipped
    pub fn remove_notification_cc(
        &self,
        caller: &Caller,
        case_id: i64,
        emails: &[String],
    ) -> Result<(), RpcError> {
        self.authorize(caller, Action::ChangeTestCase)?;
        validate_emails(emails)?;

        self.store.write(|tx| {
            load_case(tx, case_id)?;
            let mut removed = 0usize;
            for email in emails {
                if queries::remove_cc(tx, case_id, email.trim())? {
                    removed += 1;
                }
            }
            debug!(case_id, requested = emails.len(), removed, "remove_notification_cc");
            Ok(())
        })
    }

    pub fn get_notification_cc(&self, caller: &Caller, case_id: i64) -> Result<Vec<String>, RpcError> {
        self.authorize(caller, Action::ViewTestCase)?;

        self.store.read(|conn| {
            load_case(conn, case_id)?;
            Ok(queries::cc_list(conn, case_id)?)
        })
    }

    /// Cases matching every criterion; not permission-gated
    pub fn filter(&self, criteria: &Map<String, Value>) -> Result<Vec<CaseSummary>, RpcError> {
        let filter = CaseFilter::parse(criteria)?;
        let cases = self.store.read(|conn| filter.run(conn))?;
        debug!(criteria = criteria.len(), matched = cases.len(), "filter");
        Ok(cases)
    }
}

fn load_case(conn: &Connection, case_id: i64) -> Result<TestCase, RpcError> {
    queries::get_case(conn, case_id)?.ok_or_else(|| RpcError::case_not_found(case_id))
}

fn case_record(conn: &Connection, case_id: i64) -> Result<CaseRecord, RpcError> {
    let case = load_case(conn, case_id)?;
    let tags = queries::case_tag_ids(conn, case_id)?;
    let components = queries::case_component_ids(conn, case_id)?;
    Ok(CaseRecord::new(case, tags, components))
}

/// Look up a component by name within the case's product and confirm the
/// product match before anything is attached or detached
fn resolve_component(
    conn: &Connection,
    case: &TestCase,
    component_name: &str,
) -> Result<Component, RpcError> {
    let no_match = || {
        RpcError::not_found(
            "Component",
            format!(
                "no matching component '{}' for product {}",
                component_name, case.product_id
            ),
        )
    };

    let component = queries::find_component(conn, component_name, case.product_id)?
        .ok_or_else(no_match)?;
    if component.product_id != case.product_id {
        return Err(no_match());
    }
    Ok(component)
}

fn parse_update_fields(fields: &Map<String, Value>) -> Result<BTreeMap<CaseField, String>, RpcError> {
    let mut changes = BTreeMap::new();
    for (key, value) in fields {
        let field: CaseField = key.parse().map_err(RpcError::Validation)?;
        let Value::String(value) = value else {
            return Err(RpcError::validation(format!(
                "field '{}' expects a string value",
                key
            )));
        };
        if field == CaseField::Summary && value.trim().is_empty() {
            return Err(RpcError::validation("summary must not be empty"));
        }
        changes.insert(field, value.clone());
    }
    Ok(changes)
}

fn normalize_tag(name: &str) -> Result<&str, RpcError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RpcError::validation("tag name must not be empty"));
    }
    Ok(name)
}

fn validate_emails(emails: &[String]) -> Result<(), RpcError> {
    for email in emails {
        if !is_valid_email(email.trim()) {
            return Err(RpcError::validation(format!(
                "'{}' is not a valid email address",
                email
            )));
        }
    }
    Ok(())
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
