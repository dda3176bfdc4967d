//! Store record types
//!
//! Rows read from the entity store and the payloads built from them.

use chrono::{DateTime, Utc};
use serde::Serialize;

// =========================================================================
// Catalog
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
}

/// A tag, unique by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A component, unique by (name, product)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    pub id: i64,
    pub name: String,
    pub product_id: i64,
    pub description: String,
}

// =========================================================================
// Test Cases
// =========================================================================

/// Scalar test case fields that the RPC surface may overwrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CaseField {
    Summary,
    Text,
    Notes,
    Requirement,
    Script,
    Arguments,
    ExtraLink,
}

impl CaseField {
    pub const ALL: [CaseField; 7] = [
        CaseField::Summary,
        CaseField::Text,
        CaseField::Notes,
        CaseField::Requirement,
        CaseField::Script,
        CaseField::Arguments,
        CaseField::ExtraLink,
    ];

    /// Column name in `test_cases`; also the key accepted over the wire
    pub fn column(&self) -> &'static str {
        match self {
            CaseField::Summary => "summary",
            CaseField::Text => "text",
            CaseField::Notes => "notes",
            CaseField::Requirement => "requirement",
            CaseField::Script => "script",
            CaseField::Arguments => "arguments",
            CaseField::ExtraLink => "extra_link",
        }
    }
}

impl std::fmt::Display for CaseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column())
    }
}

impl std::str::FromStr for CaseField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CaseField::ALL
            .into_iter()
            .find(|field| field.column() == s)
            .ok_or_else(|| {
                format!(
                    "Unknown field '{}'. Updatable fields: {}",
                    s,
                    CaseField::ALL.map(|f| f.column()).join(", ")
                )
            })
    }
}

/// A test case row joined with its category's product
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCase {
    pub id: i64,
    pub summary: String,
    pub text: String,
    pub notes: String,
    pub requirement: String,
    pub script: String,
    pub arguments: String,
    pub extra_link: String,
    pub author: String,
    pub create_date: DateTime<Utc>,
    pub category_id: i64,
    pub product_id: i64,
}

impl TestCase {
    pub fn field(&self, field: CaseField) -> &str {
        match field {
            CaseField::Summary => &self.summary,
            CaseField::Text => &self.text,
            CaseField::Notes => &self.notes,
            CaseField::Requirement => &self.requirement,
            CaseField::Script => &self.script,
            CaseField::Arguments => &self.arguments,
            CaseField::ExtraLink => &self.extra_link,
        }
    }
}

/// Values for inserting a test case
#[derive(Debug, Clone)]
pub struct NewTestCase {
    pub category_id: i64,
    pub summary: String,
    pub text: String,
    pub author: String,
}

/// Full test case payload returned by update and component calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseRecord {
    pub case_id: i64,
    pub summary: String,
    pub text: String,
    pub notes: String,
    pub requirement: String,
    pub script: String,
    pub arguments: String,
    pub extra_link: String,
    pub author: String,
    pub create_date: DateTime<Utc>,
    pub category_id: i64,
    pub product_id: i64,
    /// Attached tag ids
    pub tag: Vec<i64>,
    /// Attached component ids
    pub component: Vec<i64>,
}

impl CaseRecord {
    pub fn new(case: TestCase, tag: Vec<i64>, component: Vec<i64>) -> Self {
        Self {
            case_id: case.id,
            summary: case.summary,
            text: case.text,
            notes: case.notes,
            requirement: case.requirement,
            script: case.script,
            arguments: case.arguments,
            extra_link: case.extra_link,
            author: case.author,
            create_date: case.create_date,
            category_id: case.category_id,
            product_id: case.product_id,
            tag,
            component,
        }
    }
}

/// Row returned by filter queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseSummary {
    pub case_id: i64,
    pub summary: String,
    pub category_id: i64,
    pub product_id: i64,
    pub author: String,
    pub create_date: DateTime<Utc>,
}
