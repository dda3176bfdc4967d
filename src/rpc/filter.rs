//! Filter criteria translation
//!
//! Criteria arrive as a JSON object of `field__path[__lookup]` keys. Each key
//! is parsed against a closed set of fields and lookups, then rendered to a
//! parameterized SQL predicate. Relations (tags, components) become `EXISTS`
//! subqueries so a case never appears twice in the result.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Value};

use crate::core::store::CaseSummary;
use crate::rpc::RpcError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Summary,
    Text,
    Notes,
    Author,
    Category,
    CategoryName,
    Product,
    ProductName,
    Tag,
    TagName,
    Component,
    ComponentName,
}

impl Field {
    fn parse(path: &str) -> Option<Self> {
        let field = match path {
            "pk" | "id" | "case_id" => Field::Id,
            "summary" => Field::Summary,
            "text" => Field::Text,
            "notes" => Field::Notes,
            "author" => Field::Author,
            "category" | "category__id" | "category__pk" => Field::Category,
            "category__name" => Field::CategoryName,
            "category__product" | "category__product__id" | "category__product__pk" => {
                Field::Product
            }
            "category__product__name" => Field::ProductName,
            "tag" | "tag__id" | "tag__pk" => Field::Tag,
            "tag__name" => Field::TagName,
            "component" | "component__id" | "component__pk" => Field::Component,
            "component__name" => Field::ComponentName,
            _ => return None,
        };
        Some(field)
    }

    /// Column the predicate applies to
    fn column(&self) -> &'static str {
        match self {
            Field::Id => "tc.id",
            Field::Summary => "tc.summary",
            Field::Text => "tc.text",
            Field::Notes => "tc.notes",
            Field::Author => "tc.author",
            Field::Category => "tc.category_id",
            Field::CategoryName => "c.name",
            Field::Product => "c.product_id",
            Field::ProductName => "p.name",
            Field::Tag => "tt.tag_id",
            Field::TagName => "t.name",
            Field::Component => "tcc.component_id",
            Field::ComponentName => "cmp.name",
        }
    }

    /// Subquery wrapping the predicate for many-to-many relations
    fn relation(&self) -> Option<&'static str> {
        match self {
            Field::Tag | Field::TagName => Some(
                "EXISTS (SELECT 1 FROM test_case_tags tt JOIN tags t ON t.id = tt.tag_id \
                 WHERE tt.case_id = tc.id AND {})",
            ),
            Field::Component | Field::ComponentName => Some(
                "EXISTS (SELECT 1 FROM test_case_components tcc \
                 JOIN components cmp ON cmp.id = tcc.component_id \
                 WHERE tcc.case_id = tc.id AND {})",
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Exact,
    IContains,
    In,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Null,
    Scalar(SqlValue),
    List(Vec<SqlValue>),
}

#[derive(Debug, Clone, PartialEq)]
struct Clause {
    field: Field,
    lookup: Lookup,
    operand: Operand,
}

/// Parsed filter criteria for test cases
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseFilter {
    clauses: Vec<Clause>,
}

impl CaseFilter {
    /// Parse a criteria object, rejecting unknown paths and ill-typed values
    pub fn parse(criteria: &Map<String, Value>) -> Result<Self, RpcError> {
        let mut clauses = Vec::with_capacity(criteria.len());
        for (key, value) in criteria {
            clauses.push(parse_clause(key, value)?);
        }
        Ok(Self { clauses })
    }

    /// Render the WHERE clause and its bound parameters
    fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut sql = String::from("1=1");
        let mut params = Vec::new();

        for clause in &self.clauses {
            let column = clause.field.column();
            let predicate = match (&clause.lookup, &clause.operand) {
                (_, Operand::Null) => format!("{} IS NULL", column),
                (Lookup::IContains, Operand::Scalar(value)) => {
                    params.push(value.clone());
                    format!("{} LIKE ? ESCAPE '\\'", column)
                }
                (Lookup::In, Operand::List(values)) if values.is_empty() => "0=1".to_string(),
                (Lookup::In, Operand::List(values)) => {
                    params.extend(values.iter().cloned());
                    let marks = vec!["?"; values.len()].join(", ");
                    format!("{} IN ({})", column, marks)
                }
                (_, Operand::Scalar(value)) => {
                    params.push(value.clone());
                    format!("{} = ?", column)
                }
                (_, Operand::List(_)) => "0=1".to_string(),
            };

            let predicate = match clause.field.relation() {
                Some(template) => template.replace("{}", &predicate),
                None => predicate,
            };
            sql.push_str(" AND ");
            sql.push_str(&predicate);
        }

        (sql, params)
    }

    /// Run the filter; an unmatched filter yields an empty list
    pub fn run(&self, conn: &Connection) -> rusqlite::Result<Vec<CaseSummary>> {
        let (predicate, params) = self.to_sql();
        let sql = format!(
            r#"SELECT tc.id, tc.summary, tc.category_id, c.product_id, tc.author, tc.create_date
               FROM test_cases tc
               JOIN categories c ON c.id = tc.category_id
               JOIN products p ON p.id = c.product_id
               WHERE {}
               ORDER BY tc.id"#,
            predicate
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params), |row| {
            Ok(CaseSummary {
                case_id: row.get(0)?,
                summary: row.get(1)?,
                category_id: row.get(2)?,
                product_id: row.get(3)?,
                author: row.get(4)?,
                create_date: crate::core::store::parse_timestamp(row.get::<_, String>(5)?),
            })
        })?;
        rows.collect()
    }
}

fn parse_clause(key: &str, value: &Value) -> Result<Clause, RpcError> {
    let (path, lookup) = match key.rsplit_once("__") {
        Some((path, "exact")) => (path, Lookup::Exact),
        Some((path, "icontains")) => (path, Lookup::IContains),
        Some((path, "in")) => (path, Lookup::In),
        _ => (key, Lookup::Exact),
    };

    let field = Field::parse(path)
        .ok_or_else(|| RpcError::validation(format!("cannot filter on '{}'", key)))?;

    let operand = match lookup {
        Lookup::Exact => match value {
            Value::Null => Operand::Null,
            other => Operand::Scalar(scalar(key, other)?),
        },
        Lookup::IContains => match value {
            Value::String(s) => Operand::Scalar(SqlValue::Text(format!("%{}%", escape_like(s)))),
            _ => {
                return Err(RpcError::validation(format!(
                    "'{}' expects a string",
                    key
                )))
            }
        },
        Lookup::In => match value {
            Value::Array(items) => Operand::List(
                items
                    .iter()
                    .map(|item| scalar(key, item))
                    .collect::<Result<_, _>>()?,
            ),
            _ => {
                return Err(RpcError::validation(format!(
                    "'{}' expects a list",
                    key
                )))
            }
        },
    };

    Ok(Clause {
        field,
        lookup,
        operand,
    })
}

fn scalar(key: &str, value: &Value) -> Result<SqlValue, RpcError> {
    match value {
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .ok_or_else(|| RpcError::validation(format!("'{}' has an unsupported number", key))),
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(RpcError::validation(format!(
            "'{}' expects a scalar value",
            key
        ))),
    }
}

fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
