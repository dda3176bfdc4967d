//! `casebook new` commands - create catalog records and test cases
//!
//! These are local administration commands; they write straight to the store
//! and are not routed through the RPC permission checks.

use clap::Subcommand;
use console::style;
use miette::{bail, IntoDiagnostic, Result};
use rusqlite::Connection;
use serde::Serialize;

use crate::cli::helpers::Workspace;
use crate::cli::output::print_value;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::store::{queries, NewTestCase, Product};
use crate::rpc::RpcError;

/// Category used when `new case` is not given one
pub const DEFAULT_CATEGORY: &str = "--default--";

#[derive(Subcommand, Debug)]
pub enum NewCommands {
    /// Create a product (and its default category)
    Product {
        /// Product name
        name: String,

        #[arg(long, short = 'd', default_value = "")]
        description: String,
    },

    /// Create a case category under a product
    Category {
        /// Owning product name
        #[arg(long, short = 'p')]
        product: String,

        /// Category name
        name: String,
    },

    /// Create a component under a product
    Component {
        /// Owning product name
        #[arg(long, short = 'p')]
        product: String,

        /// Component name
        name: String,

        #[arg(long, short = 'd', default_value = "")]
        description: String,
    },

    /// Create a tag
    Tag {
        /// Tag name
        name: String,
    },

    /// Create a test case
    Case {
        /// Owning product name
        #[arg(long, short = 'p')]
        product: String,

        /// Category name, created if missing
        #[arg(long, short = 'c', default_value = DEFAULT_CATEGORY)]
        category: String,

        /// One-line summary
        summary: String,

        /// Case body text
        #[arg(long, short = 't', default_value = "")]
        text: String,

        /// Author recorded on the case (default: the acting user)
        #[arg(long)]
        author: Option<String>,
    },
}

pub fn run(cmd: NewCommands, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let store = &workspace.store;

    match cmd {
        NewCommands::Product { name, description } => {
            let product = store.write(|tx| -> Result<Product, RpcError> {
                let product = queries::create_product(tx, &name, &description)?;
                queries::create_category(tx, product.id, DEFAULT_CATEGORY)?;
                Ok(product)
            })?;
            report(global, "product", product.id, &product.name, &product)
        }
        NewCommands::Category { product, name } => {
            let category = store.write(|tx| -> Result<_, RpcError> {
                let product = require_product(tx, &product)?;
                Ok(queries::create_category(tx, product.id, &name)?)
            })?;
            report(global, "category", category.id, &category.name, &category)
        }
        NewCommands::Component {
            product,
            name,
            description,
        } => {
            let component = store.write(|tx| -> Result<_, RpcError> {
                let product = require_product(tx, &product)?;
                Ok(queries::create_component(tx, product.id, &name, &description)?)
            })?;
            report(global, "component", component.id, &component.name, &component)
        }
        NewCommands::Tag { name } => {
            let name = name.trim();
            if name.is_empty() {
                bail!("Tag name must not be empty");
            }
            let tag = store
                .write(|tx| queries::get_or_create_tag(tx, name))
                .into_diagnostic()?;
            report(global, "tag", tag.id, &tag.name, &tag)
        }
        NewCommands::Case {
            product,
            category,
            summary,
            text,
            author,
        } => {
            if summary.trim().is_empty() {
                bail!("Summary must not be empty");
            }
            let author = author
                .or_else(|| workspace.username(global))
                .unwrap_or_else(|| "casebook".to_string());
            let case = store.write(|tx| -> Result<_, RpcError> {
                let product = require_product(tx, &product)?;
                let category = match queries::find_category(tx, product.id, &category)? {
                    Some(existing) => existing,
                    None => queries::create_category(tx, product.id, &category)?,
                };
                Ok(queries::create_case(
                    tx,
                    &NewTestCase {
                        category_id: category.id,
                        summary: summary.clone(),
                        text: text.clone(),
                        author: author.clone(),
                    },
                )?)
            })?;
            report(global, "test case", case.id, &case.summary, &case)
        }
    }
}

fn require_product(conn: &Connection, name: &str) -> Result<Product, RpcError> {
    queries::find_product(conn, name)?
        .ok_or_else(|| RpcError::not_found("Product", format!("no product named '{}'", name)))
}

fn report<T: Serialize>(
    global: &GlobalOpts,
    kind: &str,
    id: i64,
    name: &str,
    record: &T,
) -> Result<()> {
    match global.output_format() {
        OutputFormat::Json | OutputFormat::Yaml => print_value(record, global.output_format()),
        OutputFormat::Id => {
            println!("{}", id);
            Ok(())
        }
        OutputFormat::Auto | OutputFormat::Table => {
            if global.quiet {
                println!("{}", id);
            } else {
                println!(
                    "{} Created {} {} {}",
                    style("✓").green(),
                    kind,
                    style(id).cyan(),
                    style(name).yellow()
                );
            }
            Ok(())
        }
    }
}
