//! Output rendering shared by commands

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::truncate_str;
use crate::cli::OutputFormat;
use crate::core::store::CaseSummary;

/// Print a serializable value as JSON (the default) or YAML
pub fn print_value<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(value).into_diagnostic()?;
            print!("{}", yaml);
        }
        _ => {
            let json = serde_json::to_string_pretty(value).into_diagnostic()?;
            println!("{}", json);
        }
    }
    Ok(())
}

/// Render case summaries as a table
pub fn case_table(cases: &[CaseSummary]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["ID", "SUMMARY", "CATEGORY", "PRODUCT", "AUTHOR", "CREATED"]);
    for case in cases {
        builder.push_record([
            case.case_id.to_string(),
            truncate_str(&case.summary, 48),
            case.category_id.to_string(),
            case.product_id.to_string(),
            case.author.clone(),
            case.create_date.format("%Y-%m-%d").to_string(),
        ]);
    }
    builder.build().with(Style::markdown()).to_string()
}

/// Print case summaries in the requested format
pub fn print_cases(cases: &[CaseSummary], format: OutputFormat, quiet: bool) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Yaml => print_value(&cases, format),
        OutputFormat::Id => {
            for case in cases {
                println!("{}", case.case_id);
            }
            Ok(())
        }
        OutputFormat::Auto | OutputFormat::Table => {
            if cases.is_empty() {
                if !quiet {
                    println!("No test cases found.");
                }
                return Ok(());
            }
            println!("{}", case_table(cases));
            if !quiet {
                println!();
                println!("{} test case(s) found", cases.len());
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_case_table_has_header_and_rows() {
        let cases = vec![CaseSummary {
            case_id: 4,
            summary: "Build a pylon".to_string(),
            category_id: 1,
            product_id: 2,
            author: "tester".to_string(),
            create_date: Utc::now(),
        }];
        let table = case_table(&cases);
        assert!(table.contains("SUMMARY"));
        assert!(table.contains("Build a pylon"));
        assert_eq!(table.lines().count(), 3);
    }
}
