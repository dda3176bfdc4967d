//! `casebook cases` command - list test cases through `TestCase.filter`

use miette::{bail, IntoDiagnostic, Result};
use serde_json::{Map, Value};

use crate::cli::helpers::Workspace;
use crate::cli::output::print_cases;
use crate::cli::GlobalOpts;
use crate::core::ResolvedPermissions;
use crate::rpc::TestCaseService;

#[derive(clap::Args, Debug)]
pub struct CasesArgs {
    /// Product id
    #[arg(long, short = 'p')]
    pub product: Option<i64>,

    /// Product name
    #[arg(long)]
    pub product_name: Option<String>,

    /// Category id
    #[arg(long, short = 'c')]
    pub category: Option<i64>,

    /// Tag name
    #[arg(long, short = 't')]
    pub tag: Option<String>,

    /// Component name
    #[arg(long)]
    pub component: Option<String>,

    /// Case-insensitive substring of the summary
    #[arg(long, short = 's')]
    pub summary: Option<String>,

    /// Author username
    #[arg(long, short = 'a')]
    pub author: Option<String>,

    /// Raw criteria object, merged with the flags above
    /// (e.g. '{"tag__name__in": ["smoke", "nightly"]}')
    #[arg(long)]
    pub filter: Option<String>,
}

impl CasesArgs {
    fn criteria(&self) -> Result<Map<String, Value>> {
        let mut criteria = match &self.filter {
            Some(raw) => match serde_json::from_str::<Value>(raw).into_diagnostic()? {
                Value::Object(map) => map,
                other => bail!("--filter must be a JSON object, got {}", other),
            },
            None => Map::new(),
        };

        let flags = [
            ("category__product", self.product.map(Value::from)),
            (
                "category__product__name",
                self.product_name.clone().map(Value::from),
            ),
            ("category", self.category.map(Value::from)),
            ("tag__name", self.tag.clone().map(Value::from)),
            ("component__name", self.component.clone().map(Value::from)),
            ("summary__icontains", self.summary.clone().map(Value::from)),
            ("author", self.author.clone().map(Value::from)),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                criteria.insert(key.to_string(), value);
            }
        }
        Ok(criteria)
    }
}

pub fn run(args: CasesArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let criteria = args.criteria()?;

    // filter is not permission-gated, so no roster lookup is needed
    let service = TestCaseService::new(workspace.store.clone(), ResolvedPermissions);
    let cases = service.filter(&criteria)?;

    print_cases(&cases, global.output_format(), global.quiet)
}
