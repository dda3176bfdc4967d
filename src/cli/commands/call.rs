//! `casebook call` command - invoke one RPC method

use miette::{miette, IntoDiagnostic, Result};
use serde_json::Value;

use crate::cli::helpers::Workspace;
use crate::cli::output::print_value;
use crate::cli::GlobalOpts;
use crate::rpc::Method;

#[derive(clap::Args, Debug)]
#[command(after_help = method_help())]
pub struct CallArgs {
    /// Method name, e.g. TestCase.add_tag
    pub method: String,

    /// Positional params as a JSON array, e.g. '[1, "smoke"]'
    #[arg(default_value = "[]")]
    pub params: String,
}

fn method_help() -> String {
    let mut help = String::from("Methods:\n");
    for method in Method::ALL {
        help.push_str(&format!("  {:<32} {}\n", method.name(), method.signature()));
    }
    help
}

pub fn run(args: CallArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let roster = workspace.roster()?;
    let caller = workspace.caller(&roster, global)?;

    let params: Value = serde_json::from_str(&args.params)
        .into_diagnostic()
        .map_err(|e| miette!("params must be JSON: {}", e))?;

    let dispatcher = workspace.dispatcher(roster);
    let result = dispatcher.call(&caller, &args.method, params)?;

    if !(global.quiet && result.is_null()) {
        print_value(&result, global.output_format())?;
    }
    Ok(())
}
