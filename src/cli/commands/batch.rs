//! `casebook batch` command - invoke RPC requests read as JSON lines
//!
//! Each input line is a request object:
//!
//! ```json
//! {"id": 1, "user": "jsmith", "method": "TestCase.add_tag", "params": [3, "smoke"]}
//! ```
//!
//! Requests run concurrently; one response line is printed per request, in
//! input order. Faults are reported in-band and do not fail the command.

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;

use miette::{IntoDiagnostic, Result};
use serde_json::Value;
use tracing::warn;

use crate::cli::helpers::Workspace;
use crate::cli::GlobalOpts;
use crate::core::permission::Caller;
use crate::core::TeamRoster;
use crate::rpc::{Fault, Request, Response};

#[derive(clap::Args, Debug)]
pub struct BatchArgs {
    /// Read requests from this file instead of stdin
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,
}

/// A request line that could be dispatched, or the response it already earned
enum Prepared {
    Ready(Caller, Request),
    Rejected(Response),
}

pub fn run(args: BatchArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let roster = workspace.roster()?;
    let default_user = workspace.username(global);

    let reader: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(std::fs::File::open(path).into_diagnostic()?),
        None => Box::new(std::io::stdin()),
    };

    let mut prepared = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line.into_diagnostic()?;
        if line.trim().is_empty() {
            continue;
        }
        prepared.push(prepare(&roster, default_user.as_deref(), &line));
    }

    let ready: Vec<(Caller, Request)> = prepared
        .iter()
        .filter_map(|p| match p {
            Prepared::Ready(caller, request) => Some((caller.clone(), request.clone())),
            Prepared::Rejected(_) => None,
        })
        .collect();

    let dispatcher = workspace.dispatcher(roster);
    let mut handled = dispatcher.handle_all(ready).into_iter();

    for entry in prepared {
        let response = match entry {
            Prepared::Ready(..) => match handled.next() {
                Some(response) => response,
                None => break,
            },
            Prepared::Rejected(response) => response,
        };
        println!("{}", serde_json::to_string(&response).into_diagnostic()?);
    }

    Ok(())
}

fn prepare(roster: &TeamRoster, default_user: Option<&str>, line: &str) -> Prepared {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "unparseable batch line");
            return Prepared::Rejected(Response::failure(
                request_id(line),
                Fault {
                    code: 400,
                    message: format!("Invalid request: {}", e),
                },
            ));
        }
    };

    let username = request.user.as_deref().or(default_user);
    match username.and_then(|name| roster.resolve_caller(name)) {
        Some(caller) => Prepared::Ready(caller, request),
        None => Prepared::Rejected(Response::failure(
            request.id,
            Fault {
                code: 403,
                message: format!(
                    "403 Forbidden: '{}' is not an active roster member",
                    username.unwrap_or("<anonymous>")
                ),
            },
        )),
    }
}

/// Best-effort id recovery from a line that is JSON but not a valid request
fn request_id(line: &str) -> Option<Value> {
    serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|value| value.get("id").cloned())
}
