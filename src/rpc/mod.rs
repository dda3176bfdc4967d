//! RPC surface over the test case store
//!
//! Handlers in [`testcase`] return typed [`RpcError`]s; the [`dispatch`]
//! layer routes method names and turns those errors into wire faults.

pub mod dispatch;
pub mod error;
pub mod filter;
pub mod testcase;

pub use dispatch::{Dispatcher, Method, Request, Response};
pub use error::{Fault, RpcError};
pub use filter::CaseFilter;
pub use testcase::TestCaseService;
