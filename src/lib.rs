//! casebook: a permission-checked RPC core for test case records
//!
//! Test cases, their tags, components and notification lists live in a
//! SQLite store under `.casebook/`. Every mutation goes through
//! [`rpc::Dispatcher`], which authorizes the caller against the team roster
//! before touching the store.

pub mod cli;
pub mod core;
pub mod rpc;
