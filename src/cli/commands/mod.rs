//! CLI command implementations

pub mod batch;
pub mod call;
pub mod cases;
pub mod completions;
pub mod init;
pub mod new;
pub mod team;
