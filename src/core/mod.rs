//! Core module - project layout, configuration, permissions and storage

pub mod config;
pub mod permission;
pub mod project;
pub mod store;
pub mod team;

pub use config::Config;
pub use permission::{Action, Caller, PermissionOracle, ResolvedPermissions};
pub use project::{Project, ProjectError};
pub use store::EntityStore;
pub use team::{Role, TeamMember, TeamRoster};
