//! Shared helper functions for CLI commands
//!
//! Every command that touches the store goes through [`Workspace`], which
//! locates the project, layers the config and opens the store the same way.

use miette::{bail, miette, IntoDiagnostic, Result};

use crate::cli::GlobalOpts;
use crate::core::permission::Caller;
use crate::core::{Config, EntityStore, Project, TeamRoster};
use crate::rpc::{Dispatcher, TestCaseService};

/// A located project with its layered config and open store
#[derive(Debug)]
pub struct Workspace {
    pub project: Project,
    pub config: Config,
    pub store: EntityStore,
}

impl Workspace {
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let project = Project::locate(global.project.as_deref()).into_diagnostic()?;
        let config = Config::load(Some(&project));
        let store = EntityStore::for_project(&project, &config)?;
        Ok(Self {
            project,
            config,
            store,
        })
    }

    pub fn roster(&self) -> Result<TeamRoster> {
        TeamRoster::load(&self.project)?.ok_or_else(|| {
            miette!(
                "No team roster found at {}. Run 'casebook team init' to create one.",
                self.project.team_path().display()
            )
        })
    }

    /// Username from `--user`, else config `user`, else CASEBOOK_USER
    pub fn username(&self, global: &GlobalOpts) -> Option<String> {
        global.user.clone().or_else(|| self.config.user.clone())
    }

    /// Resolve the acting user against the roster; unknown users stop here
    pub fn caller(&self, roster: &TeamRoster, global: &GlobalOpts) -> Result<Caller> {
        let Some(username) = self.username(global) else {
            bail!("No user given. Pass --user, set `user` in config.yaml, or set CASEBOOK_USER.");
        };
        resolve_caller(roster, &username)
    }

    pub fn dispatcher(&self, roster: TeamRoster) -> Dispatcher<TeamRoster> {
        Dispatcher::new(TestCaseService::new(self.store.clone(), roster))
    }
}

pub fn resolve_caller(roster: &TeamRoster, username: &str) -> Result<Caller> {
    roster
        .resolve_caller(username)
        .ok_or_else(|| miette!("User '{}' is not an active member of the team roster", username))
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
        assert_eq!(truncate_str("ääääää", 5), "ää...");
    }
}
