//! Team command - Team roster management

use clap::{Args, Subcommand};
use console::style;
use miette::{bail, miette, IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::args::{GlobalOpts, OutputFormat};
use crate::cli::helpers::truncate_str;
use crate::cli::output::print_value;
use crate::core::permission::Action;
use crate::core::team::{Role, TeamMember, TeamRoster};
use crate::core::Project;

/// Team roster management
#[derive(Debug, Subcommand)]
pub enum TeamCommands {
    /// List team members
    List(TeamListArgs),
    /// Show a member's resolved permissions
    Show(TeamShowArgs),
    /// Initialize team roster template
    Init(TeamInitArgs),
    /// Add or replace a team member
    Add(TeamAddArgs),
    /// Remove a team member
    Remove(TeamRemoveArgs),
}

/// List team members
#[derive(Debug, Args)]
pub struct TeamListArgs {
    /// Filter by role
    #[arg(long, short = 'r')]
    pub role: Option<Role>,
}

#[derive(Debug, Args)]
pub struct TeamShowArgs {
    /// Username (default: the acting user)
    pub username: Option<String>,
}

/// Initialize team roster
#[derive(Debug, Args)]
pub struct TeamInitArgs {
    /// Overwrite existing team.yaml
    #[arg(long)]
    pub force: bool,
}

/// Add a team member
#[derive(Debug, Args)]
pub struct TeamAddArgs {
    /// Member's full name
    #[arg(long)]
    pub name: String,

    /// Member's email
    #[arg(long)]
    pub email: String,

    /// Username presented when calling RPC methods
    #[arg(long)]
    pub username: String,

    /// Roles (comma-separated: engineering,quality,management,admin)
    #[arg(long, value_delimiter = ',')]
    pub roles: Vec<Role>,

    /// Extra permissions (comma-separated codes, e.g. testcases.change_testcase)
    #[arg(long, value_delimiter = ',')]
    pub grant: Vec<Action>,

    /// Permissions to withhold (comma-separated codes)
    #[arg(long, value_delimiter = ',')]
    pub revoke: Vec<Action>,
}

/// Remove a team member
#[derive(Debug, Args)]
pub struct TeamRemoveArgs {
    /// Username to remove
    pub username: String,
}

impl TeamCommands {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        match self {
            TeamCommands::List(args) => args.run(global),
            TeamCommands::Show(args) => args.run(global),
            TeamCommands::Init(args) => args.run(global),
            TeamCommands::Add(args) => args.run(global),
            TeamCommands::Remove(args) => args.run(global),
        }
    }
}

fn load_roster(project: &Project) -> Result<TeamRoster> {
    TeamRoster::load(project)?
        .ok_or_else(|| miette!("No team roster found. Run 'casebook team init' to create one."))
}

impl TeamListArgs {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        let project = Project::locate(global.project.as_deref()).into_diagnostic()?;
        let roster = load_roster(&project)?;

        let members: Vec<&TeamMember> = if let Some(ref role) = self.role {
            roster.members_with_role(*role).collect()
        } else {
            roster.active_members().collect()
        };

        if matches!(global.output_format(), OutputFormat::Json | OutputFormat::Yaml) {
            return print_value(&members, global.output_format());
        }

        if members.is_empty() {
            println!("No team members found.");
            return Ok(());
        }

        if global.output_format() == OutputFormat::Id {
            for member in members {
                println!("{}", member.username);
            }
            return Ok(());
        }

        let mut builder = Builder::default();
        builder.push_record(["USERNAME", "NAME", "EMAIL", "ROLES", "PERMISSIONS"]);
        for member in members {
            let roles: Vec<String> = member.roles.iter().map(|r| r.to_string()).collect();
            builder.push_record([
                member.username.clone(),
                truncate_str(&member.name, 20),
                truncate_str(&member.email, 28),
                roles.join(", "),
                roster.permissions_for(member).len().to_string(),
            ]);
        }
        println!("{}", builder.build().with(Style::markdown()));
        Ok(())
    }
}

impl TeamShowArgs {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        let project = Project::locate(global.project.as_deref()).into_diagnostic()?;
        let roster = load_roster(&project)?;

        let username = match self.username.clone().or_else(|| global.user.clone()) {
            Some(username) => username,
            None => crate::core::Config::load(Some(&project))
                .user
                .ok_or_else(|| miette!("No username given and no acting user configured"))?,
        };

        let caller = roster
            .resolve_caller(&username)
            .ok_or_else(|| miette!("User '{}' is not an active member of the team roster", username))?;

        if matches!(global.output_format(), OutputFormat::Json | OutputFormat::Yaml) {
            return print_value(&caller, global.output_format());
        }

        println!("Username: {}", style(&caller.username).cyan());
        println!("Permissions:");
        for action in Action::ALL {
            let mark = if caller.has(action) {
                style("✓").green()
            } else {
                style("✗").red()
            };
            println!("  {} {}", mark, action);
        }
        Ok(())
    }
}

impl TeamInitArgs {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        let project = Project::locate(global.project.as_deref()).into_diagnostic()?;
        let team_path = project.team_path();

        if team_path.exists() && !self.force {
            bail!(
                "Team roster already exists at {}\n\
                 Use --force to overwrite.",
                team_path.display()
            );
        }

        std::fs::write(&team_path, TeamRoster::default_template()).into_diagnostic()?;

        println!("Created team roster at {}", team_path.display());
        println!("\nEdit this file to add your team members, or use:");
        println!("  casebook team add --name \"Jane Smith\" --email jane@co.com --username jsmith --roles engineering");

        Ok(())
    }
}

impl TeamAddArgs {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        let project = Project::locate(global.project.as_deref()).into_diagnostic()?;
        let mut roster = TeamRoster::load(&project)?.unwrap_or_default();

        let replaced = roster
            .members
            .iter()
            .any(|m| m.username.eq_ignore_ascii_case(&self.username));

        roster.add_member(TeamMember {
            name: self.name.clone(),
            email: self.email.clone(),
            username: self.username.clone(),
            roles: self.roles.clone(),
            active: true,
            grants: self.grant.clone(),
            revocations: self.revoke.clone(),
        });
        roster.save(&project).into_diagnostic()?;

        if !global.quiet {
            println!(
                "{} {} {} ({})",
                style("✓").green(),
                if replaced { "Updated" } else { "Added" },
                self.name,
                style(&self.username).cyan()
            );
            println!(
                "Roles: {}",
                self.roles
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        Ok(())
    }
}

impl TeamRemoveArgs {
    pub fn run(&self, global: &GlobalOpts) -> Result<()> {
        let project = Project::locate(global.project.as_deref()).into_diagnostic()?;
        let mut roster = load_roster(&project)?;

        if !roster.remove_member(&self.username) {
            bail!("User '{}' not found in team roster.", self.username);
        }
        roster.save(&project).into_diagnostic()?;

        if !global.quiet {
            println!(
                "{} Removed {} from team roster",
                style("✓").green(),
                style(&self.username).cyan()
            );
        }
        Ok(())
    }
}
