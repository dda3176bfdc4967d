//! Team roster and role management for RPC authorization

use clap::ValueEnum;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::core::permission::{Action, Caller, PermissionOracle};
use crate::core::Project;

/// Team roles for authorization
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Engineering,
    Quality,
    Management,
    Admin,
}

impl Role {
    /// Actions granted to a role when the roster does not override them
    pub fn default_permissions(&self) -> Vec<Action> {
        match self {
            Role::Admin | Role::Engineering | Role::Quality => Action::ALL.to_vec(),
            Role::Management => vec![Action::ViewTestCase],
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Engineering => write!(f, "engineering"),
            Role::Quality => write!(f, "quality"),
            Role::Management => write!(f, "management"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "engineering" => Ok(Role::Engineering),
            "quality" => Ok(Role::Quality),
            "management" => Ok(Role::Management),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// A team member with their roles and per-member permission adjustments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub email: String,
    /// Username presented by the transport when calling the RPC surface
    pub username: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Extra actions on top of role grants
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grants: Vec<Action>,
    /// Actions removed after grants are applied
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub revocations: Vec<Action>,
}

fn default_active() -> bool {
    true
}

impl TeamMember {
    /// Check if member has a specific role
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

/// Team roster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRoster {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub members: Vec<TeamMember>,
    /// Per-role overrides of [`Role::default_permissions`]
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub role_permissions: HashMap<Role, Vec<Action>>,
}

fn default_version() -> u32 {
    1
}

impl Default for TeamRoster {
    fn default() -> Self {
        Self {
            version: 1,
            members: Vec::new(),
            role_permissions: HashMap::new(),
        }
    }
}

impl TeamRoster {
    /// Load team roster from the project's .casebook/team.yaml
    ///
    /// A missing file is `Ok(None)`; an unreadable or malformed file is an error.
    pub fn load(project: &Project) -> Result<Option<Self>> {
        Self::load_from_path(&project.team_path())
    }

    /// Load team roster from a specific path
    pub fn load_from_path(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read team roster {}", path.display()))?;
        let roster = serde_yml::from_str(&contents)
            .into_diagnostic()
            .wrap_err_with(|| format!("Invalid team roster {}", path.display()))?;
        Ok(Some(roster))
    }

    /// Save team roster to the project's .casebook/team.yaml
    pub fn save(&self, project: &Project) -> std::io::Result<()> {
        self.save_to_path(&project.team_path())
    }

    /// Save team roster to a specific path
    pub fn save_to_path(&self, path: &Path) -> std::io::Result<()> {
        let contents = serde_yml::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, contents)
    }

    /// Find an active member by username
    pub fn find_member(&self, username: &str) -> Option<&TeamMember> {
        self.members
            .iter()
            .find(|m| m.active && m.username.eq_ignore_ascii_case(username))
    }

    /// Actions a role grants under this roster
    pub fn role_grants(&self, role: Role) -> Vec<Action> {
        self.role_permissions
            .get(&role)
            .cloned()
            .unwrap_or_else(|| role.default_permissions())
    }

    /// Role grants, plus member grants, minus member revocations
    pub fn permissions_for(&self, member: &TeamMember) -> BTreeSet<Action> {
        let mut permissions: BTreeSet<Action> = if member.is_admin() {
            Action::ALL.into_iter().collect()
        } else {
            member
                .roles
                .iter()
                .flat_map(|role| self.role_grants(*role))
                .collect()
        };
        permissions.extend(member.grants.iter().copied());
        for revoked in &member.revocations {
            permissions.remove(revoked);
        }
        permissions
    }

    /// Resolve a username into a caller; inactive or unknown users do not resolve
    pub fn resolve_caller(&self, username: &str) -> Option<Caller> {
        let member = self.find_member(username)?;
        Some(Caller::new(
            member.username.clone(),
            self.permissions_for(member),
        ))
    }

    /// Add a member, replacing one with the same username
    pub fn add_member(&mut self, member: TeamMember) {
        self.remove_member(&member.username);
        self.members.push(member);
    }

    /// Remove a member by username
    pub fn remove_member(&mut self, username: &str) -> bool {
        let len_before = self.members.len();
        self.members
            .retain(|m| !m.username.eq_ignore_ascii_case(username));
        self.members.len() < len_before
    }

    /// Get all active members
    pub fn active_members(&self) -> impl Iterator<Item = &TeamMember> {
        self.members.iter().filter(|m| m.active)
    }

    /// Get members with a specific role
    pub fn members_with_role(&self, role: Role) -> impl Iterator<Item = &TeamMember> {
        self.members.iter().filter(move |m| m.active && m.has_role(role))
    }

    /// Generate default team.yaml template content
    pub fn default_template() -> &'static str {
        r#"# Casebook Team Roster
# Defines who may call the RPC surface and with which permissions

version: 1

members:
  # Example member entry:
  # - name: "Jane Smith"
  #   email: "jane@example.com"
  #   username: "jsmith"
  #   roles: [engineering]
  #   grants: []                                 # extra actions
  #   revocations: [testcases.delete_testcasetag] # removed actions
  #   active: true
  []

# Role permission overrides. Roles not listed keep their defaults:
#   admin, engineering, quality: every action
#   management: testcases.view_testcase
# role_permissions:
#   quality: [testcases.view_testcase, testcases.change_testcase]
"#
    }
}

impl PermissionOracle for TeamRoster {
    /// Re-resolves the caller against the roster, so a caller forged with
    /// extra permissions gains nothing
    fn authorize(&self, caller: &Caller, action: Action) -> bool {
        self.find_member(&caller.username)
            .map(|member| self.permissions_for(member).contains(&action))
            .unwrap_or(false)
    }
}
