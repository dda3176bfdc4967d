//! Action codes, caller identity and the permission oracle seam

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Permission-checked actions exposed by the RPC surface
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Action {
    #[serde(rename = "testcases.view_testcase")]
    ViewTestCase,
    #[serde(rename = "testcases.change_testcase")]
    ChangeTestCase,
    #[serde(rename = "testcases.add_testcasetag")]
    AddTestCaseTag,
    #[serde(rename = "testcases.delete_testcasetag")]
    DeleteTestCaseTag,
    #[serde(rename = "testcases.add_testcasecomponent")]
    AddTestCaseComponent,
    #[serde(rename = "testcases.delete_testcasecomponent")]
    DeleteTestCaseComponent,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::ViewTestCase,
        Action::ChangeTestCase,
        Action::AddTestCaseTag,
        Action::DeleteTestCaseTag,
        Action::AddTestCaseComponent,
        Action::DeleteTestCaseComponent,
    ];

    /// The `app.codename` form used in rosters and fault messages
    pub fn code(&self) -> &'static str {
        match self {
            Action::ViewTestCase => "testcases.view_testcase",
            Action::ChangeTestCase => "testcases.change_testcase",
            Action::AddTestCaseTag => "testcases.add_testcasetag",
            Action::DeleteTestCaseTag => "testcases.delete_testcasetag",
            Action::AddTestCaseComponent => "testcases.add_testcasecomponent",
            Action::DeleteTestCaseComponent => "testcases.delete_testcasecomponent",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown permission: {}", s))
    }
}

/// An authenticated principal with its resolved permission set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub username: String,
    pub permissions: BTreeSet<Action>,
}

impl Caller {
    pub fn new(username: impl Into<String>, permissions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            username: username.into(),
            permissions: permissions.into_iter().collect(),
        }
    }

    /// A caller holding every action
    pub fn superuser(username: impl Into<String>) -> Self {
        Self::new(username, Action::ALL)
    }

    /// A caller holding every action except `revoked`
    pub fn without(username: impl Into<String>, revoked: &[Action]) -> Self {
        Self::new(
            username,
            Action::ALL.into_iter().filter(|a| !revoked.contains(a)),
        )
    }

    pub fn has(&self, action: Action) -> bool {
        self.permissions.contains(&action)
    }
}

/// Answers allow/deny for a caller and action
pub trait PermissionOracle: Send + Sync {
    fn authorize(&self, caller: &Caller, action: Action) -> bool;
}

/// Oracle that trusts the permission set resolved onto the caller
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvedPermissions;

impl PermissionOracle for ResolvedPermissions {
    fn authorize(&self, caller: &Caller, action: Action) -> bool {
        caller.has(action)
    }
}

impl<T: PermissionOracle + ?Sized> PermissionOracle for &T {
    fn authorize(&self, caller: &Caller, action: Action) -> bool {
        (**self).authorize(caller, action)
    }
}
