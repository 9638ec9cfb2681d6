use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A uniquely named, access-controlled resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedResource {
    pub name: String,
}

/// A role scoped to exactly one resource. Two roles with the same name under
/// different resources are distinct; equality always compares both fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Role {
    pub name: String,
    pub resource: String,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.resource)
    }
}

/// Role bindings held directly by a user.
#[derive(Debug, Clone, Default)]
pub struct User {
    pub roles: Vec<Role>,
}

/// Role bindings held by a group.
#[derive(Debug, Clone, Default)]
pub struct Group {
    pub roles: Vec<Role>,
}

/// One rule record from the rule document: the named role is held by each of
/// the listed users and groups, on the resource the record appears under.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleEntry {
    pub role: String,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// The on-disk document shape: resource name -> ordered rule list. Consumed
/// once by the compiler and discarded.
pub type AccessControlRules = BTreeMap<String, Vec<RuleEntry>>;

// ---------- API request/response types ----------

#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    /// e.g. "view"
    pub action: String,
    /// Resource name, e.g. "reports"
    pub resource: String,
}

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub users: usize,
    pub groups: usize,
    pub resources: usize,
}
