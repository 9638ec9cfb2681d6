use std::collections::HashMap;

use async_trait::async_trait;

use crate::authz::errors::AuthzError;

/// External group-directory collaborator: which groups does a user belong
/// to right now? Implementations must return an empty list, not an error,
/// for unknown users.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn groups_for_user(&self, username: &str) -> Result<Vec<String>, AuthzError>;
}

/// Directory backed by a fixed username -> groups table from configuration.
/// Stands in for a real directory API (e.g. an Okta groups lookup) in
/// deployments that do not have one.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    memberships: HashMap<String, Vec<String>>,
}

impl StaticDirectory {
    pub fn new(memberships: HashMap<String, Vec<String>>) -> Self {
        Self { memberships }
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn groups_for_user(&self, username: &str) -> Result<Vec<String>, AuthzError> {
        Ok(self.memberships.get(username).cloned().unwrap_or_default())
    }
}
