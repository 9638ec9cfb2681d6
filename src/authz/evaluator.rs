use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::authz::errors::AuthzError;
use crate::authz::resolver::ResolvedPrincipal;
use crate::authz::types::ProtectedResource;

/// External rule-evaluator collaborator: a boolean function over the
/// resolved principal, the action, and the target resource. Treated as
/// side-effect free; any statefulness is the implementation's own concern.
#[async_trait]
pub trait RuleEvaluator: Send + Sync {
    async fn decide(
        &self,
        principal: &ResolvedPrincipal,
        action: &str,
        resource: &ProtectedResource,
    ) -> Result<bool, AuthzError>;
}

/// Outcome of one authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenialReason),
}

/// Why a request was denied. `NotPermitted` is a normal policy denial; the
/// other variants signal that the service itself had a problem, so operators
/// can tell "policy says no" from "the system is broken".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    NotPermitted,
    EvaluatorError,
    Timeout,
}

impl DenialReason {
    /// Generic, non-leaking reason string for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::NotPermitted => "not permitted",
            DenialReason::EvaluatorError => "internal error",
            DenialReason::Timeout => "evaluation timed out",
        }
    }
}

/// Run the rule evaluator over a fully resolved principal, bounded by
/// `deadline`. Fail-closed: evaluator errors and timeouts both map to a
/// denial, never to an allow.
pub async fn authorize(
    evaluator: &dyn RuleEvaluator,
    principal: &ResolvedPrincipal,
    action: &str,
    resource: &ProtectedResource,
    deadline: Duration,
) -> Decision {
    match tokio::time::timeout(deadline, evaluator.decide(principal, action, resource)).await {
        Ok(Ok(true)) => Decision::Allowed,
        Ok(Ok(false)) => Decision::Denied(DenialReason::NotPermitted),
        Ok(Err(e)) => {
            tracing::warn!(
                username = %principal.username,
                action,
                resource = %resource.name,
                error = %e,
                "Rule evaluator failed; denying"
            );
            Decision::Denied(DenialReason::EvaluatorError)
        }
        Err(_) => {
            tracing::warn!(
                username = %principal.username,
                action,
                resource = %resource.name,
                deadline_ms = deadline.as_millis() as u64,
                "Rule evaluator timed out; denying"
            );
            Decision::Denied(DenialReason::Timeout)
        }
    }
}

/// Shipped evaluator: a role name -> permitted actions table, loaded from a
/// YAML mapping such as `viewer: [view]`. A principal may perform an action
/// on a resource when any of its bindings scoped to that resource names a
/// role whose table entry contains the action. Order-independent over
/// bindings by construction.
#[derive(Debug, Default)]
pub struct PermissionTable {
    actions_by_role: HashMap<String, HashSet<String>>,
}

impl PermissionTable {
    pub fn new(actions_by_role: HashMap<String, HashSet<String>>) -> Self {
        Self { actions_by_role }
    }

    pub fn load(path: &Path) -> Result<Self, AuthzError> {
        let contents = std::fs::read_to_string(path).map_err(|source| AuthzError::DocumentRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(yaml: &str) -> Result<Self, AuthzError> {
        let actions_by_role: HashMap<String, HashSet<String>> =
            serde_yaml::from_str(yaml).map_err(|e| AuthzError::DocumentFormat(e.to_string()))?;
        Ok(Self::new(actions_by_role))
    }

    pub fn role_count(&self) -> usize {
        self.actions_by_role.len()
    }
}

#[async_trait]
impl RuleEvaluator for PermissionTable {
    async fn decide(
        &self,
        principal: &ResolvedPrincipal,
        action: &str,
        resource: &ProtectedResource,
    ) -> Result<bool, AuthzError> {
        Ok(principal
            .bindings()
            .filter(|role| role.resource == resource.name)
            .any(|role| {
                self.actions_by_role
                    .get(&role.name)
                    .is_some_and(|actions| actions.contains(action))
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::types::Role;

    fn principal(roles: Vec<Role>, group_roles: Vec<Role>) -> ResolvedPrincipal {
        ResolvedPrincipal {
            username: "ana".into(),
            roles,
            group_roles,
        }
    }

    fn table() -> PermissionTable {
        PermissionTable::parse("viewer: [view]\neditor: [view, toggle]\n").unwrap()
    }

    fn reports() -> ProtectedResource {
        ProtectedResource {
            name: "reports".into(),
        }
    }

    #[tokio::test]
    async fn test_direct_role_grants_action() {
        let p = principal(
            vec![Role {
                name: "viewer".into(),
                resource: "reports".into(),
            }],
            vec![],
        );
        let d = authorize(&table(), &p, "view", &reports(), Duration::from_secs(1)).await;
        assert_eq!(d, Decision::Allowed);
    }

    #[tokio::test]
    async fn test_role_on_other_resource_does_not_grant() {
        let p = principal(
            vec![Role {
                name: "viewer".into(),
                resource: "billing".into(),
            }],
            vec![],
        );
        let d = authorize(&table(), &p, "view", &reports(), Duration::from_secs(1)).await;
        assert_eq!(d, Decision::Denied(DenialReason::NotPermitted));
    }

    #[tokio::test]
    async fn test_group_role_grants_action() {
        let p = principal(
            vec![],
            vec![Role {
                name: "editor".into(),
                resource: "reports".into(),
            }],
        );
        let d = authorize(&table(), &p, "toggle", &reports(), Duration::from_secs(1)).await;
        assert_eq!(d, Decision::Allowed);
    }

    #[tokio::test]
    async fn test_empty_principal_denied() {
        let p = principal(vec![], vec![]);
        let d = authorize(&table(), &p, "view", &reports(), Duration::from_secs(1)).await;
        assert_eq!(d, Decision::Denied(DenialReason::NotPermitted));
    }

    #[tokio::test]
    async fn test_unknown_action_denied() {
        let p = principal(
            vec![Role {
                name: "viewer".into(),
                resource: "reports".into(),
            }],
            vec![],
        );
        let d = authorize(&table(), &p, "delete", &reports(), Duration::from_secs(1)).await;
        assert_eq!(d, Decision::Denied(DenialReason::NotPermitted));
    }

    struct FailingEvaluator;

    #[async_trait]
    impl RuleEvaluator for FailingEvaluator {
        async fn decide(
            &self,
            _principal: &ResolvedPrincipal,
            _action: &str,
            _resource: &ProtectedResource,
        ) -> Result<bool, AuthzError> {
            Err(AuthzError::EvaluatorFailure("malformed policy".into()))
        }
    }

    #[tokio::test]
    async fn test_evaluator_error_is_denied_internal() {
        let p = principal(vec![], vec![]);
        let d = authorize(
            &FailingEvaluator,
            &p,
            "view",
            &reports(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(d, Decision::Denied(DenialReason::EvaluatorError));
    }

    struct StalledEvaluator;

    #[async_trait]
    impl RuleEvaluator for StalledEvaluator {
        async fn decide(
            &self,
            _principal: &ResolvedPrincipal,
            _action: &str,
            _resource: &ProtectedResource,
        ) -> Result<bool, AuthzError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_evaluator_timeout_is_denied_timeout() {
        let p = principal(vec![], vec![]);
        let d = authorize(
            &StalledEvaluator,
            &p,
            "view",
            &reports(),
            Duration::from_millis(50),
        )
        .await;
        assert_eq!(d, Decision::Denied(DenialReason::Timeout));
    }

    #[tokio::test]
    async fn test_permission_table_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("permissions.yaml");
        std::fs::write(&path, "viewer: [view]\n").unwrap();
        let table = PermissionTable::load(&path).unwrap();
        assert_eq!(table.role_count(), 1);
    }
}
