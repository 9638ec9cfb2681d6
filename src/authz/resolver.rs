use crate::authz::types::Role;
use crate::authz::AuthzGraph;

/// Request-scoped snapshot of a user's direct and group-inherited role
/// bindings. Built per request, used for one decision, then discarded —
/// never written back into the graph.
#[derive(Debug, Clone)]
pub struct ResolvedPrincipal {
    pub username: String,
    /// Bindings held directly by the user.
    pub roles: Vec<Role>,
    /// Bindings inherited through directory-reported group memberships.
    pub group_roles: Vec<Role>,
}

impl ResolvedPrincipal {
    /// All bindings, direct and inherited. Callers must treat this as an
    /// unordered set: the decision must not depend on iteration order.
    pub fn bindings(&self) -> impl Iterator<Item = &Role> {
        self.roles.iter().chain(self.group_roles.iter())
    }

    pub fn holds_role(&self, name: &str, resource: &str) -> bool {
        self.bindings()
            .any(|r| r.name == name && r.resource == resource)
    }
}

/// Resolve `username` against the graph, attaching the bindings of every
/// directory-reported group the graph knows about. Groups unknown to the
/// graph confer no roles and are skipped. An unknown user resolves to a
/// principal with zero direct bindings.
pub fn resolve(graph: &AuthzGraph, username: &str, directory_groups: &[String]) -> ResolvedPrincipal {
    let roles = graph
        .user(username)
        .map(|u| u.roles.clone())
        .unwrap_or_default();

    let mut group_roles = Vec::new();
    for name in directory_groups {
        if let Some(group) = graph.group(name) {
            group_roles.extend(group.roles.iter().cloned());
        }
    }

    ResolvedPrincipal {
        username: username.to_string(),
        roles,
        group_roles,
    }
}
