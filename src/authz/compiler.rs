use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Instant;

use crate::authz::errors::AuthzError;
use crate::authz::types::*;
use crate::authz::AuthzGraph;

/// Read the YAML rule document at `path` and compile it into an
/// `AuthzGraph`.
pub fn load(path: &Path) -> Result<AuthzGraph, AuthzError> {
    let start = Instant::now();

    let contents = std::fs::read_to_string(path).map_err(|source| AuthzError::DocumentRead {
        path: path.display().to_string(),
        source,
    })?;
    let document: AccessControlRules =
        serde_yaml::from_str(&contents).map_err(|e| AuthzError::DocumentFormat(e.to_string()))?;

    let graph = compile(document)?;

    tracing::info!(
        users = graph.user_count(),
        groups = graph.group_count(),
        resources = graph.resource_count(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "Loaded access control rules"
    );

    Ok(graph)
}

/// Compile a rule document into a fresh `AuthzGraph`.
///
/// Processing is additive: every rule that names a user or group appends a
/// `(role, resource)` binding to that identity's list, creating the entry on
/// first mention. Within one resource, role names must be unique across its
/// rule list; a repeated name aborts the whole compilation and no graph is
/// returned.
pub fn compile(document: AccessControlRules) -> Result<AuthzGraph, AuthzError> {
    let mut users: HashMap<String, User> = HashMap::new();
    let mut groups: HashMap<String, Group> = HashMap::new();
    let mut resources: HashMap<String, ProtectedResource> = HashMap::new();

    for (resource, rules) in document {
        resources.insert(
            resource.clone(),
            ProtectedResource {
                name: resource.clone(),
            },
        );

        let mut seen_roles: HashSet<&str> = HashSet::new();
        for rule in &rules {
            if !seen_roles.insert(rule.role.as_str()) {
                return Err(AuthzError::DuplicateRole {
                    role: rule.role.clone(),
                    resource,
                });
            }

            for user in &rule.users {
                users.entry(user.clone()).or_default().roles.push(Role {
                    name: rule.role.clone(),
                    resource: resource.clone(),
                });
            }
            for group in &rule.groups {
                groups.entry(group.clone()).or_default().roles.push(Role {
                    name: rule.role.clone(),
                    resource: resource.clone(),
                });
            }
        }
    }

    Ok(AuthzGraph::new(users, groups, resources))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(yaml: &str) -> AccessControlRules {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_compile_basic() {
        let graph = compile(document(
            r#"
reports:
  - role: viewer
    users: [ana]
    groups: [auditors]
  - role: editor
    users: [larry]
"#,
        ))
        .unwrap();

        assert_eq!(graph.user_count(), 2);
        assert_eq!(graph.group_count(), 1);
        assert!(graph.resource("reports").is_some());

        let ana = graph.user("ana").unwrap();
        assert_eq!(
            ana.roles,
            vec![Role {
                name: "viewer".into(),
                resource: "reports".into(),
            }]
        );
        let auditors = graph.group("auditors").unwrap();
        assert_eq!(auditors.roles.len(), 1);
    }

    #[test]
    fn test_bindings_accumulate_across_resources() {
        let graph = compile(document(
            r#"
reports:
  - role: viewer
    users: [ana]
billing:
  - role: viewer
    users: [ana]
  - role: admin
    users: [ana]
"#,
        ))
        .unwrap();

        // One binding per rule naming the identity; same role name under a
        // different resource is a distinct role.
        let ana = graph.user("ana").unwrap();
        assert_eq!(ana.roles.len(), 3);
        assert!(ana.roles.contains(&Role {
            name: "viewer".into(),
            resource: "reports".into(),
        }));
        assert!(ana.roles.contains(&Role {
            name: "viewer".into(),
            resource: "billing".into(),
        }));
    }

    #[test]
    fn test_duplicate_role_rejected() {
        let err = compile(document(
            r#"
reports:
  - role: viewer
    users: [ana]
  - role: viewer
    groups: [auditors]
"#,
        ))
        .unwrap_err();

        match err {
            AuthzError::DuplicateRole { role, resource } => {
                assert_eq!(role, "viewer");
                assert_eq!(resource, "reports");
            }
            other => panic!("expected DuplicateRole, got {other:?}"),
        }
    }

    #[test]
    fn test_same_role_name_on_other_resource_allowed() {
        let graph = compile(document(
            r#"
reports:
  - role: viewer
    users: [ana]
billing:
  - role: viewer
    users: [bob]
"#,
        ))
        .unwrap();
        assert_eq!(graph.resource_count(), 2);
    }

    #[test]
    fn test_resource_with_no_rules_is_known() {
        let graph = compile(document("reports: []\n")).unwrap();
        assert!(graph.resource("reports").is_some());
        assert_eq!(graph.user_count(), 0);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(
            &path,
            r#"
reports:
  - role: viewer
    users: [ana]
    groups: [auditors]
"#,
        )
        .unwrap();

        let graph = load(&path).unwrap();
        assert_eq!(graph.user_count(), 1);
        assert_eq!(graph.group_count(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/rules.yaml")).unwrap_err();
        assert!(matches!(err, AuthzError::DocumentRead { .. }));
    }

    #[test]
    fn test_load_malformed_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, "reports: {not: [a, rule, list]}\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, AuthzError::DocumentFormat(_)));
    }
}
