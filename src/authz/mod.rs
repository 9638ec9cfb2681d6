pub mod compiler;
pub mod directory;
pub mod errors;
pub mod evaluator;
pub mod resolver;
pub mod types;
pub mod web;

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use types::{Group, ProtectedResource, User};

/// Fully compiled authorization state, built from the rule document.
/// Immutable after construction — rule changes require a reload, which
/// publishes a whole new graph.
#[derive(Debug, Default)]
pub struct AuthzGraph {
    /// username -> direct role bindings
    users: HashMap<String, User>,
    /// group name -> role bindings
    groups: HashMap<String, Group>,
    /// resource name -> resource, for request-time existence checks
    resources: HashMap<String, ProtectedResource>,
}

impl AuthzGraph {
    pub(crate) fn new(
        users: HashMap<String, User>,
        groups: HashMap<String, Group>,
        resources: HashMap<String, ProtectedResource>,
    ) -> Self {
        Self {
            users,
            groups,
            resources,
        }
    }

    /// Absence is not an error: an unknown user is simply a principal with
    /// zero role bindings.
    pub fn user(&self, name: &str) -> Option<&User> {
        self.users.get(name)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn resource(&self, name: &str) -> Option<&ProtectedResource> {
        self.resources.get(name)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}

/// Atomically swappable handle to the published graph. Readers grab an
/// `Arc` snapshot and keep using it for the whole request; a reload stores
/// a new graph without blocking them, so no reader ever sees a mix of old
/// and new bindings.
#[derive(Debug)]
pub struct SharedGraph {
    inner: ArcSwap<AuthzGraph>,
}

impl SharedGraph {
    pub fn new(graph: AuthzGraph) -> Self {
        Self {
            inner: ArcSwap::from_pointee(graph),
        }
    }

    /// Snapshot of the currently published graph.
    pub fn snapshot(&self) -> Arc<AuthzGraph> {
        self.inner.load_full()
    }

    /// Publish a freshly compiled graph, replacing the previous one for all
    /// future readers. In-flight requests keep their snapshot.
    pub fn publish(&self, graph: AuthzGraph) {
        self.inner.store(Arc::new(graph));
    }
}
