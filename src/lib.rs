//! Rolegate - access-control decision service
//!
//! Compiles declarative role-binding rules into an in-memory authorization
//! graph and answers allow/deny queries against it. Exposed as a library so
//! tests can drive the full resolve-then-authorize flow.

pub mod authz;
pub mod settings;
