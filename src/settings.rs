use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub server: Server,
    pub authz: Authz,
    #[serde(default)]
    pub directory: DirectorySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authz {
    /// Path to the YAML rule document (resource -> rule list).
    pub rules_path: PathBuf,
    /// Path to the role -> actions permission table consumed by the shipped
    /// rule evaluator.
    pub permissions_path: PathBuf,
    /// Upper bound on the external directory lookup, per request.
    #[serde(default = "default_directory_timeout_ms")]
    pub directory_timeout_ms: u64,
    /// Upper bound on rule evaluation, per request.
    #[serde(default = "default_evaluator_timeout_ms")]
    pub evaluator_timeout_ms: u64,
}

fn default_directory_timeout_ms() -> u64 {
    2000
}

fn default_evaluator_timeout_ms() -> u64 {
    1000
}

/// Membership table for the built-in static directory. A real deployment
/// would point the service at an actual directory API instead.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DirectorySettings {
    #[serde(default)]
    pub memberships: HashMap<String, Vec<String>>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for Authz {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("rules.yaml"),
            permissions_path: PathBuf::from("permissions.yaml"),
            directory_timeout_ms: default_directory_timeout_ms(),
            evaluator_timeout_ms: default_evaluator_timeout_ms(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("server.host", Server::default().host)
            .into_diagnostic()?
            .set_default("server.port", Server::default().port)
            .into_diagnostic()?
            .set_default(
                "authz.rules_path",
                Authz::default().rules_path.to_string_lossy().to_string(),
            )
            .into_diagnostic()?
            .set_default(
                "authz.permissions_path",
                Authz::default()
                    .permissions_path
                    .to_string_lossy()
                    .to_string(),
            )
            .into_diagnostic()?
            .set_default(
                "authz.directory_timeout_ms",
                Authz::default().directory_timeout_ms,
            )
            .into_diagnostic()?
            .set_default(
                "authz.evaluator_timeout_ms",
                Authz::default().evaluator_timeout_ms,
            )
            .into_diagnostic()?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: ROLEGATE__SERVER__PORT=9090, etc.
        builder =
            builder.add_source(config::Environment::with_prefix("ROLEGATE").separator("__"));

        let cfg = builder.build().into_diagnostic()?;
        let mut s: Settings = cfg.try_deserialize().into_diagnostic()?;

        // Normalize paths to be relative to current dir
        if s.authz.rules_path.is_relative() {
            s.authz.rules_path = std::env::current_dir()
                .into_diagnostic()?
                .join(&s.authz.rules_path);
        }
        if s.authz.permissions_path.is_relative() {
            s.authz.permissions_path = std::env::current_dir()
                .into_diagnostic()?
                .join(&s.authz.permissions_path);
        }

        Ok(s)
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_millis(self.authz.directory_timeout_ms)
    }

    pub fn evaluator_timeout(&self) -> Duration {
        Duration::from_millis(self.authz.evaluator_timeout_ms)
    }
}
