use std::sync::Arc;

use clap::Parser;
use miette::Result;
use tracing_subscriber::{fmt, EnvFilter};

use rolegate::authz::directory::StaticDirectory;
use rolegate::authz::evaluator::PermissionTable;
use rolegate::authz::web::AppState;
use rolegate::authz::{self, SharedGraph};
use rolegate::settings;

#[derive(Parser, Debug)]
#[command(
    name = "rolegate",
    version,
    about = "Access-control decision service"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = settings::Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    // compile the rule document; a malformed document aborts startup
    let graph = authz::compiler::load(&settings.authz.rules_path)
        .map_err(|e| miette::miette!("failed to load access control rules: {e}"))?;

    let permissions = PermissionTable::load(&settings.authz.permissions_path)
        .map_err(|e| miette::miette!("failed to load permission table: {e}"))?;

    let state = AppState {
        graph: Arc::new(SharedGraph::new(graph)),
        directory: Arc::new(StaticDirectory::new(settings.directory.memberships.clone())),
        evaluator: Arc::new(permissions),
        rules_path: settings.authz.rules_path.clone(),
        directory_timeout: settings.directory_timeout(),
        evaluator_timeout: settings.evaluator_timeout(),
    };

    authz::web::serve(&settings, state).await?;
    Ok(())
}
