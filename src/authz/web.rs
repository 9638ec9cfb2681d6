use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use miette::IntoDiagnostic;
use serde_json::json;

use crate::authz::directory::Directory;
use crate::authz::errors::AuthzError;
use crate::authz::evaluator::{self, Decision, RuleEvaluator};
use crate::authz::types::{AuthorizeRequest, AuthorizeResponse, ReloadResponse};
use crate::authz::{compiler, resolver, SharedGraph};
use crate::settings::Settings;

const IDENTITY_HEADER: &str = "x-authenticated-user";

#[derive(Clone)]
pub struct AppState {
    pub graph: Arc<SharedGraph>,
    pub directory: Arc<dyn Directory>,
    pub evaluator: Arc<dyn RuleEvaluator>,
    pub rules_path: PathBuf,
    pub directory_timeout: Duration,
    pub evaluator_timeout: Duration,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/authorize", post(handle_authorize))
        .route("/v1/reload", post(handle_reload))
        .route("/healthz", get(health))
        .with_state(state)
}

pub async fn serve(settings: &Settings, state: AppState) -> miette::Result<()> {
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .map_err(|e| miette::miette!("bad listen addr: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr).await.into_diagnostic()?;
    tracing::info!(%addr, "Authorization service listening");
    axum::serve(listener, router(state)).await.into_diagnostic()?;
    Ok(())
}

async fn handle_authorize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AuthorizeRequest>,
) -> impl IntoResponse {
    // Identity comes from the (trusted) authentication layer in front of us.
    let username = match headers.get(IDENTITY_HEADER).and_then(|v| v.to_str().ok()) {
        Some(u) if !u.is_empty() => u.to_string(),
        _ => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "no authenticated identity provided" })),
            )
                .into_response();
        }
    };

    // One snapshot for the whole request; a concurrent reload cannot tear it.
    let graph = state.graph.snapshot();

    let Some(resource) = graph.resource(&req.resource) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown resource `{}`", req.resource) })),
        )
            .into_response();
    };

    // Directory degradation policy: on failure or timeout the request
    // proceeds with zero extra groups, deciding on direct roles only.
    let groups = match tokio::time::timeout(
        state.directory_timeout,
        state.directory.groups_for_user(&username),
    )
    .await
    {
        Ok(Ok(groups)) => groups,
        Ok(Err(e)) => {
            tracing::warn!(username, error = %e, "Directory lookup failed; proceeding without groups");
            Vec::new()
        }
        Err(_) => {
            let e = AuthzError::DirectoryUnavailable(format!(
                "lookup timed out after {}ms",
                state.directory_timeout.as_millis()
            ));
            tracing::warn!(username, error = %e, "Proceeding without groups");
            Vec::new()
        }
    };

    // Resolution completes fully before evaluation begins.
    let principal = resolver::resolve(&graph, &username, &groups);
    let decision = evaluator::authorize(
        state.evaluator.as_ref(),
        &principal,
        &req.action,
        resource,
        state.evaluator_timeout,
    )
    .await;

    let response = match decision {
        Decision::Allowed => AuthorizeResponse {
            allowed: true,
            reason: None,
        },
        Decision::Denied(reason) => AuthorizeResponse {
            allowed: false,
            reason: Some(reason.as_str().to_string()),
        },
    };
    Json(response).into_response()
}

/// Administrator-triggered reload: recompile the rule document and swap it
/// in. On error the last-good graph stays published. The file read is
/// blocking, so it runs off the async runtime.
async fn handle_reload(State(state): State<AppState>) -> impl IntoResponse {
    let path = state.rules_path.clone();
    let loaded = tokio::task::spawn_blocking(move || compiler::load(&path)).await;

    match loaded {
        Ok(Ok(graph)) => {
            let response = ReloadResponse {
                users: graph.user_count(),
                groups: graph.group_count(),
                resources: graph.resource_count(),
            };
            state.graph.publish(graph);
            tracing::info!(
                users = response.users,
                groups = response.groups,
                resources = response.resources,
                "Reloaded access control rules"
            );
            Json(response).into_response()
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Reload failed; keeping last-good rules");
            e.into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Reload task panicked; keeping last-good rules");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "reload failed" })),
            )
                .into_response()
        }
    }
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
