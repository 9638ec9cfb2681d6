use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AuthzError {
    #[error("Failed to read rule document `{path}`")]
    #[diagnostic(
        code(rolegate::authz::document_read),
        help("Check that the file exists and is readable")
    )]
    DocumentRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed rule document: {0}")]
    #[diagnostic(
        code(rolegate::authz::document_format),
        help("The document must map each resource name to a list of rule records, each with `role`, `users`, and `groups`")
    )]
    DocumentFormat(String),

    #[error("Role `{role}` is defined more than once for resource `{resource}`")]
    #[diagnostic(
        code(rolegate::authz::duplicate_role),
        help("Merge the duplicate entries into a single rule listing all users and groups")
    )]
    DuplicateRole { role: String, resource: String },

    #[error("Directory lookup failed: {0}")]
    #[diagnostic(code(rolegate::authz::directory_unavailable))]
    DirectoryUnavailable(String),

    #[error("Rule evaluator failed: {0}")]
    #[diagnostic(code(rolegate::authz::evaluator_failure))]
    EvaluatorFailure(String),
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthzError::DocumentFormat(_) | AuthzError::DuplicateRole { .. } => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };
        let body = json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
