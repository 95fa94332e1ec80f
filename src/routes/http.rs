// GET/POST handlers: version, stacks, draft validation, port normalization

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::ApiError;
use crate::models::{
    PortConfig, PortConflict, PortSpec, Stack, StackReport, StackSnapshot, ValidationResult,
};
use crate::ports::{check_port, find_port_conflicts, normalize_ports, port_to_compose};
use crate::validator::validate_stack;
use crate::version::{DESCRIPTION, NAME, VERSION};

/// GET /version: service name, version and description.
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
        "description": DESCRIPTION,
    }))
}

/// GET /api/stacks: latest refreshed snapshot (empty until the first refresh).
pub(super) async fn list_stacks_handler(State(state): State<AppState>) -> Json<StackSnapshot> {
    Json(state.latest.read().await.clone())
}

async fn find_report(state: &AppState, name: &str) -> Result<StackReport, ApiError> {
    state
        .latest
        .read()
        .await
        .find(name)
        .cloned()
        .ok_or_else(|| ApiError::not_found(format!("stack '{name}'")))
}

/// GET /api/stacks/{name}
pub(super) async fn get_stack_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StackReport>, ApiError> {
    find_report(&state, &name).await.map(Json)
}

/// GET /api/stacks/{name}/validation
pub(super) async fn stack_validation_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ValidationResult>, ApiError> {
    find_report(&state, &name)
        .await
        .map(|report| Json(report.validation))
}

/// POST /api/validate: validate a draft stack that has not been deployed.
pub(super) async fn validate_handler(
    Json(stack): Json<Stack>,
) -> Result<Json<ValidationResult>, ApiError> {
    if stack.name.trim().is_empty() {
        return Err(ApiError::bad_request("stack name must be non-empty"));
    }
    tracing::debug!(
        stack = %stack.name,
        services = stack.services.len(),
        "validating draft stack"
    );
    Ok(Json(validate_stack(&stack)))
}

#[derive(Debug, Deserialize)]
pub(super) struct NormalizePortsRequest {
    ports: Vec<PortSpec>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PortErrorEntry {
    index: usize,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NormalizePortsResponse {
    ports: Vec<PortConfig>,
    compose: Vec<PortSpec>,
    conflicts: Vec<PortConflict>,
    errors: Vec<PortErrorEntry>,
}

/// POST /api/ports/normalize: canonical records, compose form, conflicts and per-entry errors.
pub(super) async fn normalize_ports_handler(
    Json(req): Json<NormalizePortsRequest>,
) -> Json<NormalizePortsResponse> {
    let ports = normalize_ports(&req.ports);
    let errors = ports
        .iter()
        .enumerate()
        .filter_map(|(index, p)| {
            check_port(p).err().map(|e| PortErrorEntry {
                index,
                message: e.to_string(),
            })
        })
        .collect();
    Json(NormalizePortsResponse {
        compose: ports.iter().map(port_to_compose).collect(),
        conflicts: find_port_conflicts(&ports),
        errors,
        ports,
    })
}
