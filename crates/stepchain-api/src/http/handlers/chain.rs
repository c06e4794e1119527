//! Chain CRUD and execution handlers for the REST API.
//!
//! Endpoints for creating chains, advancing them one step at a time with
//! optional user-edited inputs, and inspecting or resetting their state.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stepchain_types::JsonMap;
use stepchain_types::chain::{
    ChainStatus, ChainStepResult, StepDefinition, WorkflowChain, WorkflowStep,
};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

/// Body of `POST /chains`.
#[derive(Debug, Deserialize)]
pub struct CreateChainRequest {
    /// Caller-chosen chain id, unique per orchestrator.
    pub id: String,
    /// Human-readable chain name.
    pub name: String,
    /// Ordered step definitions; fixed once created.
    pub steps: Vec<StepDefinition>,
}

/// Body of `POST /chains/{id}/execute`.
#[derive(Debug, Default, Deserialize)]
pub struct ExecuteStepRequest {
    /// User edits applied on top of defaults and chained outputs.
    #[serde(default)]
    pub user_inputs: Option<JsonMap>,
}

/// Status snapshot returned by `GET /chains/{id}/status`.
#[derive(Debug, Serialize)]
pub struct ChainStatusView {
    pub status: ChainStatus,
    pub current_step_index: usize,
    pub completed: bool,
    pub has_next_step: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/chains - Create a new chain.
pub async fn create_chain(
    State(state): State<AppState>,
    Json(body): Json<CreateChainRequest>,
) -> Result<Json<ApiResponse<WorkflowChain>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let chain = state
        .orchestrator
        .create_chain(&body.id, &body.name, body.steps)?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(chain, request_id, elapsed)))
}

/// GET /api/v1/chains - List all chains.
pub async fn list_chains(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<WorkflowChain>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let chains = state.orchestrator.get_all_chains().await;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(chains, request_id, elapsed)))
}

/// GET /api/v1/chains/:id - Get one chain by id.
pub async fn get_chain(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<WorkflowChain>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let chain = state
        .orchestrator
        .get_chain(&id)
        .await
        .ok_or_else(|| AppError::Chain(stepchain_types::error::ChainError::NotFound(id)))?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(chain, request_id, elapsed)))
}

/// POST /api/v1/chains/:id/execute - Execute the step at the cursor.
///
/// The body is optional; when present it may carry user-edited inputs for
/// the current step.
pub async fn execute_next_step(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ExecuteStepRequest>>,
) -> Result<Json<ApiResponse<ChainStepResult>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let user_inputs = body.and_then(|Json(b)| b.user_inputs);
    let result = state.orchestrator.execute_next_step(&id, user_inputs).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(result, request_id, elapsed)))
}

/// GET /api/v1/chains/:id/current-step - The step awaiting execution.
///
/// `data` is null when the chain is complete.
pub async fn get_current_step(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Option<WorkflowStep>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if state.orchestrator.get_chain(&id).await.is_none() {
        return Err(AppError::Chain(
            stepchain_types::error::ChainError::NotFound(id),
        ));
    }
    let step = state.orchestrator.get_current_step(&id).await;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(step, request_id, elapsed)))
}

/// GET /api/v1/chains/:id/status - Pure status snapshot.
pub async fn get_chain_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ChainStatusView>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let chain = state
        .orchestrator
        .get_chain(&id)
        .await
        .ok_or_else(|| AppError::Chain(stepchain_types::error::ChainError::NotFound(id)))?;

    let view = ChainStatusView {
        status: chain.status,
        current_step_index: chain.current_step_index,
        completed: chain.is_completed(),
        has_next_step: chain.has_next_step(),
    };

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(view, request_id, elapsed)))
}

/// POST /api/v1/chains/:id/reset - Return the chain to pending, cursor 0.
pub async fn reset_chain(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<WorkflowChain>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    state.orchestrator.reset_chain(&id).await?;
    let chain = state
        .orchestrator
        .get_chain(&id)
        .await
        .ok_or_else(|| AppError::Internal("chain vanished during reset".to_string()))?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(chain, request_id, elapsed)))
}

/// DELETE /api/v1/chains/:id - Remove the chain.
pub async fn delete_chain(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    state.orchestrator.delete_chain(&id)?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({"deleted": id}),
        request_id,
        elapsed,
    )))
}
