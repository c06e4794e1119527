//! In-memory chain orchestrator.
//!
//! Owns every chain for the lifetime of the process and advances them one
//! step per call. Each chain lives behind its own `tokio::sync::Mutex`, held
//! across the remote invocation, so two `execute_next_step` calls on the same
//! chain serialize while independent chains run concurrently.
//!
//! # State machines
//!
//! Chain and step both move `pending -> running -> (completed | failed)`.
//! `failed` permits re-entry: a fresh `execute_next_step` call re-attempts
//! the same step (the cursor does not advance on failure), so a caller can
//! retry with corrected inputs without an explicit reset.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;

use stepchain_types::JsonMap;
use stepchain_types::chain::{
    ChainStatus, ChainStepResult, StepDefinition, StepStatus, WorkflowChain, WorkflowStep,
};
use stepchain_types::error::ChainError;

use crate::invoker::StepInvoker;
use crate::resolver::{classify_inputs, resolve_inputs};

/// Orchestrates sequential execution of workflow chains.
///
/// Generic over `I: StepInvoker` so the HTTP client stays an infrastructure
/// concern and tests can substitute a mock.
pub struct ChainOrchestrator<I: StepInvoker> {
    invoker: I,
    /// Chain registry. The per-chain mutex is the unit of mutual exclusion.
    chains: DashMap<String, Arc<Mutex<WorkflowChain>>>,
}

impl<I: StepInvoker> ChainOrchestrator<I> {
    /// Create an orchestrator with an empty chain registry.
    pub fn new(invoker: I) -> Self {
        Self {
            invoker,
            chains: DashMap::new(),
        }
    }

    /// Build a chain from step definitions, all steps pending, cursor 0.
    ///
    /// Step ids are derived deterministically from the chain id and position.
    /// An existing chain id is rejected with [`ChainError::Duplicate`]. A
    /// chain with no steps has nothing to execute and is created already
    /// completed, keeping `current_step_index == steps.len()` equivalent to
    /// completion.
    pub fn create_chain(
        &self,
        id: &str,
        name: &str,
        definitions: Vec<StepDefinition>,
    ) -> Result<WorkflowChain, ChainError> {
        let steps: Vec<WorkflowStep> = definitions
            .into_iter()
            .enumerate()
            .map(|(index, def)| WorkflowStep {
                id: format!("{id}_step_{index}"),
                name: def.name,
                workflow_id: def.workflow_id,
                api_key: def.api_key,
                input_shape: classify_inputs(&def.inputs),
                inputs: def.inputs,
                user_inputs: None,
                outputs: None,
                status: StepStatus::Pending,
                allow_user_input: def.allow_user_input,
            })
            .collect();

        let status = if steps.is_empty() {
            ChainStatus::Completed
        } else {
            ChainStatus::Pending
        };
        let chain = WorkflowChain {
            id: id.to_string(),
            name: name.to_string(),
            steps,
            current_step_index: 0,
            status,
        };

        match self.chains.entry(id.to_string()) {
            Entry::Occupied(_) => Err(ChainError::Duplicate(id.to_string())),
            Entry::Vacant(vacant) => {
                tracing::info!(
                    chain_id = id,
                    steps = chain.steps.len(),
                    "chain created"
                );
                let stored = chain.clone();
                vacant.insert(Arc::new(Mutex::new(stored)));
                Ok(chain)
            }
        }
    }

    /// Execute the step at the cursor and advance on success.
    ///
    /// Resolves effective inputs from the step's defaults, the previous
    /// step's captured outputs, and `user_inputs` (recorded onto the step
    /// when its definition allows edits). On failure the cursor stays put
    /// and the error propagates; outputs are only committed on success.
    pub async fn execute_next_step(
        &self,
        chain_id: &str,
        user_inputs: Option<JsonMap>,
    ) -> Result<ChainStepResult, ChainError> {
        let chain = self.chain_handle(chain_id)?;
        let mut chain = chain.lock().await;

        let index = chain.current_step_index;
        if index >= chain.steps.len() {
            return Err(ChainError::NoMoreSteps(chain_id.to_string()));
        }

        let previous_outputs = if index > 0 {
            chain.steps[index - 1].outputs.clone()
        } else {
            None
        };

        let step = &mut chain.steps[index];
        if let Some(edits) = user_inputs {
            if step.allow_user_input {
                step.user_inputs = Some(edits);
            } else {
                tracing::warn!(
                    step_id = step.id.as_str(),
                    "user inputs supplied but step does not allow edits, ignoring"
                );
            }
        }

        let effective = resolve_inputs(
            &step.inputs,
            &step.input_shape,
            previous_outputs.as_ref(),
            step.user_inputs.as_ref(),
        );

        let step_id = step.id.clone();
        let workflow_id = step.workflow_id.clone();
        let api_key = step.api_key.clone();

        step.status = StepStatus::Running;
        chain.status = ChainStatus::Running;

        tracing::info!(
            chain_id,
            step_id = step_id.as_str(),
            workflow_id = workflow_id.as_str(),
            "executing chain step"
        );

        match self.invoker.invoke(&workflow_id, &api_key, &effective).await {
            Ok(outputs) => {
                let step_count = chain.steps.len();
                let step = &mut chain.steps[index];
                step.outputs = Some(outputs.clone());
                step.status = StepStatus::Completed;
                chain.current_step_index = index + 1;
                chain.status = if chain.current_step_index == step_count {
                    ChainStatus::Completed
                } else {
                    ChainStatus::Pending
                };

                tracing::info!(
                    chain_id,
                    step_id = step_id.as_str(),
                    chain_status = ?chain.status,
                    "chain step completed"
                );

                Ok(ChainStepResult {
                    step_id,
                    outputs,
                    success: true,
                })
            }
            Err(e) => {
                chain.steps[index].status = StepStatus::Failed;
                chain.status = ChainStatus::Failed;

                tracing::warn!(
                    chain_id,
                    step_id = step_id.as_str(),
                    error = %e,
                    "chain step failed"
                );

                Err(e.into())
            }
        }
    }

    /// The step at the cursor, or `None` if the chain is unknown or complete.
    pub async fn get_current_step(&self, chain_id: &str) -> Option<WorkflowStep> {
        let handle = self.chains.get(chain_id).map(|e| e.value().clone())?;
        let chain = handle.lock().await;
        chain.steps.get(chain.current_step_index).cloned()
    }

    /// Whether every step of the chain has completed. Unknown chains are not
    /// completed.
    pub async fn is_chain_completed(&self, chain_id: &str) -> bool {
        match self.chains.get(chain_id).map(|e| e.value().clone()) {
            Some(handle) => handle.lock().await.is_completed(),
            None => false,
        }
    }

    /// Whether a step remains to execute. Unknown chains have none.
    pub async fn has_next_step(&self, chain_id: &str) -> bool {
        match self.chains.get(chain_id).map(|e| e.value().clone()) {
            Some(handle) => handle.lock().await.has_next_step(),
            None => false,
        }
    }

    /// Return every step and the chain to `pending`, clearing captured
    /// outputs and user edits, cursor back to 0.
    pub async fn reset_chain(&self, chain_id: &str) -> Result<(), ChainError> {
        let chain = self.chain_handle(chain_id)?;
        let mut chain = chain.lock().await;

        for step in &mut chain.steps {
            step.status = StepStatus::Pending;
            step.outputs = None;
            step.user_inputs = None;
        }
        chain.current_step_index = 0;
        chain.status = if chain.steps.is_empty() {
            ChainStatus::Completed
        } else {
            ChainStatus::Pending
        };

        tracing::info!(chain_id, "chain reset");
        Ok(())
    }

    /// Remove the chain; subsequent operations on the id behave as not-found.
    pub fn delete_chain(&self, chain_id: &str) -> Result<(), ChainError> {
        match self.chains.remove(chain_id) {
            Some(_) => {
                tracing::info!(chain_id, "chain deleted");
                Ok(())
            }
            None => Err(ChainError::NotFound(chain_id.to_string())),
        }
    }

    /// A snapshot of the chain, or `None` if unknown.
    pub async fn get_chain(&self, chain_id: &str) -> Option<WorkflowChain> {
        let handle = self.chains.get(chain_id).map(|e| e.value().clone())?;
        let chain = handle.lock().await;
        Some(chain.clone())
    }

    /// Snapshots of every registered chain.
    pub async fn get_all_chains(&self) -> Vec<WorkflowChain> {
        let handles: Vec<Arc<Mutex<WorkflowChain>>> =
            self.chains.iter().map(|entry| entry.value().clone()).collect();

        let mut chains = Vec::with_capacity(handles.len());
        for handle in handles {
            chains.push(handle.lock().await.clone());
        }
        chains
    }

    fn chain_handle(&self, chain_id: &str) -> Result<Arc<Mutex<WorkflowChain>>, ChainError> {
        self.chains
            .get(chain_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ChainError::NotFound(chain_id.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
