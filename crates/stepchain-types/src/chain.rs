//! Chain and step domain types for Stepchain.
//!
//! A chain is a fixed, ordered sequence of remote workflow invocations. Each
//! step's captured output feeds the next step's input after merging with
//! defaults and user edits. Chains are in-memory only and live for the
//! lifetime of the owning orchestrator.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::JsonMap;

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Aggregate status of a chain, mirroring the step most recently acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Status of an individual step within a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

// ---------------------------------------------------------------------------
// Input shape
// ---------------------------------------------------------------------------

/// How a step's default-input map receives chained output from the previous
/// step.
///
/// Classified once when the chain is created, so the resolver is a total match
/// over this variant instead of probing map keys on every execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputShape {
    /// No recognized slot names: the whole previous-output map merges over
    /// the defaults.
    NoChaining,
    /// One or more named slots, each fed from a specific output field of the
    /// previous step. Unmatched slots keep their default value.
    NamedSlots { slots: Vec<SlotBinding> },
    /// A single generic chaining slot fed from the primary output field,
    /// falling back to the secondary one.
    GenericSlot { name: String },
}

/// Binding from an output field of the previous step to a named input slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotBinding {
    /// Input slot declared in the step's default-input map.
    pub slot: String,
    /// Output field of the previous step that feeds the slot.
    pub source: String,
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// Inbound definition of a single chain step, as submitted on chain creation.
#[derive(Debug, Clone, Deserialize)]
pub struct StepDefinition {
    /// Human-readable step name.
    pub name: String,
    /// Identifier of the remote workflow to invoke.
    pub workflow_id: String,
    /// API key for the remote workflow service.
    pub api_key: SecretString,
    /// Default-input map for the invocation.
    #[serde(default)]
    pub inputs: JsonMap,
    /// Whether a human may review and edit inputs before execution.
    #[serde(default = "default_allow_user_input")]
    pub allow_user_input: bool,
}

fn default_allow_user_input() -> bool {
    true
}

/// A single step within a chain, with its execution state.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStep {
    /// Chain-scoped step id, derived from the chain id and position.
    pub id: String,
    /// Human-readable step name.
    pub name: String,
    /// Identifier of the remote workflow to invoke.
    pub workflow_id: String,
    /// API key for the remote workflow service. Never serialized out.
    #[serde(skip_serializing)]
    pub api_key: SecretString,
    /// Default-input map.
    pub inputs: JsonMap,
    /// Chaining shape of the default-input map, classified at creation.
    pub input_shape: InputShape,
    /// User edits applied on top of defaults and chained outputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_inputs: Option<JsonMap>,
    /// Captured output map. Set exactly once on completion; cleared only by
    /// an explicit chain reset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<JsonMap>,
    /// Current step status.
    pub status: StepStatus,
    /// Whether a human may review and edit inputs before execution.
    pub allow_user_input: bool,
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// An ordered, fixed sequence of remote workflow invocations with data
/// flowing from each step's output to the next step's input.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowChain {
    /// Caller-supplied chain id, unique within the orchestrator.
    pub id: String,
    /// Human-readable chain name.
    pub name: String,
    /// Steps in execution order. Fixed at creation.
    pub steps: Vec<WorkflowStep>,
    /// Cursor into `steps`: the next step awaiting execution. Equals
    /// `steps.len()` exactly when the chain is completed.
    pub current_step_index: usize,
    /// Aggregate chain status.
    pub status: ChainStatus,
}

impl WorkflowChain {
    /// Whether every step has executed to completion.
    pub fn is_completed(&self) -> bool {
        self.status == ChainStatus::Completed
    }

    /// Whether a step remains at or beyond the cursor.
    pub fn has_next_step(&self) -> bool {
        self.current_step_index < self.steps.len()
    }
}

/// Outcome of one `execute_next_step` call: the step just executed and its
/// captured outputs.
#[derive(Debug, Clone, Serialize)]
pub struct ChainStepResult {
    /// Id of the step that executed.
    pub step_id: String,
    /// Output map captured from the remote workflow.
    pub outputs: JsonMap,
    /// Whether the step succeeded.
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chain_status_serde() {
        for status in [
            ChainStatus::Pending,
            ChainStatus::Running,
            ChainStatus::Completed,
            ChainStatus::Failed,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            let parsed: ChainStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, status);
        }
        assert_eq!(
            serde_json::to_string(&ChainStatus::Pending).unwrap(),
            "\"pending\""
        );
    }

    #[test]
    fn test_step_status_serde() {
        for status in [
            StepStatus::Pending,
            StepStatus::Running,
            StepStatus::Completed,
            StepStatus::Failed,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            let parsed: StepStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_step_definition_deserialize_defaults() {
        let json = r#"{
            "name": "Company Analysis",
            "workflow_id": "wf-analysis",
            "api_key": "app-secret-key"
        }"#;
        let def: StepDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.name, "Company Analysis");
        assert!(def.inputs.is_empty());
        assert!(def.allow_user_input);
    }

    #[test]
    fn test_step_definition_deserialize_full() {
        let json = r#"{
            "name": "Competitor Scan",
            "workflow_id": "wf-competitors",
            "api_key": "app-secret-key",
            "inputs": {"company_name": "Tesla"},
            "allow_user_input": false
        }"#;
        let def: StepDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.inputs.get("company_name"), Some(&json!("Tesla")));
        assert!(!def.allow_user_input);
    }

    #[test]
    fn test_workflow_step_serialize_skips_api_key() {
        let step = WorkflowStep {
            id: "demo_step_0".to_string(),
            name: "Demo".to_string(),
            workflow_id: "wf-demo".to_string(),
            api_key: SecretString::from("app-secret-key"),
            inputs: JsonMap::new(),
            input_shape: InputShape::NoChaining,
            user_inputs: None,
            outputs: None,
            status: StepStatus::Pending,
            allow_user_input: true,
        };
        let json = serde_json::to_string(&step).unwrap();
        assert!(!json.contains("app-secret-key"));
        assert!(!json.contains("api_key"));
        assert!(json.contains("\"status\":\"pending\""));
    }

    #[test]
    fn test_input_shape_serde() {
        let shape = InputShape::NamedSlots {
            slots: vec![SlotBinding {
                slot: "competitor_input".to_string(),
                source: "agent_output".to_string(),
            }],
        };
        let json = serde_json::to_string(&shape).unwrap();
        assert!(json.contains("\"type\":\"named_slots\""));
        let parsed: InputShape = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, shape);

        let generic = InputShape::GenericSlot {
            name: "second_input".to_string(),
        };
        let json = serde_json::to_string(&generic).unwrap();
        assert!(json.contains("\"type\":\"generic_slot\""));
    }

    #[test]
    fn test_chain_queries() {
        let chain = WorkflowChain {
            id: "c1".to_string(),
            name: "Demo".to_string(),
            steps: vec![],
            current_step_index: 0,
            status: ChainStatus::Completed,
        };
        assert!(chain.is_completed());
        assert!(!chain.has_next_step());
    }
}
