//! Pure step-input resolution.
//!
//! Computes the effective input map passed to a step's remote invocation by
//! merging, in precedence order: default inputs, the previous step's captured
//! outputs (routed by the step's chaining shape), and user edits. The shape is
//! classified once at chain creation, so execution is a total match rather
//! than ad hoc key probing.

use stepchain_types::JsonMap;
use stepchain_types::chain::{InputShape, SlotBinding};

// ---------------------------------------------------------------------------
// Field naming convention
// ---------------------------------------------------------------------------

/// Primary output field surfaced by analysis workflows.
pub const PRIMARY_OUTPUT_FIELD: &str = "agent_output";

/// Secondary output field surfaced by digital-operations workflows.
pub const SECONDARY_OUTPUT_FIELD: &str = "current_de_op";

/// Named slot fed from the primary analysis output.
pub const COMPETITOR_INPUT_SLOT: &str = "competitor_input";

/// Named slot fed from the digital-operations output.
pub const DE_OP_INPUT_SLOT: &str = "current_de_op_input";

/// Generic chaining slot fed from whichever output field is present.
pub const GENERIC_INPUT_SLOT: &str = "second_input";

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify a default-input map's chaining shape.
///
/// Named slots take precedence over the generic slot; a map declaring none of
/// the recognized slot names receives the whole previous-output map merged
/// over its defaults.
pub fn classify_inputs(defaults: &JsonMap) -> InputShape {
    let mut slots = Vec::new();
    if defaults.contains_key(COMPETITOR_INPUT_SLOT) {
        slots.push(SlotBinding {
            slot: COMPETITOR_INPUT_SLOT.to_string(),
            source: PRIMARY_OUTPUT_FIELD.to_string(),
        });
    }
    if defaults.contains_key(DE_OP_INPUT_SLOT) {
        slots.push(SlotBinding {
            slot: DE_OP_INPUT_SLOT.to_string(),
            source: SECONDARY_OUTPUT_FIELD.to_string(),
        });
    }
    if !slots.is_empty() {
        return InputShape::NamedSlots { slots };
    }
    if defaults.contains_key(GENERIC_INPUT_SLOT) {
        return InputShape::GenericSlot {
            name: GENERIC_INPUT_SLOT.to_string(),
        };
    }
    InputShape::NoChaining
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Compute a step's effective input map.
///
/// Precedence, low to high: `defaults`, chained fields from `previous`
/// (routed by `shape`), then `user` field-by-field. A declared slot whose
/// source field is absent from `previous` keeps its default value; the
/// remote service's own input validation handles genuine misconfiguration.
///
/// Deterministic and side-effect free: equal arguments yield equal results.
pub fn resolve_inputs(
    defaults: &JsonMap,
    shape: &InputShape,
    previous: Option<&JsonMap>,
    user: Option<&JsonMap>,
) -> JsonMap {
    let mut effective = defaults.clone();

    if let Some(prev) = previous {
        match shape {
            InputShape::NoChaining => {
                for (key, value) in prev {
                    effective.insert(key.clone(), value.clone());
                }
            }
            InputShape::NamedSlots { slots } => {
                for binding in slots {
                    if let Some(value) = prev.get(&binding.source) {
                        effective.insert(binding.slot.clone(), value.clone());
                    }
                }
            }
            InputShape::GenericSlot { name } => {
                let chained = prev
                    .get(PRIMARY_OUTPUT_FIELD)
                    .or_else(|| prev.get(SECONDARY_OUTPUT_FIELD));
                if let Some(value) = chained {
                    effective.insert(name.clone(), value.clone());
                }
            }
        }
    }

    if let Some(user) = user {
        for (key, value) in user {
            effective.insert(key.clone(), value.clone());
        }
    }

    effective
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
