//! Lifecycle events decoded from a workflow run's streaming response.
//!
//! These are transient: produced while one invocation's event stream is
//! consumed, reduced to a single output map, and discarded. They are never
//! persisted.

use crate::JsonMap;

/// One decoded notification from the remote workflow's event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// The run was accepted and started.
    Started {
        /// Remote run identifier.
        run_id: String,
    },
    /// A node within the workflow began executing.
    NodeStarted {
        /// Node-scoped output fragment, if the remote surfaces one here.
        outputs: Option<JsonMap>,
    },
    /// A node within the workflow finished.
    NodeFinished {
        /// Node-scoped output fragment.
        outputs: Option<JsonMap>,
    },
    /// The run finished. Terminal: the decoder stops consuming after this.
    Finished {
        /// Final aggregate output map.
        outputs: Option<JsonMap>,
        /// Remote-reported error, if the run failed.
        error: Option<String>,
    },
}

impl LifecycleEvent {
    /// Whether this event terminates the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleEvent::Finished { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_detection() {
        assert!(
            LifecycleEvent::Finished {
                outputs: None,
                error: None
            }
            .is_terminal()
        );
        assert!(
            !LifecycleEvent::Started {
                run_id: "run-1".to_string()
            }
            .is_terminal()
        );
        assert!(!LifecycleEvent::NodeFinished { outputs: None }.is_terminal());
    }
}
