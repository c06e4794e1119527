//! Port for invoking one remote workflow run.
//!
//! The orchestrator drives steps through this trait; the infrastructure
//! layer provides the HTTP + streaming implementation, and tests provide
//! mocks.

use secrecy::SecretString;

use stepchain_types::JsonMap;
use stepchain_types::error::InvokeError;

/// Invoke a single remote workflow run and reduce its event stream to one
/// output map.
///
/// Uses RPITIT (return-position `impl Trait` in traits) for async methods,
/// consistent with the workspace's Rust 2024 edition approach.
pub trait StepInvoker: Send + Sync {
    /// Run the workflow identified by `workflow_id` with `inputs`, suspending
    /// for the duration of the network call and the full event stream.
    fn invoke(
        &self,
        workflow_id: &str,
        api_key: &SecretString,
        inputs: &JsonMap,
    ) -> impl std::future::Future<Output = Result<JsonMap, InvokeError>> + Send;
}
