//! Infrastructure implementations for Stepchain.
//!
//! Provides the streaming-protocol decoder for workflow event feeds and the
//! reqwest-based [`client::HttpWorkflowClient`] implementing the core
//! `StepInvoker` port.

pub mod client;
pub mod stream;
