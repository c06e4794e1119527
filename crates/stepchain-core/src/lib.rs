//! Chain orchestration logic for Stepchain.
//!
//! This crate defines the `StepInvoker` port that the infrastructure layer
//! implements, the pure step-input resolver, and the in-memory chain
//! orchestrator. It depends only on `stepchain-types` -- never on
//! `stepchain-infra` or any HTTP crate.

pub mod invoker;
pub mod orchestrator;
pub mod resolver;
