//! Shared domain types for Stepchain.
//!
//! This crate contains the core domain types used across the Stepchain
//! service: chains, steps, lifecycle stream events, and their associated
//! error types.
//!
//! Zero infrastructure dependencies -- only serde, secrecy, thiserror.

pub mod chain;
pub mod error;
pub mod event;

/// JSON object map used for workflow inputs and outputs throughout the crate.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
