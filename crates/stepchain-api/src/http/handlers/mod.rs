//! HTTP request handlers.

pub mod chain;
