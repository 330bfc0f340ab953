// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>
//! Boundary to local function execution and the function package store.
//!
//! Sandboxing of untrusted code and the package download/verification
//! pipeline live behind these traits; the orchestration core only ever
//! sees a synchronous invocation and an installed/not-installed answer.

mod controller_trait;
mod error;

pub use controller_trait::{ExecutionController, FunctionStore};
#[cfg(feature = "test-exports")]
pub use controller_trait::{MockExecutionController, MockFunctionStore};
pub use error::ExecutionError;
