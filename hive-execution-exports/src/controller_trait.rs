// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use hive_models::{ExecutionRequest, ExecutionResult, FunctionId, RequestId};

use crate::ExecutionError;

/// Local, synchronous execution of one function invocation. Failures
/// come back as a result/error pair, never a crash.
#[cfg_attr(feature = "test-exports", mockall::automock)]
pub trait ExecutionController: Send + Sync {
    fn execute_function(
        &self,
        request_id: &RequestId,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, ExecutionError>;
}

/// Function manifest retrieval, installation and cache.
#[cfg_attr(feature = "test-exports", mockall::automock)]
pub trait FunctionStore: Send + Sync {
    fn is_installed(&self, function_id: &FunctionId) -> Result<bool, ExecutionError>;

    fn install(&self, manifest_url: &str, function_id: &FunctionId) -> Result<(), ExecutionError>;

    /// Re-check every cached function package, optionally halting on the
    /// first broken one.
    fn sync(&self, halt_on_error: bool) -> Result<(), ExecutionError>;
}
