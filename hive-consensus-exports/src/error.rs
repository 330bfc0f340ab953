// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use displaydoc::Display;
use thiserror::Error;

/// consensus error
#[non_exhaustive]
#[derive(Display, Error, Debug)]
pub enum ConsensusError {
    /// engine error: {0}
    EngineError(String),
    /// cluster execution failed: {0}
    ExecutionFailed(String),
    /// cluster shutdown failed: {0}
    ShutdownError(String),
    /// cluster execution timed out
    Timeout,
}
