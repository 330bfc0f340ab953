// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use displaydoc::Display;
use thiserror::Error;

/// models error
#[non_exhaustive]
#[derive(Display, Error, Debug)]
pub enum ModelsError {
    /// invalid request id: {0}
    InvalidRequestId(String),
    /// unknown consensus algorithm: {0}
    UnknownConsensus(String),
    /// invalid response code: {0}
    InvalidResponseCode(String),
    /// serde error: {0}
    SerdeError(#[from] serde_json::Error),
}
