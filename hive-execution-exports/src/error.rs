// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use displaydoc::Display;
use hive_models::FunctionId;
use thiserror::Error;

/// execution error
#[non_exhaustive]
#[derive(Display, Error, Debug)]
pub enum ExecutionError {
    /// runtime error: {0}
    RuntimeError(String),
    /// function `{0}` is not installed
    NotInstalled(FunctionId),
    /// function store error: {0}
    StoreError(String),
    /// manifest fetch error: {0}
    ManifestError(String),
}
