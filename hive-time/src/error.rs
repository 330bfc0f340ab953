// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use displaydoc::Display;
use thiserror::Error;

/// time error
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum TimeError {
    /// time overflow error
    TimeOverflowError,
    /// checked operation error: {0}
    CheckedOperationError(String),
    /// conversion error
    ConversionError,
}
