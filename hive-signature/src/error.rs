// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use displaydoc::Display;
use thiserror::Error;

#[non_exhaustive]
#[derive(Display, Error, Debug)]
pub enum HiveSignatureError {
    /// parsing error : {0}
    ParsingError(String),

    /// ed25519 engine error: {0}
    EngineError(#[from] ed25519_dalek::SignatureError),
}
