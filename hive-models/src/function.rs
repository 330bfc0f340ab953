// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use serde::{Deserialize, Serialize};
use std::fmt;

/// Content address of an installable function package (CID-style string,
/// opaque to the orchestration layer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct FunctionId(String);

impl FunctionId {
    pub fn new<S: Into<String>>(cid: S) -> Self {
        FunctionId(cid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FunctionId {
    fn from(cid: &str) -> Self {
        FunctionId(cid.to_string())
    }
}
