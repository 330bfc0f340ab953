// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of outcome codes used uniformly by every response message,
/// analogous to HTTP status families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    Ok,
    Accepted,
    NoContent,
    PartialContent,
    Invalid,
    NotFound,
    Timeout,
    Error,
    NotAvailable,
}

impl ResponseCode {
    /// Whether the code signals a roll-call acceptance.
    pub fn is_accepted(&self) -> bool {
        matches!(self, ResponseCode::Accepted | ResponseCode::Ok)
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResponseCode::Ok => "OK",
            ResponseCode::Accepted => "ACCEPTED",
            ResponseCode::NoContent => "NO_CONTENT",
            ResponseCode::PartialContent => "PARTIAL_CONTENT",
            ResponseCode::Invalid => "INVALID",
            ResponseCode::NotFound => "NOT_FOUND",
            ResponseCode::Timeout => "TIMEOUT",
            ResponseCode::Error => "ERROR",
            ResponseCode::NotAvailable => "NOT_AVAILABLE",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_form_matches_display() {
        for code in [
            ResponseCode::Ok,
            ResponseCode::NoContent,
            ResponseCode::PartialContent,
            ResponseCode::NotAvailable,
        ] {
            let wire = serde_json::to_string(&code).unwrap();
            assert_eq!(wire, format!("\"{}\"", code));
            let back: ResponseCode = serde_json::from_str(&wire).unwrap();
            assert_eq!(back, code);
        }
    }
}
