// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use crate::function::FunctionId;
use crate::response_code::ResponseCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fraction of cluster peers that must report back for a non-consensus
/// execution to count as fully successful, when the request does not set
/// its own threshold.
pub const DEFAULT_EXECUTION_THRESHOLD: f64 = 0.6;

/// `node_count` value asking for however many workers volunteer before
/// the roll-call timeout.
pub const ANY_NODES: i64 = -1;

/// One function invocation as submitted to the head. Opaque to the
/// orchestration layer except for the aggregation policy knobs in
/// `config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub function_id: FunctionId,
    pub method: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub config: ExecutionConfig,
}

/// Positional or named argument forwarded to the function runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Parameter {
    #[serde(default)]
    pub name: String,
    pub value: String,
}

/// Aggregation and placement knobs of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// how many workers the head should roll-call; `-1` means "any"
    #[serde(default = "default_node_count")]
    pub node_count: i64,
    /// requested consensus algorithm tag; empty means direct execution
    #[serde(default)]
    pub consensus: String,
    /// response threshold in `(0, 1]`; out-of-range falls back to
    /// `DEFAULT_EXECUTION_THRESHOLD`
    #[serde(default)]
    pub threshold: f64,
    /// capability filter volunteers must satisfy
    #[serde(default)]
    pub attributes: Vec<AttributeRequirement>,
    /// roll-call topic; empty means the node's default topic
    #[serde(default)]
    pub topic: String,
    /// where volunteering workers fetch the function package from
    #[serde(default)]
    pub manifest_url: String,
    #[serde(default)]
    pub runtime: RuntimeLimits,
    /// environment passed to the function runtime
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub stdin: Option<String>,
}

fn default_node_count() -> i64 {
    1
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            node_count: default_node_count(),
            consensus: String::new(),
            threshold: 0.0,
            attributes: Vec::new(),
            topic: String::new(),
            manifest_url: String::new(),
            runtime: RuntimeLimits::default(),
            environment: BTreeMap::new(),
            stdin: None,
        }
    }
}

/// Resource ceilings enforced by the local executor, not by the
/// orchestration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RuntimeLimits {
    #[serde(default)]
    pub memory_limit_kb: u64,
    #[serde(default)]
    pub cpu_time_limit_ms: u64,
}

/// One `key == value` requirement a volunteering worker must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRequirement {
    pub key: String,
    pub value: String,
}

/// Capabilities a worker advertises and matches roll-call filters
/// against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NodeAttributes(pub BTreeMap<String, String>);

impl NodeAttributes {
    /// Every requirement must be present with the exact value.
    pub fn satisfies(&self, requirements: &[AttributeRequirement]) -> bool {
        requirements
            .iter()
            .all(|req| self.0.get(&req.key) == Some(&req.value))
    }
}

/// Outcome of one function invocation on one peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub code: ResponseCode,
    #[serde(default)]
    pub output: RuntimeOutput,
    #[serde(default)]
    pub usage: RuntimeUsage,
}

impl ExecutionResult {
    pub fn error() -> Self {
        Self {
            code: ResponseCode::Error,
            output: RuntimeOutput::default(),
            usage: RuntimeUsage::default(),
        }
    }
}

/// Raw runtime output of the function process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RuntimeOutput {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub exit_code: i32,
}

/// Resource usage as reported by the overseer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RuntimeUsage {
    #[serde(default)]
    pub wall_clock_time_ms: u64,
    #[serde(default)]
    pub cpu_user_time_ms: u64,
    #[serde(default)]
    pub cpu_sys_time_ms: u64,
    #[serde(default)]
    pub memory_max_kb: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_matching() {
        let mut caps = BTreeMap::new();
        caps.insert("arch".to_string(), "arm64".to_string());
        caps.insert("gpu".to_string(), "none".to_string());
        let attrs = NodeAttributes(caps);

        assert!(attrs.satisfies(&[]));
        assert!(attrs.satisfies(&[AttributeRequirement {
            key: "arch".into(),
            value: "arm64".into()
        }]));
        assert!(!attrs.satisfies(&[AttributeRequirement {
            key: "arch".into(),
            value: "x86_64".into()
        }]));
        assert!(!attrs.satisfies(&[AttributeRequirement {
            key: "tee".into(),
            value: "sgx".into()
        }]));
    }

    #[test]
    fn test_request_defaults_from_sparse_json() {
        let request: ExecutionRequest = serde_json::from_str(
            r#"{"function_id": "bafybeigdyrzt5", "method": "main.wasm"}"#,
        )
        .unwrap();
        assert_eq!(request.config.node_count, 1);
        assert!(request.config.consensus.is_empty());
        assert_eq!(request.config.threshold, 0.0);
    }
}
