use displaydoc::Display;
use hive_consensus_exports::ConsensusError;
use hive_execution_exports::ExecutionError;
use hive_models::{FunctionId, ModelsError, RequestId};
use hive_network_exports::{NetworkError, Pipeline};
use hive_signature::HiveSignatureError;
use hive_time::TimeError;
use thiserror::Error;

/// node error
#[non_exhaustive]
#[derive(Display, Error, Debug)]
pub enum NodeError {
    /// wrong signature
    WrongSignature,
    /// node err: {0}
    GeneralNodeError(String),
    /// An error occurred during channel communication: {0}
    ChannelError(String),
    /// roll call timed out for request `{0}`
    RollCallTimeout(RequestId),
    /// not enough volunteers for byzantine execution: got {0}, need {1}
    InsufficientReplicas(usize, usize),
    /// cluster formation incomplete: {0} of {1} confirmations
    ClusterFormationFailed(usize, usize),
    /// work order carries no request id
    MissingRequestId,
    /// consensus required but no cluster for request `{0}`
    MissingCluster(RequestId),
    /// function not installed: `{0}`
    FunctionNotFound(FunctionId),
    /// message kind `{0}` forbidden on {1} pipeline
    ForbiddenPipeline(String, Pipeline),
    /// node has no executor attached
    NoExecutor,
    /// node has no cluster factory attached
    NoClusterFactory,
    /// models error: {0}
    ModelsError(#[from] ModelsError),
    /// time error: {0}
    TimeError(#[from] TimeError),
    /// network error: {0}
    NetworkError(#[from] NetworkError),
    /// execution error: {0}
    ExecutionError(#[from] ExecutionError),
    /// consensus error: {0}
    ConsensusError(#[from] ConsensusError),
    /// signature error: {0}
    SignatureError(#[from] HiveSignatureError),
    /// serde error: {0}
    SerdeError(#[from] serde_json::Error),
}
