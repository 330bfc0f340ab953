// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>
//! Shared vocabulary types of the hive compute network

mod consensus;
mod error;
mod execution;
mod function;
mod request_id;
mod response_code;

pub use consensus::{pbft_max_faulty, pbft_min_matching, ConsensusKind, MIN_PBFT_REPLICAS};
pub use error::ModelsError;
pub use execution::{
    AttributeRequirement, ExecutionConfig, ExecutionRequest, ExecutionResult, NodeAttributes,
    Parameter, RuntimeLimits, RuntimeOutput, RuntimeUsage, ANY_NODES,
    DEFAULT_EXECUTION_THRESHOLD,
};
pub use function::FunctionId;
pub use request_id::RequestId;
pub use response_code::ResponseCode;
