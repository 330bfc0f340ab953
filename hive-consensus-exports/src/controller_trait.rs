// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use std::sync::Arc;

use hive_models::{ConsensusKind, ExecutionRequest, ExecutionResult, RequestId, ResponseCode};
use hive_network_exports::{PeerId, PeerRecord};
use hive_time::HiveTime;

use crate::ConsensusError;

/// Caches the committed result under its request id so a concurrent
/// teardown can observe completion.
pub type ResultCacheFn = Arc<dyn Fn(RequestId, ExecutionResult) + Send + Sync>;

/// Forwards the committed result to the peer that originated the request
/// (used by engines whose commit point is not on the head-facing peer).
/// The `HiveTime` argument is the work-order timestamp the result
/// answers, echoed so the origin can correlate and group it.
pub type OriginForwardFn = Arc<dyn Fn(PeerId, RequestId, HiveTime, ExecutionResult) + Send + Sync>;

/// Everything a worker hands the engine when a `FormCluster` arrives.
pub struct ClusterSpec {
    pub kind: ConsensusKind,
    pub request_id: RequestId,
    /// every cluster member, the constructing node included
    pub members: Vec<PeerId>,
    /// connectivity hints for members not yet in the peer store
    pub connection_info: Vec<PeerRecord>,
    pub cache_result: ResultCacheFn,
    pub forward_result: OriginForwardFn,
}

/// One live replicated-execution group, driven opaquely.
#[cfg_attr(feature = "test-exports", mockall::automock)]
pub trait ConsensusCluster: Send + Sync {
    /// Which algorithm this cluster runs.
    fn kind(&self) -> ConsensusKind;

    /// Submit one work order to the group; blocks until the group
    /// commits (or rejects) a result.
    fn execute(
        &self,
        from: PeerId,
        request_id: &RequestId,
        timestamp: HiveTime,
        request: &ExecutionRequest,
    ) -> Result<(ResponseCode, ExecutionResult), ConsensusError>;

    /// Leave the group and release engine resources; idempotent.
    fn shutdown(&self) -> Result<(), ConsensusError>;
}

/// Constructs concrete engines. The two variants in production are the
/// replicated-log engine and the Byzantine-fault-tolerant engine;
/// nothing in the orchestration layer depends on either one's internals.
#[cfg_attr(feature = "test-exports", mockall::automock)]
pub trait ClusterFactory: Send + Sync {
    fn create(&self, spec: ClusterSpec) -> Result<Box<dyn ConsensusCluster>, ConsensusError>;
}
