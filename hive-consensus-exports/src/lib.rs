// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>
//! Boundary to the replicated-execution engines.
//!
//! The orchestration core drives a consensus cluster only through the
//! narrow `ConsensusCluster` capability; the concrete engines (Raft log
//! replication, PBFT three-phase commit) are external collaborators a
//! worker constructs through `ClusterFactory`.

mod controller_trait;
mod error;

pub use controller_trait::{
    ClusterFactory, ClusterSpec, ConsensusCluster, OriginForwardFn, ResultCacheFn,
};
#[cfg(feature = "test-exports")]
pub use controller_trait::{MockClusterFactory, MockConsensusCluster};
pub use error::ConsensusError;
