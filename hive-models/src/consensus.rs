// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use crate::error::ModelsError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest cluster a PBFT execution may run on (3f+1 with f = 1).
pub const MIN_PBFT_REPLICAS: usize = 4;

/// Consensus algorithm backing a cluster execution. The absence of
/// consensus (direct execution) is modelled as `Option::None` at the
/// call sites.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoPrimitive,
    TryFromPrimitive,
)]
#[repr(u8)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusKind {
    /// replicated-log execution, leader-driven
    Raft = 1,
    /// Byzantine-fault-tolerant execution
    Pbft = 2,
}

impl fmt::Display for ConsensusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsensusKind::Raft => write!(f, "raft"),
            ConsensusKind::Pbft => write!(f, "pbft"),
        }
    }
}

impl FromStr for ConsensusKind {
    type Err = ModelsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raft" => Ok(ConsensusKind::Raft),
            "pbft" => Ok(ConsensusKind::Pbft),
            other => Err(ModelsError::UnknownConsensus(other.to_string())),
        }
    }
}

/// Number of byzantine peers a cluster of `n` tolerates.
pub fn pbft_max_faulty(n: usize) -> usize {
    n.saturating_sub(1) / 3
}

/// Smallest number of bit-identical peer results accepted as
/// authoritative for a cluster of `n`.
pub fn pbft_min_matching(n: usize) -> usize {
    2 * pbft_max_faulty(n) + 1
}
