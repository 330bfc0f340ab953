// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery path an inbound message arrived on. The transport stamps
/// every message with it; handlers never see a message whose kind is
/// forbidden on its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pipeline {
    /// gossip/topic delivery, readable by every subscriber
    Broadcast,
    /// addressed peer-to-peer delivery
    Direct,
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pipeline::Broadcast => write!(f, "broadcast"),
            Pipeline::Direct => write!(f, "direct"),
        }
    }
}
