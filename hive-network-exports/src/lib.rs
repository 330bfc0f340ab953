// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>
//! Boundary to the peer-to-peer transport layer.
//!
//! The orchestration core depends only on the capability set declared
//! here; connection management, message framing and pubsub internals live
//! behind it.

mod controller_trait;
mod error;
mod peer_id;
mod pipeline;

pub use controller_trait::NetworkController;
#[cfg(feature = "test-exports")]
pub use controller_trait::MockNetworkController;
pub use error::NetworkError;
pub use peer_id::{PeerId, PeerRecord};
pub use pipeline::Pipeline;
