// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use std::collections::HashSet;

use crate::{NetworkError, PeerId, PeerRecord};

/// Capability set the orchestration core consumes from the transport.
///
/// `send_to_many` with `require_all = true` turns any single delivery
/// failure into an error for the whole call; with `require_all = false`
/// the call succeeds as long as at least one peer was reachable.
#[cfg_attr(feature = "test-exports", mockall::automock)]
pub trait NetworkController: Send + Sync {
    fn clone_box(&self) -> Box<dyn NetworkController>;

    /// Direct delivery of serialized message bytes to one peer.
    fn send_to_peer(&self, peer_id: &PeerId, data: Vec<u8>) -> Result<(), NetworkError>;

    /// Direct delivery to a set of peers.
    fn send_to_many(
        &self,
        peers: &[PeerId],
        data: Vec<u8>,
        require_all: bool,
    ) -> Result<(), NetworkError>;

    /// Broadcast delivery to every subscriber of `topic`.
    fn publish_to_topic(&self, topic: &str, data: Vec<u8>) -> Result<(), NetworkError>;

    /// Join a topic so broadcast messages on it reach this node.
    fn subscribe(&self, topic: &str) -> Result<(), NetworkError>;

    /// Whether an active connection to the peer exists right now.
    fn is_connected(&self, peer_id: &PeerId) -> bool;

    /// Snapshot of the connected-peer table.
    fn get_peer_ids_connected(&self) -> HashSet<PeerId>;

    /// Best-effort connectivity record for a known peer, for forwarding
    /// to cluster co-members that may not know it yet.
    fn get_peer_record(&self, peer_id: &PeerId) -> Option<PeerRecord>;

    /// Adds hint records for peers not yet in the peer store; known
    /// peers are left untouched.
    fn merge_peer_records(&self, records: &[PeerRecord]);
}

impl Clone for Box<dyn NetworkController> {
    fn clone(&self) -> Box<dyn NetworkController> {
        self.clone_box()
    }
}
