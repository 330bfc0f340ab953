use hive_models::{ConsensusKind, NodeAttributes};
use hive_time::HiveTime;
use serde::Deserialize;

/// Role a node plays in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// accepts execution requests and orchestrates workers
    Head,
    /// volunteers for and performs function execution
    Worker,
}

/// Node Configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NodeConfig {
    pub role: NodeRole,
    /// topic roll calls and health checks are broadcast on when a request
    /// does not name its own
    pub default_topic: String,
    /// how long a roll call collects volunteers
    pub rollcall_timeout: HiveTime,
    /// how long the head waits for every invited peer to confirm a cluster
    pub cluster_formation_timeout: HiveTime,
    /// how long the head waits for execution responses
    pub execution_timeout: HiveTime,
    /// how long a worker lets an in-flight commit finish before cluster
    /// shutdown
    pub disband_result_wait: HiveTime,
    /// health check broadcast interval
    pub health_interval: HiveTime,
    /// consensus algorithm used when a request carries an unparseable one
    pub default_consensus: Option<ConsensusKind>,
    /// number of threads draining the inbound message channel
    pub message_concurrency: usize,
    /// inbound message channel capacity; the bound is the admission gate
    /// against inbound bursts
    pub inbound_channel_capacity: usize,
    /// roll-call mailbox capacity
    pub rollcall_queue_capacity: usize,
    /// capabilities this node advertises to roll-call filters
    pub attributes: NodeAttributes,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            role: NodeRole::Worker,
            default_topic: "hive-general".to_string(),
            rollcall_timeout: HiveTime::from_millis(5_000),
            cluster_formation_timeout: HiveTime::from_millis(10_000),
            execution_timeout: HiveTime::from_millis(20_000),
            disband_result_wait: HiveTime::from_millis(5_000),
            health_interval: HiveTime::from_millis(30_000),
            default_consensus: None,
            message_concurrency: 8,
            inbound_channel_capacity: 1_024,
            rollcall_queue_capacity: 128,
            attributes: NodeAttributes::default(),
        }
    }
}
