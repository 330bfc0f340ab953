use std::sync::Arc;

use hive_channel::HiveChannel;
use hive_consensus_exports::ClusterFactory;
use hive_execution_exports::{ExecutionController, FunctionStore};
use hive_network_exports::NetworkController;
use hive_signature::KeyPair;
use tracing::{info, warn};

use crate::dispatch::start_dispatch_thread;
use crate::error::NodeError;
use crate::health::start_health_thread;
use crate::manager::NodeManager;
use crate::messages::MessagesHandler;
use crate::node::Node;
use crate::settings::{NodeConfig, NodeRole};

/// Starts a node's lifecycle threads and hands back the transport-facing
/// ingress handler, the manager that stops everything, and the node
/// itself (the head's caller drives `execute_function` through it).
pub fn start_node(
    config: NodeConfig,
    keypair: KeyPair,
    network: Box<dyn NetworkController>,
    executor: Option<Box<dyn ExecutionController>>,
    fstore: Box<dyn FunctionStore>,
    cluster_factory: Option<Box<dyn ClusterFactory>>,
) -> Result<(NodeManager, MessagesHandler, Arc<Node>), NodeError> {
    // workers refresh their function cache before volunteering for
    // anything; a broken package is not worth halting the node over
    if config.role == NodeRole::Worker {
        if let Err(err) = fstore.sync(false) {
            warn!("function store sync failed: {}", err);
        }
    }

    network.subscribe(&config.default_topic)?;

    let node = Arc::new(Node::new(
        config.clone(),
        keypair,
        network,
        executor,
        fstore,
        cluster_factory,
    ));
    // prometheus channel names must be unique per process
    let peer_tag: String = node.peer_id().to_string().chars().take(8).collect();

    let (inbound_sender, inbound_receiver) = HiveChannel::new(
        format!("node_inbound_{}", peer_tag),
        Some(config.inbound_channel_capacity),
    );
    let message_concurrency = config.message_concurrency.max(1);
    let (dispatch_command_sender, dispatch_command_receiver) = HiveChannel::new(
        format!("node_commands_{}", peer_tag),
        Some(message_concurrency),
    );
    let (health_command_sender, health_command_receiver) =
        HiveChannel::new(format!("node_health_{}", peer_tag), Some(1));

    let mut dispatch_handles = Vec::with_capacity(message_concurrency);
    for index in 0..message_concurrency {
        dispatch_handles.push(start_dispatch_thread(
            index,
            node.clone(),
            inbound_receiver.clone(),
            dispatch_command_receiver.clone(),
        ));
    }
    let health_handle = start_health_thread(node.clone(), health_command_receiver);

    info!(
        "node {} started in {:?} role with {} dispatch threads",
        node.peer_id(),
        config.role,
        message_concurrency
    );

    let manager = NodeManager::new(
        (dispatch_command_sender, dispatch_handles),
        (health_command_sender, health_handle),
    );
    let messages_handler = MessagesHandler {
        sender: inbound_sender,
    };
    Ok((manager, messages_handler, node))
}
