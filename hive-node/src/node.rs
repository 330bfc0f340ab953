use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use hive_consensus_exports::{ClusterFactory, ConsensusCluster};
use hive_execution_exports::{ExecutionController, FunctionStore};
use hive_logging::hive_trace;
use hive_models::{ConsensusKind, ExecutionResult, RequestId, ResponseCode};
use hive_network_exports::{NetworkController, PeerId, Pipeline};
use hive_signature::KeyPair;
use hive_waitmap::WaitMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::NodeError;
use crate::messages::{FormClusterResponse, Message, MessageKind, WorkOrderResponse};
use crate::pipeline::allowed_on;
use crate::rollcall::RollCallQueue;
use crate::settings::{NodeConfig, NodeRole};

/// One hive node: the per-request orchestration state plus the
/// capability handles everything else is reached through.
///
/// All in-flight state is arena-by-request-id: roll-call mailboxes,
/// waitmap keys and cluster registry entries are created when a request
/// starts and removed on every exit path. Locks guard only the map
/// mutation itself and are never held across a blocking wait.
pub struct Node {
    pub(crate) config: NodeConfig,
    pub(crate) keypair: KeyPair,
    pub(crate) peer_id: PeerId,
    pub(crate) network: Box<dyn NetworkController>,
    pub(crate) executor: Option<Box<dyn ExecutionController>>,
    pub(crate) fstore: Box<dyn FunctionStore>,
    pub(crate) cluster_factory: Option<Box<dyn ClusterFactory>>,
    /// head side: open roll-call auctions
    pub(crate) rollcall_queue: RollCallQueue,
    /// head side: cluster-confirmation rendezvous, keyed per invited peer
    pub(crate) cluster_confirmations: WaitMap<(RequestId, PeerId), FormClusterResponse>,
    /// head side: execution-response rendezvous, keyed per cluster peer
    pub(crate) execution_responses: Arc<WaitMap<(RequestId, PeerId), WorkOrderResponse>>,
    /// worker side: live consensus clusters, one at most per request
    pub(crate) clusters: RwLock<HashMap<RequestId, Arc<dyn ConsensusCluster>>>,
    /// worker side: committed results a concurrent disband can observe
    pub(crate) execution_results: Arc<WaitMap<RequestId, ExecutionResult>>,
    /// head side: requests currently being orchestrated. Replies for any
    /// other request are dropped on arrival, so a straggler cannot
    /// recreate rendezvous state after its request was cleaned up.
    pub(crate) in_flight: RwLock<HashSet<RequestId>>,
}

impl Node {
    pub fn new(
        config: NodeConfig,
        keypair: KeyPair,
        network: Box<dyn NetworkController>,
        executor: Option<Box<dyn ExecutionController>>,
        fstore: Box<dyn FunctionStore>,
        cluster_factory: Option<Box<dyn ClusterFactory>>,
    ) -> Self {
        let peer_id = PeerId::from_public_key(keypair.get_public_key());
        let rollcall_queue = RollCallQueue::new(config.rollcall_queue_capacity);
        Self {
            config,
            keypair,
            peer_id,
            network,
            executor,
            fstore,
            cluster_factory,
            rollcall_queue,
            cluster_confirmations: WaitMap::new(),
            execution_responses: Arc::new(WaitMap::new()),
            clusters: RwLock::new(HashMap::new()),
            execution_results: Arc::new(WaitMap::new()),
            in_flight: RwLock::new(HashSet::new()),
        }
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn role(&self) -> NodeRole {
        self.config.role
    }

    /// Serializes and sends one protocol message direct to a peer.
    pub(crate) fn send_to(&self, peer_id: &PeerId, message: Message) -> Result<(), NodeError> {
        hive_trace!("node.send", {
            "to": peer_id.to_string(),
            "kind": message.kind().as_str()
        });
        self.network.send_to_peer(peer_id, message.to_bytes()?)?;
        Ok(())
    }

    /// Serializes and broadcasts one protocol message on a topic.
    pub(crate) fn publish(&self, topic: &str, message: Message) -> Result<(), NodeError> {
        hive_trace!("node.publish", {
            "topic": topic,
            "kind": message.kind().as_str()
        });
        self.network.publish_to_topic(topic, message.to_bytes()?)?;
        Ok(())
    }

    /// Registers a freshly constructed consensus cluster for a request.
    pub(crate) fn register_cluster(
        &self,
        request_id: RequestId,
        cluster: Arc<dyn ConsensusCluster>,
    ) {
        self.clusters.write().insert(request_id, cluster);
    }

    /// Copies the cluster handle out under the read lock, so the caller
    /// can block on it with the lock released.
    pub(crate) fn get_cluster(&self, request_id: &RequestId) -> Option<Arc<dyn ConsensusCluster>> {
        self.clusters.read().get(request_id).cloned()
    }

    pub(crate) fn remove_cluster(&self, request_id: &RequestId) {
        self.clusters.write().remove(request_id);
    }

    /// Runtime scan backing the single-Raft-cluster-per-node limitation.
    pub(crate) fn has_raft_cluster(&self) -> bool {
        self.clusters
            .read()
            .values()
            .any(|cluster| cluster.kind() == ConsensusKind::Raft)
    }

    /// Entry point of the dispatch threads: guard, decode, route.
    ///
    /// A handler error is returned to the dispatch loop, which logs and
    /// keeps going: one bad message never stops the node.
    pub(crate) fn process_message(
        &self,
        from: PeerId,
        pipeline: Pipeline,
        data: &[u8],
    ) -> Result<(), NodeError> {
        let message = match Message::from_bytes(data) {
            Ok(message) => message,
            Err(err) => {
                debug!("error while deserializing message from peer {}: {}", from, err);
                return Ok(());
            }
        };

        let kind = message.kind();
        if !allowed_on(kind, pipeline) {
            // intentionally unobservable to the sender
            hive_trace!("node.pipeline.reject", {
                "from": from.to_string(),
                "kind": kind.as_str(),
                "pipeline": pipeline.to_string()
            });
            return Ok(());
        }

        // traffic for the other role is normal on a shared topic (a head
        // hears other heads' roll calls); it is ignored, not an error
        if !self.handled_in_role(kind) {
            debug!(
                "message kind `{}` ignored in {:?} role",
                kind.as_str(),
                self.config.role
            );
            return Ok(());
        }

        match message {
            Message::HealthCheck(health_check) => {
                hive_trace!("node.health_check", {
                    "from": health_check.from.to_string()
                });
                Ok(())
            }

            // worker-facing traffic
            Message::RollCall(roll_call) => self.process_roll_call(from, roll_call),
            Message::InstallFunction(install) => self.process_install_function(from, install),
            Message::FormCluster(form_cluster) => self.process_form_cluster(from, form_cluster),
            Message::WorkOrder(work_order) => self.process_work_order(from, *work_order),
            Message::DisbandCluster(disband) => self.process_disband_cluster(from, disband),

            // head-facing traffic: join replies back to their waiters.
            // A reply whose claimed sender differs from the connection
            // it arrived on is spoofed and does not count.
            Message::RollCallResponse(response) => {
                if response.from != from {
                    hive_trace!("node.reply.spoofed_sender", {
                        "claimed": response.from.to_string(),
                        "actual": from.to_string()
                    });
                    return Ok(());
                }
                self.rollcall_queue.deliver(response);
                Ok(())
            }
            Message::FormClusterResponse(response) => {
                if response.from != from {
                    hive_trace!("node.reply.spoofed_sender", {
                        "claimed": response.from.to_string(),
                        "actual": from.to_string()
                    });
                    return Ok(());
                }
                if !self.is_in_flight(&response.request_id) {
                    hive_trace!("node.reply.not_in_flight", {
                        "request_id": response.request_id.to_string()
                    });
                    return Ok(());
                }
                self.cluster_confirmations
                    .set((response.request_id.clone(), from), response);
                Ok(())
            }
            Message::WorkOrderResponse(response) => {
                if response.from != from {
                    hive_trace!("node.reply.spoofed_sender", {
                        "claimed": response.from.to_string(),
                        "actual": from.to_string()
                    });
                    return Ok(());
                }
                if !self.is_in_flight(&response.request_id) {
                    hive_trace!("node.reply.not_in_flight", {
                        "request_id": response.request_id.to_string()
                    });
                    return Ok(());
                }
                self.execution_responses
                    .set((response.request_id.clone(), from), *response);
                Ok(())
            }
            Message::InstallFunctionResponse(response) => {
                if response.code != ResponseCode::Accepted {
                    warn!(
                        "peer {} failed to install function {}: {}",
                        response.from, response.function_id, response.message
                    );
                }
                Ok(())
            }
        }
    }

    pub(crate) fn is_in_flight(&self, request_id: &RequestId) -> bool {
        self.in_flight.read().contains(request_id)
    }

    fn handled_in_role(&self, kind: MessageKind) -> bool {
        match kind {
            MessageKind::HealthCheck => true,
            MessageKind::RollCall
            | MessageKind::InstallFunction
            | MessageKind::FormCluster
            | MessageKind::WorkOrder
            | MessageKind::DisbandCluster => self.config.role == NodeRole::Worker,
            MessageKind::RollCallResponse
            | MessageKind::InstallFunctionResponse
            | MessageKind::FormClusterResponse
            | MessageKind::WorkOrderResponse => self.config.role == NodeRole::Head,
        }
    }
}
