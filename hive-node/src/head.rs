//! Head-side orchestration: the roll-call auction, cluster formation,
//! work-order dispatch and result aggregation for one request.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Instant;

use crossbeam::channel::RecvTimeoutError;
use hive_channel::HiveChannel;
use hive_logging::hive_trace;
use hive_models::{
    pbft_min_matching, ConsensusKind, ExecutionRequest, RequestId, ResponseCode, ANY_NODES,
    DEFAULT_EXECUTION_THRESHOLD, MIN_PBFT_REPLICAS,
};
use hive_network_exports::{PeerId, PeerRecord};
use hive_time::HiveTime;
use tracing::{debug, warn};

use crate::error::NodeError;
use crate::messages::{
    FormCluster, Message, RollCall, RollCallResponse, WorkOrder, WorkOrderResponse,
};
use crate::node::Node;
use crate::rollcall::MailboxGuard;
use crate::settings::NodeRole;

/// What one execution request came to: the response code computed under
/// the aggregation policy, every peer's attributed reply, and the set of
/// peers that formed the cluster. The peer set is returned even on
/// failure so the caller can audit who participated.
#[derive(Debug)]
pub struct ExecuteOutcome {
    pub request_id: RequestId,
    pub code: ResponseCode,
    pub results: HashMap<PeerId, WorkOrderResponse>,
    pub cluster: Vec<PeerId>,
}

impl ExecuteOutcome {
    fn empty(request_id: RequestId, code: ResponseCode) -> Self {
        Self {
            request_id,
            code,
            results: HashMap::new(),
            cluster: Vec::new(),
        }
    }
}

/// Closes the reply window of one request on every exit path: once
/// dropped, straggler replies are refused at the door instead of
/// recreating rendezvous state.
struct InFlightGuard<'a> {
    node: &'a Node,
    request_id: RequestId,
}

impl<'a> InFlightGuard<'a> {
    fn open(node: &'a Node, request_id: RequestId) -> Self {
        node.in_flight.write().insert(request_id.clone());
        Self { node, request_id }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.node.in_flight.write().remove(&self.request_id);
    }
}

impl Node {
    /// Accepts one execution request from the node's caller, assigns it
    /// a fresh request id and runs the full orchestration pipeline.
    ///
    /// Protocol-timing failures (roll-call timeout, formation timeout)
    /// come back as response codes, never as errors; `Err` is reserved
    /// for local faults such as a closed channel.
    pub fn execute_function(&self, request: ExecutionRequest) -> Result<ExecuteOutcome, NodeError> {
        if self.config.role != NodeRole::Head {
            return Err(NodeError::GeneralNodeError(
                "execution requests are accepted by head nodes only".to_string(),
            ));
        }
        let request_id = RequestId::generate();
        self.execute(request_id, request)
    }

    pub(crate) fn execute(
        &self,
        request_id: RequestId,
        mut request: ExecutionRequest,
    ) -> Result<ExecuteOutcome, NodeError> {
        let _window = InFlightGuard::open(self, request_id.clone());
        let consensus = self.resolve_consensus(&request.config.consensus);
        // canonicalize so workers parse exactly what the head resolved
        request.config.consensus = consensus.map(|kind| kind.to_string()).unwrap_or_default();

        let topic = if request.config.topic.is_empty() {
            self.config.default_topic.clone()
        } else {
            request.config.topic.clone()
        };

        hive_trace!("head.execute.start", {
            "request_id": request_id.to_string(),
            "function_id": request.function_id.to_string(),
            "consensus": request.config.consensus,
            "node_count": request.config.node_count
        });

        let peers = match self.execute_roll_call(&request_id, &request, consensus, &topic) {
            Ok(peers) => peers,
            Err(NodeError::RollCallTimeout(_)) => {
                return Ok(ExecuteOutcome::empty(request_id, ResponseCode::Timeout));
            }
            Err(NodeError::InsufficientReplicas(got, need)) => {
                warn!(
                    "request {}: {} volunteers but byzantine execution needs {}",
                    request_id, got, need
                );
                return Ok(ExecuteOutcome::empty(request_id, ResponseCode::Error));
            }
            Err(err) => return Err(err),
        };

        if let Some(kind) = consensus {
            if let Err(err) = self.form_cluster(&request_id, &peers, kind) {
                warn!("request {}: cluster formation failed: {}", request_id, err);
                // invited workers already created local state on seeing
                // the invitation; it must be torn down
                self.disband_cluster(&request_id, &peers);
                return Ok(ExecuteOutcome {
                    request_id,
                    code: ResponseCode::Error,
                    results: HashMap::new(),
                    cluster: peers,
                });
            }
        }

        let outcome = self.dispatch_and_aggregate(&request_id, &request, &peers, consensus);
        if consensus.is_some() {
            self.disband_cluster(&request_id, &peers);
        }
        outcome
    }

    /// Converts "which of N untrusted peers can run this right now" into
    /// a bounded-time auction with the volunteers' own admission control.
    pub(crate) fn execute_roll_call(
        &self,
        request_id: &RequestId,
        request: &ExecutionRequest,
        consensus: Option<ConsensusKind>,
        topic: &str,
    ) -> Result<Vec<PeerId>, NodeError> {
        let desired_count = request.config.node_count;

        let receiver = self.rollcall_queue.create(request_id.clone());
        let _mailbox = MailboxGuard::new(&self.rollcall_queue, request_id.clone());

        let roll_call = RollCall {
            origin: self.peer_id,
            request_id: request_id.clone(),
            function_id: request.function_id.clone(),
            consensus,
            attributes: request.config.attributes.clone(),
            topic: topic.to_string(),
            manifest_url: request.config.manifest_url.clone(),
        };
        self.publish(topic, Message::from(roll_call))?;

        let deadline = Instant::now() + self.config.rollcall_timeout.to_duration();
        let mut reporting: Vec<PeerId> = Vec::new();
        loop {
            match receiver.recv_deadline(deadline) {
                Ok(response) => {
                    if !self.acceptable_volunteer(&response, request) {
                        continue;
                    }
                    if reporting.contains(&response.from) {
                        continue;
                    }
                    hive_trace!("head.rollcall.volunteer", {
                        "request_id": request_id.to_string(),
                        "from": response.from.to_string()
                    });
                    reporting.push(response.from);
                    if desired_count >= 0 && reporting.len() as i64 >= desired_count {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if desired_count == ANY_NODES && !reporting.is_empty() {
                        break;
                    }
                    hive_trace!("head.rollcall.timeout", {
                        "request_id": request_id.to_string(),
                        "reporting": reporting.len()
                    });
                    return Err(NodeError::RollCallTimeout(request_id.clone()));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(NodeError::ChannelError("roll call mailbox closed".to_string()));
                }
            }
        }

        if consensus == Some(ConsensusKind::Pbft) && reporting.len() < MIN_PBFT_REPLICAS {
            return Err(NodeError::InsufficientReplicas(
                reporting.len(),
                MIN_PBFT_REPLICAS,
            ));
        }
        Ok(reporting)
    }

    /// An inadequate response never aborts the auction, it is just not
    /// counted.
    fn acceptable_volunteer(&self, response: &RollCallResponse, request: &ExecutionRequest) -> bool {
        if !response.code.is_accepted() || response.function_id != request.function_id {
            hive_trace!("head.rollcall.inadequate", {
                "from": response.from.to_string(),
                "code": response.code.to_string(),
                "function_id": response.function_id.to_string()
            });
            return false;
        }
        if !self.network.is_connected(&response.from) {
            debug!(
                "dropping roll call response from unconnected peer {}",
                response.from
            );
            return false;
        }
        if !self.network.get_peer_ids_connected().contains(&response.from) {
            debug!("peer {} absent from the connected-peer table", response.from);
            return false;
        }
        true
    }

    /// All-or-nothing cluster bootstrap: every invited peer must confirm
    /// within the formation timeout or the whole request is aborted.
    pub(crate) fn form_cluster(
        &self,
        request_id: &RequestId,
        peers: &[PeerId],
        consensus: ConsensusKind,
    ) -> Result<(), NodeError> {
        hive_trace!("head.cluster.form", {
            "request_id": request_id.to_string(),
            "consensus": consensus.to_string(),
            "peers": peers.len()
        });

        let connection_info: Vec<PeerRecord> = peers
            .iter()
            .filter_map(|peer| self.network.get_peer_record(peer))
            .collect();
        let message = Message::from(FormCluster {
            request_id: request_id.clone(),
            origin: self.peer_id,
            peers: peers.to_vec(),
            consensus,
            connection_info,
        });
        // cluster correctness depends on every member joining: no
        // partial fan-out tolerance here
        self.network
            .send_to_many(peers, message.to_bytes()?, true)?;

        let deadline = Instant::now() + self.config.cluster_formation_timeout.to_duration();
        let confirmed = std::thread::scope(|scope| {
            let handles: Vec<_> = peers
                .iter()
                .map(|peer| {
                    let peer = *peer;
                    let key = (request_id.clone(), peer);
                    scope.spawn(move || {
                        self.cluster_confirmations
                            .wait_deadline(&key, deadline)
                            .map(|response| response.code == ResponseCode::Ok)
                            .unwrap_or(false)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or(false))
                .filter(|confirmed| *confirmed)
                .count()
        });

        for peer in peers {
            self.cluster_confirmations
                .delete(&(request_id.clone(), *peer));
        }

        if confirmed == peers.len() {
            Ok(())
        } else {
            Err(NodeError::ClusterFormationFailed(confirmed, peers.len()))
        }
    }

    /// Best-effort teardown order to every cluster member. Failures are
    /// logged, not propagated: a peer that missed the disband recovers
    /// through its own bounded result wait.
    pub(crate) fn disband_cluster(&self, request_id: &RequestId, peers: &[PeerId]) {
        hive_trace!("head.cluster.disband", {
            "request_id": request_id.to_string(),
            "peers": peers.len()
        });
        let message = Message::from(crate::messages::DisbandCluster {
            request_id: request_id.clone(),
            from: self.peer_id,
        });
        match message.to_bytes() {
            Ok(bytes) => {
                if let Err(err) = self.network.send_to_many(peers, bytes, false) {
                    warn!("request {}: disband delivery failed: {}", request_id, err);
                }
            }
            Err(err) => warn!("request {}: disband serialization failed: {}", request_id, err),
        }
    }

    fn dispatch_and_aggregate(
        &self,
        request_id: &RequestId,
        request: &ExecutionRequest,
        peers: &[PeerId],
        consensus: Option<ConsensusKind>,
    ) -> Result<ExecuteOutcome, NodeError> {
        let timestamp = HiveTime::now()?;
        let mut order = WorkOrder {
            request_id: request_id.clone(),
            request: request.clone(),
            timestamp,
            signature: None,
        };
        // byzantine aggregation counts only votes that verify against
        // the voter identity, so the order itself is attributed too
        if consensus == Some(ConsensusKind::Pbft) {
            order.sign(&self.keypair)?;
        }
        let bytes = Message::from(order).to_bytes()?;

        let require_all = consensus.is_some();
        if let Err(err) = self.network.send_to_many(peers, bytes, require_all) {
            if require_all {
                warn!("request {}: work order delivery failed: {}", request_id, err);
                return Ok(ExecuteOutcome {
                    request_id: request_id.clone(),
                    code: ResponseCode::Error,
                    results: HashMap::new(),
                    cluster: peers.to_vec(),
                });
            }
            debug!("request {}: partial work order delivery: {}", request_id, err);
        }

        let deadline = Instant::now() + self.config.execution_timeout.to_duration();
        let (code, results) = match consensus {
            Some(ConsensusKind::Pbft) => {
                match self.gather_pbft_responses(request_id, peers, deadline) {
                    Some(group) => {
                        // the winning group is internally identical;
                        // propagate its own result code
                        let code = group
                            .values()
                            .next()
                            .map(|response| response.code)
                            .unwrap_or(ResponseCode::NoContent);
                        (code, group)
                    }
                    None => (ResponseCode::Timeout, HashMap::new()),
                }
            }
            _ => {
                let results = self.gather_responses(request_id, peers, deadline);
                let code = threshold_outcome_code(
                    results.len(),
                    peers.len(),
                    request.config.threshold,
                );
                (code, results)
            }
        };

        // arena hygiene: this request's response keys are consumed
        for peer in peers {
            self.execution_responses
                .delete(&(request_id.clone(), *peer));
        }

        Ok(ExecuteOutcome {
            request_id: request_id.clone(),
            code,
            results,
            cluster: peers.to_vec(),
        })
    }

    /// Direct / replicated-log aggregation: collect whatever arrives
    /// before the execution deadline, one bounded wait per peer.
    fn gather_responses(
        &self,
        request_id: &RequestId,
        peers: &[PeerId],
        deadline: Instant,
    ) -> HashMap<PeerId, WorkOrderResponse> {
        let mut results = HashMap::new();
        std::thread::scope(|scope| {
            let handles: Vec<_> = peers
                .iter()
                .map(|peer| {
                    let peer = *peer;
                    let key = (request_id.clone(), peer);
                    let responses = self.execution_responses.clone();
                    scope.spawn(move || {
                        responses
                            .wait_deadline(&key, deadline)
                            .map(|response| (peer, response))
                    })
                })
                .collect();
            for handle in handles {
                if let Ok(Some((peer, response))) = handle.join() {
                    results.insert(peer, response);
                }
            }
        });
        results
    }

    /// Byzantine aggregation: verify each reply against the sender's own
    /// public key, group by (result payload, order timestamp) equality,
    /// and return the first group that reaches the minimum-matching
    /// quorum. Pending waits are abandoned the instant a group wins, so
    /// slow or non-matching replies never delay the result.
    fn gather_pbft_responses(
        &self,
        request_id: &RequestId,
        peers: &[PeerId],
        deadline: Instant,
    ) -> Option<HashMap<PeerId, WorkOrderResponse>> {
        let min_matching = pbft_min_matching(peers.len());
        hive_trace!("head.pbft.gather", {
            "request_id": request_id.to_string(),
            "min_matching": min_matching
        });

        let (result_tx, result_rx) = HiveChannel::new(
            format!("pbft_gather_{}", request_id),
            Some(peers.len()),
        );
        for peer in peers {
            let peer = *peer;
            let key = (request_id.clone(), peer);
            let responses = self.execution_responses.clone();
            let result_tx = result_tx.clone();
            // detached on purpose: each waiter exits at its own deadline
            // and must not hold up the quorum return
            std::thread::Builder::new()
                .name("head-pbft-gather".to_string())
                .spawn(move || {
                    if let Some(response) = responses.wait_deadline(&key, deadline) {
                        let _ = result_tx.send((peer, response));
                    }
                })
                .expect("OS failed to start pbft gather thread");
        }
        drop(result_tx);

        let mut groups: HashMap<(String, u64), HashMap<PeerId, WorkOrderResponse>> =
            HashMap::new();
        loop {
            let (peer, response) = match result_rx.recv_deadline(deadline) {
                Ok(entry) => entry,
                // deadline hit, or every waiter finished without quorum
                Err(_) => return None,
            };
            // a reply that does not verify against its sender identity
            // is not a vote
            if response.verify(&peer).is_err() {
                debug!(
                    "request {}: discarding execution response with bad signature from {}",
                    request_id, peer
                );
                continue;
            }
            let group_key = (
                serde_json::to_string(&response.result).unwrap_or_default(),
                response.timestamp.to_millis(),
            );
            let group = groups.entry(group_key).or_default();
            group.insert(peer, response);
            if group.len() >= min_matching {
                hive_trace!("head.pbft.quorum", {
                    "request_id": request_id.to_string(),
                    "matching": group.len()
                });
                return Some(group.clone());
            }
        }
    }

    /// Usability over strictness: a request naming an algorithm this
    /// node cannot parse falls back to the node default instead of being
    /// rejected, with the discrepancy logged.
    fn resolve_consensus(&self, requested: &str) -> Option<ConsensusKind> {
        if requested.is_empty() {
            return None;
        }
        match ConsensusKind::from_str(requested) {
            Ok(kind) => Some(kind),
            Err(err) => {
                warn!(
                    "unknown consensus `{}` requested, falling back to node default: {}",
                    requested, err
                );
                self.config.default_consensus
            }
        }
    }
}

/// Response code of a non-byzantine execution, from the fraction of
/// cluster peers that reported back.
pub(crate) fn threshold_outcome_code(
    responded: usize,
    cluster_size: usize,
    requested_threshold: f64,
) -> ResponseCode {
    if responded == 0 || cluster_size == 0 {
        return ResponseCode::NoContent;
    }
    let threshold = if requested_threshold > 0.0 && requested_threshold <= 1.0 {
        requested_threshold
    } else {
        DEFAULT_EXECUTION_THRESHOLD
    };
    let ratio = responded as f64 / cluster_size as f64;
    if ratio < threshold {
        ResponseCode::PartialContent
    } else {
        ResponseCode::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_outcome_codes() {
        // n == 0 -> no content
        assert_eq!(threshold_outcome_code(0, 4, 0.5), ResponseCode::NoContent);
        // n/c >= t -> ok
        assert_eq!(threshold_outcome_code(2, 4, 0.5), ResponseCode::Ok);
        assert_eq!(threshold_outcome_code(4, 4, 1.0), ResponseCode::Ok);
        // 0 < n/c < t -> partial
        assert_eq!(
            threshold_outcome_code(1, 4, 0.5),
            ResponseCode::PartialContent
        );
        // out-of-range thresholds fall back to the default 0.6
        assert_eq!(threshold_outcome_code(3, 4, 0.0), ResponseCode::Ok);
        assert_eq!(
            threshold_outcome_code(2, 4, 1.7),
            ResponseCode::PartialContent
        );
    }
}
