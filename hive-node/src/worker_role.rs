//! Worker-side handlers: volunteering for roll calls, function
//! installation, cluster joins, work-order execution and teardown.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use hive_consensus_exports::{ClusterSpec, OriginForwardFn, ResultCacheFn};
use hive_logging::hive_trace;
use hive_models::{ConsensusKind, ExecutionResult, FunctionId, ResponseCode};
use hive_network_exports::PeerId;
use tracing::{debug, info, warn};

use crate::error::NodeError;
use crate::messages::{
    DisbandCluster, FormCluster, FormClusterResponse, InstallFunction, InstallFunctionResponse,
    Message, RollCall, RollCallResponse, WorkOrder, WorkOrderResponse,
};
use crate::node::Node;

impl Node {
    /// Decides whether to volunteer for a roll call. The two silent
    /// rejections (raft-occupied, attribute mismatch) are deliberately
    /// unobservable: an unauthenticated peer learns nothing about this
    /// node's state or capabilities from them.
    pub(crate) fn process_roll_call(
        &self,
        _from: PeerId,
        roll_call: RollCall,
    ) -> Result<(), NodeError> {
        hive_trace!("worker.rollcall.receive", {
            "request_id": roll_call.request_id.to_string(),
            "function_id": roll_call.function_id.to_string(),
            "origin": roll_call.origin.to_string()
        });

        // a node drives at most one raft cluster at a time; enforced by
        // scanning the live registry, not by the data model
        if roll_call.consensus == Some(ConsensusKind::Raft) && self.has_raft_cluster() {
            debug!(
                "already part of a raft cluster, sitting out roll call {}",
                roll_call.request_id
            );
            return Ok(());
        }

        if !self.config.attributes.satisfies(&roll_call.attributes) {
            hive_trace!("worker.rollcall.attribute_mismatch", {
                "request_id": roll_call.request_id.to_string()
            });
            return Ok(());
        }

        // lazily install; a failure here is reported back, not swallowed
        let code = match self
            .ensure_function_installed(&roll_call.function_id, &roll_call.manifest_url)
        {
            Ok(()) => ResponseCode::Accepted,
            Err(err) => {
                warn!(
                    "function check/install failed for roll call {}: {}",
                    roll_call.request_id, err
                );
                ResponseCode::Error
            }
        };

        let response = RollCallResponse {
            from: self.peer_id,
            request_id: roll_call.request_id,
            function_id: roll_call.function_id,
            code,
            role: "worker".to_string(),
        };
        self.send_to(&roll_call.origin, Message::from(response))
    }

    fn ensure_function_installed(
        &self,
        function_id: &FunctionId,
        manifest_url: &str,
    ) -> Result<(), NodeError> {
        if self.fstore.is_installed(function_id)? {
            return Ok(());
        }
        hive_trace!("worker.function.install", {
            "function_id": function_id.to_string(),
            "manifest_url": manifest_url
        });
        self.fstore.install(manifest_url, function_id)?;
        Ok(())
    }

    /// Explicit install instruction outside any roll call.
    pub(crate) fn process_install_function(
        &self,
        from: PeerId,
        install: InstallFunction,
    ) -> Result<(), NodeError> {
        let (code, message) = match self
            .ensure_function_installed(&install.function_id, &install.manifest_url)
        {
            Ok(()) => (ResponseCode::Accepted, String::new()),
            Err(err) => (ResponseCode::Error, err.to_string()),
        };
        let response = InstallFunctionResponse {
            from: self.peer_id,
            function_id: install.function_id,
            code,
            message,
        };
        self.send_to(&from, Message::from(response))
    }

    /// Joins a consensus cluster for one request: merge connectivity
    /// hints, construct the engine with its result callbacks, register
    /// it, and only then confirm to the inviter.
    pub(crate) fn process_form_cluster(
        &self,
        from: PeerId,
        form_cluster: FormCluster,
    ) -> Result<(), NodeError> {
        hive_trace!("worker.cluster.join", {
            "request_id": form_cluster.request_id.to_string(),
            "consensus": form_cluster.consensus.to_string(),
            "peers": form_cluster.peers.len()
        });

        self.network.merge_peer_records(&form_cluster.connection_info);

        let request_id = form_cluster.request_id.clone();
        match self.build_cluster(&form_cluster) {
            Ok(()) => {
                let response = FormClusterResponse {
                    request_id,
                    from: self.peer_id,
                    code: ResponseCode::Ok,
                };
                self.send_to(&from, Message::from(response))
            }
            Err(err) => {
                warn!(
                    "could not join cluster for request {}: {}",
                    request_id, err
                );
                let response = FormClusterResponse {
                    request_id,
                    from: self.peer_id,
                    code: ResponseCode::Error,
                };
                self.send_to(&from, Message::from(response))?;
                Err(err)
            }
        }
    }

    fn build_cluster(&self, form_cluster: &FormCluster) -> Result<(), NodeError> {
        let factory = self
            .cluster_factory
            .as_ref()
            .ok_or(NodeError::NoClusterFactory)?;

        let results = self.execution_results.clone();
        let cache_result: ResultCacheFn = Arc::new(move |request_id, result| {
            results.set(request_id, result);
        });

        let network = self.network.clone();
        let keypair = self.keypair.clone();
        let peer_id = self.peer_id;
        let sign_forwarded = form_cluster.consensus == ConsensusKind::Pbft;
        let forward_result: OriginForwardFn =
            Arc::new(move |origin, request_id, timestamp, result| {
                let mut response = WorkOrderResponse {
                    request_id,
                    from: peer_id,
                    code: result.code,
                    result: Some(result),
                    timestamp,
                    metadata: BTreeMap::new(),
                    error_message: String::new(),
                    signature: None,
                };
                if sign_forwarded {
                    if let Err(err) = response.sign(&keypair) {
                        warn!("failed to sign forwarded result: {}", err);
                        return;
                    }
                }
                match Message::from(response).to_bytes() {
                    Ok(bytes) => {
                        if let Err(err) = network.send_to_peer(&origin, bytes) {
                            warn!(
                                "failed to forward committed result to {}: {}",
                                origin, err
                            );
                        }
                    }
                    Err(err) => warn!("failed to serialize forwarded result: {}", err),
                }
            });

        let cluster = factory.create(ClusterSpec {
            kind: form_cluster.consensus,
            request_id: form_cluster.request_id.clone(),
            members: form_cluster.peers.clone(),
            connection_info: form_cluster.connection_info.clone(),
            cache_result,
            forward_result,
        })?;
        self.register_cluster(form_cluster.request_id.clone(), Arc::from(cluster));
        Ok(())
    }

    /// Executes one work order, directly or through the cluster already
    /// registered for its request, and always answers the caller with
    /// whatever code/result/error came out. The one exception is
    /// `NoContent`: when nothing at all happened there is nothing worth
    /// reporting.
    pub(crate) fn process_work_order(
        &self,
        from: PeerId,
        order: WorkOrder,
    ) -> Result<(), NodeError> {
        // internal protocol-consistency invariant, not input validation
        if order.request_id.is_empty() {
            return Err(NodeError::MissingRequestId);
        }

        hive_trace!("worker.work_order.receive", {
            "request_id": order.request_id.to_string(),
            "function_id": order.request.function_id.to_string(),
            "from": from.to_string()
        });

        // an attributed order that fails verification is not an order
        if order.signature.is_some() && order.verify(&from).is_err() {
            debug!(
                "discarding work order with bad signature from {} for request {}",
                from, order.request_id
            );
            return Ok(());
        }

        if !self.fstore.is_installed(&order.request.function_id)? {
            self.send_work_order_response(
                &from,
                &order,
                ResponseCode::NotFound,
                None,
                format!("function `{}` is not installed", order.request.function_id),
                false,
            )?;
            return Ok(());
        }

        let consensus = if order.request.config.consensus.is_empty() {
            None
        } else {
            ConsensusKind::from_str(&order.request.config.consensus).ok()
        };

        let (code, result, error_message, invariant_violation) = match consensus {
            None => self.execute_direct(&order),
            Some(_) => self.execute_in_cluster(from, &order),
        };

        // cache so a concurrent disband observes completion
        if let Some(result) = &result {
            self.execution_results
                .set(order.request_id.clone(), result.clone());
        }

        // "no execution happened" is only left unreported for NoContent
        if code != ResponseCode::NoContent {
            let sign = consensus == Some(ConsensusKind::Pbft);
            self.send_work_order_response(&from, &order, code, result, error_message, sign)?;
        }

        match invariant_violation {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    #[allow(clippy::type_complexity)]
    fn execute_direct(
        &self,
        order: &WorkOrder,
    ) -> (
        ResponseCode,
        Option<ExecutionResult>,
        String,
        Option<NodeError>,
    ) {
        let executor = match self.executor.as_ref() {
            Some(executor) => executor,
            None => {
                return (
                    ResponseCode::Error,
                    None,
                    NodeError::NoExecutor.to_string(),
                    Some(NodeError::NoExecutor),
                )
            }
        };
        match executor.execute_function(&order.request_id, &order.request) {
            Ok(result) => (result.code, Some(result), String::new(), None),
            Err(err) => (ResponseCode::Error, None, err.to_string(), None),
        }
    }

    #[allow(clippy::type_complexity)]
    fn execute_in_cluster(
        &self,
        from: PeerId,
        order: &WorkOrder,
    ) -> (
        ResponseCode,
        Option<ExecutionResult>,
        String,
        Option<NodeError>,
    ) {
        // the cluster must have been created by the join handler first
        let cluster = match self.get_cluster(&order.request_id) {
            Some(cluster) => cluster,
            None => {
                let err = NodeError::MissingCluster(order.request_id.clone());
                return (ResponseCode::Error, None, err.to_string(), Some(err));
            }
        };
        match cluster.execute(from, &order.request_id, order.timestamp, &order.request) {
            Ok((code, result)) => (code, Some(result), String::new(), None),
            Err(err) => (ResponseCode::Error, None, err.to_string(), None),
        }
    }

    fn send_work_order_response(
        &self,
        to: &PeerId,
        order: &WorkOrder,
        code: ResponseCode,
        result: Option<ExecutionResult>,
        error_message: String,
        sign: bool,
    ) -> Result<(), NodeError> {
        let mut response = WorkOrderResponse {
            request_id: order.request_id.clone(),
            from: self.peer_id,
            code,
            result,
            timestamp: order.timestamp,
            metadata: BTreeMap::new(),
            error_message,
            signature: None,
        };
        if sign {
            response.sign(&self.keypair)?;
        }
        self.send_to(to, Message::from(response))
    }

    /// Cluster teardown: let an in-flight commit land (bounded), shut
    /// the engine down, then drop the registry entry. A missing cluster
    /// is an error, not a node failure.
    pub(crate) fn process_disband_cluster(
        &self,
        _from: PeerId,
        disband: DisbandCluster,
    ) -> Result<(), NodeError> {
        hive_trace!("worker.cluster.disband", {
            "request_id": disband.request_id.to_string()
        });

        if self
            .execution_results
            .wait_for(
                &disband.request_id,
                self.config.disband_result_wait.to_duration(),
            )
            .is_none()
        {
            debug!(
                "no execution result cached for request {} before disband",
                disband.request_id
            );
        }

        let cluster = self
            .get_cluster(&disband.request_id)
            .ok_or_else(|| NodeError::MissingCluster(disband.request_id.clone()))?;
        cluster.shutdown()?;
        // the registry entry outlives shutdown, never the other way round
        self.remove_cluster(&disband.request_id);
        self.execution_results.delete(&disband.request_id);

        info!("left cluster for request {}", disband.request_id);
        Ok(())
    }
}
