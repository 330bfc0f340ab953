use std::collections::BTreeMap;

use hive_channel::sender::HiveSender;
use hive_models::{
    AttributeRequirement, ConsensusKind, ExecutionRequest, ExecutionResult, FunctionId, RequestId,
    ResponseCode,
};
use hive_network_exports::{PeerId, PeerRecord, Pipeline};
use hive_signature::{KeyPair, Signature};
use hive_time::HiveTime;
use serde::{Deserialize, Serialize};

use crate::error::NodeError;

/// Wire record of the orchestration protocol: self-describing JSON,
/// discriminated by the `type` field, which is the only thing the
/// dispatcher reads before routing to a typed handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "health_check")]
    HealthCheck(HealthCheck),
    #[serde(rename = "roll_call")]
    RollCall(RollCall),
    #[serde(rename = "roll_call_response")]
    RollCallResponse(RollCallResponse),
    #[serde(rename = "install_function")]
    InstallFunction(InstallFunction),
    #[serde(rename = "install_function_response")]
    InstallFunctionResponse(InstallFunctionResponse),
    #[serde(rename = "form_cluster")]
    FormCluster(FormCluster),
    #[serde(rename = "form_cluster_response")]
    FormClusterResponse(FormClusterResponse),
    #[serde(rename = "disband_cluster")]
    DisbandCluster(DisbandCluster),
    #[serde(rename = "work_order")]
    WorkOrder(Box<WorkOrder>),
    #[serde(rename = "work_order_response")]
    WorkOrderResponse(Box<WorkOrderResponse>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    HealthCheck,
    RollCall,
    RollCallResponse,
    InstallFunction,
    InstallFunctionResponse,
    FormCluster,
    FormClusterResponse,
    DisbandCluster,
    WorkOrder,
    WorkOrderResponse,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::HealthCheck => "health_check",
            MessageKind::RollCall => "roll_call",
            MessageKind::RollCallResponse => "roll_call_response",
            MessageKind::InstallFunction => "install_function",
            MessageKind::InstallFunctionResponse => "install_function_response",
            MessageKind::FormCluster => "form_cluster",
            MessageKind::FormClusterResponse => "form_cluster_response",
            MessageKind::DisbandCluster => "disband_cluster",
            MessageKind::WorkOrder => "work_order",
            MessageKind::WorkOrderResponse => "work_order_response",
        }
    }
}

impl From<&Message> for MessageKind {
    fn from(value: &Message) -> Self {
        match value {
            Message::HealthCheck(_) => MessageKind::HealthCheck,
            Message::RollCall(_) => MessageKind::RollCall,
            Message::RollCallResponse(_) => MessageKind::RollCallResponse,
            Message::InstallFunction(_) => MessageKind::InstallFunction,
            Message::InstallFunctionResponse(_) => MessageKind::InstallFunctionResponse,
            Message::FormCluster(_) => MessageKind::FormCluster,
            Message::FormClusterResponse(_) => MessageKind::FormClusterResponse,
            Message::DisbandCluster(_) => MessageKind::DisbandCluster,
            Message::WorkOrder(_) => MessageKind::WorkOrder,
            Message::WorkOrderResponse(_) => MessageKind::WorkOrderResponse,
        }
    }
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        MessageKind::from(self)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, NodeError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, NodeError> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Periodic liveness broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub from: PeerId,
    pub code: ResponseCode,
}

/// Broadcast solicitation for workers willing and able to run a given
/// function. Immutable once sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollCall {
    pub origin: PeerId,
    pub request_id: RequestId,
    pub function_id: FunctionId,
    #[serde(default)]
    pub consensus: Option<ConsensusKind>,
    #[serde(default)]
    pub attributes: Vec<AttributeRequirement>,
    #[serde(default)]
    pub topic: String,
    /// where a volunteer without the function cached fetches it from
    #[serde(default)]
    pub manifest_url: String,
}

/// One volunteering worker's answer, sent direct to the roll-call origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollCallResponse {
    pub from: PeerId,
    pub request_id: RequestId,
    pub function_id: FunctionId,
    pub code: ResponseCode,
    #[serde(default)]
    pub role: String,
}

/// Explicit install instruction, outside of any roll call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallFunction {
    pub from: PeerId,
    pub function_id: FunctionId,
    pub manifest_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallFunctionResponse {
    pub from: PeerId,
    pub function_id: FunctionId,
    pub code: ResponseCode,
    #[serde(default)]
    pub message: String,
}

/// Invitation to every roll-called peer to bootstrap a consensus group
/// for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormCluster {
    pub request_id: RequestId,
    pub origin: PeerId,
    pub peers: Vec<PeerId>,
    pub consensus: ConsensusKind,
    /// best-effort hints for peers that may not already know each other
    #[serde(default)]
    pub connection_info: Vec<PeerRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormClusterResponse {
    pub request_id: RequestId,
    pub from: PeerId,
    pub code: ResponseCode,
}

/// Tears down the consensus cluster of one request; idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisbandCluster {
    pub request_id: RequestId,
    pub from: PeerId,
}

/// Instruction to execute one function invocation for one request.
///
/// `signature` is a detached signature over the canonical JSON bytes of
/// the order with the signature field cleared; present iff the request
/// runs under the Byzantine-fault-tolerant algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    pub request_id: RequestId,
    pub request: ExecutionRequest,
    pub timestamp: HiveTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

impl WorkOrder {
    fn signable_bytes(&self) -> Result<Vec<u8>, NodeError> {
        let mut unsigned = self.clone();
        unsigned.signature = None;
        Ok(serde_json::to_vec(&unsigned)?)
    }

    pub fn sign(&mut self, keypair: &KeyPair) -> Result<(), NodeError> {
        let bytes = self.signable_bytes()?;
        self.signature = Some(keypair.sign(&bytes)?);
        Ok(())
    }

    pub fn verify(&self, sender: &PeerId) -> Result<(), NodeError> {
        let signature = self.signature.as_ref().ok_or(NodeError::WrongSignature)?;
        let bytes = self.signable_bytes()?;
        sender
            .verify_signature(&bytes, signature)
            .map_err(|_| NodeError::WrongSignature)
    }
}

/// A worker's (or cluster member's) attributed execution outcome.
///
/// `timestamp` echoes the work order's, so heads can group replies by
/// (result payload, request timestamp) equality under Byzantine
/// aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrderResponse {
    pub request_id: RequestId,
    pub from: PeerId,
    pub code: ResponseCode,
    #[serde(default)]
    pub result: Option<ExecutionResult>,
    pub timestamp: HiveTime,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

impl WorkOrderResponse {
    fn signable_bytes(&self) -> Result<Vec<u8>, NodeError> {
        let mut unsigned = self.clone();
        unsigned.signature = None;
        Ok(serde_json::to_vec(&unsigned)?)
    }

    pub fn sign(&mut self, keypair: &KeyPair) -> Result<(), NodeError> {
        let bytes = self.signable_bytes()?;
        self.signature = Some(keypair.sign(&bytes)?);
        Ok(())
    }

    pub fn verify(&self, sender: &PeerId) -> Result<(), NodeError> {
        let signature = self.signature.as_ref().ok_or(NodeError::WrongSignature)?;
        let bytes = self.signable_bytes()?;
        sender
            .verify_signature(&bytes, signature)
            .map_err(|_| NodeError::WrongSignature)
    }
}

impl From<HealthCheck> for Message {
    fn from(message: HealthCheck) -> Self {
        Self::HealthCheck(message)
    }
}

impl From<RollCall> for Message {
    fn from(message: RollCall) -> Self {
        Self::RollCall(message)
    }
}

impl From<RollCallResponse> for Message {
    fn from(message: RollCallResponse) -> Self {
        Self::RollCallResponse(message)
    }
}

impl From<InstallFunction> for Message {
    fn from(message: InstallFunction) -> Self {
        Self::InstallFunction(message)
    }
}

impl From<InstallFunctionResponse> for Message {
    fn from(message: InstallFunctionResponse) -> Self {
        Self::InstallFunctionResponse(message)
    }
}

impl From<FormCluster> for Message {
    fn from(message: FormCluster) -> Self {
        Self::FormCluster(message)
    }
}

impl From<FormClusterResponse> for Message {
    fn from(message: FormClusterResponse) -> Self {
        Self::FormClusterResponse(message)
    }
}

impl From<DisbandCluster> for Message {
    fn from(message: DisbandCluster) -> Self {
        Self::DisbandCluster(message)
    }
}

impl From<WorkOrder> for Message {
    fn from(message: WorkOrder) -> Self {
        Self::WorkOrder(Box::from(message))
    }
}

impl From<WorkOrderResponse> for Message {
    fn from(message: WorkOrderResponse) -> Self {
        Self::WorkOrderResponse(Box::from(message))
    }
}

/// One raw inbound message as the transport hands it over, stamped with
/// the pipeline it arrived on.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub from: PeerId,
    pub pipeline: Pipeline,
    pub data: Vec<u8>,
}

/// Transport-facing ingress point: the network layer calls `handle` for
/// every delivery; the bounded channel behind it is the admission gate
/// against inbound bursts.
#[derive(Clone)]
pub struct MessagesHandler {
    pub(crate) sender: HiveSender<InboundMessage>,
}

impl MessagesHandler {
    pub fn handle(&self, from: PeerId, pipeline: Pipeline, data: Vec<u8>) -> Result<(), NodeError> {
        self.sender
            .try_send(InboundMessage {
                from,
                pipeline,
                data,
            })
            .map_err(|err| {
                NodeError::ChannelError(format!("failed to admit inbound message: {}", err))
            })
    }
}
