use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use hive_consensus_exports::{ClusterFactory, ClusterSpec, ConsensusCluster, ConsensusError};
use hive_execution_exports::{ExecutionController, ExecutionError, FunctionStore};
use hive_models::{
    ConsensusKind, ExecutionRequest, ExecutionResult, FunctionId, RequestId, ResponseCode,
    RuntimeOutput, RuntimeUsage,
};
use hive_network_exports::PeerId;
use hive_signature::KeyPair;
use hive_time::HiveTime;

use crate::messages::Message;
use crate::node::Node;
use crate::settings::{NodeConfig, NodeRole};
use crate::worker::start_node;
use crate::NodeManager;

use super::mock_network::SharedMockNetworkHub;

/// Kinds of every direct message `from` sent `to`, in send order.
pub fn kinds_between(hub: &SharedMockNetworkHub, from: &PeerId, to: &PeerId) -> Vec<&'static str> {
    hub.sent_between(from, to)
        .iter()
        .filter_map(|data| Message::from_bytes(data).ok())
        .map(|message| message.kind().as_str())
        .collect()
}

/// Polls a condition until it holds or the patience runs out.
pub fn wait_until<F: Fn() -> bool>(patience: Duration, condition: F) -> bool {
    let deadline = std::time::Instant::now() + patience;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    condition()
}

pub fn test_config(role: NodeRole) -> NodeConfig {
    NodeConfig {
        role,
        default_topic: "hive-test".to_string(),
        rollcall_timeout: HiveTime::from_millis(400),
        cluster_formation_timeout: HiveTime::from_millis(800),
        execution_timeout: HiveTime::from_millis(1_500),
        disband_result_wait: HiveTime::from_millis(200),
        // far enough out that no health tick fires during a test
        health_interval: HiveTime::from_millis(120_000),
        default_consensus: None,
        message_concurrency: 4,
        inbound_channel_capacity: 64,
        rollcall_queue_capacity: 16,
        attributes: Default::default(),
    }
}

pub fn test_request(function_id: &str, node_count: i64, consensus: &str) -> ExecutionRequest {
    let mut request: ExecutionRequest = serde_json::from_str(&format!(
        r#"{{"function_id": "{}", "method": "main.wasm"}}"#,
        function_id
    ))
    .unwrap();
    request.config.node_count = node_count;
    request.config.consensus = consensus.to_string();
    request
}

pub fn result_with_stdout(stdout: &str) -> ExecutionResult {
    ExecutionResult {
        code: ResponseCode::Ok,
        output: RuntimeOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: 0,
        },
        usage: RuntimeUsage::default(),
    }
}

/// Executor answering every invocation with a fixed stdout.
pub struct EchoExecutor {
    pub stdout: String,
}

impl ExecutionController for EchoExecutor {
    fn execute_function(
        &self,
        _request_id: &RequestId,
        _request: &ExecutionRequest,
    ) -> Result<ExecutionResult, ExecutionError> {
        Ok(result_with_stdout(&self.stdout))
    }
}

/// Executor that outlives the head's execution deadline, to simulate a
/// worker whose reply never arrives in time.
pub struct SlowExecutor {
    pub delay: Duration,
    pub stdout: String,
}

impl ExecutionController for SlowExecutor {
    fn execute_function(
        &self,
        _request_id: &RequestId,
        _request: &ExecutionRequest,
    ) -> Result<ExecutionResult, ExecutionError> {
        std::thread::sleep(self.delay);
        Ok(result_with_stdout(&self.stdout))
    }
}

/// Function store with every package already cached.
pub struct InstalledStore;

impl FunctionStore for InstalledStore {
    fn is_installed(&self, _function_id: &FunctionId) -> Result<bool, ExecutionError> {
        Ok(true)
    }

    fn install(&self, _manifest_url: &str, _function_id: &FunctionId) -> Result<(), ExecutionError> {
        Ok(())
    }

    fn sync(&self, _halt_on_error: bool) -> Result<(), ExecutionError> {
        Ok(())
    }
}

/// Consensus engine stand-in: commits a fixed result immediately and
/// counts shutdowns.
pub struct StubCluster {
    kind: ConsensusKind,
    stdout: String,
    shutdowns: Arc<AtomicUsize>,
    spec_cache: hive_consensus_exports::ResultCacheFn,
}

impl ConsensusCluster for StubCluster {
    fn kind(&self) -> ConsensusKind {
        self.kind
    }

    fn execute(
        &self,
        _from: PeerId,
        request_id: &RequestId,
        _timestamp: HiveTime,
        _request: &ExecutionRequest,
    ) -> Result<(ResponseCode, ExecutionResult), ConsensusError> {
        let result = result_with_stdout(&self.stdout);
        // engines cache their committed result themselves
        (self.spec_cache)(request_id.clone(), result.clone());
        Ok((ResponseCode::Ok, result))
    }

    fn shutdown(&self) -> Result<(), ConsensusError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct StubClusterFactory {
    pub stdout: String,
    pub shutdowns: Arc<AtomicUsize>,
}

impl StubClusterFactory {
    pub fn new(stdout: &str) -> (Self, Arc<AtomicUsize>) {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        (
            Self {
                stdout: stdout.to_string(),
                shutdowns: shutdowns.clone(),
            },
            shutdowns,
        )
    }
}

impl ClusterFactory for StubClusterFactory {
    fn create(&self, spec: ClusterSpec) -> Result<Box<dyn ConsensusCluster>, ConsensusError> {
        Ok(Box::new(StubCluster {
            kind: spec.kind,
            stdout: self.stdout.clone(),
            shutdowns: self.shutdowns.clone(),
            spec_cache: spec.cache_result,
        }))
    }
}

/// One fully started node on the mock network, with a pump thread
/// feeding hub deliveries into the node's ingress handler.
pub struct TestNode {
    pub node: Arc<Node>,
    pub peer_id: PeerId,
    hub: SharedMockNetworkHub,
    manager: NodeManager,
    pump: Option<JoinHandle<()>>,
}

impl TestNode {
    pub fn start(
        hub: &SharedMockNetworkHub,
        config: NodeConfig,
        executor: Option<Box<dyn ExecutionController>>,
        fstore: Box<dyn FunctionStore>,
        cluster_factory: Option<Box<dyn ClusterFactory>>,
    ) -> Self {
        let keypair = KeyPair::generate();
        let peer_id = PeerId::from_public_key(keypair.get_public_key());
        let (controller, deliveries) = hub.register(peer_id);

        let (manager, messages_handler, node) = start_node(
            config,
            keypair,
            Box::new(controller),
            executor,
            fstore,
            cluster_factory,
        )
        .expect("could not start test node");

        let pump = std::thread::spawn(move || {
            while let Ok((from, pipeline, data)) = deliveries.recv() {
                let _ = messages_handler.handle(from, pipeline, data);
            }
        });

        Self {
            node,
            peer_id,
            hub: hub.clone(),
            manager,
            pump: Some(pump),
        }
    }

    pub fn stop(mut self) {
        self.hub.disconnect(&self.peer_id);
        if let Some(pump) = self.pump.take() {
            pump.join().expect("delivery pump panicked on try to join");
        }
        self.manager.stop();
    }
}

/// Starts one worker with the function installed and a fixed stdout.
pub fn start_echo_worker(hub: &SharedMockNetworkHub, stdout: &str) -> TestNode {
    TestNode::start(
        hub,
        test_config(NodeRole::Worker),
        Some(Box::new(EchoExecutor {
            stdout: stdout.to_string(),
        })),
        Box::new(InstalledStore),
        None,
    )
}

/// Starts one worker backed by a stub consensus engine.
pub fn start_cluster_worker(
    hub: &SharedMockNetworkHub,
    stdout: &str,
) -> (TestNode, Arc<AtomicUsize>) {
    let (factory, shutdowns) = StubClusterFactory::new(stdout);
    let worker = TestNode::start(
        hub,
        test_config(NodeRole::Worker),
        Some(Box::new(EchoExecutor {
            stdout: stdout.to_string(),
        })),
        Box::new(InstalledStore),
        Some(Box::new(factory)),
    );
    (worker, shutdowns)
}

pub fn start_head(hub: &SharedMockNetworkHub) -> TestNode {
    TestNode::start(
        hub,
        test_config(NodeRole::Head),
        None,
        Box::new(InstalledStore),
        None,
    )
}
