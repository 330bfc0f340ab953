use std::sync::atomic::Ordering;
use std::time::Duration;

use hive_models::{ConsensusKind, FunctionId, RequestId, ResponseCode};
use hive_signature::KeyPair;
use serial_test::serial;

use crate::messages::{FormCluster, RollCall};
use crate::node::Node;
use crate::settings::NodeRole;
use crate::tests::mock_network::MockNetworkHub;
use crate::tests::tools::{
    kinds_between, start_cluster_worker, start_head, test_config, test_request, wait_until,
    EchoExecutor, InstalledStore, StubClusterFactory, TestNode,
};

#[test]
#[serial]
fn test_cluster_formation_is_all_or_nothing() {
    let hub = MockNetworkHub::new();

    // two members can build an engine, the third cannot and will reject
    let (able_one, shutdowns_one) = start_cluster_worker(&hub, "X");
    let (able_two, shutdowns_two) = start_cluster_worker(&hub, "X");
    let unable = TestNode::start(
        &hub,
        test_config(NodeRole::Worker),
        Some(Box::new(EchoExecutor {
            stdout: "X".to_string(),
        })),
        Box::new(InstalledStore),
        None,
    );
    let head = start_head(&hub);

    let outcome = head
        .node
        .execute_function(test_request("fn-allornothing", 3, "raft"))
        .unwrap();

    // one rejection aborts the whole request
    assert_eq!(outcome.code, ResponseCode::Error);
    assert!(outcome.results.is_empty());
    assert_eq!(outcome.cluster.len(), 3);
    // the confirmation keys of this request were consumed
    assert!(head.node.cluster_confirmations.is_empty());

    // every invited member is told to tear down, exactly once, because
    // the two that joined already hold local cluster state
    for worker in [&able_one, &able_two, &unable] {
        let disbands = kinds_between(&hub, &head.peer_id, &worker.peer_id)
            .into_iter()
            .filter(|kind| *kind == "disband_cluster")
            .count();
        assert_eq!(disbands, 1);
    }

    // the members that did join end up with no cluster registered
    assert!(wait_until(Duration::from_secs(3), || {
        shutdowns_one.load(Ordering::SeqCst) == 1 && shutdowns_two.load(Ordering::SeqCst) == 1
    }));
    assert!(wait_until(Duration::from_secs(1), || {
        able_one.node.clusters.read().is_empty() && able_two.node.clusters.read().is_empty()
    }));

    head.stop();
    able_one.stop();
    able_two.stop();
    unable.stop();
}

#[test]
#[serial]
fn test_worker_sits_out_second_raft_roll_call() {
    let hub = MockNetworkHub::new();

    let head_keypair = KeyPair::generate();
    let head_peer = hive_network_exports::PeerId::from_public_key(head_keypair.get_public_key());
    let (_head_controller, _head_mailbox) = hub.register(head_peer);

    let worker_keypair = KeyPair::generate();
    let worker_peer =
        hive_network_exports::PeerId::from_public_key(worker_keypair.get_public_key());
    let (worker_controller, _worker_mailbox) = hub.register(worker_peer);
    let (factory, _shutdowns) = StubClusterFactory::new("X");
    let worker = Node::new(
        test_config(NodeRole::Worker),
        worker_keypair,
        Box::new(worker_controller),
        None,
        Box::new(InstalledStore),
        Some(Box::new(factory)),
    );

    // join a raft cluster for one request
    let occupied_by = RequestId::generate();
    worker
        .process_form_cluster(
            head_peer,
            FormCluster {
                request_id: occupied_by.clone(),
                origin: head_peer,
                peers: vec![worker_peer],
                consensus: ConsensusKind::Raft,
                connection_info: Vec::new(),
            },
        )
        .unwrap();
    assert!(worker.get_cluster(&occupied_by).is_some());
    assert_eq!(
        kinds_between(&hub, &worker_peer, &head_peer),
        vec!["form_cluster_response"]
    );

    // a second raft roll call gets no reply at all
    worker
        .process_roll_call(
            head_peer,
            RollCall {
                origin: head_peer,
                request_id: RequestId::generate(),
                function_id: FunctionId::from("fn-raft"),
                consensus: Some(ConsensusKind::Raft),
                attributes: Vec::new(),
                topic: String::new(),
                manifest_url: String::new(),
            },
        )
        .unwrap();
    assert_eq!(
        kinds_between(&hub, &worker_peer, &head_peer),
        vec!["form_cluster_response"]
    );

    // a non-raft roll call is still answered
    worker
        .process_roll_call(
            head_peer,
            RollCall {
                origin: head_peer,
                request_id: RequestId::generate(),
                function_id: FunctionId::from("fn-direct"),
                consensus: None,
                attributes: Vec::new(),
                topic: String::new(),
                manifest_url: String::new(),
            },
        )
        .unwrap();
    assert_eq!(
        kinds_between(&hub, &worker_peer, &head_peer),
        vec!["form_cluster_response", "roll_call_response"]
    );
}

#[test]
#[serial]
fn test_disband_tolerates_missing_cluster() {
    let hub = MockNetworkHub::new();

    let head_peer = hive_network_exports::PeerId::generate();
    let worker_keypair = KeyPair::generate();
    let worker_peer =
        hive_network_exports::PeerId::from_public_key(worker_keypair.get_public_key());
    let (worker_controller, _worker_mailbox) = hub.register(worker_peer);
    let worker = Node::new(
        test_config(NodeRole::Worker),
        worker_keypair,
        Box::new(worker_controller),
        None,
        Box::new(InstalledStore),
        None,
    );

    let err = worker
        .process_disband_cluster(
            head_peer,
            crate::messages::DisbandCluster {
                request_id: RequestId::generate(),
                from: head_peer,
            },
        )
        .unwrap_err();
    assert!(matches!(err, crate::NodeError::MissingCluster(_)));
}
