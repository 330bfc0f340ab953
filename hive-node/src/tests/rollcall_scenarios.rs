use std::time::{Duration, Instant};

use hive_execution_exports::{ExecutionError, MockFunctionStore};
use hive_models::{AttributeRequirement, FunctionId, RequestId, ResponseCode};
use hive_network_exports::Pipeline;
use hive_signature::KeyPair;
use serial_test::serial;

use crate::messages::{Message, RollCall, RollCallResponse};
use crate::node::Node;
use crate::settings::NodeRole;
use crate::tests::mock_network::MockNetworkHub;
use crate::tests::tools::{
    kinds_between, start_head, test_config, test_request, InstalledStore, TestNode,
};

fn response_bytes(response: RollCallResponse) -> Vec<u8> {
    Message::from(response).to_bytes().unwrap()
}

#[test]
#[serial]
fn test_roll_call_times_out_with_no_volunteers() {
    let hub = MockNetworkHub::new();
    let head = start_head(&hub);

    let started = Instant::now();
    let outcome = head
        .node
        .execute_function(test_request("fn-timeout", 1, ""))
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome.code, ResponseCode::Timeout);
    assert!(outcome.results.is_empty());
    assert!(outcome.cluster.is_empty());
    // bounded by the roll-call timeout plus scheduling slack
    assert!(elapsed < Duration::from_millis(2_000));
    // mailbox hygiene: the auction's mailbox is gone
    assert_eq!(head.node.rollcall_queue.len(), 0);

    head.stop();
}

#[test]
#[serial]
fn test_roll_call_filters_inadequate_and_unconnected_responses() {
    let hub = MockNetworkHub::new();
    let head = start_head(&hub);

    // a connected peer that will answer for the wrong function
    let connected_keypair = KeyPair::generate();
    let connected_peer =
        hive_network_exports::PeerId::from_public_key(connected_keypair.get_public_key());
    let (_controller, _mailbox) = hub.register(connected_peer);
    // a peer the head has no connection to at all
    let stranger = hive_network_exports::PeerId::generate();

    let request_id = RequestId::generate();
    let request = test_request("fn-filter", 1, "");

    let node = head.node.clone();
    let injected_request_id = request_id.clone();
    let injector = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        // wrong function: adequate-looking but must not count
        node.process_message(
            connected_peer,
            Pipeline::Direct,
            &response_bytes(RollCallResponse {
                from: connected_peer,
                request_id: injected_request_id.clone(),
                function_id: FunctionId::from("fn-other"),
                code: ResponseCode::Accepted,
                role: "worker".to_string(),
            }),
        )
        .unwrap();
        // right function but unconnected sender
        node.process_message(
            stranger,
            Pipeline::Direct,
            &response_bytes(RollCallResponse {
                from: stranger,
                request_id: injected_request_id,
                function_id: FunctionId::from("fn-filter"),
                code: ResponseCode::Accepted,
                role: "worker".to_string(),
            }),
        )
        .unwrap();
    });

    let outcome = head.node.execute(request_id, request).unwrap();
    injector.join().unwrap();

    assert_eq!(outcome.code, ResponseCode::Timeout);
    assert_eq!(head.node.rollcall_queue.len(), 0);

    head.stop();
}

#[test]
#[serial]
fn test_roll_call_mailbox_starts_fresh_on_reuse() {
    let hub = MockNetworkHub::new();
    let head = start_head(&hub);

    let volunteer_keypair = KeyPair::generate();
    let volunteer =
        hive_network_exports::PeerId::from_public_key(volunteer_keypair.get_public_key());
    let (_controller, _mailbox) = hub.register(volunteer);

    let request_id = RequestId::generate();

    let node = head.node.clone();
    let injected_request_id = request_id.clone();
    let injector = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        node.process_message(
            volunteer,
            Pipeline::Direct,
            &response_bytes(RollCallResponse {
                from: volunteer,
                request_id: injected_request_id,
                function_id: FunctionId::from("fn-reuse"),
                code: ResponseCode::Accepted,
                role: "worker".to_string(),
            }),
        )
        .unwrap();
    });

    // the volunteer is a bare peer, so execution yields no responses,
    // but the roll call itself must succeed
    let outcome = head
        .node
        .execute(request_id.clone(), test_request("fn-reuse", 1, ""))
        .unwrap();
    injector.join().unwrap();
    assert_eq!(outcome.cluster, vec![volunteer]);
    assert_eq!(outcome.code, ResponseCode::NoContent);
    assert_eq!(head.node.rollcall_queue.len(), 0);

    // same request id again: behaves as if starting fresh
    let outcome = head
        .node
        .execute(request_id, test_request("fn-reuse", 1, ""))
        .unwrap();
    assert_eq!(outcome.code, ResponseCode::Timeout);
    assert_eq!(head.node.rollcall_queue.len(), 0);

    head.stop();
}

#[test]
#[serial]
fn test_worker_reports_install_failure_instead_of_volunteering() {
    let hub = MockNetworkHub::new();

    let mut fstore = MockFunctionStore::new();
    fstore.expect_sync().returning(|_| Ok(()));
    fstore.expect_is_installed().returning(|_| Ok(false));
    fstore
        .expect_install()
        .returning(|_, _| Err(ExecutionError::ManifestError("unreachable manifest".into())));

    let worker = TestNode::start(
        &hub,
        test_config(NodeRole::Worker),
        None,
        Box::new(fstore),
        None,
    );
    let head = start_head(&hub);

    let outcome = head
        .node
        .execute_function(test_request("fn-missing", 1, ""))
        .unwrap();

    // the error reply is not an acceptance, so the auction times out
    assert_eq!(outcome.code, ResponseCode::Timeout);
    let kinds = kinds_between(&hub, &worker.peer_id, &head.peer_id);
    assert_eq!(kinds, vec!["roll_call_response"]);
    let sent = hub.sent_between(&worker.peer_id, &head.peer_id);
    match Message::from_bytes(&sent[0]).unwrap() {
        Message::RollCallResponse(response) => assert_eq!(response.code, ResponseCode::Error),
        other => panic!("unexpected message: {:?}", other),
    }

    head.stop();
    worker.stop();
}

#[test]
#[serial]
fn test_worker_silent_on_attribute_mismatch() {
    let hub = MockNetworkHub::new();

    let head_keypair = KeyPair::generate();
    let head_peer = hive_network_exports::PeerId::from_public_key(head_keypair.get_public_key());
    let (_head_controller, _head_mailbox) = hub.register(head_peer);

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

    let demanding = RollCall {
        origin: head_peer,
        request_id: RequestId::generate(),
        function_id: FunctionId::from("fn-attr"),
        consensus: None,
        attributes: vec![AttributeRequirement {
            key: "tee".to_string(),
            value: "sgx".to_string(),
        }],
        topic: String::new(),
        manifest_url: String::new(),
    };
    worker.process_roll_call(head_peer, demanding).unwrap();
    // deliberately unobservable: nothing goes back at all
    assert!(kinds_between(&hub, &worker_peer, &head_peer).is_empty());

    let plain = RollCall {
        origin: head_peer,
        request_id: RequestId::generate(),
        function_id: FunctionId::from("fn-attr"),
        consensus: None,
        attributes: Vec::new(),
        topic: String::new(),
        manifest_url: String::new(),
    };
    worker.process_roll_call(head_peer, plain).unwrap();
    assert_eq!(
        kinds_between(&hub, &worker_peer, &head_peer),
        vec!["roll_call_response"]
    );
}
