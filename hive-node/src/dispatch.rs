use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::select;
use hive_channel::receiver::HiveReceiver;
use tracing::{info, warn};

use crate::messages::InboundMessage;
use crate::node::Node;

/// Commands the lifecycle threads process besides inbound traffic.
pub(crate) enum NodeCommand {
    Stop,
}

/// One of the fixed pool of threads draining the bounded inbound
/// channel. The pool size plus the channel bound is the node's counting
/// admission gate: an inbound burst queues, it never grows outstanding
/// work without limit.
pub(crate) struct DispatchThread {
    node: Arc<Node>,
    receiver: HiveReceiver<InboundMessage>,
    receiver_commands: HiveReceiver<NodeCommand>,
}

impl DispatchThread {
    fn run(&mut self) {
        loop {
            select! {
                recv(self.receiver) -> msg => {
                    self.receiver.update_metrics();
                    match msg {
                        Ok(inbound) => {
                            // one bad message never stops the node
                            if let Err(err) = self.node.process_message(
                                inbound.from,
                                inbound.pipeline,
                                &inbound.data,
                            ) {
                                warn!("message handler failed: {}", err);
                            }
                        }
                        Err(_) => {
                            info!("Stop node dispatch thread");
                            return;
                        }
                    }
                },
                recv(self.receiver_commands) -> msg => {
                    match msg {
                        Ok(NodeCommand::Stop) | Err(_) => {
                            info!("Stop node dispatch thread");
                            return;
                        }
                    }
                }
            }
        }
    }
}

pub(crate) fn start_dispatch_thread(
    index: usize,
    node: Arc<Node>,
    receiver: HiveReceiver<InboundMessage>,
    receiver_commands: HiveReceiver<NodeCommand>,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name(format!("node-dispatch-{}", index))
        .spawn(move || {
            let mut dispatch_thread = DispatchThread {
                node,
                receiver,
                receiver_commands,
            };
            dispatch_thread.run();
        })
        .expect("OS failed to start node dispatch thread")
}
