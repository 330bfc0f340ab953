use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::{channel::tick, select};
use hive_channel::receiver::HiveReceiver;
use hive_models::ResponseCode;
use tracing::{debug, info};

use crate::dispatch::NodeCommand;
use crate::messages::{HealthCheck, Message};
use crate::node::Node;

/// Periodic liveness broadcast on the node's default topic.
pub(crate) struct HealthThread {
    node: Arc<Node>,
    receiver_commands: HiveReceiver<NodeCommand>,
}

impl HealthThread {
    fn run(&mut self) {
        let ticker = tick(self.node.config.health_interval.to_duration());
        loop {
            select! {
                recv(ticker) -> _ => {
                    let message = Message::from(HealthCheck {
                        from: self.node.peer_id(),
                        code: ResponseCode::Ok,
                    });
                    if let Err(err) = self
                        .node
                        .publish(&self.node.config.default_topic, message)
                    {
                        debug!("health check publish failed: {}", err);
                    }
                },
                recv(self.receiver_commands) -> msg => {
                    match msg {
                        Ok(NodeCommand::Stop) | Err(_) => {
                            info!("Stop node health thread");
                            return;
                        }
                    }
                }
            }
        }
    }
}

pub(crate) fn start_health_thread(
    node: Arc<Node>,
    receiver_commands: HiveReceiver<NodeCommand>,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("node-health".to_string())
        .spawn(move || {
            let mut health_thread = HealthThread {
                node,
                receiver_commands,
            };
            health_thread.run();
        })
        .expect("OS failed to start node health thread")
}
