use std::thread::JoinHandle;

use hive_channel::sender::HiveSender;
use tracing::info;

use crate::dispatch::NodeCommand;

/// node manager used to stop the node's lifecycle threads
pub struct NodeManager {
    dispatch_threads: Option<(HiveSender<NodeCommand>, Vec<JoinHandle<()>>)>,
    health_thread: Option<(HiveSender<NodeCommand>, JoinHandle<()>)>,
}

impl NodeManager {
    pub(crate) fn new(
        dispatch_threads: (HiveSender<NodeCommand>, Vec<JoinHandle<()>>),
        health_thread: (HiveSender<NodeCommand>, JoinHandle<()>),
    ) -> Self {
        Self {
            dispatch_threads: Some(dispatch_threads),
            health_thread: Some(health_thread),
        }
    }

    /// Stop the node module
    pub fn stop(&mut self) {
        info!("stopping node module...");
        if let Some((tx, join_handles)) = self.dispatch_threads.take() {
            for _ in &join_handles {
                let _ = tx.send(NodeCommand::Stop);
            }
            drop(tx);
            for join_handle in join_handles {
                join_handle
                    .join()
                    .expect("dispatch thread panicked on try to join");
            }
        }
        if let Some((tx, join_handle)) = self.health_thread.take() {
            let _ = tx.send(NodeCommand::Stop);
            drop(tx);
            join_handle
                .join()
                .expect("health thread panicked on try to join");
        }
    }
}
