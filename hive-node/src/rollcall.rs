use std::collections::HashMap;

use hive_channel::{receiver::HiveReceiver, sender::HiveSender, HiveChannel};
use hive_logging::hive_trace;
use hive_models::RequestId;
use parking_lot::RwLock;
use tracing::debug;

use crate::messages::RollCallResponse;

/// Per-request mailbox for roll-call replies.
///
/// A mailbox exists from `create` until `remove`; replies delivered
/// outside that window are dropped, not errors: a worker may answer a
/// roll call whose auction already closed.
pub(crate) struct RollCallQueue {
    queues: RwLock<HashMap<RequestId, HiveSender<RollCallResponse>>>,
    capacity: usize,
}

impl RollCallQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Opens the mailbox for `request_id` and hands back its consuming
    /// end. A second `create` for a live request replaces the mailbox,
    /// orphaning the previous receiver.
    pub(crate) fn create(&self, request_id: RequestId) -> HiveReceiver<RollCallResponse> {
        let (sender, receiver) = HiveChannel::new(
            format!("rollcall_{}", request_id),
            Some(self.capacity),
        );
        self.queues.write().insert(request_id, sender);
        receiver
    }

    /// Drops the mailbox; safe to call on an already-removed id.
    pub(crate) fn remove(&self, request_id: &RequestId) {
        self.queues.write().remove(request_id);
    }

    /// Routes one reply into its mailbox, if the auction is still open.
    pub(crate) fn deliver(&self, response: RollCallResponse) {
        let sender = {
            let queues = self.queues.read();
            queues.get(&response.request_id).cloned()
        };
        match sender {
            Some(sender) => {
                if let Err(err) = sender.try_send(response) {
                    debug!("roll call mailbox full, dropping response: {}", err);
                }
            }
            None => {
                hive_trace!("rollcall.queue.drop_unsolicited", {
                    "request_id": response.request_id.to_string(),
                    "from": response.from.to_string()
                });
            }
        }
    }

    /// Number of open mailboxes; every live one belongs to an in-flight
    /// roll call.
    pub(crate) fn len(&self) -> usize {
        self.queues.read().len()
    }
}

/// Removes the mailbox on every exit path of a roll call.
pub(crate) struct MailboxGuard<'a> {
    queue: &'a RollCallQueue,
    request_id: RequestId,
}

impl<'a> MailboxGuard<'a> {
    pub(crate) fn new(queue: &'a RollCallQueue, request_id: RequestId) -> Self {
        Self { queue, request_id }
    }
}

impl Drop for MailboxGuard<'_> {
    fn drop(&mut self) {
        self.queue.remove(&self.request_id);
    }
}
