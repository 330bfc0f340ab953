use std::sync::Arc;

use receiver::HiveReceiver;
use sender::HiveSender;

pub mod receiver;
pub mod sender;

#[derive(Clone)]
pub struct HiveChannel {}

impl HiveChannel {
    #[allow(clippy::new_ret_no_self)]
    pub fn new<T>(name: String, capacity: Option<usize>) -> (HiveSender<T>, HiveReceiver<T>) {
        use prometheus::{Counter, Gauge};
        use tracing::error;

        let (s, r) = if let Some(capacity) = capacity {
            crossbeam::channel::bounded::<T>(capacity)
        } else {
            crossbeam::channel::unbounded::<T>()
        };

        // Gauge tracks the number of messages currently queued,
        // counter the total received since creation.
        let actual_len = Gauge::new(
            format!("{}_channel_actual_size", name),
            "Actual length of channel",
        )
        .expect("Failed to create gauge");

        let received = Counter::new(
            format!("{}_channel_total_receive", name),
            "Total received messages",
        )
        .expect("Failed to create counter");

        // error here if metrics already registered (ex : two channels sharing a name)
        if let Err(e) = prometheus::register(Box::new(actual_len.clone())) {
            error!("Failed to register actual_len gauge for {} : {}", name, e);
        }

        if let Err(e) = prometheus::register(Box::new(received.clone())) {
            error!("Failed to register received counter for {} : {}", name, e);
        }

        let sender = HiveSender {
            sender: s,
            name: name.clone(),
            actual_len: actual_len.clone(),
        };

        let receiver = HiveReceiver {
            receiver: r,
            name,
            actual_len,
            received,
            ref_counter: Arc::new(()),
        };

        (sender, receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_recv_roundtrip() {
        let (tx, rx) = HiveChannel::new::<u32>("test_roundtrip".into(), Some(4));
        tx.send(7).unwrap();
        tx.try_send(8).unwrap();
        assert_eq!(rx.recv().unwrap(), 7);
        assert_eq!(rx.try_recv().unwrap(), 8);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_disconnect_reported() {
        let (tx, rx) = HiveChannel::new::<u32>("test_disconnect".into(), None);
        drop(tx);
        assert!(rx.recv().is_err());
    }
}
