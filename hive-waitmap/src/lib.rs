//! Blocking key/value rendezvous store.
//!
//! A `WaitMap` joins asynchronous peer replies back to the synchronous
//! caller that triggered them: handlers `set` a value under a key, callers
//! block on `wait`/`wait_for` until the key resolves. The first value set
//! under a key is the one every observer sees; later writes are kept but
//! never change what `get`/`wait` return. Many simultaneous waiters on the
//! same key all receive the same value.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

struct Slot<V> {
    /// all values set under the key, in arrival order; index 0 is the
    /// resolved value
    values: Mutex<Vec<V>>,
    cond: Condvar,
}

impl<V> Slot<V> {
    fn new() -> Self {
        Self {
            values: Mutex::new(Vec::new()),
            cond: Condvar::new(),
        }
    }
}

/// Typed rendezvous store keyed by `K`.
pub struct WaitMap<K, V> {
    slots: Mutex<HashMap<K, Arc<Slot<V>>>>,
}

impl<K, V> Default for WaitMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> WaitMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// lock scope is strictly the map lookup; waiting happens on the slot
    fn slot(&self, key: &K) -> Arc<Slot<V>> {
        let mut slots = self.slots.lock();
        slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Slot::new()))
            .clone()
    }

    /// Records `value` under `key`. The first value recorded resolves the
    /// key and wakes every current waiter; later values are stored but do
    /// not change what observers see.
    pub fn set(&self, key: K, value: V) {
        let slot = self.slot(&key);
        let mut values = slot.values.lock();
        values.push(value);
        if values.len() == 1 {
            slot.cond.notify_all();
        }
    }

    /// Non-blocking read of the resolved value, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        let slot = {
            let slots = self.slots.lock();
            slots.get(key).cloned()
        };
        slot.and_then(|slot| slot.values.lock().first().cloned())
    }

    /// Blocks until `key` resolves; returns immediately if it already has.
    pub fn wait(&self, key: &K) -> V {
        let slot = self.slot(key);
        let mut values = slot.values.lock();
        while values.is_empty() {
            slot.cond.wait(&mut values);
        }
        values[0].clone()
    }

    /// As `wait`, but bounded by `timeout`. Returns `None` on timeout.
    /// A timed-out wait does not consume or corrupt the eventual value:
    /// a later `wait`/`wait_for` on the same key still succeeds.
    pub fn wait_for(&self, key: &K, timeout: Duration) -> Option<V> {
        self.wait_deadline(key, Instant::now() + timeout)
    }

    /// As `wait`, but bounded by an absolute deadline.
    pub fn wait_deadline(&self, key: &K, deadline: Instant) -> Option<V> {
        let slot = self.slot(key);
        let mut values = slot.values.lock();
        while values.is_empty() {
            if slot.cond.wait_until(&mut values, deadline).timed_out() {
                return values.first().cloned();
            }
        }
        Some(values[0].clone())
    }

    /// Drops all state held under `key`. Owned-lifecycle cleanup only:
    /// callers must guarantee no waiter still needs the key.
    pub fn delete(&self, key: &K) {
        self.slots.lock().remove(key);
    }

    /// Number of live keys, resolved or not.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_first_write_wins() {
        let map: WaitMap<&str, u32> = WaitMap::new();
        map.set("k", 1);
        map.set("k", 2);
        assert_eq!(map.get(&"k"), Some(1));
        assert_eq!(map.wait(&"k"), 1);
    }

    #[test]
    fn test_wait_before_set_observes_first_value() {
        let map: Arc<WaitMap<&str, u32>> = Arc::new(WaitMap::new());
        let waiter = {
            let map = map.clone();
            thread::spawn(move || map.wait(&"k"))
        };
        // give the waiter a chance to block first
        thread::sleep(Duration::from_millis(50));
        map.set("k", 1);
        map.set("k", 2);
        assert_eq!(waiter.join().unwrap(), 1);
    }

    #[test]
    fn test_fan_out_same_value_for_all_waiters() {
        let map: Arc<WaitMap<&str, u32>> = Arc::new(WaitMap::new());
        let waiters: Vec<_> = (0..16)
            .map(|_| {
                let map = map.clone();
                thread::spawn(move || map.wait(&"k"))
            })
            .collect();
        thread::sleep(Duration::from_millis(50));
        map.set("k", 42);
        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), 42);
        }
    }

    #[test]
    fn test_wait_for_times_out_without_consuming() {
        let map: WaitMap<&str, u32> = WaitMap::new();
        assert_eq!(map.wait_for(&"k", Duration::from_millis(50)), None);
        map.set("k", 7);
        // the timed-out subscription must not have corrupted the slot
        assert_eq!(map.wait_for(&"k", Duration::from_millis(50)), Some(7));
        assert_eq!(map.wait(&"k"), 7);
    }

    #[test]
    fn test_delete_drops_state() {
        let map: WaitMap<&str, u32> = WaitMap::new();
        map.set("k", 7);
        map.delete(&"k");
        assert!(map.is_empty());
        assert_eq!(map.get(&"k"), None);
    }
}
