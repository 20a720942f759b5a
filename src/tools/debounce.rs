//! Coalescing of rapid adequacy edits
//!
//! Each edit for a key waits out the quiet period; only the newest edit for that key is applied
//! (last-write-wins). Nothing is cancelled, superseded edits simply report that they lost.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;

pub struct Debouncer<K> {
    delay: Duration,
    state: Mutex<Tickets<K>>,
}

/// Newest ticket per key. Tickets come from one counter, so they are never reused.
struct Tickets<K> {
    next: u64,
    latest: HashMap<K, u64>,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Mutex::new(Tickets {
                next: 0,
                latest: HashMap::new(),
            }),
        }
    }

    /// Wait out the quiet period. Returns true if this call is still the newest for `key`.
    pub async fn settle(&self, key: K) -> bool {
        let ticket = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.next += 1;
            let ticket = state.next;
            state.latest.insert(key.clone(), ticket);
            ticket
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.latest.get(&key) == Some(&ticket) {
            state.latest.remove(&key);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_latest_edit_wins() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(40)));

        let earlier = {
            let d = Arc::clone(&debouncer);
            tokio::spawn(async move { d.settle("calorias").await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        let latest = debouncer.settle("calorias").await;

        assert!(!earlier.await.unwrap());
        assert!(latest);
        assert!(debouncer.state.lock().unwrap().latest.is_empty());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(20)));
        let d = Arc::clone(&debouncer);
        let (a, b) = tokio::join!(d.settle("calorias"), debouncer.settle("hierro"));
        assert!(a);
        assert!(b);
        assert!(debouncer.state.lock().unwrap().latest.is_empty());
    }

    #[tokio::test]
    async fn test_settled_keys_are_forgotten() {
        let debouncer = Debouncer::new(Duration::from_millis(1));
        for menu_id in 0..50 {
            assert!(debouncer.settle(menu_id).await);
        }
        assert!(debouncer.state.lock().unwrap().latest.is_empty());
        assert!(debouncer.settle(0).await);
    }

    #[tokio::test]
    async fn test_zero_delay_always_applies() {
        let debouncer = Debouncer::new(Duration::ZERO);
        assert!(debouncer.settle(1).await);
        assert!(debouncer.settle(1).await);
    }
}
