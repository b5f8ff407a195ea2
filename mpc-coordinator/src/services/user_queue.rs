//! Single-writer admission control for the coordination cluster.
//!
//! At most one session progresses at a time; the current head of the queue is the only
//! caller whose `computation_key` validates. Entries live in a contiguous [`VecDeque`]
//! rather than a linked list, with a `HashMap` mirroring each key's index so
//! `get_position` is O(1) instead of a scan; popping the head re-indexes the map.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use mpc_types::queue::{AccessKey, AddUserResult, ComputationKey};
use rand::RngCore as _;

/// One entry in the queue.
struct QueueEntry {
    access_key: AccessKey,
    /// `Some` only for the current head, between promotion and eviction/pop.
    head_state: Option<HeadState>,
}

struct HeadState {
    computation_key: ComputationKey,
    time_at_head: Instant,
}

/// Single-writer, FIFO admission queue bounded by `max_size`.
///
/// Every public method takes `&mut self`; the caller (the coordinator's shared
/// `Arc<Mutex<UserQueue>>`) is responsible for serializing access. This matches the
/// component's concurrency model: almost every read can also evict a stalled head on
/// timeout, so a true reader/writer split buys little over a single lock.
pub struct UserQueue {
    entries: VecDeque<QueueEntry>,
    positions: HashMap<AccessKey, usize>,
    max_size: usize,
    head_timeout: Duration,
}

impl UserQueue {
    /// Builds an empty queue bounded by `max_size` entries, evicting a stuck head after
    /// `head_timeout` has elapsed since its promotion.
    pub fn new(max_size: usize, head_timeout: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            positions: HashMap::new(),
            max_size,
            head_timeout,
        }
    }

    /// Appends `access_key` to the tail. Promotes it to head if the queue was empty.
    pub fn add_user(&mut self, access_key: AccessKey) -> AddUserResult {
        self.evict_stale_head();
        if self.positions.contains_key(&access_key) {
            return AddUserResult::AlreadyInQueue;
        }
        if self.entries.len() >= self.max_size {
            return AddUserResult::QueueIsFull;
        }
        self.positions.insert(access_key.clone(), self.entries.len());
        self.entries.push_back(QueueEntry {
            access_key,
            head_state: None,
        });
        self.promote_head_if_needed();
        AddUserResult::Succeeded
    }

    /// Inserts `access_key` immediately behind the current head, preserving head
    /// identity and its already-issued `computation_key`. Identical to [`Self::add_user`]
    /// when the queue is empty.
    pub fn add_priority_user(&mut self, access_key: AccessKey) -> AddUserResult {
        self.evict_stale_head();
        if self.positions.contains_key(&access_key) {
            return AddUserResult::AlreadyInQueue;
        }
        if self.entries.len() >= self.max_size {
            return AddUserResult::QueueIsFull;
        }
        if self.entries.is_empty() {
            return self.add_user(access_key);
        }
        self.entries.insert(
            1,
            QueueEntry {
                access_key: access_key.clone(),
                head_state: None,
            },
        );
        self.reindex();
        AddUserResult::Succeeded
    }

    /// Returns the 0-based distance from head, or `None` if `access_key` is absent.
    pub fn get_position(&mut self, access_key: &AccessKey) -> Option<usize> {
        self.evict_stale_head();
        self.positions.get(access_key).copied()
    }

    /// Returns the head's `computation_key` iff `access_key` is the current head.
    pub fn get_computation_key(&mut self, access_key: &AccessKey) -> Option<ComputationKey> {
        self.evict_stale_head();
        let head = self.entries.front()?;
        if &head.access_key != access_key {
            return None;
        }
        head.head_state
            .as_ref()
            .map(|state| state.computation_key.clone())
    }

    /// True iff `access_key` is currently head and `computation_key` matches the token
    /// issued on its promotion.
    pub fn validate_computation_key(
        &mut self,
        access_key: &AccessKey,
        computation_key: &ComputationKey,
    ) -> bool {
        self.evict_stale_head();
        match self.entries.front() {
            Some(head) if &head.access_key == access_key => head
                .head_state
                .as_ref()
                .is_some_and(|state| &state.computation_key == computation_key),
            _ => false,
        }
    }

    /// Pops the head and promotes the next entry if `access_key`/`computation_key`
    /// validate. Idempotent: returns `false` if the head was already popped (or never
    /// was this caller).
    pub fn finish_computation(
        &mut self,
        access_key: &AccessKey,
        computation_key: &ComputationKey,
    ) -> bool {
        self.evict_stale_head();
        if !self.validate_computation_key(access_key, computation_key) {
            return false;
        }
        self.pop_head();
        true
    }

    fn pop_head(&mut self) {
        if let Some(entry) = self.entries.pop_front() {
            self.positions.remove(&entry.access_key);
        }
        self.reindex();
        self.promote_head_if_needed();
    }

    fn reindex(&mut self) {
        self.positions.clear();
        for (index, entry) in self.entries.iter().enumerate() {
            self.positions.insert(entry.access_key.clone(), index);
        }
    }

    fn promote_head_if_needed(&mut self) {
        if let Some(head) = self.entries.front_mut() {
            if head.head_state.is_none() {
                let mut key_bytes = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut key_bytes);
                head.head_state = Some(HeadState {
                    computation_key: ComputationKey(hex::encode(key_bytes)),
                    time_at_head: Instant::now(),
                });
            }
        }
    }

    /// Evicts the head without re-queueing it if it has held the token past
    /// `head_timeout`, then promotes whatever is now at the front.
    ///
    /// `time == timeout` does not evict; only strictly greater elapsed time does.
    fn evict_stale_head(&mut self) {
        let is_stale = self
            .entries
            .front()
            .and_then(|head| head.head_state.as_ref())
            .is_some_and(|state| state.time_at_head.elapsed() > self.head_timeout);
        if is_stale {
            self.pop_head();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> AccessKey {
        AccessKey(s.to_string())
    }

    #[test]
    fn empty_queue_admission() {
        let mut queue = UserQueue::new(10, Duration::from_secs(60));
        assert_eq!(queue.add_user(key("a")), AddUserResult::Succeeded);
        assert_eq!(queue.get_position(&key("a")), Some(0));
        let k = queue.get_computation_key(&key("a")).unwrap();
        assert!(queue.validate_computation_key(&key("a"), &k));
        assert!(queue.finish_computation(&key("a"), &k));
        assert_eq!(queue.get_position(&key("a")), None);
    }

    #[test]
    fn priority_insertion_preserves_head() {
        let mut queue = UserQueue::new(10, Duration::from_secs(60));
        queue.add_user(key("a"));
        let head_key = queue.get_computation_key(&key("a")).unwrap();
        queue.add_user(key("b"));
        queue.add_priority_user(key("c"));

        assert_eq!(queue.get_position(&key("a")), Some(0));
        assert_eq!(queue.get_position(&key("c")), Some(1));
        assert_eq!(queue.get_position(&key("b")), Some(2));
        assert_eq!(queue.get_computation_key(&key("a")), Some(head_key));
    }

    #[test]
    fn head_timeout_evicts_and_repromotes() {
        let mut queue = UserQueue::new(10, Duration::from_millis(1));
        queue.add_user(key("a"));
        queue.add_user(key("b"));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(queue.get_position(&key("a")), None);
        assert_eq!(queue.get_position(&key("b")), Some(0));
        assert!(queue.get_computation_key(&key("b")).is_some());
    }

    #[test]
    fn head_timeout_boundary_does_not_evict() {
        let mut queue = UserQueue::new(10, Duration::from_secs(3600));
        queue.add_user(key("a"));
        assert_eq!(queue.get_position(&key("a")), Some(0));
    }

    #[test]
    fn finish_computation_is_idempotent() {
        let mut queue = UserQueue::new(10, Duration::from_secs(60));
        queue.add_user(key("a"));
        let k = queue.get_computation_key(&key("a")).unwrap();
        assert!(queue.finish_computation(&key("a"), &k));
        assert!(!queue.finish_computation(&key("a"), &k));
    }

    #[test]
    fn max_size_rejects_both_insertion_modes() {
        let mut queue = UserQueue::new(1, Duration::from_secs(60));
        assert_eq!(queue.add_user(key("a")), AddUserResult::Succeeded);
        assert_eq!(queue.add_user(key("b")), AddUserResult::QueueIsFull);
        assert_eq!(
            queue.add_priority_user(key("c")),
            AddUserResult::QueueIsFull
        );
    }

    #[test]
    fn duplicate_access_key_rejected() {
        let mut queue = UserQueue::new(10, Duration::from_secs(60));
        queue.add_user(key("a"));
        assert_eq!(queue.add_user(key("a")), AddUserResult::AlreadyInQueue);
    }

    #[test]
    fn add_priority_user_on_empty_queue_behaves_like_add_user() {
        let mut queue = UserQueue::new(10, Duration::from_secs(60));
        assert_eq!(queue.add_priority_user(key("a")), AddUserResult::Succeeded);
        assert_eq!(queue.get_position(&key("a")), Some(0));
        assert!(queue.get_computation_key(&key("a")).is_some());
    }

    #[test]
    fn replaying_an_old_computation_key_after_finish_is_invalid() {
        let mut queue = UserQueue::new(10, Duration::from_secs(60));
        queue.add_user(key("a"));
        queue.add_user(key("b"));
        let old_key = queue.get_computation_key(&key("a")).unwrap();
        assert!(queue.finish_computation(&key("a"), &old_key));
        assert!(!queue.validate_computation_key(&key("b"), &old_key));
    }
}
