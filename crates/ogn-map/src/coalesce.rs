use std::collections::BTreeMap;

/// Collapses concurrent requests for the same key into one.
///
/// The first registration for a key is the leader and should issue the
/// request; later registrations only queue their job. When the request
/// resolves, [`RequestCoalescer::take`] hands back every queued job in
/// registration order and forgets the key, so the next registration starts a
/// fresh request.
#[derive(Debug)]
pub struct RequestCoalescer<K: Ord, J> {
    pending: BTreeMap<K, Vec<J>>,
}

impl<K: Ord, J> Default for RequestCoalescer<K, J> {
    fn default() -> Self {
        Self {
            pending: BTreeMap::new(),
        }
    }
}

impl<K: Ord, J> RequestCoalescer<K, J> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `job` under `key`; returns `true` when the caller must issue the request.
    pub fn register(&mut self, key: K, job: J) -> bool {
        match self.pending.get_mut(&key) {
            Some(jobs) => {
                jobs.push(job);
                false
            }
            None => {
                self.pending.insert(key, vec![job]);
                true
            }
        }
    }

    pub fn take(&mut self, key: &K) -> Vec<J> {
        self.pending.remove(key).unwrap_or_default()
    }

    pub fn in_flight(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn waiting(&self, key: &K) -> usize {
        self.pending.get(key).map(Vec::len).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
