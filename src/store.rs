//! Process-wide map of per-pump classifier contexts.
//!
//! Split into lock shards keyed by a hash of the pump id, so workers
//! classifying different pumps rarely contend and a single pump is
//! always serialised behind exactly one mutex.
//!
//! ```text
//!  PumpId ──hash──▶ shard[i] ── Mutex<HashMap<PumpId, ClassifierContext>>
//! ```

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::events::PumpId;
use crate::fsm::PumpState;
use crate::fsm::context::ClassifierContext;

type Shard = HashMap<PumpId, ClassifierContext>;

pub struct ContextStore {
    shards: Vec<Mutex<Shard>>,
}

impl ContextStore {
    /// `shards` is clamped to at least one.
    pub fn new(shards: usize) -> Self {
        let shards = (0..shards.max(1)).map(|_| Mutex::new(HashMap::new())).collect();
        Self { shards }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_index(&self, pump: &PumpId) -> usize {
        let mut h = DefaultHasher::new();
        pump.hash(&mut h);
        (h.finish() % self.shards.len() as u64) as usize
    }

    fn lock(&self, pump: &PumpId) -> MutexGuard<'_, Shard> {
        // Poisoned means a worker panicked; the map itself is still usable.
        self.shards[self.shard_index(pump)]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the pump's context, creating it on first use.
    pub fn with_context<R>(&self, pump: &PumpId, f: impl FnOnce(&mut ClassifierContext) -> R) -> R {
        let mut shard = self.lock(pump);
        let ctx = shard.entry(pump.clone()).or_default();
        f(ctx)
    }

    /// Current state, or `None` for a pump never seen.
    pub fn state_of(&self, pump: &PumpId) -> Option<PumpState> {
        self.lock(pump).get(pump).map(ClassifierContext::state)
    }

    /// Copy of one pump's context.
    pub fn snapshot(&self, pump: &PumpId) -> Option<ClassifierContext> {
        self.lock(pump).get(pump).cloned()
    }

    /// Number of pumps tracked.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every tracked pump and its current state, in no particular order.
    pub fn states(&self) -> Vec<(PumpId, PumpState)> {
        let mut out = Vec::new();
        for shard in &self.shards {
            let shard = shard.lock().unwrap_or_else(PoisonError::into_inner);
            out.extend(shard.iter().map(|(id, ctx)| (id.clone(), ctx.state())));
        }
        out
    }
}
