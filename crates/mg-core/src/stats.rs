//! `StatsTracker` — string-keyed accumulating counters with id interning.
//!
//! # Design
//!
//! Stats are written from two kinds of call sites: cold paths that hold a
//! name (`tracker.add("action.use.failed", 1.0)`) and hot paths that
//! pre-resolve a [`StatId`] once at init and then call
//! [`add_id`][StatsTracker::add_id] per tick.  Both paths write the same
//! slot: `add` interns the name and delegates to `add_id`, so the two are
//! indistinguishable in the resulting state.
//!
//! Addition is commutative and associative; no other combine operation is
//! supported.

use rustc_hash::FxHashMap;

use crate::StatId;

/// A flat table of named `f64` accumulators.
#[derive(Default, Debug, Clone)]
pub struct StatsTracker {
    names: Vec<String>,
    values: Vec<f64>,
    index: FxHashMap<String, StatId>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, returning its stable slot id.  Idempotent.
    pub fn resolve(&mut self, name: &str) -> StatId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = StatId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.values.push(0.0);
        self.index.insert(name.to_string(), id);
        id
    }

    /// Add `delta` to the stat named `name`, interning it if new.
    pub fn add(&mut self, name: &str, delta: f64) {
        let id = self.resolve(name);
        self.add_id(id, delta);
    }

    /// Add `delta` to a pre-resolved slot.  The hot-path entry point.
    #[inline]
    pub fn add_id(&mut self, id: StatId, delta: f64) {
        self.values[id.index()] += delta;
    }

    /// Overwrite a pre-resolved slot.
    #[inline]
    pub fn set_id(&mut self, id: StatId, value: f64) {
        self.values[id.index()] = value;
    }

    /// Current value of `name`, or 0.0 if never written.
    pub fn get(&self, name: &str) -> f64 {
        match self.index.get(name) {
            Some(&id) => self.values[id.index()],
            None => 0.0,
        }
    }

    /// Current value of a pre-resolved slot.
    #[inline]
    pub fn get_id(&self, id: StatId) -> f64 {
        self.values[id.index()]
    }

    /// Look up a slot id without interning.
    pub fn lookup(&self, name: &str) -> Option<StatId> {
        self.index.get(name).copied()
    }

    /// Number of interned stats.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate `(name, value)` pairs in interning order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names
            .iter()
            .zip(self.values.iter())
            .map(|(n, &v)| (n.as_str(), v))
    }

    /// Snapshot into an owned map, for the host-facing inspection API.
    pub fn to_map(&self) -> std::collections::BTreeMap<String, f64> {
        self.iter().map(|(n, v)| (n.to_string(), v)).collect()
    }

    /// Zero every slot, keeping the interned names (episode reset).
    pub fn reset_values(&mut self) {
        for v in &mut self.values {
            *v = 0.0;
        }
    }
}
