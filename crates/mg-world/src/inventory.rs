//! Per-object resource counts with shared capacity tables.
//!
//! # Design
//!
//! Amounts are a dense `Vec<u32>` indexed by `ResourceId` — resource kinds
//! are few (single digits in practice), so dense beats a map on both memory
//! and iteration.  Capacities are shared via `Arc<InventoryLimits>`: every
//! object built from the same config holds the same table, so per-object
//! cost is one pointer.
//!
//! All writes clamp: amounts never leave `[0, cap]`, and every mutator
//! reports the delta it *actually* applied so callers (stats, transfers,
//! deferred-delta settlement) can account precisely.

use std::sync::Arc;

use mg_core::ResourceId;

// ── InventoryLimits ───────────────────────────────────────────────────────────

/// Per-resource capacity table, shared across all objects of one config.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InventoryLimits {
    caps: Vec<u32>,
}

impl InventoryLimits {
    /// Explicit per-resource caps; `caps.len()` must equal the environment's
    /// resource count.
    pub fn new(caps: Vec<u32>) -> Self {
        Self { caps }
    }

    /// Unlimited storage for `num_resources` kinds (collectives, tests).
    pub fn unlimited(num_resources: usize) -> Self {
        Self {
            caps: vec![u32::MAX; num_resources],
        }
    }

    /// A uniform cap across all resources.
    pub fn uniform(num_resources: usize, cap: u32) -> Self {
        Self {
            caps: vec![cap; num_resources],
        }
    }

    #[inline]
    pub fn cap(&self, resource: ResourceId) -> u32 {
        self.caps[resource.index()]
    }

    pub fn num_resources(&self) -> usize {
        self.caps.len()
    }
}

// ── Inventory ─────────────────────────────────────────────────────────────────

/// A capped multiset of resources.
#[derive(Debug, Clone)]
pub struct Inventory {
    amounts: Vec<u32>,
    limits: Arc<InventoryLimits>,
}

impl Inventory {
    /// An empty inventory governed by `limits`.
    pub fn new(limits: Arc<InventoryLimits>) -> Self {
        Self {
            amounts: vec![0; limits.num_resources()],
            limits,
        }
    }

    #[inline]
    pub fn amount(&self, resource: ResourceId) -> u32 {
        self.amounts[resource.index()]
    }

    #[inline]
    pub fn cap(&self, resource: ResourceId) -> u32 {
        self.limits.cap(resource)
    }

    pub fn num_resources(&self) -> usize {
        self.amounts.len()
    }

    /// Add `delta` (signed), clamping to `[0, cap]`.
    ///
    /// Returns the delta actually applied — e.g. adding 5 to an inventory at
    /// 8/10 returns 2; removing 7 from 3 returns -3.
    pub fn apply_delta(&mut self, resource: ResourceId, delta: i64) -> i64 {
        let cur = self.amounts[resource.index()] as i64;
        let cap = self.limits.cap(resource) as i64;
        let new = (cur + delta).clamp(0, cap);
        self.amounts[resource.index()] = new as u32;
        new - cur
    }

    /// Overwrite an amount, clamped to the cap.
    pub fn set(&mut self, resource: ResourceId, amount: u32) {
        let cap = self.limits.cap(resource);
        self.amounts[resource.index()] = amount.min(cap);
    }

    /// Zero one resource, returning the amount removed.
    pub fn clear(&mut self, resource: ResourceId) -> u32 {
        std::mem::take(&mut self.amounts[resource.index()])
    }

    /// Zero every resource.
    pub fn clear_all(&mut self) {
        self.amounts.fill(0);
    }

    /// `true` once every resource is zero.
    pub fn is_empty(&self) -> bool {
        self.amounts.iter().all(|&a| a == 0)
    }

    /// Iterate `(resource, amount)` for all nonzero resources, ascending id.
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (ResourceId, u32)> + '_ {
        self.amounts
            .iter()
            .enumerate()
            .filter(|&(_, &a)| a > 0)
            .map(|(i, &a)| (ResourceId(i as u16), a))
    }
}
