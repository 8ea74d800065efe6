//! `HandlerCtx` — the evaluation context threaded through every filter,
//! mutation, and query.

use rustc_hash::FxHashMap;

use mg_core::{ObjectId, ResourceId};
use mg_world::World;

use crate::Rules;

// ── EntityRef ─────────────────────────────────────────────────────────────────

/// Which of the two context entities a filter or mutation examines.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityRef {
    Actor,
    Target,
}

impl EntityRef {
    /// The referenced object id (may be `ObjectId::INVALID`, e.g. an
    /// actor-less event context).
    #[inline]
    pub fn resolve(self, ctx: &HandlerCtx<'_>) -> ObjectId {
        match self {
            EntityRef::Actor => ctx.actor,
            EntityRef::Target => ctx.target,
        }
    }
}

// ── DeferredDeltas ────────────────────────────────────────────────────────────

/// Insertion-ordered accumulation of `ResourceDelta`s against one target.
///
/// The AOE tracker routes every resource delta aimed at the agent being
/// processed through this map and settles the *net* per resource in one
/// clamped write at the end — two +3 heals against a cap never clamp twice.
#[derive(Default)]
pub struct DeferredDeltas {
    target: ObjectId,
    entries: Vec<(ResourceId, i64)>,
    index: FxHashMap<ResourceId, usize>,
}

impl DeferredDeltas {
    pub fn new() -> Self {
        Self {
            target: ObjectId::INVALID,
            ..Self::default()
        }
    }

    /// Reset for a new target, keeping allocations.
    pub fn begin(&mut self, target: ObjectId) {
        self.target = target;
        self.entries.clear();
        self.index.clear();
    }

    #[inline]
    pub fn target(&self) -> ObjectId {
        self.target
    }

    /// Accumulate `delta`; resources keep first-seen order.
    pub fn add(&mut self, resource: ResourceId, delta: i64) {
        match self.index.get(&resource) {
            Some(&i) => self.entries[i].1 += delta,
            None => {
                self.index.insert(resource, self.entries.len());
                self.entries.push((resource, delta));
            }
        }
    }

    /// Apply every net delta to the target, clamping once per resource.
    /// Leaves the map empty (and the target unset).
    pub fn settle(&mut self, world: &mut World) {
        if self.target != ObjectId::INVALID {
            if let Some(obj) = world.grid.get_mut(self.target) {
                for &(resource, delta) in &self.entries {
                    if delta != 0 {
                        obj.inventory.apply_delta(resource, delta);
                    }
                }
            }
        }
        self.target = ObjectId::INVALID;
        self.entries.clear();
        self.index.clear();
    }
}

// ── HandlerCtx ────────────────────────────────────────────────────────────────

/// Everything a filter or mutation may touch while evaluating.
///
/// Filters are pure by contract: they read through `world` and may refresh
/// query caches, but must leave observable state unchanged.  Mutations own
/// the write path.
pub struct HandlerCtx<'w> {
    pub world: &'w mut World,
    pub rules: &'w Rules,

    /// The initiating entity (`ObjectId::INVALID` for actor-less contexts
    /// such as scheduled events).
    pub actor: ObjectId,

    /// The entity being examined/affected.
    pub target: ObjectId,

    /// Suppress on-tag-add/remove hook cascades (used during teardown and
    /// bulk mutations that must not re-trigger).
    pub skip_on_update_trigger: bool,

    /// When set, `ResourceDelta`s whose entity resolves to the deferral
    /// target accumulate here instead of applying immediately.
    pub deferred: Option<&'w mut DeferredDeltas>,
}

impl<'w> HandlerCtx<'w> {
    /// A plain context with no actor and no deferral.
    pub fn of(world: &'w mut World, rules: &'w Rules, target: ObjectId) -> Self {
        Self {
            world,
            rules,
            actor: ObjectId::INVALID,
            target,
            skip_on_update_trigger: false,
            deferred: None,
        }
    }

    /// An actor → target context.
    pub fn between(
        world: &'w mut World,
        rules: &'w Rules,
        actor: ObjectId,
        target: ObjectId,
    ) -> Self {
        Self {
            actor,
            ..Self::of(world, rules, target)
        }
    }

    /// Re-borrow as a sub-context with different endpoints.
    ///
    /// Used by `Near`, closure edges, and tag-hook cascades.  The sub-context
    /// never inherits deferral: cascaded writes land directly.
    pub fn sub(&mut self, actor: ObjectId, target: ObjectId) -> HandlerCtx<'_> {
        HandlerCtx {
            world: &mut *self.world,
            rules: self.rules,
            actor,
            target,
            skip_on_update_trigger: self.skip_on_update_trigger,
            deferred: None,
        }
    }
}
