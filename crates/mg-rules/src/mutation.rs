//! Mutations — world-mutating procedures applied by handlers.
//!
//! Mutations never fail: an impossible mutation (missing entity, empty
//! source) simply does not apply, and the rest of the chain continues.
//! Object destruction is deferred through `World::pending_destruction` so a
//! mutation chain never invalidates ids mid-flight; the orchestrator drains
//! the queue (and tears down AOE sources) between phases.

use mg_core::{CollectiveId, ObjectId, QueryId, ResourceId, TagId};

use crate::{
    ctx::EntityRef,
    handler::fire_tag_hooks,
    query,
    value::{GameValue, StatScope},
    HandlerCtx,
};

// ── Attack ────────────────────────────────────────────────────────────────────

/// Parameters of the combat resolution mutation.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackMutation {
    /// Consumed from the actor, one unit per attack.
    pub weapon: ResourceId,
    /// Absorbs damage point-for-point before health is touched.
    pub armor: ResourceId,
    /// Depleted by unabsorbed damage, floored at zero.
    pub health: ResourceId,
    /// Probability of the attack landing, in percent.  Exactly one RNG draw
    /// per attack regardless of value.
    pub hit_chance_pct: u32,
    /// Damage dealt on a hit: `damage_multiplier_pct / 100` points.
    pub damage_multiplier_pct: u32,
    /// `(resource, max_units)` moved from target to actor on a hit, clamped
    /// by availability and the actor's capacity.
    pub loot: Vec<(ResourceId, u32)>,
    /// Freeze the target for this many steps on a hit.
    pub freeze_duration: Option<u64>,
}

// ── ValueTarget ───────────────────────────────────────────────────────────────

/// A settable slot for [`Mutation::GameValueMutation`].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueTarget {
    Inventory {
        entity: EntityRef,
        resource: ResourceId,
    },
    Stat {
        scope: StatScope,
        entity: EntityRef,
        key: String,
    },
    Vibe {
        entity: EntityRef,
    },
}

// ── Mutation ──────────────────────────────────────────────────────────────────

/// The mutation sum type, applied in config order by a handler.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mutation {
    /// Add `delta` to an entity's inventory, clamped to `[0, cap]`.
    ///
    /// Under an active deferral (AOE tick path) deltas aimed at the deferral
    /// target accumulate and settle net-once.
    ResourceDelta {
        entity: EntityRef,
        resource: ResourceId,
        delta: i64,
    },

    /// Move up to `amount` units (`amount < 0` ⇒ entire balance) from one
    /// entity to the other; optionally queue the source for destruction
    /// once its inventory empties.
    ResourceTransfer {
        from: EntityRef,
        to: EntityRef,
        resource: ResourceId,
        amount: i64,
        delete_source_when_empty: bool,
    },

    /// Re-align the target: to the actor's collective, to none, or to an
    /// explicit collective.
    Alignment(AlignmentTarget),

    /// `target.frozen_until_step = current_step + duration`.
    Freeze { duration: u64 },

    /// Zero the listed resources (or all of them) on an entity.
    ClearInventory {
        entity: EntityRef,
        resources: Option<Vec<ResourceId>>,
    },

    Attack(AttackMutation),

    /// Add `delta` to a named stat in the selected scope.
    Stats {
        scope: StatScope,
        entity: EntityRef,
        key: String,
        delta: f64,
    },

    /// Add a tag, firing on-tag-add hooks unless suppressed.
    AddTag { entity: EntityRef, tag: TagId },

    /// Remove a tag, firing on-tag-remove hooks unless suppressed.
    RemoveTag { entity: EntityRef, tag: TagId },

    /// Remove every tag from the (config-expanded) prefix set.
    RemoveTagsWithPrefix {
        entity: EntityRef,
        tags: Vec<TagId>,
    },

    /// Overwrite a slot with a resolved game value.
    GameValueMutation {
        target: ValueTarget,
        source: GameValue,
    },

    /// Mark a materialised query's cache dirty.
    RecomputeMaterializedQuery(QueryId),

    /// Apply `(resource, delta)` pairs to every object a query returns;
    /// positive totals are optionally paid for by `source`.
    QueryInventory {
        query: QueryId,
        deltas: Vec<(ResourceId, i64)>,
        source: Option<EntityRef>,
    },
}

/// Target collective selection for [`Mutation::Alignment`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlignmentTarget {
    ActorCollective,
    None,
    Explicit(CollectiveId),
}

/// Apply a chain in config order.
pub fn apply_all(mutations: &[Mutation], ctx: &mut HandlerCtx<'_>) {
    for m in mutations {
        m.apply(ctx);
    }
}

impl Mutation {
    pub fn apply(&self, ctx: &mut HandlerCtx<'_>) {
        match self {
            Mutation::ResourceDelta {
                entity,
                resource,
                delta,
            } => {
                let id = entity.resolve(ctx);
                if let Some(d) = ctx.deferred.as_deref_mut() {
                    if d.target() == id {
                        d.add(*resource, *delta);
                        return;
                    }
                }
                if let Some(obj) = ctx.world.grid.get_mut(id) {
                    obj.inventory.apply_delta(*resource, *delta);
                }
            }

            Mutation::ResourceTransfer {
                from,
                to,
                resource,
                amount,
                delete_source_when_empty,
            } => apply_transfer(
                ctx,
                from.resolve(ctx),
                to.resolve(ctx),
                *resource,
                *amount,
                *delete_source_when_empty,
            ),

            Mutation::Alignment(mode) => {
                let new = match mode {
                    AlignmentTarget::ActorCollective => match ctx.world.grid.get(ctx.actor) {
                        Some(a) => a.collective,
                        None => return,
                    },
                    AlignmentTarget::None => CollectiveId::INVALID,
                    AlignmentTarget::Explicit(c) => *c,
                };
                if let Some(t) = ctx.world.grid.get_mut(ctx.target) {
                    t.collective = new;
                }
            }

            Mutation::Freeze { duration } => {
                let until = ctx.world.current_step + duration;
                if let Some(t) = ctx.world.grid.get_mut(ctx.target) {
                    if let Some(agent) = t.agent.as_mut() {
                        agent.frozen_until_step = until;
                    }
                }
            }

            Mutation::ClearInventory { entity, resources } => {
                if let Some(obj) = ctx.world.grid.get_mut(entity.resolve(ctx)) {
                    match resources {
                        Some(list) => {
                            for &r in list {
                                obj.inventory.clear(r);
                            }
                        }
                        None => obj.inventory.clear_all(),
                    }
                }
            }

            Mutation::Attack(attack) => apply_attack(attack, ctx),

            Mutation::Stats {
                scope,
                entity,
                key,
                delta,
            } => apply_stat(ctx, *scope, *entity, key, *delta),

            Mutation::AddTag { entity, tag } => {
                let id = entity.resolve(ctx);
                if ctx.world.grid.get(id).is_some() && ctx.world.add_tag(id, *tag) {
                    if !ctx.skip_on_update_trigger {
                        fire_tag_hooks(ctx, id, *tag, true);
                    }
                }
            }

            Mutation::RemoveTag { entity, tag } => {
                let id = entity.resolve(ctx);
                if ctx.world.grid.get(id).is_some() && ctx.world.remove_tag(id, *tag) {
                    if !ctx.skip_on_update_trigger {
                        fire_tag_hooks(ctx, id, *tag, false);
                    }
                }
            }

            Mutation::RemoveTagsWithPrefix { entity, tags } => {
                let id = entity.resolve(ctx);
                if ctx.world.grid.get(id).is_none() {
                    return;
                }
                for &tag in tags {
                    if ctx.world.remove_tag(id, tag) && !ctx.skip_on_update_trigger {
                        fire_tag_hooks(ctx, id, tag, false);
                    }
                }
            }

            Mutation::GameValueMutation { target, source } => {
                let v = source.resolve(ctx);
                apply_value_target(ctx, target, v);
            }

            Mutation::RecomputeMaterializedQuery(q) => {
                ctx.world.query_caches.mark_dirty(*q);
            }

            Mutation::QueryInventory {
                query,
                deltas,
                source,
            } => apply_query_inventory(ctx, *query, deltas, *source),
        }
    }
}

// ── Variant bodies ────────────────────────────────────────────────────────────

fn apply_transfer(
    ctx: &mut HandlerCtx<'_>,
    from: ObjectId,
    to: ObjectId,
    resource: ResourceId,
    amount: i64,
    delete_source_when_empty: bool,
) {
    let Some((src, dst)) = ctx.world.grid.pair_mut(from, to) else {
        return;
    };
    let available = src.inventory.amount(resource) as i64;
    let want = if amount < 0 {
        available
    } else {
        amount.min(available)
    };
    if want > 0 {
        // Destination capacity bounds the move; the source gives up exactly
        // what the destination accepted.
        let moved = dst.inventory.apply_delta(resource, want);
        src.inventory.apply_delta(resource, -moved);
    }
    let delete = delete_source_when_empty && src.inventory.is_empty() && !src.is_agent();
    if delete {
        ctx.world.pending_destruction.push(from);
    }
}

fn apply_attack(attack: &AttackMutation, ctx: &mut HandlerCtx<'_>) {
    // One RNG draw per attack, hit or miss, so the stream stays aligned.
    let hit = ctx.world.rng.roll_pct(attack.hit_chance_pct);

    let Some((actor, target)) = ctx.world.grid.pair_mut(ctx.actor, ctx.target) else {
        return;
    };
    if actor.inventory.amount(attack.weapon) == 0 {
        return;
    }
    actor.inventory.apply_delta(attack.weapon, -1);
    if !hit {
        return;
    }

    let damage = (attack.damage_multiplier_pct / 100) as i64;
    if damage > 0 {
        let absorbed = -target.inventory.apply_delta(attack.armor, -damage);
        let remaining = damage - absorbed;
        if remaining > 0 {
            target.inventory.apply_delta(attack.health, -remaining);
        }
    }

    for &(resource, max_units) in &attack.loot {
        let take = (target.inventory.amount(resource) as i64).min(max_units as i64);
        if take > 0 {
            let moved = actor.inventory.apply_delta(resource, take);
            target.inventory.apply_delta(resource, -moved);
        }
    }

    if let Some(duration) = attack.freeze_duration {
        let until = ctx.world.current_step + duration;
        if let Some(agent) = ctx.world.grid[ctx.target].agent.as_mut() {
            agent.frozen_until_step = until;
        }
    }
}

fn apply_stat(ctx: &mut HandlerCtx<'_>, scope: StatScope, entity: EntityRef, key: &str, delta: f64) {
    match scope {
        StatScope::Game => ctx.world.stats.add(key, delta),
        StatScope::Agent => {
            let Some(obj) = ctx.world.grid.get(entity.resolve(ctx)) else {
                return;
            };
            if let Some(a) = obj.agent_id() {
                ctx.world.agent_stats[a.index()].add(key, delta);
            }
        }
        StatScope::Collective => {
            let Some(obj) = ctx.world.grid.get(entity.resolve(ctx)) else {
                return;
            };
            if obj.collective != CollectiveId::INVALID {
                let cid = obj.collective;
                ctx.world.collectives[cid.index()].stats.add(key, delta);
            }
        }
    }
}

fn apply_value_target(ctx: &mut HandlerCtx<'_>, target: &ValueTarget, value: f64) {
    match target {
        ValueTarget::Inventory { entity, resource } => {
            if let Some(obj) = ctx.world.grid.get_mut(entity.resolve(ctx)) {
                obj.inventory.set(*resource, value.max(0.0) as u32);
            }
        }
        ValueTarget::Stat { scope, entity, key } => {
            let current = crate::value::GameValue::Stat {
                scope: *scope,
                entity: *entity,
                key: key.clone(),
                delta: false,
            }
            .resolve(ctx);
            apply_stat(ctx, *scope, *entity, key, value - current);
        }
        ValueTarget::Vibe { entity } => {
            if let Some(obj) = ctx.world.grid.get_mut(entity.resolve(ctx)) {
                obj.vibe = value.clamp(0.0, u8::MAX as f64) as u8;
            }
        }
    }
}

fn apply_query_inventory(
    ctx: &mut HandlerCtx<'_>,
    q: QueryId,
    deltas: &[(ResourceId, i64)],
    source: Option<EntityRef>,
) {
    let mut buf = ctx.world.scratch.take();
    query::evaluate_query_into(q, ctx, &mut buf);

    let mut paid: i64 = 0;
    for &id in &buf {
        let deferral_hit = ctx
            .deferred
            .as_deref()
            .is_some_and(|d| d.target() == id);
        for &(resource, delta) in deltas {
            if deferral_hit {
                if let Some(d) = ctx.deferred.as_deref_mut() {
                    d.add(resource, delta);
                }
                continue;
            }
            if let Some(obj) = ctx.world.grid.get_mut(id) {
                let applied = obj.inventory.apply_delta(resource, delta);
                if applied > 0 {
                    paid += applied;
                }
            }
        }
    }
    ctx.world.scratch.put(buf);

    if paid > 0 {
        if let Some(src) = source {
            // Spend across the same resources in listed order until the
            // granted total is covered.
            let id = src.resolve(ctx);
            if let Some(obj) = ctx.world.grid.get_mut(id) {
                let mut remaining = paid;
                for &(resource, _) in deltas {
                    if remaining == 0 {
                        break;
                    }
                    remaining += obj.inventory.apply_delta(resource, -remaining);
                }
            }
        }
    }
}
