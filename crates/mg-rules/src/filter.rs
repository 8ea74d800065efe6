//! Filters — pure predicates over `(actor, target, world)`.
//!
//! A filter never mutates observable state and never fails: predicates over
//! missing entities simply don't pass.  Scratch buffers come from the
//! world's pool so steady-state evaluation is allocation-free.

use mg_core::{CollectiveId, QueryId, ResourceId, TagId};

use crate::{ctx::EntityRef, query, GameValue, HandlerCtx};

// ── AlignmentKind ─────────────────────────────────────────────────────────────

/// Relationship between the actor's and target's collectives.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlignmentKind {
    /// Target belongs to the actor's (valid) collective.
    Aligned,
    /// Target belongs to no collective at all.
    Unaligned,
    /// Both belong to the same valid collective.
    SameCollective,
    /// Both belong to valid, distinct collectives.
    DifferentCollective,
    /// Target belongs to this specific collective.
    Collective(CollectiveId),
}

// ── Filter ────────────────────────────────────────────────────────────────────

/// The filter sum type.  One variant per concrete predicate kind; chains are
/// plain `Vec<Filter>` evaluated with AND semantics via [`all_pass`].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Filter {
    /// Entity carries the tag.
    Tag { entity: EntityRef, tag: TagId },

    /// Entity carries any tag in the (config-expanded) prefix set.
    TagPrefix { entity: EntityRef, tags: Vec<TagId> },

    /// Actor and target share at least one tag from the set.
    SharedTagPrefix { tags: Vec<TagId> },

    /// Entity holds at least `min_amount` of the resource.
    Resource {
        entity: EntityRef,
        resource: ResourceId,
        min_amount: u32,
    },

    /// Entity's vibe equals `vibe`.
    Vibe { entity: EntityRef, vibe: u8 },

    Alignment(AlignmentKind),

    /// A resolved game value is at least `threshold`.
    GameValue { value: GameValue, threshold: f64 },

    /// Euclidean² distance bound.
    ///
    /// Binary mode (`source: None`): actor-to-target distance ≤ `radius`²;
    /// `radius == 0` passes unconditionally.  Source mode: some object in
    /// the query's result is within `radius` of the target; `radius == 0`
    /// degrades to a non-emptiness test.
    MaxDistance {
        radius: u32,
        source: Option<QueryId>,
    },

    /// Target is within Chebyshev `radius` of any object passing the inner
    /// chain (evaluated with that object as target).
    Near { radius: u16, inner: Vec<Filter> },

    /// For every `(resource, min)` requirement, the summed holdings across
    /// the query's results reach `min`.  Each sum short-circuits.
    QueryResource {
        query: QueryId,
        requirements: Vec<(ResourceId, u32)>,
    },

    /// NOT(AND(inner)).
    Neg(Vec<Filter>),

    /// OR(inner); an empty chain never passes.
    Or(Vec<Filter>),
}

/// AND over a chain.  An empty chain passes.
pub fn all_pass(filters: &[Filter], ctx: &mut HandlerCtx<'_>) -> bool {
    filters.iter().all(|f| f.passes(ctx))
}

impl Filter {
    pub fn passes(&self, ctx: &mut HandlerCtx<'_>) -> bool {
        match self {
            Filter::Tag { entity, tag } => match ctx.world.grid.get(entity.resolve(ctx)) {
                Some(obj) => obj.tag_bits.has(*tag),
                None => false,
            },

            Filter::TagPrefix { entity, tags } => match ctx.world.grid.get(entity.resolve(ctx)) {
                Some(obj) => tags.iter().any(|&t| obj.tag_bits.has(t)),
                None => false,
            },

            Filter::SharedTagPrefix { tags } => {
                let (Some(a), Some(t)) =
                    (ctx.world.grid.get(ctx.actor), ctx.world.grid.get(ctx.target))
                else {
                    return false;
                };
                tags.iter()
                    .any(|&tag| a.tag_bits.has(tag) && t.tag_bits.has(tag))
            }

            Filter::Resource {
                entity,
                resource,
                min_amount,
            } => match ctx.world.grid.get(entity.resolve(ctx)) {
                Some(obj) => obj.inventory.amount(*resource) >= *min_amount,
                None => false,
            },

            Filter::Vibe { entity, vibe } => match ctx.world.grid.get(entity.resolve(ctx)) {
                Some(obj) => obj.vibe == *vibe,
                None => false,
            },

            Filter::Alignment(kind) => alignment_passes(*kind, ctx),

            Filter::GameValue { value, threshold } => value.resolve(ctx) >= *threshold,

            Filter::MaxDistance { radius, source } => max_distance_passes(*radius, *source, ctx),

            Filter::Near { radius, inner } => near_passes(*radius, inner, ctx),

            Filter::QueryResource {
                query,
                requirements,
            } => query_resource_passes(*query, requirements, ctx),

            Filter::Neg(inner) => !all_pass(inner, ctx),

            Filter::Or(inner) => inner.iter().any(|f| f.passes(ctx)),
        }
    }
}

// ── Variant bodies ────────────────────────────────────────────────────────────

fn alignment_passes(kind: AlignmentKind, ctx: &mut HandlerCtx<'_>) -> bool {
    let target_c = match ctx.world.grid.get(ctx.target) {
        Some(t) => t.collective,
        None => return false,
    };
    let actor_c = ctx
        .world
        .grid
        .get(ctx.actor)
        .map(|a| a.collective)
        .unwrap_or(CollectiveId::INVALID);

    match kind {
        AlignmentKind::Aligned | AlignmentKind::SameCollective => {
            actor_c != CollectiveId::INVALID && actor_c == target_c
        }
        AlignmentKind::Unaligned => target_c == CollectiveId::INVALID,
        AlignmentKind::DifferentCollective => {
            actor_c != CollectiveId::INVALID
                && target_c != CollectiveId::INVALID
                && actor_c != target_c
        }
        AlignmentKind::Collective(c) => target_c == c,
    }
}

fn max_distance_passes(radius: u32, source: Option<QueryId>, ctx: &mut HandlerCtx<'_>) -> bool {
    match source {
        None => {
            if radius == 0 {
                return true;
            }
            let (Some(a), Some(t)) =
                (ctx.world.grid.get(ctx.actor), ctx.world.grid.get(ctx.target))
            else {
                return false;
            };
            a.location.euclidean_sq(t.location) <= radius * radius
        }
        Some(query) => {
            let Some(target_loc) = ctx.world.grid.get(ctx.target).map(|t| t.location) else {
                return false;
            };
            let mut buf = ctx.world.scratch.take();
            query::evaluate_query_into(query, ctx, &mut buf);
            let pass = if radius == 0 {
                !buf.is_empty()
            } else {
                buf.iter().any(|&id| match ctx.world.grid.get(id) {
                    Some(obj) => obj.location.euclidean_sq(target_loc) <= radius * radius,
                    None => false,
                })
            };
            ctx.world.scratch.put(buf);
            pass
        }
    }
}

fn near_passes(radius: u16, inner: &[Filter], ctx: &mut HandlerCtx<'_>) -> bool {
    let Some(target_loc) = ctx.world.grid.get(ctx.target).map(|t| t.location) else {
        return false;
    };
    let mut buf = ctx.world.scratch.take();
    buf.extend(
        ctx.world
            .grid
            .iter()
            .filter(|o| o.location.chebyshev(target_loc) <= radius)
            .map(|o| o.id),
    );
    let mut hit = false;
    for &candidate in &buf {
        let mut sub = ctx.sub(ctx.actor, candidate);
        if all_pass(inner, &mut sub) {
            hit = true;
            break;
        }
    }
    ctx.world.scratch.put(buf);
    hit
}

fn query_resource_passes(
    query: QueryId,
    requirements: &[(ResourceId, u32)],
    ctx: &mut HandlerCtx<'_>,
) -> bool {
    let mut buf = ctx.world.scratch.take();
    query::evaluate_query_into(query, ctx, &mut buf);

    let pass = requirements.iter().all(|&(resource, min)| {
        let mut sum: u64 = 0;
        for &id in &buf {
            if let Some(obj) = ctx.world.grid.get(id) {
                sum += obj.inventory.amount(resource) as u64;
                if sum >= min as u64 {
                    return true;
                }
            }
        }
        min == 0
    });

    ctx.world.scratch.put(buf);
    pass
}
