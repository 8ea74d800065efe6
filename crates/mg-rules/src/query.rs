//! The query system: tag, filtered, and closure queries, plus the
//! materialised-cache read path.
//!
//! Queries are pure functions of `(world, tick)`.  Random ordering draws
//! from a child stream derived from the per-tick seed and the query id, so
//! re-evaluating the same query within a tick yields the same order and the
//! main RNG stream is never touched.

use rand::seq::SliceRandom;

use mg_core::{EnvRng, ObjectId, QueryId, TagId};
use mg_world::World;

use crate::{filter::all_pass, Filter, HandlerCtx, Rules};

/// Fixed-point iteration cap for closure queries.  Real configurations
/// converge in a handful of rounds; hitting the cap means a logic error.
const CLOSURE_MAX_ROUNDS: usize = 64;

// ── Definitions ───────────────────────────────────────────────────────────────

/// Result ordering for a tag query.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueryOrder {
    /// The underlying bucket's stable insertion order.
    Insertion,
    /// Shuffled per tick from the tick seed (deterministic per tick).
    Random,
}

/// All objects carrying a tag, filtered, ordered, and capped.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagQuery {
    pub tag: TagId,
    pub filters: Vec<Filter>,
    pub order: QueryOrder,
    pub limit: Option<u32>,
}

impl TagQuery {
    /// An unfiltered, insertion-ordered, uncapped query over one tag.
    pub fn all(tag: TagId) -> Self {
        Self {
            tag,
            filters: Vec::new(),
            order: QueryOrder::Insertion,
            limit: None,
        }
    }
}

/// A query definition.
///
/// Queries flagged materialised in the rule set must be context-free: their
/// filters may not read the actor, since one cached result serves every
/// evaluation site.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueryDef {
    Tag(TagQuery),

    /// Another query's result, narrowed by a filter chain.
    Filtered {
        source: QueryId,
        filters: Vec<Filter>,
    },

    /// Transitive closure: grow the source set with candidates reachable
    /// via at least one edge chain (actor = member, target = candidate),
    /// then narrow with `result_filters`.
    Closure {
        source: QueryId,
        candidates: QueryId,
        edge_filters: Vec<Vec<Filter>>,
        result_filters: Vec<Filter>,
    },
}

// ── Evaluation ────────────────────────────────────────────────────────────────

/// Append the query's current result to `out`.
///
/// Materialised queries serve from cache, recomputing first if dirty; the
/// cache holds the raw filtered set and ordering/capping applies per read.
pub fn evaluate_query_into(qid: QueryId, ctx: &mut HandlerCtx<'_>, out: &mut Vec<ObjectId>) {
    let start = out.len();
    if ctx.world.query_caches.is_materialised(qid) {
        if ctx.world.query_caches.is_dirty(qid) {
            let mut buf = ctx.world.scratch.take();
            compute_query(qid, ctx, &mut buf);
            ctx.world.query_caches.store(qid, &mut buf);
            ctx.world.scratch.put(buf);
        }
        out.extend_from_slice(ctx.world.query_caches.result(qid));
    } else {
        compute_query(qid, ctx, out);
    }
    apply_order_and_limit(qid, ctx, out, start);
}

/// Rebuild every materialised cache from scratch.
///
/// Called once at environment construction; afterwards caches refresh
/// lazily on first dirty read.
pub fn recompute_materialised(world: &mut World, rules: &Rules) {
    for &qid in rules.materialised() {
        world.query_caches.mark_dirty(qid);
        let mut ctx = HandlerCtx::of(world, rules, ObjectId::INVALID);
        let mut buf = ctx.world.scratch.take();
        evaluate_query_into(qid, &mut ctx, &mut buf);
        world.scratch.put(buf);
    }
}

fn compute_query(qid: QueryId, ctx: &mut HandlerCtx<'_>, out: &mut Vec<ObjectId>) {
    let rules = ctx.rules;
    match rules.query(qid) {
        QueryDef::Tag(tq) => {
            let mut buf = ctx.world.scratch.take();
            buf.extend(ctx.world.tag_index.objects_with(tq.tag));
            filter_into(&buf, &tq.filters, ctx, out);
            ctx.world.scratch.put(buf);
        }

        QueryDef::Filtered { source, filters } => {
            let mut buf = ctx.world.scratch.take();
            evaluate_query_into(*source, ctx, &mut buf);
            filter_into(&buf, filters, ctx, out);
            ctx.world.scratch.put(buf);
        }

        QueryDef::Closure {
            source,
            candidates,
            edge_filters,
            result_filters,
        } => {
            let mut members = ctx.world.scratch.take();
            evaluate_query_into(*source, ctx, &mut members);
            let mut cands = ctx.world.scratch.take();
            evaluate_query_into(*candidates, ctx, &mut cands);
            cands.retain(|c| !members.contains(c));

            grow_closure(&mut members, &mut cands, edge_filters, ctx);

            filter_into(&members, result_filters, ctx, out);
            ctx.world.scratch.put(members);
            ctx.world.scratch.put(cands);
        }
    }
}

/// Push every candidate passing the chain (empty chain: all of them).
fn filter_into(
    candidates: &[ObjectId],
    filters: &[Filter],
    ctx: &mut HandlerCtx<'_>,
    out: &mut Vec<ObjectId>,
) {
    if filters.is_empty() {
        out.extend_from_slice(candidates);
        return;
    }
    for &id in candidates {
        let mut sub = ctx.sub(ctx.actor, id);
        if all_pass(filters, &mut sub) {
            out.push(id);
        }
    }
}

/// Fixed-point growth of `members` from `cands` along passing edges.
fn grow_closure(
    members: &mut Vec<ObjectId>,
    cands: &mut Vec<ObjectId>,
    edge_filters: &[Vec<Filter>],
    ctx: &mut HandlerCtx<'_>,
) {
    let mut rounds = 0;
    loop {
        rounds += 1;
        let before = members.len();

        let mut i = 0;
        while i < cands.len() {
            let cand = cands[i];
            let connected = members.iter().any(|&m| {
                edge_filters.iter().any(|chain| {
                    let mut sub = ctx.sub(m, cand);
                    all_pass(chain, &mut sub)
                })
            });
            if connected {
                members.push(cand);
                cands.swap_remove(i);
            } else {
                i += 1;
            }
        }

        if members.len() == before || cands.is_empty() {
            break;
        }
        debug_assert!(rounds < CLOSURE_MAX_ROUNDS, "closure query did not converge");
        if rounds >= CLOSURE_MAX_ROUNDS {
            break;
        }
    }
}

/// Order and cap the entries this evaluation appended (from `start` on),
/// leaving anything the caller already had in `out` untouched.
fn apply_order_and_limit(qid: QueryId, ctx: &mut HandlerCtx<'_>, out: &mut Vec<ObjectId>, start: usize) {
    let QueryDef::Tag(tq) = ctx.rules.query(qid) else {
        return;
    };
    if tq.order == QueryOrder::Random {
        let mut stream = EnvRng::child_stream(ctx.world.tick_seed, qid.0 as u64);
        out[start..].shuffle(&mut stream);
    }
    if let Some(limit) = tq.limit {
        out.truncate(start + limit as usize);
    }
}
