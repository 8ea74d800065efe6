//! `GameValue` — scalar quantities resolvable in an evaluation context.

use mg_core::{CollectiveId, QueryId, ResourceId, TagId};

use crate::{ctx::EntityRef, query, HandlerCtx};

/// Which stats tracker a [`GameValue::Stat`] reads.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatScope {
    /// The game-level tracker.
    Game,
    /// The per-agent tracker of the selected entity.
    Agent,
    /// The tracker of the selected entity's collective.
    Collective,
}

/// A scalar resolvable against the current world.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GameValue {
    /// The selected entity's inventory amount of one resource.
    Inventory {
        entity: EntityRef,
        resource: ResourceId,
    },

    /// A named stat in the selected scope.
    ///
    /// `delta` marks the value as change-per-tick for consumers that track
    /// previous readings (the reward resolver); direct resolution always
    /// yields the current accumulated value.
    Stat {
        scope: StatScope,
        entity: EntityRef,
        key: String,
        delta: bool,
    },

    /// Cardinality of one tag's bucket.
    TagCount(TagId),

    Const(f64),

    /// Sum of one resource across a query's current result set.
    QueryInventory {
        query: QueryId,
        resource: ResourceId,
    },
}

impl GameValue {
    /// Resolve against the current world state.
    ///
    /// Missing entities, unknown stats, and empty queries all resolve to
    /// 0.0 — a `GameValue` never fails.
    pub fn resolve(&self, ctx: &mut HandlerCtx<'_>) -> f64 {
        match self {
            GameValue::Inventory { entity, resource } => {
                match ctx.world.grid.get(entity.resolve(ctx)) {
                    Some(obj) => obj.inventory.amount(*resource) as f64,
                    None => 0.0,
                }
            }

            GameValue::Stat {
                scope, entity, key, ..
            } => resolve_stat(ctx, *scope, *entity, key),

            GameValue::TagCount(tag) => ctx.world.tag_index.count(*tag) as f64,

            GameValue::Const(v) => *v,

            GameValue::QueryInventory { query, resource } => {
                let mut buf = ctx.world.scratch.take();
                query::evaluate_query_into(*query, ctx, &mut buf);
                let total: u64 = buf
                    .iter()
                    .filter_map(|&id| ctx.world.grid.get(id))
                    .map(|obj| obj.inventory.amount(*resource) as u64)
                    .sum();
                ctx.world.scratch.put(buf);
                total as f64
            }
        }
    }
}

fn resolve_stat(ctx: &HandlerCtx<'_>, scope: StatScope, entity: EntityRef, key: &str) -> f64 {
    match scope {
        StatScope::Game => ctx.world.stats.get(key),
        StatScope::Agent => {
            let Some(obj) = ctx.world.grid.get(entity.resolve(ctx)) else {
                return 0.0;
            };
            match obj.agent_id() {
                Some(a) => ctx.world.agent_stats[a.index()].get(key),
                None => 0.0,
            }
        }
        StatScope::Collective => {
            let Some(obj) = ctx.world.grid.get(entity.resolve(ctx)) else {
                return 0.0;
            };
            if obj.collective == CollectiveId::INVALID {
                return 0.0;
            }
            ctx.world.collectives[obj.collective.index()].stats.get(key)
        }
    }
}
