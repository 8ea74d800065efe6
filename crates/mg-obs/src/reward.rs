//! The reward helper: per-entry read strategies resolved once at init.

use mg_core::{AgentId, CollectiveId, ObjectId, QueryId, ResourceId, StatId, TagId};
use mg_rules::{ctx::EntityRef, GameValue, HandlerCtx, Rules, StatScope};
use mg_world::World;

// ── Config ────────────────────────────────────────────────────────────────────

/// How a reward entry folds into the per-tick total.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Aggregation {
    Sum,
    /// `log(1 + v)` before delta tracking — diminishing returns on hoarding.
    SumLogs,
}

/// One reward term.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RewardEntryConfig {
    pub numerator: GameValue,
    pub denominators: Vec<GameValue>,
    pub weight: f32,
    pub max_value: f32,
    pub has_max: bool,
    /// `true`: pay the full value every tick; `false`: pay only its change.
    pub accumulate: bool,
    pub aggregation: Aggregation,
}

impl RewardEntryConfig {
    /// The common case: pay `weight` per unit change of `numerator`.
    pub fn on_change(numerator: GameValue, weight: f32) -> Self {
        Self {
            numerator,
            denominators: Vec::new(),
            weight,
            max_value: 0.0,
            has_max: false,
            accumulate: false,
            aggregation: Aggregation::Sum,
        }
    }
}

/// One agent's reward specification.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RewardConfig {
    pub entries: Vec<RewardEntryConfig>,
}

impl RewardConfig {
    /// Resources whose holdings feed any numerator — drives goal tokens.
    pub fn reward_resources(&self) -> Vec<ResourceId> {
        let mut out: Vec<ResourceId> = self
            .entries
            .iter()
            .filter_map(|e| match &e.numerator {
                GameValue::Inventory { resource, .. } => Some(*resource),
                GameValue::QueryInventory { resource, .. } => Some(*resource),
                _ => None,
            })
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

// ── Read strategies ───────────────────────────────────────────────────────────

/// A `GameValue` compiled against one agent: stat names interned to slots,
/// everything else reduced to an id-indexed load.  The per-tick `read()` is
/// a match plus one lookup.
enum ReadStrategy {
    OwnInventory(ResourceId),
    AgentStat(StatId),
    GameStat(StatId),
    CollectiveStat(CollectiveId, StatId),
    TagCount(TagId),
    Const(f64),
    Query { query: QueryId, resource: ResourceId },
    /// Values that cannot be pre-bound (missing collective at init, stat in
    /// another entity's scope) fall back to full context resolution.
    Dynamic(GameValue),
}

impl ReadStrategy {
    fn resolve(value: &GameValue, world: &mut World, agent_obj: ObjectId) -> ReadStrategy {
        match value {
            GameValue::Inventory {
                entity: EntityRef::Actor,
                resource,
            } => ReadStrategy::OwnInventory(*resource),

            GameValue::Stat {
                scope,
                entity: EntityRef::Actor,
                key,
                ..
            } => {
                let Some(obj) = world.grid.get(agent_obj) else {
                    return ReadStrategy::Dynamic(value.clone());
                };
                match scope {
                    StatScope::Game => {
                        let id = world.stats.resolve(key);
                        ReadStrategy::GameStat(id)
                    }
                    StatScope::Agent => match obj.agent_id() {
                        Some(a) => {
                            let id = world.agent_stats[a.index()].resolve(key);
                            ReadStrategy::AgentStat(id)
                        }
                        None => ReadStrategy::Dynamic(value.clone()),
                    },
                    StatScope::Collective => {
                        let cid = obj.collective;
                        if cid == CollectiveId::INVALID {
                            return ReadStrategy::Dynamic(value.clone());
                        }
                        let id = world.collectives[cid.index()].stats.resolve(key);
                        ReadStrategy::CollectiveStat(cid, id)
                    }
                }
            }

            GameValue::TagCount(tag) => ReadStrategy::TagCount(*tag),
            GameValue::Const(v) => ReadStrategy::Const(*v),
            GameValue::QueryInventory { query, resource } => ReadStrategy::Query {
                query: *query,
                resource: *resource,
            },
            other => ReadStrategy::Dynamic(other.clone()),
        }
    }

    fn read(&self, world: &mut World, rules: &Rules, agent: AgentId) -> f64 {
        match self {
            ReadStrategy::OwnInventory(res) => {
                let obj = world.agent_object(agent);
                match world.grid.get(obj) {
                    Some(o) => o.inventory.amount(*res) as f64,
                    None => 0.0,
                }
            }
            ReadStrategy::AgentStat(id) => world.agent_stats[agent.index()].get_id(*id),
            ReadStrategy::GameStat(id) => world.stats.get_id(*id),
            ReadStrategy::CollectiveStat(cid, id) => {
                world.collectives[cid.index()].stats.get_id(*id)
            }
            ReadStrategy::TagCount(tag) => world.tag_index.count(*tag) as f64,
            ReadStrategy::Const(v) => *v,
            ReadStrategy::Query { query, resource } => GameValue::QueryInventory {
                query: *query,
                resource: *resource,
            }
            .resolve(&mut HandlerCtx::of(world, rules, ObjectId::INVALID)),
            ReadStrategy::Dynamic(value) => {
                let obj = world.agent_object(agent);
                value.resolve(&mut HandlerCtx::between(world, rules, obj, obj))
            }
        }
    }
}

// ── RewardHelper ──────────────────────────────────────────────────────────────

struct ResolvedEntry {
    numerator: ReadStrategy,
    denominators: Vec<ReadStrategy>,
    weight: f64,
    max_value: f64,
    has_max: bool,
    accumulate: bool,
    aggregation: Aggregation,
    prev_value: f64,
}

/// One agent's compiled reward pipeline.
pub struct RewardHelper {
    entries: Vec<ResolvedEntry>,
}

impl RewardHelper {
    /// Compile `config` against the agent's trackers.  Interns every stat
    /// key now so per-tick reads never touch strings.
    pub fn new(config: &RewardConfig, world: &mut World, agent: AgentId) -> Self {
        let agent_obj = world.agent_object(agent);
        let entries = config
            .entries
            .iter()
            .map(|e| ResolvedEntry {
                numerator: ReadStrategy::resolve(&e.numerator, world, agent_obj),
                denominators: e
                    .denominators
                    .iter()
                    .map(|d| ReadStrategy::resolve(d, world, agent_obj))
                    .collect(),
                weight: e.weight as f64,
                max_value: e.max_value as f64,
                has_max: e.has_max,
                accumulate: e.accumulate,
                aggregation: e.aggregation,
                prev_value: 0.0,
            })
            .collect();
        Self { entries }
    }

    /// Reset every entry's delta baseline to the current world state.
    /// Called at episode start so the first tick pays for changes, not for
    /// holdings that existed before the first action.
    pub fn prime(&mut self, world: &mut World, rules: &Rules, agent: AgentId) {
        let _ = self.compute(world, rules, agent);
    }

    /// This tick's reward delta, in fixed entry order.
    pub fn compute(&mut self, world: &mut World, rules: &Rules, agent: AgentId) -> f32 {
        let mut total = 0.0f64;
        for entry in &mut self.entries {
            let mut v = entry.numerator.read(world, rules, agent) * entry.weight;
            for d in &entry.denominators {
                let dv = d.read(world, rules, agent);
                if dv > 0.0 {
                    v /= dv;
                }
            }
            if entry.has_max {
                v = v.min(entry.max_value);
            }
            let v = match entry.aggregation {
                Aggregation::Sum => v,
                Aggregation::SumLogs => (1.0 + v.max(0.0)).ln(),
            };
            let delta = if entry.accumulate {
                v
            } else {
                v - entry.prev_value
            };
            total += delta;
            entry.prev_value = v;
        }
        total as f32
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }
}
