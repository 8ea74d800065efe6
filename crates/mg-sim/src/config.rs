//! Environment configuration.
//!
//! The host owns config *loading* (files, validation UX); this crate takes
//! the already-typed structs below and assembles an environment.  All ids —
//! tags, resources, types, collectives, queries — are pre-assigned small
//! integers; names exist for stats and inspection only.

use mg_actions::ActionDef;
use mg_aoe::AoeConfig;
use mg_core::{CollectiveId, QueryId, ResourceId, TagId, TypeId};
use mg_events::EventConfig;
use mg_obs::{FeatureIds, GlobalObsFlags, RewardConfig};
use mg_rules::{GameValue, Handler, QueryDef};

// ── ObjectConfig ──────────────────────────────────────────────────────────────

/// Definition of one object kind, keyed by its map symbol.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectConfig {
    /// Display/stat name (distinct symbols may share behaviour but not ids).
    pub name: String,

    pub type_id: TypeId,

    /// Agents occupy the agent layer, receive dense agent ids in map scan
    /// order, and participate in actions/observations/rewards.
    pub is_agent: bool,

    /// Collective membership stamped on spawn.
    pub collective: Option<CollectiveId>,

    /// Whether agents may walk onto this object's cell.
    pub passable: bool,

    /// Tags stamped on spawn.
    pub tags: Vec<TagId>,

    /// Initial vibe.
    pub vibe: u8,

    /// Per-resource capacity table (length = number of resources).
    pub inventory_caps: Vec<u32>,

    /// Starting holdings.
    pub initial_inventory: Vec<(ResourceId, u32)>,

    /// On-use handlers, first match wins.
    pub on_use: Vec<Handler>,

    /// Per-tick handlers (meaningful for agents).
    pub on_tick: Vec<Handler>,

    /// Handlers fired when the paired tag is gained / lost.
    pub on_tag_add: Vec<(TagId, Handler)>,
    pub on_tag_remove: Vec<(TagId, Handler)>,

    /// AOE fields emitted by every instance of this object.
    pub aoes: Vec<AoeConfig>,
}

// ── CollectiveConfig ──────────────────────────────────────────────────────────

/// One team.  The list supplied to [`GameConfig`] must be sorted by name;
/// list position is the `CollectiveId`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollectiveConfig {
    pub name: String,
    pub initial_inventory: Vec<(ResourceId, u32)>,
}

// ── GameConfig ────────────────────────────────────────────────────────────────

/// Everything needed to build one environment, minus the map and seed.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameConfig {
    pub num_agents: usize,

    /// Observation window; odd-sized, at most 15 per axis.
    pub obs_height: u16,
    pub obs_width: u16,

    /// Episode horizon.
    pub max_steps: u64,

    /// At the horizon: `true` sets truncations, `false` sets terminals.
    pub episode_truncates: bool,

    /// Records per agent observation row.
    pub num_observation_tokens: usize,

    pub resource_names: Vec<String>,

    /// Vibe id → name, for inspection.
    pub vibe_names: Vec<String>,

    /// Tag id space size (bounds the bitset and the index).
    pub num_tags: usize,

    pub features: FeatureIds,
    pub global_obs: GlobalObsFlags,
    pub token_value_base: u32,

    /// The flattened action space, wire order.
    pub actions: Vec<ActionDef>,

    /// Object kinds keyed by map symbol.
    pub objects: Vec<(String, ObjectConfig)>,

    /// Sorted by name; position = id.
    pub collectives: Vec<CollectiveConfig>,

    pub queries: Vec<QueryDef>,
    pub materialized_queries: Vec<QueryId>,

    pub events: Vec<EventConfig>,

    /// Shared reward specification; each agent gets its own resolved helper.
    pub rewards: RewardConfig,

    /// Goal-token value per reward-relevant resource.
    pub reward_estimates: Vec<(ResourceId, u8)>,

    /// Extra global observation features resolved from game values.
    pub obs_values: Vec<(u8, GameValue)>,

    /// Observation path selection; `None` defers to
    /// `METTAGRID_OBS_USE_OPTIMIZED` (default: optimised).
    pub use_optimized_obs: Option<bool>,

    /// Shadow-path comparison; `None` defers to `METTAGRID_OBS_VALIDATION`.
    pub validate_obs: Option<bool>,

    /// Step-phase timing; `None` defers to `METTAGRID_PROFILING`.
    pub profiling: Option<bool>,
}
