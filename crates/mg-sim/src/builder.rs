//! `EnvBuilder` — validation and assembly of a [`MettaGrid`] environment.

use std::sync::Arc;

use log::info;
use rustc_hash::FxHashMap;

use mg_actions::{ActionKind, ActionSet};
use mg_aoe::{AoeConfigId, AoeTracker};
use mg_core::{AgentId, CollectiveId, HandlerId, TagId};
use mg_events::EventScheduler;
use mg_obs::{ObsEncoder, ObsEncoderConfig, RewardHelper};
use mg_rules::{query, DispatchMode, Handler, MultiHandler, Rules, TypeHooks};
use mg_world::{Collective, Grid, GridObject, Inventory, InventoryLimits, QueryCaches, World};

use crate::{
    config::GameConfig, env::MettaGrid, error::BuildError, map, profile::PhaseProfiler,
};

/// Builds a ready-to-run environment from `(config, map, seed)`.
///
/// All validation happens in [`build`][EnvBuilder::build]; a returned
/// environment is internally consistent and will never fail at runtime for
/// configuration reasons.
pub struct EnvBuilder {
    config: GameConfig,
    map: Vec<Vec<String>>,
    seed: u32,
}

impl EnvBuilder {
    pub fn new(config: GameConfig, map: Vec<Vec<String>>, seed: u32) -> Self {
        Self { config, map, seed }
    }

    pub fn build(self) -> Result<MettaGrid, BuildError> {
        let cfg = &self.config;

        // ── Validation ────────────────────────────────────────────────────
        validate_window(cfg)?;
        validate_collectives(cfg)?;
        validate_types(cfg)?;
        validate_queries(cfg)?;
        if cfg.num_tags > mg_world::MAX_TAGS {
            return Err(BuildError::Config(format!(
                "{} tags exceed the {}-tag capacity",
                cfg.num_tags,
                mg_world::MAX_TAGS
            )));
        }

        // ── Rules: handlers and per-type hooks ────────────────────────────
        let rules = build_rules(cfg);

        // ── World shell ───────────────────────────────────────────────────
        let (height, width) = map::dimensions(&self.map);
        let num_resources = cfg.resource_names.len();
        let collectives = cfg
            .collectives
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let mut inv = Inventory::new(Arc::new(InventoryLimits::unlimited(num_resources)));
                for &(r, n) in &c.initial_inventory {
                    inv.set(r, n);
                }
                Collective::new(
                    CollectiveId(i as u16),
                    c.name.clone(),
                    inv,
                    &cfg.resource_names,
                )
            })
            .collect();

        let mut world = World::new(
            Grid::new(height, width),
            cfg.num_tags,
            collectives,
            cfg.resource_names.clone(),
            cfg.num_agents,
            cfg.max_steps,
            self.seed,
        );

        world.query_caches = QueryCaches::new(rules.num_queries(), cfg.num_tags);
        for &q in &cfg.materialized_queries {
            let touched = rules.touched_tags(q);
            world.query_caches.declare_materialised(q, &touched);
        }

        // ── AOE configs, shared inventory limits, symbol lookup ───────────
        let mut aoe = AoeTracker::new(height, width, cfg.num_agents);
        let mut symbol_table: FxHashMap<&str, usize> = FxHashMap::default();
        let mut aoe_ids: Vec<Vec<AoeConfigId>> = Vec::with_capacity(cfg.objects.len());
        let mut limit_tables: Vec<Arc<InventoryLimits>> = Vec::with_capacity(cfg.objects.len());
        for (i, (symbol, obj_cfg)) in cfg.objects.iter().enumerate() {
            symbol_table.insert(symbol.as_str(), i);
            aoe_ids.push(obj_cfg.aoes.iter().map(|a| aoe.add_config(a.clone())).collect());
            let caps = if obj_cfg.inventory_caps.len() == num_resources {
                obj_cfg.inventory_caps.clone()
            } else {
                vec![u32::MAX; num_resources]
            };
            limit_tables.push(Arc::new(InventoryLimits::new(caps)));
        }

        // ── Populate the grid from the map ────────────────────────────────
        let mut next_agent = 0u32;
        for spawn in map::spawns(&self.map) {
            let Some(&idx) = symbol_table.get(spawn.symbol.as_str()) else {
                return Err(BuildError::UnknownMapSymbol {
                    symbol: spawn.symbol,
                    row: spawn.row as usize,
                    col: spawn.col as usize,
                });
            };
            let (_, obj_cfg) = &cfg.objects[idx];
            let loc = mg_core::GridLocation::new(spawn.row, spawn.col);
            let inventory = Inventory::new(limit_tables[idx].clone());

            let mut obj = if obj_cfg.is_agent {
                let agent = AgentId(next_agent);
                next_agent += 1;
                GridObject::new_agent(obj_cfg.type_id, loc, inventory, agent)
            } else {
                GridObject::new(obj_cfg.type_id, loc, inventory)
            };
            obj.vibe = obj_cfg.vibe;
            obj.passable = obj_cfg.passable;
            if let Some(c) = obj_cfg.collective {
                obj.collective = c;
            }
            for &tag in &obj_cfg.tags {
                obj.tag_bits.set(tag);
            }
            for &(r, n) in &obj_cfg.initial_inventory {
                obj.inventory.set(r, n);
            }

            let id = world.spawn(obj)?;
            for &aid in &aoe_ids[idx] {
                aoe.register(&world, id, aid);
            }
        }

        if next_agent as usize != cfg.num_agents {
            return Err(BuildError::AgentCountMismatch {
                expected: cfg.num_agents,
                found: next_agent as usize,
            });
        }

        query::recompute_materialised(&mut world, &rules);

        // ── Actions, events ───────────────────────────────────────────────
        let actions = ActionSet::new(cfg.actions.clone());
        let move_action_flags = actions
            .defs()
            .iter()
            .map(|d| matches!(d.kind, ActionKind::Move(_)))
            .collect();
        let events = EventScheduler::new(cfg.events.clone());

        // ── Observation encoder ───────────────────────────────────────────
        let use_optimized = cfg
            .use_optimized_obs
            .or_else(|| env_flag("METTAGRID_OBS_USE_OPTIMIZED"))
            .unwrap_or(true);
        let validate = cfg
            .validate_obs
            .or_else(|| env_flag("METTAGRID_OBS_VALIDATION"))
            .unwrap_or(false);
        let profiling = cfg
            .profiling
            .or_else(|| env_flag("METTAGRID_PROFILING"))
            .unwrap_or(false);

        let goal_tokens = cfg
            .rewards
            .reward_resources()
            .into_iter()
            .map(|res| {
                let estimate = cfg
                    .reward_estimates
                    .iter()
                    .find(|(r, _)| *r == res)
                    .map_or(0, |&(_, v)| v);
                (cfg.features.goal, estimate)
            })
            .collect();

        let encoder = ObsEncoder::new(
            ObsEncoderConfig {
                obs_height: cfg.obs_height,
                obs_width: cfg.obs_width,
                num_tokens: cfg.num_observation_tokens,
                features: cfg.features.clone(),
                token_value_base: cfg.token_value_base,
                goal_tokens,
                global_obs: cfg.global_obs,
                obs_values: cfg.obs_values.clone(),
                use_optimized,
                validate,
            },
            cfg.num_agents,
        );

        // ── Reward helpers ────────────────────────────────────────────────
        let reward_helpers = (0..cfg.num_agents)
            .map(|i| RewardHelper::new(&cfg.rewards, &mut world, AgentId(i as u32)))
            .collect();

        // ── Type-name table for inspection ────────────────────────────────
        let max_type = cfg
            .objects
            .iter()
            .map(|(_, o)| o.type_id.index())
            .max()
            .map_or(0, |m| m + 1);
        let mut type_names = vec![String::new(); max_type];
        for (_, o) in &cfg.objects {
            type_names[o.type_id.index()] = o.name.clone();
        }

        info!(
            "built {}x{} world: {} objects, {} agents, {} queries, {} events",
            height,
            width,
            world.grid.len(),
            cfg.num_agents,
            rules.num_queries(),
            events.num_events(),
        );

        Ok(MettaGrid::assemble(
            world,
            rules,
            aoe,
            events,
            actions,
            encoder,
            reward_helpers,
            PhaseProfiler::new(profiling),
            cfg.num_observation_tokens,
            cfg.episode_truncates,
            type_names,
            move_action_flags,
        ))
    }
}

// ── Validation helpers ────────────────────────────────────────────────────────

fn validate_window(cfg: &GameConfig) -> Result<(), BuildError> {
    let ok = |d: u16| d % 2 == 1 && d <= mg_core::location::MAX_PACKABLE_COORD + 1;
    if !ok(cfg.obs_height) || !ok(cfg.obs_width) {
        return Err(BuildError::BadObsWindow {
            height: cfg.obs_height,
            width: cfg.obs_width,
        });
    }
    Ok(())
}

fn validate_collectives(cfg: &GameConfig) -> Result<(), BuildError> {
    for pair in cfg.collectives.windows(2) {
        if pair[0].name >= pair[1].name {
            return Err(BuildError::CollectivesNotSorted {
                first: pair[0].name.clone(),
                second: pair[1].name.clone(),
            });
        }
    }
    Ok(())
}

fn validate_types(cfg: &GameConfig) -> Result<(), BuildError> {
    let mut seen: FxHashMap<mg_core::TypeId, &str> = FxHashMap::default();
    for (_, o) in &cfg.objects {
        if let Some(&first) = seen.get(&o.type_id) {
            return Err(BuildError::DuplicateTypeId {
                type_id: o.type_id,
                first: first.to_string(),
                second: o.name.clone(),
            });
        }
        seen.insert(o.type_id, o.name.as_str());
    }
    Ok(())
}

fn validate_queries(cfg: &GameConfig) -> Result<(), BuildError> {
    for &q in &cfg.materialized_queries {
        if q.index() >= cfg.queries.len() {
            return Err(BuildError::Config(format!(
                "materialised query {q} is out of range ({} queries defined)",
                cfg.queries.len()
            )));
        }
    }
    Ok(())
}

// ── Rule assembly ─────────────────────────────────────────────────────────────

/// Fold every object config's handlers into the rule arena and per-type
/// hook tables.
fn build_rules(cfg: &GameConfig) -> Rules {
    let mut multi_handlers: Vec<MultiHandler> = Vec::new();
    let mut push = |handlers: Vec<Handler>, mode: DispatchMode| -> HandlerId {
        multi_handlers.push(MultiHandler::new(handlers, mode));
        HandlerId(multi_handlers.len() as u32 - 1)
    };

    let max_type = cfg
        .objects
        .iter()
        .map(|(_, o)| o.type_id.index())
        .max()
        .map_or(0, |m| m + 1);
    let mut type_hooks = vec![TypeHooks::none(); max_type];

    for (_, o) in &cfg.objects {
        let hooks = &mut type_hooks[o.type_id.index()];
        if !o.on_use.is_empty() {
            hooks.on_use = push(o.on_use.clone(), DispatchMode::FirstMatch);
        }
        if !o.on_tick.is_empty() {
            hooks.on_tick = push(o.on_tick.clone(), DispatchMode::All);
        }
        hooks.on_tag_add = group_tag_handlers(&o.on_tag_add, &mut push);
        hooks.on_tag_remove = group_tag_handlers(&o.on_tag_remove, &mut push);
    }

    Rules::new(
        multi_handlers,
        cfg.queries.clone(),
        cfg.materialized_queries.clone(),
        type_hooks,
    )
}

/// Group `(tag, handler)` pairs into one All-mode MultiHandler per tag,
/// preserving first-seen tag order and per-tag handler order.
fn group_tag_handlers(
    entries: &[(TagId, Handler)],
    push: &mut impl FnMut(Vec<Handler>, DispatchMode) -> HandlerId,
) -> Vec<(TagId, HandlerId)> {
    let mut grouped: Vec<(TagId, Vec<Handler>)> = Vec::new();
    for (tag, handler) in entries {
        match grouped.iter_mut().find(|(t, _)| t == tag) {
            Some((_, v)) => v.push(handler.clone()),
            None => grouped.push((*tag, vec![handler.clone()])),
        }
    }
    grouped
        .into_iter()
        .map(|(tag, handlers)| (tag, push(handlers, DispatchMode::All)))
        .collect()
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| v != "0" && !v.is_empty())
}
