//! The `MettaGrid` environment: step loop, buffer contract, inspection.

use std::collections::BTreeMap;

use mg_actions::ActionSet;
use mg_aoe::AoeTracker;
use mg_core::{AgentId, CollectiveId, GridLocation, ObjectId, ResourceId};
use mg_events::EventScheduler;
use mg_obs::{AgentObsInput, ObsEncoder, RewardHelper, TokenCounts};
use mg_rules::{HandlerCtx, Rules};
use mg_world::World;

use crate::{
    buffers::Buffers,
    error::{EnvError, EnvResult},
    profile::{Phase, PhaseProfiler},
};

// ── MettaGrid ─────────────────────────────────────────────────────────────────

/// One simulation instance.  Built by [`EnvBuilder`][crate::EnvBuilder];
/// stepped by the host after attaching buffers.
pub struct MettaGrid {
    world: World,
    rules: Rules,
    aoe: AoeTracker,
    events: EventScheduler,
    actions: ActionSet,
    encoder: ObsEncoder,
    reward_helpers: Vec<RewardHelper>,
    profiler: PhaseProfiler,

    buffers: Option<Buffers>,
    action_success: Vec<bool>,
    /// Previous tick's reward per agent, fed back as a global token.
    last_rewards: Vec<f32>,
    episode_rewards: Vec<f64>,
    /// Shuffle scratch, reused every tick.
    agent_order: Vec<AgentId>,

    num_tokens: usize,
    episode_truncates: bool,
    /// TypeId → display name, for inspection.
    type_names: Vec<String>,
    /// Wire action index → "is a movement action" (LastActionMove token).
    move_action_flags: Vec<bool>,
}

impl std::fmt::Debug for MettaGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MettaGrid").finish_non_exhaustive()
    }
}

/// Host-facing snapshot of one object, for [`MettaGrid::grid_objects`].
#[derive(Clone, Debug)]
pub struct ObjectInfo {
    pub type_name: String,
    pub location: (u16, u16),
    pub vibe: u8,
    pub tags: Vec<u16>,
    pub inventory: Vec<(String, u32)>,
    pub collective: Option<String>,
    pub agent_id: Option<u32>,
    pub frozen_until_step: Option<u64>,
}

impl MettaGrid {
    /// Internal constructor used by the builder.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        world: World,
        rules: Rules,
        aoe: AoeTracker,
        events: EventScheduler,
        actions: ActionSet,
        encoder: ObsEncoder,
        reward_helpers: Vec<RewardHelper>,
        profiler: PhaseProfiler,
        num_tokens: usize,
        episode_truncates: bool,
        type_names: Vec<String>,
        move_action_flags: Vec<bool>,
    ) -> Self {
        let n = world.num_agents();
        Self {
            world,
            rules,
            aoe,
            events,
            actions,
            encoder,
            reward_helpers,
            profiler,
            buffers: None,
            action_success: vec![false; n],
            last_rewards: vec![0.0; n],
            episode_rewards: vec![0.0; n],
            agent_order: Vec::with_capacity(n),
            num_tokens,
            episode_truncates,
            type_names,
            move_action_flags,
        }
    }

    // ── Host buffer contract ──────────────────────────────────────────────

    /// Validate and attach output buffers, then write the initial state:
    /// zero rewards, cleared flags, and first observations (action = noop).
    pub fn set_buffers(&mut self, mut buffers: Buffers) -> EnvResult<()> {
        buffers.validate(self.world.num_agents(), self.num_tokens)?;

        buffers.rewards.fill(0.0);
        buffers.terminals.fill(false);
        buffers.truncations.fill(false);
        buffers.actions.fill(0);
        self.last_rewards.fill(0.0);
        self.episode_rewards.fill(0.0);
        self.action_success.fill(false);

        // Baseline the reward deltas against the pre-episode world.
        {
            let Self {
                world,
                rules,
                reward_helpers,
                ..
            } = self;
            for (i, helper) in reward_helpers.iter_mut().enumerate() {
                helper.prime(world, rules, AgentId(i as u32));
            }
        }

        self.write_observations(&mut buffers);
        self.buffers = Some(buffers);
        Ok(())
    }

    /// Detach and return the buffers (e.g. for a host-side swap).
    pub fn take_buffers(&mut self) -> Option<Buffers> {
        self.buffers.take()
    }

    pub fn buffers(&self) -> Option<&Buffers> {
        self.buffers.as_ref()
    }

    /// Host write access between steps (actions are set through this).
    pub fn buffers_mut(&mut self) -> Option<&mut Buffers> {
        self.buffers.as_mut()
    }

    // ── Step ──────────────────────────────────────────────────────────────

    /// Advance the simulation by one tick.
    pub fn step(&mut self) -> EnvResult<()> {
        let Some(mut bufs) = self.buffers.take() else {
            return Err(EnvError::BuffersNotAttached);
        };
        self.step_inner(&mut bufs);
        self.buffers = Some(bufs);
        Ok(())
    }

    fn step_inner(&mut self, bufs: &mut Buffers) {
        let num_agents = self.world.num_agents();

        // ── ① Bookkeeping ─────────────────────────────────────────────────
        bufs.rewards.fill(0.0);
        self.action_success.fill(false);
        self.world.current_step += 1;
        let step = self.world.current_step;
        self.world.tick_seed = self.world.rng.draw_tick_seed();

        let Self {
            world,
            rules,
            aoe,
            events,
            actions,
            encoder,
            reward_helpers,
            profiler,
            action_success,
            last_rewards,
            episode_rewards,
            agent_order,
            move_action_flags,
            ..
        } = self;

        // ── ② Events ──────────────────────────────────────────────────────
        profiler.measure(Phase::Events, || {
            events.fire_due(world, rules, step);
            drain_destruction(world, aoe);
        });

        // ── ③ Actions ─────────────────────────────────────────────────────
        profiler.measure(Phase::Actions, || {
            // Optional second channel: vibe selections, fixed agent order.
            if let Some(vibes) = &bufs.vibe_actions {
                for (i, &v) in vibes.iter().enumerate() {
                    if v >= 0 {
                        let oid = world.agent_object(AgentId(i as u32));
                        if let Some(obj) = world.grid.get_mut(oid) {
                            obj.vibe = v.min(u8::MAX as i32) as u8;
                        }
                    }
                }
            }

            agent_order.clear();
            agent_order.extend((0..num_agents as u32).map(AgentId));
            world.rng.shuffle(agent_order);

            // Priority classes resolve high → low; within a class, the
            // shuffled order holds.  Invalid indices burn with class 0.
            for class in (0..=actions.max_priority()).rev() {
                for &agent in agent_order.iter() {
                    let wire = bufs.actions[agent.index()];
                    let belongs = match actions.priority_of(wire) {
                        Some(p) => p == class,
                        None => class == 0,
                    };
                    if belongs {
                        action_success[agent.index()] =
                            actions.dispatch(world, rules, agent, wire);
                    }
                }
            }
            drain_destruction(world, aoe);
        });

        // ── ④ On-tick handlers, shield upkeep ─────────────────────────────
        profiler.measure(Phase::OnTick, || {
            for i in 0..num_agents {
                let agent = AgentId(i as u32);
                let oid = world.agent_object(agent);
                if oid == ObjectId::INVALID {
                    continue;
                }
                let hook = rules.hooks_for(world.grid[oid].type_id).on_tick;
                if hook != mg_core::HandlerId::INVALID {
                    let mut ctx = HandlerCtx::between(&mut *world, rules, oid, oid);
                    rules.multi_handler(hook).dispatch(&mut ctx);
                }
                actions.shield_upkeep(world, agent);
            }
            drain_destruction(world, aoe);
        });

        // ── ⑤ AOE ─────────────────────────────────────────────────────────
        profiler.measure(Phase::Aoe, || {
            for i in 0..num_agents {
                aoe.apply_fixed(world, rules, AgentId(i as u32));
            }
            aoe.apply_mobile(world, rules);
            drain_destruction(world, aoe);
        });

        // ── ⑥ Held stats ──────────────────────────────────────────────────
        profiler.measure(Phase::HeldStats, || world.accumulate_held_stats());

        // ── ⑦ Observations ────────────────────────────────────────────────
        profiler.measure(Phase::Observe, || {
            for i in 0..num_agents {
                let wire = bufs.actions[i];
                let input = AgentObsInput {
                    last_action: wire,
                    last_action_is_move: usize::try_from(wire)
                        .ok()
                        .and_then(|w| move_action_flags.get(w).copied())
                        .unwrap_or(false),
                    last_reward: last_rewards[i],
                };
                let row = bufs.obs_row_mut(i, encoder.num_tokens());
                encoder.encode_into(world, rules, aoe, AgentId(i as u32), &input, row);
            }
        });

        // ── ⑧ Rewards ─────────────────────────────────────────────────────
        profiler.measure(Phase::Rewards, || {
            for i in 0..num_agents {
                let r = reward_helpers[i].compute(world, rules, AgentId(i as u32));
                bufs.rewards[i] += r;
                episode_rewards[i] += r as f64;
                last_rewards[i] = r;
            }
        });

        // ── ⑨ Horizon ─────────────────────────────────────────────────────
        if step >= world.max_steps {
            if self.episode_truncates {
                bufs.truncations.fill(true);
            } else {
                bufs.terminals.fill(true);
            }
            self.profiler.report();
        }
        self.profiler.step_done();
    }

    /// Encode every agent's observation row (initial state and step ⑦).
    fn write_observations(&mut self, bufs: &mut Buffers) {
        let Self {
            world,
            rules,
            aoe,
            encoder,
            last_rewards,
            move_action_flags,
            ..
        } = self;
        for i in 0..world.num_agents() {
            let wire = bufs.actions[i];
            let input = AgentObsInput {
                last_action: wire,
                last_action_is_move: usize::try_from(wire)
                    .ok()
                    .and_then(|w| move_action_flags.get(w).copied())
                    .unwrap_or(false),
                last_reward: last_rewards[i],
            };
            let row = bufs.obs_row_mut(i, encoder.num_tokens());
            encoder.encode_into(world, rules, aoe, AgentId(i as u32), &input, row);
        }
    }

    // ── Inspection (off the hot path) ─────────────────────────────────────

    pub fn current_step(&self) -> u64 {
        self.world.current_step
    }

    pub fn num_agents(&self) -> usize {
        self.world.num_agents()
    }

    /// Whether each agent's most recent action succeeded.
    pub fn action_success(&self) -> &[bool] {
        &self.action_success
    }

    /// Per-agent reward sums over the episode so far.
    pub fn episode_rewards(&self) -> &[f64] {
        &self.episode_rewards
    }

    /// Game-level stats snapshot.
    pub fn episode_stats(&self) -> BTreeMap<String, f64> {
        self.world.stats.to_map()
    }

    pub fn agent_stat(&self, agent: AgentId, name: &str) -> f64 {
        self.world.agent_stats[agent.index()].get(name)
    }

    pub fn collective_stat(&self, collective: &str, name: &str) -> f64 {
        self.world
            .collectives
            .iter()
            .find(|c| c.name == collective)
            .map_or(0.0, |c| c.stats.get(name))
    }

    /// Token accounting of the latest observation pass for one agent.
    pub fn token_counts(&self, agent: AgentId) -> TokenCounts {
        self.encoder.last_counts(agent)
    }

    /// Overwrite one resource amount on an agent (host/testing API).
    pub fn set_inventory(&mut self, agent: AgentId, resource: ResourceId, amount: u32) {
        let oid = self.world.agent_object(agent);
        if let Some(obj) = self.world.grid.get_mut(oid) {
            obj.inventory.set(resource, amount);
        }
    }

    /// Location of an agent (host/testing API).
    pub fn agent_location(&self, agent: AgentId) -> GridLocation {
        self.world.agent_location(agent)
    }

    /// Snapshot every live object's attributes, keyed by object id.
    pub fn grid_objects(&self) -> BTreeMap<u32, ObjectInfo> {
        self.world
            .grid
            .iter()
            .map(|obj| {
                let info = ObjectInfo {
                    type_name: self
                        .type_names
                        .get(obj.type_id.index())
                        .cloned()
                        .unwrap_or_default(),
                    location: (obj.location.row, obj.location.col),
                    vibe: obj.vibe,
                    tags: obj.tag_bits.iter().map(|t| t.0).collect(),
                    inventory: obj
                        .inventory
                        .iter_nonzero()
                        .map(|(r, n)| (self.world.resource_names[r.index()].clone(), n))
                        .collect(),
                    collective: (obj.collective != CollectiveId::INVALID)
                        .then(|| self.world.collectives[obj.collective.index()].name.clone()),
                    agent_id: obj.agent_id().map(|a| a.0),
                    frozen_until_step: obj.agent.as_ref().map(|a| a.frozen_until_step),
                };
                (obj.id.0, info)
            })
            .collect()
    }

    /// Read access for integration tests and embedding hosts.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Destroy everything mutations queued, tearing AOE sources down first so
/// balancing exits land while the object is still in the grid.
fn drain_destruction(world: &mut World, aoe: &mut AoeTracker) {
    while !world.pending_destruction.is_empty() {
        let batch = std::mem::take(&mut world.pending_destruction);
        for id in batch {
            aoe.unregister_object(world, id);
            world.destroy(id);
        }
    }
}
