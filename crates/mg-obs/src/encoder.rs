//! The dual-path observation encoder.

use log::warn;

use mg_aoe::AoeTracker;
use mg_core::{
    location::{pack_coord, LOCATION_GLOBAL, MAX_PACKABLE_COORD},
    AgentId, CollectiveId, GridLocation, Layer, ObjectId,
};
use mg_rules::{GameValue, HandlerCtx, Rules};
use mg_world::World;

use crate::tokens::{FeatureIds, TokenCounts, TokenWriter};

// ── Config ────────────────────────────────────────────────────────────────────

/// Which global token groups are emitted.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlobalObsFlags {
    pub episode_completion_pct: bool,
    pub last_action: bool,
    pub last_reward: bool,
    pub goal: bool,
    pub local_position: bool,
}

impl Default for GlobalObsFlags {
    fn default() -> Self {
        Self {
            episode_completion_pct: true,
            last_action: true,
            last_reward: true,
            goal: true,
            local_position: true,
        }
    }
}

/// Construction-time parameters of the encoder.
#[derive(Clone, Debug)]
pub struct ObsEncoderConfig {
    /// Window height; odd, ≤ 15.
    pub obs_height: u16,
    /// Window width; odd, ≤ 15.
    pub obs_width: u16,
    /// Records per agent row.
    pub num_tokens: usize,
    pub features: FeatureIds,
    /// Inventory amounts are divided by this base before packing into the
    /// token value byte (base ≤ 1 packs raw amounts).
    pub token_value_base: u32,
    /// `(feature_id, goal_value)` pairs — one per reward-relevant resource.
    pub goal_tokens: Vec<(u8, u8)>,
    pub global_obs: GlobalObsFlags,
    /// Extra global tokens resolved from game values each tick.
    pub obs_values: Vec<(u8, GameValue)>,
    /// Which path fills the host buffer.
    pub use_optimized: bool,
    /// Run both paths and compare bytes (doubles encoding cost).
    pub validate: bool,
}

/// Per-agent inputs that vary by tick.
#[derive(Copy, Clone, Debug, Default)]
pub struct AgentObsInput {
    pub last_action: i32,
    pub last_action_is_move: bool,
    pub last_reward: f32,
}

// ── Encoder ───────────────────────────────────────────────────────────────────

/// Encodes one agent's observation row per call.
///
/// Holds the precomputed Manhattan scan table (offsets and packed location
/// bytes) for the optimised path, a shadow buffer for validation mode, and
/// last-pass token accounting per agent.
pub struct ObsEncoder {
    cfg: ObsEncoderConfig,
    /// `(dr, dc, packed location byte)` in Manhattan order.
    scan: Vec<(i32, i32, u8)>,
    shadow: Vec<u8>,
    counts: Vec<TokenCounts>,
    /// Token overflow is logged once per environment, not per tick.
    overflow_warned: bool,
}

impl ObsEncoder {
    /// Panics in debug builds on an even or oversized window; the builder
    /// validates first, so this is a backstop.
    pub fn new(cfg: ObsEncoderConfig, num_agents: usize) -> Self {
        debug_assert!(cfg.obs_height % 2 == 1 && cfg.obs_width % 2 == 1);
        debug_assert!(cfg.obs_height <= MAX_PACKABLE_COORD + 1);
        debug_assert!(cfg.obs_width <= MAX_PACKABLE_COORD + 1);

        let mut scan = Vec::with_capacity(cfg.obs_height as usize * cfg.obs_width as usize);
        let (rh, rw) = (cfg.obs_height as i32 / 2, cfg.obs_width as i32 / 2);
        for_each_manhattan_offset(rh, rw, |dr, dc| {
            let loc = pack_coord((dr + rh) as u16, (dc + rw) as u16);
            scan.push((dr, dc, loc));
        });

        let shadow = vec![0u8; cfg.num_tokens * 3];
        Self {
            cfg,
            scan,
            shadow,
            counts: vec![TokenCounts::default(); num_agents],
            overflow_warned: false,
        }
    }

    pub fn num_tokens(&self) -> usize {
        self.cfg.num_tokens
    }

    /// Token accounting of the most recent pass for `agent`.
    pub fn last_counts(&self, agent: AgentId) -> TokenCounts {
        self.counts[agent.index()]
    }

    /// Encode one agent's row into `out` (`3 * num_tokens` bytes).
    ///
    /// In validation mode the secondary path encodes into the shadow buffer
    /// and any byte difference is reported (and fatal in debug builds).
    pub fn encode_into(
        &mut self,
        world: &mut World,
        rules: &Rules,
        aoe: &AoeTracker,
        agent: AgentId,
        input: &AgentObsInput,
        out: &mut [u8],
    ) {
        debug_assert_eq!(out.len(), self.cfg.num_tokens * 3);

        let counts = if self.cfg.use_optimized {
            self.encode_optimized(world, rules, aoe, agent, input, out)
        } else {
            self.encode_original(world, rules, aoe, agent, input, out)
        };
        self.counts[agent.index()] = counts;
        world.stats.add("obs.tokens_written", counts.written as f64);
        world.stats.add("obs.tokens_dropped", counts.dropped as f64);
        world.stats.add("obs.tokens_free_space", counts.free as f64);
        if counts.dropped > 0 && !self.overflow_warned {
            self.overflow_warned = true;
            warn!(
                "observation buffer overflow: {} tokens dropped for agent {agent} \
                 (num_tokens = {})",
                counts.dropped, self.cfg.num_tokens
            );
        }

        if self.cfg.validate {
            let mut shadow = std::mem::take(&mut self.shadow);
            if self.cfg.use_optimized {
                self.encode_original(world, rules, aoe, agent, input, &mut shadow);
            } else {
                self.encode_optimized(world, rules, aoe, agent, input, &mut shadow);
            }
            if shadow[..] != out[..] {
                warn!("observation paths diverged for agent {agent}");
                debug_assert!(false, "observation path divergence");
            }
            self.shadow = shadow;
        }
    }

    // ── The two paths ─────────────────────────────────────────────────────

    /// Generator path: scan offsets derived on the fly.
    fn encode_original(
        &self,
        world: &mut World,
        rules: &Rules,
        aoe: &AoeTracker,
        agent: AgentId,
        input: &AgentObsInput,
        out: &mut [u8],
    ) -> TokenCounts {
        let mut w = TokenWriter::new(out);
        let Some(view) = AgentView::of(world, agent) else {
            return w.finish();
        };
        self.emit_globals(world, rules, &view, input, &mut w);

        let (rh, rw) = (self.cfg.obs_height as i32 / 2, self.cfg.obs_width as i32 / 2);
        for_each_manhattan_offset(rh, rw, |dr, dc| {
            let loc = pack_coord((dr + rh) as u16, (dc + rw) as u16);
            self.emit_cell(world, aoe, &view, dr, dc, loc, &mut w);
        });
        w.finish()
    }

    /// Optimised path: precomputed offsets and location bytes.
    fn encode_optimized(
        &self,
        world: &mut World,
        rules: &Rules,
        aoe: &AoeTracker,
        agent: AgentId,
        input: &AgentObsInput,
        out: &mut [u8],
    ) -> TokenCounts {
        let mut w = TokenWriter::new(out);
        let Some(view) = AgentView::of(world, agent) else {
            return w.finish();
        };
        self.emit_globals(world, rules, &view, input, &mut w);

        for &(dr, dc, loc) in &self.scan {
            self.emit_cell(world, aoe, &view, dr, dc, loc, &mut w);
        }
        w.finish()
    }

    // ── Shared emitters ───────────────────────────────────────────────────

    fn emit_globals(
        &self,
        world: &mut World,
        rules: &Rules,
        view: &AgentView,
        input: &AgentObsInput,
        w: &mut TokenWriter<'_>,
    ) {
        let f = &self.cfg.features;
        let flags = &self.cfg.global_obs;
        let g = LOCATION_GLOBAL;

        if flags.episode_completion_pct {
            let pct = if world.max_steps == 0 {
                0.0
            } else {
                world.current_step as f64 / world.max_steps as f64
            };
            w.write(g, f.episode_completion_pct, (pct * 100.0).round() as u8);
        }
        if flags.last_action {
            w.write(g, f.last_action, input.last_action.clamp(0, 255) as u8);
            w.write(g, f.last_action_move, input.last_action_is_move as u8);
        }
        if flags.last_reward {
            w.write(g, f.last_reward, pack_reward(input.last_reward));
        }

        if flags.goal {
            for &(feature, value) in &self.cfg.goal_tokens {
                w.write(g, feature, value);
            }
        }

        if flags.local_position {
            // Displacement from spawn, one token per direction.
            let (loc, spawn) = (view.location, view.spawn);
            w.write(g, f.lp_north, clamp255(spawn.row.saturating_sub(loc.row)));
            w.write(g, f.lp_south, clamp255(loc.row.saturating_sub(spawn.row)));
            w.write(g, f.lp_west, clamp255(spawn.col.saturating_sub(loc.col)));
            w.write(g, f.lp_east, clamp255(loc.col.saturating_sub(spawn.col)));
        }

        for (feature, value) in &self.cfg.obs_values {
            let mut ctx = HandlerCtx::between(&mut *world, rules, view.object, view.object);
            let v = value.resolve(&mut ctx);
            w.write(g, *feature, v.clamp(0.0, 255.0) as u8);
        }
    }

    fn emit_cell(
        &self,
        world: &mut World,
        aoe: &AoeTracker,
        view: &AgentView,
        dr: i32,
        dc: i32,
        loc_byte: u8,
        w: &mut TokenWriter<'_>,
    ) {
        let Some(cell) = view.location.offset(dr, dc) else {
            return;
        };
        if !world.grid.in_bounds(cell) {
            return;
        }
        let f = &self.cfg.features;

        if let Some((mask, territory)) = aoe.fixed_observability_at(world, cell, view.collective) {
            w.write(loc_byte, f.aoe_mask, mask as u8);
            w.write(loc_byte, f.territory, territory as u8);
        }

        // Agents occlude the structure underneath.
        let mut id = world.grid.id_at(cell, Layer::Agent);
        if id == ObjectId::INVALID {
            id = world.grid.id_at(cell, Layer::Object);
        }
        if id == ObjectId::INVALID {
            return;
        }

        let step = world.current_step;
        let obj = &mut world.grid[id];
        obj.visited = step;

        if let Some(collective_feature) = f.collective {
            if obj.collective != CollectiveId::INVALID {
                w.write(loc_byte, collective_feature, obj.collective.0 as u8 + 1);
            }
        }
        for tag in obj.tag_bits.iter() {
            w.write(loc_byte, f.tag, tag.0 as u8);
        }
        if obj.vibe != 0 {
            w.write(loc_byte, f.vibe, obj.vibe);
        }
        for (res, amount) in obj.inventory.iter_nonzero() {
            let packed = if self.cfg.token_value_base <= 1 {
                amount.min(255)
            } else {
                (amount / self.cfg.token_value_base).min(255)
            };
            w.write(loc_byte, f.inventory[res.index()], packed as u8);
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// The observing agent's per-pass snapshot.
struct AgentView {
    object: ObjectId,
    location: GridLocation,
    spawn: GridLocation,
    collective: CollectiveId,
}

impl AgentView {
    fn of(world: &World, agent: AgentId) -> Option<Self> {
        let object = world.agent_object(agent);
        let obj = world.grid.get(object)?;
        let state = obj.agent.as_ref()?;
        Some(Self {
            object,
            location: obj.location,
            spawn: state.spawn_location,
            collective: obj.collective,
        })
    }
}

/// Walk window offsets by non-decreasing `|dr| + |dc|`; within one ring,
/// by ascending `dr`, negative `dc` before positive.  Both encoder paths
/// and the precomputed table derive from this single definition.
pub(crate) fn for_each_manhattan_offset(rh: i32, rw: i32, mut f: impl FnMut(i32, i32)) {
    for d in 0..=(rh + rw) {
        for dr in -rh..=rh {
            let rem = d - dr.abs();
            if rem < 0 || rem > rw {
                continue;
            }
            if rem == 0 {
                f(dr, 0);
            } else {
                f(dr, -rem);
                f(dr, rem);
            }
        }
    }
}

#[inline]
fn clamp255(v: u16) -> u8 {
    v.min(255) as u8
}

/// Rewards are packed as `round(r * 100)` saturated into the value byte.
#[inline]
fn pack_reward(r: f32) -> u8 {
    ((r * 100.0).round()).clamp(0.0, 255.0) as u8
}
