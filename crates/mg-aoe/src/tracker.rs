//! The AOE tracker: source arena, cell buckets, and the per-tick passes.

use rustc_hash::FxHashMap;

use mg_core::{AgentId, CollectiveId, GridLocation, ObjectId, SourceId};
use mg_rules::{all_pass, mutation, DeferredDeltas, HandlerCtx, Rules};
use mg_world::World;

use crate::{
    config::{AoeConfig, AoeConfigId},
    territory::{covers, Collapse, Territory},
};

/// One materialised field: a source object emitting one config.
#[derive(Debug)]
struct AoeSource {
    object: ObjectId,
    config: AoeConfigId,
    /// Agents currently inside (mobile sources only; fixed presence is
    /// tracked per agent in `inside_fixed`).
    inside: Vec<AgentId>,
}

/// Registration, presence accounting, and application of all AOE fields.
pub struct AoeTracker {
    height: u16,
    width: u16,
    configs: Vec<AoeConfig>,
    sources: Vec<Option<AoeSource>>,
    free: Vec<SourceId>,
    /// Per cell: fixed sources covering it, in registration order.
    fixed_buckets: Vec<Vec<SourceId>>,
    /// Mobile sources in registration order.
    mobile: Vec<SourceId>,
    /// Sources emitted by each object, for teardown.
    by_object: FxHashMap<ObjectId, Vec<SourceId>>,
    /// Per agent: fixed sources the agent was inside after the last pass.
    inside_fixed: Vec<Vec<SourceId>>,
    /// Net-delta scratch, reused across agents.
    deferred: DeferredDeltas,
}

impl AoeTracker {
    pub fn new(height: u16, width: u16, num_agents: usize) -> Self {
        Self {
            height,
            width,
            configs: Vec::new(),
            sources: Vec::new(),
            free: Vec::new(),
            fixed_buckets: vec![Vec::new(); height as usize * width as usize],
            mobile: Vec::new(),
            by_object: FxHashMap::default(),
            inside_fixed: vec![Vec::new(); num_agents],
            deferred: DeferredDeltas::new(),
        }
    }

    // ── Config arena ──────────────────────────────────────────────────────

    pub fn add_config(&mut self, config: AoeConfig) -> AoeConfigId {
        let id = AoeConfigId(self.configs.len() as u32);
        self.configs.push(config);
        id
    }

    pub fn config(&self, id: AoeConfigId) -> &AoeConfig {
        &self.configs[id.0 as usize]
    }

    // ── Registration ──────────────────────────────────────────────────────

    /// Materialise a source for `object` emitting `config`.
    ///
    /// Fixed sources land in every covered cell bucket immediately; mobile
    /// sources join the flat list.
    pub fn register(&mut self, world: &World, object: ObjectId, config: AoeConfigId) -> SourceId {
        let sid = match self.free.pop() {
            Some(s) => s,
            None => {
                self.sources.push(None);
                SourceId(self.sources.len() as u32 - 1)
            }
        };
        debug_assert!(self.sources[sid.index()].is_none());
        self.sources[sid.index()] = Some(AoeSource {
            object,
            config,
            inside: Vec::new(),
        });

        let cfg = &self.configs[config.0 as usize];
        if cfg.is_static {
            let center = world.grid[object].location;
            let (h, w) = (self.height, self.width);
            for_each_covered_cell(h, w, center, cfg.radius, cfg.controls_territory, |cell| {
                let bucket = &mut self.fixed_buckets[cell];
                debug_assert!(!bucket.contains(&sid), "double AOE registration");
                bucket.push(sid);
            });
        } else {
            self.mobile.push(sid);
        }
        self.by_object.entry(object).or_default().push(sid);
        sid
    }

    /// Tear down every source emitted by `object`, firing balancing exits
    /// for all agents currently inside.  Must run while the object is still
    /// in the grid (its location drives bucket cleanup).
    pub fn unregister_object(&mut self, world: &mut World, object: ObjectId) {
        let Some(sids) = self.by_object.remove(&object) else {
            return;
        };
        let center = world.grid.get(object).map(|o| o.location);

        for sid in sids {
            let Some(src) = self.sources[sid.index()].take() else {
                continue;
            };
            let cfg = &self.configs[src.config.0 as usize];

            if cfg.is_static {
                match center {
                    Some(c) => {
                        let (h, w) = (self.height, self.width);
                        let buckets = &mut self.fixed_buckets;
                        for_each_covered_cell(h, w, c, cfg.radius, cfg.controls_territory, |cell| {
                            buckets[cell].retain(|&x| x != sid);
                        });
                    }
                    // Source object already gone: sweep every bucket.
                    None => {
                        for bucket in &mut self.fixed_buckets {
                            bucket.retain(|&x| x != sid);
                        }
                    }
                }
                for (agent_idx, list) in self.inside_fixed.iter_mut().enumerate() {
                    if let Some(pos) = list.iter().position(|&x| x == sid) {
                        list.remove(pos);
                        exit_deltas(world, AgentId(agent_idx as u32), cfg);
                    }
                }
            } else {
                self.mobile.retain(|&x| x != sid);
                for &agent in &src.inside {
                    exit_deltas(world, agent, cfg);
                }
            }
            self.free.push(sid);
        }
    }

    /// Fire balancing exits for an agent leaving the world.
    pub fn agent_removed(&mut self, world: &mut World, agent: AgentId) {
        let list = std::mem::take(&mut self.inside_fixed[agent.index()]);
        for sid in list {
            if let Some(src) = self.sources[sid.index()].as_ref() {
                let cfg = &self.configs[src.config.0 as usize];
                exit_deltas(world, agent, cfg);
            }
        }
        for &sid in &self.mobile {
            if let Some(src) = self.sources[sid.index()].as_mut() {
                if let Some(pos) = src.inside.iter().position(|&a| a == agent) {
                    src.inside.remove(pos);
                    let cfg = &self.configs[src.config.0 as usize];
                    exit_deltas(world, agent, cfg);
                }
            }
        }
    }

    // ── Fixed pass ────────────────────────────────────────────────────────

    /// Run the fixed-field pass for one agent.
    ///
    /// Ordering per cell: exits for departed fields, territory collapse,
    /// then sources enemy → other → friendly.  Every resource delta aimed
    /// at the agent defers into the net map and settles once at the end.
    pub fn apply_fixed(&mut self, world: &mut World, rules: &Rules, agent: AgentId) {
        let agent_obj = world.agent_object(agent);
        if agent_obj == ObjectId::INVALID {
            return;
        }
        let agent_loc = world.grid[agent_obj].location;
        let agent_col = world.grid[agent_obj].collective;
        let cell = agent_loc.flat_index(self.width);

        self.deferred.begin(agent_obj);
        let bucket = &self.fixed_buckets[cell];

        // Exits for fields the agent has left.
        {
            let inside = &mut self.inside_fixed[agent.index()];
            let mut i = 0;
            while i < inside.len() {
                let sid = inside[i];
                if bucket.contains(&sid) {
                    i += 1;
                    continue;
                }
                if let Some(src) = self.sources[sid.index()].as_ref() {
                    let cfg = &self.configs[src.config.0 as usize];
                    for &(res, delta) in &cfg.presence_deltas {
                        self.deferred.add(res, -delta);
                    }
                }
                inside.remove(i);
            }
        }

        // Territory collapse across controlling sources.
        let mut collapse = Collapse::default();
        for &sid in bucket {
            let Some(src) = self.sources[sid.index()].as_ref() else {
                continue;
            };
            let cfg = &self.configs[src.config.0 as usize];
            if !cfg.controls_territory {
                continue;
            }
            let Some(sobj) = world.grid.get(src.object) else {
                continue;
            };
            let side = Territory::side_of(sobj.collective, agent_col);
            if side != Territory::Neutral {
                collapse.observe(side, sobj.location.euclidean_sq(agent_loc));
            }
        }
        let territory = collapse.resolve();

        // Enemy fields first, then sideless, then friendly: damage must land
        // before healing.
        for side_class in [Territory::Enemy, Territory::Neutral, Territory::Friendly] {
            for &sid in bucket {
                let Some(src) = self.sources[sid.index()].as_ref() else {
                    continue;
                };
                let cfg = &self.configs[src.config.0 as usize];
                let Some(sobj) = world.grid.get(src.object) else {
                    continue;
                };
                let side = Territory::side_of(sobj.collective, agent_col);
                if side != side_class {
                    continue;
                }

                let skip_self = src.object == agent_obj && !cfg.effect_self;
                let now_passes = !skip_self && {
                    let mut ctx = HandlerCtx::between(&mut *world, rules, src.object, agent_obj);
                    all_pass(&cfg.filters, &mut ctx)
                };
                // Territory-controlling fields only act on tiles their side owns.
                let effective = if cfg.controls_territory && side != Territory::Neutral {
                    now_passes && territory == side
                } else {
                    now_passes
                };

                let inside = &mut self.inside_fixed[agent.index()];
                let was_inside = inside.contains(&sid);
                if effective && !was_inside {
                    for &(res, delta) in &cfg.presence_deltas {
                        self.deferred.add(res, delta);
                    }
                    inside.push(sid);
                } else if !effective && was_inside {
                    for &(res, delta) in &cfg.presence_deltas {
                        self.deferred.add(res, -delta);
                    }
                    inside.retain(|&x| x != sid);
                }

                if effective {
                    let mut ctx = HandlerCtx::between(&mut *world, rules, src.object, agent_obj);
                    ctx.deferred = Some(&mut self.deferred);
                    mutation::apply_all(&cfg.mutations, &mut ctx);
                }
            }
        }

        self.deferred.settle(world);
    }

    // ── Mobile pass ───────────────────────────────────────────────────────

    /// Re-evaluate every mobile source against all agents, maintaining the
    /// per-source inside set with the same enter/exit discipline.
    pub fn apply_mobile(&mut self, world: &mut World, rules: &Rules) {
        for mi in 0..self.mobile.len() {
            let sid = self.mobile[mi];
            let Some(src) = self.sources[sid.index()].as_ref() else {
                continue;
            };
            let object = src.object;
            let cfg_id = src.config;
            let Some(sobj) = world.grid.get(object) else {
                continue;
            };
            let sloc = sobj.location;

            let mut inside =
                std::mem::take(&mut self.sources[sid.index()].as_mut().unwrap().inside);
            let cfg = &self.configs[cfg_id.0 as usize];
            let radius_sq = cfg.radius * cfg.radius;

            for a in 0..world.num_agents() {
                let agent = AgentId(a as u32);
                let aobj = world.agent_object(agent);
                if aobj == ObjectId::INVALID {
                    continue;
                }
                let skip_self = object == aobj && !cfg.effect_self;
                let in_radius =
                    sloc.euclidean_sq(world.grid[aobj].location) <= radius_sq;
                let now_passes = in_radius && !skip_self && {
                    let mut ctx = HandlerCtx::between(&mut *world, rules, object, aobj);
                    all_pass(&cfg.filters, &mut ctx)
                };

                let was_inside = inside.contains(&agent);
                if now_passes && !was_inside {
                    enter_deltas(world, agent, cfg);
                    inside.push(agent);
                } else if !now_passes && was_inside {
                    exit_deltas(world, agent, cfg);
                    inside.retain(|&x| x != agent);
                }

                if now_passes {
                    let mut ctx = HandlerCtx::between(&mut *world, rules, object, aobj);
                    mutation::apply_all(&cfg.mutations, &mut ctx);
                }
            }

            self.sources[sid.index()].as_mut().unwrap().inside = inside;
        }
    }

    // ── Observation product ───────────────────────────────────────────────

    /// `(aoe_mask, territory)` of a cell relative to an observer collective.
    ///
    /// The mask collapses over *all* fixed sources covering the cell; the
    /// territory component collapses over territory-controlling sources
    /// only.  `None` when no fixed source covers the cell.
    pub fn fixed_observability_at(
        &self,
        world: &World,
        loc: GridLocation,
        observer: CollectiveId,
    ) -> Option<(Territory, Territory)> {
        let bucket = &self.fixed_buckets[loc.flat_index(self.width)];
        if bucket.is_empty() {
            return None;
        }
        let mut mask = Collapse::default();
        let mut terr = Collapse::default();
        for &sid in bucket {
            let Some(src) = self.sources[sid.index()].as_ref() else {
                continue;
            };
            let cfg = &self.configs[src.config.0 as usize];
            let Some(sobj) = world.grid.get(src.object) else {
                continue;
            };
            let side = Territory::side_of(sobj.collective, observer);
            let d2 = sobj.location.euclidean_sq(loc);
            mask.observe(side, d2);
            if cfg.controls_territory {
                terr.observe(side, d2);
            }
        }
        Some((mask.resolve(), terr.resolve()))
    }

    /// Number of live sources (inspection/tests).
    pub fn num_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.is_some()).count()
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn for_each_covered_cell(
    height: u16,
    width: u16,
    center: GridLocation,
    radius: u32,
    territory_field: bool,
    mut f: impl FnMut(usize),
) {
    let r = radius as i32;
    for dr in -r..=r {
        for dc in -r..=r {
            let Some(cell) = center.offset(dr, dc) else {
                continue;
            };
            if cell.row >= height || cell.col >= width {
                continue;
            }
            if covers(center, cell, radius, territory_field) {
                f(cell.flat_index(width));
            }
        }
    }
}

fn enter_deltas(world: &mut World, agent: AgentId, cfg: &AoeConfig) {
    presence(world, agent, cfg, 1);
}

fn exit_deltas(world: &mut World, agent: AgentId, cfg: &AoeConfig) {
    presence(world, agent, cfg, -1);
}

fn presence(world: &mut World, agent: AgentId, cfg: &AoeConfig, sign: i64) {
    let aobj = world.agent_object(agent);
    let Some(obj) = world.grid.get_mut(aobj) else {
        return;
    };
    for &(res, delta) in &cfg.presence_deltas {
        obj.inventory.apply_delta(res, sign * delta);
    }
}
