//! The `World` aggregate — all mutable simulation state under one root.
//!
//! Rule evaluation takes `(&Rules, &mut World)`; nothing in here knows what a
//! filter or a query *means*, only how to store their mutable residue
//! (tag membership, cached query results, stats).

use mg_core::{AgentId, CollectiveId, EnvRng, GridLocation, ObjectId, QueryId, StatsTracker, TagId};

use crate::{Collective, Grid, GridObject, TagIndex, WorldResult};

// ── QueryCaches ───────────────────────────────────────────────────────────────

/// Storage for materialised query results and their dirty bits.
///
/// The mapping from tags to the queries whose predicates touch them is built
/// once from the rule set; `World` consults it on every tag change so caches
/// invalidate without the world knowing query semantics.
#[derive(Default)]
pub struct QueryCaches {
    results: Vec<Vec<ObjectId>>,
    dirty: Vec<bool>,
    materialised: Vec<bool>,
    tag_to_queries: Vec<Vec<QueryId>>,
}

impl QueryCaches {
    pub fn new(num_queries: usize, num_tags: usize) -> Self {
        Self {
            results: vec![Vec::new(); num_queries],
            dirty: vec![true; num_queries],
            materialised: vec![false; num_queries],
            tag_to_queries: vec![Vec::new(); num_tags],
        }
    }

    /// Declare `query` materialised, invalidated by changes to `touches`.
    pub fn declare_materialised(&mut self, query: QueryId, touches: &[TagId]) {
        self.materialised[query.index()] = true;
        self.dirty[query.index()] = true;
        for &tag in touches {
            self.tag_to_queries[tag.index()].push(query);
        }
    }

    /// `false` for queries the caches were never sized for (unit tests that
    /// skip cache setup).
    #[inline]
    pub fn is_materialised(&self, query: QueryId) -> bool {
        self.materialised.get(query.index()).copied().unwrap_or(false)
    }

    #[inline]
    pub fn is_dirty(&self, query: QueryId) -> bool {
        self.dirty.get(query.index()).copied().unwrap_or(true)
    }

    /// Mark one query's cache stale.
    pub fn mark_dirty(&mut self, query: QueryId) {
        if let Some(d) = self.dirty.get_mut(query.index()) {
            *d = true;
        }
    }

    /// Mark every cache touching `tag` stale.
    pub fn invalidate_tag(&mut self, tag: TagId) {
        if let Some(queries) = self.tag_to_queries.get(tag.index()) {
            for &q in queries {
                self.dirty[q.index()] = true;
            }
        }
    }

    /// Cached result (valid only when `!is_dirty`).
    #[inline]
    pub fn result(&self, query: QueryId) -> &[ObjectId] {
        &self.results[query.index()]
    }

    /// Store a freshly computed result and clear the dirty bit.
    ///
    /// Swaps buffers instead of moving so the caller gets the old cache
    /// allocation back (to return to the scratch pool).
    pub fn store(&mut self, query: QueryId, result: &mut Vec<ObjectId>) {
        std::mem::swap(&mut self.results[query.index()], result);
        self.dirty[query.index()] = false;
    }
}

// ── ScratchPool ───────────────────────────────────────────────────────────────

/// A pool of reusable `Vec<ObjectId>` buffers for query evaluation and
/// filter scans.  After a warmup tick or two the pool reaches its steady
/// size and the hot path stops allocating.
#[derive(Default)]
pub struct ScratchPool {
    pool: Vec<Vec<ObjectId>>,
}

impl ScratchPool {
    /// Borrow a cleared buffer (allocates only while the pool is warming up).
    pub fn take(&mut self) -> Vec<ObjectId> {
        self.pool.pop().unwrap_or_default()
    }

    /// Return a buffer to the pool.
    pub fn put(&mut self, mut buf: Vec<ObjectId>) {
        buf.clear();
        self.pool.push(buf);
    }
}

// ── World ─────────────────────────────────────────────────────────────────────

/// All mutable state of one environment instance.
pub struct World {
    pub grid: Grid,
    pub tag_index: TagIndex,
    pub collectives: Vec<Collective>,

    /// Game-level stats (`game.*`, action counters, token accounting).
    pub stats: StatsTracker,

    /// `AgentId` → arena id of the agent's object.
    pub agents: Vec<ObjectId>,

    /// Per-agent stats, indexed by `AgentId`.
    pub agent_stats: Vec<StatsTracker>,

    /// Resource names, indexed by `ResourceId` (for stat keys and inspection).
    pub resource_names: Vec<String>,

    pub current_step: u64,
    pub max_steps: u64,

    /// Per-tick seed for randomly ordered queries; redrawn by the
    /// orchestrator at the top of every tick.
    pub tick_seed: u64,

    pub rng: EnvRng,

    pub query_caches: QueryCaches,

    pub scratch: ScratchPool,

    /// Objects queued for destruction by mutations.  Drained by the
    /// orchestrator between phases (never mid-chain) so ids stay valid for
    /// the duration of any handler application.
    pub pending_destruction: Vec<ObjectId>,
}

impl World {
    pub fn new(
        grid: Grid,
        num_tags: usize,
        collectives: Vec<Collective>,
        resource_names: Vec<String>,
        num_agents: usize,
        max_steps: u64,
        seed: u32,
    ) -> Self {
        Self {
            grid,
            tag_index: TagIndex::new(num_tags),
            collectives,
            stats: StatsTracker::new(),
            agents: vec![ObjectId::INVALID; num_agents],
            agent_stats: vec![StatsTracker::new(); num_agents],
            resource_names,
            current_step: 0,
            max_steps,
            tick_seed: 0,
            rng: EnvRng::new(seed),
            query_caches: QueryCaches::default(),
            scratch: ScratchPool::default(),
            pending_destruction: Vec::new(),
        }
    }

    pub fn num_agents(&self) -> usize {
        self.agents.len()
    }

    /// Arena id of an agent's object.
    #[inline]
    pub fn agent_object(&self, agent: AgentId) -> ObjectId {
        self.agents[agent.index()]
    }

    /// Location of an agent.
    #[inline]
    pub fn agent_location(&self, agent: AgentId) -> GridLocation {
        self.grid[self.agent_object(agent)].location
    }

    // ── Object lifecycle (cross-structure) ────────────────────────────────

    /// Insert an object, registering its tags and agent slot.
    pub fn spawn(&mut self, obj: GridObject) -> WorldResult<ObjectId> {
        let tags = obj.tag_bits;
        let agent_id = obj.agent_id();
        let id = self.grid.insert(obj)?;
        for tag in tags.iter() {
            self.tag_index.on_tag_added(id, tag);
            self.query_caches.invalidate_tag(tag);
        }
        if let Some(a) = agent_id {
            self.agents[a.index()] = id;
        }
        Ok(id)
    }

    /// Remove an object, tearing down tag registrations.
    ///
    /// The AOE tracker holds its own per-object source bookkeeping and must
    /// be told separately (the orchestrator owns that coupling).
    pub fn destroy(&mut self, id: ObjectId) -> Option<GridObject> {
        let obj = self.grid.remove(id)?;
        self.tag_index.unregister_object(&obj);
        for tag in obj.tag_bits.iter() {
            self.query_caches.invalidate_tag(tag);
        }
        if let Some(a) = obj.agent_id() {
            self.agents[a.index()] = ObjectId::INVALID;
        }
        Some(obj)
    }

    // ── Tag membership ────────────────────────────────────────────────────

    /// Add `tag` to an object.  Returns `true` if membership changed.
    /// On-tag handler dispatch is the rule layer's job, not ours.
    pub fn add_tag(&mut self, id: ObjectId, tag: TagId) -> bool {
        if !self.grid[id].tag_bits.set(tag) {
            return false;
        }
        self.tag_index.on_tag_added(id, tag);
        self.query_caches.invalidate_tag(tag);
        true
    }

    /// Remove `tag` from an object.  Returns `true` if membership changed.
    pub fn remove_tag(&mut self, id: ObjectId, tag: TagId) -> bool {
        if !self.grid[id].tag_bits.clear(tag) {
            return false;
        }
        self.tag_index.on_tag_removed(id, tag);
        self.query_caches.invalidate_tag(tag);
        true
    }

    // ── Collectives ───────────────────────────────────────────────────────

    pub fn collective(&self, id: CollectiveId) -> Option<&Collective> {
        self.collectives.get(id.index())
    }

    /// Credit every aligned agent's current holdings to its collective's
    /// held-stats.  Called once per tick by the orchestrator.
    pub fn accumulate_held_stats(&mut self) {
        // Split borrow: grid read-only, collectives mutable.
        let grid = &self.grid;
        let collectives = &mut self.collectives;
        for &oid in &self.agents {
            if oid == ObjectId::INVALID {
                continue;
            }
            let obj = &grid[oid];
            if obj.collective == CollectiveId::INVALID {
                continue;
            }
            let collective = &mut collectives[obj.collective.index()];
            for (res, amount) in obj.inventory.iter_nonzero() {
                collective.accumulate_held(res.index(), amount);
            }
        }
    }
}
