//! `mg-events` — scheduled world events.
//!
//! # Why a sparse map
//!
//! Most ticks fire no events.  Definitions register their timesteps in a
//! `BTreeMap<u64, Vec<EventId>>` once at construction; each tick the
//! orchestrator removes exactly its own key — O(log W) where W is the number
//! of distinct future firing steps, and zero work on quiet ticks.
//!
//! Events at the same timestep fire in config order.  A firing event whose
//! filter chain matches no target immediately fires its fallback (if any),
//! chaining until an event lands or the chain runs out.

use std::collections::BTreeMap;

use log::debug;

use mg_core::{EventId, TagId};
use mg_rules::{all_pass, mutation, Filter, HandlerCtx, Mutation, Rules};
use mg_world::World;


/// Fallback chains longer than this indicate a configuration cycle.
const MAX_FALLBACK_DEPTH: usize = 8;

// ── EventConfig ───────────────────────────────────────────────────────────────

/// One scheduled event definition.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventConfig {
    /// Stat key component; also useful in logs.
    pub name: String,

    /// Steps at which this event fires.
    pub timesteps: Vec<u64>,

    /// Candidate pool: the bucket of this tag.
    pub target_tag: TagId,

    /// Narrow the candidates (actor-less context).
    pub filters: Vec<Filter>,

    /// Applied to each surviving target, in bucket order.
    pub mutations: Vec<Mutation>,

    /// Cap on targets per firing; `None` = unlimited.
    pub max_targets: Option<u32>,

    /// Fired immediately when this event matches no target.
    pub fallback: Option<EventId>,
}

// ── EventScheduler ────────────────────────────────────────────────────────────

/// Holds all event definitions and their firing schedule.
pub struct EventScheduler {
    events: Vec<EventConfig>,
    /// step → events due, in config order.
    by_step: BTreeMap<u64, Vec<EventId>>,
}

impl EventScheduler {
    /// Index every definition's timesteps.  Iterating definitions in config
    /// order makes each step's firing list config-ordered for free.
    pub fn new(events: Vec<EventConfig>) -> Self {
        let mut by_step: BTreeMap<u64, Vec<EventId>> = BTreeMap::new();
        for (i, event) in events.iter().enumerate() {
            for &t in &event.timesteps {
                by_step.entry(t).or_default().push(EventId(i as u16));
            }
        }
        Self { events, by_step }
    }

    pub fn num_events(&self) -> usize {
        self.events.len()
    }

    /// Fire everything scheduled for `step`.
    pub fn fire_due(&mut self, world: &mut World, rules: &Rules, step: u64) {
        let Some(due) = self.by_step.remove(&step) else {
            return;
        };
        for eid in due {
            self.fire(world, rules, eid, 0);
        }
    }

    /// Fire one event; on zero matches, chase the fallback chain.
    fn fire(&self, world: &mut World, rules: &Rules, eid: EventId, depth: usize) {
        debug_assert!(depth < MAX_FALLBACK_DEPTH, "event fallback cycle");
        if depth >= MAX_FALLBACK_DEPTH {
            return;
        }
        let event = &self.events[eid.index()];

        // Candidates in stable bucket order.
        let mut buf = world.scratch.take();
        buf.extend(world.tag_index.objects_with(event.target_tag));

        let cap = event.max_targets.map_or(usize::MAX, |m| m as usize);
        let mut hit = 0usize;
        for i in 0..buf.len() {
            if hit >= cap {
                break;
            }
            let target = buf[i];
            let mut ctx = HandlerCtx::of(&mut *world, rules, target);
            if !all_pass(&event.filters, &mut ctx) {
                continue;
            }
            mutation::apply_all(&event.mutations, &mut ctx);
            hit += 1;
        }
        world.scratch.put(buf);

        if hit > 0 {
            world.stats.add(&format!("event.{}.targets", event.name), hit as f64);
            return;
        }

        debug!("event {} matched no target", event.name);
        if let Some(fallback) = event.fallback {
            self.fire(world, rules, fallback, depth + 1);
        }
    }
}
