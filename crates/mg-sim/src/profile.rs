//! Optional per-phase wall-clock timing.
//!
//! Enabled by config or `METTAGRID_PROFILING=1`.  Timing never feeds back
//! into simulation state, so enabling it cannot perturb determinism; the
//! cost when disabled is one branch per phase.

use std::time::{Duration, Instant};

use log::debug;

/// Step phases, in execution order.
#[derive(Copy, Clone, Debug)]
pub enum Phase {
    Events = 0,
    Actions = 1,
    OnTick = 2,
    Aoe = 3,
    HeldStats = 4,
    Observe = 5,
    Rewards = 6,
}

const PHASE_NAMES: [&str; 7] = [
    "events",
    "actions",
    "on_tick",
    "aoe",
    "held_stats",
    "observe",
    "rewards",
];

/// Accumulates wall time per phase across an episode.
pub struct PhaseProfiler {
    enabled: bool,
    totals: [Duration; 7],
    steps: u64,
}

impl PhaseProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            totals: [Duration::ZERO; 7],
            steps: 0,
        }
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Run `f`, attributing its wall time to `phase`.
    #[inline]
    pub fn measure<T>(&mut self, phase: Phase, f: impl FnOnce() -> T) -> T {
        if !self.enabled {
            return f();
        }
        let start = Instant::now();
        let out = f();
        self.totals[phase as usize] += start.elapsed();
        out
    }

    pub fn step_done(&mut self) {
        self.steps += 1;
    }

    /// Log the accumulated per-phase totals (µs per step averages).
    pub fn report(&self) {
        if !self.enabled || self.steps == 0 {
            return;
        }
        for (name, total) in PHASE_NAMES.iter().zip(self.totals.iter()) {
            debug!(
                "phase {name}: {:.1} µs/step over {} steps",
                total.as_secs_f64() * 1e6 / self.steps as f64,
                self.steps
            );
        }
    }
}
