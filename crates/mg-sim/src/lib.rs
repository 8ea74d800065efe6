//! `mg-sim` — the environment: configuration, assembly, host buffers, and
//! the per-tick step orchestrator.
//!
//! # Tick anatomy
//!
//! ```text
//! step():
//!   ① bookkeeping — clear rewards/success, advance the step counter,
//!      draw the tick seed
//!   ② events      — fire everything scheduled for this step
//!   ③ actions     — shuffle agents, dispatch priority classes high → low
//!   ④ on-tick     — per-agent tick handlers and shield upkeep
//!   ⑤ AOE         — apply_fixed per agent, then apply_mobile
//!   ⑥ held stats  — credit collective holdings
//!   ⑦ observe     — encode every agent's token row
//!   ⑧ reward      — resolve reward entries, accumulate episode sums
//!   ⑨ horizon     — truncate or terminate at max_steps
//! ```
//!
//! Determinism: the only RNG consumers are the agent shuffle (one call per
//! tick), stochastic mutations (in dispatch order), and per-tick child
//! streams for randomly ordered queries.  Identical `(config, map, seed,
//! action stream)` yields identical output buffers, bit for bit.
//!
//! | Module      | Contents                                               |
//! |-------------|--------------------------------------------------------|
//! | [`config`]  | `GameConfig`, `ObjectConfig`, `CollectiveConfig`       |
//! | [`map`]     | symbol-grid parsing                                    |
//! | [`buffers`] | host-shared output arrays                              |
//! | [`builder`] | `EnvBuilder` — validation and assembly                 |
//! | [`env`]     | `MettaGrid` — step loop and inspection API             |
//! | [`profile`] | optional per-phase timing                              |
//! | [`batch`]   | Rayon batch stepping (`parallel` feature)              |

pub mod buffers;
pub mod builder;
pub mod config;
pub mod env;
pub mod error;
pub mod map;
pub mod profile;

#[cfg(feature = "parallel")]
pub mod batch;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use buffers::Buffers;
pub use builder::EnvBuilder;
pub use config::{CollectiveConfig, GameConfig, ObjectConfig};
pub use env::MettaGrid;
pub use error::{BuildError, EnvError, EnvResult};

#[cfg(feature = "parallel")]
pub use batch::step_batch;
