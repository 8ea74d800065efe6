//! `mg-actions` — the agent action space.
//!
//! # Flattened action space
//!
//! The host sends one integer per agent per tick.  Every parameterised
//! action (each movement direction, each rotation, each vibe change) is its
//! own entry in the [`ActionSet`], so the wire integer is simply an index.
//!
//! # Contract
//!
//! Every handler validates *all* preconditions before touching anything:
//! a failed action leaves the world byte-identical, records a stat, and
//! reports `false`.  Consumed resources are only deducted on success.

pub mod config;
pub mod dispatch;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{ActionDef, ActionKind, AttackActionConfig};
pub use dispatch::ActionSet;
