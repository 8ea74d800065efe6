//! `mg-aoe` — area-of-effect fields: registration, presence accounting,
//! territory collapse, and the per-tick application passes.
//!
//! # Storage model
//!
//! Sources live in one arena ([`SourceId`][mg_core::SourceId] handles); fixed
//! sources additionally appear in every cell bucket their radius covers, so
//! the same source is shared across many cells without shared ownership.
//! Mobile sources sit in a flat list and re-evaluate against agent positions
//! every tick.
//!
//! # Ordering (normative)
//!
//! Per agent, fixed sources apply enemy → other → friendly: damage lands
//! before healing so a heal can never be clamped away and then re-damaged.
//! All resource deltas against the agent being processed — presence deltas
//! and mutation effects alike — defer into one net map and clamp exactly
//! once at the end of the pass.

pub mod config;
pub mod territory;
pub mod tracker;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{AoeConfig, AoeConfigId};
pub use territory::{Territory, TERRITORY_TIP_EXCLUSION_MIN_RADIUS};
pub use tracker::AoeTracker;
