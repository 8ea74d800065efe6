//! `mg-core` — foundational types for the mettagrid simulation core.
//!
//! This crate is a dependency of every other `mg-*` crate.  It intentionally
//! has no `mg-*` dependencies and minimal external ones (only `rand`,
//! `rustc-hash`, and `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module       | Contents                                                |
//! |--------------|---------------------------------------------------------|
//! | [`ids`]      | `ObjectId`, `AgentId`, `TagId`, `ResourceId`, …         |
//! | [`location`] | `GridLocation`, `Layer`, `Orientation`, distance metrics|
//! | [`rng`]      | `EnvRng` — the single deterministic RNG stream          |
//! | [`stats`]    | `StatsTracker` — string-keyed counters with id interning|
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.          |

pub mod ids;
pub mod location;
pub mod rng;
pub mod stats;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use ids::{
    AgentId, CollectiveId, EventId, HandlerId, ObjectId, QueryId, ResourceId, SourceId, StatId,
    TagId, TypeId,
};
pub use location::{GridLocation, Layer, Orientation, NUM_LAYERS};
pub use rng::EnvRng;
pub use stats::StatsTracker;
