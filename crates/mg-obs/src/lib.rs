//! `mg-obs` — per-agent tokenised observations and reward resolution.
//!
//! # Token stream
//!
//! Each agent's observation is a `(num_tokens, 3)` byte array of
//! `(location, feature, value)` records: global records first (location
//! `0xFE`), then spatial records over the observation window in
//! Manhattan-distance order.  Unwritten trailing records are `0xFF` filler.
//!
//! # Two encoders, one byte stream
//!
//! The generator path derives scan offsets on the fly; the optimised path
//! walks tables precomputed at construction (offsets *and* packed location
//! bytes).  Both funnel into the same per-cell emitter, and an optional
//! validation mode runs them side by side and compares output bytes.
//!
//! | Module      | Contents                                               |
//! |-------------|--------------------------------------------------------|
//! | [`tokens`]  | `FeatureIds`, `TokenWriter`, packing constants         |
//! | [`encoder`] | the dual-path `ObsEncoder`                             |
//! | [`reward`]  | `RewardHelper` — resolved per-entry read strategies    |

pub mod encoder;
pub mod reward;
pub mod tokens;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use encoder::{AgentObsInput, GlobalObsFlags, ObsEncoder, ObsEncoderConfig};
pub use reward::{Aggregation, RewardConfig, RewardEntryConfig, RewardHelper};
pub use tokens::{FeatureIds, TokenCounts, TokenWriter};
