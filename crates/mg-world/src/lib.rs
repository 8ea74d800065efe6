//! `mg-world` — mutable world state: grid, objects, tags, collectives.
//!
//! Everything that *changes* during a tick lives here; everything that
//! *defines behaviour* (filters, mutations, queries, handlers) lives in
//! `mg-rules` and is immutable after construction.  That split is what lets
//! rule code take `&Rules` and `&mut World` simultaneously without fighting
//! the borrow checker.
//!
//! # What lives here
//!
//! | Module         | Contents                                             |
//! |----------------|------------------------------------------------------|
//! | [`tag_bits`]   | 256-bit per-object tag set                           |
//! | [`inventory`]  | capped resource counts with shared limit tables      |
//! | [`object`]     | `GridObject` + `AgentState`                          |
//! | [`collective`] | teams with shared inventory and stats                |
//! | [`grid`]       | dense 2-layer cell storage + object arena            |
//! | [`tag_index`]  | reverse tag → objects index with stable ordering     |
//! | [`world`]      | the `World` aggregate and cross-cutting operations   |

pub mod collective;
pub mod error;
pub mod grid;
pub mod inventory;
pub mod object;
pub mod tag_bits;
pub mod tag_index;
pub mod world;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use collective::Collective;
pub use error::{WorldError, WorldResult};
pub use grid::Grid;
pub use inventory::{Inventory, InventoryLimits};
pub use object::{AgentState, GridObject};
pub use tag_bits::{TagBits, MAX_TAGS};
pub use tag_index::TagIndex;
pub use world::{QueryCaches, World};
