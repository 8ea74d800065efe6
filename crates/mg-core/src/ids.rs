//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  The inner integer is `pub` to allow
//! direct indexing into dense `Vec` arenas via `id.0 as usize`, but callers
//! should prefer the `.index()` helpers for clarity.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID" — equivalent to the type's MAX.
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Index of a grid object in the grid's dense arena.  Stable from
    /// creation until destruction; slots are recycled afterwards.
    pub struct ObjectId(u32);
}

typed_id! {
    /// Dense agent index in `[0, num_agents)`.  Doubles as the row index
    /// into every host-shared output buffer.
    pub struct AgentId(u32);
}

typed_id! {
    /// Index of a collective (team/faction), assigned alphabetically by name.
    pub struct CollectiveId(u16);
}

typed_id! {
    /// Index of a tag.  Bounded by the tag-bitset capacity (256).
    pub struct TagId(u16);
}

typed_id! {
    /// Index of an inventory resource kind.
    pub struct ResourceId(u16);
}

typed_id! {
    /// Index of an object type in the config-built type table.
    pub struct TypeId(u16);
}

typed_id! {
    /// Interned stat-name slot inside a `StatsTracker`.
    pub struct StatId(u32);
}

typed_id! {
    /// Index of a query definition in the rule set.
    pub struct QueryId(u16);
}

typed_id! {
    /// Index of a handler (filter chain + mutation chain) in the rule arena.
    pub struct HandlerId(u32);
}

typed_id! {
    /// Index of a materialised AOE source in the tracker's arena.
    pub struct SourceId(u32);
}

typed_id! {
    /// Index of a scheduled event definition.
    pub struct EventId(u16);
}
