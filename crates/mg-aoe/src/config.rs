//! AOE field configuration.

use mg_core::ResourceId;
use mg_rules::{Filter, Mutation};

/// Index of an [`AoeConfig`] in the tracker's config arena.  Objects of the
/// same type share configs; each registration materialises a fresh source.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AoeConfigId(pub u32);

/// One area-of-effect field definition.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AoeConfig {
    /// Euclidean radius: a cell is covered when `dr² + dc² ≤ radius²`.
    pub radius: u32,

    /// Fixed sources pre-enumerate their covered cells at registration;
    /// mobile sources re-evaluate against agent positions each tick.
    pub is_static: bool,

    /// Whether the field affects its own source object.
    pub effect_self: bool,

    /// Participates in territory collapse; its mutations are masked by
    /// tile ownership.
    pub controls_territory: bool,

    /// Applied (+) when an agent enters the field and (−) when it leaves.
    pub presence_deltas: Vec<(ResourceId, i64)>,

    /// Gate: the field only affects targets passing this chain.
    pub filters: Vec<Filter>,

    /// Applied to each target every tick it remains inside.
    pub mutations: Vec<Mutation>,
}

impl AoeConfig {
    /// A fixed field with just a radius — the common test fixture shape.
    pub fn fixed(radius: u32) -> Self {
        Self {
            radius,
            is_static: true,
            effect_self: false,
            controls_territory: false,
            presence_deltas: Vec::new(),
            filters: Vec::new(),
            mutations: Vec::new(),
        }
    }
}
