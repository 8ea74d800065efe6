//! `GridObject` — every entity in the world — and the agent specialisation.

use mg_core::{AgentId, CollectiveId, GridLocation, Layer, ObjectId, Orientation, TypeId};

use crate::{Inventory, TagBits};

// ── AgentState ────────────────────────────────────────────────────────────────

/// State carried only by acting objects.
#[derive(Debug, Clone)]
pub struct AgentState {
    /// Dense agent index; also the row into every host-shared buffer.
    pub agent_id: AgentId,

    /// Where the agent entered the world.
    pub spawn_location: GridLocation,

    /// Current facing direction.
    pub orientation: Orientation,

    /// The agent cannot act while `current_step < frozen_until_step`.
    pub frozen_until_step: u64,
}

impl AgentState {
    pub fn new(agent_id: AgentId, spawn_location: GridLocation) -> Self {
        Self {
            agent_id,
            spawn_location,
            orientation: Orientation::default(),
            frozen_until_step: 0,
        }
    }

    #[inline]
    pub fn is_frozen(&self, current_step: u64) -> bool {
        current_step < self.frozen_until_step
    }
}

// ── GridObject ────────────────────────────────────────────────────────────────

/// One entity in the world: agent, wall, or structure.
///
/// Behavioural hooks (on-use, on-tick, on-tag handlers, AOE emissions) are
/// *not* stored here — they are keyed by `type_id` in the immutable rule set
/// so that all objects of a type share one definition and the object itself
/// stays plain mutable data.
#[derive(Debug, Clone)]
pub struct GridObject {
    /// Arena slot, assigned by [`Grid::insert`][crate::Grid::insert].
    /// `ObjectId::INVALID` until inserted.
    pub id: ObjectId,

    /// Object type, mapped to a name via the config-built type table.
    pub type_id: TypeId,

    pub location: GridLocation,

    /// Occupancy layer.  Agents are always on [`Layer::Agent`].
    pub layer: Layer,

    /// Whether agents may walk onto this object's cell.  Walls and
    /// structures default to blocking; meaningless for agents (the agent
    /// layer always excludes).
    pub passable: bool,

    /// Discrete per-object mode consumed by filters and the vibe actions.
    pub vibe: u8,

    /// Exactly the union of tags added to this object.
    pub tag_bits: TagBits,

    pub inventory: Inventory,

    /// Last step at which an observer's scan covered this cell.
    pub visited: u64,

    /// Owning collective, or `CollectiveId::INVALID` for none.
    pub collective: CollectiveId,

    /// Present iff this object is an agent.
    pub agent: Option<AgentState>,
}

impl GridObject {
    /// A non-agent object with empty tags and inventory per `inventory`.
    pub fn new(type_id: TypeId, location: GridLocation, inventory: Inventory) -> Self {
        Self {
            id: ObjectId::INVALID,
            type_id,
            location,
            layer: Layer::Object,
            passable: false,
            vibe: 0,
            tag_bits: TagBits::EMPTY,
            inventory,
            visited: 0,
            collective: CollectiveId::INVALID,
            agent: None,
        }
    }

    /// An agent object.
    pub fn new_agent(
        type_id: TypeId,
        location: GridLocation,
        inventory: Inventory,
        agent_id: AgentId,
    ) -> Self {
        Self {
            layer: Layer::Agent,
            agent: Some(AgentState::new(agent_id, location)),
            ..Self::new(type_id, location, inventory)
        }
    }

    #[inline]
    pub fn is_agent(&self) -> bool {
        self.agent.is_some()
    }

    /// The dense agent index, if this object is an agent.
    #[inline]
    pub fn agent_id(&self) -> Option<AgentId> {
        self.agent.as_ref().map(|a| a.agent_id)
    }

    #[inline]
    pub fn is_frozen(&self, current_step: u64) -> bool {
        match &self.agent {
            Some(a) => a.is_frozen(current_step),
            None => false,
        }
    }

    /// `true` if both objects belong to the same (valid) collective.
    #[inline]
    pub fn same_collective(&self, other: &GridObject) -> bool {
        self.collective != CollectiveId::INVALID && self.collective == other.collective
    }
}
