//! Action definitions.

use mg_core::{Orientation, ResourceId};
use mg_rules::AttackMutation;

/// Parameters of the attack action.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackActionConfig {
    /// How many cells ahead (in facing direction) to search for a victim.
    pub range: u32,
    /// Combat resolution, shared with the mutation runtime.
    pub attack: AttackMutation,
}

/// What a single action entry does when dispatched.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionKind {
    Noop,

    /// Step one cell in an absolute direction (also turns the agent).
    Move(Orientation),

    /// Turn in place.
    Rotate(Orientation),

    /// Attack the first agent within range in the facing direction.
    Attack(AttackActionConfig),

    /// Raise a shield: set the agent's vibe.  Upkeep is charged per tick
    /// while raised; the shield drops when the agent can't pay.
    Shield {
        vibe: u8,
        upkeep: Vec<(ResourceId, u32)>,
    },

    /// Invoke the facing object's on-use handler (first match wins).
    Use,

    /// Hand resources to the agent directly ahead.
    Gift { resource: ResourceId, amount: u32 },

    /// Exchange positions with the occupant of the facing cell.
    Swap,

    /// Set the agent's vibe to a configured value.
    ChangeVibe(u8),
}

/// One entry of the flattened action space.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionDef {
    /// Stat key component (`action.<name>` on success, `.failed` otherwise).
    pub name: String,

    pub kind: ActionKind,

    /// Dispatch class; higher classes resolve strictly before lower ones.
    pub priority: u8,

    /// Must be held (not spent) for the action to validate.
    pub required: Vec<(ResourceId, u32)>,

    /// Deducted on success, after all validation.
    pub consumed: Vec<(ResourceId, u32)>,
}

impl ActionDef {
    /// A bare action with no resource gates and priority 0.
    pub fn new(name: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            priority: 0,
            required: Vec::new(),
            consumed: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn requiring(mut self, resource: ResourceId, amount: u32) -> Self {
        self.required.push((resource, amount));
        self
    }

    pub fn consuming(mut self, resource: ResourceId, amount: u32) -> Self {
        self.consumed.push((resource, amount));
        self
    }
}
