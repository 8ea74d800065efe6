//! The action set and per-action dispatch.

use mg_core::{AgentId, GridLocation, Layer, ObjectId, Orientation, ResourceId};
use mg_rules::{HandlerCtx, Mutation, Rules};
use mg_world::World;

use crate::config::{ActionDef, ActionKind, AttackActionConfig};

/// The flattened action space: wire integer → [`ActionDef`].
pub struct ActionSet {
    actions: Vec<ActionDef>,
    max_priority: u8,
}

impl ActionSet {
    pub fn new(actions: Vec<ActionDef>) -> Self {
        let max_priority = actions.iter().map(|a| a.priority).max().unwrap_or(0);
        Self {
            actions,
            max_priority,
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn defs(&self) -> &[ActionDef] {
        &self.actions
    }

    /// Highest declared priority class.
    pub fn max_priority(&self) -> u8 {
        self.max_priority
    }

    /// Priority class of a wire action, or `None` if out of range.
    pub fn priority_of(&self, wire: i32) -> Option<u8> {
        usize::try_from(wire)
            .ok()
            .and_then(|i| self.actions.get(i))
            .map(|a| a.priority)
    }

    // ── Dispatch ──────────────────────────────────────────────────────────

    /// Execute `wire` for `agent`.  Returns success; failure paths record a
    /// stat and leave the world untouched.
    pub fn dispatch(&self, world: &mut World, rules: &Rules, agent: AgentId, wire: i32) -> bool {
        let Some(def) = usize::try_from(wire).ok().and_then(|i| self.actions.get(i)) else {
            world.agent_stats[agent.index()].add("action.invalid_index", 1.0);
            return false;
        };

        let agent_obj = world.agent_object(agent);
        if agent_obj == ObjectId::INVALID {
            return false;
        }

        // Frozen agents can only idle.
        if !matches!(def.kind, ActionKind::Noop)
            && world.grid[agent_obj].is_frozen(world.current_step)
        {
            world.agent_stats[agent.index()].add("action.frozen", 1.0);
            return false;
        }

        // Resource gates: `required` must be held, `consumed` must be
        // affordable.  Nothing is deducted until the action succeeds.
        let holds = |world: &World, needs: &[(ResourceId, u32)]| {
            let inv = &world.grid[agent_obj].inventory;
            needs.iter().all(|&(r, n)| inv.amount(r) >= n)
        };
        if !holds(world, &def.required) || !holds(world, &def.consumed) {
            world.agent_stats[agent.index()].add(&format!("action.{}.failed", def.name), 1.0);
            return false;
        }

        let ok = match &def.kind {
            ActionKind::Noop => true,
            ActionKind::Move(dir) => do_move(world, agent_obj, *dir),
            ActionKind::Rotate(dir) => do_rotate(world, agent_obj, *dir),
            ActionKind::Attack(cfg) => do_attack(world, rules, agent_obj, cfg),
            ActionKind::Shield { vibe, .. } => do_change_vibe(world, agent_obj, *vibe),
            ActionKind::Use => do_use(world, rules, agent_obj),
            ActionKind::Gift { resource, amount } => do_gift(world, agent_obj, *resource, *amount),
            ActionKind::Swap => do_swap(world, agent_obj),
            ActionKind::ChangeVibe(vibe) => do_change_vibe(world, agent_obj, *vibe),
        };

        let stats = &mut world.agent_stats[agent.index()];
        if !ok {
            stats.add(&format!("action.{}.failed", def.name), 1.0);
            return false;
        }
        stats.add(&format!("action.{}", def.name), 1.0);

        if !def.consumed.is_empty() {
            let inv = &mut world.grid[agent_obj].inventory;
            for &(r, n) in &def.consumed {
                inv.apply_delta(r, -(n as i64));
            }
        }
        true
    }

    // ── Shield upkeep ─────────────────────────────────────────────────────

    /// Charge per-tick shield upkeep for `agent`; the shield drops (vibe
    /// resets to 0) the tick the agent can no longer pay in full.
    pub fn shield_upkeep(&self, world: &mut World, agent: AgentId) {
        let agent_obj = world.agent_object(agent);
        if agent_obj == ObjectId::INVALID {
            return;
        }
        for def in &self.actions {
            let ActionKind::Shield { vibe, upkeep } = &def.kind else {
                continue;
            };
            if world.grid[agent_obj].vibe != *vibe || upkeep.is_empty() {
                continue;
            }
            let inv = &mut world.grid[agent_obj].inventory;
            let affordable = upkeep.iter().all(|&(r, n)| inv.amount(r) >= n);
            if affordable {
                for &(r, n) in upkeep {
                    inv.apply_delta(r, -(n as i64));
                }
            } else {
                world.grid[agent_obj].vibe = 0;
            }
        }
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// The cell `steps` ahead of the agent's facing direction, if on the map.
fn facing_cell(world: &World, agent_obj: ObjectId, steps: i32) -> Option<GridLocation> {
    let obj = &world.grid[agent_obj];
    let (dr, dc) = obj.agent.as_ref()?.orientation.delta();
    let loc = obj.location.offset(dr * steps, dc * steps)?;
    world.grid.in_bounds(loc).then_some(loc)
}

fn do_move(world: &mut World, agent_obj: ObjectId, dir: Orientation) -> bool {
    let (dr, dc) = dir.delta();
    let Some(dest) = world.grid[agent_obj].location.offset(dr, dc) else {
        return false;
    };
    if !world.grid.is_free(dest, Layer::Agent) {
        return false;
    }
    // Structures block unless marked passable.
    if let Some(blocker) = world.grid.object_at(dest, Layer::Object) {
        if !blocker.passable {
            return false;
        }
    }
    let moved = world.grid.move_object(agent_obj, dest);
    debug_assert!(moved);
    if let Some(agent) = world.grid[agent_obj].agent.as_mut() {
        agent.orientation = dir;
    }
    true
}

fn do_rotate(world: &mut World, agent_obj: ObjectId, dir: Orientation) -> bool {
    match world.grid[agent_obj].agent.as_mut() {
        Some(agent) => {
            agent.orientation = dir;
            true
        }
        None => false,
    }
}

fn do_attack(
    world: &mut World,
    rules: &Rules,
    agent_obj: ObjectId,
    cfg: &AttackActionConfig,
) -> bool {
    // First victim in the facing line wins.
    let mut victim = ObjectId::INVALID;
    for step in 1..=cfg.range as i32 {
        let Some(cell) = facing_cell(world, agent_obj, step) else {
            break;
        };
        let id = world.grid.id_at(cell, Layer::Agent);
        if id != ObjectId::INVALID {
            victim = id;
            break;
        }
    }
    if victim == ObjectId::INVALID {
        return false;
    }
    // The mutation draws the hit roll and will not apply without a weapon;
    // gate here so a weaponless attack reports failure without an RNG draw.
    if world.grid[agent_obj].inventory.amount(cfg.attack.weapon) == 0 {
        return false;
    }
    let mut ctx = HandlerCtx::between(world, rules, agent_obj, victim);
    Mutation::Attack(cfg.attack.clone()).apply(&mut ctx);
    true
}

fn do_use(world: &mut World, rules: &Rules, agent_obj: ObjectId) -> bool {
    // The facing cell's structure, falling back to the one underfoot.
    let target = facing_cell(world, agent_obj, 1)
        .map(|c| world.grid.id_at(c, Layer::Object))
        .filter(|&id| id != ObjectId::INVALID)
        .unwrap_or_else(|| {
            world
                .grid
                .id_at(world.grid[agent_obj].location, Layer::Object)
        });
    if target == ObjectId::INVALID {
        return false;
    }
    let handler = rules.hooks_for(world.grid[target].type_id).on_use;
    if handler == mg_core::HandlerId::INVALID {
        return false;
    }
    let mut ctx = HandlerCtx::between(world, rules, agent_obj, target);
    rules.multi_handler(handler).dispatch(&mut ctx)
}

fn do_gift(world: &mut World, agent_obj: ObjectId, resource: ResourceId, amount: u32) -> bool {
    let Some(cell) = facing_cell(world, agent_obj, 1) else {
        return false;
    };
    let recipient = world.grid.id_at(cell, Layer::Agent);
    if recipient == ObjectId::INVALID {
        return false;
    }
    let Some((giver, receiver)) = world.grid.pair_mut(agent_obj, recipient) else {
        return false;
    };
    let have = giver.inventory.amount(resource) as i64;
    let want = (amount as i64).min(have);
    if want == 0 {
        return false;
    }
    let moved = receiver.inventory.apply_delta(resource, want);
    giver.inventory.apply_delta(resource, -moved);
    moved > 0
}

fn do_swap(world: &mut World, agent_obj: ObjectId) -> bool {
    let Some(cell) = facing_cell(world, agent_obj, 1) else {
        return false;
    };
    let other_agent = world.grid.id_at(cell, Layer::Agent);
    if other_agent != ObjectId::INVALID {
        return world.grid.swap_objects(agent_obj, other_agent);
    }
    // Cross-layer: pull the structure underfoot-wards and step into its cell.
    let structure = world.grid.id_at(cell, Layer::Object);
    if structure == ObjectId::INVALID {
        return false;
    }
    let own_loc = world.grid[agent_obj].location;
    if !world.grid.is_free(own_loc, Layer::Object) {
        return false;
    }
    let pulled = world.grid.move_object(structure, own_loc);
    debug_assert!(pulled);
    let stepped = world.grid.move_object(agent_obj, cell);
    debug_assert!(stepped);
    true
}

fn do_change_vibe(world: &mut World, agent_obj: ObjectId, vibe: u8) -> bool {
    world.grid[agent_obj].vibe = vibe;
    true
}
