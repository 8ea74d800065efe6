//! Unit tests for mg-aoe.

use std::sync::Arc;

use mg_core::{AgentId, CollectiveId, GridLocation, ObjectId, ResourceId, TagId, TypeId};
use mg_rules::{ctx::EntityRef, Filter, Mutation, Rules};
use mg_world::{Collective, Grid, GridObject, Inventory, InventoryLimits, World};

use crate::{
    territory::{covers, Collapse},
    AoeConfig, AoeTracker, Territory,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

const HP: ResourceId = ResourceId(0);
const MANA: ResourceId = ResourceId(1);

fn loc(r: u16, c: u16) -> GridLocation {
    GridLocation::new(r, c)
}

fn limits() -> Arc<InventoryLimits> {
    Arc::new(InventoryLimits::uniform(2, 10))
}

fn test_world(num_agents: usize) -> World {
    let names = vec!["hp".to_string(), "mana".to_string()];
    let collectives = vec![
        Collective::new(
            CollectiveId(0),
            "blue".into(),
            Inventory::new(Arc::new(InventoryLimits::unlimited(2))),
            &names,
        ),
        Collective::new(
            CollectiveId(1),
            "red".into(),
            Inventory::new(Arc::new(InventoryLimits::unlimited(2))),
            &names,
        ),
    ];
    World::new(Grid::new(12, 12), 8, collectives, names, num_agents, 100, 5)
}

fn spawn_agent(w: &mut World, at: GridLocation, id: u32, collective: CollectiveId) -> ObjectId {
    let mut a = GridObject::new_agent(TypeId(1), at, Inventory::new(limits()), AgentId(id));
    a.collective = collective;
    w.spawn(a).unwrap()
}

fn spawn_source(w: &mut World, at: GridLocation, collective: CollectiveId) -> ObjectId {
    let mut o = GridObject::new(TypeId(0), at, Inventory::new(limits()));
    o.collective = collective;
    w.spawn(o).unwrap()
}

fn heal_config(radius: u32, delta: i64) -> AoeConfig {
    AoeConfig {
        mutations: vec![Mutation::ResourceDelta {
            entity: EntityRef::Target,
            resource: HP,
            delta,
        }],
        ..AoeConfig::fixed(radius)
    }
}

// ── Coverage geometry ─────────────────────────────────────────────────────────

#[cfg(test)]
mod coverage {
    use super::*;

    #[test]
    fn euclidean_disc() {
        let c = loc(5, 5);
        assert!(covers(c, loc(5, 5), 2, false));
        assert!(covers(c, loc(5, 7), 2, false));
        assert!(covers(c, loc(6, 6), 2, false)); // d² = 2
        assert!(!covers(c, loc(7, 7), 2, false)); // d² = 8
    }

    #[test]
    fn territory_fields_drop_cardinal_tips_at_r2() {
        let c = loc(5, 5);
        for tip in [loc(3, 5), loc(7, 5), loc(5, 3), loc(5, 7)] {
            assert!(covers(c, tip, 2, false));
            assert!(!covers(c, tip, 2, true));
        }
        // Diagonal boundary cells survive.
        assert!(covers(c, loc(6, 6), 2, true));
    }

    #[test]
    fn small_territory_fields_keep_tips() {
        let c = loc(5, 5);
        assert!(covers(c, loc(5, 6), 1, true));
        assert!(covers(c, loc(4, 5), 1, true));
    }
}

// ── Territory collapse ────────────────────────────────────────────────────────

#[cfg(test)]
mod collapse {
    use super::*;

    #[test]
    fn nearer_side_wins_tie_is_neutral() {
        let mut c = Collapse::default();
        c.observe(Territory::Friendly, 4);
        c.observe(Territory::Enemy, 9);
        assert_eq!(c.resolve(), Territory::Friendly);

        let mut c = Collapse::default();
        c.observe(Territory::Friendly, 4);
        c.observe(Territory::Enemy, 4);
        assert_eq!(c.resolve(), Territory::Neutral);

        let mut c = Collapse::default();
        c.observe(Territory::Enemy, 1);
        assert_eq!(c.resolve(), Territory::Enemy);

        assert_eq!(Collapse::default().resolve(), Territory::Neutral);
    }
}

// ── Fixed pass ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod fixed {
    use super::*;

    #[test]
    fn enter_tick_exit_presence_accounting() {
        let mut w = test_world(1);
        let rules = Rules::empty();
        let mut tracker = AoeTracker::new(12, 12, 1);

        let src = spawn_source(&mut w, loc(5, 5), CollectiveId(0));
        let cfg = tracker.add_config(AoeConfig {
            presence_deltas: vec![(MANA, 2)],
            ..AoeConfig::fixed(2)
        });
        tracker.register(&w, src, cfg);

        let a = spawn_agent(&mut w, loc(5, 6), 0, CollectiveId(0));

        // Enter: +2.
        tracker.apply_fixed(&mut w, &rules, AgentId(0));
        assert_eq!(w.grid[a].inventory.amount(MANA), 2);

        // Still inside: no repeat.
        tracker.apply_fixed(&mut w, &rules, AgentId(0));
        assert_eq!(w.grid[a].inventory.amount(MANA), 2);

        // Leave: −2.
        w.grid.move_object(a, loc(0, 0));
        tracker.apply_fixed(&mut w, &rules, AgentId(0));
        assert_eq!(w.grid[a].inventory.amount(MANA), 0);
    }

    #[test]
    fn overlapping_heals_clamp_once_on_net() {
        let mut w = test_world(1);
        let rules = Rules::empty();
        let mut tracker = AoeTracker::new(12, 12, 1);

        let h1 = spawn_source(&mut w, loc(5, 4), CollectiveId(0));
        let h2 = spawn_source(&mut w, loc(5, 7), CollectiveId(0));
        let cfg = tracker.add_config(heal_config(2, 3));
        tracker.register(&w, h1, cfg);
        tracker.register(&w, h2, cfg);

        let a = spawn_agent(&mut w, loc(5, 5), 0, CollectiveId(0));
        w.grid[a].inventory.set(HP, 8);

        tracker.apply_fixed(&mut w, &rules, AgentId(0));
        // Net +6 against cap 10 from hp 8: exactly 10, not double-clamped.
        assert_eq!(w.grid[a].inventory.amount(HP), 10);
    }

    #[test]
    fn enemy_damage_lands_before_friendly_heal() {
        let mut w = test_world(1);
        let rules = Rules::empty();
        let mut tracker = AoeTracker::new(12, 12, 1);

        // Enemy field drains 4 hp, friendly field heals 3.
        let enemy = spawn_source(&mut w, loc(5, 4), CollectiveId(1));
        let friend = spawn_source(&mut w, loc(5, 6), CollectiveId(0));
        let drain = tracker.add_config(heal_config(2, -4));
        let heal = tracker.add_config(heal_config(2, 3));
        tracker.register(&w, enemy, drain);
        tracker.register(&w, friend, heal);

        let a = spawn_agent(&mut w, loc(5, 5), 0, CollectiveId(0));
        w.grid[a].inventory.set(HP, 10);

        tracker.apply_fixed(&mut w, &rules, AgentId(0));
        // Net −1 regardless of order; the net map guarantees it.
        assert_eq!(w.grid[a].inventory.amount(HP), 9);
    }

    #[test]
    fn filters_gate_the_field() {
        let mut w = test_world(1);
        let rules = Rules::empty();
        let mut tracker = AoeTracker::new(12, 12, 1);

        let src = spawn_source(&mut w, loc(5, 5), CollectiveId(0));
        let cfg = tracker.add_config(AoeConfig {
            filters: vec![Filter::Tag {
                entity: EntityRef::Target,
                tag: TagId(3),
            }],
            ..heal_config(2, 1)
        });
        tracker.register(&w, src, cfg);

        let a = spawn_agent(&mut w, loc(5, 5), 0, CollectiveId(0));
        tracker.apply_fixed(&mut w, &rules, AgentId(0));
        assert_eq!(w.grid[a].inventory.amount(HP), 0);

        w.add_tag(a, TagId(3));
        tracker.apply_fixed(&mut w, &rules, AgentId(0));
        assert_eq!(w.grid[a].inventory.amount(HP), 1);
    }

    #[test]
    fn territory_masks_controlling_fields() {
        let mut w = test_world(3);
        let rules = Rules::empty();
        let mut tracker = AoeTracker::new(12, 12, 3);

        // Friendly source at (5,5), enemy at (5,7), both radius 3,
        // both controlling, both granting 1 mana while inside.
        let friend = spawn_source(&mut w, loc(5, 5), CollectiveId(0));
        let enemy = spawn_source(&mut w, loc(5, 7), CollectiveId(1));
        let cfg = tracker.add_config(AoeConfig {
            controls_territory: true,
            mutations: vec![Mutation::ResourceDelta {
                entity: EntityRef::Target,
                resource: MANA,
                delta: 1,
            }],
            ..AoeConfig::fixed(3)
        });
        tracker.register(&w, friend, cfg);
        tracker.register(&w, enemy, cfg);

        // Observer collective 0: (5,6) is equidistant ⇒ neutral ⇒ neither
        // field applies; (5,5) is friendly ground; (5,7) enemy ground.
        let mid = spawn_agent(&mut w, loc(5, 6), 0, CollectiveId(0));
        let home = spawn_agent(&mut w, loc(5, 4), 1, CollectiveId(0));
        let away = spawn_agent(&mut w, loc(5, 8), 2, CollectiveId(0));

        tracker.apply_fixed(&mut w, &rules, AgentId(0));
        tracker.apply_fixed(&mut w, &rules, AgentId(1));
        tracker.apply_fixed(&mut w, &rules, AgentId(2));

        assert_eq!(w.grid[mid].inventory.amount(MANA), 0); // tie ⇒ nothing
        assert_eq!(w.grid[home].inventory.amount(MANA), 1); // friendly only
        assert_eq!(w.grid[away].inventory.amount(MANA), 1); // enemy only
    }

    #[test]
    fn effect_self_controls_self_application() {
        let mut w = test_world(1);
        let rules = Rules::empty();
        let mut tracker = AoeTracker::new(12, 12, 1);

        // The agent itself is the source.
        let a = spawn_agent(&mut w, loc(5, 5), 0, CollectiveId(0));
        let no_self = tracker.add_config(heal_config(2, 1));
        tracker.register(&w, a, no_self);
        tracker.apply_fixed(&mut w, &rules, AgentId(0));
        assert_eq!(w.grid[a].inventory.amount(HP), 0);

        let mut tracker = AoeTracker::new(12, 12, 1);
        let with_self = tracker.add_config(AoeConfig {
            effect_self: true,
            ..heal_config(2, 1)
        });
        tracker.register(&w, a, with_self);
        tracker.apply_fixed(&mut w, &rules, AgentId(0));
        assert_eq!(w.grid[a].inventory.amount(HP), 1);
    }

    #[test]
    fn unregister_fires_balancing_exits() {
        let mut w = test_world(1);
        let rules = Rules::empty();
        let mut tracker = AoeTracker::new(12, 12, 1);

        let src = spawn_source(&mut w, loc(5, 5), CollectiveId(0));
        let cfg = tracker.add_config(AoeConfig {
            presence_deltas: vec![(MANA, 3)],
            ..AoeConfig::fixed(2)
        });
        tracker.register(&w, src, cfg);

        let a = spawn_agent(&mut w, loc(5, 6), 0, CollectiveId(0));
        tracker.apply_fixed(&mut w, &rules, AgentId(0));
        assert_eq!(w.grid[a].inventory.amount(MANA), 3);

        tracker.unregister_object(&mut w, src);
        assert_eq!(w.grid[a].inventory.amount(MANA), 0);
        assert_eq!(tracker.num_sources(), 0);

        // Next pass sees an empty bucket and does nothing.
        tracker.apply_fixed(&mut w, &rules, AgentId(0));
        assert_eq!(w.grid[a].inventory.amount(MANA), 0);
    }
}

// ── Mobile pass ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod mobile {
    use super::*;

    #[test]
    fn mobile_field_follows_its_carrier() {
        let mut w = test_world(2);
        let rules = Rules::empty();
        let mut tracker = AoeTracker::new(12, 12, 2);

        // Agent 0 carries an aura granting 1 mana per tick within radius 1.
        let carrier = spawn_agent(&mut w, loc(5, 5), 0, CollectiveId(0));
        let other = spawn_agent(&mut w, loc(5, 6), 1, CollectiveId(0));
        let cfg = tracker.add_config(AoeConfig {
            is_static: false,
            presence_deltas: vec![(MANA, 1)],
            ..AoeConfig::fixed(1)
        });
        tracker.register(&w, carrier, cfg);

        tracker.apply_mobile(&mut w, &rules);
        assert_eq!(w.grid[other].inventory.amount(MANA), 1);

        // Carrier walks away: exit fires.
        w.grid.move_object(carrier, loc(9, 9));
        tracker.apply_mobile(&mut w, &rules);
        assert_eq!(w.grid[other].inventory.amount(MANA), 0);
    }

    #[test]
    fn mobile_respects_effect_self() {
        let mut w = test_world(1);
        let rules = Rules::empty();
        let mut tracker = AoeTracker::new(12, 12, 1);

        let carrier = spawn_agent(&mut w, loc(5, 5), 0, CollectiveId(0));
        let cfg = tracker.add_config(AoeConfig {
            is_static: false,
            effect_self: true,
            mutations: vec![Mutation::ResourceDelta {
                entity: EntityRef::Target,
                resource: HP,
                delta: 1,
            }],
            ..AoeConfig::fixed(0)
        });
        tracker.register(&w, carrier, cfg);

        tracker.apply_mobile(&mut w, &rules);
        assert_eq!(w.grid[carrier].inventory.amount(HP), 1);
    }
}

// ── Observability ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod observability {
    use super::*;

    #[test]
    fn mask_and_territory_per_observer() {
        let mut w = test_world(0);
        let mut tracker = AoeTracker::new(12, 12, 0);

        let friend = spawn_source(&mut w, loc(5, 5), CollectiveId(0));
        let enemy = spawn_source(&mut w, loc(5, 7), CollectiveId(1));
        let cfg = tracker.add_config(AoeConfig {
            controls_territory: true,
            ..AoeConfig::fixed(3)
        });
        tracker.register(&w, friend, cfg);
        tracker.register(&w, enemy, cfg);

        let obs = |t: &AoeTracker, w: &World, l, c| t.fixed_observability_at(w, l, c);

        // From collective 0's point of view.
        assert_eq!(
            obs(&tracker, &w, loc(5, 5), CollectiveId(0)),
            Some((Territory::Friendly, Territory::Friendly))
        );
        assert_eq!(
            obs(&tracker, &w, loc(5, 7), CollectiveId(0)),
            Some((Territory::Enemy, Territory::Enemy))
        );
        assert_eq!(
            obs(&tracker, &w, loc(5, 6), CollectiveId(0)),
            Some((Territory::Neutral, Territory::Neutral))
        );
        // The same tiles flip for collective 1.
        assert_eq!(
            obs(&tracker, &w, loc(5, 5), CollectiveId(1)),
            Some((Territory::Enemy, Territory::Enemy))
        );
        // Uncovered cells read as no field.
        assert_eq!(obs(&tracker, &w, loc(0, 0), CollectiveId(0)), None);
    }
}
