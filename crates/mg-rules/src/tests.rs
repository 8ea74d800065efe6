//! Unit tests for mg-rules.

use std::sync::Arc;

use mg_core::{
    AgentId, CollectiveId, GridLocation, ObjectId, QueryId, ResourceId, TagId, TypeId,
};
use mg_world::{Collective, Grid, GridObject, Inventory, InventoryLimits, World};

use crate::{
    ctx::EntityRef,
    query::{evaluate_query_into, QueryDef, QueryOrder, TagQuery},
    value::{GameValue, StatScope},
    AlignmentKind, DeferredDeltas, DispatchMode, Filter, Handler, HandlerCtx, MultiHandler,
    Mutation, Rules,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

const ORE: ResourceId = ResourceId(0);
const HP: ResourceId = ResourceId(1);
const WEAPON: ResourceId = ResourceId(2);

fn loc(r: u16, c: u16) -> GridLocation {
    GridLocation::new(r, c)
}

fn limits() -> Arc<InventoryLimits> {
    Arc::new(InventoryLimits::uniform(3, 10))
}

fn names() -> Vec<String> {
    vec!["ore".into(), "hp".into(), "weapon".into()]
}

fn test_world(num_agents: usize) -> World {
    let ns = names();
    let collectives = vec![
        Collective::new(
            CollectiveId(0),
            "blue".into(),
            Inventory::new(Arc::new(InventoryLimits::unlimited(3))),
            &ns,
        ),
        Collective::new(
            CollectiveId(1),
            "red".into(),
            Inventory::new(Arc::new(InventoryLimits::unlimited(3))),
            &ns,
        ),
    ];
    World::new(Grid::new(10, 10), 16, collectives, ns, num_agents, 100, 7)
}

fn spawn_agent(w: &mut World, at: GridLocation, id: u32, collective: CollectiveId) -> ObjectId {
    let mut a = GridObject::new_agent(TypeId(1), at, Inventory::new(limits()), AgentId(id));
    a.collective = collective;
    w.spawn(a).unwrap()
}

fn spawn_thing(w: &mut World, at: GridLocation, tags: &[u16]) -> ObjectId {
    let mut o = GridObject::new(TypeId(0), at, Inventory::new(limits()));
    for &t in tags {
        o.tag_bits.set(TagId(t));
    }
    w.spawn(o).unwrap()
}

// ── Filters ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod filters {
    use super::*;

    #[test]
    fn tag_and_prefix() {
        let mut w = test_world(0);
        let rules = Rules::empty();
        let t = spawn_thing(&mut w, loc(1, 1), &[3]);
        let mut ctx = HandlerCtx::of(&mut w, &rules, t);

        assert!(Filter::Tag {
            entity: EntityRef::Target,
            tag: TagId(3)
        }
        .passes(&mut ctx));
        assert!(!Filter::Tag {
            entity: EntityRef::Target,
            tag: TagId(4)
        }
        .passes(&mut ctx));
        assert!(Filter::TagPrefix {
            entity: EntityRef::Target,
            tags: vec![TagId(9), TagId(3)]
        }
        .passes(&mut ctx));
    }

    #[test]
    fn shared_tag_prefix_requires_both() {
        let mut w = test_world(1);
        let rules = Rules::empty();
        let a = spawn_agent(&mut w, loc(0, 0), 0, CollectiveId(0));
        w.add_tag(a, TagId(5));
        let t = spawn_thing(&mut w, loc(1, 1), &[5, 6]);
        let mut ctx = HandlerCtx::between(&mut w, &rules, a, t);

        assert!(Filter::SharedTagPrefix {
            tags: vec![TagId(5)]
        }
        .passes(&mut ctx));
        assert!(!Filter::SharedTagPrefix {
            tags: vec![TagId(6)]
        }
        .passes(&mut ctx));
    }

    #[test]
    fn resource_threshold() {
        let mut w = test_world(0);
        let rules = Rules::empty();
        let t = spawn_thing(&mut w, loc(1, 1), &[]);
        w.grid[t].inventory.set(ORE, 4);
        let mut ctx = HandlerCtx::of(&mut w, &rules, t);

        let f = |min| Filter::Resource {
            entity: EntityRef::Target,
            resource: ORE,
            min_amount: min,
        };
        assert!(f(4).passes(&mut ctx));
        assert!(!f(5).passes(&mut ctx));
    }

    #[test]
    fn alignment_kinds() {
        let mut w = test_world(2);
        let rules = Rules::empty();
        let a = spawn_agent(&mut w, loc(0, 0), 0, CollectiveId(0));
        let friend = spawn_agent(&mut w, loc(0, 1), 1, CollectiveId(0));
        let neutral = spawn_thing(&mut w, loc(5, 5), &[]);

        let mut ctx = HandlerCtx::between(&mut w, &rules, a, friend);
        assert!(Filter::Alignment(AlignmentKind::Aligned).passes(&mut ctx));
        assert!(!Filter::Alignment(AlignmentKind::DifferentCollective).passes(&mut ctx));

        let mut ctx = HandlerCtx::between(&mut w, &rules, a, neutral);
        assert!(Filter::Alignment(AlignmentKind::Unaligned).passes(&mut ctx));
        assert!(
            Filter::Alignment(AlignmentKind::Collective(CollectiveId::INVALID)).passes(&mut ctx)
        );
    }

    #[test]
    fn max_distance_binary() {
        let mut w = test_world(1);
        let rules = Rules::empty();
        let a = spawn_agent(&mut w, loc(0, 0), 0, CollectiveId(0));
        let t = spawn_thing(&mut w, loc(3, 4), &[]); // distance² = 25
        let mut ctx = HandlerCtx::between(&mut w, &rules, a, t);

        let f = |r| Filter::MaxDistance {
            radius: r,
            source: None,
        };
        assert!(f(5).passes(&mut ctx));
        assert!(!f(4).passes(&mut ctx));
        assert!(f(0).passes(&mut ctx)); // zero radius: unconstrained
    }

    #[test]
    fn max_distance_source_mode() {
        let mut w = test_world(0);
        let queries = vec![QueryDef::Tag(TagQuery::all(TagId(2)))];
        let rules = Rules::new(Vec::new(), queries, Vec::new(), Vec::new());
        let t = spawn_thing(&mut w, loc(5, 5), &[]);
        let _src = spawn_thing(&mut w, loc(5, 8), &[2]); // distance 3

        let mut ctx = HandlerCtx::of(&mut w, &rules, t);
        let f = |r| Filter::MaxDistance {
            radius: r,
            source: Some(QueryId(0)),
        };
        assert!(f(3).passes(&mut ctx));
        assert!(!f(2).passes(&mut ctx));
        assert!(f(0).passes(&mut ctx)); // non-empty source set
    }

    #[test]
    fn max_distance_source_mode_empty_set() {
        let mut w = test_world(0);
        let queries = vec![QueryDef::Tag(TagQuery::all(TagId(2)))];
        let rules = Rules::new(Vec::new(), queries, Vec::new(), Vec::new());
        let t = spawn_thing(&mut w, loc(5, 5), &[]);
        let mut ctx = HandlerCtx::of(&mut w, &rules, t);
        assert!(!Filter::MaxDistance {
            radius: 0,
            source: Some(QueryId(0))
        }
        .passes(&mut ctx));
    }

    #[test]
    fn near_uses_chebyshev() {
        let mut w = test_world(0);
        let rules = Rules::empty();
        let t = spawn_thing(&mut w, loc(5, 5), &[]);
        let _beacon = spawn_thing(&mut w, loc(7, 7), &[8]); // chebyshev 2

        let near = |r| Filter::Near {
            radius: r,
            inner: vec![Filter::Tag {
                entity: EntityRef::Target,
                tag: TagId(8),
            }],
        };
        let mut ctx = HandlerCtx::of(&mut w, &rules, t);
        assert!(near(2).passes(&mut ctx));
        assert!(!near(1).passes(&mut ctx));
    }

    #[test]
    fn neg_and_or() {
        let mut w = test_world(0);
        let rules = Rules::empty();
        let t = spawn_thing(&mut w, loc(1, 1), &[3]);
        let mut ctx = HandlerCtx::of(&mut w, &rules, t);

        let has3 = Filter::Tag {
            entity: EntityRef::Target,
            tag: TagId(3),
        };
        let has4 = Filter::Tag {
            entity: EntityRef::Target,
            tag: TagId(4),
        };
        assert!(!Filter::Neg(vec![has3.clone()]).passes(&mut ctx));
        assert!(Filter::Neg(vec![has4.clone()]).passes(&mut ctx));
        assert!(Filter::Or(vec![has4.clone(), has3.clone()]).passes(&mut ctx));
        assert!(!Filter::Or(vec![has4]).passes(&mut ctx));
        assert!(!Filter::Or(Vec::new()).passes(&mut ctx));
    }

    #[test]
    fn game_value_threshold() {
        let mut w = test_world(0);
        let rules = Rules::empty();
        let t = spawn_thing(&mut w, loc(1, 1), &[2]);
        w.grid[t].inventory.set(ORE, 6);
        let mut ctx = HandlerCtx::of(&mut w, &rules, t);

        assert!(Filter::GameValue {
            value: GameValue::Inventory {
                entity: EntityRef::Target,
                resource: ORE
            },
            threshold: 6.0
        }
        .passes(&mut ctx));
        assert!(Filter::GameValue {
            value: GameValue::TagCount(TagId(2)),
            threshold: 1.0
        }
        .passes(&mut ctx));
        assert!(!Filter::GameValue {
            value: GameValue::Const(0.5),
            threshold: 1.0
        }
        .passes(&mut ctx));
    }
}

// ── Mutations ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod mutations {
    use super::*;

    #[test]
    fn resource_delta_clamps() {
        let mut w = test_world(0);
        let rules = Rules::empty();
        let t = spawn_thing(&mut w, loc(1, 1), &[]);
        w.grid[t].inventory.set(ORE, 8);
        let mut ctx = HandlerCtx::of(&mut w, &rules, t);

        Mutation::ResourceDelta {
            entity: EntityRef::Target,
            resource: ORE,
            delta: 5,
        }
        .apply(&mut ctx);
        assert_eq!(w.grid[t].inventory.amount(ORE), 10);
    }

    #[test]
    fn deferred_deltas_clamp_once_on_net() {
        let mut w = test_world(0);
        let rules = Rules::empty();
        let t = spawn_thing(&mut w, loc(1, 1), &[]);
        w.grid[t].inventory.set(HP, 8);

        let mut deferred = DeferredDeltas::new();
        deferred.begin(t);
        {
            let mut ctx = HandlerCtx::of(&mut w, &rules, t);
            ctx.deferred = Some(&mut deferred);
            let heal = Mutation::ResourceDelta {
                entity: EntityRef::Target,
                resource: HP,
                delta: 3,
            };
            heal.apply(&mut ctx);
            heal.apply(&mut ctx);
            // Nothing applied yet.
        }
        assert_eq!(w.grid[t].inventory.amount(HP), 8);
        deferred.settle(&mut w);
        // Net +6 clamps once to the cap of 10, not 10-then-10.
        assert_eq!(w.grid[t].inventory.amount(HP), 10);
    }

    #[test]
    fn transfer_moves_and_respects_dest_cap() {
        let mut w = test_world(1);
        let rules = Rules::empty();
        let a = spawn_agent(&mut w, loc(0, 0), 0, CollectiveId(0));
        let t = spawn_thing(&mut w, loc(0, 1), &[]);
        w.grid[t].inventory.set(ORE, 9);
        w.grid[a].inventory.set(ORE, 7);

        let mut ctx = HandlerCtx::between(&mut w, &rules, a, t);
        Mutation::ResourceTransfer {
            from: EntityRef::Target,
            to: EntityRef::Actor,
            resource: ORE,
            amount: -1, // entire balance
            delete_source_when_empty: false,
        }
        .apply(&mut ctx);

        // Actor caps at 10, so only 3 of the 9 move.
        assert_eq!(w.grid[a].inventory.amount(ORE), 10);
        assert_eq!(w.grid[t].inventory.amount(ORE), 6);
    }

    #[test]
    fn transfer_queues_empty_source_for_destruction() {
        let mut w = test_world(1);
        let rules = Rules::empty();
        let a = spawn_agent(&mut w, loc(0, 0), 0, CollectiveId(0));
        let t = spawn_thing(&mut w, loc(0, 1), &[]);
        w.grid[t].inventory.set(ORE, 2);

        let mut ctx = HandlerCtx::between(&mut w, &rules, a, t);
        Mutation::ResourceTransfer {
            from: EntityRef::Target,
            to: EntityRef::Actor,
            resource: ORE,
            amount: -1,
            delete_source_when_empty: true,
        }
        .apply(&mut ctx);
        assert_eq!(w.pending_destruction, vec![t]);
    }

    #[test]
    fn freeze_sets_absolute_step() {
        let mut w = test_world(1);
        let rules = Rules::empty();
        let a = spawn_agent(&mut w, loc(0, 0), 0, CollectiveId(0));
        w.current_step = 10;
        let mut ctx = HandlerCtx::of(&mut w, &rules, a);
        Mutation::Freeze { duration: 5 }.apply(&mut ctx);
        assert_eq!(w.grid[a].agent.as_ref().unwrap().frozen_until_step, 15);
        assert!(w.grid[a].is_frozen(14));
        assert!(!w.grid[a].is_frozen(15));
    }

    #[test]
    fn attack_consumes_loots_and_freezes() {
        let mut w = test_world(2);
        let rules = Rules::empty();
        let attacker = spawn_agent(&mut w, loc(0, 0), 0, CollectiveId(0));
        let victim = spawn_agent(&mut w, loc(0, 1), 1, CollectiveId(1));
        w.grid[attacker].inventory.set(WEAPON, 2);
        w.grid[victim].inventory.set(ORE, 5);
        w.current_step = 3;

        let mut ctx = HandlerCtx::between(&mut w, &rules, attacker, victim);
        Mutation::Attack(crate::AttackMutation {
            weapon: WEAPON,
            armor: ResourceId(1),
            health: ResourceId(1),
            hit_chance_pct: 100,
            damage_multiplier_pct: 0,
            loot: vec![(ORE, 1)],
            freeze_duration: Some(4),
        })
        .apply(&mut ctx);

        assert_eq!(w.grid[attacker].inventory.amount(WEAPON), 1);
        assert_eq!(w.grid[attacker].inventory.amount(ORE), 1);
        assert_eq!(w.grid[victim].inventory.amount(ORE), 4);
        assert_eq!(w.grid[victim].agent.as_ref().unwrap().frozen_until_step, 7);
    }

    #[test]
    fn attack_without_weapon_does_not_apply() {
        let mut w = test_world(2);
        let rules = Rules::empty();
        let attacker = spawn_agent(&mut w, loc(0, 0), 0, CollectiveId(0));
        let victim = spawn_agent(&mut w, loc(0, 1), 1, CollectiveId(1));
        w.grid[victim].inventory.set(ORE, 5);

        let mut ctx = HandlerCtx::between(&mut w, &rules, attacker, victim);
        Mutation::Attack(crate::AttackMutation {
            weapon: WEAPON,
            armor: ResourceId(1),
            health: ResourceId(1),
            hit_chance_pct: 100,
            damage_multiplier_pct: 100,
            loot: vec![(ORE, 1)],
            freeze_duration: None,
        })
        .apply(&mut ctx);
        assert_eq!(w.grid[victim].inventory.amount(ORE), 5);
    }

    #[test]
    fn attack_damage_goes_through_armor_first() {
        let mut w = test_world(2);
        let rules = Rules::empty();
        let attacker = spawn_agent(&mut w, loc(0, 0), 0, CollectiveId(0));
        let victim = spawn_agent(&mut w, loc(0, 1), 1, CollectiveId(1));
        const ARMOR: ResourceId = ORE; // reuse a slot as armor for the test
        w.grid[attacker].inventory.set(WEAPON, 1);
        w.grid[victim].inventory.set(ARMOR, 1);
        w.grid[victim].inventory.set(HP, 5);

        let mut ctx = HandlerCtx::between(&mut w, &rules, attacker, victim);
        Mutation::Attack(crate::AttackMutation {
            weapon: WEAPON,
            armor: ARMOR,
            health: HP,
            hit_chance_pct: 100,
            damage_multiplier_pct: 300, // 3 points
            loot: Vec::new(),
            freeze_duration: None,
        })
        .apply(&mut ctx);

        // 1 absorbed by armor, 2 reach health.
        assert_eq!(w.grid[victim].inventory.amount(ARMOR), 0);
        assert_eq!(w.grid[victim].inventory.amount(HP), 3);
    }

    #[test]
    fn stats_scopes() {
        let mut w = test_world(1);
        let rules = Rules::empty();
        let a = spawn_agent(&mut w, loc(0, 0), 0, CollectiveId(1));
        let mut ctx = HandlerCtx::between(&mut w, &rules, a, a);

        Mutation::Stats {
            scope: StatScope::Game,
            entity: EntityRef::Actor,
            key: "g".into(),
            delta: 1.0,
        }
        .apply(&mut ctx);
        Mutation::Stats {
            scope: StatScope::Agent,
            entity: EntityRef::Actor,
            key: "a".into(),
            delta: 2.0,
        }
        .apply(&mut ctx);
        Mutation::Stats {
            scope: StatScope::Collective,
            entity: EntityRef::Actor,
            key: "c".into(),
            delta: 3.0,
        }
        .apply(&mut ctx);

        assert_eq!(w.stats.get("g"), 1.0);
        assert_eq!(w.agent_stats[0].get("a"), 2.0);
        assert_eq!(w.collectives[1].stats.get("c"), 3.0);
    }

    #[test]
    fn add_tag_fires_hooks_unless_suppressed() {
        use crate::rules::TypeHooks;
        let mut w = test_world(0);

        // Hook: when a type-0 object gains tag 1, add one ore to it.
        let hook = MultiHandler::new(
            vec![Handler::new(
                Vec::new(),
                vec![Mutation::ResourceDelta {
                    entity: EntityRef::Target,
                    resource: ORE,
                    delta: 1,
                }],
            )],
            DispatchMode::All,
        );
        let mut hooks = TypeHooks::none();
        hooks.on_tag_add = vec![(TagId(1), mg_core::HandlerId(0))];
        let rules = Rules::new(vec![hook], Vec::new(), Vec::new(), vec![hooks]);

        let t = spawn_thing(&mut w, loc(1, 1), &[]);
        let mut ctx = HandlerCtx::of(&mut w, &rules, t);
        Mutation::AddTag {
            entity: EntityRef::Target,
            tag: TagId(1),
        }
        .apply(&mut ctx);
        assert_eq!(w.grid[t].inventory.amount(ORE), 1);

        // Re-adding an existing tag is a no-op: no second hook firing.
        let mut ctx = HandlerCtx::of(&mut w, &rules, t);
        Mutation::AddTag {
            entity: EntityRef::Target,
            tag: TagId(1),
        }
        .apply(&mut ctx);
        assert_eq!(w.grid[t].inventory.amount(ORE), 1);

        // Suppressed contexts skip the cascade but still mutate tags.
        let t2 = spawn_thing(&mut w, loc(2, 2), &[]);
        let mut ctx = HandlerCtx::of(&mut w, &rules, t2);
        ctx.skip_on_update_trigger = true;
        Mutation::AddTag {
            entity: EntityRef::Target,
            tag: TagId(1),
        }
        .apply(&mut ctx);
        assert!(w.grid[t2].tag_bits.has(TagId(1)));
        assert_eq!(w.grid[t2].inventory.amount(ORE), 0);
    }

    #[test]
    fn game_value_mutation_sets_inventory() {
        let mut w = test_world(0);
        let rules = Rules::empty();
        let t = spawn_thing(&mut w, loc(1, 1), &[]);
        w.grid[t].inventory.set(ORE, 3);
        let mut ctx = HandlerCtx::of(&mut w, &rules, t);

        Mutation::GameValueMutation {
            target: crate::ValueTarget::Inventory {
                entity: EntityRef::Target,
                resource: HP,
            },
            source: GameValue::Inventory {
                entity: EntityRef::Target,
                resource: ORE,
            },
        }
        .apply(&mut ctx);
        assert_eq!(w.grid[t].inventory.amount(HP), 3);
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod handlers {
    use super::*;

    fn give_ore(delta: i64) -> Mutation {
        Mutation::ResourceDelta {
            entity: EntityRef::Target,
            resource: ORE,
            delta,
        }
    }

    fn needs_tag(t: u16) -> Filter {
        Filter::Tag {
            entity: EntityRef::Target,
            tag: TagId(t),
        }
    }

    #[test]
    fn try_apply_gates_on_filters() {
        let mut w = test_world(0);
        let rules = Rules::empty();
        let t = spawn_thing(&mut w, loc(1, 1), &[2]);

        let h = Handler::new(vec![needs_tag(2)], vec![give_ore(1)]);
        let miss = Handler::new(vec![needs_tag(9)], vec![give_ore(100)]);

        let mut ctx = HandlerCtx::of(&mut w, &rules, t);
        assert!(h.try_apply(&mut ctx));
        assert!(!miss.try_apply(&mut ctx));
        assert_eq!(w.grid[t].inventory.amount(ORE), 1);
    }

    #[test]
    fn first_match_stops_after_first_applying() {
        let mut w = test_world(0);
        let rules = Rules::empty();
        let t = spawn_thing(&mut w, loc(1, 1), &[2]);

        let mh = MultiHandler::new(
            vec![
                Handler::new(vec![needs_tag(9)], vec![give_ore(100)]),
                Handler::new(vec![needs_tag(2)], vec![give_ore(1)]),
                Handler::new(Vec::new(), vec![give_ore(1)]),
            ],
            DispatchMode::FirstMatch,
        );
        let mut ctx = HandlerCtx::of(&mut w, &rules, t);
        assert!(mh.dispatch(&mut ctx));
        assert_eq!(w.grid[t].inventory.amount(ORE), 1);
    }

    #[test]
    fn all_mode_applies_every_matching_handler() {
        let mut w = test_world(0);
        let rules = Rules::empty();
        let t = spawn_thing(&mut w, loc(1, 1), &[2]);

        let mh = MultiHandler::new(
            vec![
                Handler::new(vec![needs_tag(2)], vec![give_ore(1)]),
                Handler::new(vec![needs_tag(9)], vec![give_ore(100)]),
                Handler::new(Vec::new(), vec![give_ore(1)]),
            ],
            DispatchMode::All,
        );
        let mut ctx = HandlerCtx::of(&mut w, &rules, t);
        assert!(mh.dispatch(&mut ctx));
        assert_eq!(w.grid[t].inventory.amount(ORE), 2);
    }

    #[test]
    fn none_matching_reports_false() {
        let mut w = test_world(0);
        let rules = Rules::empty();
        let t = spawn_thing(&mut w, loc(1, 1), &[]);
        let mh = MultiHandler::new(
            vec![Handler::new(vec![needs_tag(9)], vec![give_ore(1)])],
            DispatchMode::FirstMatch,
        );
        let mut ctx = HandlerCtx::of(&mut w, &rules, t);
        assert!(!mh.dispatch(&mut ctx));
    }
}

// ── Queries ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod queries {
    use super::*;
    use mg_world::QueryCaches;

    fn eval(qid: u16, w: &mut World, rules: &Rules) -> Vec<ObjectId> {
        let mut ctx = HandlerCtx::of(w, rules, ObjectId::INVALID);
        let mut out = Vec::new();
        evaluate_query_into(QueryId(qid), &mut ctx, &mut out);
        out
    }

    #[test]
    fn tag_query_filters_and_caps() {
        let mut w = test_world(0);
        let a = spawn_thing(&mut w, loc(0, 0), &[1]);
        let b = spawn_thing(&mut w, loc(0, 1), &[1, 2]);
        let c = spawn_thing(&mut w, loc(0, 2), &[1, 2]);

        let all = QueryDef::Tag(TagQuery::all(TagId(1)));
        let tagged2 = QueryDef::Tag(TagQuery {
            tag: TagId(1),
            filters: vec![Filter::Tag {
                entity: EntityRef::Target,
                tag: TagId(2),
            }],
            order: QueryOrder::Insertion,
            limit: None,
        });
        let capped = QueryDef::Tag(TagQuery {
            tag: TagId(1),
            filters: Vec::new(),
            order: QueryOrder::Insertion,
            limit: Some(2),
        });
        let rules = Rules::new(Vec::new(), vec![all, tagged2, capped], Vec::new(), Vec::new());

        assert_eq!(eval(0, &mut w, &rules), vec![a, b, c]);
        assert_eq!(eval(1, &mut w, &rules), vec![b, c]);
        assert_eq!(eval(2, &mut w, &rules), vec![a, b]);
    }

    #[test]
    fn random_order_is_stable_within_a_tick() {
        let mut w = test_world(0);
        for i in 0..8 {
            spawn_thing(&mut w, loc(0, i), &[1]);
        }
        let q = QueryDef::Tag(TagQuery {
            tag: TagId(1),
            filters: Vec::new(),
            order: QueryOrder::Random,
            limit: None,
        });
        let rules = Rules::new(Vec::new(), vec![q], Vec::new(), Vec::new());

        w.tick_seed = 11;
        let first = eval(0, &mut w, &rules);
        let again = eval(0, &mut w, &rules);
        assert_eq!(first, again);

        w.tick_seed = 12;
        let next_tick = eval(0, &mut w, &rules);
        assert_eq!(first.len(), next_tick.len());
        assert_ne!(first, next_tick); // 8! orderings; collision is negligible
    }

    #[test]
    fn filtered_query_narrows_source() {
        let mut w = test_world(0);
        let _a = spawn_thing(&mut w, loc(0, 0), &[1]);
        let b = spawn_thing(&mut w, loc(0, 1), &[1]);
        w.grid[b].inventory.set(ORE, 5);

        let rules = Rules::new(
            Vec::new(),
            vec![
                QueryDef::Tag(TagQuery::all(TagId(1))),
                QueryDef::Filtered {
                    source: QueryId(0),
                    filters: vec![Filter::Resource {
                        entity: EntityRef::Target,
                        resource: ORE,
                        min_amount: 1,
                    }],
                },
            ],
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(eval(1, &mut w, &rules), vec![b]);
    }

    #[test]
    fn closure_reaches_transitively() {
        let mut w = test_world(0);
        // Chain of things at distance 1 from each other; seeds carry tag 3,
        // candidates tag 4.  Edge: candidate within euclidean 1 of a member.
        let seed = spawn_thing(&mut w, loc(5, 0), &[3]);
        let link = spawn_thing(&mut w, loc(5, 1), &[4]);
        let far_link = spawn_thing(&mut w, loc(5, 2), &[4]);
        let _island = spawn_thing(&mut w, loc(9, 9), &[4]);

        let rules = Rules::new(
            Vec::new(),
            vec![
                QueryDef::Tag(TagQuery::all(TagId(3))),
                QueryDef::Tag(TagQuery::all(TagId(4))),
                QueryDef::Closure {
                    source: QueryId(0),
                    candidates: QueryId(1),
                    edge_filters: vec![vec![Filter::MaxDistance {
                        radius: 1,
                        source: None,
                    }]],
                    result_filters: Vec::new(),
                },
            ],
            Vec::new(),
            Vec::new(),
        );

        let got = eval(2, &mut w, &rules);
        assert!(got.contains(&seed));
        assert!(got.contains(&link));
        assert!(got.contains(&far_link)); // reached through `link`
        assert_eq!(got.len(), 3); // island unreachable
    }

    #[test]
    fn materialised_cache_serves_until_invalidated() {
        let mut w = test_world(0);
        let a = spawn_thing(&mut w, loc(0, 0), &[1]);

        let rules = Rules::new(
            Vec::new(),
            vec![QueryDef::Tag(TagQuery::all(TagId(1)))],
            vec![QueryId(0)],
            Vec::new(),
        );
        w.query_caches = QueryCaches::new(rules.num_queries(), 16);
        w.query_caches
            .declare_materialised(QueryId(0), &rules.touched_tags(QueryId(0)));

        assert_eq!(eval(0, &mut w, &rules), vec![a]);
        assert!(!w.query_caches.is_dirty(QueryId(0)));

        // Tag change on the touched tag dirties and recomputes.
        let b = spawn_thing(&mut w, loc(0, 1), &[]);
        w.add_tag(b, TagId(1));
        assert!(w.query_caches.is_dirty(QueryId(0)));
        assert_eq!(eval(0, &mut w, &rules), vec![a, b]);
        assert!(!w.query_caches.is_dirty(QueryId(0)));
    }

    #[test]
    fn touched_tags_cover_nested_queries() {
        let rules = Rules::new(
            Vec::new(),
            vec![
                QueryDef::Tag(TagQuery::all(TagId(1))),
                QueryDef::Filtered {
                    source: QueryId(0),
                    filters: vec![Filter::TagPrefix {
                        entity: EntityRef::Target,
                        tags: vec![TagId(4), TagId(5)],
                    }],
                },
            ],
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(
            rules.touched_tags(QueryId(1)),
            vec![TagId(1), TagId(4), TagId(5)]
        );
    }

    #[test]
    fn query_resource_filter_sums_across_results() {
        let mut w = test_world(0);
        let a = spawn_thing(&mut w, loc(0, 0), &[1]);
        let b = spawn_thing(&mut w, loc(0, 1), &[1]);
        w.grid[a].inventory.set(ORE, 2);
        w.grid[b].inventory.set(ORE, 3);

        let rules = Rules::new(
            Vec::new(),
            vec![QueryDef::Tag(TagQuery::all(TagId(1)))],
            Vec::new(),
            Vec::new(),
        );
        let mut ctx = HandlerCtx::of(&mut w, &rules, ObjectId::INVALID);
        assert!(Filter::QueryResource {
            query: QueryId(0),
            requirements: vec![(ORE, 5)]
        }
        .passes(&mut ctx));
        assert!(!Filter::QueryResource {
            query: QueryId(0),
            requirements: vec![(ORE, 6)]
        }
        .passes(&mut ctx));
        assert!(Filter::QueryResource {
            query: QueryId(0),
            requirements: vec![(HP, 0)]
        }
        .passes(&mut ctx));
    }

    #[test]
    fn query_inventory_value_sums() {
        let mut w = test_world(0);
        let a = spawn_thing(&mut w, loc(0, 0), &[1]);
        let b = spawn_thing(&mut w, loc(0, 1), &[1]);
        w.grid[a].inventory.set(ORE, 2);
        w.grid[b].inventory.set(ORE, 3);

        let rules = Rules::new(
            Vec::new(),
            vec![QueryDef::Tag(TagQuery::all(TagId(1)))],
            Vec::new(),
            Vec::new(),
        );
        let mut ctx = HandlerCtx::of(&mut w, &rules, ObjectId::INVALID);
        let v = GameValue::QueryInventory {
            query: QueryId(0),
            resource: ORE,
        };
        assert_eq!(v.resolve(&mut ctx), 5.0);
    }
}
