//! `mg-rules` — the declarative rule runtime: filters, mutations, handlers,
//! game values, and the query system.
//!
//! # The split that makes the borrow checker happy
//!
//! Everything in this crate is *immutable after construction*.  A [`Rules`]
//! value is an arena of handler, query, and hook definitions built once from
//! config; evaluation takes `(&Rules, &mut World)` through a [`HandlerCtx`].
//! Objects refer to rules by id (`HandlerId`, `QueryId`), never by pointer,
//! so there are no cycles and no shared mutability anywhere.
//!
//! # Dispatch
//!
//! Filters and mutations are sum types with a `match` in `passes`/`apply` —
//! this sits on the AOE hot path, where enum dispatch beats a vtable and
//! lets the compiler see through the common variants.
//!
//! | Module       | Contents                                                |
//! |--------------|---------------------------------------------------------|
//! | [`ctx`]      | `HandlerCtx`, `EntityRef`, `DeferredDeltas`             |
//! | [`value`]    | `GameValue` — scalar quantities resolvable in context   |
//! | [`filter`]   | pure predicates over (actor, target, world)             |
//! | [`mutation`] | world-mutating procedures                               |
//! | [`handler`]  | `Handler`, `MultiHandler`, tag-hook dispatch            |
//! | [`query`]    | tag/filtered/closure queries + materialised caches      |
//! | [`rules`]    | the `Rules` arena and tag-touch analysis                |

pub mod ctx;
pub mod filter;
pub mod handler;
pub mod mutation;
pub mod query;
pub mod rules;
pub mod value;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use ctx::{DeferredDeltas, EntityRef, HandlerCtx};
pub use filter::{all_pass, AlignmentKind, Filter};
pub use handler::{DispatchMode, Handler, MultiHandler};
pub use mutation::{AlignmentTarget, AttackMutation, Mutation, ValueTarget};
pub use query::{evaluate_query_into, recompute_materialised, QueryDef, QueryOrder, TagQuery};
pub use rules::{Rules, TypeHooks};
pub use value::{GameValue, StatScope};
