//! Handlers — a filter chain gating a mutation chain — and their dispatch.

use mg_core::{HandlerId, ObjectId, TagId};

use crate::{filter::all_pass, mutation, Filter, HandlerCtx, Mutation};

// ── Handler ───────────────────────────────────────────────────────────────────

/// An ordered filter chain plus an ordered mutation chain.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Handler {
    pub filters: Vec<Filter>,
    pub mutations: Vec<Mutation>,
}

impl Handler {
    pub fn new(filters: Vec<Filter>, mutations: Vec<Mutation>) -> Self {
        Self { filters, mutations }
    }

    /// Apply if every filter passes.  Returns whether the mutations ran.
    pub fn try_apply(&self, ctx: &mut HandlerCtx<'_>) -> bool {
        if !all_pass(&self.filters, ctx) {
            return false;
        }
        mutation::apply_all(&self.mutations, ctx);
        true
    }
}

// ── MultiHandler ──────────────────────────────────────────────────────────────

/// How a [`MultiHandler`] walks its handler list.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DispatchMode {
    /// Stop after the first handler that applies (on-use semantics).
    FirstMatch,
    /// Invoke every handler; report whether any applied (on-tag, events).
    All,
}

/// An ordered set of handlers with a dispatch mode.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultiHandler {
    pub handlers: Vec<Handler>,
    pub mode: DispatchMode,
}

impl MultiHandler {
    pub fn new(handlers: Vec<Handler>, mode: DispatchMode) -> Self {
        Self { handlers, mode }
    }

    /// Dispatch per mode.  Returns whether at least one handler applied.
    pub fn dispatch(&self, ctx: &mut HandlerCtx<'_>) -> bool {
        match self.mode {
            DispatchMode::FirstMatch => self.handlers.iter().any(|h| h.try_apply(ctx)),
            DispatchMode::All => self
                .handlers
                .iter()
                .fold(false, |applied, h| h.try_apply(ctx) | applied),
        }
    }
}

// ── Tag hooks ─────────────────────────────────────────────────────────────────

/// Fire the per-type on-tag-add / on-tag-remove handlers for `obj` gaining
/// or losing `tag`.
///
/// The hook runs in a sub-context (same actor, target = the tagged object)
/// with no deferral, so cascaded writes land directly.
pub fn fire_tag_hooks(ctx: &mut HandlerCtx<'_>, obj: ObjectId, tag: TagId, added: bool) {
    let Some(type_id) = ctx.world.grid.get(obj).map(|o| o.type_id) else {
        return;
    };
    let hooks = ctx.rules.hooks_for(type_id);
    let list = if added {
        &hooks.on_tag_add
    } else {
        &hooks.on_tag_remove
    };
    // Typically empty or a single entry; linear scan.
    for &(hook_tag, handler) in list {
        if hook_tag != tag || handler == HandlerId::INVALID {
            continue;
        }
        let rules = ctx.rules;
        let mut sub = ctx.sub(ctx.actor, obj);
        rules.multi_handler(handler).dispatch(&mut sub);
    }
}
