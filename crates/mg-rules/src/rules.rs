//! The `Rules` arena — every handler, query, and per-type hook definition,
//! immutable after construction.

use mg_core::{HandlerId, QueryId, TagId, TypeId};

use crate::{Filter, GameValue, MultiHandler, QueryDef};

// ── TypeHooks ─────────────────────────────────────────────────────────────────

/// Behavioural hooks shared by every object of one type.
#[derive(Clone, Debug)]
pub struct TypeHooks {
    /// MultiHandler invoked by the `use` action (FirstMatch), or `INVALID`.
    pub on_use: HandlerId,

    /// MultiHandler run for this object each tick (agents only), or `INVALID`.
    pub on_tick: HandlerId,

    /// Handlers fired when the object gains the paired tag.
    pub on_tag_add: Vec<(TagId, HandlerId)>,

    /// Handlers fired when the object loses the paired tag.
    pub on_tag_remove: Vec<(TagId, HandlerId)>,
}

/// Shared fallback for types with no configured hooks.
static NO_HOOKS: TypeHooks = TypeHooks {
    on_use: HandlerId::INVALID,
    on_tick: HandlerId::INVALID,
    on_tag_add: Vec::new(),
    on_tag_remove: Vec::new(),
};

impl TypeHooks {
    pub fn none() -> TypeHooks {
        NO_HOOKS.clone()
    }
}

impl Default for TypeHooks {
    fn default() -> Self {
        Self::none()
    }
}

// ── Rules ─────────────────────────────────────────────────────────────────────

/// All rule definitions for one environment.
pub struct Rules {
    multi_handlers: Vec<MultiHandler>,
    queries: Vec<QueryDef>,
    materialised: Vec<QueryId>,
    /// Indexed by `TypeId`; types without hooks hold `TypeHooks::NONE`.
    type_hooks: Vec<TypeHooks>,
}

impl Rules {
    pub fn new(
        multi_handlers: Vec<MultiHandler>,
        queries: Vec<QueryDef>,
        materialised: Vec<QueryId>,
        type_hooks: Vec<TypeHooks>,
    ) -> Self {
        debug_assert!(materialised.iter().all(|q| q.index() < queries.len()));
        Self {
            multi_handlers,
            queries,
            materialised,
            type_hooks,
        }
    }

    /// A rule set with nothing in it (tests, minimal environments).
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new(), Vec::new())
    }

    #[inline]
    pub fn multi_handler(&self, id: HandlerId) -> &MultiHandler {
        &self.multi_handlers[id.index()]
    }

    #[inline]
    pub fn query(&self, id: QueryId) -> &QueryDef {
        &self.queries[id.index()]
    }

    pub fn num_queries(&self) -> usize {
        self.queries.len()
    }

    pub fn num_handlers(&self) -> usize {
        self.multi_handlers.len()
    }

    /// Queries whose results are cached and invalidated on tag changes.
    pub fn materialised(&self) -> &[QueryId] {
        &self.materialised
    }

    /// Hooks for a type; types beyond the table read as hook-free.
    #[inline]
    pub fn hooks_for(&self, type_id: TypeId) -> &TypeHooks {
        self.type_hooks.get(type_id.index()).unwrap_or(&NO_HOOKS)
    }

    // ── Tag-touch analysis ────────────────────────────────────────────────

    /// Every tag whose membership can change this query's result — the
    /// invalidation set wired into the world's query caches.
    pub fn touched_tags(&self, qid: QueryId) -> Vec<TagId> {
        let mut tags = Vec::new();
        let mut visited = vec![false; self.queries.len()];
        self.collect_query_tags(qid, &mut tags, &mut visited);
        tags.sort_unstable();
        tags.dedup();
        tags
    }

    fn collect_query_tags(&self, qid: QueryId, tags: &mut Vec<TagId>, visited: &mut [bool]) {
        if std::mem::replace(&mut visited[qid.index()], true) {
            return;
        }
        match self.query(qid) {
            QueryDef::Tag(tq) => {
                tags.push(tq.tag);
                for f in &tq.filters {
                    self.collect_filter_tags(f, tags, visited);
                }
            }
            QueryDef::Filtered { source, filters } => {
                self.collect_query_tags(*source, tags, visited);
                for f in filters {
                    self.collect_filter_tags(f, tags, visited);
                }
            }
            QueryDef::Closure {
                source,
                candidates,
                edge_filters,
                result_filters,
            } => {
                self.collect_query_tags(*source, tags, visited);
                self.collect_query_tags(*candidates, tags, visited);
                for chain in edge_filters {
                    for f in chain {
                        self.collect_filter_tags(f, tags, visited);
                    }
                }
                for f in result_filters {
                    self.collect_filter_tags(f, tags, visited);
                }
            }
        }
    }

    fn collect_filter_tags(&self, filter: &Filter, tags: &mut Vec<TagId>, visited: &mut [bool]) {
        match filter {
            Filter::Tag { tag, .. } => tags.push(*tag),
            Filter::TagPrefix { tags: set, .. } | Filter::SharedTagPrefix { tags: set } => {
                tags.extend_from_slice(set);
            }
            Filter::GameValue { value, .. } => self.collect_value_tags(value, tags, visited),
            Filter::MaxDistance {
                source: Some(q), ..
            } => self.collect_query_tags(*q, tags, visited),
            Filter::QueryResource { query, .. } => self.collect_query_tags(*query, tags, visited),
            Filter::Near { inner, .. } | Filter::Neg(inner) | Filter::Or(inner) => {
                for f in inner {
                    self.collect_filter_tags(f, tags, visited);
                }
            }
            Filter::Resource { .. }
            | Filter::Vibe { .. }
            | Filter::Alignment(_)
            | Filter::MaxDistance { source: None, .. } => {}
        }
    }

    fn collect_value_tags(&self, value: &GameValue, tags: &mut Vec<TagId>, visited: &mut [bool]) {
        match value {
            GameValue::TagCount(tag) => tags.push(*tag),
            GameValue::QueryInventory { query, .. } => {
                self.collect_query_tags(*query, tags, visited)
            }
            GameValue::Inventory { .. } | GameValue::Stat { .. } | GameValue::Const(_) => {}
        }
    }
}
