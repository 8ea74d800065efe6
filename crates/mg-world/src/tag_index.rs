//! Reverse index: tag → objects carrying it, with per-tag cardinality.
//!
//! # Ordering and deletion
//!
//! Query semantics require bucket iteration order to be *stable insertion
//! order* across ticks, while object destruction must not cost O(bucket).
//! Buckets therefore tombstone on removal (`ObjectId::INVALID`) and compact
//! only when dead entries outnumber live ones — O(1) amortised removal with
//! relative order preserved.  A per-bucket slot map gives O(1) lookup of an
//! object's entry.

use rustc_hash::FxHashMap;

use mg_core::{ObjectId, TagId};

use crate::GridObject;

/// Compact a bucket once it carries more tombstones than live entries
/// (and is past trivial size).
const COMPACT_SLACK: usize = 8;

#[derive(Default, Debug, Clone)]
struct TagBucket {
    /// Insertion-ordered entries; `ObjectId::INVALID` marks a tombstone.
    entries: Vec<ObjectId>,
    /// Object → position in `entries`.
    slots: FxHashMap<ObjectId, u32>,
    live: u32,
}

impl TagBucket {
    fn insert(&mut self, id: ObjectId) {
        debug_assert!(!self.slots.contains_key(&id), "double tag registration");
        self.slots.insert(id, self.entries.len() as u32);
        self.entries.push(id);
        self.live += 1;
    }

    fn remove(&mut self, id: ObjectId) -> bool {
        let Some(pos) = self.slots.remove(&id) else {
            return false;
        };
        self.entries[pos as usize] = ObjectId::INVALID;
        self.live -= 1;
        if self.entries.len() > self.live as usize * 2 + COMPACT_SLACK {
            self.compact();
        }
        true
    }

    fn compact(&mut self) {
        self.entries.retain(|&id| id != ObjectId::INVALID);
        self.slots.clear();
        for (i, &id) in self.entries.iter().enumerate() {
            self.slots.insert(id, i as u32);
        }
    }
}

/// The tag → objects reverse index.
///
/// Kept consistent with every object's `tag_bits` by `World`: the only write
/// paths are object registration/unregistration and tag add/remove.
pub struct TagIndex {
    buckets: Vec<TagBucket>,
    counts: Vec<u32>,
}

impl TagIndex {
    pub fn new(num_tags: usize) -> Self {
        Self {
            buckets: vec![TagBucket::default(); num_tags],
            counts: vec![0; num_tags],
        }
    }

    pub fn num_tags(&self) -> usize {
        self.buckets.len()
    }

    /// Record that `obj` gained `tag`.
    pub fn on_tag_added(&mut self, obj: ObjectId, tag: TagId) {
        self.buckets[tag.index()].insert(obj);
        self.counts[tag.index()] += 1;
    }

    /// Record that `obj` lost `tag`.
    pub fn on_tag_removed(&mut self, obj: ObjectId, tag: TagId) {
        if self.buckets[tag.index()].remove(obj) {
            self.counts[tag.index()] -= 1;
        }
    }

    /// Register a freshly inserted object under every tag it carries.
    pub fn register_object(&mut self, obj: &GridObject) {
        for tag in obj.tag_bits.iter() {
            self.on_tag_added(obj.id, tag);
        }
    }

    /// Remove a dying object from every tag bucket it occupies.
    pub fn unregister_object(&mut self, obj: &GridObject) {
        for tag in obj.tag_bits.iter() {
            self.on_tag_removed(obj.id, tag);
        }
    }

    /// Live objects carrying `tag`, in stable insertion order.
    pub fn objects_with(&self, tag: TagId) -> impl Iterator<Item = ObjectId> + '_ {
        self.buckets[tag.index()]
            .entries
            .iter()
            .copied()
            .filter(|&id| id != ObjectId::INVALID)
    }

    /// Cardinality of `tag`'s bucket.  O(1); backs `GameValue::TagCount`.
    #[inline]
    pub fn count(&self, tag: TagId) -> u32 {
        self.counts[tag.index()]
    }

    #[inline]
    pub fn contains(&self, tag: TagId, obj: ObjectId) -> bool {
        self.buckets[tag.index()].slots.contains_key(&obj)
    }
}
