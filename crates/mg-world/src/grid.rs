//! Dense 2-layer grid storage plus the object arena.
//!
//! # Design
//!
//! Cells are a flat row-major `Vec` of `[ObjectId; NUM_LAYERS]`; objects live
//! in a dense arena (`Vec<Option<GridObject>>`) with free-list slot reuse.
//! Ids are stable from insertion to removal, so every other structure
//! (tag index, AOE tracker, caches) refers to objects purely by `ObjectId`.
//!
//! The grid is the *only* component that writes `GridObject::location`; all
//! movement funnels through [`Grid::move_object`] so occupancy can never
//! disagree with object state.

use std::ops::{Index, IndexMut};

use mg_core::{GridLocation, Layer, ObjectId, NUM_LAYERS};

use crate::{GridObject, WorldError, WorldResult};

/// Fixed-size grid with at most one object per (layer, cell).
pub struct Grid {
    height: u16,
    width: u16,
    /// `cells[loc.flat_index(width)][layer]` — occupant id or `INVALID`.
    cells: Vec<[ObjectId; NUM_LAYERS]>,
    objects: Vec<Option<GridObject>>,
    free: Vec<ObjectId>,
    live: usize,
}

impl Grid {
    pub fn new(height: u16, width: u16) -> Self {
        Self {
            height,
            width,
            cells: vec![[ObjectId::INVALID; NUM_LAYERS]; height as usize * width as usize],
            objects: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    #[inline]
    pub fn in_bounds(&self, loc: GridLocation) -> bool {
        loc.row < self.height && loc.col < self.width
    }

    // ── Occupancy ─────────────────────────────────────────────────────────

    /// Occupant of `(loc, layer)`, or `ObjectId::INVALID`.
    /// Out-of-bounds locations read as empty.
    #[inline]
    pub fn id_at(&self, loc: GridLocation, layer: Layer) -> ObjectId {
        if !self.in_bounds(loc) {
            return ObjectId::INVALID;
        }
        self.cells[loc.flat_index(self.width)][layer.index()]
    }

    /// The object at `(loc, layer)`, if any.
    pub fn object_at(&self, loc: GridLocation, layer: Layer) -> Option<&GridObject> {
        self.get(self.id_at(loc, layer))
    }

    /// `true` if no object occupies `(loc, layer)`.
    #[inline]
    pub fn is_free(&self, loc: GridLocation, layer: Layer) -> bool {
        self.in_bounds(loc) && self.id_at(loc, layer) == ObjectId::INVALID
    }

    // ── Arena access ──────────────────────────────────────────────────────

    pub fn get(&self, id: ObjectId) -> Option<&GridObject> {
        self.objects.get(id.index())?.as_ref()
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut GridObject> {
        self.objects.get_mut(id.index())?.as_mut()
    }

    /// Disjoint mutable access to two distinct objects (transfers, attacks).
    ///
    /// Returns `None` if `a == b` or either slot is dead.
    pub fn pair_mut(
        &mut self,
        a: ObjectId,
        b: ObjectId,
    ) -> Option<(&mut GridObject, &mut GridObject)> {
        if a == b || a.index() >= self.objects.len() || b.index() >= self.objects.len() {
            return None;
        }
        let (lo, hi) = if a.index() < b.index() { (a, b) } else { (b, a) };
        let (left, right) = self.objects.split_at_mut(hi.index());
        let lo_obj = left[lo.index()].as_mut()?;
        let hi_obj = right[0].as_mut()?;
        if a.index() < b.index() {
            Some((lo_obj, hi_obj))
        } else {
            Some((hi_obj, lo_obj))
        }
    }

    /// Iterate live objects in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &GridObject> + '_ {
        self.objects.iter().filter_map(|o| o.as_ref())
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Insert `obj` at its declared `(location, layer)`, assigning its id.
    ///
    /// Fails if the location is out of bounds or the layer slot is occupied.
    pub fn insert(&mut self, mut obj: GridObject) -> WorldResult<ObjectId> {
        let loc = obj.location;
        if !self.in_bounds(loc) {
            return Err(WorldError::OutOfBounds(loc));
        }
        let slot = &mut self.cells[loc.flat_index(self.width)][obj.layer.index()];
        if *slot != ObjectId::INVALID {
            return Err(WorldError::CellOccupied {
                loc,
                layer: obj.layer,
            });
        }

        let id = match self.free.pop() {
            Some(id) => id,
            None => ObjectId(self.objects.len() as u32),
        };
        obj.id = id;
        *slot = id;

        if id.index() == self.objects.len() {
            self.objects.push(Some(obj));
        } else {
            debug_assert!(self.objects[id.index()].is_none());
            self.objects[id.index()] = Some(obj);
        }
        self.live += 1;
        Ok(id)
    }

    /// Remove an object, freeing its cell and arena slot.
    ///
    /// Callers (i.e. `World::destroy`) are responsible for tag-index and
    /// tracker teardown before the id is recycled.
    pub fn remove(&mut self, id: ObjectId) -> Option<GridObject> {
        let obj = self.objects.get_mut(id.index())?.take()?;
        let slot = &mut self.cells[obj.location.flat_index(self.width)][obj.layer.index()];
        debug_assert_eq!(*slot, id);
        *slot = ObjectId::INVALID;
        self.free.push(id);
        self.live -= 1;
        Some(obj)
    }

    /// Move an object to `new_loc` on its own layer.
    ///
    /// Returns `false` (world untouched) if the destination is out of bounds
    /// or occupied on that layer.
    pub fn move_object(&mut self, id: ObjectId, new_loc: GridLocation) -> bool {
        let Some(obj) = self.objects.get(id.index()).and_then(|o| o.as_ref()) else {
            return false;
        };
        let layer = obj.layer;
        let old_loc = obj.location;
        if new_loc == old_loc {
            return true;
        }
        if !self.in_bounds(new_loc) || self.id_at(new_loc, layer) != ObjectId::INVALID {
            return false;
        }

        self.cells[old_loc.flat_index(self.width)][layer.index()] = ObjectId::INVALID;
        self.cells[new_loc.flat_index(self.width)][layer.index()] = id;
        self[id].location = new_loc;
        true
    }

    /// Exchange the positions of two objects on the same layer.
    ///
    /// Unlike two `move_object` calls this works when the cells are occupied
    /// by exactly each other.  Fails for distinct layers.
    pub fn swap_objects(&mut self, a: ObjectId, b: ObjectId) -> bool {
        let (Some(oa), Some(ob)) = (self.get(a), self.get(b)) else {
            return false;
        };
        if oa.layer != ob.layer {
            return false;
        }
        let (la, lb, layer) = (oa.location, ob.location, oa.layer);

        self.cells[la.flat_index(self.width)][layer.index()] = b;
        self.cells[lb.flat_index(self.width)][layer.index()] = a;
        self[a].location = lb;
        self[b].location = la;
        true
    }
}

impl Index<ObjectId> for Grid {
    type Output = GridObject;

    /// Panics if the id is dead — dangling ids are an internal invariant
    /// violation, like out-of-range slice indexing.
    #[inline]
    fn index(&self, id: ObjectId) -> &GridObject {
        self.objects[id.index()].as_ref().unwrap()
    }
}

impl IndexMut<ObjectId> for Grid {
    #[inline]
    fn index_mut(&mut self, id: ObjectId) -> &mut GridObject {
        self.objects[id.index()].as_mut().unwrap()
    }
}
