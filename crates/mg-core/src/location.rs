//! Grid geometry: cell addresses, layers, orientations, distance metrics.
//!
//! # Design
//!
//! The world is a fixed `height × width` grid addressed in row-major order.
//! Cells are `(row, col)` pairs of `u16` — a 65,535² world is far beyond any
//! practical map.  All distance arithmetic is integer (squared-Euclidean or
//! Chebyshev); nothing in the simulation ever computes a square root.

use std::fmt;

/// Number of occupancy layers per cell.  Walls and structures live on
/// [`Layer::Object`]; agents live on [`Layer::Agent`] so an agent can stand
/// on the same cell as (e.g.) a converter it is using.
pub const NUM_LAYERS: usize = 2;

// ── GridLocation ──────────────────────────────────────────────────────────────

/// A cell address: `(row, col)`, row-major.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridLocation {
    pub row: u16,
    pub col: u16,
}

impl GridLocation {
    #[inline]
    pub fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }

    /// Row-major flat index for a grid of the given width.
    #[inline(always)]
    pub fn flat_index(self, width: u16) -> usize {
        self.row as usize * width as usize + self.col as usize
    }

    /// The cell at `(row + dr, col + dc)`, or `None` if the offset would
    /// underflow either coordinate.  Upper-bound checks are the grid's job.
    #[inline]
    pub fn offset(self, dr: i32, dc: i32) -> Option<GridLocation> {
        let row = (self.row as i32).checked_add(dr)?;
        let col = (self.col as i32).checked_add(dc)?;
        if row < 0 || col < 0 || row > u16::MAX as i32 || col > u16::MAX as i32 {
            return None;
        }
        Some(GridLocation::new(row as u16, col as u16))
    }

    /// Squared Euclidean distance to `other`.
    ///
    /// This is the normative distance metric for AOE radii and the
    /// `MaxDistance` filter; comparisons are always against `radius²` so the
    /// square root is never taken.
    #[inline]
    pub fn euclidean_sq(self, other: GridLocation) -> u32 {
        let dr = (self.row as i32 - other.row as i32).unsigned_abs();
        let dc = (self.col as i32 - other.col as i32).unsigned_abs();
        dr * dr + dc * dc
    }

    /// Chebyshev (king-move) distance to `other`.  Used by the `Near` filter.
    #[inline]
    pub fn chebyshev(self, other: GridLocation) -> u16 {
        let dr = self.row.abs_diff(other.row);
        let dc = self.col.abs_diff(other.col);
        dr.max(dc)
    }

    /// Manhattan (taxicab) distance to `other`.  Drives the observation
    /// window scan order.
    #[inline]
    pub fn manhattan(self, other: GridLocation) -> u32 {
        self.row.abs_diff(other.row) as u32 + self.col.abs_diff(other.col) as u32
    }
}

impl fmt::Display for GridLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

// ── Layer ─────────────────────────────────────────────────────────────────────

/// Occupancy layer of a grid object.  At most one object per (layer, cell).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Layer {
    /// Walls, converters, altars — anything that is not an agent.
    Object = 0,
    /// Agents only.
    Agent = 1,
}

impl Layer {
    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }
}

// ── Orientation ───────────────────────────────────────────────────────────────

/// Cardinal facing direction of an agent.
///
/// The discriminant values are the wire encoding used in action arguments
/// and observation tokens; do not reorder.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    #[default]
    North = 0,
    South = 1,
    West = 2,
    East = 3,
}

impl Orientation {
    /// All orientations in wire order.
    pub const ALL: [Orientation; 4] = [
        Orientation::North,
        Orientation::South,
        Orientation::West,
        Orientation::East,
    ];

    /// `(dr, dc)` of one step in this direction.  North decreases the row.
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Orientation::North => (-1, 0),
            Orientation::South => (1, 0),
            Orientation::West => (0, -1),
            Orientation::East => (0, 1),
        }
    }

    /// Decode a wire integer, if valid.
    #[inline]
    pub fn from_wire(v: i32) -> Option<Orientation> {
        match v {
            0 => Some(Orientation::North),
            1 => Some(Orientation::South),
            2 => Some(Orientation::West),
            3 => Some(Orientation::East),
            _ => None,
        }
    }
}

// ── Packed observation coordinates ────────────────────────────────────────────

/// Largest row/col value representable in one packed coordinate nibble.
/// Constrains observation windows to at most 15 cells per axis.
pub const MAX_PACKABLE_COORD: u16 = 14;

/// Location byte marking a global (non-spatial) observation token.
pub const LOCATION_GLOBAL: u8 = 0xFE;

/// Location byte marking an empty (unwritten) observation token.
pub const LOCATION_EMPTY: u8 = 0xFF;

/// Pack a window-relative `(row, col)` into one byte: `(r << 4) | c`.
///
/// Callers must hold `r, c <= MAX_PACKABLE_COORD`; the debug assertion is
/// the only guard because this sits on the observation hot path.
#[inline(always)]
pub fn pack_coord(row: u16, col: u16) -> u8 {
    debug_assert!(row <= MAX_PACKABLE_COORD && col <= MAX_PACKABLE_COORD);
    ((row as u8) << 4) | (col as u8)
}
