//! Territory collapse — which side owns a tile under competing influence.

use mg_core::{CollectiveId, GridLocation};

/// Territory-controlling fields of radius ≥ this exclude the four cardinal
/// boundary tips `(±r, 0)`, `(0, ±r)` from their footprint, matching the
/// renderer's overlay shape.
pub const TERRITORY_TIP_EXCLUSION_MIN_RADIUS: u32 = 2;

/// Tile ownership relative to an observer, and equally the side of a single
/// source relative to an observer.  The discriminants are the observation
/// token encoding.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Territory {
    #[default]
    Neutral = 0,
    Friendly = 1,
    Enemy = 2,
}

impl Territory {
    /// Side of a source collective relative to an observer collective.
    /// Either being collective-less yields `Neutral`.
    #[inline]
    pub fn side_of(source: CollectiveId, observer: CollectiveId) -> Territory {
        if source == CollectiveId::INVALID || observer == CollectiveId::INVALID {
            Territory::Neutral
        } else if source == observer {
            Territory::Friendly
        } else {
            Territory::Enemy
        }
    }
}

/// Running state of one tile's collapse: nearest friendly and enemy
/// influence distances (squared).
#[derive(Default)]
pub struct Collapse {
    nearest_friendly: Option<u32>,
    nearest_enemy: Option<u32>,
}

impl Collapse {
    /// Account one influence source at `dist_sq` on `side`.
    pub fn observe(&mut self, side: Territory, dist_sq: u32) {
        let slot = match side {
            Territory::Friendly => &mut self.nearest_friendly,
            Territory::Enemy => &mut self.nearest_enemy,
            Territory::Neutral => return,
        };
        *slot = Some(match *slot {
            Some(best) => best.min(dist_sq),
            None => dist_sq,
        });
    }

    /// Resolve ownership: the strictly nearer side wins; a tie is neutral.
    pub fn resolve(&self) -> Territory {
        match (self.nearest_friendly, self.nearest_enemy) {
            (None, None) => Territory::Neutral,
            (Some(_), None) => Territory::Friendly,
            (None, Some(_)) => Territory::Enemy,
            (Some(f), Some(e)) => {
                if f < e {
                    Territory::Friendly
                } else if e < f {
                    Territory::Enemy
                } else {
                    Territory::Neutral
                }
            }
        }
    }
}

/// `true` if `cell` sits inside a field of `radius` centred at `center`,
/// honouring the cardinal-tip exclusion for territory fields.
pub fn covers(center: GridLocation, cell: GridLocation, radius: u32, territory_field: bool) -> bool {
    let d2 = center.euclidean_sq(cell);
    if d2 > radius * radius {
        return false;
    }
    if territory_field && radius >= TERRITORY_TIP_EXCLUSION_MIN_RADIUS {
        let dr = center.row.abs_diff(cell.row) as u32;
        let dc = center.col.abs_diff(cell.col) as u32;
        if (dr == radius && dc == 0) || (dr == 0 && dc == radius) {
            return false;
        }
    }
    true
}
