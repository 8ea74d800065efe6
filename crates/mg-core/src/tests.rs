//! Unit tests for mg-core.

use crate::location::{pack_coord, LOCATION_EMPTY, LOCATION_GLOBAL};
use crate::{EnvRng, GridLocation, Orientation, StatsTracker};

// ── GridLocation ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod location {
    use super::*;

    #[test]
    fn flat_index_is_row_major() {
        let loc = GridLocation::new(2, 3);
        assert_eq!(loc.flat_index(10), 23);
    }

    #[test]
    fn offset_in_bounds() {
        let loc = GridLocation::new(5, 5);
        assert_eq!(loc.offset(-1, 0), Some(GridLocation::new(4, 5)));
        assert_eq!(loc.offset(0, 2), Some(GridLocation::new(5, 7)));
    }

    #[test]
    fn offset_underflow_is_none() {
        let loc = GridLocation::new(0, 0);
        assert_eq!(loc.offset(-1, 0), None);
        assert_eq!(loc.offset(0, -1), None);
    }

    #[test]
    fn euclidean_sq_matches_hand_computation() {
        let a = GridLocation::new(5, 5);
        let b = GridLocation::new(8, 9);
        assert_eq!(a.euclidean_sq(b), 9 + 16);
        assert_eq!(b.euclidean_sq(a), 25);
        assert_eq!(a.euclidean_sq(a), 0);
    }

    #[test]
    fn chebyshev_is_max_axis() {
        let a = GridLocation::new(5, 5);
        assert_eq!(a.chebyshev(GridLocation::new(7, 6)), 2);
        assert_eq!(a.chebyshev(GridLocation::new(5, 9)), 4);
    }

    #[test]
    fn manhattan_is_sum_axis() {
        let a = GridLocation::new(5, 5);
        assert_eq!(a.manhattan(GridLocation::new(7, 6)), 3);
    }
}

// ── Orientation ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod orientation {
    use super::*;

    #[test]
    fn deltas_are_unit_steps() {
        assert_eq!(Orientation::North.delta(), (-1, 0));
        assert_eq!(Orientation::South.delta(), (1, 0));
        assert_eq!(Orientation::West.delta(), (0, -1));
        assert_eq!(Orientation::East.delta(), (0, 1));
    }

    #[test]
    fn wire_roundtrip() {
        for o in Orientation::ALL {
            assert_eq!(Orientation::from_wire(o as i32), Some(o));
        }
        assert_eq!(Orientation::from_wire(4), None);
        assert_eq!(Orientation::from_wire(-1), None);
    }
}

// ── Packed coordinates ────────────────────────────────────────────────────────

#[cfg(test)]
mod packing {
    use super::*;

    #[test]
    fn pack_nibbles() {
        assert_eq!(pack_coord(0, 0), 0x00);
        assert_eq!(pack_coord(3, 7), 0x37);
        assert_eq!(pack_coord(14, 14), 0xEE);
    }

    #[test]
    fn reserved_bytes_are_unpackable() {
        // 0xFE / 0xFF would need r = 15, which pack_coord never accepts.
        assert_ne!(pack_coord(14, 14), LOCATION_GLOBAL);
        assert_ne!(pack_coord(14, 14), LOCATION_EMPTY);
    }
}

// ── EnvRng ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod rng {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = EnvRng::new(7);
        let mut b = EnvRng::new(7);
        for _ in 0..32 {
            assert_eq!(a.gen_range(0..1000u32), b.gen_range(0..1000u32));
        }
    }

    #[test]
    fn shuffle_is_deterministic() {
        let mut a = EnvRng::new(99);
        let mut b = EnvRng::new(99);
        let mut va: Vec<u32> = (0..20).collect();
        let mut vb: Vec<u32> = (0..20).collect();
        a.shuffle(&mut va);
        b.shuffle(&mut vb);
        assert_eq!(va, vb);
    }

    #[test]
    fn child_streams_are_pure() {
        use rand::Rng;
        let mut s1 = EnvRng::child_stream(1234, 5);
        let mut s2 = EnvRng::child_stream(1234, 5);
        let mut s3 = EnvRng::child_stream(1234, 6);
        let a: u64 = s1.r#gen();
        let b: u64 = s2.r#gen();
        let c: u64 = s3.r#gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn roll_pct_extremes() {
        let mut rng = EnvRng::new(1);
        for _ in 0..50 {
            assert!(!rng.roll_pct(0));
            assert!(rng.roll_pct(100));
        }
    }
}

// ── StatsTracker ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod stats {
    use super::*;

    #[test]
    fn add_interns_and_accumulates() {
        let mut t = StatsTracker::new();
        t.add("hits", 1.0);
        t.add("hits", 2.5);
        assert_eq!(t.get("hits"), 3.5);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn string_path_and_id_path_are_identical() {
        let mut a = StatsTracker::new();
        let mut b = StatsTracker::new();

        a.add("x", 1.0);
        a.add("y", 2.0);
        a.add("x", 3.0);

        let x = b.resolve("x");
        let y = b.resolve("y");
        b.add_id(x, 1.0);
        b.add_id(y, 2.0);
        b.add_id(x, 3.0);

        assert_eq!(a.to_map(), b.to_map());
    }

    #[test]
    fn unknown_stat_reads_zero() {
        let t = StatsTracker::new();
        assert_eq!(t.get("never.written"), 0.0);
        assert_eq!(t.lookup("never.written"), None);
    }

    #[test]
    fn reset_keeps_names() {
        let mut t = StatsTracker::new();
        let id = t.resolve("a");
        t.add_id(id, 5.0);
        t.reset_values();
        assert_eq!(t.get_id(id), 0.0);
        assert_eq!(t.lookup("a"), Some(id));
    }
}
