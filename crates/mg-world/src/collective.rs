//! Collectives — teams with shared inventory, stats, and held-resource accounting.

use mg_core::{CollectiveId, StatId, StatsTracker};

use crate::Inventory;

/// A team/faction.  Agents aligned to a collective share its inventory and
/// contribute to its stats; alignment filters compare agents' collective ids.
#[derive(Debug, Clone)]
pub struct Collective {
    /// Dense id, assigned alphabetically by name at construction.
    pub id: CollectiveId,

    pub name: String,

    /// Shared (uncapped) team inventory.
    pub inventory: Inventory,

    pub stats: StatsTracker,

    /// Pre-resolved `held.<resource>` stat slots, indexed by `ResourceId`.
    /// Written every tick by held-stats accumulation.
    held_stat_ids: Vec<StatId>,
}

impl Collective {
    /// Build a collective, interning one `held.<resource>` stat per resource
    /// so the per-tick accumulation path never touches strings.
    pub fn new(
        id: CollectiveId,
        name: String,
        inventory: Inventory,
        resource_names: &[String],
    ) -> Self {
        let mut stats = StatsTracker::new();
        let held_stat_ids = resource_names
            .iter()
            .map(|r| stats.resolve(&format!("held.{r}")))
            .collect();
        Self {
            id,
            name,
            inventory,
            stats,
            held_stat_ids,
        }
    }

    /// Credit this tick's holdings of one member: `amount` units of the
    /// resource at dense index `resource_index`.
    #[inline]
    pub fn accumulate_held(&mut self, resource_index: usize, amount: u32) {
        if amount > 0 {
            self.stats.add_id(self.held_stat_ids[resource_index], amount as f64);
        }
    }
}
