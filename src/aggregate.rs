//! Collapse region results to the most general complete ancestors.
//!
//! A region query returns every administrative unit that touches the region,
//! at every level. The aggregator reduces that to a readable set: a parent
//! whose children are all present replaces them, and a parent listed next to
//! some of its own children gives way to the more specific children.

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::PlaceCache;
use crate::error::StoreError;
use crate::models::Place;
use crate::store::PlaceStore;

/// Upper bound on demote/promote passes; one pass per hierarchy level is enough.
pub const MAX_AGGREGATION_PASSES: usize = 8;

pub struct HierarchyAggregator<'a, S: ?Sized> {
    store: &'a S,
    places: &'a PlaceCache,
}

impl<'a, S: PlaceStore + ?Sized> HierarchyAggregator<'a, S> {
    pub fn new(store: &'a S, places: &'a PlaceCache) -> Self {
        Self { store, places }
    }

    /// Aggregate `places` until a pass leaves the set unchanged.
    ///
    /// Surviving places keep their input order; promoted parents follow in the
    /// order their first child appeared.
    pub async fn aggregate(&self, places: Vec<Place>) -> Result<Vec<Place>, StoreError> {
        let mut seen = HashSet::new();
        let mut current: Vec<Place> = places.into_iter().filter(|p| seen.insert(p.id)).collect();

        for pass in 1..=MAX_AGGREGATION_PASSES {
            let next = self.aggregate_pass(&current).await?;
            if same_ids(&current, &next) {
                debug!("Aggregation settled after {} pass(es): {} places", pass, next.len());
                return Ok(next);
            }
            current = next;
        }

        warn!(
            "Aggregation did not settle within {} passes, returning {} places",
            MAX_AGGREGATION_PASSES,
            current.len()
        );
        Ok(current)
    }

    async fn aggregate_pass(&self, places: &[Place]) -> Result<Vec<Place>, StoreError> {
        let present: HashSet<Uuid> = places.iter().map(|p| p.id).collect();

        // Demote: a parent next to any of its children yields to them.
        let shadowed: HashSet<Uuid> = places
            .iter()
            .filter_map(|p| p.parent_id)
            .filter(|parent| present.contains(parent))
            .collect();
        let remaining: Vec<&Place> = places
            .iter()
            .filter(|p| !shadowed.contains(&p.id))
            .collect();

        // Promote: group the survivors by parent, first-seen order.
        let mut groups: Vec<(Uuid, Vec<Uuid>)> = Vec::new();
        let mut group_index: HashMap<Uuid, usize> = HashMap::new();
        for place in &remaining {
            let Some(parent_id) = place.parent_id else {
                continue;
            };
            let idx = *group_index.entry(parent_id).or_insert_with(|| {
                groups.push((parent_id, Vec::new()));
                groups.len() - 1
            });
            groups[idx].1.push(place.id);
        }

        if groups.is_empty() {
            return Ok(remaining.into_iter().cloned().collect());
        }

        let parent_ids: Vec<Uuid> = groups.iter().map(|(id, _)| *id).collect();
        let (counts, parents) = futures::try_join!(
            self.store.children_count_batch(&parent_ids),
            self.places.get_many(self.store, &parent_ids)
        )?;

        let mut absorbed: HashSet<Uuid> = HashSet::new();
        let mut promoted: Vec<Place> = Vec::new();
        for (parent_id, children) in &groups {
            let total = counts.get(parent_id).copied().unwrap_or(0);
            if total == 0 || (children.len() as u32) < total {
                continue;
            }
            let Some(parent) = parents.get(parent_id) else {
                warn!("Parent {} has {} children but no record, skipping", parent_id, total);
                continue;
            };
            debug!(
                "Promoting {} ({}/{} children present)",
                parent.name,
                children.len(),
                total
            );
            absorbed.extend(children.iter().copied());
            promoted.push(parent.clone());
        }

        let mut result: Vec<Place> = remaining
            .into_iter()
            .filter(|p| !absorbed.contains(&p.id))
            .cloned()
            .collect();
        for parent in promoted {
            if !result.iter().any(|p| p.id == parent.id) {
                result.push(parent);
            }
        }
        Ok(result)
    }
}

fn same_ids(a: &[Place], b: &[Place]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.id == y.id)
}
