//! Placement engine: batch assignment of items to container positions.
//!
//! First-fit over a deterministic ordering: effective priority first (so
//! urgent cargo is placed even if that later starves a bulkier low-value
//! item), volume-descending as the classic first-fit-decreasing secondary
//! key, item id as the final tie-break. Zone preference only orders the
//! candidate containers, it never excludes one.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Item, Placement};
use crate::space::FleetIndex;
use crate::types::BoundingBox;

/// Pluggable effective-priority policy.
///
/// The engine orders items by the score returned here; the base priority
/// is a starting point that policies may boost (for example near expiry).
pub trait PriorityScorer {
    fn effective_priority(&self, item: &Item, now: DateTime<Utc>) -> u32;
}

/// Default policy: base priority, boosted by a fixed amount when the item
/// expires within the configured window of `now`. Already-expired items
/// get the boost too; the time advancer will reclaim them, but until it
/// runs they are the most urgent cargo on the floor.
#[derive(Clone, Copy, Debug)]
pub struct ExpiryBoostScorer {
    pub window_days: i64,
    pub boost: u32,
}

impl Default for ExpiryBoostScorer {
    fn default() -> Self {
        Self {
            window_days: 7,
            boost: 20,
        }
    }
}

impl PriorityScorer for ExpiryBoostScorer {
    fn effective_priority(&self, item: &Item, now: DateTime<Utc>) -> u32 {
        match item.expiry {
            Some(expiry) if expiry - now <= chrono::Duration::days(self.window_days) => {
                item.priority.saturating_add(self.boost)
            }
            _ => item.priority,
        }
    }
}

/// Progress events emitted while a batch is being placed, suitable for
/// live streaming over SSE.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PlaceEvent {
    ItemPlaced {
        #[serde(rename = "itemId")]
        item_id: String,
        #[serde(rename = "containerId")]
        container_id: String,
        position: BoundingBox,
    },
    ItemUnplaced {
        #[serde(rename = "itemId")]
        item_id: String,
        name: String,
    },
    Finished {
        placed: usize,
        unplaced: usize,
    },
}

/// Result of one placement batch. `unplaced` is an expected partial
/// outcome, not an error.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementOutcome {
    pub placements: Vec<Placement>,
    pub unplaced: Vec<String>,
}

/// Places a batch of new items into the fleet.
///
/// `fleet` is the caller's working index (current occupied state); each
/// successful placement is committed to it immediately so subsequent
/// items see it. Mutation happens one container at a time through the
/// index's `&mut` access, never two containers at once.
///
/// Deterministic: identical inputs yield identical output.
pub fn optimize_placement(
    items: &[Item],
    fleet: &mut FleetIndex,
    scorer: &dyn PriorityScorer,
    now: DateTime<Utc>,
    mut on_event: impl FnMut(&PlaceEvent),
) -> PlacementOutcome {
    let mut ordered: Vec<&Item> = items.iter().collect();
    ordered.sort_by(|a, b| {
        scorer
            .effective_priority(b, now)
            .cmp(&scorer.effective_priority(a, now))
            .then_with(|| {
                b.volume()
                    .partial_cmp(&a.volume())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut placements = Vec::new();
    let mut unplaced = Vec::new();

    for item in ordered {
        let mut committed: Option<Placement> = None;

        for container_id in fleet.candidate_ids(item.preferred_zone.as_deref()) {
            let Some(space) = fleet.space_mut(&container_id) else {
                continue;
            };
            if let Some(position) = space.find_position(item.dims) {
                // find_position guarantees feasibility; insert re-checks
                // and cannot fail here.
                if space.insert(item.id.clone(), position).is_ok() {
                    committed = Some(Placement {
                        item_id: item.id.clone(),
                        container_id,
                        boxed: position,
                    });
                    break;
                }
            }
        }

        match committed {
            Some(placement) => {
                on_event(&PlaceEvent::ItemPlaced {
                    item_id: placement.item_id.clone(),
                    container_id: placement.container_id.clone(),
                    position: placement.boxed,
                });
                placements.push(placement);
            }
            None => {
                on_event(&PlaceEvent::ItemUnplaced {
                    item_id: item.id.clone(),
                    name: item.name.clone(),
                });
                unplaced.push(item.id.clone());
            }
        }
    }

    on_event(&PlaceEvent::Finished {
        placed: placements.len(),
        unplaced: unplaced.len(),
    });

    PlacementOutcome {
        placements,
        unplaced,
    }
}
