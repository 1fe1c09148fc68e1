//! Waste selector: volume-bounded choice of items for a return shipment.
//!
//! The default policy packs the smallest items first, which maximizes the
//! number of items cleared per return trip under a hard volume cap. That
//! is the domain goal — clear maximum clutter — and deliberately not a
//! value-optimal knapsack; the value-greedy alternative is available as a
//! policy switch.

use std::cmp::Ordering;

use crate::model::{Item, WasteReason, WasteRecord};

/// Selection policy for the volume budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WastePolicy {
    /// Smallest volume first: maximizes the count of returned items.
    #[default]
    MaxCount,
    /// Highest priority first: greedy value heuristic, not an exact
    /// knapsack solve (candidate counts are modest).
    MaxValue,
}

/// One waste item offered to the selector.
#[derive(Clone, Debug, PartialEq)]
pub struct WasteCandidate {
    pub item_id: String,
    pub name: String,
    pub reason: WasteReason,
    pub source_container_id: String,
    pub volume: f64,
    pub priority: u32,
}

impl WasteCandidate {
    pub fn from_record(record: &WasteRecord, item: &Item) -> Self {
        Self {
            item_id: record.item_id.clone(),
            name: record.name.clone(),
            reason: record.reason,
            source_container_id: record.source_container_id.clone(),
            volume: item.volume(),
            priority: item.priority,
        }
    }
}

/// The chosen subset and its cumulative volume.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct WasteSelection {
    pub selected: Vec<WasteCandidate>,
    pub total_volume: f64,
}

/// Picks waste items whose volumes sum to at most `max_volume`.
///
/// Guarantees: the returned total never exceeds the cap; an empty
/// selection (nothing fits) is a normal outcome, not an error. Ties are
/// broken by item id for determinism.
pub fn select_waste(
    candidates: &[WasteCandidate],
    max_volume: f64,
    policy: WastePolicy,
) -> WasteSelection {
    let mut ordered: Vec<&WasteCandidate> = candidates.iter().collect();
    match policy {
        WastePolicy::MaxCount => ordered.sort_by(|a, b| {
            a.volume
                .partial_cmp(&b.volume)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.item_id.cmp(&b.item_id))
        }),
        WastePolicy::MaxValue => ordered.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| {
                    a.volume
                        .partial_cmp(&b.volume)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.item_id.cmp(&b.item_id))
        }),
    }

    let mut selection = WasteSelection::default();
    for candidate in ordered {
        if selection.total_volume + candidate.volume > max_volume {
            match policy {
                // Volumes ascend, so nothing further can fit either.
                WastePolicy::MaxCount => break,
                WastePolicy::MaxValue => continue,
            }
        }
        selection.total_volume += candidate.volume;
        selection.selected.push(candidate.clone());
    }
    selection
}
