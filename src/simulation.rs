//! Time/usage advancer: detects depleted and expired cargo.
//!
//! This component only reclassifies — it decides that an item is waste
//! and records where it was, never where the waste goes (that is the
//! selector's job). Simulation time moves on demand, not on a wall
//! clock; the caller passes `now` explicitly.

use chrono::{DateTime, Duration, Utc};

use crate::model::{Item, WasteRecord, WasteReason};

/// Applies one retrieval to an item: remaining uses drop by one.
///
/// When the last use is consumed the item's placement is cleared and a
/// depletion record referencing its last container is returned.
pub fn record_retrieval(item: &mut Item) -> Option<WasteRecord> {
    item.usage_limit = item.usage_limit.saturating_sub(1);
    if item.usage_limit > 0 {
        return None;
    }
    let location = item.location.take()?;
    Some(WasteRecord {
        item_id: item.id.clone(),
        name: item.name.clone(),
        reason: WasteReason::Depleted,
        source_container_id: location.container_id,
        undocking_container_id: None,
    })
}

/// Reclassifies placed items that are depleted or expired at `now`.
///
/// Expiry wins when both conditions hold. Affected items lose their
/// placement; the returned records carry the source container. Items
/// without an active placement are left alone — there is no container
/// to reclaim space from.
pub fn advance(items: &mut [Item], now: DateTime<Utc>) -> Vec<WasteRecord> {
    let mut records = Vec::new();
    for item in items.iter_mut() {
        if item.location.is_none() {
            continue;
        }
        let reason = if item.is_expired(now) {
            WasteReason::Expired
        } else if item.is_depleted() {
            WasteReason::Depleted
        } else {
            continue;
        };

        let location = item.location.take().expect("checked above");
        records.push(WasteRecord {
            item_id: item.id.clone(),
            name: item.name.clone(),
            reason,
            source_container_id: location.container_id,
            undocking_container_id: None,
        });
    }
    records
}

/// An item expiring inside the lookahead window.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpiringItem {
    pub item_id: String,
    pub name: String,
    pub expiry: DateTime<Utc>,
    pub days_until: i64,
}

/// Items whose expiry falls in `(now, now + days]`, soonest first.
pub fn expiring_within(items: &[Item], now: DateTime<Utc>, days: i64) -> Vec<ExpiringItem> {
    let cutoff = now + Duration::days(days);
    let mut expiring: Vec<ExpiringItem> = items
        .iter()
        .filter_map(|item| {
            let expiry = item.expiry?;
            if expiry > now && expiry <= cutoff {
                Some(ExpiringItem {
                    item_id: item.id.clone(),
                    name: item.name.clone(),
                    expiry,
                    days_until: (expiry - now).num_days(),
                })
            } else {
                None
            }
        })
        .collect();
    expiring.sort_by(|a, b| a.expiry.cmp(&b.expiry).then_with(|| a.item_id.cmp(&b.item_id)));
    expiring
}

/// Marks the given waste records as assigned to an undocking container.
pub fn assign_undocking_container(records: &mut [WasteRecord], container_id: &str) {
    for record in records.iter_mut() {
        record.undocking_container_id = Some(container_id.to_string());
    }
}

/// Completes undocking of one container: every waste record assigned to
/// it is cleared and the corresponding items leave the active set.
/// Returns the number of items removed.
pub fn complete_undocking(
    items: &mut Vec<Item>,
    records: &mut Vec<WasteRecord>,
    undocking_container_id: &str,
) -> usize {
    let removed_ids: Vec<String> = records
        .iter()
        .filter(|r| r.undocking_container_id.as_deref() == Some(undocking_container_id))
        .map(|r| r.item_id.clone())
        .collect();

    records.retain(|r| r.undocking_container_id.as_deref() != Some(undocking_container_id));
    items.retain(|item| !removed_ids.contains(&item.id));
    removed_ids.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemLocation;
    use crate::types::{BoundingBox, Vec3};

    fn placed_item(id: &str, usage_limit: u32, expiry: Option<DateTime<Utc>>) -> Item {
        let mut item = Item::new(
            id,
            format!("item {}", id),
            Vec3::new(1.0, 1.0, 1.0),
            5,
            expiry,
            usage_limit,
            None,
        )
        .unwrap();
        item.location = Some(ItemLocation {
            container_id: "C1".to_string(),
            boxed: BoundingBox::new(Vec3::zero(), Vec3::new(1.0, 1.0, 1.0)),
        });
        item
    }

    #[test]
    fn retrieval_decrements_and_finally_depletes() {
        let mut item = placed_item("I1", 2, None);

        assert!(record_retrieval(&mut item).is_none());
        assert_eq!(item.usage_limit, 1);
        assert!(item.location.is_some());

        let record = record_retrieval(&mut item).unwrap();
        assert_eq!(record.reason, WasteReason::Depleted);
        assert_eq!(record.source_container_id, "C1");
        assert!(item.location.is_none());
    }

    #[test]
    fn advance_reclaims_expired_items() {
        let now = Utc::now();
        let mut items = vec![
            placed_item("FRESH", 5, Some(now + Duration::days(30))),
            placed_item("OLD", 5, Some(now - Duration::days(1))),
        ];

        let records = advance(&mut items, now);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].item_id, "OLD");
        assert_eq!(records[0].reason, WasteReason::Expired);
        assert!(items[1].location.is_none());
        assert!(items[0].location.is_some());
    }

    #[test]
    fn advance_reclaims_depleted_items() {
        let mut items = vec![placed_item("SPENT", 0, None)];
        let records = advance(&mut items, Utc::now());
        assert_eq!(records[0].reason, WasteReason::Depleted);
    }

    #[test]
    fn expiry_takes_precedence_over_depletion() {
        let now = Utc::now();
        let mut items = vec![placed_item("BOTH", 0, Some(now - Duration::days(1)))];
        let records = advance(&mut items, now);
        assert_eq!(records[0].reason, WasteReason::Expired);
    }

    #[test]
    fn unplaced_items_are_not_reclassified() {
        let now = Utc::now();
        let mut item = placed_item("LOOSE", 0, None);
        item.location = None;
        let mut items = vec![item];
        assert!(advance(&mut items, now).is_empty());
    }

    #[test]
    fn expiring_lookahead_sorts_soonest_first() {
        let now = Utc::now();
        let items = vec![
            placed_item("LATER", 5, Some(now + Duration::days(6))),
            placed_item("SOON", 5, Some(now + Duration::days(2))),
            placed_item("FAR", 5, Some(now + Duration::days(60))),
            placed_item("GONE", 5, Some(now - Duration::days(1))),
        ];

        let expiring = expiring_within(&items, now, 7);
        let ids: Vec<&str> = expiring.iter().map(|e| e.item_id.as_str()).collect();
        assert_eq!(ids, vec!["SOON", "LATER"]);
    }

    #[test]
    fn completed_undocking_clears_records_and_items() {
        let now = Utc::now();
        let mut items = vec![placed_item("W1", 0, None), placed_item("KEEP", 5, None)];
        let mut records = advance(&mut items, now);
        assert_eq!(records.len(), 1);

        assign_undocking_container(&mut records, "UNDOCK");
        let removed = complete_undocking(&mut items, &mut records, "UNDOCK");

        assert_eq!(removed, 1);
        assert!(records.is_empty());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "KEEP");
    }
}
