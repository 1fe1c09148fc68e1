//! Container space index: authoritative free/occupied volume bookkeeping.
//!
//! One [`ContainerSpace`] owns the occupied-box list of one container;
//! all mutation goes through `&mut self`, so there is exactly one writer
//! per container at a time while distinct containers stay independent.
//! The [`FleetIndex`] rebuilds the whole picture from the persisted
//! placement set at the start of each engine call and rejects state that
//! violates the engine's contracts.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::geometry::{contains, overlaps};
use crate::model::{Container, Item};
use crate::types::{BoundingBox, EPSILON, Vec3};

/// Contract violation found while rebuilding the index from persisted
/// state. These are programming errors in the collaborating store, not
/// expected outcomes; callers surface them as fatal.
#[derive(Debug, Clone)]
pub enum StateError {
    UnknownContainer { container_id: String, item_id: String },
    DuplicateContainer { container_id: String },
    OutOfBounds { container_id: String, item_id: String },
    OverlappingState { container_id: String, item_id: String },
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateError::UnknownContainer { container_id, item_id } => write!(
                f,
                "item {} is placed in container {} which is not in the supplied container list",
                item_id, container_id
            ),
            StateError::DuplicateContainer { container_id } => {
                write!(f, "container {} supplied more than once", container_id)
            }
            StateError::OutOfBounds { container_id, item_id } => write!(
                f,
                "item {} extends outside the bounds of container {}",
                item_id, container_id
            ),
            StateError::OverlappingState { container_id, item_id } => write!(
                f,
                "item {} overlaps another occupied box in container {}",
                item_id, container_id
            ),
        }
    }
}

impl std::error::Error for StateError {}

/// One occupied box and the item that owns it.
#[derive(Clone, Debug, PartialEq)]
pub struct OccupiedBox {
    pub item_id: String,
    pub boxed: BoundingBox,
}

/// Free/occupied bookkeeping for a single container.
#[derive(Clone, Debug)]
pub struct ContainerSpace {
    container: Container,
    occupied: Vec<OccupiedBox>,
}

impl ContainerSpace {
    pub fn new(container: Container) -> Self {
        Self {
            container,
            occupied: Vec::new(),
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn occupied(&self) -> &[OccupiedBox] {
        &self.occupied
    }

    pub fn box_of(&self, item_id: &str) -> Option<&BoundingBox> {
        self.occupied
            .iter()
            .find(|o| o.item_id == item_id)
            .map(|o| &o.boxed)
    }

    /// True iff `b` lies inside the container and overlaps no occupied box.
    pub fn can_place(&self, b: &BoundingBox) -> bool {
        contains(self.container.dims, b) && !self.occupied.iter().any(|o| overlaps(&o.boxed, b))
    }

    /// Deterministic search for a feasible position of the given extent.
    ///
    /// Candidate anchors are the container origin plus, for every occupied
    /// box, the three extreme points flush against its far faces. That
    /// bounds the search to O(n) candidates while still reaching every
    /// flush-stacked position; items never float, so a feasible placement
    /// always aligns with a prior box edge or the floor/walls. Anchors are
    /// tried lowest z first, then lowest y (closest to the access face),
    /// then lowest x, which keeps early cargo low and reachable and is the
    /// ordering the retrieval planner's depth reasoning relies on.
    pub fn find_position(&self, extent: Vec3) -> Option<BoundingBox> {
        let mut anchors: Vec<Vec3> = Vec::with_capacity(1 + 3 * self.occupied.len());
        anchors.push(Vec3::zero());
        for o in &self.occupied {
            let b = &o.boxed;
            anchors.push(Vec3::new(b.end.x, b.start.y, b.start.z));
            anchors.push(Vec3::new(b.start.x, b.end.y, b.start.z));
            anchors.push(Vec3::new(b.start.x, b.start.y, b.end.z));
        }

        anchors.sort_by(anchor_order);
        anchors.dedup_by(|a, b| {
            (a.x - b.x).abs() < EPSILON && (a.y - b.y).abs() < EPSILON && (a.z - b.z).abs() < EPSILON
        });

        for anchor in anchors {
            let candidate = BoundingBox::from_anchor_and_extent(anchor, extent);
            if self.can_place(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Atomically adds one box. The caller must have established
    /// feasibility; a conflicting box is reported, never silently kept.
    pub fn insert(&mut self, item_id: impl Into<String>, boxed: BoundingBox) -> Result<(), StateError> {
        let item_id = item_id.into();
        if !contains(self.container.dims, &boxed) {
            return Err(StateError::OutOfBounds {
                container_id: self.container.id.clone(),
                item_id,
            });
        }
        if self.occupied.iter().any(|o| overlaps(&o.boxed, &boxed)) {
            return Err(StateError::OverlappingState {
                container_id: self.container.id.clone(),
                item_id,
            });
        }
        self.occupied.push(OccupiedBox { item_id, boxed });
        Ok(())
    }

    /// Atomically removes the box owned by `item_id`, returning it.
    #[allow(dead_code)]
    pub fn remove(&mut self, item_id: &str) -> Option<BoundingBox> {
        let idx = self.occupied.iter().position(|o| o.item_id == item_id)?;
        Some(self.occupied.swap_remove(idx).boxed)
    }
}

// Must be a total order (sort_by panics otherwise); tolerance-based
// equality is intransitive, so near-coincident anchors are collapsed by
// the epsilon dedup after sorting instead.
fn anchor_order(a: &Vec3, b: &Vec3) -> Ordering {
    a.z.total_cmp(&b.z)
        .then_with(|| a.y.total_cmp(&b.y))
        .then_with(|| a.x.total_cmp(&b.x))
}

/// Space indices for the whole fleet, keyed by container id.
///
/// `BTreeMap` keeps iteration in container-id order, which the placement
/// engine's candidate ordering and determinism guarantee depend on.
#[derive(Clone, Debug, Default)]
pub struct FleetIndex {
    spaces: BTreeMap<String, ContainerSpace>,
}

impl FleetIndex {
    /// Rebuilds the authoritative occupied lists from the current
    /// placement set. Placements naming unknown containers, escaping
    /// container bounds or overlapping each other are contract
    /// violations and abort the build.
    pub fn build(containers: &[Container], items: &[Item]) -> Result<Self, StateError> {
        let mut spaces: BTreeMap<String, ContainerSpace> = BTreeMap::new();
        for container in containers {
            if spaces
                .insert(container.id.clone(), ContainerSpace::new(container.clone()))
                .is_some()
            {
                return Err(StateError::DuplicateContainer {
                    container_id: container.id.clone(),
                });
            }
        }

        for item in items {
            let Some(location) = &item.location else {
                continue;
            };
            let space = spaces.get_mut(&location.container_id).ok_or_else(|| {
                StateError::UnknownContainer {
                    container_id: location.container_id.clone(),
                    item_id: item.id.clone(),
                }
            })?;
            space.insert(item.id.clone(), location.boxed)?;
        }

        Ok(Self { spaces })
    }

    pub fn space(&self, container_id: &str) -> Option<&ContainerSpace> {
        self.spaces.get(container_id)
    }

    pub fn space_mut(&mut self, container_id: &str) -> Option<&mut ContainerSpace> {
        self.spaces.get_mut(container_id)
    }

    /// Container ids in id order, preferred zone first.
    ///
    /// The zone preference is soft: non-matching containers follow the
    /// matching ones rather than being excluded.
    pub fn candidate_ids(&self, preferred_zone: Option<&str>) -> Vec<String> {
        let mut preferred = Vec::new();
        let mut rest = Vec::new();
        for space in self.spaces.values() {
            if preferred_zone.is_some_and(|z| space.container().zone == z) {
                preferred.push(space.container().id.clone());
            } else {
                rest.push(space.container().id.clone());
            }
        }
        preferred.extend(rest);
        preferred
    }
}
