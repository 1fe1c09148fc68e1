//! Retrieval planner: ordered temporary removals to reach a buried item.
//!
//! An already-placed item B blocks a target T when their silhouettes seen
//! from the access face overlap and B sits strictly nearer the opening
//! (smaller start depth). The plan removes blockers nearest-the-opening
//! first, retrieves the target, then places the blockers back in reverse
//! removal order so the container ends exactly as it started.

use std::cmp::Ordering;

use serde::Serialize;
use utoipa::ToSchema;

use crate::geometry::overlaps_front_projection;
use crate::space::ContainerSpace;

/// One action in a retrieval plan, in the service layer's vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Remove,
    SetAside,
    Retrieve,
    PlaceBack,
}

/// One ordered step of a retrieval plan.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub action: Action,
    pub item_id: String,
}

impl Step {
    fn new(action: Action, item_id: &str) -> Self {
        Self {
            action,
            item_id: item_id.to_string(),
        }
    }
}

/// Complete plan for retrieving one target item.
#[derive(Clone, Debug, PartialEq)]
pub struct RetrievalPlan {
    pub steps: Vec<Step>,
    /// Blocker ids in removal order; place-back happens in reverse.
    pub blockers: Vec<String>,
}

/// Plans the retrieval of `target_item_id` from one container.
///
/// Returns `None` when the target has no box in this container — the
/// not-found outcome, distinct from an empty-blocker plan.
///
/// Invariants: the number of `PlaceBack` steps equals the number of
/// `Remove` steps, and applying the removals then the place-backs to the
/// occupied list is a no-op.
pub fn plan_retrieval(space: &ContainerSpace, target_item_id: &str) -> Option<RetrievalPlan> {
    let target_box = *space.box_of(target_item_id)?;

    let mut blockers: Vec<(String, f64)> = space
        .occupied()
        .iter()
        .filter(|o| o.item_id != target_item_id)
        .filter(|o| {
            o.boxed.start.y < target_box.start.y
                && overlaps_front_projection(&o.boxed, &target_box)
        })
        .map(|o| (o.item_id.clone(), o.boxed.start.y))
        .collect();

    // Nearest the opening is removed first; id as deterministic tie-break.
    blockers.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    let blockers: Vec<String> = blockers.into_iter().map(|(id, _)| id).collect();

    let mut steps = Vec::with_capacity(3 * blockers.len() + 1);
    for id in &blockers {
        steps.push(Step::new(Action::Remove, id));
        steps.push(Step::new(Action::SetAside, id));
    }
    steps.push(Step::new(Action::Retrieve, target_item_id));
    for id in blockers.iter().rev() {
        steps.push(Step::new(Action::PlaceBack, id));
    }

    Some(RetrievalPlan { steps, blockers })
}
