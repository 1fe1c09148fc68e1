//! Geometry kernel: pure, stateless predicates over axis-aligned boxes.
//!
//! Every higher component (space index, placement engine, retrieval
//! planner) reduces its spatial questions to the functions here. None of
//! them has side effects.

use crate::types::{BoundingBox, Vec3};

/// True iff the open interiors of the two boxes intersect in all three
/// dimensions.
///
/// Boxes that only touch at a face, edge or corner do NOT overlap —
/// flush stacking against a neighbour is always allowed.
pub fn overlaps(a: &BoundingBox, b: &BoundingBox) -> bool {
    // Separating axis: no overlap as soon as they are disjoint along any axis.
    !(a.end.x <= b.start.x
        || b.end.x <= a.start.x
        || a.end.y <= b.start.y
        || b.end.y <= a.start.y
        || a.end.z <= b.start.z
        || b.end.z <= a.start.z)
}

/// True iff `b` lies entirely inside a container of the given dimensions,
/// i.e. `b.start >= (0,0,0)` and `b.end <= container_dims` componentwise.
pub fn contains(container_dims: Vec3, b: &BoundingBox) -> bool {
    b.start.x >= 0.0
        && b.start.y >= 0.0
        && b.start.z >= 0.0
        && b.end.x <= container_dims.x
        && b.end.y <= container_dims.y
        && b.end.z <= container_dims.z
}

/// Volume of a box; never negative for well-formed boxes.
#[allow(dead_code)]
pub fn volume(b: &BoundingBox) -> f64 {
    b.volume()
}

/// Overlap of the two boxes projected onto the access face (x/z plane),
/// open intervals.
///
/// This is the retrieval blocking test: an item in front of another only
/// blocks it when their silhouettes seen from the opening intersect.
pub fn overlaps_front_projection(a: &BoundingBox, b: &BoundingBox) -> bool {
    let x_overlap = !(a.end.x <= b.start.x || b.end.x <= a.start.x);
    let z_overlap = !(a.end.z <= b.start.z || b.end.z <= a.start.z);
    x_overlap && z_overlap
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(sx: f64, sy: f64, sz: f64, ex: f64, ey: f64, ez: f64) -> BoundingBox {
        BoundingBox::new(Vec3::new(sx, sy, sz), Vec3::new(ex, ey, ez))
    }

    #[test]
    fn overlapping_interiors_detected() {
        let a = boxed(0.0, 0.0, 0.0, 10.0, 10.0, 10.0);
        let b = boxed(5.0, 5.0, 5.0, 15.0, 15.0, 15.0);
        assert!(overlaps(&a, &b));
        assert!(overlaps(&b, &a));
    }

    #[test]
    fn touching_faces_do_not_overlap() {
        let a = boxed(0.0, 0.0, 0.0, 5.0, 5.0, 5.0);
        let flush_x = boxed(5.0, 0.0, 0.0, 10.0, 5.0, 5.0);
        let flush_corner = boxed(5.0, 5.0, 5.0, 6.0, 6.0, 6.0);
        assert!(!overlaps(&a, &flush_x));
        assert!(!overlaps(&a, &flush_corner));
    }

    #[test]
    fn disjoint_boxes_do_not_overlap() {
        let a = boxed(0.0, 0.0, 0.0, 2.0, 2.0, 2.0);
        let b = boxed(7.0, 7.0, 7.0, 9.0, 9.0, 9.0);
        assert!(!overlaps(&a, &b));
    }

    #[test]
    fn containment_respects_bounds() {
        let dims = Vec3::new(10.0, 10.0, 10.0);
        assert!(contains(dims, &boxed(0.0, 0.0, 0.0, 10.0, 10.0, 10.0)));
        assert!(contains(dims, &boxed(1.0, 2.0, 3.0, 4.0, 5.0, 6.0)));
        assert!(!contains(dims, &boxed(-0.1, 0.0, 0.0, 5.0, 5.0, 5.0)));
        assert!(!contains(dims, &boxed(5.0, 5.0, 5.0, 10.5, 10.0, 10.0)));
    }

    #[test]
    fn front_projection_ignores_depth() {
        // Same silhouette, separated only in depth: still a projection hit.
        let near = boxed(0.0, 0.0, 0.0, 4.0, 2.0, 4.0);
        let far = boxed(2.0, 6.0, 2.0, 6.0, 8.0, 6.0);
        assert!(overlaps_front_projection(&near, &far));
        assert!(!overlaps(&near, &far));

        // Side by side on the x axis: silhouettes disjoint.
        let left = boxed(0.0, 0.0, 0.0, 3.0, 5.0, 3.0);
        let right = boxed(3.0, 0.0, 0.0, 6.0, 5.0, 3.0);
        assert!(!overlaps_front_projection(&left, &right));
    }

    #[test]
    fn volume_of_unit_box() {
        let b = boxed(1.0, 1.0, 1.0, 2.0, 2.0, 2.0);
        assert!((volume(&b) - 1.0).abs() < f64::EPSILON);
    }
}
