//! Shared value types for the stowage engine.
//!
//! Defines the 3D vector and the axis-aligned box every component works
//! with, plus the numerical tolerance used for float comparisons.

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Global numerical tolerance for floating-point comparisons.
pub const EPSILON: f64 = 1e-6;

/// A point or extent in container space.
///
/// Axis convention (relative to the container's open face):
/// * `x` — width, horizontal along the open face
/// * `y` — depth, perpendicular to the open face; the access face is y = 0
/// * `z` — height, vertical along the open face
///
/// On the wire the components are named `width`/`depth`/`height`, the
/// coordinate vocabulary the surrounding service layer uses.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vec3 {
    #[serde(rename = "width")]
    pub x: f64,
    #[serde(rename = "depth")]
    pub y: f64,
    #[serde(rename = "height")]
    pub z: f64,
}

impl Vec3 {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The container origin (closed lower corner at the access face).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Product of all components; the volume when this is an extent.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Checks that all components are positive and finite.
    #[inline]
    pub fn is_valid_dimension(&self) -> bool {
        self.x > 0.0
            && self.y > 0.0
            && self.z > 0.0
            && self.x.is_finite()
            && self.y.is_finite()
            && self.z.is_finite()
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// An axis-aligned box given by its two extreme corners.
///
/// Well-formed boxes satisfy `end > start` componentwise. The checked
/// constructors in [`crate::model`] enforce this before any box enters
/// the engine; the geometry functions assume it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BoundingBox {
    #[serde(rename = "startCoordinates")]
    pub start: Vec3,
    #[serde(rename = "endCoordinates")]
    pub end: Vec3,
}

impl BoundingBox {
    #[inline]
    pub const fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    /// Box with its start corner at `anchor` and the given extent.
    #[inline]
    pub fn from_anchor_and_extent(anchor: Vec3, extent: Vec3) -> Self {
        Self {
            start: anchor,
            end: anchor + extent,
        }
    }

    /// `end > start` in every component, all corners finite.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.start.is_finite() && self.extent().is_valid_dimension()
    }

    /// Extent (width, depth, height) of the box.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.end - self.start
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.extent().volume()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec3_arithmetic() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Vec3::new(3.0, 3.0, 3.0));
    }

    #[test]
    fn vec3_volume_and_validity() {
        let dims = Vec3::new(10.0, 20.0, 30.0);
        assert!((dims.volume() - 6000.0).abs() < EPSILON);
        assert!(dims.is_valid_dimension());
        assert!(!Vec3::new(0.0, 1.0, 1.0).is_valid_dimension());
        assert!(!Vec3::new(f64::NAN, 1.0, 1.0).is_valid_dimension());
    }

    #[test]
    fn bounding_box_well_formed() {
        let ok = BoundingBox::new(Vec3::zero(), Vec3::new(2.0, 2.0, 2.0));
        assert!(ok.is_well_formed());
        assert!((ok.volume() - 8.0).abs() < EPSILON);

        let degenerate = BoundingBox::new(Vec3::zero(), Vec3::new(2.0, 0.0, 2.0));
        assert!(!degenerate.is_well_formed());

        let inverted = BoundingBox::new(Vec3::new(3.0, 3.0, 3.0), Vec3::new(1.0, 1.0, 1.0));
        assert!(!inverted.is_well_formed());
    }

    #[test]
    fn bounding_box_serializes_with_wire_names() {
        let b = BoundingBox::from_anchor_and_extent(Vec3::zero(), Vec3::new(2.0, 3.0, 4.0));
        let json = serde_json::to_value(b).unwrap();
        assert_eq!(json["startCoordinates"]["width"], 0.0);
        assert_eq!(json["endCoordinates"]["depth"], 3.0);
        assert_eq!(json["endCoordinates"]["height"], 4.0);
    }
}
