//! Domain records for the stowage engine.
//!
//! All records go through checked constructors: invalid dimensions,
//! malformed boxes and zero priorities are rejected before any engine
//! computation sees them, with the offending field named in the error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::{BoundingBox, Vec3};

/// Validation error raised by the checked constructors.
#[derive(Debug, Clone)]
pub enum ValidationError {
    InvalidDimension(String),
    InvalidPriority(String),
    InvalidBox(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidDimension(msg) => write!(f, "Invalid dimension: {}", msg),
            ValidationError::InvalidPriority(msg) => write!(f, "Invalid priority: {}", msg),
            ValidationError::InvalidBox(msg) => write!(f, "Invalid box: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

fn validate_dimension(value: f64, field: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive and finite, got: {}",
            field, value
        )));
    }
    Ok(())
}

fn validate_dims(dims: Vec3, what: &str) -> Result<(), ValidationError> {
    validate_dimension(dims.x, &format!("{} width", what))?;
    validate_dimension(dims.y, &format!("{} depth", what))?;
    validate_dimension(dims.z, &format!("{} height", what))?;
    Ok(())
}

/// Where an item currently sits: the container and the box it occupies.
///
/// Items reference only their own placement, never other items; the
/// authoritative occupied-box lists live in the space index.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemLocation {
    pub container_id: String,
    pub boxed: BoundingBox,
}

/// A cargo item, placed or not.
#[derive(Clone, Debug)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub dims: Vec3,
    /// Base priority; higher means more important. At least 1.
    pub priority: u32,
    pub expiry: Option<DateTime<Utc>>,
    /// Remaining uses. Zero means depleted.
    pub usage_limit: u32,
    pub preferred_zone: Option<String>,
    pub location: Option<ItemLocation>,
}

impl Item {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        dims: Vec3,
        priority: u32,
        expiry: Option<DateTime<Utc>>,
        usage_limit: u32,
        preferred_zone: Option<String>,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        validate_dims(dims, &format!("item {}", id))?;
        if priority == 0 {
            return Err(ValidationError::InvalidPriority(format!(
                "item {} priority must be at least 1",
                id
            )));
        }
        Ok(Self {
            id,
            name: name.into(),
            dims,
            priority,
            expiry,
            usage_limit,
            preferred_zone,
            location: None,
        })
    }

    pub fn volume(&self) -> f64 {
        self.dims.volume()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry <= now,
            None => false,
        }
    }

    pub fn is_depleted(&self) -> bool {
        self.usage_limit == 0
    }
}

/// A storage container: a rigid axis-aligned volume in a named zone.
#[derive(Clone, Debug)]
pub struct Container {
    pub id: String,
    pub zone: String,
    pub dims: Vec3,
}

impl Container {
    pub fn new(
        id: impl Into<String>,
        zone: impl Into<String>,
        dims: Vec3,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        validate_dims(dims, &format!("container {}", id))?;
        Ok(Self {
            id,
            zone: zone.into(),
            dims,
        })
    }
}

/// The binding of one item to one container at one box.
///
/// Built by the placement engine from positions that `find_position`
/// already proved feasible; boxes arriving over the wire are checked at
/// the API boundary instead.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    pub item_id: String,
    pub container_id: String,
    pub boxed: BoundingBox,
}

/// Why an item was reclassified as waste.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum WasteReason {
    Expired,
    Depleted,
}

impl std::fmt::Display for WasteReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WasteReason::Expired => write!(f, "expired"),
            WasteReason::Depleted => write!(f, "depleted"),
        }
    }
}

/// Record of a waste item awaiting return shipment.
///
/// Created by the time/usage advancer; cleared once undocking of the
/// assigned container completes.
#[derive(Clone, Debug)]
pub struct WasteRecord {
    pub item_id: String,
    pub name: String,
    pub reason: WasteReason,
    pub source_container_id: String,
    pub undocking_container_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(x: f64, y: f64, z: f64) -> Vec3 {
        Vec3::new(x, y, z)
    }

    #[test]
    fn item_constructor_rejects_bad_dimensions() {
        let err = Item::new("I1", "Food", dims(-1.0, 2.0, 2.0), 5, None, 10, None).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("width"), "should name the offending field: {msg}");

        let err = Item::new("I2", "Food", dims(1.0, 2.0, f64::INFINITY), 5, None, 10, None)
            .unwrap_err();
        assert!(err.to_string().contains("height"));
    }

    #[test]
    fn item_constructor_rejects_zero_priority() {
        let err = Item::new("I1", "Food", dims(1.0, 1.0, 1.0), 0, None, 10, None).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPriority(_)));
    }

    #[test]
    fn expiry_boundary_counts_as_expired() {
        let now = Utc::now();
        let item = Item::new("I1", "Food", dims(1.0, 1.0, 1.0), 5, Some(now), 10, None).unwrap();
        assert!(item.is_expired(now));
        assert!(!item.is_expired(now - chrono::Duration::seconds(1)));
    }

    #[test]
    fn depletion_is_zero_remaining_uses() {
        let fresh = Item::new("I1", "Tool", dims(1.0, 1.0, 1.0), 5, None, 1, None).unwrap();
        assert!(!fresh.is_depleted());
        let spent = Item::new("I2", "Tool", dims(1.0, 1.0, 1.0), 5, None, 0, None).unwrap();
        assert!(spent.is_depleted());
    }

    #[test]
    fn container_constructor_validates() {
        assert!(Container::new("C1", "A", dims(10.0, 10.0, 10.0)).is_ok());
        assert!(Container::new("C2", "A", dims(10.0, 0.0, 10.0)).is_err());
    }
}
