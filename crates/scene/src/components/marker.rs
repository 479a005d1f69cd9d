use foundation::math::{GeoPoint, Vec3};

use crate::components::Rgb;

/// A point of interest pinned to the globe.
///
/// `position` is local to the owning sphere and is derived from `geo`; it is
/// never edited independently.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub label: String,
    pub color: Rgb,
    pub geo: GeoPoint,
    pub position: Vec3,
    pub clickable: bool,
}
