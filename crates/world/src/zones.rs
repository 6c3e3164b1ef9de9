//! Named world zones
//!
//! A zone is a polygon on the ground plane (x/z) extruded over a vertical
//! range.

use ember_core::{Vec3, Zone, ZoneService};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Polygonal zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonZone {
    pub name: String,

    /// Outline on the x/z plane
    pub outline: Vec<(f32, f32)>,

    /// Lowest covered y
    pub floor: f32,

    /// Vertical extent above `floor`; zero means unbounded
    pub height: f32,
}

impl PolygonZone {
    pub fn new(name: impl Into<String>, outline: Vec<(f32, f32)>) -> Self {
        Self {
            name: name.into(),
            outline,
            floor: 0.0,
            height: 0.0,
        }
    }

    /// Axis-aligned rectangle from `(x0, z0)` to `(x1, z1)`
    pub fn rect(name: impl Into<String>, x0: f32, z0: f32, x1: f32, z1: f32) -> Self {
        Self::new(name, vec![(x0, z0), (x1, z0), (x1, z1), (x0, z1)])
    }

    pub fn with_height(mut self, floor: f32, height: f32) -> Self {
        self.floor = floor;
        self.height = height;
        self
    }

    fn contains_point(&self, x: f32, z: f32) -> bool {
        let n = self.outline.len();
        if n < 3 {
            return false;
        }

        // Even-odd ray cast towards +x
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, zi) = self.outline[i];
            let (xj, zj) = self.outline[j];
            if (zi > z) != (zj > z) && x < (xj - xi) * (z - zi) / (zj - zi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

impl Zone for PolygonZone {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, position: Vec3) -> bool {
        if self.height > 0.0
            && (position.y < self.floor || position.y > self.floor + self.height)
        {
            return false;
        }
        self.contains_point(position.x, position.z)
    }
}

/// Zone lookup table
#[derive(Debug, Default)]
pub struct ZoneMap {
    zones: HashMap<String, PolygonZone>,
}

impl ZoneMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a zone, keyed by lowercase name
    pub fn insert(&mut self, zone: PolygonZone) {
        self.zones.insert(zone.name.to_lowercase(), zone);
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl ZoneService for ZoneMap {
    fn find_zone(&self, name: &str) -> Option<&dyn Zone> {
        self.zones
            .get(&name.to_lowercase())
            .map(|zone| zone as &dyn Zone)
    }
}
