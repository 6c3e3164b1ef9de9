//! Position types for world objects

use serde::{Deserialize, Serialize};

/// World-space position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared distance to another position
    pub fn distance_squared(self, other: Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Calculate distance to another position
    pub fn distance_to(self, other: Vec3) -> f32 {
        self.distance_squared(other).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_calculation() {
        let pos1 = Vec3::new(0.0, 0.0, 0.0);
        let pos2 = Vec3::new(3.0, 4.0, 0.0);
        assert!((pos1.distance_to(pos2) - 5.0).abs() < 0.001);
        assert_eq!(pos1.distance_squared(pos2), 25.0);
    }

    #[test]
    fn test_distance_includes_height() {
        let pos1 = Vec3::new(1.0, 2.0, 2.0);
        assert_eq!(Vec3::ZERO.distance_squared(pos1), 9.0);
    }
}
