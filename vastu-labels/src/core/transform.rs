//! Rigid sensor-to-world transform.

use glam::{Quat, Vec3};

/// Rigid transform (rotation then translation) from sensor frame to world frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transformation {
    /// Rotation from sensor frame to world frame.
    pub rotation: Quat,
    /// Sensor origin in world frame.
    pub translation: Vec3,
}

impl Default for Transformation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transformation {
    /// Identity transform.
    pub const IDENTITY: Transformation = Transformation {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };

    /// Create a transform from rotation and translation.
    pub fn new(rotation: Quat, translation: Vec3) -> Self {
        Self {
            rotation: rotation.normalize(),
            translation,
        }
    }

    /// Pure translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(Quat::IDENTITY, translation)
    }

    /// Sensor origin in world frame.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.translation
    }

    /// Map a sensor-frame point into world frame.
    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }

    /// Inverse transform (world to sensor).
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    /// Compose: apply `other` first, then `self`.
    pub fn compose(&self, other: &Transformation) -> Self {
        Self {
            rotation: (self.rotation * other.rotation).normalize(),
            translation: self.transform_point(other.translation),
        }
    }
}
