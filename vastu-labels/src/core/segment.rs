//! Segmented point groups submitted for integration.

use glam::Vec3;

use super::color::Color;
use super::label::Label;
use super::transform::Transformation;

/// One group of points from an observation batch that will share a label.
///
/// Points are in sensor frame; `transform` maps them to world frame.
/// `labels` is empty until the segment is assigned, then holds the same
/// label for every point.
#[derive(Clone, Debug, Default)]
pub struct Segment {
    /// Points in sensor frame.
    pub points_c: Vec<Vec3>,
    /// Sensor-to-world transform.
    pub transform: Transformation,
    /// Per-point color.
    pub colors: Vec<Color>,
    /// Per-point label (uniform once assigned).
    pub labels: Vec<Label>,
}

impl Segment {
    /// Create an unlabeled segment.
    ///
    /// # Panics
    /// If `points_c` and `colors` differ in length.
    pub fn new(transform: Transformation, points_c: Vec<Vec3>, colors: Vec<Color>) -> Self {
        assert_eq!(
            points_c.len(),
            colors.len(),
            "segment points and colors must have equal length"
        );
        Self {
            points_c,
            transform,
            colors,
            labels: Vec::new(),
        }
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points_c.len()
    }

    /// Segment has no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points_c.is_empty()
    }

    /// Points in world frame.
    pub fn world_points(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.points_c
            .iter()
            .map(move |&p| self.transform.transform_point(p))
    }

    /// The segment's label, once assigned.
    pub fn label(&self) -> Option<Label> {
        match self.labels.first() {
            Some(&label) if self.labels.len() == self.points_c.len() => Some(label),
            _ => None,
        }
    }

    /// Give every point `label`.
    pub fn assign_label(&mut self, label: Label) {
        self.labels.clear();
        self.labels.resize(self.points_c.len(), label);
    }

    /// Has every point been labeled?
    pub fn is_labeled(&self) -> bool {
        !self.points_c.is_empty() && self.labels.len() == self.points_c.len()
    }
}
