//! Oriented bounding cuboids over sets of sample points.

use crate::float_types::{Real, SPLIT_GAP_RATIO};
use crate::labels::LabelIndex;
use crate::sample_point::{SamplePoint, SamplePointIndex};
use nalgebra::{Point3, Vector3};

/// Number of corners of a cuboid.
pub const NUM_CORNERS: usize = 8;

/// An oriented box representing one instance of a labeled part.
///
/// Corner order is bit-coded in the cuboid's local frame: bit 0 selects the
/// high-x side, bit 1 the high-y side, bit 2 the high-z side. `corners[0..4]`
/// is therefore the low-z face and `corners[4..8]` the high-z face, and the
/// center is the mean of the corners.
///
/// A cuboid never owns sample points; it holds arena handles into the sample
/// point store of the owning [`PartStructure`](crate::structure::PartStructure).
#[derive(Debug, Clone, PartialEq)]
pub struct Cuboid {
    label: LabelIndex,
    center: Point3<Real>,
    corners: [Point3<Real>; NUM_CORNERS],
    axes: [Vector3<Real>; 3],
    points: Vec<SamplePointIndex>,
}

impl Cuboid {
    /// An empty, degenerate cuboid at the origin with world-aligned axes.
    pub fn new(label: LabelIndex) -> Self {
        Cuboid {
            label,
            center: Point3::origin(),
            corners: [Point3::origin(); NUM_CORNERS],
            axes: [Vector3::x(), Vector3::y(), Vector3::z()],
            points: Vec::new(),
        }
    }

    /// Build a cuboid from an explicit corner listing (cuboid file format).
    /// The center is derived as the corner mean, then the corners are snapped
    /// to an exact axis-aligned lattice.
    pub fn from_corners(label: LabelIndex, corners: [Point3<Real>; NUM_CORNERS]) -> Self {
        let mut cuboid = Cuboid::new(label);
        cuboid.corners = corners;
        let mut center = Vector3::zeros();
        for corner in &corners {
            center += corner.coords;
        }
        cuboid.center = Point3::from(center / NUM_CORNERS as Real);
        cuboid.cuboidize();
        cuboid
    }

    #[inline]
    pub const fn label(&self) -> LabelIndex {
        self.label
    }

    pub fn set_label(&mut self, label: LabelIndex) {
        self.label = label;
    }

    #[inline]
    pub const fn center(&self) -> Point3<Real> {
        self.center
    }

    #[inline]
    pub fn corner(&self, index: usize) -> Point3<Real> {
        self.corners[index]
    }

    #[inline]
    pub const fn corners(&self) -> &[Point3<Real>; NUM_CORNERS] {
        &self.corners
    }

    #[inline]
    pub const fn axes(&self) -> &[Vector3<Real>; 3] {
        &self.axes
    }

    #[inline]
    pub fn sample_point_indices(&self) -> &[SamplePointIndex] {
        &self.points
    }

    #[inline]
    pub fn num_sample_points(&self) -> usize {
        self.points.len()
    }

    pub fn add_sample_point(&mut self, point: SamplePointIndex) {
        self.points.push(point);
    }

    pub fn add_sample_points(&mut self, points: impl IntoIterator<Item = SamplePointIndex>) {
        self.points.extend(points);
    }

    pub fn clear_sample_points(&mut self) {
        self.points.clear();
    }

    /// Coordinates of a world-space position in the cuboid's local frame.
    #[inline]
    fn to_local(&self, position: &Point3<Real>) -> Vector3<Real> {
        Vector3::new(
            self.axes[0].dot(&position.coords),
            self.axes[1].dot(&position.coords),
            self.axes[2].dot(&position.coords),
        )
    }

    #[inline]
    fn to_world(&self, local: &Vector3<Real>) -> Point3<Real> {
        Point3::from(self.axes[0] * local.x + self.axes[1] * local.y + self.axes[2] * local.z)
    }

    fn set_from_local_extents(&mut self, min: Vector3<Real>, max: Vector3<Real>) {
        for index in 0..self.corners.len() {
            let local = Vector3::new(
                if index & 1 == 0 { min.x } else { max.x },
                if index & 2 == 0 { min.y } else { max.y },
                if index & 4 == 0 { min.z } else { max.z },
            );
            self.corners[index] = self.to_world(&local);
        }
        self.center = self.to_world(&((min + max) * 0.5));
    }

    /// Local-frame extents spanned by the current corners.
    fn local_extents(&self) -> (Vector3<Real>, Vector3<Real>) {
        let mut min = self.to_local(&self.corners[0]);
        let mut max = min;
        for corner in &self.corners[1..] {
            let local = self.to_local(corner);
            min = min.inf(&local);
            max = max.sup(&local);
        }
        (min, max)
    }

    /// Snap the corners back to the exact axis-aligned lattice spanned by the
    /// current corner extents, re-deriving the center. Restores the corner
    /// order and center-is-corner-mean invariants after corners have been set
    /// from external data.
    pub fn cuboidize(&mut self) {
        let (min, max) = self.local_extents();
        self.set_from_local_extents(min, max);
    }

    /// Fit the bounding box over the assigned sample points, in the cuboid's
    /// local axes. Returns `false` when no points are assigned; the cuboid is
    /// left unchanged in that case and should be discarded by the caller.
    pub fn compute_bbox(&mut self, points: &[SamplePoint]) -> bool {
        let mut indices = self.points.iter();
        let Some(&first) = indices.next() else {
            return false;
        };
        let mut min = self.to_local(&points[first].position);
        let mut max = min;
        for &index in indices {
            let local = self.to_local(&points[index].position);
            min = min.inf(&local);
            max = max.sup(&local);
        }
        self.set_from_local_extents(min, max);
        true
    }

    /// Volume of the box, the product of its three local extents.
    pub fn volume(&self) -> Real {
        let (min, max) = self.local_extents();
        let extent = max - min;
        extent.x * extent.y * extent.z
    }

    /// Split the cuboid into disjoint sub-cuboids when its points are better
    /// explained as several boxes.
    ///
    /// The points are projected on each local axis; the largest gap between
    /// neighboring projections, taken over all three axes, decides the split.
    /// A gap wider than [`SPLIT_GAP_RATIO`] of the object diameter cuts the
    /// point set in two at the gap midpoint, and both halves are refitted and
    /// split recursively. A cuboid whose points show no such gap is returned
    /// unchanged, so the result is never empty for a non-empty cuboid.
    pub fn split(&self, points: &[SamplePoint], object_diameter: Real) -> Vec<Cuboid> {
        if self.points.len() < 2 {
            return vec![self.clone()];
        }

        let mut best_axis = 0;
        let mut best_gap = 0.0;
        let mut best_cut = 0.0;
        for axis in 0..3 {
            let mut projections: Vec<Real> = self
                .points
                .iter()
                .map(|&index| self.axes[axis].dot(&points[index].position.coords))
                .collect();
            projections.sort_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
            for window in projections.windows(2) {
                let gap = window[1] - window[0];
                if gap > best_gap {
                    best_axis = axis;
                    best_gap = gap;
                    best_cut = 0.5 * (window[0] + window[1]);
                }
            }
        }

        if best_gap <= SPLIT_GAP_RATIO * object_diameter {
            return vec![self.clone()];
        }

        let (low, high): (Vec<SamplePointIndex>, Vec<SamplePointIndex>) =
            self.points.iter().partition(|&&index| {
                self.axes[best_axis].dot(&points[index].position.coords) < best_cut
            });

        let mut result = Vec::with_capacity(2);
        for side in [low, high] {
            let mut sub = self.clone();
            sub.points = side;
            if sub.compute_bbox(points) {
                result.extend(sub.split(points, object_diameter));
            }
        }
        result
    }

    /// Merge several cuboids into one box bounding all their corners and
    /// owning the union of their point assignments. Returns `None` for an
    /// empty input.
    pub fn merge(label: LabelIndex, cuboids: &[Cuboid]) -> Option<Cuboid> {
        let first = cuboids.first()?;
        let mut merged = Cuboid::new(label);
        merged.axes = first.axes;
        let mut min = merged.to_local(&first.corners[0]);
        let mut max = min;
        for cuboid in cuboids {
            for corner in &cuboid.corners {
                let local = merged.to_local(corner);
                min = min.inf(&local);
                max = max.sup(&local);
            }
            merged.points.extend_from_slice(&cuboid.points);
        }
        merged.set_from_local_extents(min, max);
        Some(merged)
    }

    /// Re-derive the cuboid's label from the summed confidence of its
    /// assigned points (arg-max, first label winning ties). A cuboid without
    /// points, or whose points carry no confidences, keeps its label.
    pub fn update_label_using_sample_points(&mut self, points: &[SamplePoint]) {
        let num_labels = self
            .points
            .iter()
            .map(|&index| points[index].confidence.len())
            .max()
            .unwrap_or(0);
        if num_labels == 0 {
            return;
        }

        let mut summed = vec![0.0; num_labels];
        for &index in &self.points {
            for (label, &confidence) in points[index].confidence.iter().enumerate() {
                summed[label] += confidence;
            }
        }

        let mut best = 0;
        let mut best_sum = Real::MIN;
        for (label, &sum) in summed.iter().enumerate() {
            if sum > best_sum {
                best_sum = sum;
                best = label;
            }
        }
        self.label = best;
    }
}
