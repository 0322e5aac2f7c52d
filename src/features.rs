//! Per-cuboid feature vectors and canonical-frame transforms.
//!
//! Feature extraction itself happens upstream; the trainer only consumes the
//! resulting fixed-length vectors and the per-cuboid transform that maps a
//! foreign feature vector into a cuboid's local frame. The layout contract:
//! the leading range is a sequence of 3D points in world coordinates, the
//! trailing [`NUM_GLOBAL_FEATURES`] values are pose-invariant summary
//! statistics left untouched by frame transforms.

use crate::float_types::Real;
use nalgebra::{DVector, Matrix3, Vector3};

/// Length of every feature vector.
pub const NUM_FEATURES: usize = 27;

/// Width of the trailing global-feature block.
pub const NUM_GLOBAL_FEATURES: usize = 9;

/// Number of 3D points encoded in the leading local-feature range.
pub const NUM_LOCAL_POINTS: usize = (NUM_FEATURES - NUM_GLOBAL_FEATURES) / 3;

/// The feature vector of one (object, label) pair.
///
/// A missing part is encoded as a vector containing NaN; such records take
/// part in list alignment but are skipped by every statistical computation.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: DVector<Real>,
}

impl FeatureVector {
    /// Wrap a raw vector. The length must be [`NUM_FEATURES`].
    pub fn new(values: DVector<Real>) -> Option<Self> {
        (values.len() == NUM_FEATURES).then_some(FeatureVector { values })
    }

    /// The marker record for an object in which this label has no part.
    pub fn missing() -> Self {
        FeatureVector {
            values: DVector::from_element(NUM_FEATURES, Real::NAN),
        }
    }

    #[inline]
    pub fn values(&self) -> &DVector<Real> {
        &self.values
    }

    /// Whether this record marks a missing part.
    pub fn has_nan(&self) -> bool {
        self.values.iter().any(|value| value.is_nan())
    }

    /// The trailing pose-invariant block.
    pub fn global_tail(&self) -> DVector<Real> {
        self.values
            .rows(NUM_FEATURES - NUM_GLOBAL_FEATURES, NUM_GLOBAL_FEATURES)
            .into_owned()
    }
}

/// Rigid transform into one cuboid's canonical local frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTransform {
    pub rotation: Matrix3<Real>,
    pub translation: Vector3<Real>,
}

impl Default for FrameTransform {
    fn default() -> Self {
        FrameTransform {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }
}

impl FrameTransform {
    pub fn new(rotation: Matrix3<Real>, translation: Vector3<Real>) -> Self {
        FrameTransform {
            rotation,
            translation,
        }
    }

    /// Express a foreign feature vector in this cuboid's local frame: every
    /// 3D point in the local range becomes `R * (p - t)`; the global tail is
    /// copied verbatim.
    pub fn transformed_features(&self, features: &FeatureVector) -> DVector<Real> {
        let mut transformed = features.values().clone();
        for block in 0..NUM_LOCAL_POINTS {
            let offset = 3 * block;
            let point = Vector3::new(
                transformed[offset],
                transformed[offset + 1],
                transformed[offset + 2],
            );
            let local = self.rotation * (point - self.translation);
            transformed[offset] = local.x;
            transformed[offset + 1] = local.y;
            transformed[offset + 2] = local.z;
        }
        transformed
    }
}
