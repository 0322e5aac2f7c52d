//! Surface sample points with per-label confidence.

use crate::float_types::Real;
use crate::mesh::FaceIndex;
use nalgebra::{Point3, Vector3};

/// Arena handle of a sample point inside a
/// [`PartStructure`](crate::structure::PartStructure). Handles are stable
/// until sample points are removed or cleared.
pub type SamplePointIndex = usize;

/// A point sampled on the surface of the source mesh.
///
/// The position is mutable: the owning structure applies its global
/// similarity transform to every sample point in place. The face
/// correspondence and barycentric coordinate always refer back to the
/// untransformed mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePoint {
    /// Source face this point was sampled from.
    pub face: FaceIndex,
    /// Barycentric coordinate of the point on its source face.
    pub barycentric: Vector3<Real>,
    /// Current position, in the structure's transformed frame.
    pub position: Point3<Real>,
    /// Per-label confidence, indexed by label index. Nonnegative, not
    /// required to sum to one. Empty until confidences are loaded or
    /// derived from mesh annotations.
    pub confidence: Vec<Real>,
}

impl SamplePoint {
    pub const fn new(face: FaceIndex, barycentric: Vector3<Real>, position: Point3<Real>) -> Self {
        SamplePoint {
            face,
            barycentric,
            position,
            confidence: Vec::new(),
        }
    }

    /// Confidence for one label; labels without a stored value count as zero.
    #[inline]
    pub fn label_confidence(&self, label: usize) -> Real {
        self.confidence.get(label).copied().unwrap_or(0.0)
    }

    /// The label of the point: arg-max confidence, first occurrence winning
    /// ties. `None` when no confidences are stored.
    pub fn label(&self) -> Option<usize> {
        if self.confidence.is_empty() {
            return None;
        }
        let mut best = 0;
        let mut best_confidence = Real::MIN;
        for (label, &confidence) in self.confidence.iter().enumerate() {
            if confidence > best_confidence {
                best_confidence = confidence;
                best = label;
            }
        }
        Some(best)
    }
}
