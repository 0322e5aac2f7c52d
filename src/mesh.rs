//! Interface to the surface mesh a part structure is built over.
//!
//! Mesh loading, topology and normalization live outside this crate; the
//! part structure only needs face/vertex lookup, the per-face ground-truth
//! label annotation, and the normalization transform recorded by the loader.

use crate::float_types::Real;
use nalgebra::{Point3, Vector3};

/// Index of a face in the source mesh.
pub type FaceIndex = usize;
/// Index of a vertex in the source mesh.
pub type VertexIndex = usize;

/// The mesh collaborator a [`PartStructure`](crate::structure::PartStructure)
/// is bound to.
///
/// Implementations must keep face and vertex indices stable for the lifetime
/// of the structure; sample points refer to faces by index.
pub trait SurfaceMesh {
    /// Number of faces in the mesh.
    fn num_faces(&self) -> usize;

    /// The three vertex indices of a triangular face.
    fn face_vertices(&self, face: FaceIndex) -> [VertexIndex; 3];

    /// Position of a vertex.
    fn point(&self, vertex: VertexIndex) -> Point3<Real>;

    /// Ground-truth label annotation of a face, if the mesh carries one.
    /// Returned indices must be valid for the label set loaded into the
    /// structure.
    fn face_label(&self, face: FaceIndex) -> Option<usize>;

    /// Uniform scale recorded when the mesh was normalized. Must be `> 0`.
    fn scale(&self) -> Real;

    /// Translation recorded when the mesh was normalized.
    fn translation(&self) -> Vector3<Real>;

    /// Diameter of the object's bounding sphere, in mesh units. Used as the
    /// scale-invariant reference length for cuboid splitting.
    fn object_diameter(&self) -> Real;
}
