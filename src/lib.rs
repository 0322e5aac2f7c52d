//! A **labeled cuboid abstraction** of 3D shapes: partitions surface sample
//! points into named semantic parts, fits an oriented bounding cuboid to each
//! part, and learns pairwise Gaussian relation models between the cuboid
//! features of corresponding parts across a training corpus.
//!
//! The two halves of the crate:
//! - [`structure::PartStructure`]: the per-shape model — sample points with
//!   per-label confidence, candidate cuboids per label, bounding-box fitting,
//!   gap-based cuboid splitting, symmetry-driven deduplication, and the
//!   line-oriented text formats they are loaded from.
//! - [`trainer::RelationTrainer`]: the cross-object trainer — label
//!   co-occurrence analysis, missing-label clustering, and joint/conditional
//!   multivariate-Gaussian relation estimation with regularized covariance
//!   inversion.
//!
//! Mesh loading and feature extraction live upstream: the structure is bound
//! to any [`mesh::SurfaceMesh`] implementation, and the trainer consumes
//! opaque per-cuboid [`features::FeatureVector`]s and
//! [`features::FrameTransform`]s.

#![forbid(unsafe_code)]
#![deny(unused)]
#![warn(clippy::missing_const_for_fn, clippy::approx_constant, clippy::all)]

pub mod cuboid;
pub mod errors;
pub mod features;
pub mod float_types;
pub mod io;
pub mod labels;
pub mod mesh;
pub mod sample_point;
pub mod structure;
pub mod trainer;

pub use cuboid::Cuboid;
pub use structure::PartStructure;
pub use trainer::RelationTrainer;
