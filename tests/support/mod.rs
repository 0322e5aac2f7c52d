//! Test support library
//! Stub mesh, corpus builders, and file helpers shared by the suites.

#![allow(dead_code)]

use nalgebra::{DVector, Matrix3, Point3, Vector3};
use partbox::features::{FeatureVector, FrameTransform, NUM_FEATURES};
use partbox::float_types::Real;
use partbox::mesh::{FaceIndex, SurfaceMesh, VertexIndex};
use std::path::{Path, PathBuf};

/// In-memory mesh with configurable annotations and normalization.
pub struct StubMesh {
    pub faces: Vec<[VertexIndex; 3]>,
    pub points: Vec<Point3<Real>>,
    pub face_labels: Vec<Option<usize>>,
    pub scale: Real,
    pub translation: Vector3<Real>,
    pub diameter: Real,
}

impl StubMesh {
    /// A single unlabeled triangle with identity normalization.
    pub fn unit(diameter: Real) -> Self {
        StubMesh {
            faces: vec![[0, 1, 2]],
            points: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            face_labels: vec![None],
            scale: 1.0,
            translation: Vector3::zeros(),
            diameter,
        }
    }
}

impl SurfaceMesh for StubMesh {
    fn num_faces(&self) -> usize {
        self.faces.len()
    }

    fn face_vertices(&self, face: FaceIndex) -> [VertexIndex; 3] {
        self.faces[face]
    }

    fn point(&self, vertex: VertexIndex) -> Point3<Real> {
        self.points[vertex]
    }

    fn face_label(&self, face: FaceIndex) -> Option<usize> {
        self.face_labels.get(face).copied().flatten()
    }

    fn scale(&self) -> Real {
        self.scale
    }

    fn translation(&self) -> Vector3<Real> {
        self.translation
    }

    fn object_diameter(&self) -> Real {
        self.diameter
    }
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// A feature vector filled with one value.
pub fn constant_feature(value: Real) -> FeatureVector {
    FeatureVector::new(DVector::from_element(NUM_FEATURES, value)).unwrap()
}

/// A feature vector built per component.
pub fn feature_from_fn(f: impl Fn(usize) -> Real) -> FeatureVector {
    FeatureVector::new(DVector::from_fn(NUM_FEATURES, |index, _| f(index))).unwrap()
}

pub fn identity_transform() -> FrameTransform {
    FrameTransform::default()
}

pub fn translated_transform(x: Real, y: Real, z: Real) -> FrameTransform {
    FrameTransform::new(Matrix3::identity(), Vector3::new(x, y, z))
}

/// One feature-file CSV line built per component.
pub fn feature_csv_line(f: impl Fn(usize) -> Real) -> String {
    (0..NUM_FEATURES)
        .map(|index| f(index).to_string())
        .collect::<Vec<_>>()
        .join(",")
}
