//! Per-shape part model: sample points, labels, and candidate cuboids.

use crate::cuboid::Cuboid;
use crate::errors::{Result, StructureError};
use crate::float_types::{Real, confidence_tolerance};
use crate::labels::{Label, LabelIndex, LabelSet};
use crate::mesh::{FaceIndex, SurfaceMesh};
use crate::sample_point::{SamplePoint, SamplePointIndex};
use hashbrown::HashSet;
use nalgebra::Vector3;

/// Which label is currently active for display and queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryLabel {
    /// Every label is shown.
    #[default]
    All,
    /// A single label is shown.
    Label(LabelIndex),
}

/// The labeled cuboid abstraction of one shape.
///
/// Owns every sample point in a single arena and, per label, a list of
/// candidate cuboids referring into that arena by handle. A global similarity
/// transform (uniform scale plus translation) is applied cumulatively to all
/// sample point positions and tracked so it can be undone exactly.
pub struct PartStructure<'m, M: SurfaceMesh> {
    mesh: &'m M,
    labels: LabelSet,
    sample_points: Vec<SamplePoint>,
    label_cuboids: Vec<Vec<Cuboid>>,
    translation: Vector3<Real>,
    scale: Real,
    query_label: QueryLabel,
}

impl<'m, M: SurfaceMesh> PartStructure<'m, M> {
    pub fn new(mesh: &'m M) -> Self {
        PartStructure {
            mesh,
            labels: LabelSet::new(),
            sample_points: Vec::new(),
            label_cuboids: Vec::new(),
            translation: Vector3::zeros(),
            scale: 1.0,
            query_label: QueryLabel::All,
        }
    }

    #[inline]
    pub fn mesh(&self) -> &'m M {
        self.mesh
    }

    // ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    // Clearing
    // ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

    pub fn clear(&mut self) {
        self.clear_sample_points();
        self.clear_cuboids();
        self.clear_labels();
    }

    /// Release all sample points and reset the composed transform to the
    /// identity.
    pub fn clear_sample_points(&mut self) {
        self.sample_points.clear();
        self.translation = Vector3::zeros();
        self.scale = 1.0;
    }

    pub fn clear_cuboids(&mut self) {
        self.label_cuboids.clear();
    }

    /// Release the label set. Existing cuboids would be left referencing
    /// stale label indices, so they are discarded as well.
    pub fn clear_labels(&mut self) {
        self.clear_cuboids();
        self.labels.clear();
        self.query_label = QueryLabel::All;
    }

    // ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    // Global transform
    // ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

    fn translate_points(&mut self, translation: Vector3<Real>) {
        for point in &mut self.sample_points {
            point.position += translation;
        }
        self.translation += translation;
    }

    fn scale_points(&mut self, scale: Real) {
        for point in &mut self.sample_points {
            point.position.coords *= scale;
        }
        self.scale *= scale;
        self.translation *= scale;
    }

    /// Translate every sample point, composing into the tracked transform.
    pub fn translate(&mut self, translation: Vector3<Real>) {
        self.translate_points(translation);
    }

    /// Uniformly scale every sample point about the origin. The factor must
    /// be positive.
    pub fn scale(&mut self, scale: Real) -> Result<()> {
        if scale <= 0.0 {
            return Err(StructureError::Precondition("scale factor must be > 0"));
        }
        self.scale_points(scale);
        Ok(())
    }

    /// Undo the composed transform: divide by the accumulated scale, then
    /// subtract the accumulated translation. Afterwards the tracked state is
    /// exactly the identity.
    pub fn reset_transformation(&mut self) {
        if self.translation != Vector3::zeros() || self.scale != 1.0 {
            self.scale_points(1.0 / self.scale);
            self.translate_points(-self.translation);
        }
        self.translation = Vector3::zeros();
        self.scale = 1.0;
    }

    /// Re-apply the normalization transform recorded by the mesh loader:
    /// reset, then scale, then translate.
    pub fn apply_mesh_transformation(&mut self) -> Result<()> {
        self.reset_transformation();
        self.scale(self.mesh.scale())?;
        self.translate(self.mesh.translation());
        Ok(())
    }

    #[inline]
    pub const fn current_translation(&self) -> Vector3<Real> {
        self.translation
    }

    #[inline]
    pub const fn current_scale(&self) -> Real {
        self.scale
    }

    // ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    // Labels
    // ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

    #[inline]
    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn get_label(&self, index: LabelIndex) -> Option<&Label> {
        self.labels.get(index)
    }

    /// Index of the label with this name; indices equal file order.
    pub fn get_label_index(&self, name: &str) -> Option<LabelIndex> {
        self.labels.index_of(name)
    }

    pub fn exist_label(&self, name: &str) -> bool {
        self.labels.index_of(name).is_some()
    }

    pub(crate) fn labels_mut(&mut self) -> &mut LabelSet {
        &mut self.labels
    }

    #[inline]
    pub const fn query_label(&self) -> QueryLabel {
        self.query_label
    }

    pub fn set_query_label(&mut self, query_label: QueryLabel) {
        self.query_label = query_label;
    }

    pub(crate) fn show_all_labels(&mut self) {
        self.query_label = QueryLabel::All;
    }

    // ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    // Sample points
    // ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

    #[inline]
    pub fn num_sample_points(&self) -> usize {
        self.sample_points.len()
    }

    #[inline]
    pub fn sample_points(&self) -> &[SamplePoint] {
        &self.sample_points
    }

    pub fn sample_point(&self, index: SamplePointIndex) -> Option<&SamplePoint> {
        self.sample_points.get(index)
    }

    /// Append a sample point to the arena, returning its handle.
    pub fn add_sample_point(&mut self, point: SamplePoint) -> SamplePointIndex {
        self.sample_points.push(point);
        self.sample_points.len() - 1
    }

    pub(crate) fn sample_points_mut(&mut self) -> &mut Vec<SamplePoint> {
        &mut self.sample_points
    }

    /// The label of every sample point, by arg-max confidence. Points
    /// without confidences map to label 0, matching the confidence-vector
    /// convention that an absent entry counts as zero.
    pub fn get_sample_point_label_indices(&self) -> Vec<LabelIndex> {
        self.sample_points
            .iter()
            .map(|point| point.label().unwrap_or(0))
            .collect()
    }

    /// Drop every sample point whose source face is not in the visible set,
    /// compacting the arena and remapping the surviving handles inside every
    /// cuboid.
    pub fn remove_occluded_sample_points(&mut self, visible_faces: &HashSet<FaceIndex>) {
        let mut remap: Vec<Option<SamplePointIndex>> = vec![None; self.sample_points.len()];
        let mut kept = Vec::with_capacity(self.sample_points.len());
        for (old_index, point) in self.sample_points.drain(..).enumerate() {
            if visible_faces.contains(&point.face) {
                remap[old_index] = Some(kept.len());
                kept.push(point);
            }
        }
        self.sample_points = kept;

        for cuboids in &mut self.label_cuboids {
            for cuboid in cuboids.iter_mut() {
                let surviving: Vec<SamplePointIndex> = cuboid
                    .sample_point_indices()
                    .iter()
                    .filter_map(|&index| remap[index])
                    .collect();
                cuboid.clear_sample_points();
                cuboid.add_sample_points(surviving);
            }
        }
    }

    // ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    // Cuboids
    // ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

    /// Candidate cuboids of one label. Empty when the label has been dropped
    /// or none were derived yet.
    pub fn label_cuboids(&self, label: LabelIndex) -> &[Cuboid] {
        self.label_cuboids
            .get(label)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All cuboids of all labels, in label order.
    pub fn get_all_cuboids(&self) -> Vec<&Cuboid> {
        self.label_cuboids.iter().flatten().collect()
    }

    pub(crate) fn set_label_cuboids(&mut self, label_cuboids: Vec<Vec<Cuboid>>) {
        self.label_cuboids = label_cuboids;
    }

    /// Derive one bounding cuboid per label from the sample points whose
    /// confidence for that label reaches the confidence tolerance, then
    /// split each into sub-cuboids where the point distribution demands it.
    /// Labels whose point selection cannot produce a box are dropped
    /// silently.
    pub fn compute_label_cuboids(&mut self) {
        let tolerance = confidence_tolerance();
        let mut label_cuboids: Vec<Vec<Cuboid>> = vec![Vec::new(); self.num_labels()];

        for (label, cuboids) in label_cuboids.iter_mut().enumerate() {
            let mut cuboid = Cuboid::new(label);
            cuboid.add_sample_points(
                self.sample_points
                    .iter()
                    .enumerate()
                    .filter(|(_, point)| point.label_confidence(label) >= tolerance)
                    .map(|(index, _)| index),
            );
            if cuboid.compute_bbox(&self.sample_points) {
                cuboids.push(cuboid);
            }
        }

        self.label_cuboids = label_cuboids;
        self.split_label_cuboids();
        self.show_all_labels();
    }

    /// Replace every candidate cuboid by the sub-cuboids of its point-gap
    /// split, judged against the object diameter of the source mesh.
    pub fn split_label_cuboids(&mut self) {
        let object_diameter = self.mesh.object_diameter();
        for (label, cuboids) in self.label_cuboids.iter_mut().enumerate() {
            if cuboids.is_empty() {
                continue;
            }
            let mut split: Vec<Cuboid> = Vec::with_capacity(cuboids.len());
            for cuboid in cuboids.iter() {
                split.extend(cuboid.split(&self.sample_points, object_diameter));
            }
            log::debug!(
                "label {}: {} cuboid(s) after splitting",
                label,
                split.len()
            );
            *cuboids = split;
        }
    }

    /// Keep only the largest-volume candidate cuboid of every label,
    /// for consumers requiring exactly one part instance per label.
    pub fn find_the_largest_label_cuboids(&mut self) {
        for cuboids in &mut self.label_cuboids {
            if cuboids.len() <= 1 {
                continue;
            }
            let largest = cuboids
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| {
                    a.volume()
                        .partial_cmp(&b.volume())
                        .unwrap_or(core::cmp::Ordering::Equal)
                })
                .map(|(index, _)| index);
            if let Some(index) = largest {
                let kept = cuboids.swap_remove(index);
                *cuboids = vec![kept];
            }
        }
    }

    /// Keep the cuboids of one representative per symmetry equivalence
    /// class: labels are visited in index order, the first member of each
    /// class survives, every label reached through a survivor's symmetry
    /// group has its cuboids discarded.
    pub fn remove_symmetric_cuboids(&mut self) {
        let num_labels = self.num_labels();
        let mut visited = vec![false; num_labels];

        for label in 0..num_labels {
            if visited[label] {
                if let Some(cuboids) = self.label_cuboids.get_mut(label) {
                    cuboids.clear();
                }
                continue;
            }
            visited[label] = true;
            for &symmetric in self.labels.symmetries(label) {
                if symmetric < num_labels {
                    visited[symmetric] = true;
                }
            }
        }
    }

    // ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    // Ground-truth labels from mesh annotations
    // ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

    /// Overwrite every sample point's confidence with a one-hot vector from
    /// the ground-truth annotation of its source face. Fails without
    /// mutating anything when a face is unlabeled or its label is outside
    /// the loaded label set.
    pub fn apply_mesh_face_labels_to_sample_points(&mut self) -> Result<()> {
        let num_labels = self.num_labels();
        let mut point_labels = Vec::with_capacity(self.sample_points.len());
        for point in &self.sample_points {
            let label = self
                .mesh
                .face_label(point.face)
                .ok_or(StructureError::Precondition(
                    "mesh face carries no label annotation",
                ))?;
            if label >= num_labels {
                return Err(StructureError::Precondition(
                    "mesh face label outside the loaded label set",
                ));
            }
            point_labels.push(label);
        }

        for (point, label) in self.sample_points.iter_mut().zip(point_labels) {
            point.confidence = vec![0.0; num_labels];
            point.confidence[label] = 1.0;
        }
        Ok(())
    }

    /// Relabel every existing cuboid from the ground-truth labels of its
    /// points, then re-bucket all cuboids under their new labels.
    pub fn apply_mesh_face_labels_to_cuboids(&mut self) -> Result<()> {
        self.apply_mesh_face_labels_to_sample_points()?;

        let mut relabeled: Vec<Cuboid> = Vec::new();
        for cuboids in &mut self.label_cuboids {
            for mut cuboid in cuboids.drain(..) {
                cuboid.update_label_using_sample_points(&self.sample_points);
                relabeled.push(cuboid);
            }
        }

        let mut label_cuboids: Vec<Vec<Cuboid>> = vec![Vec::new(); self.num_labels()];
        for cuboid in relabeled {
            label_cuboids[cuboid.label()].push(cuboid);
        }
        self.label_cuboids = label_cuboids;
        self.show_all_labels();
        Ok(())
    }

    /// Supervised cuboid construction: ground-truth labels applied to the
    /// sample points, then the usual per-label fitting and splitting.
    pub fn get_mesh_face_label_cuboids(&mut self) -> Result<()> {
        self.apply_mesh_face_labels_to_sample_points()?;
        self.compute_label_cuboids();
        Ok(())
    }

    /// Replace the sample set with one point per face corner of the source
    /// mesh, with one-hot barycentric coordinates. The mesh normalization
    /// transform is recorded first so it can be undone later.
    pub fn make_mesh_vertices_as_sample_points(&mut self) -> Result<()> {
        self.clear();
        self.apply_mesh_transformation()?;

        self.sample_points.reserve(3 * self.mesh.num_faces());
        for face in 0..self.mesh.num_faces() {
            let vertices = self.mesh.face_vertices(face);
            for (corner, &vertex) in vertices.iter().enumerate() {
                let mut barycentric = Vector3::zeros();
                barycentric[corner] = 1.0;
                self.sample_points.push(SamplePoint::new(
                    face,
                    barycentric,
                    self.mesh.point(vertex),
                ));
            }
        }
        Ok(())
    }
}
