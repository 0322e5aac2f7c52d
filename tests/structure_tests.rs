//! Part structure behavior through the real file formats.

mod support;

use approx::assert_relative_eq;
use hashbrown::HashSet;
use nalgebra::{Point3, Vector3};
use partbox::PartStructure;
use partbox::errors::StructureError;
use partbox::float_types::Real;
use partbox::sample_point::SamplePoint;
use partbox::structure::QueryLabel;
use support::StubMesh;

fn point_at(x: Real, y: Real, z: Real) -> SamplePoint {
    SamplePoint::new(0, Vector3::zeros(), Point3::new(x, y, z))
}

fn labeled_point(x: Real, y: Real, z: Real, confidence: Vec<Real>) -> SamplePoint {
    let mut point = point_at(x, y, z);
    point.confidence = confidence;
    point
}

#[test]
fn transform_composes_and_resets_exactly() {
    let mesh = StubMesh::unit(10.0);
    let mut structure = PartStructure::new(&mesh);
    for [x, y, z] in [[0.0, 0.0, 0.0], [1.0, 2.0, 3.0], [-2.0, 0.5, 4.0]] {
        structure.add_sample_point(point_at(x, y, z));
    }
    let originals: Vec<_> = structure
        .sample_points()
        .iter()
        .map(|point| point.position)
        .collect();

    structure.scale(2.5).unwrap();
    structure.translate(Vector3::new(1.0, -2.0, 3.0));
    structure.scale(0.5).unwrap();
    let transformed: Vec<_> = structure
        .sample_points()
        .iter()
        .map(|point| point.position)
        .collect();
    let scale = structure.current_scale();
    let translation = structure.current_translation();
    assert_relative_eq!(scale, 1.25);
    assert_relative_eq!(translation, Vector3::new(0.5, -1.0, 1.5));

    structure.reset_transformation();
    assert_eq!(structure.current_scale(), 1.0);
    assert_eq!(structure.current_translation(), Vector3::zeros());
    for (point, original) in structure.sample_points().iter().zip(&originals) {
        assert_relative_eq!(point.position, *original, epsilon = 1e-12);
    }

    // Re-applying the recorded composition reproduces the transformed
    // positions.
    structure.scale(scale).unwrap();
    structure.translate(translation);
    for (point, expected) in structure.sample_points().iter().zip(&transformed) {
        assert_relative_eq!(point.position, *expected, epsilon = 1e-12);
    }
}

#[test]
fn label_index_equals_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = support::write_file(
        dir.path(),
        "labels.txt",
        "seat pnts 1\nback pnts 1\nleg pnts 1\n",
    );

    let mesh = StubMesh::unit(1.0);
    let mut structure = PartStructure::new(&mesh);
    structure.load_labels(&path).unwrap();

    assert_eq!(structure.num_labels(), 3);
    for (index, name) in ["seat", "back", "leg"].iter().enumerate() {
        assert_eq!(structure.get_label_index(name), Some(index));
        assert_eq!(structure.get_label(index).unwrap().name, *name);
    }
    assert!(structure.exist_label("leg"));
    assert!(!structure.exist_label("arm"));
    assert_eq!(structure.query_label(), QueryLabel::All);
}

#[test]
fn malformed_labels_file_aborts_cleared() {
    let dir = tempfile::tempdir().unwrap();
    let path = support::write_file(dir.path(), "labels.txt", "seat pnts 1\nleg pnts 2\n");

    let mesh = StubMesh::unit(1.0);
    let mut structure = PartStructure::new(&mesh);
    let error = structure.load_labels(&path).unwrap_err();
    assert!(matches!(error, StructureError::Format { line: 2, .. }));
    assert_eq!(structure.num_labels(), 0);
}

#[test]
fn symmetry_groups_close_pairwise() {
    let dir = tempfile::tempdir().unwrap();
    let labels = support::write_file(
        dir.path(),
        "labels.txt",
        "left_leg pnts 1\nright_leg pnts 1\nseat pnts 1\n",
    );
    let symmetries = support::write_file(dir.path(), "symmetries.txt", "left_leg right_leg\n");

    let mesh = StubMesh::unit(1.0);
    let mut structure = PartStructure::new(&mesh);

    // Symmetries before labels is a precondition violation.
    assert!(matches!(
        structure.load_label_symmetries(&symmetries),
        Err(StructureError::Precondition(_))
    ));

    structure.load_labels(&labels).unwrap();
    structure.load_label_symmetries(&symmetries).unwrap();
    assert_eq!(structure.get_label(0).unwrap().symmetries, vec![1]);
    assert_eq!(structure.get_label(1).unwrap().symmetries, vec![0]);
    assert!(structure.get_label(2).unwrap().symmetries.is_empty());

    let unknown = support::write_file(dir.path(), "bad.txt", "left_leg wing\n");
    assert!(matches!(
        structure.load_label_symmetries(&unknown),
        Err(StructureError::Format { .. })
    ));
}

#[test]
fn symmetric_label_keeps_lowest_indexed_cuboids() {
    let dir = tempfile::tempdir().unwrap();
    let labels = support::write_file(
        dir.path(),
        "labels.txt",
        "left_leg pnts 1\nright_leg pnts 1\n",
    );
    let symmetries = support::write_file(dir.path(), "symmetries.txt", "left_leg right_leg\n");

    let mesh = StubMesh::unit(100.0);
    let mut structure = PartStructure::new(&mesh);
    structure.load_labels(&labels).unwrap();
    structure.load_label_symmetries(&symmetries).unwrap();

    structure.add_sample_point(labeled_point(0.0, 0.0, 0.0, vec![1.0, 0.0]));
    structure.add_sample_point(labeled_point(1.0, 0.0, 0.0, vec![1.0, 0.0]));
    structure.add_sample_point(labeled_point(0.0, 5.0, 0.0, vec![0.0, 1.0]));
    structure.add_sample_point(labeled_point(1.0, 5.0, 0.0, vec![0.0, 1.0]));
    structure.compute_label_cuboids();
    assert_eq!(structure.label_cuboids(0).len(), 1);
    assert_eq!(structure.label_cuboids(1).len(), 1);

    structure.remove_symmetric_cuboids();
    assert_eq!(structure.label_cuboids(0).len(), 1);
    assert!(structure.label_cuboids(1).is_empty());
}

#[test]
fn largest_cuboid_survives_selection() {
    let dir = tempfile::tempdir().unwrap();
    let labels = support::write_file(dir.path(), "labels.txt", "drawer pnts 1\n");

    // Split threshold is a tenth of the diameter: 1.0. The two clusters sit
    // 4.5 apart along x, the points within each below the threshold.
    let mesh = StubMesh::unit(10.0);
    let mut structure = PartStructure::new(&mesh);
    structure.load_labels(&labels).unwrap();

    structure.add_sample_point(labeled_point(0.0, 0.0, 0.0, vec![1.0]));
    structure.add_sample_point(labeled_point(0.5, 0.5, 0.5, vec![1.0]));
    structure.add_sample_point(labeled_point(5.0, 0.0, 0.0, vec![1.0]));
    structure.add_sample_point(labeled_point(5.9, 0.9, 0.9, vec![1.0]));

    structure.compute_label_cuboids();
    let candidates = structure.label_cuboids(0);
    assert_eq!(candidates.len(), 2);
    assert!(candidates.iter().all(|cuboid| cuboid.num_sample_points() == 2));
    let max_volume = candidates
        .iter()
        .map(|cuboid| cuboid.volume())
        .fold(Real::MIN, Real::max);

    structure.find_the_largest_label_cuboids();
    let survivors = structure.label_cuboids(0);
    assert_eq!(survivors.len(), 1);
    assert_relative_eq!(survivors[0].volume(), max_volume);
    assert_relative_eq!(max_volume, 0.9 * 0.9 * 0.9, epsilon = 1e-12);
}

#[test]
fn end_to_end_two_labels_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let labels = support::write_file(dir.path(), "labels.txt", "seat pnts 1\nleg pnts 1\n");
    let points = support::write_file(
        dir.path(),
        "points.pts",
        "0 0.2 0.3 0.5 0.0 0.0 0.0\n\
         0 0.2 0.3 0.5 1.0 0.0 0.0\n\
         0 0.2 0.3 0.5 0.0 5.0 0.0\n\
         0 0.2 0.3 0.5 1.0 5.0 0.0\n",
    );
    let confidences = support::write_file(
        dir.path(),
        "points.arff",
        "@RELATION confidences\n\
         @ATTRIBUTE seat\n\
         @ATTRIBUTE leg\n\
         1,0\n1,0\n0,1\n0,1\n",
    );

    let mesh = StubMesh::unit(100.0);
    let mut structure = PartStructure::new(&mesh);
    structure.load_labels(&labels).unwrap();
    structure.load_sample_points(&points).unwrap();
    structure.load_sample_point_labels(&confidences).unwrap();
    assert_eq!(structure.num_sample_points(), 4);
    assert_eq!(structure.get_sample_point_label_indices(), vec![0, 0, 1, 1]);

    structure.compute_label_cuboids();
    assert_eq!(structure.get_all_cuboids().len(), 2);
    for label in 0..2 {
        let cuboids = structure.label_cuboids(label);
        assert_eq!(cuboids.len(), 1);
        assert_eq!(cuboids[0].label(), label);
        assert_eq!(cuboids[0].num_sample_points(), 2);
        for &index in cuboids[0].sample_point_indices() {
            let point = structure.sample_point(index).unwrap();
            assert_eq!(point.label(), Some(label));
        }
    }
}

#[test]
fn sample_point_loading_applies_mesh_normalization() {
    let dir = tempfile::tempdir().unwrap();
    let points = support::write_file(dir.path(), "points.pts", "0 0.0 0.0 1.0 1.0 1.0 1.0\n3\n");

    let mut mesh = StubMesh::unit(1.0);
    mesh.scale = 2.0;
    mesh.translation = Vector3::new(1.0, 0.0, 0.0);
    let mut structure = PartStructure::new(&mesh);
    structure.load_sample_points(&points).unwrap();

    assert_eq!(structure.num_sample_points(), 2);
    assert_relative_eq!(
        structure.sample_point(0).unwrap().position,
        Point3::new(3.0, 2.0, 2.0)
    );
    // A line with only a face id is accepted as a point without geometry.
    assert_eq!(structure.sample_point(1).unwrap().face, 3);
    assert_eq!(structure.current_scale(), 2.0);

    structure.reset_transformation();
    assert_relative_eq!(
        structure.sample_point(0).unwrap().position,
        Point3::new(1.0, 1.0, 1.0),
        epsilon = 1e-12
    );
}

#[test]
fn sample_point_labels_require_matching_counts() {
    let dir = tempfile::tempdir().unwrap();
    let labels = support::write_file(dir.path(), "labels.txt", "seat pnts 1\nleg pnts 1\n");
    let points = support::write_file(dir.path(), "points.pts", "0\n0\n0\n");

    let mesh = StubMesh::unit(1.0);
    let mut structure = PartStructure::new(&mesh);

    let confidences = support::write_file(dir.path(), "points.arff", "1,0\n0,1\n1,0\n");
    assert!(matches!(
        structure.load_sample_point_labels(&confidences),
        Err(StructureError::Precondition(_))
    ));

    structure.load_labels(&labels).unwrap();
    structure.load_sample_points(&points).unwrap();

    let wrong_width = support::write_file(dir.path(), "wide.arff", "1,0,0\n0,1,0\n1,0,0\n");
    assert!(matches!(
        structure.load_sample_point_labels(&wrong_width),
        Err(StructureError::Format { .. })
    ));

    let too_few = support::write_file(dir.path(), "short.arff", "1,0\n0,1\n");
    assert!(matches!(
        structure.load_sample_point_labels(&too_few),
        Err(StructureError::Format { .. })
    ));

    structure.load_sample_point_labels(&confidences).unwrap();
    assert_eq!(structure.get_sample_point_label_indices(), vec![0, 1, 0]);
}

#[test]
fn cuboid_file_defines_one_label_per_line() {
    let dir = tempfile::tempdir().unwrap();
    let unit = "0,0,0,1,0,0,0,1,0,1,1,0,0,0,1,1,0,1,0,1,1,1,1,1";
    let shifted = "4,0,0,6,0,0,4,1,0,6,1,0,4,0,1,6,0,1,4,1,1,6,1,1";
    let path = support::write_file(dir.path(), "cuboids.csv", &format!("{unit}\n{shifted}\n"));

    let mesh = StubMesh::unit(1.0);
    let mut structure = PartStructure::new(&mesh);
    structure.load_cuboids(&path).unwrap();

    assert_eq!(structure.num_labels(), 2);
    assert_eq!(structure.get_label_index("0"), Some(0));
    assert_eq!(structure.get_label_index("1"), Some(1));

    let first = &structure.label_cuboids(0)[0];
    assert_relative_eq!(first.corner(0), Point3::new(0.0, 0.0, 0.0));
    assert_relative_eq!(first.corner(7), Point3::new(1.0, 1.0, 1.0));
    assert_relative_eq!(first.center(), Point3::new(0.5, 0.5, 0.5));

    let second = &structure.label_cuboids(1)[0];
    assert_relative_eq!(second.center(), Point3::new(5.0, 0.5, 0.5));
    assert_relative_eq!(second.volume(), 2.0);

    let truncated = support::write_file(dir.path(), "bad.csv", "0,0,0,1,0,0\n");
    let error = structure.load_cuboids(&truncated).unwrap_err();
    assert!(matches!(error, StructureError::Format { .. }));
    assert_eq!(structure.num_labels(), 0);
}

#[test]
fn occluded_points_are_dropped_and_handles_remapped() {
    let dir = tempfile::tempdir().unwrap();
    let labels = support::write_file(dir.path(), "labels.txt", "part pnts 1\n");

    let mesh = StubMesh::unit(100.0);
    let mut structure = PartStructure::new(&mesh);
    structure.load_labels(&labels).unwrap();

    let mut front = labeled_point(0.0, 0.0, 0.0, vec![1.0]);
    front.face = 0;
    let mut hidden = labeled_point(1.0, 0.0, 0.0, vec![1.0]);
    hidden.face = 1;
    let mut side = labeled_point(2.0, 0.0, 0.0, vec![1.0]);
    side.face = 2;
    structure.add_sample_point(front);
    structure.add_sample_point(hidden);
    structure.add_sample_point(side);
    structure.compute_label_cuboids();
    assert_eq!(structure.label_cuboids(0)[0].num_sample_points(), 3);

    let visible: HashSet<usize> = [0, 2].into_iter().collect();
    structure.remove_occluded_sample_points(&visible);

    assert_eq!(structure.num_sample_points(), 2);
    let cuboid = &structure.label_cuboids(0)[0];
    assert_eq!(cuboid.num_sample_points(), 2);
    let faces: Vec<usize> = cuboid
        .sample_point_indices()
        .iter()
        .map(|&index| structure.sample_point(index).unwrap().face)
        .collect();
    assert_eq!(faces, vec![0, 2]);
}

#[test]
fn mesh_face_labels_build_supervised_cuboids() {
    let dir = tempfile::tempdir().unwrap();
    let labels = support::write_file(dir.path(), "labels.txt", "seat pnts 1\nleg pnts 1\n");

    let mut mesh = StubMesh::unit(100.0);
    mesh.faces = vec![[0, 1, 2], [0, 1, 2]];
    mesh.face_labels = vec![Some(0), Some(1)];
    let mut structure = PartStructure::new(&mesh);
    structure.load_labels(&labels).unwrap();

    let mut seat = point_at(0.0, 0.0, 0.0);
    seat.face = 0;
    let mut leg = point_at(0.0, 5.0, 0.0);
    leg.face = 1;
    structure.add_sample_point(seat);
    structure.add_sample_point(leg);

    structure.get_mesh_face_label_cuboids().unwrap();
    assert_eq!(structure.label_cuboids(0).len(), 1);
    assert_eq!(structure.label_cuboids(1).len(), 1);
    assert_eq!(structure.sample_point(0).unwrap().confidence, vec![1.0, 0.0]);
    assert_eq!(structure.sample_point(1).unwrap().confidence, vec![0.0, 1.0]);

    // An unlabeled face makes the ground-truth derivation fail untouched.
    let mut unlabeled = StubMesh::unit(100.0);
    unlabeled.face_labels = vec![None];
    let mut bare = PartStructure::new(&unlabeled);
    bare.load_labels(&labels).unwrap();
    bare.add_sample_point(point_at(0.0, 0.0, 0.0));
    assert!(matches!(
        bare.apply_mesh_face_labels_to_sample_points(),
        Err(StructureError::Precondition(_))
    ));
    assert!(bare.sample_point(0).unwrap().confidence.is_empty());
}

#[test]
fn ground_truth_relabeling_rebuckets_cuboids() {
    let dir = tempfile::tempdir().unwrap();
    let labels = support::write_file(dir.path(), "labels.txt", "seat pnts 1\nleg pnts 1\n");

    // The confidence annotation claims "seat", the mesh ground truth "leg".
    let mut mesh = StubMesh::unit(100.0);
    mesh.faces = vec![[0, 1, 2], [0, 1, 2]];
    mesh.face_labels = vec![Some(0), Some(1)];
    let mut structure = PartStructure::new(&mesh);
    structure.load_labels(&labels).unwrap();

    for x in [0.0, 0.5] {
        let mut point = labeled_point(x, 0.0, 0.0, vec![1.0, 0.0]);
        point.face = 1;
        structure.add_sample_point(point);
    }
    structure.compute_label_cuboids();
    assert_eq!(structure.label_cuboids(0).len(), 1);
    assert!(structure.label_cuboids(1).is_empty());

    structure.apply_mesh_face_labels_to_cuboids().unwrap();
    assert!(structure.label_cuboids(0).is_empty());
    let relabeled = structure.label_cuboids(1);
    assert_eq!(relabeled.len(), 1);
    assert_eq!(relabeled[0].label(), 1);
    assert_eq!(relabeled[0].num_sample_points(), 2);
}
