//! Text formats of the per-shape part structure.

use std::path::Path;

use crate::cuboid::{Cuboid, NUM_CORNERS};
use crate::errors::{Result, StructureError};
use crate::float_types::Real;
use crate::labels::Label;
use crate::mesh::SurfaceMesh;
use crate::sample_point::SamplePoint;
use crate::structure::PartStructure;
use nalgebra::{Point3, Vector3};

use super::{parse_csv_line, parse_index, parse_real, read_lines};

impl<M: SurfaceMesh> PartStructure<'_, M> {
    /// Load the label list. One label per line, `<name> pnts 1`; the label
    /// index is the line's 0-based order. An empty line ends the list.
    ///
    /// Replacing the label set invalidates every existing cuboid, so cuboids
    /// are discarded along with the old labels.
    pub fn load_labels(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let lines = read_lines(path)?;
        log::info!("loading labels from \"{}\"", path.display());

        self.clear_cuboids();
        self.clear_labels();

        let mut labels = Vec::new();
        for (number, line) in lines.iter().enumerate() {
            if line.is_empty() {
                break;
            }
            let tokens: Vec<&str> = line.split(' ').collect();
            if tokens.len() != 3 || tokens[1] != "pnts" || tokens[2] != "1" {
                return Err(StructureError::format(
                    path,
                    number + 1,
                    "expected \"<name> pnts 1\"",
                ));
            }
            labels.push(Label::new(tokens[0]));
        }

        for label in labels {
            self.labels_mut().push(label);
        }
        self.show_all_labels();
        Ok(())
    }

    /// Load the symmetry relation. One symmetry group per line as
    /// space-separated label names; every unordered pair within a line
    /// becomes mutually symmetric. Requires labels to be loaded.
    pub fn load_label_symmetries(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if self.num_labels() == 0 {
            return Err(StructureError::Precondition(
                "load labels before their symmetries",
            ));
        }

        let path = path.as_ref();
        let lines = read_lines(path)?;
        log::info!("loading label symmetries from \"{}\"", path.display());

        self.labels_mut().clear_symmetries();

        let mut groups = Vec::new();
        for (number, line) in lines.iter().enumerate() {
            if line.is_empty() {
                break;
            }
            let mut group = Vec::new();
            for name in line.split(' ').filter(|token| !token.is_empty()) {
                let index = self.get_label_index(name).ok_or_else(|| {
                    StructureError::format(path, number + 1, format!("unknown label \"{name}\""))
                })?;
                group.push(index);
            }
            groups.push(group);
        }

        for group in groups {
            self.labels_mut().add_symmetry_group(&group);
        }
        Ok(())
    }

    /// Load the sample points. Each line is either a bare `<face_id>` (a
    /// point without geometry yet) or
    /// `<face_id> <bary_x> <bary_y> <bary_z> <pos_x> <pos_y> <pos_z>`.
    /// The mesh normalization transform is applied to the loaded positions.
    pub fn load_sample_points(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let lines = read_lines(path)?;
        log::info!("loading sample points from \"{}\"", path.display());

        self.clear_sample_points();

        let mut points = Vec::with_capacity(lines.len());
        for (number, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let tokens: Vec<&str> = line.split(' ').filter(|token| !token.is_empty()).collect();
            let Some(&first) = tokens.first() else {
                continue;
            };
            let face = parse_index(first, path, number + 1)?;

            match tokens.len() {
                1 => points.push(SamplePoint::new(face, Vector3::zeros(), Point3::origin())),
                7 => {
                    let mut values: [Real; 6] = [0.0; 6];
                    for (value, token) in values.iter_mut().zip(&tokens[1..]) {
                        *value = parse_real(token, path, number + 1)?;
                    }
                    points.push(SamplePoint::new(
                        face,
                        Vector3::new(values[0], values[1], values[2]),
                        Point3::new(values[3], values[4], values[5]),
                    ));
                },
                _ => {
                    return Err(StructureError::format(
                        path,
                        number + 1,
                        "expected \"<face_id>\" or \"<face_id> <bary xyz> <pos xyz>\"",
                    ));
                },
            }
        }

        *self.sample_points_mut() = points;
        self.apply_mesh_transformation()?;
        Ok(())
    }

    /// Load per-point label confidences from an attribute file. Lines
    /// beginning with `@` are header metadata and skipped; every other line
    /// carries `num_labels` comma-separated confidence values, one line per
    /// sample point in file order. Requires labels and sample points.
    pub fn load_sample_point_labels(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if self.num_labels() == 0 {
            return Err(StructureError::Precondition(
                "load labels before sample point labels",
            ));
        }
        if self.num_sample_points() == 0 {
            return Err(StructureError::Precondition(
                "load sample points before their labels",
            ));
        }

        let path = path.as_ref();
        let lines = read_lines(path)?;
        log::info!("loading sample point labels from \"{}\"", path.display());

        let num_labels = self.num_labels();
        let num_points = self.num_sample_points();
        let mut confidences: Vec<Vec<Real>> = Vec::with_capacity(num_points);
        for (number, line) in lines.iter().enumerate() {
            if line.is_empty() || line.starts_with('@') {
                continue;
            }
            if confidences.len() == num_points {
                break;
            }
            let values = parse_csv_line(line, path, number + 1)?;
            if values.len() != num_labels {
                return Err(StructureError::format(
                    path,
                    number + 1,
                    format!(
                        "expected {num_labels} confidence values, got {}",
                        values.len()
                    ),
                ));
            }
            confidences.push(values);
        }

        if confidences.len() != num_points {
            return Err(StructureError::format(
                path,
                lines.len(),
                format!(
                    "{} confidence lines for {num_points} sample points",
                    confidences.len()
                ),
            ));
        }

        for (point, confidence) in self.sample_points_mut().iter_mut().zip(confidences) {
            point.confidence = confidence;
        }
        self.show_all_labels();
        Ok(())
    }

    /// Load an explicit cuboid listing. One cuboid per line as 8 corners of
    /// 3 comma-separated coordinates each; the label index is the line's
    /// 0-based order. Cuboid files carry no label names, so each synthesized
    /// label is named by its index.
    ///
    /// Everything previously loaded is discarded first.
    pub fn load_cuboids(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let lines = read_lines(path)?;
        log::info!("loading cuboids from \"{}\"", path.display());

        self.clear();

        let mut label_cuboids = Vec::new();
        for (number, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let values = parse_csv_line(line, path, number + 1)?;
            if values.len() != 3 * NUM_CORNERS {
                return Err(StructureError::format(
                    path,
                    number + 1,
                    format!("expected {} coordinates, got {}", 3 * NUM_CORNERS, values.len()),
                ));
            }

            let mut corners = [Point3::origin(); NUM_CORNERS];
            for (corner, coords) in corners.iter_mut().zip(values.chunks_exact(3)) {
                *corner = Point3::new(coords[0], coords[1], coords[2]);
            }
            let label = label_cuboids.len();
            label_cuboids.push(vec![Cuboid::from_corners(label, corners)]);
        }

        for index in 0..label_cuboids.len() {
            self.labels_mut().push(Label::new(index.to_string()));
        }
        self.set_label_cuboids(label_cuboids);
        self.show_all_labels();
        Ok(())
    }
}
