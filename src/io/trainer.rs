//! Trainer-side file formats: object lists, per-label feature and
//! transformation file sets, and relation persistence.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::errors::{Result, StructureError};
use crate::features::{FeatureVector, FrameTransform, NUM_FEATURES};
use crate::float_types::Real;
use crate::trainer::{
    CondNormalRelation, JointNormalRelation, RelationMatrix, RelationTrainer,
};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

use super::{parse_csv_line, read_lines};

/// Parse one per-label feature file: one line per training object, each line
/// [`NUM_FEATURES`] comma-separated values in object-list order. Lines
/// beginning with `@` are header metadata. A missing part is a line of NaN.
pub fn load_feature_collection(path: impl AsRef<Path>) -> Result<Vec<FeatureVector>> {
    let path = path.as_ref();
    let mut features = Vec::new();
    for (number, line) in read_lines(path)?.iter().enumerate() {
        if line.is_empty() || line.starts_with('@') {
            continue;
        }
        let values = parse_csv_line(line, path, number + 1)?;
        let feature = FeatureVector::new(DVector::from_vec(values)).ok_or_else(|| {
            StructureError::format(
                path,
                number + 1,
                format!("expected {NUM_FEATURES} feature values"),
            )
        })?;
        features.push(feature);
    }
    Ok(features)
}

/// Parse one per-label transformation file: one line per training object,
/// 12 comma-separated values — the row-major 3x3 rotation followed by the
/// translation.
pub fn load_transformation_collection(path: impl AsRef<Path>) -> Result<Vec<FrameTransform>> {
    let path = path.as_ref();
    let mut transformations = Vec::new();
    for (number, line) in read_lines(path)?.iter().enumerate() {
        if line.is_empty() || line.starts_with('@') {
            continue;
        }
        let values = parse_csv_line(line, path, number + 1)?;
        if values.len() != 12 {
            return Err(StructureError::format(
                path,
                number + 1,
                format!("expected 12 transformation values, got {}", values.len()),
            ));
        }
        transformations.push(FrameTransform::new(
            Matrix3::from_row_slice(&values[0..9]),
            Vector3::new(values[9], values[10], values[11]),
        ));
    }
    Ok(transformations)
}

impl RelationTrainer {
    /// Load the ordered object identifier list, one identifier per line.
    /// Position `i` in every per-label feature and transformation list must
    /// refer to the object at position `i` here.
    pub fn load_object_list(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let lines = read_lines(path)?;
        log::info!("loading object list from \"{}\"", path.display());

        self.object_list.clear();
        for line in lines {
            if line.is_empty() {
                break;
            }
            self.object_list.push(line);
        }
        Ok(())
    }

    /// Load the per-label feature file set `<prefix><label_index>.csv`,
    /// probing label indices 0, 1, 2, ... until the first missing file. The
    /// silent stop is how the number of labels is discovered from data.
    pub fn load_features(&mut self, prefix: &str) -> Result<()> {
        self.feature_list.clear();
        for label_index in 0.. {
            let filename = format!("{prefix}{label_index}.csv");
            let path = Path::new(&filename);
            if !path.exists() {
                break;
            }
            log::info!("loading \"{}\"", path.display());
            self.feature_list.push(load_feature_collection(path)?);
        }
        Ok(())
    }

    /// Load the per-label transformation file set `<prefix><label_index>.csv`
    /// the same way as [`load_features`](RelationTrainer::load_features).
    pub fn load_transformations(&mut self, prefix: &str) -> Result<()> {
        self.transformation_list.clear();
        for label_index in 0.. {
            let filename = format!("{prefix}{label_index}.csv");
            let path = Path::new(&filename);
            if !path.exists() {
                break;
            }
            log::info!("loading \"{}\"", path.display());
            self.transformation_list
                .push(load_transformation_collection(path)?);
        }
        Ok(())
    }

    /// Write every trained pair of a joint relation matrix to
    /// `<prefix><label1>_<label2>.csv`: one mean line, then one line per
    /// inverse-covariance row.
    pub fn save_joint_normal_relations(
        prefix: &str,
        relations: &RelationMatrix<JointNormalRelation>,
    ) -> Result<()> {
        for (label_1, row) in relations.iter().enumerate() {
            for (label_2, relation) in row.iter().enumerate() {
                let Some(relation) = relation else {
                    continue;
                };
                let mut writer = pair_writer(prefix, label_1, label_2)?;
                write_vector(&mut writer, &relation.mean)?;
                write_matrix(&mut writer, &relation.inv_cov)?;
                writer.flush()?;
            }
        }
        Ok(())
    }

    /// Rehydrate a full joint relation matrix from per-pair files. An absent
    /// file leaves the pair `None` ("untrained"); a file that fails to parse
    /// is logged and skipped, and the rest of the pairs still load.
    pub fn load_joint_normal_relations(
        num_labels: usize,
        prefix: &str,
    ) -> RelationMatrix<JointNormalRelation> {
        load_relation_matrix(num_labels, prefix, read_joint_normal_csv)
    }

    /// Write every trained pair of a conditional relation matrix to
    /// `<prefix><label1>_<label2>.csv`: one bias line, the regression matrix
    /// rows, then the conditional inverse-covariance rows.
    pub fn save_cond_normal_relations(
        prefix: &str,
        relations: &RelationMatrix<CondNormalRelation>,
    ) -> Result<()> {
        for (label_1, row) in relations.iter().enumerate() {
            for (label_2, relation) in row.iter().enumerate() {
                let Some(relation) = relation else {
                    continue;
                };
                let mut writer = pair_writer(prefix, label_1, label_2)?;
                write_vector(&mut writer, &relation.mean_b)?;
                write_matrix(&mut writer, &relation.mean_a)?;
                write_matrix(&mut writer, &relation.inv_cov)?;
                writer.flush()?;
            }
        }
        Ok(())
    }

    /// Rehydrate a full conditional relation matrix from per-pair files,
    /// with the same absence and parse-failure semantics as
    /// [`load_joint_normal_relations`](RelationTrainer::load_joint_normal_relations).
    pub fn load_cond_normal_relations(
        num_labels: usize,
        prefix: &str,
    ) -> RelationMatrix<CondNormalRelation> {
        load_relation_matrix(num_labels, prefix, read_cond_normal_csv)
    }
}

fn pair_writer(prefix: &str, label_1: usize, label_2: usize) -> Result<BufWriter<File>> {
    let filename = format!("{prefix}{label_1}_{label_2}.csv");
    Ok(BufWriter::new(File::create(filename)?))
}

fn write_vector(writer: &mut impl Write, vector: &DVector<Real>) -> Result<()> {
    let line: Vec<String> = vector.iter().map(|value| value.to_string()).collect();
    writeln!(writer, "{}", line.join(","))?;
    Ok(())
}

fn write_matrix(writer: &mut impl Write, matrix: &DMatrix<Real>) -> Result<()> {
    for row in matrix.row_iter() {
        let line: Vec<String> = row.iter().map(|value| value.to_string()).collect();
        writeln!(writer, "{}", line.join(","))?;
    }
    Ok(())
}

fn load_relation_matrix<R>(
    num_labels: usize,
    prefix: &str,
    read_pair: fn(&Path) -> Result<R>,
) -> RelationMatrix<R> {
    let mut relations: RelationMatrix<R> =
        (0..num_labels).map(|_| (0..num_labels).map(|_| None).collect()).collect();

    for label_1 in 0..num_labels {
        for label_2 in 0..num_labels {
            if label_1 == label_2 {
                continue;
            }
            let filename = format!("{prefix}{label_1}_{label_2}.csv");
            let path = Path::new(&filename);
            if !path.exists() {
                continue;
            }
            match read_pair(path) {
                Ok(relation) => relations[label_1][label_2] = Some(relation),
                Err(error) => {
                    log::warn!("failed to load relation \"{}\": {error}", path.display());
                },
            }
        }
    }
    relations
}

/// Non-empty data lines of a relation file.
fn data_lines(path: &Path) -> Result<Vec<Vec<Real>>> {
    let mut rows = Vec::new();
    for (number, line) in read_lines(path)?.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        rows.push(parse_csv_line(line, path, number + 1)?);
    }
    Ok(rows)
}

fn read_joint_normal_csv(path: &Path) -> Result<JointNormalRelation> {
    let rows = data_lines(path)?;
    let Some(mean_values) = rows.first() else {
        return Err(StructureError::format(path, 1, "empty relation file"));
    };

    let dimension = mean_values.len();
    if rows.len() != 1 + dimension {
        return Err(StructureError::format(
            path,
            rows.len(),
            format!("expected {} covariance rows, got {}", dimension, rows.len() - 1),
        ));
    }

    let mean = DVector::from_row_slice(mean_values);
    let inv_cov = read_block(&rows[1..], dimension, path)?;
    Ok(JointNormalRelation { mean, inv_cov })
}

fn read_cond_normal_csv(path: &Path) -> Result<CondNormalRelation> {
    let rows = data_lines(path)?;
    let Some(bias_values) = rows.first() else {
        return Err(StructureError::format(path, 1, "empty relation file"));
    };

    let predicted = bias_values.len();
    if rows.len() != 1 + 2 * predicted {
        return Err(StructureError::format(
            path,
            rows.len(),
            format!(
                "expected {} regression and covariance rows, got {}",
                2 * predicted,
                rows.len() - 1
            ),
        ));
    }

    let mean_b = DVector::from_row_slice(bias_values);
    let given = rows[1].len();
    let mean_a = {
        let block = &rows[1..1 + predicted];
        let mut matrix = DMatrix::zeros(predicted, given);
        for (index, row) in block.iter().enumerate() {
            if row.len() != given {
                return Err(StructureError::format(
                    path,
                    index + 2,
                    format!("expected {} values per regression row, got {}", given, row.len()),
                ));
            }
            for (col, &value) in row.iter().enumerate() {
                matrix[(index, col)] = value;
            }
        }
        matrix
    };
    let inv_cov = read_block(&rows[1 + predicted..], predicted, path)?;
    Ok(CondNormalRelation {
        mean_a,
        mean_b,
        inv_cov,
    })
}

/// Assemble a square matrix from parsed rows, checking each row's width.
fn read_block(rows: &[Vec<Real>], dimension: usize, path: &Path) -> Result<DMatrix<Real>> {
    let mut matrix = DMatrix::zeros(dimension, dimension);
    for (index, row) in rows.iter().enumerate() {
        if row.len() != dimension {
            return Err(StructureError::format(
                path,
                index + 1,
                format!("expected {} values per row, got {}", dimension, row.len()),
            ));
        }
        for (col, &value) in row.iter().enumerate() {
            matrix[(index, col)] = value;
        }
    }
    Ok(matrix)
}
