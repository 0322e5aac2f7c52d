//! Cross-object statistical relation training.
//!
//! The trainer aggregates, per label, the feature vectors and canonical-frame
//! transforms of every training object, and estimates pairwise Gaussian
//! relation models between labels. Feature and transformation lists are
//! positionally aligned with the object list: position `i` in every per-label
//! list refers to the same training object.

use crate::errors::{Result, StructureError};
use crate::features::{FeatureVector, FrameTransform, NUM_FEATURES, NUM_GLOBAL_FEATURES};
use crate::labels::LabelIndex;
use nalgebra::DMatrix;
use std::collections::VecDeque;

mod relations;
pub use relations::{CondNormalRelation, JointNormalRelation, regularized_inverse};

/// A full pairwise relation matrix; `None` marks an untrained pair, which
/// consumers must treat as "no constraint".
pub type RelationMatrix<R> = Vec<Vec<Option<R>>>;

/// Learns pairwise statistical relationships between the geometric features
/// of corresponding part cuboids across a training corpus.
#[derive(Debug, Clone, Default)]
pub struct RelationTrainer {
    pub(crate) object_list: Vec<String>,
    pub(crate) feature_list: Vec<Vec<FeatureVector>>,
    pub(crate) transformation_list: Vec<Vec<FrameTransform>>,
}

impl RelationTrainer {
    pub fn new() -> Self {
        RelationTrainer::default()
    }

    /// Release the loaded feature and transformation lists.
    pub fn clear(&mut self) {
        self.feature_list.clear();
        self.transformation_list.clear();
    }

    /// Number of labels discovered from the loaded feature files.
    #[inline]
    pub fn num_labels(&self) -> usize {
        self.feature_list.len()
    }

    #[inline]
    pub fn object_list(&self) -> &[String] {
        &self.object_list
    }

    /// Replace the ordered object identifier list, the positional key that
    /// aligns every per-label record list.
    pub fn set_object_list(&mut self, objects: Vec<String>) {
        self.object_list = objects;
    }

    /// Append one label's aligned feature and transformation records.
    pub fn add_label_records(
        &mut self,
        features: Vec<FeatureVector>,
        transformations: Vec<FrameTransform>,
    ) {
        self.feature_list.push(features);
        self.transformation_list.push(transformations);
    }

    /// Whether the object at `object_index` is named in the ignore list.
    fn is_ignored(&self, object_index: usize, ignored_objects: Option<&[String]>) -> bool {
        let Some(ignored) = ignored_objects else {
            return false;
        };
        let Some(name) = self.object_list.get(object_index) else {
            return false;
        };
        if ignored.iter().any(|ignored_name| ignored_name == name) {
            log::debug!("object [{name}] is ignored");
            return true;
        }
        false
    }

    /// Indices of objects in which both labels have valid (non-missing)
    /// features, skipping ignored objects.
    fn valid_pair_objects(
        &self,
        label_1: LabelIndex,
        label_2: LabelIndex,
        ignored_objects: Option<&[String]>,
    ) -> Vec<usize> {
        let features_1 = &self.feature_list[label_1];
        let features_2 = &self.feature_list[label_2];
        let count = features_1.len().min(features_2.len());
        (0..count)
            .filter(|&index| {
                !features_1[index].has_nan()
                    && !features_2[index].has_nan()
                    && !self.is_ignored(index, ignored_objects)
            })
            .collect()
    }

    /// The label co-occurrence graph: `j` is in `i`'s adjacency list iff at
    /// least one object has valid features for both labels.
    pub fn get_label_cooccurrences(&self) -> Vec<Vec<LabelIndex>> {
        let num_labels = self.num_labels();
        let mut cooccurrences = vec![Vec::new(); num_labels];
        for label_1 in 0..num_labels {
            for label_2 in 0..num_labels {
                if label_1 == label_2 {
                    continue;
                }
                if !self.valid_pair_objects(label_1, label_2, None).is_empty() {
                    cooccurrences[label_1].push(label_2);
                }
            }
        }
        cooccurrences
    }

    /// Cluster the labels plausibly missing from a query that contains
    /// `given_label_indices`.
    ///
    /// Every label starts as a missing candidate. For each given label, any
    /// label outside that label's co-occurrence set is excluded, and the
    /// given label itself is excluded. The surviving candidates are then
    /// partitioned into connected components of the co-occurrence graph by
    /// breadth-first traversal; labels that always appear together are
    /// hallucinated as a block rather than independently.
    pub fn get_missing_label_index_groups(
        &self,
        given_label_indices: &[LabelIndex],
    ) -> Vec<Vec<LabelIndex>> {
        let num_labels = self.num_labels();
        let cooccurrences = self.get_label_cooccurrences();

        let mut is_missing = vec![true; num_labels];
        for &given in given_label_indices {
            debug_assert!(given < num_labels);
            if given >= num_labels {
                continue;
            }

            let mut cooccurred = vec![false; num_labels];
            cooccurred[given] = true;
            for &neighbor in &cooccurrences[given] {
                cooccurred[neighbor] = true;
            }

            for label in 0..num_labels {
                if !cooccurred[label] {
                    is_missing[label] = false;
                }
            }
            is_missing[given] = false;
        }

        let mut groups = Vec::new();
        loop {
            let Some(seed) = (0..num_labels).find(|&label| is_missing[label]) else {
                break;
            };

            let mut queue = VecDeque::new();
            queue.push_back(seed);
            is_missing[seed] = false;

            let mut group = Vec::new();
            while let Some(label) = queue.pop_front() {
                group.push(label);
                for &neighbor in &cooccurrences[label] {
                    if is_missing[neighbor] {
                        queue.push_back(neighbor);
                        is_missing[neighbor] = false;
                    }
                }
            }
            groups.push(group);
        }
        groups
    }

    fn check_aligned_transformations(&self) -> Result<()> {
        if self.transformation_list.len() != self.feature_list.len() {
            return Err(StructureError::Precondition(
                "transformation lists are not aligned with feature lists",
            ));
        }
        Ok(())
    }

    /// Estimate a [`JointNormalRelation`] for every ordered label pair with
    /// at least one valid aligned object.
    ///
    /// For each valid object, label 1's feature is expressed in label 2's
    /// frame and vice versa; the concatenated rows form the sample matrix of
    /// a joint Gaussian whose covariance is inverted after regularization.
    /// Pairs with no valid objects stay `None`.
    pub fn get_joint_normal_relations(
        &self,
        ignored_objects: Option<&[String]>,
    ) -> Result<RelationMatrix<JointNormalRelation>> {
        self.check_aligned_transformations()?;

        let num_labels = self.num_labels();
        let mut relations: RelationMatrix<JointNormalRelation> =
            vec![(0..num_labels).map(|_| None).collect(); num_labels];

        for label_1 in 0..num_labels {
            for label_2 in 0..num_labels {
                if label_1 == label_2 {
                    continue;
                }

                let transformations_1 = &self.transformation_list[label_1];
                let transformations_2 = &self.transformation_list[label_2];
                let objects: Vec<usize> = self
                    .valid_pair_objects(label_1, label_2, ignored_objects)
                    .into_iter()
                    .filter(|&index| {
                        index < transformations_1.len() && index < transformations_2.len()
                    })
                    .collect();
                if objects.is_empty() {
                    continue;
                }

                let mut data = Vec::with_capacity(objects.len() * 2 * NUM_FEATURES);
                for &index in &objects {
                    let in_frame_2 = transformations_2[index]
                        .transformed_features(&self.feature_list[label_1][index]);
                    let in_frame_1 = transformations_1[index]
                        .transformed_features(&self.feature_list[label_2][index]);
                    data.extend(in_frame_2.iter().copied());
                    data.extend(in_frame_1.iter().copied());
                }
                let samples =
                    DMatrix::from_row_slice(objects.len(), 2 * NUM_FEATURES, &data);
                relations[label_1][label_2] = Some(JointNormalRelation::estimate(&samples));
            }
        }
        Ok(relations)
    }

    /// Estimate a [`CondNormalRelation`] for every ordered label pair:
    /// label 2's full feature vector, expressed in label 1's frame, predicted
    /// from label 1's untransformed global-feature block.
    pub fn get_cond_normal_relations(
        &self,
        ignored_objects: Option<&[String]>,
    ) -> Result<RelationMatrix<CondNormalRelation>> {
        self.check_aligned_transformations()?;

        let num_labels = self.num_labels();
        let mut relations: RelationMatrix<CondNormalRelation> =
            vec![(0..num_labels).map(|_| None).collect(); num_labels];

        for label_1 in 0..num_labels {
            for label_2 in 0..num_labels {
                if label_1 == label_2 {
                    continue;
                }

                let transformations_1 = &self.transformation_list[label_1];
                let objects: Vec<usize> = self
                    .valid_pair_objects(label_1, label_2, ignored_objects)
                    .into_iter()
                    .filter(|&index| index < transformations_1.len())
                    .collect();
                if objects.is_empty() {
                    continue;
                }

                let width = NUM_GLOBAL_FEATURES + NUM_FEATURES;
                let mut data = Vec::with_capacity(objects.len() * width);
                for &index in &objects {
                    let global_1 = self.feature_list[label_1][index].global_tail();
                    let in_frame_1 = transformations_1[index]
                        .transformed_features(&self.feature_list[label_2][index]);
                    data.extend(global_1.iter().copied());
                    data.extend(in_frame_1.iter().copied());
                }
                let samples = DMatrix::from_row_slice(objects.len(), width, &data);
                relations[label_1][label_2] = Some(CondNormalRelation::estimate(
                    &samples,
                    NUM_GLOBAL_FEATURES,
                    NUM_FEATURES,
                ));
            }
        }
        Ok(relations)
    }
}
