//! Gaussian relation models over pairs of part feature vectors.

use crate::float_types::{COVARIANCE_REGULARIZATION, Real};
use nalgebra::{DMatrix, DVector};

/// Invert a covariance-like matrix after diagonal loading:
/// `(mat + εI)⁻¹` with ε = [`COVARIANCE_REGULARIZATION`].
///
/// The loading keeps the matrix strictly positive definite even when the
/// empirical covariance is rank deficient, so the inversion cannot fail for
/// finite input.
pub fn regularized_inverse(mat: &DMatrix<Real>) -> DMatrix<Real> {
    let n = mat.nrows();
    let regularized = mat + DMatrix::identity(n, n) * COVARIANCE_REGULARIZATION;
    regularized
        .try_inverse()
        .expect("diagonally loaded covariance is invertible")
}

/// Column means of a sample matrix (one row per observation).
pub(crate) fn column_means(samples: &DMatrix<Real>) -> DVector<Real> {
    let rows = samples.nrows();
    let mut means = DVector::zeros(samples.ncols());
    for row in 0..rows {
        for col in 0..samples.ncols() {
            means[col] += samples[(row, col)];
        }
    }
    if rows > 0 {
        means /= rows as Real;
    }
    means
}

/// Population covariance of a sample matrix: `centeredᵀ·centered / n`.
pub(crate) fn covariance(samples: &DMatrix<Real>, means: &DVector<Real>) -> DMatrix<Real> {
    let rows = samples.nrows();
    let mut centered = samples.clone();
    for row in 0..rows {
        for col in 0..samples.ncols() {
            centered[(row, col)] -= means[col];
        }
    }
    centered.transpose() * centered / rows as Real
}

/// A joint Gaussian over the concatenated, cross-frame-transformed feature
/// vectors of an ordered label pair.
#[derive(Debug, Clone, PartialEq)]
pub struct JointNormalRelation {
    /// Mean of the concatenated vector, length `2 * NUM_FEATURES`.
    pub mean: DVector<Real>,
    /// Regularized inverse of the empirical covariance, `2k × 2k`.
    pub inv_cov: DMatrix<Real>,
}

impl JointNormalRelation {
    /// Estimate from a sample matrix with one concatenated feature row per
    /// training object.
    pub fn estimate(samples: &DMatrix<Real>) -> Self {
        let mean = column_means(samples);
        let cov = covariance(samples, &mean);
        JointNormalRelation {
            mean,
            inv_cov: regularized_inverse(&cov),
        }
    }
}

/// A linear-Gaussian model predicting one label's full feature vector from
/// another label's global-feature block:
/// `feature_2 ~ Normal(mean_a · global_1 + mean_b, inv_cov⁻¹)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CondNormalRelation {
    /// Regression matrix, `NUM_FEATURES × NUM_GLOBAL_FEATURES`.
    pub mean_a: DMatrix<Real>,
    /// Bias, length `NUM_FEATURES`.
    pub mean_b: DVector<Real>,
    /// Conditional precision: the lower-right block of the joint precision.
    pub inv_cov: DMatrix<Real>,
}

impl CondNormalRelation {
    /// Estimate the conditional Gaussian of the trailing `predicted_len`
    /// block given the leading `given_len` block of the samples.
    ///
    /// The joint precision `Λ = (Σ + εI)⁻¹` is block-partitioned; for the
    /// conditional of x₂ given x₁ the standard identity gives
    /// `mean_a = -Λ₂₂⁻¹ Λ₂₁`, `mean_b = μ₂ - mean_a · μ₁`, and conditional
    /// precision `Λ₂₂`. Equivalently `mean_a = Σ₂₁ Σ₁₁⁻¹`, the plain
    /// least-squares regression of x₂ on x₁; the sign on the precision-based
    /// form is what makes the two agree.
    pub fn estimate(samples: &DMatrix<Real>, given_len: usize, predicted_len: usize) -> Self {
        debug_assert_eq!(samples.ncols(), given_len + predicted_len);

        let mean = column_means(samples);
        let cov = covariance(samples, &mean);
        let inv_cov = regularized_inverse(&cov);

        let lambda_22 = inv_cov
            .view((given_len, given_len), (predicted_len, predicted_len))
            .into_owned();
        let lambda_21 = inv_cov
            .view((given_len, 0), (predicted_len, given_len))
            .into_owned();

        let mean_1 = mean.rows(0, given_len).into_owned();
        let mean_2 = mean.rows(given_len, predicted_len).into_owned();

        let mean_a = -(regularized_inverse(&lambda_22) * lambda_21);
        let mean_b = mean_2 - &mean_a * mean_1;

        CondNormalRelation {
            mean_a,
            mean_b,
            inv_cov: lambda_22,
        }
    }
}
