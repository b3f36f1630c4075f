//! False discovery rate control for multiple hypothesis tests
//!
//! Testing every grid cell of a field for significance produces thousands of p-values, so a
//! per-test significance level lets through many false positives. The Benjamini-Hochberg
//! procedure instead bounds the expected proportion of false rejections among all rejections.
//!
//! Refs:
//! * Benjamini and Hochberg (1995), J. R. Stat. Soc. B, 57, 289-300
//! * Wilks (2016), doi:10.1175/BAMS-D-15-00267.1

use crate::errors::{ClimstatError, ClimstatResult};
use crate::FloatValue;
use log::debug;
use ndarray::{Array, ArrayView, Dimension};
use serde::{Deserialize, Serialize};

/// Default significance level
pub const DEFAULT_ALPHA: FloatValue = 0.10;

/// Outcome of the Benjamini-Hochberg procedure
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FdrResult {
    /// `true` where the null hypothesis is rejected, in input order
    pub reject: Vec<bool>,
    /// Largest sorted p-value `p_(k)` satisfying `p_(k) <= (k/m) * alpha`
    ///
    /// `None` if no hypothesis is rejected.
    pub threshold: Option<FloatValue>,
    /// `(k/m) * alpha` for the same `k`, or 0 if no hypothesis is rejected
    ///
    /// Comparing p-values against either this or [`FdrResult::threshold`] selects the same
    /// hypotheses.
    pub critical_value: FloatValue,
    /// Number of rejected hypotheses
    pub n_rejected: usize,
}

impl FdrResult {
    pub fn any_rejected(&self) -> bool {
        self.n_rejected > 0
    }
}

/// Apply the Benjamini-Hochberg step-up procedure to `p_values`
///
/// The p-values are sorted ascending and the largest rank `k` with `p_(k) <= (k/m) * alpha`
/// is found. Every rank is checked, so a failing rank does not stop the scan. All hypotheses
/// with a p-value at or below `p_(k)` are rejected, which treats tied p-values alike.
///
/// # Errors
///
/// * [`ClimstatError::InvalidAlpha`] unless `0 < alpha < 1`
/// * [`ClimstatError::EmptyInput`] if `p_values` is empty
/// * [`ClimstatError::InvalidPValue`] if a p-value is NaN or outside `[0, 1]`
///
/// # Examples
///
/// ```rust
/// use climstat_core::fdr::fdr_correct;
///
/// let result = fdr_correct(&[0.5, 0.001, 0.8, 0.02, 0.01], 0.10).unwrap();
/// assert_eq!(result.reject, vec![false, true, false, true, true]);
/// assert_eq!(result.threshold, Some(0.02));
/// ```
pub fn fdr_correct(p_values: &[FloatValue], alpha: FloatValue) -> ClimstatResult<FdrResult> {
    // Written this way round so that a NaN alpha is rejected too
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(ClimstatError::InvalidAlpha(alpha));
    }
    validate_p_values(p_values)?;

    let m = p_values.len();
    let order = sorted_indices(p_values);

    let mut largest_rank = 0;
    for (i, &idx) in order.iter().enumerate() {
        let rank = i + 1;
        if p_values[idx] <= (rank as FloatValue / m as FloatValue) * alpha {
            largest_rank = rank;
        }
    }

    let (threshold, critical_value) = if largest_rank == 0 {
        (None, 0.0)
    } else {
        (
            Some(p_values[order[largest_rank - 1]]),
            (largest_rank as FloatValue / m as FloatValue) * alpha,
        )
    };
    let reject: Vec<bool> = match threshold {
        Some(t) => p_values.iter().map(|&p| p <= t).collect(),
        None => vec![false; m],
    };
    let n_rejected = reject.iter().filter(|r| **r).count();

    debug!(
        "FDR at alpha={}: rejected {} of {} hypotheses (critical value {})",
        alpha, n_rejected, m, critical_value
    );

    Ok(FdrResult {
        reject,
        threshold,
        critical_value,
        n_rejected,
    })
}

/// [`fdr_correct`] for an N-dimensional array of p-values, e.g. one per grid cell
///
/// All entries form a single family of tests. The returned reject mask has the same shape as
/// `p_values`; [`FdrResult::reject`] holds the same flags in logical (row-major) order.
pub fn fdr_correct_array<D: Dimension>(
    p_values: ArrayView<'_, FloatValue, D>,
    alpha: FloatValue,
) -> ClimstatResult<(Array<bool, D>, FdrResult)> {
    let flat: Vec<FloatValue> = p_values.iter().cloned().collect();
    let result = fdr_correct(&flat, alpha)?;
    let mask = Array::from_shape_vec(p_values.raw_dim(), result.reject.clone()).map_err(|_| {
        ClimstatError::ShapeMismatch {
            what: "reject mask".to_string(),
            expected: p_values.shape().to_vec(),
            found: vec![result.reject.len()],
        }
    })?;
    Ok((mask, result))
}

/// Benjamini-Hochberg adjusted p-values, in input order
///
/// `adjusted_(k) = min over j >= k of (m/j) * p_(j)`, clamped to 1. A hypothesis is rejected
/// by [`fdr_correct`] at level `alpha` exactly when its adjusted p-value is `<= alpha`.
///
/// # Errors
///
/// * [`ClimstatError::EmptyInput`] if `p_values` is empty
/// * [`ClimstatError::InvalidPValue`] if a p-value is NaN or outside `[0, 1]`
pub fn benjamini_hochberg_adjusted(p_values: &[FloatValue]) -> ClimstatResult<Vec<FloatValue>> {
    validate_p_values(p_values)?;
    let m = p_values.len();
    let order = sorted_indices(p_values);

    let mut adjusted = vec![0.0; m];
    let mut running_min = FloatValue::INFINITY;
    for i in (0..m).rev() {
        let rank = (i + 1) as FloatValue;
        let adj = (p_values[order[i]] * m as FloatValue / rank).min(1.0);
        running_min = running_min.min(adj);
        adjusted[order[i]] = running_min;
    }
    Ok(adjusted)
}

/// Indices that sort `p_values` ascending; equal values keep their input order
fn sorted_indices(p_values: &[FloatValue]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..p_values.len()).collect();
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));
    order
}

fn validate_p_values(p_values: &[FloatValue]) -> ClimstatResult<()> {
    if p_values.is_empty() {
        return Err(ClimstatError::EmptyInput);
    }
    match p_values
        .iter()
        .enumerate()
        .find(|(_, p)| !(0.0..=1.0).contains(*p))
    {
        Some((index, &value)) => Err(ClimstatError::InvalidPValue { index, value }),
        None => Ok(()),
    }
}
