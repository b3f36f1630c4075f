//! N-dimensional arrays with an explicit validity mask
//!
//! Gridded model output routinely contains missing values (land points in an ocean field,
//! fill values written by the model). [`MaskedArray`] carries a boolean validity array next to
//! the values so that reductions can skip missing entries entirely instead of treating them
//! as zero.

use crate::errors::{ClimstatError, ClimstatResult};
use crate::grid::axis_index;
use crate::FloatValue;
use ndarray::{ArrayD, ArrayViewD, Axis, Zip};
use serde::{Deserialize, Serialize};

/// Values, validity and dimension names of an N-D array
///
/// Invariant: `values`, `valid` have the same shape and there is one name per dimension.
/// Invalid entries hold `NaN` in `values` when produced by this crate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaskedArray {
    values: ArrayD<FloatValue>,
    valid: ArrayD<bool>,
    dims: Vec<String>,
}

impl MaskedArray {
    /// Wrap `values`, treating every `NaN` as missing
    pub fn new(values: ArrayD<FloatValue>, dims: Vec<String>) -> ClimstatResult<Self> {
        let valid = values.mapv(|v| !v.is_nan());
        Self::from_parts(values, valid, dims)
    }

    /// Wrap `values` with an explicit validity mask
    pub fn from_parts(
        values: ArrayD<FloatValue>,
        valid: ArrayD<bool>,
        dims: Vec<String>,
    ) -> ClimstatResult<Self> {
        if values.shape() != valid.shape() {
            return Err(ClimstatError::ShapeMismatch {
                what: "validity mask".to_string(),
                expected: values.shape().to_vec(),
                found: valid.shape().to_vec(),
            });
        }
        if dims.len() != values.ndim() {
            return Err(ClimstatError::ShapeMismatch {
                what: "dimension names".to_string(),
                expected: vec![values.ndim()],
                found: vec![dims.len()],
            });
        }
        Ok(Self {
            values,
            valid,
            dims,
        })
    }

    /// Also treat entries equal to `fill_value` as missing
    ///
    /// This is how netCDF-style `_FillValue`/`missing_value` markers are recognised.
    pub fn with_fill_value(mut self, fill_value: FloatValue) -> Self {
        Zip::from(&mut self.valid)
            .and(&self.values)
            .for_each(|ok, &v| *ok = *ok && v != fill_value);
        self
    }

    pub fn values(&self) -> ArrayViewD<'_, FloatValue> {
        self.values.view()
    }

    pub fn valid(&self) -> ArrayViewD<'_, bool> {
        self.valid.view()
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn ndim(&self) -> usize {
        self.values.ndim()
    }

    /// Position of the dimension called `name`
    pub fn axis(&self, name: &str) -> ClimstatResult<Axis> {
        axis_index(&self.dims, name).map(Axis)
    }

    /// Value at `index`, or `None` if the entry is missing
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds
    pub fn get(&self, index: &[usize]) -> Option<FloatValue> {
        if self.valid[index] {
            Some(self.values[index])
        } else {
            None
        }
    }

    /// The single value of a 0-dimensional array, `None` if it is missing
    ///
    /// Returns `None` as well for arrays with one or more dimensions.
    pub fn scalar(&self) -> Option<FloatValue> {
        if self.ndim() == 0 {
            self.get(&[])
        } else {
            None
        }
    }

    /// Number of valid entries
    pub fn count_valid(&self) -> usize {
        self.valid.iter().filter(|ok| **ok).count()
    }

    /// Values with every missing entry replaced by `fill`
    pub fn filled(&self, fill: FloatValue) -> ArrayD<FloatValue> {
        let mut out = self.values.clone();
        Zip::from(&mut out)
            .and(&self.valid)
            .for_each(|v, &ok| {
                if !ok {
                    *v = fill;
                }
            });
        out
    }

    /// Copy of this array with the listed cells additionally marked missing
    ///
    /// `exclude` is broadcast against the array; `true` entries become missing.
    pub(crate) fn exclude(&self, exclude: ArrayViewD<'_, bool>) -> ClimstatResult<Self> {
        let exclude =
            exclude
                .broadcast(self.values.raw_dim())
                .ok_or_else(|| ClimstatError::ShapeMismatch {
                    what: "exclusion mask".to_string(),
                    expected: self.shape().to_vec(),
                    found: exclude.shape().to_vec(),
                })?;
        let mut out = self.clone();
        Zip::from(&mut out.values)
            .and(&mut out.valid)
            .and(&exclude)
            .for_each(|v, ok, &excluded| {
                if excluded {
                    *ok = false;
                    *v = FloatValue::NAN;
                }
            });
        Ok(out)
    }

    /// Reorder entries along `axis` so that position `i` holds the old entry `order[i]`
    pub(crate) fn select(&self, axis: Axis, order: &[usize]) -> Self {
        Self {
            values: self.values.select(axis, order),
            valid: self.valid.select(axis, order),
            dims: self.dims.clone(),
        }
    }
}
