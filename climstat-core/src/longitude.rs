//! Longitude normalisation
//!
//! Model output comes with longitudes in `[0, 360)` or `[-180, 180)` depending on the model.
//! [`normalize_longitude`] maps a grid into `[lon_min, lon_min + 360)`, sorts it ascending and
//! records the permutation so that data defined on the grid can be reordered along its
//! longitude axis in the same way.
//!
//! ```rust
//! use climstat_core::grid::LonLatGrid;
//! use climstat_core::longitude::normalize_longitude;
//!
//! let grid = LonLatGrid::from_vecs(vec![0.0, 90.0, 180.0, 270.0], vec![-45.0, 45.0]);
//! let shift = normalize_longitude(&grid, -180.0).unwrap();
//! assert_eq!(shift.grid().lon().to_vec(), vec![-180.0, -90.0, 0.0, 90.0]);
//! assert_eq!(shift.permutation(), &[2, 3, 0, 1]);
//! ```

use crate::errors::{ClimstatError, ClimstatResult};
use crate::grid::LonLatGrid;
use crate::FloatValue;
use log::debug;
use ndarray::{Array, Array1, ArrayBase, Axis, Data, RemoveAxis};

/// Default lower edge of the longitude range
pub const DEFAULT_LON_MIN: FloatValue = -180.0;

/// Largest longitude magnitude (degrees) accepted for wrapping
///
/// Beyond this the floating point spacing of the value grows past 1e-10 degrees and the
/// wrapped result stops meaning anything.
pub const MAX_ABS_LONGITUDE: FloatValue = 1e6;

/// Check that `value` is finite and small enough to wrap meaningfully
///
/// # Errors
///
/// Returns [`ClimstatError::InvalidBounds`] otherwise; `what` names the value in the message.
pub fn check_longitude(value: FloatValue, what: &str) -> ClimstatResult<()> {
    if !value.is_finite() {
        return Err(ClimstatError::InvalidBounds(format!(
            "{} must be finite, got {}",
            what, value
        )));
    }
    if value.abs() > MAX_ABS_LONGITUDE {
        return Err(ClimstatError::InvalidBounds(format!(
            "{} {} exceeds the largest supported magnitude {}",
            what, value, MAX_ABS_LONGITUDE
        )));
    }
    Ok(())
}

/// Map `lon` into `[lon_min, lon_min + 360)` by adding or subtracting whole turns
///
/// Values already inside the range are returned unchanged (bit for bit), which makes the
/// mapping idempotent. Inputs are expected to pass [`check_longitude`]; larger magnitudes
/// lose the digits that the wrap would keep.
pub fn wrap_longitude(lon: FloatValue, lon_min: FloatValue) -> FloatValue {
    let lon_max = lon_min + 360.0;
    if lon >= lon_min && lon < lon_max {
        return lon;
    }
    let turns = ((lon - lon_min) / 360.0).floor();
    let mut wrapped = lon - turns * 360.0;
    // Rounding in the subtraction can land a hair outside the half-open range
    if wrapped < lon_min {
        wrapped += 360.0;
    }
    if wrapped >= lon_max {
        wrapped -= 360.0;
    }
    wrapped
}

/// Result of shifting a grid's longitudes
///
/// `grid().lon()[i] == wrap_longitude(original_lon[permutation()[i]], lon_min)`
#[derive(Clone, Debug, PartialEq)]
pub struct LongitudeShift {
    grid: LonLatGrid,
    permutation: Vec<usize>,
}

impl LongitudeShift {
    /// The grid with normalised, ascending longitudes
    pub fn grid(&self) -> &LonLatGrid {
        &self.grid
    }

    pub fn into_grid(self) -> LonLatGrid {
        self.grid
    }

    /// New position `i` holds old longitude index `permutation[i]`
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// True if the longitude order did not change
    pub fn is_identity(&self) -> bool {
        self.permutation.iter().enumerate().all(|(i, &p)| i == p)
    }

    /// Reorder `array` along its longitude `axis` to match the shifted grid
    ///
    /// # Errors
    ///
    /// Returns [`ClimstatError::ShapeMismatch`] if `axis` does not exist or its length differs
    /// from the number of longitudes.
    pub fn apply<A, S, D>(&self, array: &ArrayBase<S, D>, axis: Axis) -> ClimstatResult<Array<A, D>>
    where
        A: Clone,
        S: Data<Elem = A>,
        D: RemoveAxis,
    {
        if axis.index() >= array.ndim() || array.len_of(axis) != self.permutation.len() {
            return Err(ClimstatError::ShapeMismatch {
                what: format!("longitude axis {}", axis.index()),
                expected: vec![self.permutation.len()],
                found: array.shape().to_vec(),
            });
        }
        Ok(array.select(axis, &self.permutation))
    }
}

/// Shift the grid's longitudes into `[lon_min, lon_min + 360)` and sort them ascending
///
/// # Errors
///
/// Returns [`ClimstatError::InvalidBounds`] if:
/// * the grid has fewer than 2 longitudes
/// * `lon_min` or any longitude is not finite, or larger in magnitude than
///   [`MAX_ABS_LONGITUDE`]
/// * two longitudes coincide after normalisation, leaving the order ambiguous
pub fn normalize_longitude(grid: &LonLatGrid, lon_min: FloatValue) -> ClimstatResult<LongitudeShift> {
    check_longitude(lon_min, "lon_min")?;
    let lon = grid.lon();
    if lon.len() < 2 {
        return Err(ClimstatError::InvalidBounds(format!(
            "at least 2 longitudes are needed, got {}",
            lon.len()
        )));
    }
    for &v in lon.iter() {
        check_longitude(v, "longitude")?;
    }

    let wrapped: Vec<FloatValue> = lon.iter().map(|&v| wrap_longitude(v, lon_min)).collect();
    let mut permutation: Vec<usize> = (0..wrapped.len()).collect();
    permutation.sort_by(|&a, &b| wrapped[a].total_cmp(&wrapped[b]));
    let sorted = Array1::from_iter(permutation.iter().map(|&i| wrapped[i]));

    if let Some(w) = sorted.windows(2).into_iter().find(|w| w[0] == w[1]) {
        return Err(ClimstatError::InvalidBounds(format!(
            "duplicate longitude {} after shifting to start at {}",
            w[0], lon_min
        )));
    }

    let shift = LongitudeShift {
        grid: grid.with_lon(sorted),
        permutation,
    };
    if !shift.is_identity() {
        debug!(
            "Reordered {} longitudes to start at {}",
            shift.permutation.len(),
            lon_min
        );
    }
    Ok(shift)
}
