//! Area-weighted reductions over the longitude/latitude plane
//!
//! Every cell is weighted by its surface area. Cells that are excluded by a region mask, or
//! whose data value is missing, get zero weight in both the numerator and the denominator,
//! so missing data never drags a mean towards zero. Dimensions other than latitude and
//! longitude (time, ensemble member, level, ...) are kept and reduced independently.

use crate::array::MaskedArray;
use crate::errors::{ClimstatError, ClimstatResult};
use crate::grid::CoordinateNames;
use crate::FloatValue;
use log::debug;
use ndarray::{ArrayD, ArrayView2, IxDyn, ShapeError, Zip};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Statistic computed by [`area_weighted_stat`]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stat {
    /// Σ(value · area) / Σ(area)
    #[default]
    Mean,
    /// Σ(value · area)
    Sum,
}

impl FromStr for Stat {
    type Err = ClimstatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(Stat::Mean),
            "sum" => Ok(Stat::Sum),
            other => Err(ClimstatError::InvalidStat(other.to_string())),
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stat::Mean => write!(f, "mean"),
            Stat::Sum => write!(f, "sum"),
        }
    }
}

/// Reduce the latitude and longitude dimensions of `data` to an area-weighted statistic
///
/// # Arguments
///
/// * `data` - Values to reduce; must have the dimensions named in `names`
/// * `area` - Cell areas shaped `(n_lat, n_lon)`, e.g. from
///   [`compute_cell_area`](crate::area::compute_cell_area)
/// * `mask` - Optional exclusion mask shaped `(n_lat, n_lon)`; `true` cells get zero weight
/// * `stat` - Statistic to compute
/// * `names` - Names of the longitude and latitude dimensions
///
/// # Returns
///
/// An array over the remaining dimensions, in their original order. A slice whose total
/// weight is zero (everything masked or missing) is missing in the result. If `data` has no
/// other dimensions the result is 0-dimensional, see [`MaskedArray::scalar`].
///
/// # Errors
///
/// * [`ClimstatError::UnknownDimension`] if a coordinate name is not a dimension of `data`
/// * [`ClimstatError::ShapeMismatch`] if `area` or `mask` do not match the lat/lon extent
/// * [`ClimstatError::InvalidArea`] if an area is negative or not finite
///
/// # Examples
///
/// ```rust
/// use climstat_core::array::MaskedArray;
/// use climstat_core::grid::CoordinateNames;
/// use climstat_core::reduce::{area_weighted_stat, Stat};
/// use ndarray::array;
///
/// let data = MaskedArray::new(
///     array![[1.0, 2.0], [3.0, f64::NAN]].into_dyn(),
///     vec!["lat".to_string(), "lon".to_string()],
/// )
/// .unwrap();
/// let area = array![[1.0, 1.0], [2.0, 2.0]];
/// let mean = area_weighted_stat(&data, area.view(), None, Stat::Mean, &CoordinateNames::default())
///     .unwrap();
/// // (1 + 2 + 3 * 2) / (1 + 1 + 2), the missing cell carries no weight
/// assert_eq!(mean.scalar(), Some(2.25));
/// ```
pub fn area_weighted_stat(
    data: &MaskedArray,
    area: ArrayView2<FloatValue>,
    mask: Option<ArrayView2<bool>>,
    stat: Stat,
    names: &CoordinateNames,
) -> ClimstatResult<MaskedArray> {
    let axes = names.resolve(data.dims())?;
    let (lat, lon) = (axes.lat.index(), axes.lon.index());
    let shape = data.shape();
    let (n_lat, n_lon) = (shape[lat], shape[lon]);

    if area.dim() != (n_lat, n_lon) {
        return Err(ClimstatError::ShapeMismatch {
            what: "cell area".to_string(),
            expected: vec![n_lat, n_lon],
            found: area.shape().to_vec(),
        });
    }
    if let Some(((i, j), &value)) = area
        .indexed_iter()
        .find(|(_, a)| !(a.is_finite() && **a >= 0.0))
    {
        return Err(ClimstatError::InvalidArea {
            lat_index: i,
            lon_index: j,
            value,
        });
    }

    let weights = match mask {
        Some(mask) => {
            if mask.dim() != (n_lat, n_lon) {
                return Err(ClimstatError::ShapeMismatch {
                    what: "region mask".to_string(),
                    expected: vec![n_lat, n_lon],
                    found: mask.shape().to_vec(),
                });
            }
            Zip::from(&area)
                .and(&mask)
                .map_collect(|&a, &excluded| if excluded { 0.0 } else { a })
        }
        None => area.to_owned(),
    };

    // Move latitude and longitude to the end so each remaining index is one 2-D slice
    let mut order: Vec<usize> = (0..data.ndim()).filter(|&i| i != lat && i != lon).collect();
    let out_dims: Vec<String> = order.iter().map(|&i| data.dims()[i].clone()).collect();
    let out_shape: Vec<usize> = order.iter().map(|&i| shape[i]).collect();
    order.push(lat);
    order.push(lon);
    let n_slices: usize = out_shape.iter().product();
    let target = [n_slices, n_lat, n_lon];

    let values = data
        .values()
        .permuted_axes(order.clone())
        .as_standard_layout()
        .into_owned()
        .into_shape((n_slices, n_lat, n_lon))
        .map_err(|e| layout_error(e, &target, shape))?;
    let valid = data
        .valid()
        .permuted_axes(order)
        .as_standard_layout()
        .into_owned()
        .into_shape((n_slices, n_lat, n_lon))
        .map_err(|e| layout_error(e, &target, shape))?;

    let mut out_values = Vec::with_capacity(n_slices);
    let mut out_valid = Vec::with_capacity(n_slices);
    for (slice, ok) in values.outer_iter().zip(valid.outer_iter()) {
        let (weighted, total) = Zip::from(&slice).and(&ok).and(&weights).fold(
            (0.0, 0.0),
            |(weighted, total), &v, &ok, &w| {
                if ok && !v.is_nan() && w > 0.0 {
                    (weighted + v * w, total + w)
                } else {
                    (weighted, total)
                }
            },
        );
        if total == 0.0 {
            out_values.push(FloatValue::NAN);
            out_valid.push(false);
        } else {
            out_values.push(match stat {
                Stat::Mean => weighted / total,
                Stat::Sum => weighted,
            });
            out_valid.push(true);
        }
    }
    debug!(
        "Area-weighted {} of {} slice(s) over {}x{} cells, {} missing",
        stat,
        n_slices,
        n_lat,
        n_lon,
        out_valid.iter().filter(|ok| !**ok).count()
    );

    let out_values = ArrayD::from_shape_vec(IxDyn(&out_shape), out_values)
        .map_err(|e| layout_error(e, &out_shape, &[n_slices]))?;
    let out_valid = ArrayD::from_shape_vec(IxDyn(&out_shape), out_valid)
        .map_err(|e| layout_error(e, &out_shape, &[n_slices]))?;
    MaskedArray::from_parts(out_values, out_valid, out_dims)
}

/// `found` could not be rearranged into `expected`
fn layout_error(e: ShapeError, expected: &[usize], found: &[usize]) -> ClimstatError {
    ClimstatError::ShapeMismatch {
        what: format!("reduction layout ({})", e),
        expected: expected.to_vec(),
        found: found.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use ndarray::{array, Array2, Array3};

    fn dims(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn names() -> CoordinateNames {
        CoordinateNames::default()
    }

    #[test]
    fn parse_stat() {
        assert_eq!("mean".parse::<Stat>().unwrap(), Stat::Mean);
        assert_eq!("sum".parse::<Stat>().unwrap(), Stat::Sum);
        assert_eq!(
            "median".parse::<Stat>(),
            Err(ClimstatError::InvalidStat("median".to_string()))
        );
    }

    #[test]
    fn constant_field_mean_is_constant_for_any_mask() {
        let data =
            MaskedArray::new(Array2::from_elem((4, 5), 2.5).into_dyn(), dims(&["lat", "lon"]))
                .unwrap();
        let area = Array2::<f64>::ones((4, 5));
        let masks = [
            Array2::from_shape_fn((4, 5), |(i, _)| i == 0),
            Array2::from_shape_fn((4, 5), |(i, j)| (i + j) % 2 == 0),
            Array2::from_shape_fn((4, 5), |(i, j)| !(i == 3 && j == 4)),
        ];
        for mask in masks.iter() {
            let result =
                area_weighted_stat(&data, area.view(), Some(mask.view()), Stat::Mean, &names())
                    .unwrap();
            assert_eq!(result.scalar(), Some(2.5));
        }
    }

    #[test]
    fn missing_values_are_excluded_not_zeroed() {
        let data = MaskedArray::new(
            array![[1.0, f64::NAN], [3.0, f64::NAN]].into_dyn(),
            dims(&["lat", "lon"]),
        )
        .unwrap();
        let area = Array2::<f64>::ones((2, 2));
        let mean = area_weighted_stat(&data, area.view(), None, Stat::Mean, &names()).unwrap();
        assert_eq!(mean.scalar(), Some(2.0));
        let sum = area_weighted_stat(&data, area.view(), None, Stat::Sum, &names()).unwrap();
        assert_eq!(sum.scalar(), Some(4.0));
    }

    #[test]
    fn fill_values_are_excluded() {
        let data = MaskedArray::new(
            array![[1.0, 1e20], [3.0, 1e20]].into_dyn(),
            dims(&["lat", "lon"]),
        )
        .unwrap()
        .with_fill_value(1e20);
        let area = Array2::<f64>::ones((2, 2));
        let mean = area_weighted_stat(&data, area.view(), None, Stat::Mean, &names()).unwrap();
        assert_eq!(mean.scalar(), Some(2.0));
    }

    #[test]
    fn weights_follow_area() {
        let data =
            MaskedArray::new(array![[10.0], [20.0]].into_dyn(), dims(&["lat", "lon"])).unwrap();
        let area = array![[1.0], [3.0]];
        let mean = area_weighted_stat(&data, area.view(), None, Stat::Mean, &names()).unwrap();
        assert_eq!(mean.scalar(), Some(17.5));
        let sum = area_weighted_stat(&data, area.view(), None, Stat::Sum, &names()).unwrap();
        assert_eq!(sum.scalar(), Some(70.0));
    }

    #[test]
    fn fully_excluded_slice_is_missing() {
        // time = 0 has data only in the masked row, time = 1 has data everywhere
        let values = Array3::from_shape_fn((2, 2, 2), |(t, i, _)| {
            if t == 0 && i == 1 {
                f64::NAN
            } else {
                (t + 1) as f64
            }
        });
        let data = MaskedArray::new(values.into_dyn(), dims(&["time", "lat", "lon"])).unwrap();
        let area = Array2::<f64>::ones((2, 2));
        let mask = array![[true, true], [false, false]];
        for stat in [Stat::Mean, Stat::Sum] {
            let result =
                area_weighted_stat(&data, area.view(), Some(mask.view()), stat, &names()).unwrap();
            assert_eq!(result.dims(), &["time".to_string()]);
            assert_eq!(result.get(&[0]), None);
            assert!(result.values()[[0]].is_nan());
            assert!(result.get(&[1]).is_some());
        }
    }

    #[test]
    fn slices_are_reduced_independently() {
        let values = Array3::from_shape_fn((3, 2, 4), |(t, i, j)| (t * 100 + i * 10 + j) as f64);
        let data = MaskedArray::new(values.into_dyn(), dims(&["time", "lat", "lon"])).unwrap();
        let area = array![[1.0, 1.0, 1.0, 1.0], [3.0, 3.0, 3.0, 3.0]];
        let result = area_weighted_stat(&data, area.view(), None, Stat::Mean, &names()).unwrap();
        assert_eq!(result.shape(), &[3]);
        for t in 0..3 {
            // Row means are t*100 + 1.5 and t*100 + 11.5, weighted 1:3
            let expected = t as f64 * 100.0 + (1.5 + 3.0 * 11.5) / 4.0;
            assert!(is_close!(result.get(&[t]).unwrap(), expected));
        }
    }

    #[test]
    fn axis_order_does_not_matter() {
        let values = Array3::from_shape_fn((3, 2, 4), |(t, i, j)| ((t + 1) * (i + 2) + j) as f64);
        let area = array![[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0]];
        let standard =
            MaskedArray::new(values.clone().into_dyn(), dims(&["time", "lat", "lon"])).unwrap();
        // Same data laid out as (lon, time, lat)
        let shuffled = MaskedArray::new(
            values.permuted_axes([2, 0, 1]).into_dyn(),
            dims(&["lon", "time", "lat"]),
        )
        .unwrap();

        let a = area_weighted_stat(&standard, area.view(), None, Stat::Mean, &names()).unwrap();
        let b = area_weighted_stat(&shuffled, area.view(), None, Stat::Mean, &names()).unwrap();
        for t in 0..3 {
            assert!(is_close!(a.get(&[t]).unwrap(), b.get(&[t]).unwrap()));
        }
    }

    #[test]
    fn extra_dimensions_keep_their_order() {
        let data = MaskedArray::new(
            ndarray::Array4::<f64>::ones((2, 3, 2, 5)).into_dyn(),
            dims(&["member", "lat", "time", "lon"]),
        )
        .unwrap();
        let area = Array2::<f64>::ones((3, 5));
        let result = area_weighted_stat(&data, area.view(), None, Stat::Sum, &names()).unwrap();
        assert_eq!(result.dims(), &["member".to_string(), "time".to_string()]);
        assert_eq!(result.shape(), &[2, 2]);
        assert!(result.values().iter().all(|v| *v == 15.0));
    }

    #[test]
    fn shape_errors() {
        let data =
            MaskedArray::new(Array2::<f64>::ones((2, 3)).into_dyn(), dims(&["lat", "lon"])).unwrap();
        let bad_area = Array2::<f64>::ones((3, 2));
        assert!(matches!(
            area_weighted_stat(&data, bad_area.view(), None, Stat::Mean, &names()),
            Err(ClimstatError::ShapeMismatch { .. })
        ));

        let area = Array2::<f64>::ones((2, 3));
        let bad_mask = Array2::from_elem((2, 2), false);
        assert!(matches!(
            area_weighted_stat(&data, area.view(), Some(bad_mask.view()), Stat::Mean, &names()),
            Err(ClimstatError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn unknown_dimension() {
        let data =
            MaskedArray::new(Array2::<f64>::ones((2, 3)).into_dyn(), dims(&["y", "x"])).unwrap();
        let area = Array2::<f64>::ones((2, 3));
        assert!(matches!(
            area_weighted_stat(&data, area.view(), None, Stat::Mean, &names()),
            Err(ClimstatError::UnknownDimension { .. })
        ));
        let custom = CoordinateNames::new("x", "y");
        assert!(area_weighted_stat(&data, area.view(), None, Stat::Mean, &custom).is_ok());
    }

    #[test]
    fn layout_error_reports_both_shapes() {
        let e = ShapeError::from_kind(ndarray::ErrorKind::IncompatibleShape);
        match layout_error(e, &[4, 2, 3], &[2, 3, 4, 1]) {
            ClimstatError::ShapeMismatch {
                what,
                expected,
                found,
            } => {
                assert!(what.starts_with("reduction layout"));
                assert_eq!(expected, vec![4, 2, 3]);
                assert_eq!(found, vec![2, 3, 4, 1]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn negative_area_is_rejected() {
        let data =
            MaskedArray::new(Array2::<f64>::ones((2, 2)).into_dyn(), dims(&["lat", "lon"])).unwrap();
        let area = array![[1.0, 1.0], [-1.0, 1.0]];
        assert_eq!(
            area_weighted_stat(&data, area.view(), None, Stat::Mean, &names()),
            Err(ClimstatError::InvalidArea {
                lat_index: 1,
                lon_index: 0,
                value: -1.0
            })
        );
    }
}
