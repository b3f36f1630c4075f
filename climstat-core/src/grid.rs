//! Longitude/latitude coordinate axes
//!
//! A [`LonLatGrid`] holds the two coordinate vectors of a rectangular mesh. It makes no
//! assumption about the data attached to it; [`CoordinateNames`] resolves which
//! dimensions of a data array are the longitude and latitude axes.
//!
//! ```rust
//! use climstat_core::grid::{CoordinateNames, LonLatGrid};
//!
//! let grid = LonLatGrid::regular(2.5, 2.5).unwrap();
//! assert_eq!(grid.shape(), (73, 144));
//!
//! let dims = vec!["time".to_string(), "lat".to_string(), "lon".to_string()];
//! let axes = CoordinateNames::default().resolve(&dims).unwrap();
//! assert_eq!(axes.lat.index(), 1);
//! assert_eq!(axes.lon.index(), 2);
//! ```

use crate::errors::{ClimstatError, ClimstatResult};
use crate::FloatValue;
use ndarray::{Array1, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Default name of the longitude dimension and coordinate
pub const DEFAULT_LON_NAME: &str = "lon";
/// Default name of the latitude dimension and coordinate
pub const DEFAULT_LAT_NAME: &str = "lat";

/// Names of the longitude and latitude dimensions of a data array
///
/// Default: `{ lon: "lon", lat: "lat" }`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateNames {
    /// Name of the longitude dimension
    pub lon: String,
    /// Name of the latitude dimension
    pub lat: String,
}

impl Default for CoordinateNames {
    fn default() -> Self {
        Self {
            lon: DEFAULT_LON_NAME.to_string(),
            lat: DEFAULT_LAT_NAME.to_string(),
        }
    }
}

/// Positional axes of the latitude and longitude dimensions
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpatialAxes {
    pub lat: Axis,
    pub lon: Axis,
}

impl CoordinateNames {
    pub fn new(lon: &str, lat: &str) -> Self {
        Self {
            lon: lon.to_string(),
            lat: lat.to_string(),
        }
    }

    /// Resolve the named dimensions to positional axes
    ///
    /// This is done once per operation; everything downstream works positionally.
    pub fn resolve(&self, dims: &[String]) -> ClimstatResult<SpatialAxes> {
        if self.lon == self.lat {
            return Err(ClimstatError::InvalidBounds(format!(
                "longitude and latitude must be distinct dimensions, both are named \"{}\"",
                self.lon
            )));
        }
        Ok(SpatialAxes {
            lat: Axis(axis_index(dims, &self.lat)?),
            lon: Axis(axis_index(dims, &self.lon)?),
        })
    }
}

/// Position of the dimension called `name`
pub fn axis_index(dims: &[String], name: &str) -> ClimstatResult<usize> {
    dims.iter()
        .position(|d| d == name)
        .ok_or_else(|| ClimstatError::UnknownDimension {
            name: name.to_string(),
            available: dims.to_vec(),
        })
}

/// Direction of a strictly monotonic coordinate axis
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Monotonic {
    Increasing,
    Decreasing,
}

/// Check that `values` is finite and strictly monotonic, and report its direction
///
/// # Errors
///
/// * [`ClimstatError::InsufficientGrid`] if there are fewer than 2 values
/// * [`ClimstatError::InvalidBounds`] if a value is not finite or the axis is not strictly
///   increasing or strictly decreasing
pub fn monotonic_direction(
    values: ArrayView1<FloatValue>,
    axis_name: &str,
) -> ClimstatResult<Monotonic> {
    if values.len() < 2 {
        return Err(ClimstatError::InsufficientGrid {
            axis: axis_name.to_string(),
            len: values.len(),
        });
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(ClimstatError::InvalidBounds(format!(
            "{} values must be finite, found {}",
            axis_name, bad
        )));
    }

    let increasing = values.windows(2).into_iter().all(|w| w[1] > w[0]);
    if increasing {
        return Ok(Monotonic::Increasing);
    }
    let decreasing = values.windows(2).into_iter().all(|w| w[1] < w[0]);
    if decreasing {
        return Ok(Monotonic::Decreasing);
    }
    Err(ClimstatError::InvalidBounds(format!(
        "{} values must increase or decrease monotonically",
        axis_name
    )))
}

/// Coordinates of a rectangular longitude/latitude mesh, in degrees
///
/// Arrays defined on the grid are laid out `(lat, lon)`, so [`LonLatGrid::shape`] returns
/// `(n_lat, n_lon)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LonLatGrid {
    lon: Array1<FloatValue>,
    lat: Array1<FloatValue>,
}

impl LonLatGrid {
    pub fn new(lon: Array1<FloatValue>, lat: Array1<FloatValue>) -> Self {
        Self { lon, lat }
    }

    pub fn from_vecs(lon: Vec<FloatValue>, lat: Vec<FloatValue>) -> Self {
        Self::new(Array1::from(lon), Array1::from(lat))
    }

    /// Regular global grid starting at longitude 0 with poles included
    ///
    /// Longitudes run `0, dlon, ..., 360 - dlon` and latitudes `-90, -90 + dlat, ..., 90`,
    /// the layout of most atmosphere model output on a finite-volume grid.
    pub fn regular(dlon: FloatValue, dlat: FloatValue) -> ClimstatResult<Self> {
        let n_lon = steps_in(360.0, dlon, "dlon")?;
        let n_lat = steps_in(180.0, dlat, "dlat")? + 1;
        let lon = Array1::from_iter((0..n_lon).map(|i| i as FloatValue * dlon));
        let lat = Array1::from_iter((0..n_lat).map(|j| -90.0 + j as FloatValue * dlat));
        Ok(Self::new(lon, lat))
    }

    /// Regular global grid of cell centres, offset half a cell from -180 and the south pole
    pub fn cell_centred(dlon: FloatValue, dlat: FloatValue) -> ClimstatResult<Self> {
        let n_lon = steps_in(360.0, dlon, "dlon")?;
        let n_lat = steps_in(180.0, dlat, "dlat")?;
        let lon =
            Array1::from_iter((0..n_lon).map(|i| -180.0 + (i as FloatValue + 0.5) * dlon));
        let lat = Array1::from_iter((0..n_lat).map(|j| -90.0 + (j as FloatValue + 0.5) * dlat));
        Ok(Self::new(lon, lat))
    }

    pub fn lon(&self) -> ArrayView1<'_, FloatValue> {
        self.lon.view()
    }

    pub fn lat(&self) -> ArrayView1<'_, FloatValue> {
        self.lat.view()
    }

    pub fn n_lon(&self) -> usize {
        self.lon.len()
    }

    pub fn n_lat(&self) -> usize {
        self.lat.len()
    }

    /// `(n_lat, n_lon)`
    pub fn shape(&self) -> (usize, usize) {
        (self.n_lat(), self.n_lon())
    }

    /// Copy of this grid with the longitudes replaced
    pub fn with_lon(&self, lon: Array1<FloatValue>) -> Self {
        Self {
            lon,
            lat: self.lat.clone(),
        }
    }
}

fn steps_in(span: FloatValue, step: FloatValue, name: &str) -> ClimstatResult<usize> {
    if !(step.is_finite() && step > 0.0) {
        return Err(ClimstatError::InvalidBounds(format!(
            "{} must be positive, got {}",
            name, step
        )));
    }
    let n = (span / step).round();
    if n < 1.0 || (n * step - span).abs() > 1e-9 * span {
        return Err(ClimstatError::InvalidBounds(format!(
            "{} = {} does not divide {} degrees evenly",
            name, step, span
        )));
    }
    Ok(n as usize)
}
