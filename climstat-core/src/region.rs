//! Region masks for axis-aligned longitude/latitude boxes
//!
//! A mask marks the cells to *exclude* from a statistic. Selecting the `Inside` of a box
//! therefore masks every cell outside it, and selecting the `Outside` masks every cell
//! inside it.
//!
//! Longitude bounds may cross the antimeridian. `RegionBounds::new((170.0, -170.0), ..)`
//! describes a 20° wide box centred on 180°, whatever longitude convention the grid uses.
//!
//! ```rust
//! use climstat_core::grid::LonLatGrid;
//! use climstat_core::region::{build_region_mask, RegionBounds, SelectHow};
//!
//! let grid = LonLatGrid::from_vecs(vec![-175.0, 0.0, 175.0], vec![0.0, 10.0]);
//! let bounds = RegionBounds::new((170.0, -170.0), (-90.0, 90.0));
//! let mask = build_region_mask(&grid, &bounds, SelectHow::Inside).unwrap();
//! // Only the longitude-0 column lies outside the box, so only it is masked
//! assert_eq!(mask.row(0).to_vec(), vec![false, true, false]);
//! ```

use crate::errors::{ClimstatError, ClimstatResult};
use crate::grid::LonLatGrid;
use crate::longitude::{check_longitude, wrap_longitude};
use crate::FloatValue;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of the region boundary to keep
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectHow {
    /// Keep cells inside the region, mask everything else
    #[default]
    Inside,
    /// Keep cells outside the region, mask the region itself
    Outside,
}

impl FromStr for SelectHow {
    type Err = ClimstatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inside" => Ok(SelectHow::Inside),
            "outside" => Ok(SelectHow::Outside),
            other => Err(ClimstatError::InvalidSelection(other.to_string())),
        }
    }
}

impl fmt::Display for SelectHow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectHow::Inside => write!(f, "inside"),
            SelectHow::Outside => write!(f, "outside"),
        }
    }
}

/// Longitude and latitude limits of a box, in degrees, both ends inclusive
///
/// Default: the whole globe, `lon = (-180, 180)`, `lat = (-90, 90)`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionBounds {
    /// `(west, east)`; `west > east` crosses the antimeridian
    pub lon: (FloatValue, FloatValue),
    /// `(south, north)`
    pub lat: (FloatValue, FloatValue),
}

impl Default for RegionBounds {
    fn default() -> Self {
        Self::global()
    }
}

impl RegionBounds {
    pub fn new(lon: (FloatValue, FloatValue), lat: (FloatValue, FloatValue)) -> Self {
        Self { lon, lat }
    }

    pub fn global() -> Self {
        Self {
            lon: (-180.0, 180.0),
            lat: (-90.0, 90.0),
        }
    }

    /// Box covering all longitudes between two latitudes
    pub fn zonal_band(south: FloatValue, north: FloatValue) -> Self {
        Self {
            lon: (-180.0, 180.0),
            lat: (south, north),
        }
    }

    /// True if the longitude range covers a full turn or more
    pub fn spans_all_longitudes(&self) -> bool {
        self.lon.1 - self.lon.0 >= 360.0
    }

    /// Check that the bounds describe a usable box
    ///
    /// # Errors
    ///
    /// Returns [`ClimstatError::InvalidBounds`] if any bound is not finite, a longitude bound
    /// fails [`check_longitude`], a latitude bound
    /// lies outside [-90, 90], or the southern bound exceeds the northern bound.
    pub fn validate(&self) -> ClimstatResult<()> {
        let (lon_0, lon_1) = self.lon;
        let (lat_0, lat_1) = self.lat;
        check_longitude(lon_0, "western bound")?;
        check_longitude(lon_1, "eastern bound")?;
        if !(lat_0.is_finite() && lat_1.is_finite()) {
            return Err(ClimstatError::InvalidBounds(format!(
                "latitude bounds must be finite, got ({}, {})",
                lat_0, lat_1
            )));
        }
        if lat_0 < -90.0 || lat_1 > 90.0 {
            return Err(ClimstatError::InvalidBounds(format!(
                "latitude bounds must lie within [-90, 90], got ({}, {})",
                lat_0, lat_1
            )));
        }
        if lat_0 > lat_1 {
            return Err(ClimstatError::InvalidBounds(format!(
                "southern latitude bound {} exceeds northern bound {}",
                lat_0, lat_1
            )));
        }
        Ok(())
    }

    /// Longitude membership of every grid longitude
    ///
    /// The bounds are first expressed in the grid's own frame, `[min(lon), min(lon) + 360)`.
    fn lon_membership(&self, lon: &[FloatValue]) -> Vec<bool> {
        if self.spans_all_longitudes() {
            return vec![true; lon.len()];
        }
        let frame = lon.iter().cloned().fold(FloatValue::INFINITY, FloatValue::min);
        let west = wrap_longitude(self.lon.0, frame);
        let east = wrap_longitude(self.lon.1, frame);
        lon.iter()
            .map(|&l| {
                let l = wrap_longitude(l, frame);
                if west <= east {
                    west <= l && l <= east
                } else {
                    l >= west || l <= east
                }
            })
            .collect()
    }

    fn lat_membership(&self, lat: &[FloatValue]) -> Vec<bool> {
        lat.iter()
            .map(|&l| self.lat.0 <= l && l <= self.lat.1)
            .collect()
    }
}

/// Build the exclusion mask of a region, shaped `(n_lat, n_lon)`
///
/// With [`SelectHow::Inside`] the mask is `true` for cells outside `bounds`; with
/// [`SelectHow::Outside`] it is `true` for cells inside `bounds`.
///
/// # Errors
///
/// Returns [`ClimstatError::InvalidBounds`] if `bounds` fail [`RegionBounds::validate`] or
/// a grid longitude fails [`check_longitude`].
pub fn build_region_mask(
    grid: &LonLatGrid,
    bounds: &RegionBounds,
    select_how: SelectHow,
) -> ClimstatResult<Array2<bool>> {
    bounds.validate()?;
    let lon: Vec<FloatValue> = grid.lon().to_vec();
    let lat: Vec<FloatValue> = grid.lat().to_vec();
    for &v in lon.iter() {
        check_longitude(v, "longitude")?;
    }

    let lon_in = Array1::from(bounds.lon_membership(&lon));
    let lat_in = Array1::from(bounds.lat_membership(&lat));

    let mask = Array2::from_shape_fn(grid.shape(), |(i, j)| {
        let inside = lat_in[i] && lon_in[j];
        match select_how {
            SelectHow::Inside => !inside,
            SelectHow::Outside => inside,
        }
    });
    Ok(mask)
}
