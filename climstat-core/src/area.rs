//! Grid-cell surface areas on a sphere
//!
//! Each coordinate value is treated as a cell centre. Cell edges sit halfway between
//! neighbouring centres and the outer edges of the first and last cells mirror the adjacent
//! spacing. Latitude edges are clamped to the poles.
//!
//! The area of the cell spanning latitudes $\phi_1..\phi_2$ and a longitude width
//! $\Delta\lambda$ (radians) is
//!
//! $$A = R^2 \Delta\lambda \left|\sin\phi_2 - \sin\phi_1\right|$$
//!
//! which is exact on a sphere of radius $R$, unlike the common
//! $R^2 \Delta\phi \Delta\lambda \cos\phi$ approximation.
//!
//! Ref: <https://badc.nerc.ac.uk/help/coordinates/cell-surf-area.html>

use crate::errors::{ClimstatError, ClimstatResult};
use crate::grid::{monotonic_direction, LonLatGrid};
use crate::FloatValue;
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1};
use std::f64::consts::PI;

/// Earth's mean radius (m)
pub const EARTH_RADIUS: FloatValue = 6_371_000.0;

/// Relative difference (%) from 4πR² above which a global grid triggers a warning
const GLOBAL_AREA_TOLERANCE_PERCENT: FloatValue = 1e-4;

/// Infer the `n + 1` cell edges of `n` cell centres
///
/// Interior edges are midpoints between neighbouring centres. The outermost edges are
/// extrapolated by half the adjacent spacing. The edges follow the direction of the centres.
///
/// # Errors
///
/// * [`ClimstatError::InsufficientGrid`] if there are fewer than 2 centres
/// * [`ClimstatError::InvalidBounds`] if the centres are not finite and strictly monotonic
pub fn cell_edges(
    centres: ArrayView1<FloatValue>,
    axis_name: &str,
) -> ClimstatResult<Array1<FloatValue>> {
    monotonic_direction(centres, axis_name)?;
    let n = centres.len();

    let mut edges = Array1::zeros(n + 1);
    edges[0] = centres[0] - (centres[1] - centres[0]) / 2.0;
    for i in 1..n {
        edges[i] = (centres[i - 1] + centres[i]) / 2.0;
    }
    edges[n] = centres[n - 1] + (centres[n - 1] - centres[n - 2]) / 2.0;
    Ok(edges)
}

/// Calculate the surface area (m²) of every grid cell
///
/// The result has shape `(n_lat, n_lon)`. Both axes may be increasing or decreasing, and
/// spacing need not be uniform.
///
/// # Errors
///
/// * [`ClimstatError::InsufficientGrid`] if either axis has fewer than 2 points
/// * [`ClimstatError::InvalidBounds`] if an axis is not strictly monotonic, holds
///   non-finite values, or a latitude lies outside [-90, 90]
///
/// # Examples
///
/// ```rust
/// use climstat_core::area::{compute_cell_area, EARTH_RADIUS};
/// use climstat_core::grid::LonLatGrid;
///
/// let grid = LonLatGrid::regular(5.0, 5.0).unwrap();
/// let area = compute_cell_area(&grid).unwrap();
/// let sphere = 4.0 * std::f64::consts::PI * EARTH_RADIUS * EARTH_RADIUS;
/// assert!((area.sum() - sphere).abs() / sphere < 1e-9);
/// ```
pub fn compute_cell_area(grid: &LonLatGrid) -> ClimstatResult<Array2<FloatValue>> {
    let lat = grid.lat();
    if let Some(bad) = lat.iter().find(|v| v.abs() > 90.0) {
        return Err(ClimstatError::InvalidBounds(format!(
            "latitudes must lie within [-90, 90], found {}",
            bad
        )));
    }

    let lon_edges = cell_edges(grid.lon(), "longitude")?;
    let lat_edges = cell_edges(lat, "latitude")?.mapv(|v| v.clamp(-90.0, 90.0));

    // Zonal width of each column in radians
    let x_width: Array1<FloatValue> = lon_edges
        .windows(2)
        .into_iter()
        .map(|w| (w[1] - w[0]).abs().to_radians())
        .collect();
    // Meridional width of each row in terms of sin(latitude)
    let y_width: Array1<FloatValue> = lat_edges
        .windows(2)
        .into_iter()
        .map(|w| (w[1].to_radians().sin() - w[0].to_radians().sin()).abs())
        .collect();

    check_longitude_widths(&x_width);

    let radius_sq = EARTH_RADIUS * EARTH_RADIUS;
    let area = Array2::from_shape_fn(grid.shape(), |(i, j)| radius_sq * y_width[i] * x_width[j]);

    check_global_total(&area, &lon_edges, &lat_edges);
    Ok(area)
}

fn check_longitude_widths(x_width: &Array1<FloatValue>) {
    let min = x_width.iter().cloned().fold(FloatValue::INFINITY, FloatValue::min);
    let max = x_width.iter().cloned().fold(0.0, FloatValue::max);
    if max > 2.0 * min {
        warn!(
            "Max longitude width ({}) > 2x min longitude width ({})",
            max.to_degrees(),
            min.to_degrees()
        );
    }
}

/// Compare the total against a sphere, but only for grids whose edges cover the globe
fn check_global_total(
    area: &Array2<FloatValue>,
    lon_edges: &Array1<FloatValue>,
    lat_edges: &Array1<FloatValue>,
) {
    let n = lon_edges.len() - 1;
    let lon_span = (lon_edges[n] - lon_edges[0]).abs();
    let m = lat_edges.len() - 1;
    let reaches_poles = lat_edges[0].abs() == 90.0 && lat_edges[m].abs() == 90.0;
    if (lon_span - 360.0).abs() > 1e-6 || !reaches_poles {
        return;
    }

    let sphere = 4.0 * PI * EARTH_RADIUS * EARTH_RADIUS;
    let perc_diff = 100.0 * (area.sum() - sphere) / sphere;
    if perc_diff.abs() > GLOBAL_AREA_TOLERANCE_PERCENT {
        warn!(
            "Total area calculated differs from spherical Earth by {}%",
            perc_diff
        );
    } else {
        debug!(
            "Total area of global grid within {}% of spherical Earth",
            perc_diff.abs()
        );
    }
}
