use climstat_core::errors::ClimstatError;
use climstat_core::fdr::{benjamini_hochberg_adjusted, fdr_correct_array, DEFAULT_ALPHA};
use climstat_core::grid::{CoordinateNames, LonLatGrid};
use climstat_core::longitude::DEFAULT_LON_MIN;
use climstat_core::{area, reduce, region, MaskedArray};
use ndarray::Array1;
use numpy::{
    IntoPyArray, PyArray1, PyArray2, PyArrayDyn, PyReadonlyArray1, PyReadonlyArray2,
    PyReadonlyArrayDyn,
};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn to_py_err(e: ClimstatError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn grid_from(lon: PyReadonlyArray1<'_, f64>, lat: PyReadonlyArray1<'_, f64>) -> LonLatGrid {
    LonLatGrid::new(lon.as_array().to_owned(), lat.as_array().to_owned())
}

/// Shift longitudes into `[lon_min, lon_min + 360)` and sort them.
///
/// Returns the new longitudes and the permutation to apply to the data's
/// longitude axis (`data.take(permutation, axis=lon_axis)`).
#[pyfunction]
#[pyo3(signature = (lon, lon_min = DEFAULT_LON_MIN))]
fn normalize_longitude<'py>(
    py: Python<'py>,
    lon: PyReadonlyArray1<'py, f64>,
    lon_min: f64,
) -> PyResult<(Bound<'py, PyArray1<f64>>, Vec<usize>)> {
    let grid = LonLatGrid::new(lon.as_array().to_owned(), Array1::zeros(0));
    let shift = climstat_core::normalize_longitude(&grid, lon_min).map_err(to_py_err)?;
    let permutation = shift.permutation().to_vec();
    let lon = shift.grid().lon().to_owned();
    Ok((lon.into_pyarray_bound(py), permutation))
}

/// Surface area (m^2) of every cell of a lon/lat grid, shaped `(n_lat, n_lon)`.
#[pyfunction]
fn compute_cell_area<'py>(
    py: Python<'py>,
    lon: PyReadonlyArray1<'py, f64>,
    lat: PyReadonlyArray1<'py, f64>,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let area = area::compute_cell_area(&grid_from(lon, lat)).map_err(to_py_err)?;
    Ok(area.into_pyarray_bound(py))
}

/// Mask shaped `(n_lat, n_lon)` that is True for the cells to exclude.
#[pyfunction]
#[pyo3(signature = (lon, lat, lon_bounds = (-180.0, 180.0), lat_bounds = (-90.0, 90.0), select_how = "inside"))]
fn build_region_mask<'py>(
    py: Python<'py>,
    lon: PyReadonlyArray1<'py, f64>,
    lat: PyReadonlyArray1<'py, f64>,
    lon_bounds: (f64, f64),
    lat_bounds: (f64, f64),
    select_how: &str,
) -> PyResult<Bound<'py, PyArray2<bool>>> {
    let select_how: region::SelectHow = select_how.parse().map_err(to_py_err)?;
    let bounds = region::RegionBounds::new(lon_bounds, lat_bounds);
    let mask = region::build_region_mask(&grid_from(lon, lat), &bounds, select_how)
        .map_err(to_py_err)?;
    Ok(mask.into_pyarray_bound(py))
}

/// Area-weighted mean or sum over the lat/lon dimensions of `data`.
///
/// `dims` names every dimension of `data`. NaN entries are missing and carry no
/// weight; slices without any weight come back as NaN.
#[pyfunction]
#[pyo3(signature = (data, dims, area, mask = None, stat = "mean", lon_name = "lon", lat_name = "lat"))]
#[allow(clippy::too_many_arguments)]
fn area_weighted_stat<'py>(
    py: Python<'py>,
    data: PyReadonlyArrayDyn<'py, f64>,
    dims: Vec<String>,
    area: PyReadonlyArray2<'py, f64>,
    mask: Option<PyReadonlyArray2<'py, bool>>,
    stat: &str,
    lon_name: &str,
    lat_name: &str,
) -> PyResult<Bound<'py, PyArrayDyn<f64>>> {
    let stat: reduce::Stat = stat.parse().map_err(to_py_err)?;
    let data = MaskedArray::new(data.as_array().to_owned(), dims).map_err(to_py_err)?;
    let result = reduce::area_weighted_stat(
        &data,
        area.as_array(),
        mask.as_ref().map(|m| m.as_array()),
        stat,
        &CoordinateNames::new(lon_name, lat_name),
    )
    .map_err(to_py_err)?;
    Ok(result.filled(f64::NAN).into_pyarray_bound(py))
}

/// Benjamini-Hochberg false discovery rate control.
///
/// Returns the reject mask, shaped like `p_values`, and the p-value threshold
/// (None if nothing is rejected).
#[pyfunction]
#[pyo3(signature = (p_values, alpha = DEFAULT_ALPHA))]
fn fdr_correct<'py>(
    py: Python<'py>,
    p_values: PyReadonlyArrayDyn<'py, f64>,
    alpha: f64,
) -> PyResult<(Bound<'py, PyArrayDyn<bool>>, Option<f64>)> {
    let (mask, result) = fdr_correct_array(p_values.as_array(), alpha).map_err(to_py_err)?;
    Ok((mask.into_pyarray_bound(py), result.threshold))
}

/// Benjamini-Hochberg adjusted p-values, in input order.
#[pyfunction]
#[pyo3(name = "benjamini_hochberg_adjusted")]
fn bh_adjusted<'py>(
    py: Python<'py>,
    p_values: PyReadonlyArray1<'py, f64>,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let flat: Vec<f64> = p_values.as_array().iter().cloned().collect();
    let adjusted = benjamini_hochberg_adjusted(&flat).map_err(to_py_err)?;
    Ok(adjusted.into_pyarray_bound(py))
}

#[pymodule]
#[pyo3(name = "_lib")]
fn climstat(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(normalize_longitude, m)?)?;
    m.add_function(wrap_pyfunction!(compute_cell_area, m)?)?;
    m.add_function(wrap_pyfunction!(build_region_mask, m)?)?;
    m.add_function(wrap_pyfunction!(area_weighted_stat, m)?)?;
    m.add_function(wrap_pyfunction!(fdr_correct, m)?)?;
    m.add_function(wrap_pyfunction!(bh_adjusted, m)?)?;
    Ok(())
}
