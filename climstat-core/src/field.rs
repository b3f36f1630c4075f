//! Data bound to its longitude/latitude coordinates
//!
//! [`GridField`] is the unit that flows through a regional analysis: shift the longitudes
//! into a preferred convention, mask a region and reduce to an area-weighted statistic.
//! Each step returns a new field and leaves its input untouched.

use crate::area::compute_cell_area;
use crate::array::MaskedArray;
use crate::config::AnalysisConfig;
use crate::errors::{ClimstatError, ClimstatResult};
use crate::grid::{CoordinateNames, LonLatGrid, SpatialAxes};
use crate::longitude::normalize_longitude;
use crate::reduce::{area_weighted_stat, Stat};
use crate::region::{build_region_mask, RegionBounds, SelectHow};
use crate::FloatValue;
use log::debug;
use ndarray::{Array2, ArrayD, IxDyn};

/// A [`MaskedArray`] whose latitude and longitude dimensions match a [`LonLatGrid`]
#[derive(Clone, Debug, PartialEq)]
pub struct GridField {
    data: MaskedArray,
    grid: LonLatGrid,
    names: CoordinateNames,
}

impl GridField {
    /// Attach `grid` to `data`
    ///
    /// # Errors
    ///
    /// * [`ClimstatError::UnknownDimension`] if `data` lacks one of the named dimensions
    /// * [`ClimstatError::ShapeMismatch`] if the dimension lengths differ from the grid
    pub fn new(
        data: MaskedArray,
        grid: LonLatGrid,
        names: CoordinateNames,
    ) -> ClimstatResult<Self> {
        let axes = names.resolve(data.dims())?;
        let shape = data.shape();
        let found = (shape[axes.lat.index()], shape[axes.lon.index()]);
        if found != grid.shape() {
            return Err(ClimstatError::ShapeMismatch {
                what: format!("{}/{} dimensions", names.lat, names.lon),
                expected: vec![grid.n_lat(), grid.n_lon()],
                found: vec![found.0, found.1],
            });
        }
        Ok(Self { data, grid, names })
    }

    pub fn data(&self) -> &MaskedArray {
        &self.data
    }

    pub fn grid(&self) -> &LonLatGrid {
        &self.grid
    }

    pub fn names(&self) -> &CoordinateNames {
        &self.names
    }

    pub fn into_data(self) -> MaskedArray {
        self.data
    }

    /// Attach this field's coordinates to a derived array
    pub fn with_data(&self, data: MaskedArray) -> ClimstatResult<Self> {
        Self::new(data, self.grid.clone(), self.names.clone())
    }

    fn axes(&self) -> ClimstatResult<SpatialAxes> {
        self.names.resolve(self.data.dims())
    }

    /// Shift longitudes into `[lon_min, lon_min + 360)` and reorder the data to match
    pub fn shift_longitude(&self, lon_min: FloatValue) -> ClimstatResult<Self> {
        let shift = normalize_longitude(&self.grid, lon_min)?;
        let data = if shift.is_identity() {
            self.data.clone()
        } else {
            self.data.select(self.axes()?.lon, shift.permutation())
        };
        Ok(Self {
            data,
            grid: shift.into_grid(),
            names: self.names.clone(),
        })
    }

    /// Surface area of every grid cell, see [`compute_cell_area`]
    pub fn cell_area(&self) -> ClimstatResult<Array2<FloatValue>> {
        compute_cell_area(&self.grid)
    }

    /// Exclusion mask for `bounds`, see [`build_region_mask`]
    pub fn region_mask(
        &self,
        bounds: &RegionBounds,
        select_how: SelectHow,
    ) -> ClimstatResult<Array2<bool>> {
        build_region_mask(&self.grid, bounds, select_how)
    }

    /// Copy of this field with every cell excluded by the region selection marked missing
    pub fn mask_region(
        &self,
        bounds: &RegionBounds,
        select_how: SelectHow,
    ) -> ClimstatResult<Self> {
        let mask = self.region_mask(bounds, select_how)?;
        let axes = self.axes()?;
        let (lat, lon) = (axes.lat.index(), axes.lon.index());
        // Spread the (lat, lon) plane over every other dimension
        let exclude = ArrayD::from_shape_fn(IxDyn(self.data.shape()), |idx| {
            mask[[idx[lat], idx[lon]]]
        });
        Ok(Self {
            data: self.data.exclude(exclude.view())?,
            grid: self.grid.clone(),
            names: self.names.clone(),
        })
    }

    /// Area-weighted statistic over the whole grid, or over the inside of `bounds`
    pub fn area_weighted_stat(
        &self,
        stat: Stat,
        bounds: Option<&RegionBounds>,
    ) -> ClimstatResult<MaskedArray> {
        let area = self.cell_area()?;
        let mask = bounds
            .map(|b| self.region_mask(b, SelectHow::Inside))
            .transpose()?;
        area_weighted_stat(
            &self.data,
            area.view(),
            mask.as_ref().map(|m| m.view()),
            stat,
            &self.names,
        )
    }

    /// Run the regional analysis described by `config`
    ///
    /// The longitudes are shifted to `config.longitude.lon_min`, the region selection is
    /// applied and the remaining cells are reduced with `config.reduction.stat`.
    ///
    /// # Errors
    ///
    /// Returns [`ClimstatError::InvalidConfig`] if `config.coordinates` names different
    /// dimensions than this field uses, besides the errors of [`AnalysisConfig::validate`]
    /// and of each pipeline step.
    pub fn analyse(&self, config: &AnalysisConfig) -> ClimstatResult<MaskedArray> {
        config.validate()?;
        if config.coordinates != self.names {
            return Err(ClimstatError::InvalidConfig(format!(
                "configured coordinates ({}, {}) differ from the field's ({}, {})",
                config.coordinates.lon, config.coordinates.lat, self.names.lon, self.names.lat
            )));
        }
        let shifted = self.shift_longitude(config.longitude.lon_min)?;
        let mask = shifted.region_mask(&config.region.bounds, config.region.select_how)?;
        let area = shifted.cell_area()?;
        debug!(
            "Regional {} ({} {:?}) over {} of {} cells",
            config.reduction.stat,
            config.region.select_how,
            config.region.bounds,
            mask.iter().filter(|excluded| !**excluded).count(),
            mask.len()
        );
        area_weighted_stat(
            &shifted.data,
            area.view(),
            Some(mask.view()),
            config.reduction.stat,
            &shifted.names,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use ndarray::{array, Array3};

    fn dims(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn quarter_grid() -> LonLatGrid {
        LonLatGrid::from_vecs(vec![0.0, 90.0, 180.0, 270.0], vec![-45.0, 45.0])
    }

    #[test]
    fn shape_must_match_grid() {
        let data =
            MaskedArray::new(ndarray::Array2::<f64>::zeros((2, 3)).into_dyn(), dims(&["lat", "lon"]))
                .unwrap();
        let result = GridField::new(data, quarter_grid(), CoordinateNames::default());
        assert!(matches!(result, Err(ClimstatError::ShapeMismatch { .. })));
    }

    #[test]
    fn shift_longitude_reorders_data() {
        let data = MaskedArray::new(
            array![[0.0, 1.0, 2.0, f64::NAN], [10.0, 11.0, 12.0, 13.0]].into_dyn(),
            dims(&["lat", "lon"]),
        )
        .unwrap();
        let field = GridField::new(data, quarter_grid(), CoordinateNames::default()).unwrap();
        let shifted = field.shift_longitude(-180.0).unwrap();

        assert_eq!(shifted.grid().lon().to_vec(), vec![-180.0, -90.0, 0.0, 90.0]);
        assert_eq!(shifted.data().get(&[0, 0]), Some(2.0));
        assert_eq!(shifted.data().get(&[0, 1]), None);
        assert_eq!(shifted.data().get(&[0, 2]), Some(0.0));
        assert_eq!(shifted.data().get(&[1, 1]), Some(13.0));
        // Input is unchanged
        assert_eq!(field.grid().lon()[0], 0.0);
    }

    #[test]
    fn mask_region_handles_any_axis_order() {
        let data = MaskedArray::new(
            Array3::<f64>::ones((4, 3, 2)).into_dyn(),
            dims(&["lon", "time", "lat"]),
        )
        .unwrap();
        let field = GridField::new(data, quarter_grid(), CoordinateNames::default()).unwrap();
        let bounds = RegionBounds::new((80.0, 100.0), (0.0, 90.0));
        let masked = field.mask_region(&bounds, SelectHow::Inside).unwrap();

        assert_eq!(masked.data().count_valid(), 3);
        for t in 0..3 {
            assert_eq!(masked.data().get(&[1, t, 1]), Some(1.0));
            assert_eq!(masked.data().get(&[1, t, 0]), None);
            assert_eq!(masked.data().get(&[0, t, 1]), None);
        }

        let complement = field.mask_region(&bounds, SelectHow::Outside).unwrap();
        assert_eq!(complement.data().count_valid(), 21);
    }

    #[test]
    fn global_mean_of_constant_field() {
        let grid = LonLatGrid::regular(10.0, 10.0).unwrap();
        let data = MaskedArray::new(
            ndarray::Array2::from_elem(grid.shape(), 288.15).into_dyn(),
            dims(&["lat", "lon"]),
        )
        .unwrap();
        let field = GridField::new(data, grid, CoordinateNames::default()).unwrap();
        let mean = field.area_weighted_stat(Stat::Mean, None).unwrap();
        assert!(is_close!(mean.scalar().unwrap(), 288.15));
    }

    #[test]
    fn regional_mean_weights_by_area() {
        // Value equals latitude; a symmetric band averages to zero
        let grid = LonLatGrid::regular(10.0, 10.0).unwrap();
        let lat = grid.lat().to_owned();
        let values = ndarray::Array2::from_shape_fn(grid.shape(), |(i, _)| lat[i]);
        let data = MaskedArray::new(values.into_dyn(), dims(&["lat", "lon"])).unwrap();
        let field = GridField::new(data, grid, CoordinateNames::default()).unwrap();

        let band = RegionBounds::zonal_band(-30.0, 30.0);
        let mean = field.area_weighted_stat(Stat::Mean, Some(&band)).unwrap();
        assert!(mean.scalar().unwrap().abs() < 1e-9);

        let north = RegionBounds::zonal_band(0.0, 30.0);
        let mean = field.area_weighted_stat(Stat::Mean, Some(&north)).unwrap();
        // Low latitudes carry more area than an unweighted mean of 0..30 would give them
        assert!(mean.scalar().unwrap() < 15.0);
        assert!(mean.scalar().unwrap() > 10.0);
    }

    #[test]
    fn with_data_reattaches_coordinates() {
        let data = MaskedArray::new(
            ndarray::Array2::<f64>::zeros((2, 4)).into_dyn(),
            dims(&["lat", "lon"]),
        )
        .unwrap();
        let field = GridField::new(data, quarter_grid(), CoordinateNames::default()).unwrap();
        let derived = MaskedArray::new(
            ndarray::Array2::<f64>::ones((2, 4)).into_dyn(),
            dims(&["lat", "lon"]),
        )
        .unwrap();
        let attached = field.with_data(derived).unwrap();
        assert_eq!(attached.grid(), field.grid());
        assert_eq!(attached.data().count_valid(), 8);

        let wrong = MaskedArray::new(
            ndarray::Array2::<f64>::ones((4, 2)).into_dyn(),
            dims(&["lat", "lon"]),
        )
        .unwrap();
        assert!(field.with_data(wrong).is_err());
    }

    #[test]
    fn analyse_rejects_mismatched_coordinates() {
        let data = MaskedArray::new(
            ndarray::Array2::<f64>::ones((2, 4)).into_dyn(),
            dims(&["lat", "lon"]),
        )
        .unwrap();
        let field = GridField::new(data, quarter_grid(), CoordinateNames::default()).unwrap();
        let config = AnalysisConfig::from_toml_str(
            "[coordinates]\nlon = \"longitude\"\nlat = \"latitude\"\n",
        )
        .unwrap();
        assert!(matches!(
            field.analyse(&config),
            Err(ClimstatError::InvalidConfig(_))
        ));

        // Matching custom names are accepted
        let data = MaskedArray::new(
            ndarray::Array2::<f64>::ones((2, 4)).into_dyn(),
            dims(&["latitude", "longitude"]),
        )
        .unwrap();
        let names = CoordinateNames::new("longitude", "latitude");
        let field = GridField::new(data, quarter_grid(), names).unwrap();
        assert_eq!(field.analyse(&config).unwrap().scalar(), Some(1.0));
    }

    #[test]
    fn analyse_from_config() {
        let grid = LonLatGrid::regular(10.0, 10.0).unwrap();
        let lon = grid.lon().to_owned();
        // Value equals the longitude in the -180..180 convention
        let values = ndarray::Array2::from_shape_fn(grid.shape(), |(_, j)| {
            crate::longitude::wrap_longitude(lon[j], -180.0)
        });
        let data = MaskedArray::new(values.into_dyn(), dims(&["lat", "lon"])).unwrap();
        let field = GridField::new(data, grid, CoordinateNames::default()).unwrap();

        let config = AnalysisConfig::from_toml_str(
            r#"
[region]
bounds = { lon = [-20.0, 20.0], lat = [-30.0, 30.0] }
"#,
        )
        .unwrap();
        let mean = field.analyse(&config).unwrap();
        assert!(mean.scalar().unwrap().abs() < 1e-9);

        let mut config = config;
        config.reduction.stat = Stat::Sum;
        config.region.bounds = RegionBounds::new((170.0, -170.0), (-90.0, 90.0));
        let sum = field.analyse(&config).unwrap();
        // Columns at 170, -180 and -170 contribute 170 - 180 - 170 per unit area
        assert!(sum.scalar().unwrap() < 0.0);
    }
}
