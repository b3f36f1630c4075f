//! Analysis configuration
//!
//! Every knob of the pipeline lives in a parameter struct with a documented default, so a
//! configuration file only needs to name what differs from the defaults:
//!
//! ```toml
//! [region]
//! bounds = { lon = [170.0, -170.0], lat = [-10.0, 10.0] }
//! select_how = "outside"
//!
//! [fdr]
//! alpha = 0.05
//! ```

use crate::errors::{ClimstatError, ClimstatResult};
use crate::fdr::{fdr_correct, fdr_correct_array, FdrResult, DEFAULT_ALPHA};
use crate::grid::CoordinateNames;
use crate::longitude::{check_longitude, DEFAULT_LON_MIN};
use crate::reduce::Stat;
use crate::region::{RegionBounds, SelectHow};
use crate::FloatValue;
use ndarray::{Array, ArrayView, Dimension};
use serde::{Deserialize, Serialize};

/// Region selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RegionParameters {
    /// Keep the cells inside or outside `bounds`
    /// default: inside
    pub select_how: SelectHow,

    /// Box to select
    /// unit: degrees
    /// default: lon = (-180.0, 180.0), lat = (-90.0, 90.0)
    pub bounds: RegionBounds,
}

/// Longitude convention applied before masking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongitudeParameters {
    /// Lower edge of the longitude range, longitudes end up in `[lon_min, lon_min + 360)`
    /// unit: degrees
    /// default: -180.0
    pub lon_min: FloatValue,
}

impl Default for LongitudeParameters {
    fn default() -> Self {
        Self {
            lon_min: DEFAULT_LON_MIN,
        }
    }
}

/// False discovery rate control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FdrParameters {
    /// Significance level, must satisfy `0 < alpha < 1`
    /// unit: dimensionless
    /// default: 0.10
    pub alpha: FloatValue,
}

impl Default for FdrParameters {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl FdrParameters {
    /// [`fdr_correct`] at the configured `alpha`
    pub fn apply(&self, p_values: &[FloatValue]) -> ClimstatResult<FdrResult> {
        fdr_correct(p_values, self.alpha)
    }

    /// [`fdr_correct_array`] at the configured `alpha`
    pub fn apply_array<D: Dimension>(
        &self,
        p_values: ArrayView<'_, FloatValue, D>,
    ) -> ClimstatResult<(Array<bool, D>, FdrResult)> {
        fdr_correct_array(p_values, self.alpha)
    }
}

/// Area-weighted reduction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReductionParameters {
    /// Statistic to compute
    /// default: mean
    pub stat: Stat,
}

/// Complete configuration of a regional analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    pub coordinates: CoordinateNames,
    pub longitude: LongitudeParameters,
    pub region: RegionParameters,
    pub reduction: ReductionParameters,
    pub fdr: FdrParameters,
}

impl AnalysisConfig {
    /// Parse and validate a TOML document; missing tables and keys take their defaults
    pub fn from_toml_str(s: &str) -> ClimstatResult<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| ClimstatError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ClimstatResult<String> {
        toml::to_string(self).map_err(|e| ClimstatError::InvalidConfig(e.to_string()))
    }

    /// Check the values that deserialisation alone cannot
    ///
    /// # Errors
    ///
    /// * [`ClimstatError::InvalidAlpha`] unless `0 < alpha < 1`
    /// * [`ClimstatError::InvalidBounds`] for unusable region bounds or `lon_min`
    /// * [`ClimstatError::InvalidConfig`] if a coordinate name is empty or both are the same
    pub fn validate(&self) -> ClimstatResult<()> {
        let alpha = self.fdr.alpha;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ClimstatError::InvalidAlpha(alpha));
        }
        check_longitude(self.longitude.lon_min, "lon_min")?;
        self.region.bounds.validate()?;

        let names = &self.coordinates;
        if names.lon.is_empty() || names.lat.is_empty() {
            return Err(ClimstatError::InvalidConfig(
                "coordinate names must not be empty".to_string(),
            ));
        }
        if names.lon == names.lat {
            return Err(ClimstatError::InvalidConfig(format!(
                "longitude and latitude share the name \"{}\"",
                names.lon
            )));
        }
        Ok(())
    }
}
