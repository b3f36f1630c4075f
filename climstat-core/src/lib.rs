//! Area-weighted statistics over longitude/latitude grids
//!
//! The regional pipeline is
//! [`normalize_longitude`] → [`compute_cell_area`] → [`build_region_mask`] →
//! [`area_weighted_stat`], usually driven through [`field::GridField`].
//! [`fdr_correct`] controls the false discovery rate of many simultaneous significance tests,
//! e.g. one per grid cell.

pub mod area;
pub mod array;
pub mod config;
pub mod errors;
pub mod fdr;
pub mod field;
pub mod grid;
pub mod longitude;
pub mod reduce;
pub mod region;

pub use area::{compute_cell_area, EARTH_RADIUS};
pub use array::MaskedArray;
pub use config::AnalysisConfig;
pub use errors::{ClimstatError, ClimstatResult};
pub use fdr::{fdr_correct, FdrResult};
pub use field::GridField;
pub use grid::{CoordinateNames, LonLatGrid};
pub use longitude::{normalize_longitude, LongitudeShift};
pub use reduce::{area_weighted_stat, Stat};
pub use region::{build_region_mask, RegionBounds, SelectHow};

pub type FloatValue = f64;
