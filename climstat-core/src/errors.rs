use thiserror::Error;

/// Error type for invalid grids, bounds and statistical inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClimstatError {
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),
    #[error("Insufficient grid: the {axis} axis has {len} point(s), at least 2 are needed to infer cell edges")]
    InsufficientGrid { axis: String, len: usize },
    #[error("select_how must be \"inside\" or \"outside\", got \"{0}\"")]
    InvalidSelection(String),
    #[error("stat must be \"mean\" or \"sum\", got \"{0}\"")]
    InvalidStat(String),
    #[error("alpha should be in range 0.0 < alpha < 1.0, got {0}")]
    InvalidAlpha(f64),
    #[error("No p-values were supplied")]
    EmptyInput,
    #[error("p-value at index {index} is outside [0, 1]: {value}")]
    InvalidPValue { index: usize, value: f64 },
    #[error("Dimension \"{name}\" not found. Available dimensions: {available:?}")]
    UnknownDimension {
        name: String,
        available: Vec<String>,
    },
    #[error("Shape mismatch for {what}: expected {expected:?}, got {found:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("Cell area at (lat={lat_index}, lon={lon_index}) must be finite and non-negative, got {value}")]
    InvalidArea {
        lat_index: usize,
        lon_index: usize,
        value: f64,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience type for `Result<T, ClimstatError>`.
pub type ClimstatResult<T> = Result<T, ClimstatError>;
