//! Area-weighted statistics over longitude/latitude grids
//!
//! The algorithms live in [`climstat_core`] and are re-exported here. Building with the
//! `python` feature adds the `climstat._lib` extension module.

pub use climstat_core::*;

#[cfg(feature = "python")]
mod python;
