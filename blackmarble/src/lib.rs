//! NASA Black Marble (VNP46) nighttime-lights tiles.
//!
//! This crate knows the provider's conventions: product IDs, how
//! dates map to archive directories, the fixed-offset file name
//! layout, the global tile grid, and the container layout of each
//! product generation. It turns a tile container into a north-up
//! WGS84 [Raster], and merges and crops rasters.
//!
//! # References
//!
//! 1. [Black Marble User Guide](https://viirsland.gsfc.nasa.gov/PDF/BlackMarbleUserGuide_v1.2_20220916.pdf)
//! 1. [LAADS DAAC archive](https://ladsweb.modaps.eosdis.nasa.gov/archive/allData/5000)

pub mod decode;
mod error;
pub mod file_name;
pub mod grid;
#[cfg(feature = "hdf5")]
pub mod h5;
pub mod mosaic;
pub mod period;
pub mod product;
pub mod raster;
pub mod region;

pub use crate::{
    decode::{Container, ContainerReader, Decoder, Field, Order},
    error::BlackMarbleError,
    file_name::FileName,
    grid::TileGrid,
    mosaic::mosaic,
    period::{ArchiveKey, Period},
    product::Product,
    raster::{Raster, NODATA},
    region::parse_region,
};
pub use geo;

/// Base floating point type used for all coordinates.
pub type C = f64;
