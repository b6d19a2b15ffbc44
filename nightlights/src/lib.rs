//! Nighttime-lights rasters from NASA Black Marble, for a region and
//! a list of dates.
//!
//! ```no_run
//! use nightlights::{BearerToken, BlackMarble, Product, Request};
//!
//! # fn main() -> Result<(), nightlights::NightlightsError> {
//! let client = BlackMarble::builder().build()?;
//! let request = Request::builder()
//!     .region_geojson(&std::fs::read_to_string("region.geojson")?)?
//!     .product(Product::DailyV2)
//!     .dates(["2021-10-01", "2021-10-02"])
//!     .credential(BearerToken::new(std::env::var("BLACKMARBLE_TOKEN").unwrap_or_default()))
//!     .build()?;
//! for band in client.raster(&request)?.bands() {
//!     println!("{}: {:?}", band.name, band.raster.stats());
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
mod config;
mod credential;
pub mod download;
mod error;
pub mod fetch;
mod pipeline;
mod progress;

pub use crate::{
    config::{Config, ARCHIVE_URL, CATALOG_URL, TILE_GRID_URL},
    credential::BearerToken,
    error::NightlightsError,
    fetch::{CachedFetch, Fetch, HttpFetch},
    pipeline::{Band, BlackMarble, BlackMarbleBuilder, Output, Request, RequestBuilder},
};
pub use blackmarble::{self, Product, Raster};
