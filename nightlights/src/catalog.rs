//! Per-day archive listings.
//!
//! The archive's directory listings are mirrored as one CSV per
//! `(product, year, day)` with at least a `name` column.

use crate::{fetch::Fetch, NightlightsError};
use blackmarble::{grid::matches_tiles, ArchiveKey, FileName, Period, Product};
use log::{debug, warn};
use serde::Deserialize;
use std::{collections::BTreeSet, thread, time::Duration};

#[derive(Debug, Deserialize)]
struct Record {
    name: String,
    #[serde(default)]
    size: Option<u64>,
}

/// One remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub file: FileName,
    /// Archive directory whose listing named this file.
    pub key: ArchiveKey,
    pub size: Option<u64>,
}

/// Parses a listing CSV fetched for `key`.
///
/// Rows whose name isn't a Black Marble file name are skipped.
pub fn parse_listing(body: &[u8], key: &ArchiveKey) -> Result<Vec<CatalogEntry>, NightlightsError> {
    let mut rdr = csv::Reader::from_reader(body);
    let mut entries = Vec::new();
    for record in rdr.deserialize() {
        let Record { name, size } = record?;
        match FileName::parse(name.trim()) {
            Ok(file) => entries.push(CatalogEntry {
                file,
                key: key.clone(),
                size,
            }),
            Err(e) => debug!("skipping listing row: {e}"),
        }
    }
    Ok(entries)
}

pub struct Catalog<'a> {
    fetch: &'a dyn Fetch,
    base_url: &'a str,
    delay: Duration,
}

impl<'a> Catalog<'a> {
    pub fn new(fetch: &'a dyn Fetch, base_url: &'a str, delay: Duration) -> Self {
        Self {
            fetch,
            base_url: base_url.trim_end_matches('/'),
            delay,
        }
    }

    pub fn listing_url(&self, product: Product, key: &ArchiveKey) -> String {
        format!(
            "{}/{}/{}/{}.csv",
            self.base_url,
            product.id(),
            key.year,
            key.day
        )
    }

    /// Fetches and parses one listing.
    pub fn read(
        &self,
        product: Product,
        key: &ArchiveKey,
    ) -> Result<Vec<CatalogEntry>, NightlightsError> {
        let url = self.listing_url(product, key);
        let body = self.fetch.fetch(&url, None);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        parse_listing(&body?, key)
    }

    /// Returns the files of `period` covering any of `tile_ids`.
    ///
    /// Listings that can't be read are logged and contribute nothing.
    /// For monthly products only one of a month's two day codes
    /// exists in a given year, so a single failed listing is only
    /// worth a warning when every listing for the period failed.
    pub fn entries(&self, period: &Period, tile_ids: &BTreeSet<String>) -> Vec<CatalogEntry> {
        let product = period.product();
        let keys = period.archive_keys();
        let mut failures = 0;
        let mut entries: Vec<CatalogEntry> = Vec::new();
        for key in &keys {
            match self.read(product, key) {
                Ok(listing) => entries.extend(listing),
                Err(e) if keys.len() == 1 => {
                    warn!("no {product} listing for {} ({key}): {e}", period.label());
                    failures += 1;
                }
                Err(e) => {
                    debug!("no {product} listing for {key}: {e}");
                    failures += 1;
                }
            }
        }
        if keys.len() > 1 && failures == keys.len() {
            warn!("no {product} listing for {}", period.label());
        }

        let mut seen = BTreeSet::new();
        entries.retain(|entry| {
            entry.file.product() == product
                && period.covers(entry.file.key())
                && matches_tiles(entry.file.as_str(), tile_ids)
                && seen.insert(entry.file.as_str().to_string())
        });
        debug!(
            "{} {product} files for {} intersect the region",
            entries.len(),
            period.label()
        );
        entries
    }
}
