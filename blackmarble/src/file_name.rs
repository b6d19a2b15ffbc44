//! Black Marble file name layout.
//!
//! File names follow the provider's fixed-offset convention, e.g.
//! `VNP46A2.A2021001.h20v08.001.2021032222012.h5`:
//!
//! | chars  | meaning        |
//! |--------|----------------|
//! | 1-7    | product ID     |
//! | 10-13  | year           |
//! | 14-16  | day code       |
//!
//! and embed the tile ID (`hNNvNN`) further along.

use crate::{period::ArchiveKey, BlackMarbleError, Product};
use regex::Regex;
use std::{fmt, path::Path, sync::OnceLock};

fn tile_id_regex() -> &'static Regex {
    static TILE_ID: OnceLock<Regex> = OnceLock::new();
    TILE_ID.get_or_init(|| Regex::new(r"h\d{2}v\d{2}").expect("valid tile ID regex"))
}

/// Returns the first tile ID (`hNNvNN`) embedded in `s`, if any.
pub fn find_tile_id(s: &str) -> Option<&str> {
    tile_id_regex().find(s).map(|m| m.as_str())
}

/// A parsed Black Marble file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileName {
    name: String,
    product: Product,
    key: ArchiveKey,
    tile_id: String,
}

impl FileName {
    pub fn parse(name: &str) -> Result<Self, BlackMarbleError> {
        let mk_err = || BlackMarbleError::FileName(name.to_string());
        if !name.is_ascii() || name.len() < 16 || &name[7..9] != ".A" {
            return Err(mk_err());
        }
        let product = name[0..7].parse::<Product>().map_err(|_| mk_err())?;
        let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        let (year, day) = (&name[9..13], &name[13..16]);
        if !digits(year) || !digits(day) {
            return Err(mk_err());
        }
        let year = year.parse::<i32>().map_err(|_| mk_err())?;
        let tile_id = find_tile_id(&name[16..]).ok_or_else(mk_err)?.to_string();
        Ok(Self {
            name: name.to_string(),
            product,
            key: ArchiveKey {
                year,
                day: day.to_string(),
            },
            tile_id,
        })
    }

    /// Parses the file name component of `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BlackMarbleError> {
        let name = path
            .as_ref()
            .file_name()
            .and_then(std::ffi::OsStr::to_str)
            .ok_or_else(|| BlackMarbleError::FileName(path.as_ref().display().to_string()))?;
        Self::parse(name)
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn product(&self) -> Product {
        self.product
    }

    /// Archive directory the file lives in.
    pub fn key(&self) -> &ArchiveKey {
        &self.key
    }

    pub fn tile_id(&self) -> &str {
        &self.tile_id
    }

    /// Path of this file relative to an archive or scratch root:
    /// `<product>/<year>/<day>/<name>`.
    pub fn archive_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.product.id(),
            self.key.year,
            self.key.day,
            self.name
        )
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
