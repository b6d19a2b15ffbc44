use std::{path::PathBuf, time::Duration};

/// Published Black Marble tile grid polygons.
pub const TILE_GRID_URL: &str =
    "https://raw.githubusercontent.com/worldbank/blackmarbler/main/data/blackmarbletiles.geojson";

/// Root of the per-day file listings, `<root>/<product>/<year>/<day>.csv`.
pub const CATALOG_URL: &str =
    "https://raw.githubusercontent.com/ramarty/blackmarble_archive/main/data";

/// Root of the LAADS DAAC archive, `<root>/<product>/<year>/<day>/<file>`.
pub const ARCHIVE_URL: &str = "https://ladsweb.modaps.eosdis.nasa.gov/archive/allData/5000";

#[derive(Debug, Clone)]
pub struct Config {
    pub tile_grid_url: String,

    pub catalog_url: String,

    pub archive_url: String,

    /// Where to place downloaded tiles.
    ///
    /// A fresh temporary directory is used for each request when
    /// unset.
    pub scratch_dir: Option<PathBuf>,

    /// Maximum number of concurrent downloads.
    pub workers: usize,

    /// Pause after each catalog listing fetch, to go easy on the
    /// listing host.
    pub catalog_delay: Duration,

    /// Total attempts per HTTP request, including the first.
    pub attempts: u32,

    /// Delay before the first retry. Doubles on each further retry.
    pub retry_delay: Duration,

    pub connect_timeout: Duration,

    pub request_timeout: Duration,

    /// Draw download progress bars on stderr.
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tile_grid_url: TILE_GRID_URL.to_string(),
            catalog_url: CATALOG_URL.to_string(),
            archive_url: ARCHIVE_URL.to_string(),
            scratch_dir: None,
            workers: 4,
            catalog_delay: Duration::from_millis(100),
            attempts: 3,
            retry_delay: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(600),
            progress: false,
        }
    }
}
