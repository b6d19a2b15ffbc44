//! Region + product + dates in, rasters out.

use crate::{
    catalog::Catalog,
    download::{Downloader, ScratchDir},
    fetch::{CachedFetch, Fetch, HttpFetch},
    BearerToken, Config, NightlightsError,
};
use blackmarble::{
    geo::geometry::Polygon, mosaic, parse_region, region::validate_region, ContainerReader,
    Decoder, Period, Product, Raster, TileGrid, C,
};
use chrono::Utc;
use log::{debug, info, warn};
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};
use std::{
    collections::{BTreeSet, HashSet},
    path::Path,
    sync::Arc,
    time::Instant,
};

/// One output layer.
#[derive(Debug, Clone)]
pub struct Band {
    /// Normalized date label, e.g. `2021-01-01`, `2021-01`, or `2021`.
    pub name: String,
    pub raster: Raster,
}

/// Result of a request, shaped by how many dates produced data.
#[derive(Debug, Clone)]
pub enum Output {
    /// No requested date produced data.
    Empty,
    Single(Band),
    /// Bands in request order.
    Stack(Vec<Band>),
}

impl Output {
    pub fn bands(&self) -> &[Band] {
        match self {
            Self::Empty => &[],
            Self::Single(band) => std::slice::from_ref(band),
            Self::Stack(bands) => bands,
        }
    }

    pub fn len(&self) -> usize {
        self.bands().len()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn into_bands(self) -> Vec<Band> {
        match self {
            Self::Empty => Vec::new(),
            Self::Single(band) => vec![band],
            Self::Stack(bands) => bands,
        }
    }
}

impl From<Vec<Band>> for Output {
    fn from(mut bands: Vec<Band>) -> Self {
        match bands.len() {
            0 => Self::Empty,
            1 => Self::Single(bands.remove(0)),
            _ => Self::Stack(bands),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    region: Polygon<C>,
    product: Product,
    dates: Vec<String>,
    credential: BearerToken,
    variable: Option<String>,
    quality_flags: Vec<u8>,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder {
            region: None,
            product: None,
            dates: Vec::new(),
            credential: None,
            variable: None,
            quality_flags: Vec::new(),
        }
    }

    pub fn region(&self) -> &Polygon<C> {
        &self.region
    }

    pub fn product(&self) -> Product {
        self.product
    }

    pub fn dates(&self) -> &[String] {
        &self.dates
    }

    /// Requested variable, or the product's default.
    pub fn variable(&self) -> &str {
        self.variable
            .as_deref()
            .unwrap_or_else(|| self.product.default_variable())
    }

    pub fn quality_flags(&self) -> &[u8] {
        &self.quality_flags
    }
}

pub struct RequestBuilder {
    region: Option<Polygon<C>>,
    product: Option<Product>,
    dates: Vec<String>,
    credential: Option<BearerToken>,
    variable: Option<String>,
    quality_flags: Vec<u8>,
}

impl RequestBuilder {
    pub fn region(mut self, region: Polygon<C>) -> Self {
        self.region = Some(region);
        self
    }

    /// Sets the region from GeoJSON text.
    pub fn region_geojson(self, text: &str) -> Result<Self, NightlightsError> {
        Ok(self.region(parse_region(text)?))
    }

    pub fn product(mut self, product: Product) -> Self {
        self.product = Some(product);
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.dates.push(date.into());
        self
    }

    pub fn dates<I, S>(mut self, dates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dates.extend(dates.into_iter().map(Into::into));
        self
    }

    pub fn credential(mut self, credential: BearerToken) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    /// Quality flag values whose pixels are masked out.
    pub fn quality_flags(mut self, flags: impl Into<Vec<u8>>) -> Self {
        self.quality_flags = flags.into();
        self
    }

    pub fn build(self) -> Result<Request, NightlightsError> {
        let region = self.region.ok_or(NightlightsError::Builder("region"))?;
        let product = self.product.ok_or(NightlightsError::Builder("product"))?;
        let credential = self
            .credential
            .ok_or(NightlightsError::Builder("credential"))?;
        if self.dates.is_empty() {
            return Err(NightlightsError::Builder("dates"));
        }
        Ok(Request {
            region,
            product,
            dates: self.dates,
            credential,
            variable: self.variable,
            quality_flags: self.quality_flags,
        })
    }
}

/// Black Marble client.
///
/// Holds the fetchers, the container reader, and the download worker
/// pool. Public resources (tile grid, catalog listings) are memoized
/// for the duration of one [BlackMarble::raster] call only, so every
/// call sees fresh listings.
pub struct BlackMarble {
    config: Config,
    public: Arc<dyn Fetch>,
    archive: Arc<dyn Fetch>,
    reader: Arc<dyn ContainerReader>,
    pool: ThreadPool,
}

impl BlackMarble {
    pub fn builder() -> BlackMarbleBuilder {
        BlackMarbleBuilder {
            config: Config::default(),
            public: None,
            archive: None,
            reader: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetches and parses the global tile grid.
    pub fn tile_grid(&self) -> Result<TileGrid, NightlightsError> {
        self.load_tile_grid(self.public.as_ref())
    }

    /// Produces one band per requested date.
    ///
    /// Invalid regions, unparseable dates and unusable credentials
    /// fail the whole request before any network access. After that,
    /// a date which fails at any stage is logged and left out of the
    /// output.
    pub fn raster(&self, request: &Request) -> Result<Output, NightlightsError> {
        validate_region(request.region())?;
        let periods = request
            .dates()
            .iter()
            .map(|date| Period::parse(request.product(), date))
            .collect::<Result<Vec<_>, _>>()?;
        request.credential.check(Utc::now())?;

        let mut seen = HashSet::new();
        let periods: Vec<Period> = periods
            .into_iter()
            .filter(|period| {
                let first = seen.insert(period.label());
                if !first {
                    debug!("ignoring repeated date {period}");
                }
                first
            })
            .collect();

        let public = CachedFetch::new(Arc::clone(&self.public));
        let grid = self.load_tile_grid(&public)?;
        let tile_ids = grid.intersecting(request.region());
        if tile_ids.is_empty() {
            warn!("region intersects no {} tiles", request.product());
        } else {
            info!("region intersects tiles {tile_ids:?}");
        }

        let temp;
        let scratch_root = match &self.config.scratch_dir {
            Some(dir) => dir.as_path(),
            None => {
                temp = tempfile::Builder::new().prefix("nightlights-").tempdir()?;
                temp.path()
            }
        };

        let mut bands = Vec::with_capacity(periods.len());
        for period in &periods {
            let now = Instant::now();
            let stage = Stage {
                public: &public,
                grid: &grid,
                tile_ids: &tile_ids,
                scratch_root,
            };
            match self.period_raster(request, period, &stage) {
                Ok(raster) => {
                    debug!("{period}; exec: {:?}", now.elapsed());
                    bands.push(Band {
                        name: period.label(),
                        raster,
                    });
                }
                Err(e) => warn!("skipping {period}: {e}"),
            }
        }
        Ok(Output::from(bands))
    }
}

/// Private API.
impl BlackMarble {
    fn load_tile_grid(&self, public: &dyn Fetch) -> Result<TileGrid, NightlightsError> {
        let body = public.fetch(&self.config.tile_grid_url, None)?;
        Ok(TileGrid::from_geojson(&String::from_utf8_lossy(&body))?)
    }

    fn period_raster(
        &self,
        request: &Request,
        period: &Period,
        stage: &Stage,
    ) -> Result<Raster, NightlightsError> {
        let Stage {
            public,
            grid,
            tile_ids,
            scratch_root,
        } = *stage;
        if tile_ids.is_empty() {
            return Err(NightlightsError::NotFound(format!("{period} tiles")));
        }

        let catalog = Catalog::new(
            public,
            &self.config.catalog_url,
            self.config.catalog_delay,
        );
        let entries = catalog.entries(period, tile_ids);
        if entries.is_empty() {
            return Err(NightlightsError::NotFound(format!("{period} files")));
        }

        let scratch = ScratchDir::new(scratch_root, request.product())?;
        let downloader = Downloader::new(
            self.archive.as_ref(),
            &self.config.archive_url,
            &request.credential,
            &self.pool,
        )
        .progress(self.config.progress);
        let paths = downloader
            .download_all(&entries, &scratch)
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        let decoder = Decoder::new(grid, request.variable()).quality_flags(request.quality_flags());
        let reader = self.reader.as_ref();
        let decoded = self.pool.install(|| {
            paths
                .par_iter()
                .map(|path| decoder.decode_path(reader, path))
                .collect::<Result<Vec<_>, _>>()
        })?;
        drop(scratch);

        let raster = mosaic(decoded)?;
        Ok(raster.crop(request.region())?)
    }
}

/// Per-call state shared by every date of a request.
struct Stage<'a> {
    /// Public fetcher, memoized for this call.
    public: &'a dyn Fetch,
    grid: &'a TileGrid,
    tile_ids: &'a BTreeSet<String>,
    scratch_root: &'a Path,
}

pub struct BlackMarbleBuilder {
    config: Config,
    public: Option<Arc<dyn Fetch>>,
    archive: Option<Arc<dyn Fetch>>,
    reader: Option<Arc<dyn ContainerReader>>,
}

impl BlackMarbleBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Use `fetch` for both public resources and archive downloads.
    pub fn fetcher(self, fetch: impl Fetch + 'static) -> Self {
        let fetch: Arc<dyn Fetch> = Arc::new(fetch);
        self.public_fetcher(fetch.clone()).archive_fetcher(fetch)
    }

    /// Fetcher for the tile grid and catalog listings.
    pub fn public_fetcher(mut self, fetch: impl Fetch + 'static) -> Self {
        self.public = Some(Arc::new(fetch));
        self
    }

    /// Fetcher for authenticated archive downloads.
    pub fn archive_fetcher(mut self, fetch: impl Fetch + 'static) -> Self {
        self.archive = Some(Arc::new(fetch));
        self
    }

    pub fn reader(mut self, reader: impl ContainerReader + 'static) -> Self {
        self.reader = Some(Arc::new(reader));
        self
    }

    pub fn build(self) -> Result<BlackMarble, NightlightsError> {
        let reader = match self.reader {
            Some(reader) => reader,
            None => default_reader()?,
        };
        let (public, archive) = match (self.public, self.archive) {
            (Some(public), Some(archive)) => (public, archive),
            (public, archive) => {
                let http: Arc<dyn Fetch> = Arc::new(HttpFetch::new(&self.config)?);
                (
                    public.unwrap_or_else(|| http.clone()),
                    archive.unwrap_or(http),
                )
            }
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.workers.max(1))
            .thread_name(|idx| format!("nightlights-{idx}"))
            .build()?;
        Ok(BlackMarble {
            config: self.config,
            public,
            archive,
            reader,
            pool,
        })
    }
}

#[cfg(feature = "hdf5")]
fn default_reader() -> Result<Arc<dyn ContainerReader>, NightlightsError> {
    Ok(Arc::new(blackmarble::h5::H5Reader))
}

#[cfg(not(feature = "hdf5"))]
fn default_reader() -> Result<Arc<dyn ContainerReader>, NightlightsError> {
    Err(NightlightsError::Builder("reader"))
}
