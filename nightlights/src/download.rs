use crate::{catalog::CatalogEntry, fetch::Fetch, progress, BearerToken, NightlightsError};
use blackmarble::{FileName, Product};
use log::{debug, info, warn};
use rayon::{prelude::*, ThreadPool};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Directory one date's downloads land in.
///
/// The directory is emptied when created and removed when dropped.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Creates an empty `<root>/<product>`.
    pub fn new(root: &Path, product: Product) -> Result<Self, NightlightsError> {
        let path = root.join(product.id());
        if path.exists() {
            debug!("clearing stale scratch dir {path:?}");
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Local path for `file`, mirroring the archive layout.
    pub fn file_path(&self, file: &FileName) -> PathBuf {
        self.path.join(file.archive_path())
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            debug!("removing scratch dir {:?}: {e}", self.path);
        }
    }
}

/// Fetches archive files with a bounded worker pool.
pub struct Downloader<'a> {
    fetch: &'a dyn Fetch,
    base_url: &'a str,
    credential: &'a BearerToken,
    pool: &'a ThreadPool,
    progress: bool,
}

impl<'a> Downloader<'a> {
    pub fn new(
        fetch: &'a dyn Fetch,
        base_url: &'a str,
        credential: &'a BearerToken,
        pool: &'a ThreadPool,
    ) -> Self {
        Self {
            fetch,
            base_url: base_url.trim_end_matches('/'),
            credential,
            pool,
            progress: false,
        }
    }

    #[must_use]
    pub fn progress(mut self, visible: bool) -> Self {
        self.progress = visible;
        self
    }

    pub fn url(&self, file: &FileName) -> String {
        format!("{}/{}", self.base_url, file.archive_path())
    }

    /// Downloads one file into `scratch`, returning its local path.
    pub fn download(
        &self,
        entry: &CatalogEntry,
        scratch: &ScratchDir,
    ) -> Result<PathBuf, NightlightsError> {
        let dest = scratch.file_path(&entry.file);
        let url = self.url(&entry.file);
        let written = self
            .fetch
            .fetch_to(&url, Some(self.credential), &dest)
            .map_err(|e| NightlightsError::Download {
                file: entry.file.to_string(),
                source: Box::new(e),
            })?;
        match entry.size {
            Some(size) if size != written => {
                warn!("{} is {written} bytes, listing says {size}", entry.file);
            }
            _ => (),
        }
        Ok(dest)
    }

    /// Downloads every entry concurrently.
    ///
    /// Results are in the same order as `entries`. A failed download
    /// doesn't affect the others.
    pub fn download_all(
        &self,
        entries: &[CatalogEntry],
        scratch: &ScratchDir,
    ) -> Vec<Result<PathBuf, NightlightsError>> {
        info!("downloading {} files", entries.len());
        let pb = progress::bar(
            format!("Download {}", scratch.path().display()),
            entries.len() as u64,
            self.progress,
        );
        let results = self.pool.install(|| {
            entries
                .par_iter()
                .map(|entry| {
                    let result = self.download(entry, scratch);
                    pb.inc(1);
                    result
                })
                .collect()
        });
        pb.finish_and_clear();
        results
    }
}
