use blackmarble::BlackMarbleError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NightlightsError {
    #[error("missing required parameter '{0}'")]
    Builder(&'static str),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    BlackMarble(#[from] BlackMarbleError),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("GET {url} returned {status}")]
    Status { url: String, status: u16 },

    #[error("{0} not found")]
    NotFound(String),

    #[error("malformed catalog listing: {0}")]
    Csv(#[from] csv::Error),

    #[error("bearer token {0}")]
    Credential(&'static str),

    #[error("failed to download {file}: {source}")]
    Download {
        file: String,
        source: Box<NightlightsError>,
    },

    #[error("{0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl NightlightsError {
    /// Whether retrying the request that produced this error may
    /// succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_builder() && !e.is_redirect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Io(_) => true,
            _ => false,
        }
    }
}
