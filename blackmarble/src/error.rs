use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlackMarbleError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("unknown product {0}")]
    Product(String),

    #[error("invalid date {date:?} for {product}")]
    Date { product: &'static str, date: String },

    #[error("invalid Black Marble file name {0}")]
    FileName(String),

    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("region must be a single polygon, {0}")]
    Region(String),

    #[error("tile grid feature {0} is missing a polygon or TileID")]
    GridFeature(usize),

    #[error("tile {0} is not in the tile grid")]
    UnknownTile(String),

    #[error("field {0} not found")]
    MissingField(String),

    #[error("field {field} has shape {shape:?}, expected {expected}")]
    FieldShape {
        field: String,
        shape: Vec<usize>,
        expected: &'static str,
    },

    #[error("rasters do not share a pixel grid: {0}")]
    GridMismatch(String),

    #[error("nothing to mosaic")]
    EmptyMosaic,

    #[error("region does not overlap the raster")]
    EmptyCrop,

    #[cfg(feature = "hdf5")]
    #[error("{0}")]
    Hdf5(#[from] hdf5::Error),
}
