//! Converting one tile container into a georeferenced [Raster].
//!
//! Tiles are HDF-EOS5 files. Daily products keep their data fields
//! under `VNP_Grid_DNB` and carry no coordinates, so the extent comes
//! from the tile grid. Monthly and annual composites keep theirs
//! under `VIIRS_Grid_DNB_2d` alongside `lat`/`lon` arrays.

use crate::{
    file_name::FileName,
    grid::TileGrid,
    product::{is_radiance, Generation},
    raster::{round_extent, Raster, NODATA},
    BlackMarbleError, C,
};
use geo::geometry::{Coord, Rect};
use log::debug;
use std::path::Path;

/// Literal value radiance fields use for saturated or invalid
/// samples, independent of their declared fill value.
pub const SATURATED: f64 = 65535.0;

/// Storage order of a [Field]'s values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// `values[i * shape[1] + j]` is element `(i, j)`.
    RowMajor,
    /// `values[i + j * shape[0]]` is element `(i, j)`.
    ColumnMajor,
}

/// A numeric field read out of a container.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Extent of each dimension. For grids, `(rows, columns)` with
    /// row 0 northernmost.
    pub shape: Vec<usize>,
    pub order: Order,
    pub values: Vec<f64>,
    /// The field's declared `_FillValue` attribute.
    pub fill_value: Option<f64>,
}

impl Field {
    pub fn grid(dimensions: (usize, usize), order: Order, values: Vec<f64>) -> Self {
        Self {
            shape: vec![dimensions.0, dimensions.1],
            order,
            values,
            fill_value: None,
        }
    }

    pub fn vector(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            order: Order::RowMajor,
            values,
            fill_value: None,
        }
    }

    #[must_use]
    pub fn with_fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = Some(fill_value);
        self
    }

    /// Returns (rows, columns) for a 2D field.
    fn dimensions(&self, name: &str) -> Result<(usize, usize), BlackMarbleError> {
        match self.shape[..] {
            [rows, cols] if rows * cols == self.values.len() && rows > 0 && cols > 0 => {
                Ok((rows, cols))
            }
            _ => Err(BlackMarbleError::FieldShape {
                field: name.to_string(),
                shape: self.shape.clone(),
                expected: "a non-empty 2D grid",
            }),
        }
    }

    /// Returns this field's values in row-major order, transposing
    /// column-major storage.
    fn into_row_major(self, (rows, cols): (usize, usize)) -> Vec<f64> {
        match self.order {
            Order::RowMajor => self.values,
            Order::ColumnMajor => {
                let mut out = Vec::with_capacity(self.values.len());
                for row in 0..rows {
                    for col in 0..cols {
                        out.push(self.values[row + col * rows]);
                    }
                }
                out
            }
        }
    }
}

/// Read access to a tile container's fields.
pub trait Container {
    /// Returns the field at `path`, or `None` if there's no such
    /// field.
    fn field(&self, path: &str) -> Result<Option<Field>, BlackMarbleError>;
}

/// Opens containers from files on disk.
pub trait ContainerReader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn Container>, BlackMarbleError>;
}

/// Decodes tiles of one variable into rasters.
pub struct Decoder<'a> {
    grid: &'a TileGrid,
    variable: &'a str,
    quality_flags: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(grid: &'a TileGrid, variable: &'a str) -> Self {
        Self {
            grid,
            variable,
            quality_flags: &[],
        }
    }

    /// Also mask pixels whose quality flag is one of `flags`.
    #[must_use]
    pub fn quality_flags(mut self, flags: &'a [u8]) -> Self {
        self.quality_flags = flags;
        self
    }

    /// Decodes the tile at `path` using `reader`.
    pub fn decode_path(
        &self,
        reader: &dyn ContainerReader,
        path: &Path,
    ) -> Result<Raster, BlackMarbleError> {
        let file = FileName::from_path(path)?;
        let container = reader.open(path)?;
        self.decode(&file, container.as_ref())
    }

    /// Decodes `container`, which holds the tile named `file`.
    pub fn decode(
        &self,
        file: &FileName,
        container: &dyn Container,
    ) -> Result<Raster, BlackMarbleError> {
        let product = file.product();
        let generation = product.generation();
        let path = generation.field_path(self.variable);
        debug!("decoding {path} from {file}");

        let field = container
            .field(&path)?
            .ok_or_else(|| BlackMarbleError::MissingField(path.clone()))?;
        let dimensions = field.dimensions(&path)?;
        let fill_value = field.fill_value;
        let values = field.into_row_major(dimensions);

        let extent = match generation {
            Generation::Tiled => self.grid.bounds(file.tile_id())?,
            Generation::LatLon => {
                let lat = required(container, &generation.field_path("lat"))?;
                let lon = required(container, &generation.field_path("lon"))?;
                lat_lon_extent(&lat.values, &lon.values)?
            }
        };

        let radiance = is_radiance(self.variable);
        #[allow(clippy::cast_possible_truncation)]
        let mut samples: Vec<f32> = values
            .into_iter()
            .map(|v| {
                if Some(v) == fill_value || (radiance && v == SATURATED) {
                    NODATA
                } else {
                    v as f32
                }
            })
            .collect();

        if !self.quality_flags.is_empty() {
            self.mask_quality(file, container, dimensions, &mut samples)?;
        }

        Raster::new(extent, dimensions, samples)
    }
}

/// Private API.
impl<'a> Decoder<'a> {
    fn mask_quality(
        &self,
        file: &FileName,
        container: &dyn Container,
        dimensions: (usize, usize),
        samples: &mut [f32],
    ) -> Result<(), BlackMarbleError> {
        let product = file.product();
        let Some(name) = product.quality_field(self.variable) else {
            debug!("{product} has no quality flags, ignoring");
            return Ok(());
        };
        let path = product.generation().field_path(&name);
        let Some(flags) = container.field(&path)? else {
            debug!("{file} has no {name} field, ignoring quality flags");
            return Ok(());
        };
        if flags.dimensions(&path)? != dimensions {
            return Err(BlackMarbleError::FieldShape {
                field: path,
                shape: flags.shape,
                expected: "the same shape as the data field",
            });
        }
        let masked: Vec<f64> = self.quality_flags.iter().map(|&f| f64::from(f)).collect();
        for (sample, flag) in samples.iter_mut().zip(flags.into_row_major(dimensions)) {
            if masked.contains(&flag) {
                *sample = NODATA;
            }
        }
        Ok(())
    }
}

fn required(container: &dyn Container, path: &str) -> Result<Field, BlackMarbleError> {
    container
        .field(path)?
        .ok_or_else(|| BlackMarbleError::MissingField(path.to_string()))
}

/// Extent spanned by per-pixel latitude and longitude arrays, rounded
/// to whole degrees.
fn lat_lon_extent(lat: &[f64], lon: &[f64]) -> Result<Rect<C>, BlackMarbleError> {
    let min_max = |values: &[f64]| {
        values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    };
    match (min_max(lat), min_max(lon)) {
        (Some((south, north)), Some((west, east))) => Ok(round_extent(Rect::new(
            Coord { x: west, y: south },
            Coord { x: east, y: north },
        ))),
        _ => Err(BlackMarbleError::MissingField("lat/lon".to_string())),
    }
}
