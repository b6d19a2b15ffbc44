use crate::{BlackMarbleError, C};
use geo::{
    geometry::{Coord, Polygon, Rect},
    BoundingRect, Intersects,
};

/// Sample value marking a pixel without a valid measurement.
pub const NODATA: f32 = f32::NAN;

/// A north-up WGS84 (EPSG:4326) raster.
#[derive(Debug, Clone)]
pub struct Raster {
    /// Outer edges of the raster, in degrees.
    extent: Rect<C>,

    /// Number of (rows, columns) in this raster.
    dimensions: (usize, usize),

    /// Samples in row-major order, northernmost row first.
    ///
    /// No-data is stored as NaN.
    samples: Box<[f32]>,
}

/// Returns `extent` with every edge rounded to the nearest whole
/// degree.
pub fn round_extent(extent: Rect<C>) -> Rect<C> {
    let round = |c: Coord<C>| Coord {
        x: c.x.round(),
        y: c.y.round(),
    };
    Rect::new(round(extent.min()), round(extent.max()))
}

/// Summary of a raster's valid samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub valid: usize,
    pub min: f32,
    pub mean: f64,
    pub max: f32,
}

impl Raster {
    pub fn new(
        extent: Rect<C>,
        dimensions: (usize, usize),
        samples: Vec<f32>,
    ) -> Result<Self, BlackMarbleError> {
        let (rows, cols) = dimensions;
        if rows == 0 || cols == 0 || samples.len() != rows * cols {
            return Err(BlackMarbleError::FieldShape {
                field: "raster".to_string(),
                shape: vec![samples.len()],
                expected: "rows * cols samples",
            });
        }
        if extent.width() <= 0.0 || extent.height() <= 0.0 {
            return Err(BlackMarbleError::GridMismatch(format!(
                "degenerate extent {extent:?}"
            )));
        }
        Ok(Self {
            extent,
            dimensions,
            samples: samples.into_boxed_slice(),
        })
    }

    pub fn extent(&self) -> Rect<C> {
        self.extent
    }

    /// Returns (rows, columns).
    pub fn dimensions(&self) -> (usize, usize) {
        self.dimensions
    }

    /// Returns the number of samples in this raster.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Pixel size in degrees.
    #[allow(clippy::cast_precision_loss)]
    pub fn resolution(&self) -> Coord<C> {
        let (rows, cols) = self.dimensions;
        Coord {
            x: self.extent.width() / cols as C,
            y: self.extent.height() / rows as C,
        }
    }

    /// Raw samples, with NaN for no-data.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Returns the sample at (row, column), or `None` if it is out of
    /// bounds or no-data.
    pub fn get(&self, (row, col): (usize, usize)) -> Option<f32> {
        let (rows, cols) = self.dimensions;
        if row < rows && col < cols {
            let sample = self.samples[row * cols + col];
            (!sample.is_nan()).then_some(sample)
        } else {
            None
        }
    }

    /// Returns the sample covering `coord`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn get_coord(&self, coord: Coord<C>) -> Option<f32> {
        let res = self.resolution();
        let col = (coord.x - self.extent.min().x) / res.x;
        let row = (self.extent.max().y - coord.y) / res.y;
        if col < 0.0 || row < 0.0 {
            return None;
        }
        self.get((row as usize, col as usize))
    }

    /// Geographic center of the pixel at (row, column).
    #[allow(clippy::cast_precision_loss)]
    pub fn pixel_center(&self, (row, col): (usize, usize)) -> Coord<C> {
        let res = self.resolution();
        Coord {
            x: self.extent.min().x + (col as C + 0.5) * res.x,
            y: self.extent.max().y - (row as C + 0.5) * res.y,
        }
    }

    /// Geographic footprint of the pixel at (row, column).
    #[allow(clippy::cast_precision_loss)]
    pub fn pixel_rect(&self, (row, col): (usize, usize)) -> Rect<C> {
        let res = self.resolution();
        let (west, north) = (self.extent.min().x, self.extent.max().y);
        Rect::new(
            Coord {
                x: west + col as C * res.x,
                y: north - (row + 1) as C * res.y,
            },
            Coord {
                x: west + (col + 1) as C * res.x,
                y: north - row as C * res.y,
            },
        )
    }

    /// Returns statistics over valid samples, `None` when every
    /// sample is no-data.
    pub fn stats(&self) -> Option<Stats> {
        let mut valid = 0;
        let mut sum = 0.0_f64;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &sample in self.samples.iter().filter(|s| !s.is_nan()) {
            valid += 1;
            sum += f64::from(sample);
            min = min.min(sample);
            max = max.max(sample);
        }
        #[allow(clippy::cast_precision_loss)]
        (valid > 0).then(|| Stats {
            valid,
            min,
            mean: sum / valid as f64,
            max,
        })
    }

    /// Crops this raster to `region`.
    ///
    /// The output extent is the region's bounding box snapped outward
    /// to this raster's pixel grid. Pixels which don't touch the
    /// polygon are set to no-data, so a region smaller than a pixel
    /// still keeps the pixel it falls in.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn crop(&self, region: &Polygon<C>) -> Result<Self, BlackMarbleError> {
        let bbox = region.bounding_rect().ok_or(BlackMarbleError::EmptyCrop)?;
        let (rows, cols) = self.dimensions;
        let res = self.resolution();
        let (west, north) = (self.extent.min().x, self.extent.max().y);
        let clamp = |v: C, hi: usize| v.max(0.0).min(hi as C) as usize;

        let col_start = clamp(((bbox.min().x - west) / res.x).floor(), cols);
        let col_end = clamp(((bbox.max().x - west) / res.x).ceil(), cols);
        let row_start = clamp(((north - bbox.max().y) / res.y).floor(), rows);
        let row_end = clamp(((north - bbox.min().y) / res.y).ceil(), rows);
        if col_start >= col_end || row_start >= row_end {
            return Err(BlackMarbleError::EmptyCrop);
        }

        let mut samples = Vec::with_capacity((row_end - row_start) * (col_end - col_start));
        for row in row_start..row_end {
            for col in col_start..col_end {
                let sample = if region.intersects(&self.pixel_rect((row, col))) {
                    self.samples[row * cols + col]
                } else {
                    NODATA
                };
                samples.push(sample);
            }
        }

        let extent = Rect::new(
            Coord {
                x: west + col_start as C * res.x,
                y: north - row_end as C * res.y,
            },
            Coord {
                x: west + col_end as C * res.x,
                y: north - row_start as C * res.y,
            },
        );
        Self::new(extent, (row_end - row_start, col_end - col_start), samples)
    }
}

#[cfg(test)]
mod tests {
    use super::{Raster, NODATA};
    use assert_approx_eq::assert_approx_eq;
    use geo::{
        geometry::{Coord, Rect},
        polygon,
    };

    /// 4x4 raster over (0,0)-(4,4) with sample value `row * 4 + col`.
    fn ramp() -> Raster {
        let samples = (0..16).map(|v| v as f32).collect();
        Raster::new(
            Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 4.0, y: 4.0 }),
            (4, 4),
            samples,
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_bad_shape() {
        let extent = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 });
        assert!(Raster::new(extent, (2, 2), vec![0.0; 3]).is_err());
        assert!(Raster::new(extent, (0, 2), vec![]).is_err());
    }

    #[test]
    fn test_indexing() {
        let raster = ramp();
        assert_eq!(raster.resolution(), Coord { x: 1.0, y: 1.0 });
        assert_eq!(raster.get((0, 0)), Some(0.0));
        assert_eq!(raster.get((3, 2)), Some(14.0));
        assert_eq!(raster.get((4, 0)), None);
        // Row 0 is the northernmost row.
        assert_eq!(raster.get_coord(Coord { x: 0.5, y: 3.5 }), Some(0.0));
        assert_eq!(raster.get_coord(Coord { x: 3.5, y: 0.5 }), Some(15.0));
        assert_eq!(raster.get_coord(Coord { x: -0.5, y: 0.5 }), None);
        assert_eq!(raster.pixel_center((0, 0)), Coord { x: 0.5, y: 3.5 });
    }

    #[test]
    fn test_stats_skip_nodata() {
        let extent = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 2.0, y: 1.0 });
        let raster = Raster::new(extent, (1, 2), vec![NODATA, 4.0]).unwrap();
        let stats = raster.stats().unwrap();
        assert_eq!(stats.valid, 1);
        assert_eq!(stats.min, 4.0);
        assert_approx_eq!(stats.mean, 4.0);
        let empty = Raster::new(extent, (1, 2), vec![NODATA, NODATA]).unwrap();
        assert!(empty.stats().is_none());
    }

    #[test]
    fn test_crop_to_bbox() {
        let raster = ramp();
        let region = polygon![
            (x: 1.2, y: 1.2),
            (x: 2.8, y: 1.2),
            (x: 2.8, y: 2.8),
            (x: 1.2, y: 2.8),
            (x: 1.2, y: 1.2),
        ];
        let cropped = raster.crop(&region).unwrap();
        assert_eq!(cropped.dimensions(), (2, 2));
        assert_eq!(
            cropped.extent(),
            Rect::new(Coord { x: 1.0, y: 1.0 }, Coord { x: 3.0, y: 3.0 })
        );
        assert_eq!(cropped.samples(), &[5.0, 6.0, 9.0, 10.0]);
    }

    #[test]
    fn test_crop_masks_outside_polygon() {
        let raster = ramp();
        // Triangle covering the south-west half of the raster.
        let region = polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 0.0, y: 4.0),
            (x: 0.0, y: 0.0),
        ];
        let cropped = raster.crop(&region).unwrap();
        assert_eq!(cropped.dimensions(), (4, 4));
        assert_eq!(cropped.get((3, 0)), Some(12.0));
        assert_eq!(cropped.get((0, 0)), Some(0.0));
        assert_eq!(cropped.get((0, 3)), None);
        assert_eq!(cropped.get((1, 3)), None);
        assert_eq!(cropped.get((0, 2)), None);
        // Pixels the hypotenuse passes through or touches are kept.
        assert_eq!(cropped.get((1, 2)), Some(6.0));
        assert_eq!(cropped.get((0, 1)), Some(1.0));
        assert_eq!(cropped.get((3, 3)), Some(15.0));
    }

    #[test]
    fn test_crop_region_inside_one_pixel() {
        let raster = ramp();
        let region = polygon![
            (x: 1.1, y: 2.1),
            (x: 1.4, y: 2.1),
            (x: 1.4, y: 2.4),
            (x: 1.1, y: 2.4),
            (x: 1.1, y: 2.1),
        ];
        let cropped = raster.crop(&region).unwrap();
        assert_eq!(cropped.dimensions(), (1, 1));
        assert_eq!(
            cropped.extent(),
            Rect::new(Coord { x: 1.0, y: 2.0 }, Coord { x: 2.0, y: 3.0 })
        );
        assert_eq!(cropped.get((0, 0)), Some(5.0));
        assert!(cropped.stats().is_some());
    }

    #[test]
    fn test_pixel_rect() {
        let raster = ramp();
        assert_eq!(
            raster.pixel_rect((0, 3)),
            Rect::new(Coord { x: 3.0, y: 3.0 }, Coord { x: 4.0, y: 4.0 })
        );
    }

    #[test]
    fn test_crop_disjoint() {
        let raster = ramp();
        let region = polygon![
            (x: 10.0, y: 10.0),
            (x: 11.0, y: 10.0),
            (x: 11.0, y: 11.0),
            (x: 10.0, y: 10.0),
        ];
        assert!(raster.crop(&region).is_err());
    }
}
