//! Combining overlapping tile rasters.

use crate::{
    raster::{Raster, NODATA},
    BlackMarbleError, C,
};
use geo::geometry::{Coord, Rect};
use log::debug;

/// Relative tolerance when comparing pixel sizes.
const RES_EPSILON: C = 1e-9;

/// Tolerance, in pixels, when checking that rasters share a grid.
const ALIGN_EPSILON: C = 1e-6;

/// Merges `rasters` into a single raster covering their union.
///
/// Where rasters overlap the output holds the pixel-wise maximum of
/// their valid samples; no-data never wins over a valid sample. A
/// single raster is returned unchanged.
///
/// Every raster must share one pixel size and grid alignment.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn mosaic(rasters: Vec<Raster>) -> Result<Raster, BlackMarbleError> {
    let mut rasters = rasters.into_iter();
    let first = rasters.next().ok_or(BlackMarbleError::EmptyMosaic)?;
    let rest: Vec<Raster> = rasters.collect();
    if rest.is_empty() {
        return Ok(first);
    }

    let res = first.resolution();
    let extent = rest
        .iter()
        .fold(first.extent(), |acc, raster| union(acc, raster.extent()));
    let (west, north) = (extent.min().x, extent.max().y);

    for raster in std::iter::once(&first).chain(&rest) {
        check_grid(res, west, north, raster)?;
    }

    let cols = (extent.width() / res.x).round() as usize;
    let rows = (extent.height() / res.y).round() as usize;
    debug!("mosaicking {} rasters into {rows}x{cols}", rest.len() + 1);

    let mut samples = vec![NODATA; rows * cols];
    for raster in std::iter::once(&first).chain(&rest) {
        let (src_rows, src_cols) = raster.dimensions();
        let col_offset = ((raster.extent().min().x - west) / res.x).round() as usize;
        let row_offset = ((north - raster.extent().max().y) / res.y).round() as usize;
        for row in 0..src_rows {
            let src = &raster.samples()[row * src_cols..(row + 1) * src_cols];
            let start = (row + row_offset) * cols + col_offset;
            for (dst, &sample) in samples[start..start + src_cols].iter_mut().zip(src) {
                // `f32::max` returns the other operand when one is NaN.
                *dst = dst.max(sample);
            }
        }
    }

    Raster::new(extent, (rows, cols), samples)
}

fn union(a: Rect<C>, b: Rect<C>) -> Rect<C> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

fn check_grid(res: Coord<C>, west: C, north: C, raster: &Raster) -> Result<(), BlackMarbleError> {
    let other = raster.resolution();
    let same = |a: C, b: C| ((a - b) / a).abs() <= RES_EPSILON;
    if !same(res.x, other.x) || !same(res.y, other.y) {
        return Err(BlackMarbleError::GridMismatch(format!(
            "pixel size {other:?} differs from {res:?}"
        )));
    }
    let aligned = |offset: C| (offset - offset.round()).abs() <= ALIGN_EPSILON;
    let col_offset = (raster.extent().min().x - west) / res.x;
    let row_offset = (north - raster.extent().max().y) / res.y;
    if !aligned(col_offset) || !aligned(row_offset) {
        return Err(BlackMarbleError::GridMismatch(format!(
            "raster at {:?} is offset by a fraction of a pixel",
            raster.extent().min()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::mosaic;
    use crate::raster::{Raster, NODATA};
    use geo::geometry::{Coord, Rect};

    fn raster(west: f64, south: f64, dimensions: (usize, usize), samples: Vec<f32>) -> Raster {
        let (rows, cols) = dimensions;
        Raster::new(
            Rect::new(
                Coord { x: west, y: south },
                Coord {
                    x: west + cols as f64,
                    y: south + rows as f64,
                },
            ),
            dimensions,
            samples,
        )
        .unwrap()
    }

    #[test]
    fn test_single_passthrough() {
        let a = raster(0.0, 0.0, (1, 2), vec![1.0, NODATA]);
        let out = mosaic(vec![a]).unwrap();
        assert_eq!(out.dimensions(), (1, 2));
        assert_eq!(out.get((0, 0)), Some(1.0));
        assert_eq!(out.get((0, 1)), None);
    }

    #[test]
    fn test_max_prefers_valid() {
        let a = raster(0.0, 0.0, (1, 2), vec![10.0, 3.0]);
        let b = raster(0.0, 0.0, (1, 2), vec![NODATA, 7.0]);
        let out = mosaic(vec![a, b]).unwrap();
        assert_eq!(out.get((0, 0)), Some(10.0));
        assert_eq!(out.get((0, 1)), Some(7.0));

        let a = raster(0.0, 0.0, (1, 1), vec![NODATA]);
        let b = raster(0.0, 0.0, (1, 1), vec![10.0]);
        assert_eq!(mosaic(vec![a, b]).unwrap().get((0, 0)), Some(10.0));
    }

    #[test]
    fn test_adjacent_tiles() {
        // West tile then east tile, each 2x2.
        let a = raster(0.0, 0.0, (2, 2), vec![1.0, 2.0, 3.0, 4.0]);
        let b = raster(2.0, 0.0, (2, 2), vec![5.0, 6.0, 7.0, 8.0]);
        let out = mosaic(vec![a, b]).unwrap();
        assert_eq!(out.dimensions(), (2, 4));
        assert_eq!(
            out.extent(),
            Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 4.0, y: 2.0 })
        );
        assert_eq!(out.samples(), &[1.0, 2.0, 5.0, 6.0, 3.0, 4.0, 7.0, 8.0]);
    }

    #[test]
    fn test_gaps_are_nodata() {
        // Diagonal neighbours leave two empty quadrants.
        let a = raster(0.0, 1.0, (1, 1), vec![1.0]);
        let b = raster(1.0, 0.0, (1, 1), vec![2.0]);
        let out = mosaic(vec![a, b]).unwrap();
        assert_eq!(out.dimensions(), (2, 2));
        assert_eq!(out.get((0, 0)), Some(1.0));
        assert_eq!(out.get((0, 1)), None);
        assert_eq!(out.get((1, 0)), None);
        assert_eq!(out.get((1, 1)), Some(2.0));
    }

    #[test]
    fn test_grid_mismatch() {
        let a = raster(0.0, 0.0, (2, 2), vec![1.0; 4]);
        let coarse = Raster::new(
            Rect::new(Coord { x: 2.0, y: 0.0 }, Coord { x: 4.0, y: 2.0 }),
            (1, 1),
            vec![1.0],
        )
        .unwrap();
        assert!(mosaic(vec![a.clone(), coarse]).is_err());

        let shifted = raster(2.5, 0.0, (2, 2), vec![1.0; 4]);
        assert!(mosaic(vec![a.clone(), shifted.clone()]).is_err());
        assert!(mosaic(vec![shifted, a]).is_err());
    }

    #[test]
    fn test_misaligned_first_raster() {
        let wide = raster(0.5, 0.0, (1, 2), vec![1.0, 2.0]);
        let unit = raster(0.0, 0.0, (1, 1), vec![9.0]);
        assert!(mosaic(vec![unit.clone(), wide.clone()]).is_err());
        assert!(mosaic(vec![wide, unit]).is_err());
    }

    #[test]
    fn test_empty() {
        assert!(mosaic(Vec::new()).is_err());
    }
}
