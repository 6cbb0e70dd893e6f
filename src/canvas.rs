use kurbo::Point;

use crate::composite::{self, Resampling, Rgba8};
use crate::decode::DecodedTile;
use crate::error::{PrintError, PrintResult};
use crate::geometry::PageGeometry;
use crate::model::Extent;

/// The target raster for one print job: straight RGBA8, single writer.
/// Created from the resolved geometry, mutated layer by layer, consumed once
/// by the output assembler.
#[derive(Clone, Debug)]
pub struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgba8) -> Self {
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * 4);
        for _ in 0..(width as usize) * (height as usize) {
            data.extend_from_slice(&background);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba8 {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Blend one tile into the canvas. `footprint` is the tile's world-space
    /// extent; its corners are mapped through the page affine and rounded,
    /// so two tiles sharing an edge in world space land on the exact same
    /// destination column/row boundary: no gap, no double-write.
    pub fn draw_tile(
        &mut self,
        geometry: &PageGeometry,
        footprint: Extent,
        tile: &DecodedTile,
        opacity: f32,
        resampling: Resampling,
    ) -> PrintResult<()> {
        if tile.width == 0 || tile.height == 0 {
            return Err(PrintError::compositing("tile with zero dimension"));
        }

        let top_left = geometry.world_to_pixel(Point::new(footprint.min_x, footprint.max_y));
        let bottom_right = geometry.world_to_pixel(Point::new(footprint.max_x, footprint.min_y));
        let x0 = top_left.x.round() as i64;
        let y0 = top_left.y.round() as i64;
        let x1 = bottom_right.x.round() as i64;
        let y1 = bottom_right.y.round() as i64;

        // rounding moves each edge by at most half a pixel, so a tile the
        // grid legitimately emits can round to an empty rect (overlap under
        // half a pixel) or land flush against a canvas edge. Those are
        // no-ops. A rect strictly beyond the edge cannot come from a tile
        // that intersects the page extent; that means the index or affine
        // math is broken.
        if x1 < 0 || y1 < 0 || x0 > i64::from(self.width) || y0 > i64::from(self.height) {
            return Err(PrintError::compositing(format!(
                "destination rect [{x0},{y0})..({x1},{y1}) entirely outside {}x{} canvas",
                self.width, self.height,
            )));
        }
        if x1 <= x0 || y1 <= y0 {
            return Ok(());
        }

        // visible part of the destination rect
        let cx0 = x0.max(0);
        let cy0 = y0.max(0);
        let cx1 = x1.min(i64::from(self.width));
        let cy1 = y1.min(i64::from(self.height));
        if cx0 >= cx1 || cy0 >= cy1 {
            return Ok(());
        }

        // tile pixels per destination pixel; 1.0 when the pyramid level
        // matches the target resolution exactly
        let step_x = f64::from(tile.width) / (x1 - x0) as f64;
        let step_y = f64::from(tile.height) / (y1 - y0) as f64;

        for py in cy0..cy1 {
            let sy = ((py - y0) as f64 + 0.5) * step_y;
            for px in cx0..cx1 {
                let sx = ((px - x0) as f64 + 0.5) * step_x;
                let src = match resampling {
                    Resampling::Nearest => composite::sample_nearest(tile, sx, sy),
                    Resampling::Bilinear => composite::sample_bilinear(tile, sx, sy),
                };
                let i = ((py as usize) * (self.width as usize) + (px as usize)) * 4;
                let dst = [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]];
                self.data[i..i + 4].copy_from_slice(&composite::over(dst, src, opacity));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Page, Units};

    const BG: Rgba8 = [255, 0, 255, 255];
    const OCEAN: Rgba8 = [181, 208, 208, 255];

    fn unit_geometry(width: f64, height: f64) -> PageGeometry {
        // one pixel per world unit at 96 dpi
        let page = Page {
            bbox: Extent::new(0.0, 0.0, width, height),
            scale: 96.0 / crate::geometry::METERS_PER_INCH,
        };
        PageGeometry::resolve(&page, 96.0, Units::Meters).unwrap()
    }

    #[test]
    fn adjacent_tiles_abut_without_gap_or_overlap() {
        let geometry = unit_geometry(32.0, 16.0);
        let mut canvas = Canvas::new(32, 16, BG);
        let tile = DecodedTile::solid(16, 16, OCEAN);

        canvas
            .draw_tile(&geometry, Extent::new(0.0, 0.0, 16.0, 16.0), &tile, 1.0, Resampling::Nearest)
            .unwrap();
        canvas
            .draw_tile(&geometry, Extent::new(16.0, 0.0, 32.0, 16.0), &tile, 1.0, Resampling::Nearest)
            .unwrap();

        for y in 0..16 {
            for x in 0..32 {
                assert_eq!(canvas.pixel(x, y), OCEAN, "seam or gap at ({x},{y})");
            }
        }
    }

    #[test]
    fn tile_overlapping_canvas_edge_is_clipped() {
        let geometry = unit_geometry(16.0, 16.0);
        let mut canvas = Canvas::new(16, 16, BG);
        let tile = DecodedTile::solid(16, 16, OCEAN);

        // half the tile hangs off the west edge
        canvas
            .draw_tile(&geometry, Extent::new(-8.0, 0.0, 8.0, 16.0), &tile, 1.0, Resampling::Nearest)
            .unwrap();
        assert_eq!(canvas.pixel(0, 0), OCEAN);
        assert_eq!(canvas.pixel(7, 8), OCEAN);
        assert_eq!(canvas.pixel(8, 8), BG);
    }

    #[test]
    fn sub_pixel_sliver_is_a_noop() {
        let geometry = unit_geometry(16.0, 16.0);
        let mut canvas = Canvas::new(16, 16, BG);
        let tile = DecodedTile::solid(16, 16, OCEAN);

        // overlap under half a pixel rounds to an empty rect at the west edge
        canvas
            .draw_tile(&geometry, Extent::new(-16.0, 0.0, 0.3, 16.0), &tile, 1.0, Resampling::Nearest)
            .unwrap();
        // footprint slimmer than half a pixel inside the canvas
        canvas
            .draw_tile(&geometry, Extent::new(4.0, 0.0, 4.2, 16.0), &tile, 1.0, Resampling::Nearest)
            .unwrap();

        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(canvas.pixel(x, y), BG, "sliver painted at ({x},{y})");
            }
        }
    }

    #[test]
    fn tile_fully_outside_canvas_is_a_compositing_error() {
        let geometry = unit_geometry(16.0, 16.0);
        let mut canvas = Canvas::new(16, 16, BG);
        let tile = DecodedTile::solid(16, 16, OCEAN);

        let err = canvas
            .draw_tile(
                &geometry,
                Extent::new(100.0, 100.0, 116.0, 116.0),
                &tile,
                1.0,
                Resampling::Nearest,
            )
            .unwrap_err();
        assert!(matches!(err, PrintError::Compositing(_)));
    }

    #[test]
    fn coarser_tile_upsamples_to_cover_footprint() {
        let geometry = unit_geometry(16.0, 16.0);
        let mut canvas = Canvas::new(16, 16, BG);
        // 8x8 tile stretched over a 16x16 pixel footprint
        let tile = DecodedTile::solid(8, 8, OCEAN);
        canvas
            .draw_tile(&geometry, Extent::new(0.0, 0.0, 16.0, 16.0), &tile, 1.0, Resampling::Bilinear)
            .unwrap();
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(canvas.pixel(x, y), OCEAN);
            }
        }
    }

    #[test]
    fn opacity_blends_toward_background() {
        let geometry = unit_geometry(4.0, 4.0);
        let mut canvas = Canvas::new(4, 4, [0, 0, 0, 255]);
        let tile = DecodedTile::solid(4, 4, [255, 255, 255, 255]);
        canvas
            .draw_tile(&geometry, Extent::new(0.0, 0.0, 4.0, 4.0), &tile, 0.5, Resampling::Nearest)
            .unwrap();
        let got = canvas.pixel(1, 1);
        assert_eq!(got, composite::over([0, 0, 0, 255], [255, 255, 255, 255], 0.5));
    }
}
