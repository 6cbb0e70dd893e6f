use kurbo::{Affine, Point, Vec2};

use crate::error::{PrintError, PrintResult};
use crate::model::{Extent, Page, Units};

pub const METERS_PER_INCH: f64 = 0.0254;

/// Hard cap on either canvas dimension. Anything larger points at a bogus
/// scale/DPI combination, not a real print.
const MAX_CANVAS_DIM: u64 = 65_536;

/// Resolved raster geometry for one page: canvas size plus the
/// world-to-pixel affine. World point (minX, maxY) maps to pixel (0, 0) and
/// (maxX, minY) to (width, height); raster row 0 is the top.
#[derive(Clone, Debug)]
pub struct PageGeometry {
    pub width: u32,
    pub height: u32,
    pub bbox: Extent,
    /// Job SRS units covered by one canvas pixel.
    pub ground_resolution: f64,
    world_to_pixel: Affine,
    pixel_to_world: Affine,
}

impl PageGeometry {
    pub fn resolve(page: &Page, dpi: f64, units: Units) -> PrintResult<Self> {
        page.validate()?;
        if !(dpi > 0.0) || !dpi.is_finite() {
            return Err(PrintError::invalid_geometry("dpi must be > 0"));
        }

        let resolution = page.scale * METERS_PER_INCH / dpi / units.meters_per_unit();
        let bbox = page.bbox;
        let width = ceil_snapped(bbox.width() / resolution);
        let height = ceil_snapped(bbox.height() / resolution);
        if width == 0 || height == 0 || width > MAX_CANVAS_DIM || height > MAX_CANVAS_DIM {
            return Err(PrintError::invalid_geometry(format!(
                "canvas {width}x{height} out of range for bbox {:?} at scale {} / {dpi} dpi",
                <[f64; 4]>::from(bbox),
                page.scale,
            )));
        }

        let world_to_pixel = Affine::scale_non_uniform(1.0 / resolution, -1.0 / resolution)
            * Affine::translate(Vec2::new(-bbox.min_x, -bbox.max_y));

        Ok(Self {
            width: width as u32,
            height: height as u32,
            bbox,
            ground_resolution: resolution,
            pixel_to_world: world_to_pixel.inverse(),
            world_to_pixel,
        })
    }

    pub fn world_to_pixel(&self, world: Point) -> Point {
        self.world_to_pixel * world
    }

    pub fn pixel_to_world(&self, pixel: Point) -> Point {
        self.pixel_to_world * pixel
    }
}

/// Ceil that forgives float dust: a quotient within 1e-6 of an integer snaps
/// to it instead of spilling into an extra pixel row.
fn ceil_snapped(v: f64) -> u64 {
    if !v.is_finite() || v < 0.0 {
        return 0;
    }
    let nearest = v.round();
    let snapped = if (v - nearest).abs() < 1e-6 {
        nearest
    } else {
        v.ceil()
    };
    if snapped > u64::MAX as f64 {
        u64::MAX
    } else {
        snapped as u64
    }
}
