use crate::decode::DecodedTile;

/// Straight (non-premultiplied) RGBA, 8 bits per channel.
pub type Rgba8 = [u8; 4];

/// How tile pixels are resampled when the source pyramid resolution differs
/// from the canvas ground resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    Nearest,
    #[default]
    Bilinear,
}

/// Source-over with straight alpha: `out = src*a + dst*(1-a)` per channel,
/// `a = srcAlpha * opacity`. Integer math with round-to-nearest, same shape
/// as the rest of the 8-bit pipeline.
pub fn over(dst: Rgba8, src: Rgba8, opacity: f32) -> Rgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    for i in 0..3 {
        out[i] = mul_div255(u16::from(src[i]), u16::from(sa))
            .saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out[3] = sa.saturating_add(mul_div255(u16::from(dst[3]), inv));
    out
}

/// Sample a tile at continuous pixel coordinates (pixel `i` covers
/// `[i, i+1)`, center at `i + 0.5`), clamped to the tile.
pub fn sample_nearest(tile: &DecodedTile, sx: f64, sy: f64) -> Rgba8 {
    let x = (sx.floor() as i64).clamp(0, i64::from(tile.width) - 1) as u32;
    let y = (sy.floor() as i64).clamp(0, i64::from(tile.height) - 1) as u32;
    tile.pixel(x, y)
}

/// Bilinear sample at continuous pixel coordinates, clamped at tile edges
/// so border pixels do not bleed transparent black into the canvas.
pub fn sample_bilinear(tile: &DecodedTile, sx: f64, sy: f64) -> Rgba8 {
    let gx = sx - 0.5;
    let gy = sy - 0.5;
    let x0 = gx.floor();
    let y0 = gy.floor();
    let fx = gx - x0;
    let fy = gy - y0;

    let max_x = i64::from(tile.width) - 1;
    let max_y = i64::from(tile.height) - 1;
    let x0i = (x0 as i64).clamp(0, max_x) as u32;
    let x1i = (x0 as i64 + 1).clamp(0, max_x) as u32;
    let y0i = (y0 as i64).clamp(0, max_y) as u32;
    let y1i = (y0 as i64 + 1).clamp(0, max_y) as u32;

    let p00 = tile.pixel(x0i, y0i);
    let p10 = tile.pixel(x1i, y0i);
    let p01 = tile.pixel(x0i, y1i);
    let p11 = tile.pixel(x1i, y1i);

    let mut out = [0u8; 4];
    for i in 0..4 {
        let top = f64::from(p00[i]) * (1.0 - fx) + f64::from(p10[i]) * fx;
        let bottom = f64::from(p01[i]) * (1.0 - fx) + f64::from(p11[i]) * fx;
        out[i] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_opacity_0_is_noop() {
        let dst = [1, 2, 3, 255];
        assert_eq!(over(dst, [200, 200, 200, 200], 0.0), dst);
    }

    #[test]
    fn over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30, 255];
        assert_eq!(over(dst, [255, 255, 255, 0], 1.0), dst);
    }

    #[test]
    fn over_opaque_src_replaces_dst() {
        let dst = [0, 0, 0, 255];
        let src = [255, 10, 0, 255];
        assert_eq!(over(dst, src, 1.0), src);
    }

    #[test]
    fn over_half_alpha_mixes_channels() {
        let out = over([0, 0, 0, 255], [255, 255, 255, 128], 1.0);
        // 255 * 128/255 rounded
        assert_eq!(out, [128, 128, 128, 255]);
    }

    #[test]
    fn layer_opacity_scales_src_alpha() {
        let full = over([0, 0, 0, 255], [255, 255, 255, 255], 0.5);
        let via_alpha = over([0, 0, 0, 255], [255, 255, 255, 128], 1.0);
        assert_eq!(full, via_alpha);
    }

    fn checker_tile() -> DecodedTile {
        // 2x2: black, white / white, black
        let mut tile = DecodedTile::solid(2, 2, [0, 0, 0, 255]);
        tile.put_pixel(1, 0, [255, 255, 255, 255]);
        tile.put_pixel(0, 1, [255, 255, 255, 255]);
        tile
    }

    #[test]
    fn nearest_picks_the_containing_pixel() {
        let tile = checker_tile();
        assert_eq!(sample_nearest(&tile, 0.5, 0.5), [0, 0, 0, 255]);
        assert_eq!(sample_nearest(&tile, 1.5, 0.5), [255, 255, 255, 255]);
        // out-of-range clamps
        assert_eq!(sample_nearest(&tile, -3.0, 0.5), [0, 0, 0, 255]);
    }

    #[test]
    fn bilinear_at_pixel_centers_is_exact() {
        let tile = checker_tile();
        assert_eq!(sample_bilinear(&tile, 0.5, 0.5), [0, 0, 0, 255]);
        assert_eq!(sample_bilinear(&tile, 1.5, 0.5), [255, 255, 255, 255]);
    }

    #[test]
    fn bilinear_midpoint_averages() {
        let tile = checker_tile();
        let mid = sample_bilinear(&tile, 1.0, 0.5);
        assert_eq!(mid, [128, 128, 128, 255]);
    }
}
