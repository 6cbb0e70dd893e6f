use crate::composite::Rgba8;
use crate::error::TileFetchError;

/// A decoded tile: straight RGBA8, row-major, tightly packed.
#[derive(Clone, Debug)]
pub struct DecodedTile {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl DecodedTile {
    pub fn solid(width: u32, height: u32, color: Rgba8) -> Self {
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * 4);
        for _ in 0..(width as usize) * (height as usize) {
            data.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba8 {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, color: Rgba8) {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        self.data[i..i + 4].copy_from_slice(&color);
    }
}

/// Decode raw tile bytes (PNG or JPEG, sniffed from magic bytes) into
/// straight RGBA8.
pub fn decode_tile(bytes: &[u8]) -> Result<DecodedTile, TileFetchError> {
    let img = image::load_from_memory(bytes).map_err(|e| TileFetchError::Decode(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedTile {
        width,
        height,
        data: rgba.into_raw(),
    })
}
