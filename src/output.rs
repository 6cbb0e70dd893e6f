use std::io::Write;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::canvas::Canvas;
use crate::error::{PrintError, PrintResult};
use crate::model::OutputFormat;

/// Encode the finished canvas into the caller's sink. The engine owns no
/// files; where the bytes go is the caller's business.
pub fn write_canvas(canvas: &Canvas, format: OutputFormat, sink: &mut dyn Write) -> PrintResult<()> {
    match format {
        OutputFormat::Png => PngEncoder::new(sink)
            .write_image(
                canvas.data(),
                canvas.width(),
                canvas.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| PrintError::encode(e.to_string())),
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel; the canvas background is opaque so
            // dropping alpha loses nothing visible
            let rgb: Vec<u8> = canvas
                .data()
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            JpegEncoder::new(sink)
                .write_image(
                    &rgb,
                    canvas.width(),
                    canvas.height(),
                    ExtendedColorType::Rgb8,
                )
                .map_err(|e| PrintError::encode(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_roundtrips_canvas_pixels() {
        let canvas = Canvas::new(5, 3, [181, 208, 208, 255]);
        let mut bytes = Vec::new();
        write_canvas(&canvas, OutputFormat::Png, &mut bytes).unwrap();

        let img = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (5, 3));
        assert_eq!(img.get_pixel(4, 2).0, [181, 208, 208, 255]);
    }

    #[test]
    fn jpeg_encodes_with_correct_dimensions() {
        let canvas = Canvas::new(8, 8, [10, 20, 30, 255]);
        let mut bytes = Vec::new();
        write_canvas(&canvas, OutputFormat::Jpeg, &mut bytes).unwrap();

        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!(img.width(), 8);
        assert_eq!(img.height(), 8);
    }
}
