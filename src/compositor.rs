//! Deterministic compositor: base image + ordered annotations -> encoded bytes
//!
//! Rendering always starts from a copy of the stored base image, so
//! re-rendering is idempotent. Annotations draw in insertion order; later
//! annotations paint over earlier ones. All drawing is clipped to the
//! canvas, and nothing here consults the system environment, so identical
//! capture state always produces identical output bytes.

use crate::annotation::{parse_color, Annotation, Color};
use crate::error::CaptureError;
use crate::font;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Encodings the image endpoint can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Parse a client-supplied format string.
    pub fn parse(s: &str) -> Result<Self, CaptureError> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            other => Err(CaptureError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Composite annotations over a copy of the base image and encode the
/// result. The base image is never mutated.
pub fn render(
    base: &RgbaImage,
    annotations: &[Annotation],
    format: OutputFormat,
) -> Result<Vec<u8>, CaptureError> {
    let mut canvas = base.clone();
    for annotation in annotations {
        match annotation {
            Annotation::Box {
                x,
                y,
                width,
                height,
                color,
                line_width,
            } => {
                let color = parse_color(color)?;
                draw_box_outline(&mut canvas, *x, *y, *width, *height, *line_width, color);
            }
            Annotation::Text {
                x,
                y,
                text,
                font_size,
                color,
                background,
            } => {
                let color = parse_color(color)?;
                let background = parse_color(background)?;
                draw_text(&mut canvas, *x, *y, text, *font_size, color, background);
            }
        }
    }
    encode(canvas, format)
}

fn encode(canvas: RgbaImage, format: OutputFormat) -> Result<Vec<u8>, CaptureError> {
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    let result = match format {
        OutputFormat::Png => {
            image::DynamicImage::ImageRgba8(canvas).write_to(&mut cursor, ImageFormat::Png)
        }
        // JPEG has no alpha channel; flatten to RGB first.
        OutputFormat::Jpeg => image::DynamicImage::ImageRgba8(canvas)
            .to_rgb8()
            .write_to(&mut cursor, ImageFormat::Jpeg),
    };
    result.map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Stroke a rectangle outline, `line_width` pixels thick, growing inward
/// from the box boundary.
fn draw_box_outline(
    canvas: &mut RgbaImage,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    line_width: u32,
    color: Color,
) {
    let (x, y) = (x as i64, y as i64);
    let (w, h) = (width as i64, height as i64);
    // A stroke thicker than the box degenerates to a filled rectangle;
    // never paint past the opposite edge.
    let t = (line_width as i64).min(w).min(h);
    // Top, bottom, left, right bands. Overlapping corners paint the same
    // color twice, which is harmless.
    fill_rect(canvas, x, y, x + w, y + t, color);
    fill_rect(canvas, x, y + h - t, x + w, y + h, color);
    fill_rect(canvas, x, y, x + t, y + h, color);
    fill_rect(canvas, x + w - t, y, x + w, y + h, color);
}

/// Draw text with its baseline at `(x, y)` over an opaque backing rect.
///
/// Glyphs come from the embedded 5x7 font scaled by an integer factor
/// derived from `font_size`. The backing rect is `font_size + 6` pixels
/// tall and proportional to the character count in width.
fn draw_text(
    canvas: &mut RgbaImage,
    x: i32,
    y: i32,
    text: &str,
    font_size: u32,
    color: Color,
    background: Color,
) {
    let scale = (font_size / (font::GLYPH_HEIGHT + 1)).max(1) as i64;
    let advance = (font::GLYPH_WIDTH as i64 + 1) * scale;
    let char_count = text.chars().count() as i64;
    let text_width = char_count * advance;

    let (x, y) = (x as i64, y as i64);
    let pad = 3;

    // Backing rectangle, anchored so the baseline sits at y.
    fill_rect(
        canvas,
        x - pad,
        y - font_size as i64 - pad,
        x + text_width + pad,
        y + pad,
        background,
    );

    let glyph_top = y - font::GLYPH_HEIGHT as i64 * scale;
    for (index, ch) in text.chars().enumerate() {
        let pen_x = x + index as i64 * advance;
        let columns = font::glyph(ch);
        for (col, bits) in columns.iter().enumerate() {
            for row in 0..font::GLYPH_HEIGHT {
                if bits >> row & 1 != 0 {
                    let px = pen_x + col as i64 * scale;
                    let py = glyph_top + row as i64 * scale;
                    fill_rect(canvas, px, py, px + scale, py + scale, color);
                }
            }
        }
    }
}

/// Fill `[x0, x1) x [y0, y1)`, clipped to the canvas.
fn fill_rect(canvas: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Color) {
    let pixel = Rgba([color.r, color.g, color.b, 255]);
    let x_start = x0.clamp(0, canvas.width() as i64) as u32;
    let x_end = x1.clamp(0, canvas.width() as i64) as u32;
    let y_start = y0.clamp(0, canvas.height() as i64) as u32;
    let y_end = y1.clamp(0, canvas.height() as i64) as u32;
    for py in y_start..y_end {
        for px in x_start..x_end {
            canvas.put_pixel(px, py, pixel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn white_canvas(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, WHITE)
    }

    fn decode_png(bytes: &[u8]) -> RgbaImage {
        image::load_from_memory(bytes).unwrap().to_rgba8()
    }

    fn box_annotation(x: i32, y: i32, size: u32, color: &str) -> Annotation {
        Annotation::Box {
            x,
            y,
            width: size,
            height: size,
            color: color.to_string(),
            line_width: 2,
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::parse("png").unwrap(), OutputFormat::Png);
        assert_eq!(OutputFormat::parse("PNG").unwrap(), OutputFormat::Png);
        assert_eq!(OutputFormat::parse("jpg").unwrap(), OutputFormat::Jpeg);
        assert!(matches!(
            OutputFormat::parse("bmp"),
            Err(CaptureError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_render_without_annotations_preserves_pixels() {
        let base = white_canvas(10, 10);
        let bytes = render(&base, &[], OutputFormat::Png).unwrap();
        let rendered = decode_png(&bytes);
        assert_eq!(rendered.dimensions(), (10, 10));
        assert_eq!(*rendered.get_pixel(5, 5), WHITE);
    }

    #[test]
    fn test_render_is_idempotent() {
        let base = white_canvas(50, 50);
        let annotations = vec![box_annotation(10, 10, 20, "red")];
        let first = render(&base, &annotations, OutputFormat::Png).unwrap();
        let second = render(&base, &annotations, OutputFormat::Png).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_does_not_mutate_base() {
        let base = white_canvas(50, 50);
        let annotations = vec![box_annotation(10, 10, 20, "red")];
        render(&base, &annotations, OutputFormat::Png).unwrap();
        assert_eq!(*base.get_pixel(10, 10), WHITE);
    }

    #[test]
    fn test_box_stroke_has_no_fill() {
        let base = white_canvas(100, 100);
        let annotations = vec![box_annotation(10, 10, 40, "red")];
        let rendered = decode_png(&render(&base, &annotations, OutputFormat::Png).unwrap());
        // On the stroke.
        assert_eq!(*rendered.get_pixel(10, 10), RED);
        assert_eq!(*rendered.get_pixel(30, 11), RED);
        // Interior stays untouched.
        assert_eq!(*rendered.get_pixel(30, 30), WHITE);
        // Outside the box.
        assert_eq!(*rendered.get_pixel(5, 5), WHITE);
    }

    #[test]
    fn test_oversized_stroke_stays_inside_box() {
        let base = white_canvas(40, 40);
        let annotations = vec![Annotation::Box {
            x: 10,
            y: 10,
            width: 10,
            height: 10,
            color: "red".to_string(),
            line_width: 30,
        }];
        let rendered = decode_png(&render(&base, &annotations, OutputFormat::Png).unwrap());
        // The stroke fills the box completely.
        assert_eq!(*rendered.get_pixel(10, 10), RED);
        assert_eq!(*rendered.get_pixel(15, 15), RED);
        assert_eq!(*rendered.get_pixel(19, 19), RED);
        // Nothing bleeds past the box boundary.
        assert_eq!(*rendered.get_pixel(20, 15), WHITE);
        assert_eq!(*rendered.get_pixel(15, 20), WHITE);
        assert_eq!(*rendered.get_pixel(9, 15), WHITE);
    }

    #[test]
    fn test_later_box_draws_on_top() {
        let base = white_canvas(100, 100);
        let annotations = vec![
            box_annotation(10, 10, 40, "red"),
            box_annotation(30, 30, 40, "blue"),
        ];
        let rendered = decode_png(&render(&base, &annotations, OutputFormat::Png).unwrap());
        // (48, 31) lies on red's right band and on blue's top band; the
        // later annotation must win.
        assert_eq!(*rendered.get_pixel(48, 31), BLUE);
        // Red is still visible where blue does not overlap.
        assert_eq!(*rendered.get_pixel(10, 10), RED);
    }

    #[test]
    fn test_text_background_covers_earlier_box() {
        let base = white_canvas(100, 100);
        let annotations = vec![
            Annotation::Box {
                x: 0,
                y: 0,
                width: 20,
                height: 20,
                color: "red".to_string(),
                line_width: 3,
            },
            Annotation::Text {
                x: 5,
                y: 15,
                text: "hi".to_string(),
                font_size: 12,
                color: "black".to_string(),
                background: "yellow".to_string(),
            },
        ];
        let rendered = decode_png(&render(&base, &annotations, OutputFormat::Png).unwrap());
        // (3, 1) is on the box's top stroke but inside the text backing
        // rect (x 2..20, y 0..18), so the background must cover it.
        assert_eq!(*rendered.get_pixel(3, 1), Rgba([255, 255, 0, 255]));
        // The stroke survives outside the backing rect.
        assert_eq!(*rendered.get_pixel(1, 19), RED);
    }

    #[test]
    fn test_text_backing_rect_height_tracks_font_size() {
        let base = white_canvas(100, 100);
        let annotations = vec![Annotation::Text {
            x: 10,
            y: 50,
            text: "a".to_string(),
            font_size: 20,
            color: "black".to_string(),
            background: "blue".to_string(),
        }];
        let rendered = decode_png(&render(&base, &annotations, OutputFormat::Png).unwrap());
        // Backing rect spans y in [50 - 20 - 3, 50 + 3) = [27, 53).
        assert_eq!(*rendered.get_pixel(8, 27), BLUE);
        assert_eq!(*rendered.get_pixel(8, 52), BLUE);
        assert_eq!(*rendered.get_pixel(8, 26), WHITE);
        assert_eq!(*rendered.get_pixel(8, 53), WHITE);
    }

    #[test]
    fn test_off_canvas_annotations_are_clipped() {
        let base = white_canvas(30, 30);
        let annotations = vec![
            box_annotation(-5, -5, 20, "red"),
            Annotation::Text {
                x: 25,
                y: 5,
                text: "overflow".to_string(),
                font_size: 16,
                color: "black".to_string(),
                background: "white".to_string(),
            },
        ];
        // Must not panic; visible parts still draw.
        let rendered = decode_png(&render(&base, &annotations, OutputFormat::Png).unwrap());
        assert_eq!(*rendered.get_pixel(14, 5), RED);
    }

    #[test]
    fn test_jpeg_output_is_jpeg() {
        let base = white_canvas(20, 20);
        let bytes = render(&base, &[], OutputFormat::Jpeg).unwrap();
        // JPEG SOI marker.
        assert_eq!(&bytes[..2], &[0xff, 0xd8]);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(OutputFormat::Png.content_type(), "image/png");
        assert_eq!(OutputFormat::Jpeg.content_type(), "image/jpeg");
    }
}
