//! Pixel rectangle types and crop math for region captures

use crate::error::CaptureError;
use serde::{Deserialize, Serialize};

/// A pixel rectangle selected by the browser overlay, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A crop rectangle in source-image pixels, produced by scaling a
/// [`Region`] by scroll offsets and a device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Check that the region is non-degenerate.
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::InvalidRegion(format!(
                "region dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Compute the source-image crop rectangle for this region.
    ///
    /// The overlay selects regions in CSS pixels relative to the viewport,
    /// while the uploaded image covers the full page at device resolution.
    /// The source rect is `(x + scroll_x, y + scroll_y, width, height)`
    /// scaled by `pixel_ratio` and rounded to whole pixels. The crop is
    /// later resized back to `width x height`, so the stored capture's
    /// dimensions match the region exactly regardless of the ratio.
    ///
    /// Sums and scaling run in `u64`/`f64` so client-supplied offsets near
    /// `u32::MAX` cannot overflow; an out-of-range result saturates and is
    /// rejected by the bounds check instead of wrapping.
    pub fn source_rect(&self, scroll_x: u32, scroll_y: u32, pixel_ratio: f64) -> SourceRect {
        let scale = |v: u64| -> u32 { (v as f64 * pixel_ratio).round() as u32 };
        SourceRect {
            x: scale(self.x as u64 + scroll_x as u64),
            y: scale(self.y as u64 + scroll_y as u64),
            width: scale(self.width as u64).max(1),
            height: scale(self.height as u64).max(1),
        }
    }
}

impl SourceRect {
    /// Check that the rect lies fully inside an image of the given size.
    pub fn check_bounds(&self, image_width: u32, image_height: u32) -> Result<(), CaptureError> {
        let right = self.x as u64 + self.width as u64;
        let bottom = self.y as u64 + self.height as u64;
        if right > image_width as u64 || bottom > image_height as u64 {
            return Err(CaptureError::InvalidRegion(format!(
                "crop {}x{}+{}+{} exceeds image bounds {}x{}",
                self.width, self.height, self.x, self.y, image_width, image_height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_region() {
        let region = Region {
            x: 10,
            y: 10,
            width: 100,
            height: 50,
        };
        assert!(region.validate().is_ok());
    }

    #[test]
    fn test_zero_width_rejected() {
        let region = Region {
            x: 0,
            y: 0,
            width: 0,
            height: 50,
        };
        assert!(matches!(
            region.validate(),
            Err(CaptureError::InvalidRegion(_))
        ));
    }

    #[test]
    fn test_zero_height_rejected() {
        let region = Region {
            x: 0,
            y: 0,
            width: 50,
            height: 0,
        };
        assert!(matches!(
            region.validate(),
            Err(CaptureError::InvalidRegion(_))
        ));
    }

    #[test]
    fn test_source_rect_ratio_one() {
        let region = Region {
            x: 10,
            y: 20,
            width: 100,
            height: 50,
        };
        let rect = region.source_rect(0, 0, 1.0);
        assert_eq!(
            rect,
            SourceRect {
                x: 10,
                y: 20,
                width: 100,
                height: 50
            }
        );
    }

    #[test]
    fn test_source_rect_scales_by_pixel_ratio() {
        let region = Region {
            x: 10,
            y: 20,
            width: 100,
            height: 50,
        };
        let rect = region.source_rect(0, 0, 2.0);
        assert_eq!(
            rect,
            SourceRect {
                x: 20,
                y: 40,
                width: 200,
                height: 100
            }
        );
    }

    #[test]
    fn test_source_rect_applies_scroll_before_scaling() {
        let region = Region {
            x: 10,
            y: 10,
            width: 40,
            height: 40,
        };
        let rect = region.source_rect(5, 15, 2.0);
        assert_eq!(rect.x, 30);
        assert_eq!(rect.y, 50);
    }

    #[test]
    fn test_source_rect_rounds_fractional_ratio() {
        let region = Region {
            x: 3,
            y: 3,
            width: 10,
            height: 10,
        };
        let rect = region.source_rect(0, 0, 1.5);
        // 3 * 1.5 = 4.5 rounds to 5, 10 * 1.5 = 15
        assert_eq!(rect.x, 5);
        assert_eq!(rect.width, 15);
    }

    #[test]
    fn test_source_rect_near_max_offsets_does_not_overflow() {
        let region = Region {
            x: u32::MAX,
            y: u32::MAX - 1,
            width: 100,
            height: 50,
        };
        // x + scroll_x exceeds u32::MAX; the result saturates and must
        // fail the bounds check rather than wrap around to the origin.
        let rect = region.source_rect(2, 3, 1.0);
        assert_eq!(rect.x, u32::MAX);
        assert_eq!(rect.y, u32::MAX);
        assert!(matches!(
            rect.check_bounds(4096, 4096),
            Err(CaptureError::InvalidRegion(_))
        ));
    }

    #[test]
    fn test_bounds_check_inside() {
        let rect = SourceRect {
            x: 10,
            y: 10,
            width: 100,
            height: 50,
        };
        assert!(rect.check_bounds(200, 200).is_ok());
    }

    #[test]
    fn test_bounds_check_overflow() {
        let rect = SourceRect {
            x: 150,
            y: 10,
            width: 100,
            height: 50,
        };
        assert!(matches!(
            rect.check_bounds(200, 200),
            Err(CaptureError::InvalidRegion(_))
        ));
    }
}
