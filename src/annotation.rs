//! Annotation variants and color parsing
//!
//! Annotations are immutable once appended to a capture. Their position in
//! the capture's list is their identity: insertion order is draw order,
//! later annotations paint on top of earlier ones.

use crate::error::CaptureError;
use serde::{Deserialize, Serialize};

/// An overlay drawn on top of a capture's base image.
///
/// Adding a new annotation kind means adding a variant here and a matching
/// draw arm in the compositor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Annotation {
    /// Rectangle outline stroke, no fill. `x`/`y` may be negative; pixels
    /// outside the canvas are clipped at draw time.
    Box {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: String,
        line_width: u32,
    },
    /// A line of text over an opaque backing rectangle. The text baseline
    /// sits at `(x, y)`.
    Text {
        x: i32,
        y: i32,
        text: String,
        font_size: u32,
        color: String,
        background: String,
    },
}

impl Annotation {
    /// Validate shape constraints and color names.
    ///
    /// Failures are reported, never clamped: a zero-width box is an error,
    /// not a one-pixel box.
    pub fn validate(&self) -> Result<(), CaptureError> {
        match self {
            Annotation::Box {
                width,
                height,
                color,
                line_width,
                ..
            } => {
                if *width == 0 || *height == 0 {
                    return Err(CaptureError::Validation(format!(
                        "box dimensions must be at least 1x1, got {width}x{height}"
                    )));
                }
                if *line_width == 0 {
                    return Err(CaptureError::Validation(
                        "box line_width must be at least 1".to_string(),
                    ));
                }
                parse_color(color)?;
                Ok(())
            }
            Annotation::Text {
                text,
                font_size,
                color,
                background,
                ..
            } => {
                if text.is_empty() {
                    return Err(CaptureError::Validation(
                        "text annotation must not be empty".to_string(),
                    ));
                }
                if *font_size == 0 {
                    return Err(CaptureError::Validation(
                        "text font_size must be at least 1".to_string(),
                    ));
                }
                parse_color(color)?;
                parse_color(background)?;
                Ok(())
            }
        }
    }
}

/// An opaque RGB color resolved from a color string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Resolve a color string to RGB.
///
/// Accepts the named colors the browser overlay offers plus `#rgb` and
/// `#rrggbb` hex. Anything else is a validation error.
pub fn parse_color(s: &str) -> Result<Color, CaptureError> {
    let named = match s.to_ascii_lowercase().as_str() {
        "red" => Some((255, 0, 0)),
        "green" => Some((0, 128, 0)),
        "blue" => Some((0, 0, 255)),
        "yellow" => Some((255, 255, 0)),
        "orange" => Some((255, 165, 0)),
        "white" => Some((255, 255, 255)),
        "black" => Some((0, 0, 0)),
        "cyan" => Some((0, 255, 255)),
        "magenta" => Some((255, 0, 255)),
        "gray" | "grey" => Some((128, 128, 128)),
        "purple" => Some((128, 0, 128)),
        _ => None,
    };
    if let Some((r, g, b)) = named {
        return Ok(Color { r, g, b });
    }

    if let Some(hex) = s.strip_prefix('#') {
        let expand = |h: u8| h << 4 | h;
        let digit = |c: char| c.to_digit(16).map(|d| d as u8);
        let digits: Option<Vec<u8>> = hex.chars().map(digit).collect();
        if let Some(digits) = digits {
            match digits.as_slice() {
                [r, g, b] => {
                    return Ok(Color {
                        r: expand(*r),
                        g: expand(*g),
                        b: expand(*b),
                    })
                }
                [r1, r0, g1, g0, b1, b0] => {
                    return Ok(Color {
                        r: (*r1 << 4) | *r0,
                        g: (*g1 << 4) | *g0,
                        b: (*b1 << 4) | *b0,
                    })
                }
                _ => {}
            }
        }
    }

    Err(CaptureError::Validation(format!("unknown color: {s}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_box() -> Annotation {
        Annotation::Box {
            x: 0,
            y: 0,
            width: 20,
            height: 20,
            color: "red".to_string(),
            line_width: 3,
        }
    }

    #[test]
    fn test_valid_box_passes() {
        assert!(valid_box().validate().is_ok());
    }

    #[test]
    fn test_zero_width_box_rejected() {
        let ann = Annotation::Box {
            x: 0,
            y: 0,
            width: 0,
            height: 20,
            color: "red".to_string(),
            line_width: 3,
        };
        assert!(matches!(ann.validate(), Err(CaptureError::Validation(_))));
    }

    #[test]
    fn test_zero_line_width_rejected() {
        let ann = Annotation::Box {
            x: 0,
            y: 0,
            width: 20,
            height: 20,
            color: "red".to_string(),
            line_width: 0,
        };
        assert!(matches!(ann.validate(), Err(CaptureError::Validation(_))));
    }

    #[test]
    fn test_empty_text_rejected() {
        let ann = Annotation::Text {
            x: 5,
            y: 5,
            text: String::new(),
            font_size: 20,
            color: "red".to_string(),
            background: "white".to_string(),
        };
        assert!(matches!(ann.validate(), Err(CaptureError::Validation(_))));
    }

    #[test]
    fn test_unknown_color_rejected() {
        let ann = Annotation::Box {
            x: 0,
            y: 0,
            width: 20,
            height: 20,
            color: "vermilion".to_string(),
            line_width: 3,
        };
        assert!(matches!(ann.validate(), Err(CaptureError::Validation(_))));
    }

    #[test]
    fn test_named_colors() {
        assert_eq!(parse_color("red").unwrap(), Color { r: 255, g: 0, b: 0 });
        assert_eq!(
            parse_color("White").unwrap(),
            Color {
                r: 255,
                g: 255,
                b: 255
            }
        );
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(
            parse_color("#ff8000").unwrap(),
            Color {
                r: 255,
                g: 128,
                b: 0
            }
        );
        assert_eq!(
            parse_color("#f00").unwrap(),
            Color { r: 255, g: 0, b: 0 }
        );
    }

    #[test]
    fn test_bad_hex_rejected() {
        assert!(parse_color("#ff80").is_err());
        assert!(parse_color("#zzz").is_err());
    }

    #[test]
    fn test_serde_tagged_roundtrip() {
        let json = serde_json::to_value(valid_box()).unwrap();
        assert_eq!(json["type"], "box");
        let back: Annotation = serde_json::from_value(json).unwrap();
        assert!(matches!(back, Annotation::Box { width: 20, .. }));
    }
}
