//! Color values and parsing of the CSS-style strings that color pickers hand us.

use image::Rgba;

use crate::error::{PaintError, PaintResult};

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Parse `rgb(r, g, b)`, `rgba(r, g, b, a)`, `#rrggbb` or `#rgb`.
///
/// Channels must be integers in 0–255; the `rgba` alpha is a 0.0–1.0 float.
/// Anything else is [`PaintError::InvalidColor`].
pub fn parse_color(input: &str) -> PaintResult<Rgba<u8>> {
    let s = input.trim();
    let invalid = || PaintError::InvalidColor(input.to_string());

    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(invalid);
    }

    let lower = s.to_ascii_lowercase();
    let (body, has_alpha) = if let Some(b) = lower.strip_prefix("rgba(") {
        (b, true)
    } else if let Some(b) = lower.strip_prefix("rgb(") {
        (b, false)
    } else {
        return Err(invalid());
    };
    let body = body.strip_suffix(')').ok_or_else(invalid)?;
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();

    let expected = if has_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return Err(invalid());
    }

    let mut rgb = [0u8; 3];
    for (slot, part) in rgb.iter_mut().zip(&parts) {
        *slot = part.parse::<u8>().map_err(|_| invalid())?;
    }

    let alpha = if has_alpha {
        let a: f32 = parts[3].parse().map_err(|_| invalid())?;
        if !(0.0..=1.0).contains(&a) {
            return Err(invalid());
        }
        (a * 255.0).round() as u8
    } else {
        255
    };

    Ok(Rgba([rgb[0], rgb[1], rgb[2], alpha]))
}

fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => {
            let v = u32::from_str_radix(hex, 16).ok()?;
            Some(Rgba([(v >> 16) as u8, (v >> 8) as u8, v as u8, 255]))
        }
        3 => {
            let v = u32::from_str_radix(hex, 16).ok()?;
            let expand = |n: u32| ((n & 0xF) * 17) as u8;
            Some(Rgba([expand(v >> 8), expand(v >> 4), expand(v), 255]))
        }
        _ => None,
    }
}

/// Format as `rgb(r, g, b)` (alpha dropped), the form the settings file stores.
pub fn to_css(color: Rgba<u8>) -> String {
    format!("rgb({}, {}, {})", color[0], color[1], color[2])
}

/// Same color with alpha forced to fully opaque.
#[inline]
pub fn opaque(color: Rgba<u8>) -> Rgba<u8> {
    Rgba([color[0], color[1], color[2], 255])
}

#[inline]
pub fn rgb_eq(a: Rgba<u8>, b: Rgba<u8>) -> bool {
    a[0] == b[0] && a[1] == b[1] && a[2] == b[2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rgb_function() {
        assert_eq!(parse_color("rgb(255, 0, 0)").unwrap(), Rgba([255, 0, 0, 255]));
        assert_eq!(parse_color("rgb(1,2,3)").unwrap(), Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn parses_rgba_with_float_alpha() {
        assert_eq!(parse_color("rgba(10, 20, 30, 0.5)").unwrap(), Rgba([10, 20, 30, 128]));
    }

    #[test]
    fn parses_hex_forms() {
        assert_eq!(parse_color("#00ff80").unwrap(), Rgba([0, 255, 128, 255]));
        assert_eq!(parse_color("#fff").unwrap(), WHITE);
    }

    #[test]
    fn rejects_malformed_input() {
        let bad_inputs = [
            "rgb(256, 0, 0)",
            "rgb(1, 2)",
            "rgb(a, b, c)",
            "blue",
            "#12345",
            "#zzzzzz",
            "",
        ];
        for bad in bad_inputs {
            assert!(
                matches!(parse_color(bad), Err(PaintError::InvalidColor(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn css_round_trips_through_parser() {
        let c = Rgba([12, 34, 56, 255]);
        assert_eq!(parse_color(&to_css(c)).unwrap(), c);
    }
}
