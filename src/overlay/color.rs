use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use image::Rgba;

/// 8-bit RGBA color, parsed from CSS-style strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// `alpha` is a 0..1 opacity, as in CSS `rgba()`.
    pub fn rgba(r: u8, g: u8, b: u8, alpha: f32) -> Self {
        Self {
            r,
            g,
            b,
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
        }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(
                f,
                "rgba({}, {}, {}, {:.2})",
                self.r,
                self.g,
                self.b,
                self.a as f32 / 255.0
            )
        }
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().to_ascii_lowercase();
        match value.as_str() {
            "white" => return Ok(Color::WHITE),
            "black" => return Ok(Color::BLACK),
            "transparent" => return Ok(Color::TRANSPARENT),
            _ => {}
        }

        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(args) = value
            .strip_prefix("rgba(")
            .or_else(|| value.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_functional(args);
        }
        Err(anyhow!("unsupported color syntax"))
    }
}

fn parse_hex(hex: &str) -> Result<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow!("invalid hex digits"));
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
    let short = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17);
    let color = match hex.len() {
        3 => Color::rgb(short(0)?, short(1)?, short(2)?),
        6 => Color::rgb(channel(0)?, channel(2)?, channel(4)?),
        8 => Color {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: channel(6)?,
        },
        n => return Err(anyhow!("expected 3, 6 or 8 hex digits, got {}", n)),
    };
    Ok(color)
}

fn parse_functional(args: &str) -> Result<Color> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return Err(anyhow!("expected 3 or 4 components, got {}", parts.len()));
    }
    let channel = |raw: &str| -> Result<u8> {
        raw.parse::<u8>()
            .map_err(|_| anyhow!("channel '{}' must be an integer in 0..=255", raw))
    };
    let alpha = match parts.get(3) {
        Some(raw) => raw
            .parse::<f32>()
            .map_err(|_| anyhow!("alpha '{}' must be a number", raw))?,
        None => 1.0,
    };
    Ok(Color::rgba(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        alpha,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_css_forms() -> Result<()> {
        assert_eq!("#22c55e".parse::<Color>()?, Color::rgb(0x22, 0xc5, 0x5e));
        assert_eq!("#fff".parse::<Color>()?, Color::WHITE);
        assert_eq!(
            "rgba(34, 197, 94, 0.7)".parse::<Color>()?,
            Color::rgba(34, 197, 94, 0.7)
        );
        assert_eq!("#22c55e80".parse::<Color>()?.a, 0x80);
        assert_eq!("rgb(1,2,3)".parse::<Color>()?, Color::rgb(1, 2, 3));
        assert_eq!(" White ".parse::<Color>()?, Color::WHITE);
        Ok(())
    }

    #[test]
    fn rejects_garbage() {
        assert!("#12".parse::<Color>().is_err());
        assert!("rgb(300, 0, 0)".parse::<Color>().is_err());
        assert!("hsl(0, 0%, 0%)".parse::<Color>().is_err());
    }

    #[test]
    fn displays_as_css() {
        assert_eq!(Color::rgb(0x22, 0xc5, 0x5e).to_string(), "#22c55e");
        assert_eq!(Color::rgba(34, 197, 94, 0.7).to_string(), "rgba(34, 197, 94, 0.70)");
    }
}
