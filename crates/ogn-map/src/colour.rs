use ogn_core::{OgnError, OgnResult};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const RED: Rgba = Rgba::opaque(255, 0, 0);
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Builds a colour from an alpha fraction in `0.0..=1.0`.
    pub fn with_alpha(r: u8, g: u8, b: u8, alpha: f64) -> Self {
        Self::new(r, g, b, (alpha.clamp(0.0, 1.0) * 255.0).round() as u8)
    }

    /// Accepts `rgb`, `rrggbb` and `rrggbbaa` hex, with or without `#`.
    pub fn parse(value: &str) -> OgnResult<Self> {
        let hex = value.trim().trim_start_matches('#');
        let bad = || OgnError::invalid(format!("bad colour {value}"));
        if !hex.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(bad());
        }
        let channel = |index: usize| u8::from_str_radix(&hex[index..index + 2], 16);
        match hex.len() {
            3 => {
                let mut digits = hex.chars().map(|c| c.to_digit(16).unwrap_or(0) as u8 * 17);
                let r = digits.next().ok_or_else(bad)?;
                let g = digits.next().ok_or_else(bad)?;
                let b = digits.next().ok_or_else(bad)?;
                Ok(Self::opaque(r, g, b))
            }
            6 => Ok(Self::opaque(
                channel(0).map_err(|_| bad())?,
                channel(2).map_err(|_| bad())?,
                channel(4).map_err(|_| bad())?,
            )),
            8 => Ok(Self::new(
                channel(0).map_err(|_| bad())?,
                channel(2).map_err(|_| bad())?,
                channel(4).map_err(|_| bad())?,
                channel(6).map_err(|_| bad())?,
            )),
            _ => Err(bad()),
        }
    }

    /// Linear blend, `t = 0` gives `self` and `t = 1` gives `other`.
    pub fn lerp(&self, other: Rgba, t: f64) -> Rgba {
        let mix = |a: u8, b: u8| (f64::from(a) * (1.0 - t) + f64::from(b) * t).round() as u8;
        Rgba::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
