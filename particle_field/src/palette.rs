//! Particle colours.
//!
//! Colours are carried as an [`Rgb`] triple and packed to `0xAARRGGBB` only
//! when they reach the framebuffer.  The `C` key walks a fixed preset cycle
//! that starts at the default cyan.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Rgb
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid colour {0:?} (expected #rrggbb)")]
pub struct ColorParseError(pub String);

/// 8-bit colour triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const CYAN:  Rgb = Rgb::new(0x00, 0xFF, 0xFF);
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);

    pub const fn new(r: u8, g: u8, b: u8) -> Self { Rgb { r, g, b } }

    /// Pack as opaque `0xFFRRGGBB`.
    pub fn to_argb(self) -> u32 {
        0xFF00_0000 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub fn from_argb(argb: u32) -> Self {
        Rgb::new((argb >> 16) as u8, (argb >> 8) as u8, argb as u8)
    }

    /// Every channel multiplied by `k` (clamped to 0–1).
    pub fn scaled(self, k: f32) -> Rgb {
        let k = k.clamp(0.0, 1.0);
        let s = |c: u8| (c as f32 * k).round() as u8;
        Rgb::new(s(self.r), s(self.g), s(self.b))
    }
}

impl Default for Rgb {
    fn default() -> Self { Rgb::CYAN }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    /// Accepts `#rrggbb` or bare `rrggbb`, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let hex = t.strip_prefix('#').unwrap_or(t);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorParseError(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ColorParseError(s.to_string()))
        };
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Presets
// ════════════════════════════════════════════════════════════════════════════

/// Number of colours in the `C`-key cycle.
pub const PRESET_COUNT: usize = 8;

/// Preset `i` (wrapping): cyan, six hues 60° apart, then white.
pub fn preset(i: usize) -> Rgb {
    match i % PRESET_COUNT {
        0 => Rgb::CYAN,
        k if k == PRESET_COUNT - 1 => Rgb::WHITE,
        k => hsv_to_rgb((k - 1) as f32 * 60.0, 0.75, 1.0),
    }
}

/// The preset after `current`; colours outside the cycle restart it at cyan.
pub fn next_preset(current: Rgb) -> Rgb {
    match (0..PRESET_COUNT).find(|&i| preset(i) == current) {
        Some(i) => preset(i + 1),
        None    => preset(0),
    }
}

/// HSV (h in degrees, s/v in 0–1) → RGB.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb {
    let h  = h.rem_euclid(360.0);
    let hi = (h / 60.0) as u32;
    let f  = h / 60.0 - hi as f32;
    let p  = v * (1.0 - s);
    let q  = v * (1.0 - s * f);
    let t  = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match hi {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let c = |x: f32| (x.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb::new(c(r), c(g), c(b))
}

// ════════════════════════════════════════════════════════════════════════════
// Pixel arithmetic
// ════════════════════════════════════════════════════════════════════════════

/// Additive blend of two packed pixels, saturating per channel.
pub fn add_argb(dst: u32, src: u32) -> u32 {
    let ch = |shift: u32| (((dst >> shift) & 0xFF) + ((src >> shift) & 0xFF)).min(0xFF) << shift;
    0xFF00_0000 | ch(16) | ch(8) | ch(0)
}

/// Linear blend. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
pub fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |shift: u32| {
        let ca = ((a >> shift) & 0xFF) as f32;
        let cb = ((b >> shift) & 0xFF) as f32;
        ((ca * (1.0 - t) + cb * t) as u32) << shift
    };
    0xFF00_0000 | lerp(16) | lerp(8) | lerp(0)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_with_and_without_hash() {
        assert_eq!("#00ffff".parse::<Rgb>().unwrap(), Rgb::CYAN);
        assert_eq!("FF8000".parse::<Rgb>().unwrap(), Rgb::new(255, 128, 0));
        assert_eq!(" #0a0B0c ".parse::<Rgb>().unwrap(), Rgb::new(10, 11, 12));
    }

    #[test]
    fn rejects_malformed_hex() {
        for bad in ["", "#", "#12345", "#1234567", "#gg0000", "red", "#+12345"] {
            assert!(bad.parse::<Rgb>().is_err(), "{:?} should not parse", bad);
        }
    }

    #[test]
    fn display_is_lowercase_hex() {
        assert_eq!(Rgb::new(0xAB, 0x01, 0xFF).to_string(), "#ab01ff");
        assert_eq!(Rgb::default().to_string(), "#00ffff");
    }

    #[test]
    fn argb_packing() {
        assert_eq!(Rgb::CYAN.to_argb(), 0xFF00FFFF);
        assert_eq!(Rgb::from_argb(0xFF123456), Rgb::new(0x12, 0x34, 0x56));
    }

    #[test]
    fn scaled_dims_channels() {
        assert_eq!(Rgb::new(200, 100, 0).scaled(0.5), Rgb::new(100, 50, 0));
        assert_eq!(Rgb::WHITE.scaled(2.0), Rgb::WHITE);
    }

    #[test]
    fn presets_cycle_back_to_cyan() {
        let mut c = Rgb::CYAN;
        let mut seen = Vec::new();
        for _ in 0..PRESET_COUNT {
            seen.push(c);
            c = next_preset(c);
        }
        assert_eq!(c, Rgb::CYAN);
        seen.sort_by_key(|c| c.to_argb());
        seen.dedup();
        assert_eq!(seen.len(), PRESET_COUNT, "presets must be distinct");
    }

    #[test]
    fn foreign_colour_restarts_cycle() {
        assert_eq!(next_preset(Rgb::new(1, 2, 3)), Rgb::CYAN);
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0,   1.0, 1.0), Rgb::new(255, 0, 0));
        assert_eq!(hsv_to_rgb(120.0, 1.0, 1.0), Rgb::new(0, 255, 0));
        assert_eq!(hsv_to_rgb(240.0, 1.0, 1.0), Rgb::new(0, 0, 255));
    }

    #[test]
    fn additive_blend_saturates() {
        assert_eq!(add_argb(0xFF050505, 0xFF102030), 0xFF152535);
        assert_eq!(add_argb(0xFFF0F0F0, 0xFF202020), 0xFFFFFFFF);
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 0.0), 0xFF000000);
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 1.0), 0xFFFFFFFF);
    }
}
