use std::fmt;
use std::str::FromStr;

use image::Rgb;
use log::warn;
use palette::{LinSrgb, Mix, Srgb};

// Color definitions for named colors (RGB format)
const COLOR_MAP: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("gray", [128, 128, 128]),
    ("red", [255, 0, 0]),
    ("green", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("cyan", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
];

/// Parse a color name to RGB values
pub fn parse_color(color_name: &str) -> Rgb<u8> {
    for &(name, color) in COLOR_MAP {
        if name.eq_ignore_ascii_case(color_name) {
            return Rgb(color);
        }
    }
    // Default to white if color not found
    warn!("Color '{}' not recognized, using white.", color_name);
    Rgb([255, 255, 255])
}

/// Black text on light backgrounds, white text on dark ones.
pub fn contrasting_text(bg: Rgb<u8>) -> Rgb<u8> {
    let [r, g, b] = bg.0;
    let luminance = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    if luminance > 128.0 {
        Rgb([0, 0, 0])
    } else {
        Rgb([255, 255, 255])
    }
}

/// Color used for NaN and infinite cells.
pub const INVALID_COLOR: Rgb<u8> = Rgb([160, 160, 160]);

/// Selects which color palette to use for field rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Colormap {
    /// Perceptually uniform dark purple -> teal -> yellow.
    Viridis,
    /// Black -> purple -> orange -> pale yellow.
    Magma,
    /// Diverging blue -> white -> red for signed data such as vorticity.
    BlueWhiteRed,
    Grayscale,
}

const VIRIDIS_STOPS: [[u8; 3]; 9] = [
    [68, 1, 84],
    [72, 40, 120],
    [62, 73, 137],
    [49, 104, 142],
    [38, 130, 142],
    [31, 158, 137],
    [53, 183, 121],
    [110, 206, 88],
    [253, 231, 37],
];

const MAGMA_STOPS: [[u8; 3]; 9] = [
    [0, 0, 4],
    [28, 16, 68],
    [79, 18, 123],
    [129, 37, 129],
    [181, 54, 122],
    [229, 80, 100],
    [251, 135, 97],
    [254, 194, 135],
    [252, 253, 191],
];

const BLUE_WHITE_RED_STOPS: [[u8; 3]; 5] = [
    [10, 30, 150],
    [80, 130, 230],
    [245, 245, 245],
    [230, 100, 70],
    [150, 20, 20],
];

const GRAYSCALE_STOPS: [[u8; 3]; 2] = [[0, 0, 0], [255, 255, 255]];

impl Colormap {
    fn stops(self) -> &'static [[u8; 3]] {
        match self {
            Colormap::Viridis => &VIRIDIS_STOPS,
            Colormap::Magma => &MAGMA_STOPS,
            Colormap::BlueWhiteRed => &BLUE_WHITE_RED_STOPS,
            Colormap::Grayscale => &GRAYSCALE_STOPS,
        }
    }

    /// Diverging maps are meant for ranges centered on zero.
    pub fn is_diverging(self) -> bool {
        self == Colormap::BlueWhiteRed
    }

    /// Convert a [0.0, 1.0] value to RGB, blending stops in linear light.
    pub fn map(self, t: f64) -> Rgb<u8> {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let seg = t * (stops.len() - 1) as f64;
        let i = (seg as usize).min(stops.len() - 2);
        let s = (seg - i as f64) as f32;

        let a = to_linear(stops[i]);
        let b = to_linear(stops[i + 1]);
        let mixed = Srgb::<f32>::from_linear(a.mix(b, s)).into_format::<u8>();
        Rgb([mixed.red, mixed.green, mixed.blue])
    }
}

fn to_linear(c: [u8; 3]) -> LinSrgb<f32> {
    Srgb::new(c[0], c[1], c[2]).into_format::<f32>().into_linear()
}

impl FromStr for Colormap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "viridis" => Ok(Colormap::Viridis),
            "magma" => Ok(Colormap::Magma),
            "bwr" | "blue-white-red" | "bluewhitered" => Ok(Colormap::BlueWhiteRed),
            "gray" | "grey" | "grayscale" => Ok(Colormap::Grayscale),
            other => Err(format!(
                "unknown colormap '{}' (expected viridis, magma, bwr or gray)",
                other
            )),
        }
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Colormap::Viridis => "viridis",
            Colormap::Magma => "magma",
            Colormap::BlueWhiteRed => "bwr",
            Colormap::Grayscale => "gray",
        };
        f.write_str(name)
    }
}

/// 256-entry lookup table sampled from a colormap.
pub struct ColorTable {
    entries: Vec<Rgb<u8>>,
}

impl ColorTable {
    pub const SIZE: usize = 256;

    pub fn new(colormap: Colormap) -> Self {
        let entries = (0..Self::SIZE)
            .map(|i| colormap.map(i as f64 / (Self::SIZE - 1) as f64))
            .collect();
        ColorTable { entries }
    }

    /// Color for `value` normalised into `[lo, hi]`.
    pub fn lookup(&self, value: f64, lo: f64, hi: f64) -> Rgb<u8> {
        if !value.is_finite() {
            return INVALID_COLOR;
        }
        let t = if hi > lo { (value - lo) / (hi - lo) } else { 0.5 };
        let idx = (t.clamp(0.0, 1.0) * (Self::SIZE - 1) as f64).round() as usize;
        self.entries[idx.min(Self::SIZE - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Rgb<u8>, b: [u8; 3]) -> bool {
        a.0.iter().zip(b.iter()).all(|(&x, &y)| (x as i32 - y as i32).abs() <= 1)
    }

    #[test]
    fn test_viridis_endpoints() {
        assert!(close(Colormap::Viridis.map(0.0), [68, 1, 84]));
        assert!(close(Colormap::Viridis.map(1.0), [253, 231, 37]));
        assert!(close(Colormap::Viridis.map(0.5), [38, 130, 142]));
    }

    #[test]
    fn test_map_clamps_out_of_range() {
        for cmap in [Colormap::Viridis, Colormap::Magma, Colormap::BlueWhiteRed, Colormap::Grayscale] {
            assert_eq!(cmap.map(-3.0), cmap.map(0.0));
            assert_eq!(cmap.map(7.0), cmap.map(1.0));
        }
    }

    #[test]
    fn test_bwr_midpoint_is_near_white() {
        let mid = Colormap::BlueWhiteRed.map(0.5);
        assert!(mid.0.iter().all(|&c| c >= 240));
        assert!(Colormap::BlueWhiteRed.is_diverging());
        assert!(!Colormap::Viridis.is_diverging());
    }

    #[test]
    fn test_gradient_continuity() {
        let steps = 256;
        for cmap in [Colormap::Viridis, Colormap::Magma] {
            for i in 1..steps {
                let c0 = cmap.map((i - 1) as f64 / (steps - 1) as f64);
                let c1 = cmap.map(i as f64 / (steps - 1) as f64);
                for ch in 0..3 {
                    let diff = (c1[ch] as i32 - c0[ch] as i32).abs();
                    assert!(diff <= 12, "{} channel {} jumped by {} at step {}", cmap, ch, diff, i);
                }
            }
        }
    }

    #[test]
    fn test_table_lookup_handles_degenerate_range_and_nan() {
        let table = ColorTable::new(Colormap::Grayscale);
        assert_eq!(table.lookup(f64::NAN, 0.0, 1.0), INVALID_COLOR);
        assert_eq!(table.lookup(1.0, 1.0, 1.0), table.lookup(0.5, 0.0, 1.0));
        assert_eq!(table.lookup(0.0, 0.0, 1.0), Rgb([0, 0, 0]));
        assert_eq!(table.lookup(1.0, 0.0, 1.0), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_colormap_names() {
        assert_eq!("Viridis".parse::<Colormap>(), Ok(Colormap::Viridis));
        assert_eq!("bwr".parse::<Colormap>(), Ok(Colormap::BlueWhiteRed));
        assert_eq!("grey".parse::<Colormap>(), Ok(Colormap::Grayscale));
        assert!("jet".parse::<Colormap>().is_err());
        assert_eq!(Colormap::Magma.to_string().parse::<Colormap>(), Ok(Colormap::Magma));
    }

    #[test]
    fn test_parse_color_and_text_contrast() {
        assert_eq!(parse_color("Black"), Rgb([0, 0, 0]));
        assert_eq!(parse_color("no-such-color"), Rgb([255, 255, 255]));
        assert_eq!(contrasting_text(Rgb([255, 255, 255])), Rgb([0, 0, 0]));
        assert_eq!(contrasting_text(Rgb([10, 10, 30])), Rgb([255, 255, 255]));
    }
}
