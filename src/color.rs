use std::fmt;

pub type Rgb = (u8, u8, u8);

// Palette lifted from "The Starry Night"
pub const STARRY_NIGHT: [Rgb; 5] = [
    (255, 210, 125), // Yellow
    (100, 149, 237), // Cornflower blue
    (255, 255, 255), // White
    (70, 130, 180),  // Steel blue
    (135, 206, 250), // Light sky blue
];

// Brighter set used by the pointer trail
pub const TRAIL: [Rgb; 5] = [
    (255, 223, 186), // Pale gold
    (173, 216, 230), // Light blue
    (255, 255, 255), // White
    (135, 206, 250), // Sky blue
    (221, 160, 221), // Plum
];

pub const WHITE: Rgb = (255, 255, 255);

/// A color channel tuple together with its straight (non-premultiplied) alpha.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub rgb: Rgb,
    pub alpha: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba {
        rgb: (0, 0, 0),
        alpha: 0.0,
    };

    pub const fn new(rgb: Rgb, alpha: f32) -> Self {
        Self { rgb, alpha }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            rgb: self.rgb,
            alpha,
        }
    }

    /// Multiplies the alpha, the way a canvas global alpha would.
    pub fn fade(self, factor: f32) -> Self {
        self.with_alpha(self.alpha * factor)
    }
}

impl From<Rgb> for Rgba {
    fn from(rgb: Rgb) -> Self {
        Self::new(rgb, 1.0)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rgba({}, {}, {}, {})",
            self.rgb.0, self.rgb.1, self.rgb.2, self.alpha
        )
    }
}

/// Channel-wise blend of two colors, floored like canvas color math.
pub fn lerp_rgb(from: Rgb, to: Rgb, t: f32) -> Rgb {
    let mix = |a: u8, b: u8| (a as f32 * (1.0 - t) + b as f32 * t).floor().clamp(0.0, 255.0) as u8;
    (mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

/// Samples `palette` at a fractional position. The position wraps, so `0.0`
/// and `1.0` land on the same entry and values past the end cycle around.
pub fn palette_at(palette: &[Rgb], position: f32) -> Rgb {
    if palette.is_empty() {
        return WHITE;
    }
    let len = palette.len();
    let scaled = position.rem_euclid(1.0) * len as f32;
    let index = (scaled.floor() as usize).min(len - 1);
    let next = (index + 1) % len;
    lerp_rgb(palette[index], palette[next], scaled - index as f32)
}

pub fn random_from(palette: &[Rgb]) -> Rgb {
    palette[fastrand::usize(..palette.len())]
}
