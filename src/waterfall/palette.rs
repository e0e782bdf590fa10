/// Palettes for the waterfall and the fixed signal strength scale
///
/// Named scales are gradient stop tables following the well known plotting
/// color maps. `ent3r_the_matrix` is reserved for a custom four color
/// green on black gradient.

use plotters::style::RGBColor;

/// Weakest signal that still gets its own color
pub const SCALE_MIN_DBM: f64 = -90.0;
/// Strongest signal that still gets its own color
pub const SCALE_MAX_DBM: f64 = -20.0;

pub const MATRIX_PALETTE_NAME: &str = "ent3r_the_matrix";

const fn hex(rgb: u32) -> RGBColor {
    RGBColor((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

const MATRIX_STOPS: [RGBColor; 4] = [hex(0x0D0208), hex(0x003B00), hex(0x008F11), hex(0x00FF41)];

const CMRMAP: [(f64, RGBColor); 9] = [
    (0.0, hex(0x000000)),
    (0.125, hex(0x262680)),
    (0.25, hex(0x4d26bf)),
    (0.375, hex(0x993380)),
    (0.5, hex(0xff4026)),
    (0.625, hex(0xe68000)),
    (0.75, hex(0xe6bf1a)),
    (0.875, hex(0xe6e680)),
    (1.0, hex(0xffffff)),
];

const SPECTRAL: [(f64, RGBColor); 11] = [
    (0.0, hex(0x9e0142)),
    (0.1, hex(0xd53e4f)),
    (0.2, hex(0xf46d43)),
    (0.3, hex(0xfdae61)),
    (0.4, hex(0xfee08b)),
    (0.5, hex(0xffffbf)),
    (0.6, hex(0xe6f598)),
    (0.7, hex(0xabdda4)),
    (0.8, hex(0x66c2a5)),
    (0.9, hex(0x3288bd)),
    (1.0, hex(0x5e4fa2)),
];

const HOT: [(f64, RGBColor); 4] = [
    (0.0, hex(0x0b0000)),
    (0.365, hex(0xff0000)),
    (0.746, hex(0xffff00)),
    (1.0, hex(0xffffff)),
];

const JET: [(f64, RGBColor); 6] = [
    (0.0, hex(0x000080)),
    (0.125, hex(0x0000ff)),
    (0.375, hex(0x00ffff)),
    (0.625, hex(0xffff00)),
    (0.875, hex(0xff0000)),
    (1.0, hex(0x800000)),
];

const PLASMA: [(f64, RGBColor); 10] = [
    (0.0, hex(0x0d0887)),
    (0.111, hex(0x46039f)),
    (0.222, hex(0x7201a8)),
    (0.333, hex(0x9c179e)),
    (0.444, hex(0xbd3786)),
    (0.556, hex(0xd8576b)),
    (0.667, hex(0xed7953)),
    (0.778, hex(0xfb9f3a)),
    (0.889, hex(0xfdca26)),
    (1.0, hex(0xf0f921)),
];

const VIRIDIS: [(f64, RGBColor); 10] = [
    (0.0, hex(0x440154)),
    (0.111, hex(0x482878)),
    (0.222, hex(0x3e4989)),
    (0.333, hex(0x31688e)),
    (0.444, hex(0x26828e)),
    (0.556, hex(0x1f9e89)),
    (0.667, hex(0x35b779)),
    (0.778, hex(0x6ece58)),
    (0.889, hex(0xb5de2b)),
    (1.0, hex(0xfde725)),
];

const WINTER_R: [(f64, RGBColor); 2] = [(0.0, hex(0x00ff80)), (1.0, hex(0x0000ff))];

/// The palettes a user can pick from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum Palette {
    #[value(name = "CMRmap")]
    CmrMap,
    #[value(name = "Spectral")]
    Spectral,
    #[value(name = "hot")]
    Hot,
    #[value(name = "jet")]
    Jet,
    #[value(name = "plasma")]
    Plasma,
    #[default]
    #[value(name = "viridis")]
    Viridis,
    #[value(name = "winter_r")]
    WinterR,
    #[value(name = "ent3r_the_matrix")]
    Matrix,
}

impl Palette {
    /// Every palette in selector order
    pub const ALL: [Palette; 8] = [
        Palette::CmrMap,
        Palette::Spectral,
        Palette::Hot,
        Palette::Jet,
        Palette::Plasma,
        Palette::Viridis,
        Palette::WinterR,
        Palette::Matrix,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::CmrMap => "CMRmap",
            Self::Spectral => "Spectral",
            Self::Hot => "hot",
            Self::Jet => "jet",
            Self::Plasma => "plasma",
            Self::Viridis => "viridis",
            Self::WinterR => "winter_r",
            Self::Matrix => MATRIX_PALETTE_NAME,
        }
    }

    /// Is this the reserved custom gradient rather than a named scale
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Matrix)
    }

    pub fn next(&self) -> Palette {
        let i = self.index();
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn previous(&self) -> Palette {
        let i = self.index();
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).unwrap_or(0)
    }

    /// Build the gradient this palette draws with
    pub fn gradient(&self) -> Gradient {
        match self {
            Self::CmrMap => Gradient::from_stops(&CMRMAP),
            Self::Spectral => Gradient::from_stops(&SPECTRAL),
            Self::Hot => Gradient::from_stops(&HOT),
            Self::Jet => Gradient::from_stops(&JET),
            Self::Plasma => Gradient::from_stops(&PLASMA),
            Self::Viridis => Gradient::from_stops(&VIRIDIS),
            Self::WinterR => Gradient::from_stops(&WINTER_R),
            Self::Matrix => Gradient::matrix(),
        }
    }
}

impl std::fmt::Display for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Piecewise linear gradient over `0.0..=1.0`
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    stops: Vec<(f64, RGBColor)>,
}

impl Gradient {
    pub fn from_stops(stops: &[(f64, RGBColor)]) -> Self {
        Gradient { stops: stops.to_vec() }
    }

    /// Evenly spaced stops from the first color to the last
    pub fn evenly_spaced(colors: &[RGBColor]) -> Self {
        let last = colors.len().saturating_sub(1).max(1) as f64;
        let stops = colors
            .iter()
            .enumerate()
            .map(|(i, c)| (i as f64 / last, *c))
            .collect();

        Gradient { stops }
    }

    /// The fixed green on black gradient behind `ent3r_the_matrix`
    pub fn matrix() -> Self {
        Self::evenly_spaced(&MATRIX_STOPS)
    }

    /// Color at position `t`, clamped to the gradient ends
    pub fn color_at(&self, t: f64) -> RGBColor {
        let (first, last) = match (self.stops.first(), self.stops.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return RGBColor(0, 0, 0),
        };

        if t.is_nan() || t <= first.0 {
            return first.1;
        }
        if t >= last.0 {
            return last.1;
        }

        for pair in self.stops.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if t <= hi.0 {
                let span = hi.0 - lo.0;
                let frac = if span > 0.0 { (t - lo.0) / span } else { 1.0 };
                return lerp(lo.1, hi.1, frac);
            }
        }

        last.1
    }
}

fn lerp(a: RGBColor, b: RGBColor, frac: f64) -> RGBColor {
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Maps signal strength onto a palette over a fixed range
#[derive(Debug, Clone)]
pub struct ColorScale {
    gradient: Gradient,
    min: f64,
    max: f64,
}

impl ColorScale {
    pub fn new(palette: Palette, min: f64, max: f64) -> Self {
        ColorScale { gradient: palette.gradient(), min, max }
    }

    /// Color for a signal strength, values outside the range clamp
    pub fn color(&self, value: f64) -> RGBColor {
        let range = self.max - self.min;
        if range.abs() < f64::EPSILON {
            return self.gradient.color_at(0.5);
        }

        self.gradient.color_at(((value - self.min) / range).clamp(0.0, 1.0))
    }
}
