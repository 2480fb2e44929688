//! Continuous color interpolation over a fixed ramp.

use crate::error::ColorError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Fill used for regions without a usable value.
pub const NO_DATA_COLOR: Rgb = Rgb::new(0xd9, 0xd9, 0xd9);

/// Light-to-dark reds used by every continuous panel.
pub const DEFAULT_RAMP: [Rgb; 5] = [
    Rgb::new(0xfe, 0xe5, 0xd9),
    Rgb::new(0xfc, 0xae, 0x91),
    Rgb::new(0xfb, 0x6a, 0x4a),
    Rgb::new(0xde, 0x2d, 0x26),
    Rgb::new(0xa5, 0x0f, 0x15),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Blend channel-wise towards `other`, rounding to the nearest integer.
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let channel = |a: u8, b: u8| {
            let v = a as f64 + (b as f64 - a as f64) * t;
            v.round().clamp(0.0, 255.0) as u8
        };
        Rgb::new(
            channel(self.r, other.r),
            channel(self.g, other.g),
            channel(self.b, other.b),
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColorError::InvalidHex(s.to_string()));
        }
        let byte = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ColorError::InvalidHex(s.to_string()))
        };
        Ok(Rgb::new(byte(0)?, byte(2)?, byte(4)?))
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Whether values are plain magnitudes or fractions shown as percentages.
///
/// Only legend labels care; interpolation treats both the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueScale {
    Absolute,
    Percentage,
}

/// Ordered anchor colors, at least two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorRamp {
    anchors: Vec<Rgb>,
}

impl ColorRamp {
    pub fn new(anchors: Vec<Rgb>) -> Result<Self, ColorError> {
        if anchors.len() < 2 {
            return Err(ColorError::RampTooShort(anchors.len()));
        }
        Ok(Self { anchors })
    }

    pub fn anchors(&self) -> &[Rgb] {
        &self.anchors
    }

    pub fn first(&self) -> Rgb {
        self.anchors[0]
    }

    pub fn last(&self) -> Rgb {
        self.anchors[self.anchors.len() - 1]
    }

    /// Color at normalized position `t` in `[0, 1]`.
    pub fn sample(&self, t: f64) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let last = self.anchors.len() - 1;
        let position = t * last as f64;
        let i = (position.floor() as usize).min(last);
        let j = (i + 1).min(last);
        self.anchors[i].lerp(self.anchors[j], position - i as f64)
    }

    /// CSS gradient for a vertical legend bar, light at the top.
    pub fn css_gradient(&self) -> String {
        let stops: Vec<String> = self.anchors.iter().map(Rgb::to_string).collect();
        format!("linear-gradient(to bottom, {})", stops.join(", "))
    }
}

impl Default for ColorRamp {
    fn default() -> Self {
        Self {
            anchors: DEFAULT_RAMP.to_vec(),
        }
    }
}

/// `min`/`max` over the finite values, `None` when nothing is left.
pub fn value_domain<I>(values: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Value-to-color mapping over the observed domain of one indicator.
#[derive(Debug, Clone)]
pub struct Palette {
    domain: Option<(f64, f64)>,
    ramp: ColorRamp,
    scale: ValueScale,
}

impl Palette {
    pub fn build<I>(values: I, scale: ValueScale) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        Self::with_ramp(values, scale, ColorRamp::default())
    }

    pub fn with_ramp<I>(values: I, scale: ValueScale, ramp: ColorRamp) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        Self {
            domain: value_domain(values),
            ramp,
            scale,
        }
    }

    pub fn domain(&self) -> Option<(f64, f64)> {
        self.domain
    }

    pub fn ramp(&self) -> &ColorRamp {
        &self.ramp
    }

    pub fn scale(&self) -> ValueScale {
        self.scale
    }

    pub fn color(&self, value: Option<f64>) -> Rgb {
        let (Some((min, max)), Some(value)) = (self.domain, value) else {
            return NO_DATA_COLOR;
        };
        if value.is_nan() {
            return NO_DATA_COLOR;
        }
        let clamped = value.clamp(min, max);
        let t = if max > min { (clamped - min) / (max - min) } else { 0.0 };
        self.ramp.sample(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reds(values: &[f64]) -> Palette {
        Palette::build(values.iter().copied().map(Some), ValueScale::Absolute)
    }

    #[test]
    fn hex_parsing_and_formatting() {
        let c: Rgb = "#FB6A4A".parse().unwrap();
        assert_eq!(c, Rgb::new(0xfb, 0x6a, 0x4a));
        assert_eq!(c.to_string(), "#fb6a4a");
        assert_eq!("2e7d32".parse::<Rgb>().unwrap(), Rgb::new(0x2e, 0x7d, 0x32));
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#zzzzzz".parse::<Rgb>().is_err());
    }

    #[test]
    fn ramp_needs_two_anchors() {
        assert_eq!(
            ColorRamp::new(vec![NO_DATA_COLOR]),
            Err(ColorError::RampTooShort(1))
        );
    }

    #[test]
    fn domain_ends_hit_first_and_last_anchor() {
        let p = reds(&[3.0, 10.0, 7.5]);
        assert_eq!(p.color(Some(3.0)), DEFAULT_RAMP[0]);
        assert_eq!(p.color(Some(10.0)), DEFAULT_RAMP[4]);
    }

    #[test]
    fn values_between_anchors_blend_linearly() {
        let p = reds(&[0.0, 4.0]);
        // Exactly on the second anchor.
        assert_eq!(p.color(Some(1.0)), DEFAULT_RAMP[1]);
        // Halfway between #fee5d9 and #fcae91.
        assert_eq!(p.color(Some(0.5)), Rgb::new(0xfd, 0xca, 0xb5));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let p = reds(&[10.0, 20.0]);
        assert_eq!(p.color(Some(-5.0)), DEFAULT_RAMP[0]);
        assert_eq!(p.color(Some(99.0)), DEFAULT_RAMP[4]);
    }

    #[test]
    fn missing_values_are_gray() {
        let p = reds(&[1.0, 2.0]);
        assert_eq!(p.color(None), NO_DATA_COLOR);
        assert_eq!(p.color(Some(f64::NAN)), NO_DATA_COLOR);
    }

    #[test]
    fn empty_domain_is_constant_gray() {
        let p = Palette::build(Vec::new(), ValueScale::Percentage);
        assert_eq!(p.domain(), None);
        assert_eq!(p.color(Some(0.3)), NO_DATA_COLOR);

        let only_nulls = Palette::build(vec![None, Some(f64::NAN)], ValueScale::Absolute);
        assert_eq!(only_nulls.color(Some(1.0)), NO_DATA_COLOR);
    }

    #[test]
    fn degenerate_domain_uses_first_anchor() {
        let p = reds(&[42.0, 42.0]);
        assert_eq!(p.color(Some(42.0)), DEFAULT_RAMP[0]);
        assert_eq!(p.color(Some(50.0)), DEFAULT_RAMP[0]);
    }

    #[test]
    fn scale_does_not_change_colors() {
        let values = [Some(0.1), Some(0.4), None];
        let a = Palette::build(values, ValueScale::Absolute);
        let b = Palette::build(values, ValueScale::Percentage);
        assert_eq!(a.color(Some(0.25)), b.color(Some(0.25)));
    }

    #[test]
    fn gradient_lists_every_anchor() {
        assert_eq!(
            ColorRamp::default().css_gradient(),
            "linear-gradient(to bottom, #fee5d9, #fcae91, #fb6a4a, #de2d26, #a50f15)"
        );
    }
}
