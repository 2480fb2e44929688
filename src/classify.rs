//! Severity classes of the composite vulnerability index.

use crate::color::Rgb;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Classification {
    #[serde(rename = "Mínima")]
    Minima,
    #[serde(rename = "Baja")]
    Baja,
    #[serde(rename = "Media")]
    Media,
    #[serde(rename = "Alta")]
    Alta,
    #[serde(rename = "Crítica")]
    Critica,
}

impl Classification {
    /// All classes from least to most severe.
    pub const ALL: [Classification; 5] = [
        Classification::Minima,
        Classification::Baja,
        Classification::Media,
        Classification::Alta,
        Classification::Critica,
    ];

    /// Inclusive lower bound of the band.
    pub fn lower_bound(self) -> f64 {
        match self {
            Self::Minima => 0.0,
            Self::Baja => 15.0,
            Self::Media => 30.0,
            Self::Alta => 50.0,
            Self::Critica => 65.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Minima => "Mínima",
            Self::Baja => "Baja",
            Self::Media => "Media",
            Self::Alta => "Alta",
            Self::Critica => "Crítica",
        }
    }

    pub fn range_text(self) -> &'static str {
        match self {
            Self::Minima => "0-14",
            Self::Baja => "15-29",
            Self::Media => "30-49",
            Self::Alta => "50-64",
            Self::Critica => "65-100",
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            Self::Minima => Rgb::new(0x2e, 0x7d, 0x32),
            Self::Baja => Rgb::new(0x8b, 0xc3, 0x4a),
            Self::Media => Rgb::new(0xf9, 0xa8, 0x25),
            Self::Alta => Rgb::new(0xe6, 0x45, 0x19),
            Self::Critica => Rgb::new(0xb3, 0x00, 0x00),
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

/// Band for an index value; `None` for missing or non-finite values.
///
/// Anything below the first threshold, negatives included, is `Minima`.
pub fn classify(value: Option<f64>) -> Option<Classification> {
    let value = value.filter(|v| v.is_finite())?;
    let class = Classification::ALL
        .into_iter()
        .rev()
        .find(|c| value >= c.lower_bound())
        .unwrap_or(Classification::Minima);
    Some(class)
}
