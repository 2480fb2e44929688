use crate::classify::{classify, Classification};
use crate::color::ValueScale;
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Numeric department code (`DPTO_CCDGO` parsed, so `"05"` is 5).
pub type RegionCode = u32;

pub const INDEX_KEY: &str = "Indice";
pub const RANK_KEY: &str = "Ranking";
pub const CLASSIFICATION_KEY: &str = "Clasificacion_Indice";

/// One of the three independent map displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Panel {
    #[serde(rename = "main")]
    Main,
    #[serde(rename = "compareVul")]
    CompareVul,
    #[serde(rename = "compareNut")]
    CompareNut,
}

impl Panel {
    pub const ALL: [Panel; 3] = [Panel::Main, Panel::CompareVul, Panel::CompareNut];

    pub fn key(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::CompareVul => "compareVul",
            Self::CompareNut => "compareNut",
        }
    }

    /// The nutrition panel reads the nutrition dataset; the others the index dataset.
    pub fn is_nutrition(self) -> bool {
        self == Self::CompareNut
    }

    pub fn scale(self) -> ValueScale {
        if self.is_nutrition() {
            ValueScale::Percentage
        } else {
            ValueScale::Absolute
        }
    }

    /// The other comparison panel, whose popups and view follow this one.
    pub fn peer(self) -> Option<Panel> {
        match self {
            Self::Main => None,
            Self::CompareVul => Some(Self::CompareNut),
            Self::CompareNut => Some(Self::CompareVul),
        }
    }

    /// Whether `indicator` is drawn with the fixed severity classes here.
    pub fn uses_classes(self, indicator: &str) -> bool {
        self == Self::Main && indicator == INDEX_KEY
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Panel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.key() == s)
            .ok_or_else(|| format!("unknown panel: {s}"))
    }
}

/// A department boundary joined to its code and display name.
#[derive(Debug, Clone)]
pub struct Department {
    pub code: RegionCode,
    /// Raw code as it appears in the boundary file.
    pub raw_code: String,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// Geographic extent in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }
}

/// Indicator values of one region, in the order the dataset lists them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorRecord {
    values: Vec<(String, Option<f64>)>,
    classification: Option<Classification>,
}

impl IndicatorRecord {
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Option<f64>)>) -> Self {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            classification: None,
        }
    }

    /// Non-numeric entries load as absent. A stored classification label is
    /// dropped; it is derived from the index instead.
    pub fn from_json(object: &Map<String, Value>) -> Self {
        let values = object
            .iter()
            .filter(|(key, _)| key.as_str() != CLASSIFICATION_KEY)
            .map(|(key, value)| (key.clone(), value.as_f64().filter(|v| v.is_finite())))
            .collect();
        Self {
            values,
            classification: None,
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| *v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(k, _)| k.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Keys of the per-dimension breakdown: everything but index, rank and class.
    pub fn dimension_entries(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.entries()
            .filter(|(k, _)| ![INDEX_KEY, RANK_KEY, CLASSIFICATION_KEY].contains(k))
    }

    pub fn classification(&self) -> Option<Classification> {
        self.classification
    }

    /// Derive and cache the severity class from the composite index.
    pub fn classify_index(&mut self) {
        self.classification = classify(self.get(INDEX_KEY));
    }
}

/// Records of one dataset keyed by region.
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    records: BTreeMap<RegionCode, IndicatorRecord>,
    /// Code of the first record in file order.
    first: Option<RegionCode>,
}

impl RegionTable {
    pub fn new(records: Vec<(RegionCode, IndicatorRecord)>) -> Self {
        let first = records.first().map(|(code, _)| *code);
        Self {
            records: records.into_iter().collect(),
            first,
        }
    }

    pub fn get(&self, code: RegionCode) -> Option<&IndicatorRecord> {
        self.records.get(&code)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RegionCode, &IndicatorRecord)> {
        self.records.iter().map(|(code, r)| (*code, r))
    }

    /// Record whose keys name the selectable indicators.
    pub fn first_record(&self) -> Option<&IndicatorRecord> {
        self.first.and_then(|code| self.records.get(&code))
    }

    /// Every region's value for one indicator, missing ones included.
    pub fn values(&self, indicator: &str) -> Vec<Option<f64>> {
        self.records.values().map(|r| r.get(indicator)).collect()
    }

    pub fn classify_all(&mut self) {
        for record in self.records.values_mut() {
            record.classify_index();
        }
    }
}
