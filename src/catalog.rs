//! Indicator metadata: display names, weights, selector entries and the
//! descriptive story block shown next to the map.

use crate::legend::escape_html;
use crate::types::{IndicatorRecord, CLASSIFICATION_KEY, INDEX_KEY, RANK_KEY};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write;

/// Metadata key under which the composite index is described.
pub const INDEX_METADATA_KEY: &str = "integrated";
pub const INDEX_DISPLAY_LABEL: &str = "Índice Integrado";

/// Nutrition indicators offered on the comparison panel, in menu order.
pub const NUTRITION_INDICATORS: [(&str, &str); 5] = [
    ("ENSIN", "Desnutrición Crónica (ENSIN)"),
    ("Cronica", "Desnutrición Crónica (ICBF)"),
    ("R_Cronica", "Riesgo Desnutrición Crónica (ICBF)"),
    ("Aguda", "Desnutrición Aguda (ICBF)"),
    ("R_Aguda", "Riesgo Desnutrición Aguda (ICBF)"),
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndicatorMeta {
    #[serde(rename = "nombreCompleto")]
    pub full_name: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(rename = "evidencias", default)]
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Variable {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "peso", default)]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Evidence {
    #[serde(rename = "nombre")]
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DimensionWeight {
    #[serde(rename = "Dimension")]
    pub dimension: String,
    #[serde(rename = "Peso_Dimension")]
    pub weight: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WeightTable {
    #[serde(rename = "Pesos_Dimensiones", default)]
    pub dimensions: Vec<DimensionWeight>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub year: Option<serde_json::Value>,
}

impl SiteConfig {
    pub fn year_text(&self) -> Option<String> {
        match self.year.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorEntry {
    pub key: String,
    pub label: String,
    pub display_name: String,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub indicators: HashMap<String, IndicatorMeta>,
    pub weights: WeightTable,
    pub site: SiteConfig,
}

impl Catalog {
    fn meta(&self, indicator: &str) -> Option<&IndicatorMeta> {
        let key = if indicator == INDEX_KEY {
            INDEX_METADATA_KEY
        } else {
            indicator
        };
        self.indicators.get(key)
    }

    /// Full name from metadata, else the key with underscores as spaces.
    pub fn display_name(&self, indicator: &str) -> String {
        self.meta(indicator)
            .map(|m| m.full_name.clone())
            .unwrap_or_else(|| indicator.replace('_', " "))
    }

    pub fn weight(&self, indicator: &str) -> Option<f64> {
        self.weights
            .dimensions
            .iter()
            .find(|d| d.dimension == indicator)
            .map(|d| d.weight)
    }

    /// Primary panel menu: index first, then heaviest dimension first.
    pub fn selector_entries(&self, sample: &IndicatorRecord) -> Vec<SelectorEntry> {
        let mut keys = selectable_keys(sample);
        keys.sort_by(|a, b| match (*a == INDEX_KEY, *b == INDEX_KEY) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => {
                let wa = self.weight(a).unwrap_or(0.0);
                let wb = self.weight(b).unwrap_or(0.0);
                wb.total_cmp(&wa)
            }
        });

        keys.into_iter()
            .map(|key| {
                let weight = self.weight(key);
                let display_name = self.display_name(key);
                let label = if key == INDEX_KEY {
                    INDEX_DISPLAY_LABEL.to_string()
                } else {
                    match weight.filter(|w| *w != 0.0) {
                        Some(w) => format!("{} ({:.1}%)", display_name, w * 100.0),
                        None => display_name.clone(),
                    }
                };
                SelectorEntry {
                    key: key.to_string(),
                    label,
                    display_name,
                    weight,
                }
            })
            .collect()
    }

    /// Comparison panel menu: the same keys in dataset order.
    pub fn comparison_entries(&self, sample: &IndicatorRecord) -> Vec<(String, String)> {
        selectable_keys(sample)
            .into_iter()
            .map(|key| (key.to_string(), self.display_name(key)))
            .collect()
    }

    /// HTML block describing an indicator and its suggested actions.
    pub fn story(&self, indicator: &str) -> String {
        let Some(meta) = self.meta(indicator) else {
            return "<p>No hay descripción disponible para este indicador.</p>".to_string();
        };

        let is_index = indicator == INDEX_KEY;
        let mut html = format!("<h3>{}</h3>", escape_html(&meta.full_name));
        if let Some(description) = &meta.description {
            let _ = write!(html, "<p>{}</p>", escape_html(description));
        }
        if !meta.variables.is_empty() {
            let title = if is_index {
                "Dimensiones Incluidas (y sus pesos)"
            } else {
                "Variables Incluidas"
            };
            let _ = write!(html, "<div class=\"section-title\">{title}:</div><ul>");
            for v in &meta.variables {
                match v.weight.filter(|w| *w != 0.0 && w.is_finite()) {
                    Some(w) => {
                        let _ = write!(html, "<li>{} ({:.1}%)</li>", escape_html(&v.name), w * 100.0);
                    }
                    None => {
                        let _ = write!(html, "<li>{}</li>", escape_html(&v.name));
                    }
                }
            }
            html.push_str("</ul>");
        }
        if !meta.evidence.is_empty() {
            let title = if is_index { "Leer Más" } else { "Ruta de Acciones Sugeridas" };
            let _ = write!(html, "<div class=\"section-title\">{title}:</div><ul>");
            for e in &meta.evidence {
                let _ = write!(
                    html,
                    "<li><a href=\"{}\" target=\"_blank\">{}</a></li>",
                    escape_html(&e.url),
                    escape_html(&e.name)
                );
            }
            html.push_str("</ul>");
        }
        html
    }

    pub fn footer(&self) -> String {
        match self.site.year_text() {
            Some(year) => format!("Última actualización: Octubre {year}"),
            None => "Última actualización: Octubre".to_string(),
        }
    }
}

/// Display name of a nutrition indicator, falling back to the key.
pub fn nutrition_display_name(indicator: &str) -> String {
    NUTRITION_INDICATORS
        .iter()
        .find(|(key, _)| *key == indicator)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| indicator.replace('_', " "))
}

fn selectable_keys(sample: &IndicatorRecord) -> Vec<&str> {
    sample
        .keys()
        .filter(|k| *k != RANK_KEY && *k != CLASSIFICATION_KEY)
        .collect()
}
