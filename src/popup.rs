//! Popup and tooltip text for a clicked or hovered region.

use crate::catalog::{nutrition_display_name, Catalog};
use crate::legend::escape_html;
use crate::types::{IndicatorRecord, Panel, INDEX_KEY, RANK_KEY};
use std::fmt::Write;

pub const NOT_AVAILABLE: &str = "No disponible";
pub const NO_RECORD: &str = "Datos no disponibles";
pub const UNNAMED_REGION: &str = "Nombre no disponible";

/// Popup body for one region on one panel.
///
/// Never fails: absent records and values render as placeholder text.
pub fn build_content(
    region_name: &str,
    record: Option<&IndicatorRecord>,
    indicator: &str,
    panel: Panel,
    catalog: &Catalog,
) -> String {
    let name = escape_html(region_name);
    let Some(record) = record else {
        return format!("<strong>{name}</strong><br>{NO_RECORD}");
    };

    if panel.is_nutrition() {
        let value = record
            .get(indicator)
            .filter(|v| v.is_finite())
            .map(|v| format!("{:.1}%", v * 100.0))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        return format!(
            "<strong>{name}</strong><br><b>{}:</b> {value}",
            escape_html(&nutrition_display_name(indicator))
        );
    }

    if indicator != INDEX_KEY {
        let value = fixed(record.get(indicator), 2);
        return format!(
            "<strong>{name}</strong><br><b>{}:</b> {value}",
            escape_html(&catalog.display_name(indicator))
        );
    }

    let index = fixed(record.get(INDEX_KEY), 1);
    let rank = record
        .get(RANK_KEY)
        .filter(|v| v.is_finite())
        .map(format_rank)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let class = record
        .classification()
        .map(|c| c.label())
        .unwrap_or(NOT_AVAILABLE);

    let mut table =
        String::from("<br><table class=\"popup-table\"><tr><th>Dimensión</th><th>Valor</th></tr>");
    for (dimension, value) in record.dimension_entries() {
        let _ = write!(
            table,
            "<tr><td>{}</td><td>{}</td></tr>",
            escape_html(&catalog.display_name(dimension)),
            fixed(value, 1)
        );
    }
    table.push_str("</table>");

    format!(
        "<strong>{name}</strong><br><b>Índice Integrado:</b> {index} ({class})<br><b>Ranking General:</b> {rank}{table}"
    )
}

/// Title-cased region name for tooltips.
pub fn tooltip_name(raw: Option<&str>) -> String {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        return UNNAMED_REGION.to_string();
    };
    raw.to_lowercase()
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn fixed(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.decimals$}"),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn format_rank(rank: f64) -> String {
    if rank.fract() == 0.0 {
        format!("{rank:.0}")
    } else {
        rank.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_record() -> IndicatorRecord {
        let mut r = IndicatorRecord::from_pairs([
            ("Indice", Some(42.3)),
            ("Ranking", Some(5.0)),
            ("Dim_A", Some(10.1)),
            ("Dim_B", Some(80.0)),
        ]);
        r.classify_index();
        r
    }

    #[test]
    fn composite_popup_has_summary_and_breakdown() {
        let html = build_content("Antioquia", Some(&index_record()), "Indice", Panel::Main, &Catalog::default());
        assert!(html.contains("<b>Índice Integrado:</b> 42.3 (Media)"));
        assert!(html.contains("<b>Ranking General:</b> 5<"));
        assert!(html.contains("<tr><td>Dim A</td><td>10.1</td></tr>"));
        assert!(html.contains("<tr><td>Dim B</td><td>80.0</td></tr>"));
        assert!(!html.contains("<td>Indice</td>"));
        assert!(!html.contains("<td>Ranking</td>"));
        assert_eq!(html.matches("<tr><td>").count(), 2);
    }

    #[test]
    fn single_indicator_uses_two_decimals() {
        let html = build_content("Huila", Some(&index_record()), "Dim_A", Panel::CompareVul, &Catalog::default());
        assert_eq!(html, "<strong>Huila</strong><br><b>Dim A:</b> 10.10");
    }

    #[test]
    fn nutrition_shows_percentages() {
        let record = IndicatorRecord::from_pairs([("Aguda", Some(0.0734)), ("Cronica", None)]);
        let html = build_content("Meta", Some(&record), "Aguda", Panel::CompareNut, &Catalog::default());
        assert_eq!(html, "<strong>Meta</strong><br><b>Desnutrición Aguda (ICBF):</b> 7.3%");
        let missing = build_content("Meta", Some(&record), "Cronica", Panel::CompareNut, &Catalog::default());
        assert!(missing.ends_with(NOT_AVAILABLE));
    }

    #[test]
    fn missing_values_never_print_nan_or_null() {
        let mut record = IndicatorRecord::from_pairs([("Indice", None), ("Dim_A", Some(f64::NAN))]);
        record.classify_index();
        let html = build_content("Vaupés", Some(&record), "Indice", Panel::Main, &Catalog::default());
        assert!(!html.contains("NaN"));
        assert!(!html.contains("null"));
        assert!(html.contains("<b>Índice Integrado:</b> No disponible (No disponible)"));
        assert!(html.contains("<b>Ranking General:</b> No disponible"));
    }

    #[test]
    fn absent_record_has_placeholder() {
        let html = build_content("Guainía", None, "Indice", Panel::Main, &Catalog::default());
        assert_eq!(html, "<strong>Guainía</strong><br>Datos no disponibles");
    }

    #[test]
    fn tooltip_names_are_title_cased() {
        assert_eq!(tooltip_name(Some("  NORTE DE SANTANDER ")), "Norte De Santander");
        assert_eq!(tooltip_name(Some("bogotá, d.c.")), "Bogotá, D.c.");
        assert_eq!(tooltip_name(None), UNNAMED_REGION);
        assert_eq!(tooltip_name(Some("   ")), UNNAMED_REGION);
    }
}
