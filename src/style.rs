//! Per-region fill styles for one panel/indicator pair.

use crate::color::{Palette, Rgb, NO_DATA_COLOR};
use crate::legend::{build_index_legend, build_legend, LegendSpec};
use crate::types::{IndicatorRecord, Panel, RegionTable};
use serde::Serialize;

const BASE_STROKE: Rgb = Rgb::new(0xff, 0xff, 0xff);
const BASE_STROKE_WIDTH: f64 = 0.8;
const FILL_OPACITY: f64 = 0.85;
const HIGHLIGHT_STROKE: Rgb = Rgb::new(0x2c, 0x3e, 0x50);
const HIGHLIGHT_STROKE_WIDTH: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StyleDescriptor {
    pub fill_color: Rgb,
    pub stroke_color: Rgb,
    pub stroke_width: f64,
    pub fill_opacity: f64,
}

impl StyleDescriptor {
    pub fn base(fill_color: Rgb) -> Self {
        Self {
            fill_color,
            stroke_color: BASE_STROKE,
            stroke_width: BASE_STROKE_WIDTH,
            fill_opacity: FILL_OPACITY,
        }
    }

    /// Same fill with the hover stroke.
    pub fn highlighted(&self) -> Self {
        Self {
            stroke_color: HIGHLIGHT_STROKE,
            stroke_width: HIGHLIGHT_STROKE_WIDTH,
            ..*self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorKind {
    /// The composite index on the primary panel, drawn by severity class.
    CompositeIndexOnPrimaryPanel,
    /// Anything else, drawn on the continuous ramp.
    Continuous,
}

impl IndicatorKind {
    pub fn of(panel: Panel, indicator: &str) -> Self {
        if panel.uses_classes(indicator) {
            Self::CompositeIndexOnPrimaryPanel
        } else {
            Self::Continuous
        }
    }
}

#[derive(Debug, Clone)]
enum Fill {
    Classes,
    Ramp(Palette),
}

/// Styles every region of one panel for the selected indicator.
#[derive(Debug, Clone)]
pub struct RegionStyler {
    indicator: String,
    fill: Fill,
}

impl RegionStyler {
    /// Builds the palette from the panel's current value domain.
    pub fn new(panel: Panel, indicator: &str, table: &RegionTable) -> Self {
        let fill = match IndicatorKind::of(panel, indicator) {
            IndicatorKind::CompositeIndexOnPrimaryPanel => Fill::Classes,
            IndicatorKind::Continuous => Fill::Ramp(Palette::build(table.values(indicator), panel.scale())),
        };
        Self {
            indicator: indicator.to_string(),
            fill,
        }
    }

    pub fn indicator(&self) -> &str {
        &self.indicator
    }

    pub fn kind(&self) -> IndicatorKind {
        match self.fill {
            Fill::Classes => IndicatorKind::CompositeIndexOnPrimaryPanel,
            Fill::Ramp(_) => IndicatorKind::Continuous,
        }
    }

    /// Base style of a region. Classed fills read the class cached on the
    /// record at load time.
    pub fn style_for(&self, record: Option<&IndicatorRecord>) -> StyleDescriptor {
        let fill = match &self.fill {
            Fill::Classes => record
                .and_then(IndicatorRecord::classification)
                .map(|c| c.color())
                .unwrap_or(NO_DATA_COLOR),
            Fill::Ramp(palette) => palette.color(record.and_then(|r| r.get(&self.indicator))),
        };
        StyleDescriptor::base(fill)
    }

    /// Legend matching this styler's fill.
    pub fn legend(&self, title: &str) -> LegendSpec {
        match &self.fill {
            Fill::Classes => build_index_legend(),
            Fill::Ramp(palette) => {
                let domain = palette.domain();
                let values = domain.into_iter().flat_map(|(lo, hi)| [Some(lo), Some(hi)]);
                build_legend(values, title, palette.scale(), palette.ramp())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classification;
    use crate::color::DEFAULT_RAMP;

    fn index_table() -> RegionTable {
        let mut table = RegionTable::new(vec![
            (5, IndicatorRecord::from_pairs([("Indice", Some(70.0)), ("Agua", Some(2.0))])),
            (8, IndicatorRecord::from_pairs([("Indice", Some(20.0)), ("Agua", Some(12.0))])),
            (11, IndicatorRecord::from_pairs([("Indice", None), ("Agua", None)])),
        ]);
        table.classify_all();
        table
    }

    #[test]
    fn primary_index_uses_classes() {
        let table = index_table();
        let styler = RegionStyler::new(Panel::Main, "Indice", &table);
        assert_eq!(styler.kind(), IndicatorKind::CompositeIndexOnPrimaryPanel);
        assert_eq!(styler.style_for(table.get(5)).fill_color, Classification::Critica.color());
        assert_eq!(styler.style_for(table.get(8)).fill_color, Classification::Baja.color());
        assert_eq!(styler.style_for(table.get(11)).fill_color, NO_DATA_COLOR);
        assert_eq!(styler.style_for(None).fill_color, NO_DATA_COLOR);
        assert!(styler.legend("ignored").is_categorical());
    }

    #[test]
    fn index_on_comparison_panel_is_continuous() {
        let table = index_table();
        let styler = RegionStyler::new(Panel::CompareVul, "Indice", &table);
        assert_eq!(styler.kind(), IndicatorKind::Continuous);
        assert_eq!(styler.style_for(table.get(8)).fill_color, DEFAULT_RAMP[0]);
        assert_eq!(styler.style_for(table.get(5)).fill_color, DEFAULT_RAMP[4]);
    }

    #[test]
    fn stroke_is_constant_and_only_fill_varies() {
        let table = index_table();
        let styler = RegionStyler::new(Panel::CompareVul, "Agua", &table);
        let a = styler.style_for(table.get(5));
        let b = styler.style_for(table.get(8));
        assert_ne!(a.fill_color, b.fill_color);
        assert_eq!(a.stroke_color, b.stroke_color);
        assert_eq!(a.stroke_width, 0.8);
        assert_eq!(a.fill_opacity, 0.85);
    }

    #[test]
    fn highlight_keeps_fill() {
        let base = StyleDescriptor::base(DEFAULT_RAMP[2]);
        let hot = base.highlighted();
        assert_eq!(hot.fill_color, base.fill_color);
        assert_eq!(hot.stroke_width, 2.5);
        assert_eq!(hot.stroke_color.to_string(), "#2c3e50");
        assert_eq!(hot.highlighted(), hot);
    }

    #[test]
    fn continuous_legend_spans_the_palette_domain() {
        let table = index_table();
        let styler = RegionStyler::new(Panel::CompareVul, "Agua", &table);
        match styler.legend("Agua") {
            LegendSpec::Continuous { min, max, .. } => {
                assert_eq!(min, 2.0);
                assert_eq!(max, 12.0);
            }
            other => panic!("unexpected legend {other:?}"),
        }
    }
}
