//! Legend descriptions for the map panels.
//!
//! A continuous legend is a gradient bar with ticks snapped to round
//! intervals; the composite index gets the five fixed severity bands no
//! matter what the data looks like.

use crate::classify::Classification;
use crate::color::{value_domain, ColorRamp, Rgb, ValueScale};
use serde::Serialize;
use std::fmt::Write;

pub const INDEX_LEGEND_TITLE: &str = "Nivel de Vulnerabilidad";

/// More multiples than this and the bar shows only its end points.
pub const MAX_TICKS: i64 = 200;

/// Bar geometry of a continuous legend, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BarLayout {
    pub height_px: u32,
    pub swatch_width_px: u32,
    pub label_width_px: u32,
}

impl Default for BarLayout {
    fn default() -> Self {
        Self {
            height_px: 180,
            swatch_width_px: 20,
            label_width_px: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub value: f64,
    pub label: String,
    /// Linear offset from `min` along the bar, 0 to 100.
    pub position_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBand {
    pub classification: Classification,
    pub label: &'static str,
    pub range_text: &'static str,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LegendSpec {
    NoData {
        title: String,
    },
    Continuous {
        title: String,
        scale: ValueScale,
        min: f64,
        max: f64,
        gradient: String,
        layout: BarLayout,
        ticks: Vec<Tick>,
    },
    Categorical {
        title: String,
        bands: Vec<CategoryBand>,
    },
}

impl LegendSpec {
    pub fn title(&self) -> &str {
        match self {
            Self::NoData { title } | Self::Continuous { title, .. } | Self::Categorical { title, .. } => {
                title
            }
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::Categorical { .. })
    }

    /// HTML fragment for the legend panel.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        match self {
            Self::NoData { title } => {
                let _ = write!(html, "<h4>{}</h4>No data", escape_html(title));
            }
            Self::Continuous {
                title,
                gradient,
                layout,
                ticks,
                ..
            } => {
                let mut labels = String::new();
                for tick in ticks {
                    let _ = write!(
                        labels,
                        "<div style=\"position: absolute; top: {}%; left: 0; width: 100%; transform: translateY(-50%);\">\
                         <span style=\"padding-left: 5px;\">&ndash; {}</span></div>",
                        tick.position_percent, tick.label
                    );
                }
                let _ = write!(
                    html,
                    "<h4>{}</h4><div style=\"display: flex; align-items: stretch; height: {}px;\">\
                     <div style=\"width: {}px; background: {};\"></div>\
                     <div style=\"position: relative; width: {}px; font-size: 0.9em; margin-left: 5px;\">{}</div></div>",
                    escape_html(title),
                    layout.height_px,
                    layout.swatch_width_px,
                    gradient,
                    layout.label_width_px,
                    labels
                );
            }
            Self::Categorical { title, bands } => {
                let _ = write!(html, "<h4>{}</h4><div class=\"legend-bands\">", escape_html(title));
                for band in bands {
                    let _ = write!(
                        html,
                        "<div class=\"legend-item\" data-classification=\"{label}\">\
                         <div style=\"background-color:{color}; height: 15px; border: 1px solid #999;\"></div>\
                         <div>{label}</div><div>{range}</div></div>",
                        label = band.label,
                        color = band.color,
                        range = band.range_text
                    );
                }
                html.push_str("</div>");
            }
        }
        html
    }
}

/// Legend for a continuous panel.
pub fn build_legend<I>(values: I, title: &str, scale: ValueScale, ramp: &ColorRamp) -> LegendSpec
where
    I: IntoIterator<Item = Option<f64>>,
{
    let Some((min, max)) = value_domain(values) else {
        return LegendSpec::NoData {
            title: title.to_string(),
        };
    };

    let ticks = tick_values(min, max, scale)
        .into_iter()
        .map(|value| Tick {
            value,
            label: format_tick(value, scale),
            position_percent: tick_position(value, min, max),
        })
        .collect();

    LegendSpec::Continuous {
        title: title.to_string(),
        scale,
        min,
        max,
        gradient: ramp.css_gradient(),
        layout: BarLayout::default(),
        ticks,
    }
}

/// The fixed five-band legend of the composite index.
pub fn build_index_legend() -> LegendSpec {
    LegendSpec::Categorical {
        title: INDEX_LEGEND_TITLE.to_string(),
        bands: Classification::ALL
            .into_iter()
            .map(|c| CategoryBand {
                classification: c,
                label: c.label(),
                range_text: c.range_text(),
                color: c.color(),
            })
            .collect(),
    }
}

/// Tick step in display units: percentage points or absolute units.
pub fn tick_interval(min: f64, max: f64, scale: ValueScale) -> f64 {
    match scale {
        ValueScale::Absolute => 10.0,
        ValueScale::Percentage => {
            let range_percent = (max - min) * 100.0;
            if range_percent <= 5.0 {
                1.0
            } else if range_percent <= 10.0 {
                2.0
            } else if range_percent <= 25.0 {
                5.0
            } else {
                10.0
            }
        }
    }
}

/// Multiples of the interval inside `[min, max]`, ascending.
///
/// Falls back to exactly `[min, max]` when fewer than two multiples fit
/// or when there would be more than [`MAX_TICKS`].
pub fn tick_values(min: f64, max: f64, scale: ValueScale) -> Vec<f64> {
    let interval = tick_interval(min, max, scale);
    let unit = match scale {
        ValueScale::Absolute => 1.0,
        ValueScale::Percentage => 100.0,
    };

    let first = (min * unit / interval).ceil() as i64;
    let last = (max * unit / interval).floor() as i64;
    if last.saturating_sub(first) >= MAX_TICKS {
        return vec![min, max];
    }
    let mut ticks: Vec<f64> = (first..=last)
        .map(|k| k as f64 * interval / unit)
        .collect();
    ticks.sort_by(f64::total_cmp);
    ticks.dedup();

    if ticks.len() < 2 {
        return vec![min, max];
    }
    ticks
}

pub fn tick_position(value: f64, min: f64, max: f64) -> f64 {
    if max > min {
        (value - min) / (max - min) * 100.0
    } else {
        0.0
    }
}

pub fn format_tick(value: f64, scale: ValueScale) -> String {
    match scale {
        ValueScale::Absolute => format!("{}", value.round() + 0.0),
        ValueScale::Percentage => format!("{}%", (value * 100.0).round() + 0.0),
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn continuous(values: &[f64], scale: ValueScale) -> LegendSpec {
        build_legend(
            values.iter().copied().map(Some),
            "Indicador",
            scale,
            &ColorRamp::default(),
        )
    }

    fn ticks_of(spec: &LegendSpec) -> &[Tick] {
        match spec {
            LegendSpec::Continuous { ticks, .. } => ticks,
            other => panic!("expected continuous legend, got {other:?}"),
        }
    }

    #[test]
    fn empty_domain_is_no_data() {
        let spec = build_legend(vec![None, Some(f64::NAN)], "Aguda", ValueScale::Percentage, &ColorRamp::default());
        assert_eq!(spec, LegendSpec::NoData { title: "Aguda".into() });
        assert_eq!(spec.to_html(), "<h4>Aguda</h4>No data");
    }

    #[test]
    fn percentage_interval_thresholds() {
        assert_eq!(tick_interval(0.10, 0.15, ValueScale::Percentage), 1.0);
        assert_eq!(tick_interval(0.10, 0.18, ValueScale::Percentage), 2.0);
        assert_eq!(tick_interval(0.10, 0.30, ValueScale::Percentage), 5.0);
        assert_eq!(tick_interval(0.10, 0.60, ValueScale::Percentage), 10.0);
        assert_eq!(tick_interval(0.0, 1000.0, ValueScale::Absolute), 10.0);
    }

    #[test]
    fn percentage_ticks_snap_to_five_points() {
        let spec = continuous(&[0.12, 0.2, 0.37], ValueScale::Percentage);
        let labels: Vec<&str> = ticks_of(&spec).iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, ["15%", "20%", "25%", "30%", "35%"]);
    }

    #[test]
    fn absolute_ticks_use_tens() {
        let spec = continuous(&[12.4, 47.9], ValueScale::Absolute);
        let ticks = ticks_of(&spec);
        let values: Vec<f64> = ticks.iter().map(|t| t.value).collect();
        assert_eq!(values, [20.0, 30.0, 40.0]);
        assert_eq!(ticks[0].label, "20");
        let expected = (20.0 - 12.4) / (47.9 - 12.4) * 100.0;
        assert!((ticks[0].position_percent - expected).abs() < 1e-9);
    }

    #[test]
    fn narrow_domain_falls_back_to_min_and_max() {
        let spec = continuous(&[21.0, 28.0], ValueScale::Absolute);
        let ticks = ticks_of(&spec);
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].value, 21.0);
        assert_eq!(ticks[1].value, 28.0);
        assert_eq!(ticks[0].position_percent, 0.0);
        assert_eq!(ticks[1].position_percent, 100.0);
    }

    #[test]
    fn huge_domain_keeps_only_end_points() {
        let ticks = tick_values(0.0, 1e12, ValueScale::Absolute);
        assert_eq!(ticks, [0.0, 1e12]);
        assert_eq!(tick_values(0.0, 1000.0, ValueScale::Absolute).len(), 101);
    }

    #[test]
    fn degenerate_domain_yields_two_ticks_at_zero() {
        let spec = continuous(&[0.3, 0.3], ValueScale::Percentage);
        let ticks = ticks_of(&spec);
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].value, ticks[1].value);
        assert!(ticks.iter().all(|t| t.position_percent == 0.0));
        assert!(ticks.iter().all(|t| t.label == "30%"));
    }

    #[test]
    fn index_legend_is_fixed() {
        let spec = build_index_legend();
        assert!(spec.is_categorical());
        assert_eq!(spec.title(), INDEX_LEGEND_TITLE);
        let LegendSpec::Categorical { bands, .. } = &spec else {
            unreachable!()
        };
        let ranges: Vec<&str> = bands.iter().map(|b| b.range_text).collect();
        assert_eq!(ranges, ["0-14", "15-29", "30-49", "50-64", "65-100"]);
        assert_eq!(bands[4].label, "Crítica");
        assert!(spec.to_html().contains("data-classification=\"Media\""));
    }

    #[test]
    fn continuous_html_positions_labels() {
        let html = continuous(&[0.0, 100.0], ValueScale::Absolute).to_html();
        assert!(html.contains("height: 180px"));
        assert!(html.contains("top: 50%"));
        assert!(html.contains("&ndash; 50"));
    }

    #[test]
    fn titles_are_escaped() {
        let html = build_legend(Vec::new(), "A & B", ValueScale::Absolute, &ColorRamp::default()).to_html();
        assert_eq!(html, "<h4>A &amp; B</h4>No data");
    }
}
