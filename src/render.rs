use crate::catalog::NUTRITION_INDICATORS;
use crate::classify::Classification;
use crate::config::AppConfig;
use crate::data::Dataset;
use crate::legend::LegendSpec;
use crate::session::{MapSession, RenderSurface, StyledLayer};
use crate::style::StyleDescriptor;
use crate::types::{Bounds, Panel, RegionCode};
use anyhow::{anyhow, Context, Result};
use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A surface that keeps the attached layer in memory and writes it out as
/// styled GeoJSON plus legend files for the web front end.
#[derive(Debug)]
pub struct ExportSurface {
    geometries: Arc<HashMap<RegionCode, MultiPolygon<f64>>>,
    layer: Option<StyledLayer>,
    styles: HashMap<RegionCode, StyleDescriptor>,
    /// Draw order, last on top.
    order: Vec<RegionCode>,
    legend: Option<LegendSpec>,
    highlighted_band: Option<Classification>,
    popups: Vec<(RegionCode, String)>,
    view: Option<(Bounds, u32)>,
    linked: Option<Panel>,
}

impl ExportSurface {
    pub fn new(geometries: Arc<HashMap<RegionCode, MultiPolygon<f64>>>) -> Self {
        Self {
            geometries,
            layer: None,
            styles: HashMap::new(),
            order: Vec::new(),
            legend: None,
            highlighted_band: None,
            popups: Vec::new(),
            view: None,
            linked: None,
        }
    }

    pub fn legend(&self) -> Option<&LegendSpec> {
        self.legend.as_ref()
    }

    pub fn popups(&self) -> &[(RegionCode, String)] {
        &self.popups
    }

    pub fn current_style(&self, code: RegionCode) -> Option<&StyleDescriptor> {
        self.styles.get(&code)
    }

    pub fn draw_order(&self) -> &[RegionCode] {
        &self.order
    }

    /// Attached layer as a FeatureCollection in draw order.
    pub fn feature_collection(&self) -> Option<FeatureCollection> {
        let layer = self.layer.as_ref()?;
        let features = self
            .order
            .iter()
            .filter_map(|code| {
                let feature = layer.feature(*code)?;
                let style = self.styles.get(code).unwrap_or(&feature.style);
                let mut properties = JsonObject::new();
                properties.insert("code".to_string(), json!(feature.code));
                properties.insert("name".to_string(), json!(feature.name));
                properties.insert("fillColor".to_string(), json!(style.fill_color));
                properties.insert("color".to_string(), json!(style.stroke_color));
                properties.insert("weight".to_string(), json!(style.stroke_width));
                properties.insert("fillOpacity".to_string(), json!(style.fill_opacity));
                if let Some(class) = feature.classification {
                    properties.insert("classification".to_string(), json!(class.label()));
                }
                Some(Feature {
                    bbox: None,
                    geometry: self
                        .geometries
                        .get(code)
                        .map(|g| Geometry::new(geojson::Value::from(g))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                })
            })
            .collect();
        Some(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }

    /// Write `layer.geojson`, `legend.json`, `legend.html` and `view.json`.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create panel directory: {:?}", dir))?;

        if let Some(fc) = self.feature_collection() {
            fs::write(dir.join("layer.geojson"), fc.to_string()).context("Failed to write layer")?;
        }
        if let Some(legend) = &self.legend {
            fs::write(dir.join("legend.json"), serde_json::to_string_pretty(legend)?)
                .context("Failed to write legend")?;
            fs::write(dir.join("legend.html"), legend.to_html()).context("Failed to write legend html")?;
        }
        let view = json!({
            "bounds": self.view.map(|(b, _)| b),
            "padding": self.view.map(|(_, p)| [p, p]),
            "linkedWith": self.linked,
            "highlightedBand": self.highlighted_band.map(|c| c.label()),
        });
        fs::write(dir.join("view.json"), serde_json::to_string_pretty(&view)?)
            .context("Failed to write view")?;
        Ok(())
    }
}

impl RenderSurface for ExportSurface {
    fn add_layer(&mut self, layer: &StyledLayer) {
        self.order = layer.features.iter().map(|f| f.code).collect();
        self.styles = layer.features.iter().map(|f| (f.code, f.style)).collect();
        self.layer = Some(layer.clone());
    }

    fn remove_layer(&mut self) {
        self.layer = None;
        self.styles.clear();
        self.order.clear();
        self.popups.clear();
    }

    fn add_legend(&mut self, legend: &LegendSpec) {
        self.legend = Some(legend.clone());
    }

    fn remove_legend(&mut self) {
        self.legend = None;
        self.highlighted_band = None;
    }

    fn set_feature_style(&mut self, code: RegionCode, style: &StyleDescriptor) {
        if let Some(current) = self.styles.get_mut(&code) {
            *current = *style;
        }
    }

    fn bring_to_front(&mut self, code: RegionCode) {
        if let Some(pos) = self.order.iter().position(|c| *c == code) {
            let code = self.order.remove(pos);
            self.order.push(code);
        }
    }

    fn open_popup(&mut self, code: RegionCode, content: &str) {
        self.popups.push((code, content.to_string()));
    }

    fn highlight_legend_band(&mut self, class: Classification, on: bool) {
        if on {
            self.highlighted_band = Some(class);
        } else if self.highlighted_band == Some(class) {
            self.highlighted_band = None;
        }
    }

    fn fit_bounds(&mut self, bounds: &Bounds, padding_px: u32) {
        self.view = Some((*bounds, padding_px));
    }

    fn link_view(&mut self, peer: Panel) {
        self.linked = Some(peer);
    }
}

/// Indicator shown on each panel by `generate`.
#[derive(Debug, Clone, Default)]
pub struct PanelSelection {
    pub main: Option<String>,
    pub compare_vul: Option<String>,
    pub compare_nut: Option<String>,
}

impl PanelSelection {
    /// Fill unset panels with the first entry of their menus.
    pub fn resolve(&self, dataset: &Dataset) -> Result<[(Panel, String); 3]> {
        let sample = dataset
            .index
            .first_record()
            .ok_or_else(|| anyhow!("Index dataset has no regions"))?;
        let main = match &self.main {
            Some(key) => key.clone(),
            None => dataset
                .catalog
                .selector_entries(sample)
                .first()
                .map(|e| e.key.clone())
                .ok_or_else(|| anyhow!("Index dataset has no indicators"))?,
        };
        let compare_vul = match &self.compare_vul {
            Some(key) => key.clone(),
            None => dataset
                .catalog
                .comparison_entries(sample)
                .first()
                .map(|(k, _)| k.clone())
                .ok_or_else(|| anyhow!("Index dataset has no indicators"))?,
        };
        let compare_nut = self
            .compare_nut
            .clone()
            .unwrap_or_else(|| NUTRITION_INDICATORS[0].0.to_string());
        Ok([
            (Panel::Main, main),
            (Panel::CompareVul, compare_vul),
            (Panel::CompareNut, compare_nut),
        ])
    }
}

#[derive(Debug, Serialize)]
struct CatalogExport<'a> {
    selector: Vec<crate::catalog::SelectorEntry>,
    comparison: Vec<(String, String)>,
    nutrition: Vec<(&'a str, &'a str)>,
    stories: BTreeMap<String, String>,
    footer: String,
}

pub fn generate_layers(config: &AppConfig, dataset: Dataset, selection: &PanelSelection) -> Result<()> {
    let out = &config.output.layer_dir;
    info!("Generating panel layers into {:?}...", out);

    let panels = selection.resolve(&dataset)?;
    let geometries: Arc<HashMap<RegionCode, MultiPolygon<f64>>> = Arc::new(
        dataset
            .departments
            .iter()
            .map(|d| (d.code, d.geometry.clone()))
            .collect(),
    );
    let dataset = Arc::new(dataset);

    let mut session = MapSession::new(
        Arc::clone(&dataset),
        ExportSurface::new(Arc::clone(&geometries)),
        ExportSurface::new(Arc::clone(&geometries)),
        ExportSurface::new(Arc::clone(&geometries)),
    );
    for (panel, indicator) in &panels {
        info!("Rendering panel {} with indicator {}", panel, indicator);
        session.update_panel(*panel, indicator);
    }
    session.activate_compare_tab();

    for (panel, surface) in session.into_surfaces() {
        surface.write_to(&out.join(panel.key()))?;
    }

    write_catalog(&dataset, &out.join("catalog.json"))?;
    info!("Generation complete");
    Ok(())
}

fn write_catalog(dataset: &Dataset, path: &Path) -> Result<()> {
    let catalog = &dataset.catalog;
    let (selector, comparison) = match dataset.index.first_record() {
        Some(sample) => (catalog.selector_entries(sample), catalog.comparison_entries(sample)),
        None => (Vec::new(), Vec::new()),
    };
    let stories = selector
        .iter()
        .map(|e| (e.key.clone(), catalog.story(&e.key)))
        .collect();
    let export = CatalogExport {
        selector,
        comparison,
        nutrition: NUTRITION_INDICATORS.to_vec(),
        stories,
        footer: catalog.footer(),
    };
    fs::write(path, serde_json::to_string_pretty(&export)?)
        .with_context(|| format!("Failed to write catalog: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::session::StyledFeature;
    use geo::polygon;

    fn surface() -> ExportSurface {
        let square = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ]]);
        let geometries = HashMap::from([(5, square.clone()), (8, square)]);
        ExportSurface::new(Arc::new(geometries))
    }

    fn layer() -> StyledLayer {
        let feature = |code: RegionCode, fill: Rgb| StyledFeature {
            code,
            name: format!("Region {code}"),
            style: StyleDescriptor::base(fill),
            classification: None,
        };
        StyledLayer {
            panel: Panel::CompareVul,
            indicator: "Agua".into(),
            features: vec![feature(5, Rgb::new(1, 2, 3)), feature(8, Rgb::new(4, 5, 6))],
        }
    }

    #[test]
    fn layer_exports_styles_in_draw_order() {
        let mut s = surface();
        s.add_layer(&layer());
        s.bring_to_front(5);
        let fc = s.feature_collection().unwrap();
        let codes: Vec<u64> = fc
            .features
            .iter()
            .map(|f| f.property("code").and_then(|v| v.as_u64()).unwrap())
            .collect();
        assert_eq!(codes, [8, 5]);
        assert_eq!(
            fc.features[0].property("fillColor").and_then(|v| v.as_str()),
            Some("#040506")
        );
        assert!(fc.features[0].geometry.is_some());
    }

    #[test]
    fn removing_the_layer_clears_everything() {
        let mut s = surface();
        s.add_layer(&layer());
        s.open_popup(5, "hola");
        s.remove_layer();
        assert!(s.feature_collection().is_none());
        assert!(s.popups().is_empty());
        assert!(s.current_style(5).is_none());
    }

    #[test]
    fn write_to_creates_panel_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = surface();
        s.add_layer(&layer());
        s.add_legend(&crate::legend::build_index_legend());
        s.write_to(dir.path()).unwrap();
        for name in ["layer.geojson", "legend.json", "legend.html", "view.json"] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
    }
}
