//! Panel state and the interaction rules between panels.
//!
//! A [`MapSession`] owns one [`RenderSurface`] per panel together with the
//! layer and legend currently attached to it. Every mutation goes through
//! the session so a panel never shows two layers or two legends at once.

use crate::catalog::nutrition_display_name;
use crate::classify::Classification;
use crate::data::Dataset;
use crate::legend::LegendSpec;
use crate::popup::build_content;
use crate::style::{RegionStyler, StyleDescriptor};
use crate::types::{Bounds, Panel, RegionCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Pixels kept between the fitted extent and the panel edge.
pub const FIT_PADDING_PX: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledFeature {
    pub code: RegionCode,
    /// Tooltip text.
    pub name: String,
    /// Style computed for the current indicator; hover never changes it.
    pub style: StyleDescriptor,
    pub classification: Option<Classification>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledLayer {
    pub panel: Panel,
    pub indicator: String,
    pub features: Vec<StyledFeature>,
}

impl StyledLayer {
    pub fn feature(&self, code: RegionCode) -> Option<&StyledFeature> {
        self.features.iter().find(|f| f.code == code)
    }
}

/// What a map library has to offer for a panel to be drawn on it.
pub trait RenderSurface {
    /// Attach a layer, binding each feature's tooltip.
    fn add_layer(&mut self, layer: &StyledLayer);
    fn remove_layer(&mut self);
    fn add_legend(&mut self, legend: &LegendSpec);
    fn remove_legend(&mut self);
    fn set_feature_style(&mut self, code: RegionCode, style: &StyleDescriptor);
    fn bring_to_front(&mut self, code: RegionCode);
    fn open_popup(&mut self, code: RegionCode, content: &str);
    /// Mark or unmark one band of a categorical legend.
    fn highlight_legend_band(&mut self, class: Classification, on: bool);
    fn fit_bounds(&mut self, bounds: &Bounds, padding_px: u32);
    /// Make pan/zoom on this surface follow `peer` and vice versa.
    fn link_view(&mut self, peer: Panel);
}

#[derive(Debug)]
struct PanelState<S> {
    surface: S,
    layer: Option<StyledLayer>,
    legend: Option<LegendSpec>,
    hovered: Option<RegionCode>,
    band: Option<Classification>,
}

impl<S: RenderSurface> PanelState<S> {
    fn new(surface: S) -> Self {
        Self {
            surface,
            layer: None,
            legend: None,
            hovered: None,
            band: None,
        }
    }

    fn detach(&mut self) {
        if self.layer.take().is_some() {
            self.surface.remove_layer();
        }
        if self.legend.take().is_some() {
            self.surface.remove_legend();
        }
        self.hovered = None;
        self.band = None;
    }

    fn shows_classes(&self) -> bool {
        self.legend.as_ref().is_some_and(LegendSpec::is_categorical)
    }
}

#[derive(Debug)]
pub struct MapSession<S> {
    data: Arc<Dataset>,
    main: PanelState<S>,
    compare_vul: PanelState<S>,
    compare_nut: PanelState<S>,
    compare_fitted: bool,
}

impl<S: RenderSurface> MapSession<S> {
    /// Creates the session and fits the primary panel to the mainland.
    pub fn new(data: Arc<Dataset>, main: S, compare_vul: S, compare_nut: S) -> Self {
        let mut session = Self {
            data,
            main: PanelState::new(main),
            compare_vul: PanelState::new(compare_vul),
            compare_nut: PanelState::new(compare_nut),
            compare_fitted: false,
        };
        if let Some(bounds) = session.data.mainland_bounds() {
            session.main.surface.fit_bounds(&bounds, FIT_PADDING_PX);
        }
        session
    }

    fn state(&self, panel: Panel) -> &PanelState<S> {
        match panel {
            Panel::Main => &self.main,
            Panel::CompareVul => &self.compare_vul,
            Panel::CompareNut => &self.compare_nut,
        }
    }

    fn state_mut(&mut self, panel: Panel) -> &mut PanelState<S> {
        match panel {
            Panel::Main => &mut self.main,
            Panel::CompareVul => &mut self.compare_vul,
            Panel::CompareNut => &mut self.compare_nut,
        }
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn surface(&self, panel: Panel) -> &S {
        &self.state(panel).surface
    }

    pub fn layer(&self, panel: Panel) -> Option<&StyledLayer> {
        self.state(panel).layer.as_ref()
    }

    pub fn legend(&self, panel: Panel) -> Option<&LegendSpec> {
        self.state(panel).legend.as_ref()
    }

    pub fn compare_fitted(&self) -> bool {
        self.compare_fitted
    }

    pub fn into_surfaces(self) -> [(Panel, S); 3] {
        [
            (Panel::Main, self.main.surface),
            (Panel::CompareVul, self.compare_vul.surface),
            (Panel::CompareNut, self.compare_nut.surface),
        ]
    }

    /// Switch a panel to another indicator: detach, compute, attach.
    pub fn update_panel(&mut self, panel: Panel, indicator: &str) {
        self.state_mut(panel).detach();

        let data = Arc::clone(&self.data);
        let table = data.table(panel);
        let styler = RegionStyler::new(panel, indicator, table);
        let title = if panel.is_nutrition() {
            nutrition_display_name(indicator)
        } else {
            data.catalog.display_name(indicator)
        };
        let legend = styler.legend(&title);

        let features = data
            .departments
            .iter()
            .map(|d| {
                let record = table.get(d.code);
                StyledFeature {
                    code: d.code,
                    name: d.name.clone(),
                    style: styler.style_for(record),
                    classification: record.and_then(|r| r.classification()),
                }
            })
            .collect();
        let layer = StyledLayer {
            panel,
            indicator: indicator.to_string(),
            features,
        };
        debug!(%panel, indicator, "attaching layer and legend");

        let state = self.state_mut(panel);
        state.surface.add_layer(&layer);
        state.layer = Some(layer);
        state.surface.add_legend(&legend);
        state.legend = Some(legend);
    }

    pub fn hover(&mut self, panel: Panel, code: RegionCode) {
        let state = self.state_mut(panel);
        let Some(feature) = state.layer.as_ref().and_then(|l| l.feature(code)) else {
            return;
        };
        let highlighted = feature.style.highlighted();
        let class = feature.classification;

        state.hovered = Some(code);
        state.surface.set_feature_style(code, &highlighted);
        state.surface.bring_to_front(code);
        if let (true, Some(class)) = (state.shows_classes(), class) {
            state.surface.highlight_legend_band(class, true);
        }
    }

    /// Restores the stored style, never a recomputed one.
    pub fn unhover(&mut self, panel: Panel, code: RegionCode) {
        let state = self.state_mut(panel);
        let Some(feature) = state.layer.as_ref().and_then(|l| l.feature(code)) else {
            return;
        };
        let base = feature.style;
        let class = feature.classification;

        if state.hovered == Some(code) {
            state.hovered = None;
        }
        state.surface.set_feature_style(code, &base);
        if let (true, Some(class)) = (state.shows_classes(), class) {
            state.surface.highlight_legend_band(class, false);
        }
    }

    /// Pointer over a legend band: outline every region of that class.
    pub fn hover_legend_band(&mut self, panel: Panel, class: Classification) {
        let state = self.state_mut(panel);
        if !state.shows_classes() {
            return;
        }
        let Some(layer) = state.layer.as_ref() else {
            return;
        };
        for feature in layer.features.iter().filter(|f| f.classification == Some(class)) {
            state.surface.set_feature_style(feature.code, &feature.style.highlighted());
            state.surface.bring_to_front(feature.code);
        }
        state.band = Some(class);
    }

    /// Pointer left the legend: reset outlined regions except a hovered one.
    pub fn clear_legend_band(&mut self, panel: Panel) {
        let state = self.state_mut(panel);
        let Some(class) = state.band.take() else {
            return;
        };
        let hovered = state.hovered;
        let Some(layer) = state.layer.as_ref() else {
            return;
        };
        for feature in layer
            .features
            .iter()
            .filter(|f| f.classification == Some(class) && hovered != Some(f.code))
        {
            state.surface.set_feature_style(feature.code, &feature.style);
        }
    }

    /// Opens the region's popup; on a comparison panel the peer panel
    /// opens the same region's popup for its own indicator.
    pub fn click(&mut self, panel: Panel, code: RegionCode) -> Option<String> {
        let content = self.popup_for(panel, code)?;
        self.state_mut(panel).surface.open_popup(code, &content);

        if let Some(peer) = panel.peer() {
            if let Some(peer_content) = self.popup_for(peer, code) {
                self.state_mut(peer).surface.open_popup(code, &peer_content);
            }
        }
        Some(content)
    }

    /// Popup for a region on a panel's current layer.
    pub fn popup_for(&self, panel: Panel, code: RegionCode) -> Option<String> {
        let layer = self.state(panel).layer.as_ref()?;
        let feature = layer.feature(code)?;
        Some(build_content(
            &feature.name,
            self.data.table(panel).get(code),
            &layer.indicator,
            panel,
            &self.data.catalog,
        ))
    }

    /// Fit and link the comparison panels, once per session.
    ///
    /// Returns whether this call did the fitting.
    pub fn activate_compare_tab(&mut self) -> bool {
        if self.compare_fitted {
            return false;
        }
        if let Some(bounds) = self.data.mainland_bounds() {
            self.compare_vul.surface.fit_bounds(&bounds, FIT_PADDING_PX);
            self.compare_nut.surface.fit_bounds(&bounds, FIT_PADDING_PX);
        }
        self.compare_vul.surface.link_view(Panel::CompareNut);
        self.compare_nut.surface.link_view(Panel::CompareVul);
        self.compare_fitted = true;
        true
    }
}
