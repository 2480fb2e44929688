pub mod catalog;
pub mod classify;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod legend;
pub mod popup;
pub mod render;
pub mod server;
pub mod session;
pub mod style;
pub mod types;
pub mod update;

pub use classify::{classify, Classification};
pub use color::{ColorRamp, Palette, Rgb, ValueScale};
pub use legend::{build_index_legend, build_legend, LegendSpec};
pub use session::{MapSession, RenderSurface};
pub use types::{IndicatorRecord, Panel, RegionCode, RegionTable};
