use crate::catalog::NUTRITION_INDICATORS;
use crate::config::AppConfig;
use crate::data::Dataset;
use crate::popup::build_content;
use crate::types::{Panel, RegionCode, INDEX_KEY};
use crate::update::{log_rejection, success_message, UpdateRegistry};
use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Method},
    response::{IntoResponse, Json, Response},
    routing::{any, get},
    Router,
};
use geo::algorithm::contains::Contains;
use geo::{BoundingRect, Point};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;
use tracing::{info, warn};

// Wrapper for RTree indexing
pub struct AreaIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for AreaIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    /// Swapped in place when an update rewrites one of the input files.
    pub dataset: RwLock<Dataset>,
    pub tree: RTree<AreaIndex>,
    pub registry: UpdateRegistry,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig, dataset: Dataset) -> Self {
        info!("Building spatial index for API...");
        let tree_items: Vec<AreaIndex> = dataset
            .departments
            .iter()
            .enumerate()
            .filter_map(|(i, department)| {
                let rect = department.geometry.bounding_rect()?;
                Some(AreaIndex {
                    index: i,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();
        let tree = RTree::bulk_load(tree_items);
        info!("Spatial index built over {} departments", dataset.departments.len());

        Self {
            registry: UpdateRegistry::from_config(&config.update),
            dataset: RwLock::new(dataset),
            tree,
            config,
        }
    }
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
    #[serde(default = "default_panel")]
    panel: Panel,
    indicator: Option<String>,
}

fn default_panel() -> Panel {
    Panel::Main
}

/// Indicator a panel shows before anything is selected.
pub fn default_indicator(panel: Panel) -> &'static str {
    if panel.is_nutrition() {
        NUTRITION_INDICATORS[0].0
    } else {
        INDEX_KEY
    }
}

#[derive(Serialize)]
pub struct QueryResponse {
    code: RegionCode,
    name: String,
    popup: String,
}

#[derive(Deserialize)]
pub struct UpdateParams {
    file: Option<String>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let output_service = ServeDir::new(&state.config.output.layer_dir);

    Router::new()
        .route("/api/query", get(query_handler))
        .route("/api/update", any(update_handler))
        .fallback_service(output_service)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, dataset: Dataset) -> Result<()> {
    let port = config.server.port;
    let state = Arc::new(AppState::new(config, dataset));
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    info!("Starting server on http://{}", addr);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    let point = Point::new(params.lon, params.lat);
    let envelope = AABB::from_point([params.lon, params.lat]);
    let indicator = params
        .indicator
        .as_deref()
        .unwrap_or_else(|| default_indicator(params.panel));

    let dataset = state.dataset.read().await;

    // Query RTree
    let candidates = state.tree.locate_in_envelope_intersecting(&envelope);

    for candidate in candidates {
        if let Some(department) = dataset.departments.get(candidate.index) {
            if department.geometry.contains(&point) {
                let record = dataset.table(params.panel).get(department.code);
                let popup = build_content(
                    &department.name,
                    record,
                    indicator,
                    params.panel,
                    &dataset.catalog,
                );
                return Json(Some(QueryResponse {
                    code: department.code,
                    name: department.name.clone(),
                    popup,
                }));
            }
        }
    }

    Json(None)
}

async fn update_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    Query(params): Query<UpdateParams>,
    body: Bytes,
) -> Response {
    let file = params.file.as_deref();
    match state.registry.apply(&method, &headers, file, &body).await {
        Ok(target) => {
            let mut dataset = state.dataset.write().await;
            if let Err(err) = dataset.reload_input(&state.config.input, &target.target) {
                warn!(file = %target.key, "dataset written but not reloaded: {:#}", err);
            }
            Json(json!({ "success": success_message(&target.key) })).into_response()
        }
        Err(err) => {
            log_rejection(file, &err);
            err.into_response()
        }
    }
}
