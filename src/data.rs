use crate::catalog::{Catalog, IndicatorMeta, SiteConfig, WeightTable};
use crate::config::{AppConfig, InputConfig};
use crate::popup::tooltip_name;
use crate::types::{Bounds, Department, IndicatorRecord, Panel, RegionCode, RegionTable};
use anyhow::{anyhow, Context, Result};
use geo::{BoundingRect, MultiPolygon};
use geojson::GeoJson;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

/// Everything the panels draw from, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub departments: Vec<Department>,
    /// Composite index and dimensions, classified at load.
    pub index: RegionTable,
    pub nutrition: RegionTable,
    pub catalog: Catalog,
    pub excluded_from_bounds: Vec<String>,
}

impl Dataset {
    pub fn table(&self, panel: Panel) -> &RegionTable {
        if panel.is_nutrition() {
            &self.nutrition
        } else {
            &self.index
        }
    }

    pub fn department(&self, code: RegionCode) -> Option<&Department> {
        self.departments.iter().find(|d| d.code == code)
    }

    /// Extent of every department not excluded from view fitting.
    pub fn mainland_bounds(&self) -> Option<Bounds> {
        self.departments
            .iter()
            .filter(|d| !self.excluded_from_bounds.contains(&d.raw_code))
            .filter_map(|d| d.geometry.bounding_rect())
            .map(|rect| Bounds {
                min_lon: rect.min().x,
                min_lat: rect.min().y,
                max_lon: rect.max().x,
                max_lat: rect.max().y,
            })
            .reduce(Bounds::union)
    }

    /// Re-read the input stored at `path` after it was rewritten.
    ///
    /// Returns `false` when `path` is not one of the configured data files.
    /// Boundaries are never reloaded.
    pub fn reload_input(&mut self, input: &InputConfig, path: &Path) -> Result<bool> {
        if same_file(path, &input.index_data) {
            let mut index = load_region_table(&input.index_data)?;
            index.classify_all();
            self.index = index;
        } else if same_file(path, &input.nutrition_data) {
            self.nutrition = load_region_table(&input.nutrition_data)?;
        } else if same_file(path, &input.indicator_config) {
            self.catalog.indicators = read_json(&input.indicator_config)?;
        } else if same_file(path, &input.weights) {
            self.catalog.weights = read_json(&input.weights)?;
        } else if same_file(path, &input.site_config) {
            self.catalog.site = read_json(&input.site_config)?;
        } else {
            return Ok(false);
        }
        info!("Reloaded {:?}", path);
        Ok(true)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

pub fn load_data(config: &AppConfig) -> Result<Dataset> {
    info!("Loading data...");

    let departments = load_boundaries(
        &config.input.boundaries,
        &config.input.code_property,
        &config.input.name_property,
    )?;
    info!("Loaded geometry for {} departments", departments.len());

    let mut index = load_region_table(&config.input.index_data)?;
    index.classify_all();
    let nutrition = load_region_table(&config.input.nutrition_data)?;
    info!(
        "Loaded index data for {} regions, nutrition data for {} regions",
        index.len(),
        nutrition.len()
    );

    let indicators: HashMap<String, IndicatorMeta> = read_json(&config.input.indicator_config)?;
    let weights: WeightTable = read_json(&config.input.weights)?;
    let site: SiteConfig = read_json(&config.input.site_config)?;

    Ok(Dataset {
        departments,
        index,
        nutrition,
        catalog: Catalog {
            indicators,
            weights,
            site,
        },
        excluded_from_bounds: config.input.excluded_from_bounds.clone(),
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open data file: {:?}", path))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse data file: {:?}", path))
}

pub fn load_region_table(path: &Path) -> Result<RegionTable> {
    let value: Value = read_json(path)?;
    parse_region_table(&value).with_context(|| format!("Invalid region dataset: {:?}", path))
}

/// Region datasets are objects keyed by region code.
pub fn parse_region_table(value: &Value) -> Result<RegionTable> {
    let object = value
        .as_object()
        .ok_or_else(|| anyhow!("Region dataset must be a JSON object keyed by region code"))?;

    let mut records = Vec::with_capacity(object.len());
    for (key, record) in object {
        let Some(code) = parse_code(key) else {
            warn!("Skipping region with non-numeric code {:?}", key);
            continue;
        };
        let Some(fields) = record.as_object() else {
            warn!("Skipping region {} whose record is not an object", key);
            continue;
        };
        records.push((code, IndicatorRecord::from_json(fields)));
    }
    Ok(RegionTable::new(records))
}

pub fn load_boundaries(path: &Path, code_property: &str, name_property: &str) -> Result<Vec<Department>> {
    info!("Loading GeoJSON from {:?}...", path);
    let file = File::open(path).with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let reader = BufReader::new(file);

    // Parse the GeoJSON. warning: this loads the whole file into memory.
    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;
    parse_boundaries(geojson, code_property, name_property)
}

pub fn parse_boundaries(geojson: GeoJson, code_property: &str, name_property: &str) -> Result<Vec<Department>> {
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut departments = Vec::new();

    for feature in collection.features {
        let props = feature.properties.as_ref();

        let raw_code = match props.and_then(|p| p.get(code_property)) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => continue, // Skip if no code or not string/number
        };
        let Some(code) = parse_code(&raw_code) else {
            warn!("Skipping feature with unparseable code {:?}", raw_code);
            continue;
        };

        let raw_name = props
            .and_then(|p| p.get(name_property).or_else(|| p.get("name")))
            .and_then(Value::as_str);
        let name = tooltip_name(raw_name);

        let geometry = match feature.geometry {
            Some(geo) => {
                let valid_geo: geo::Geometry<f64> = geo
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

                match valid_geo {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue, // Skip points/lines
                }
            }
            None => continue,
        };

        departments.push(Department {
            code,
            raw_code,
            name,
            geometry,
        });
    }

    Ok(departments)
}

fn parse_code(raw: &str) -> Option<RegionCode> {
    raw.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square(x: f64, y: f64) -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[x, y], [x + 1.0, y], [x + 1.0, y + 1.0], [x, y + 1.0], [x, y]]]
        })
    }

    fn boundaries() -> GeoJson {
        let fc = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "DPTO_CCDGO": "05", "DPTO_CNMBR": "ANTIOQUIA" }, "geometry": square(-76.0, 6.0) },
                { "type": "Feature", "properties": { "DPTO_CCDGO": "88", "DPTO_CNMBR": "SAN ANDRÉS" }, "geometry": square(-82.0, 12.0) },
                { "type": "Feature", "properties": { "DPTO_CCDGO": 91, "name": "amazonas" }, "geometry": square(-71.0, -3.0) },
                { "type": "Feature", "properties": { "DPTO_CNMBR": "SIN CODIGO" }, "geometry": square(0.0, 0.0) },
                { "type": "Feature", "properties": { "DPTO_CCDGO": "50" }, "geometry": { "type": "Point", "coordinates": [0.0, 0.0] } }
            ]
        });
        GeoJson::from_json_value(fc).unwrap()
    }

    #[test]
    fn boundaries_join_codes_and_names() {
        let departments = parse_boundaries(boundaries(), "DPTO_CCDGO", "DPTO_CNMBR").unwrap();
        let codes: Vec<RegionCode> = departments.iter().map(|d| d.code).collect();
        assert_eq!(codes, [5, 88, 91]);
        assert_eq!(departments[0].name, "Antioquia");
        assert_eq!(departments[0].raw_code, "05");
        assert_eq!(departments[2].name, "Amazonas");
    }

    #[test]
    fn non_collections_are_rejected() {
        let point = GeoJson::from_json_value(json!({ "type": "Point", "coordinates": [0.0, 0.0] })).unwrap();
        assert!(parse_boundaries(point, "DPTO_CCDGO", "DPTO_CNMBR").is_err());
    }

    #[test]
    fn mainland_bounds_skip_excluded_codes() {
        let dataset = Dataset {
            departments: parse_boundaries(boundaries(), "DPTO_CCDGO", "DPTO_CNMBR").unwrap(),
            excluded_from_bounds: vec!["88".into()],
            ..Default::default()
        };
        let bounds = dataset.mainland_bounds().unwrap();
        assert_eq!(bounds.min_lon, -76.0);
        assert_eq!(bounds.max_lon, -70.0);
        assert_eq!(bounds.min_lat, -3.0);
        assert_eq!(bounds.max_lat, 7.0);
    }

    #[test]
    fn reload_replaces_only_the_rewritten_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = |name: &str| dir.path().join(name);
        std::fs::write(path("indice.json"), r#"{"5": {"Indice": 70.0, "Ranking": 1}}"#).unwrap();
        std::fs::write(path("site.json"), r#"{"year": 2025}"#).unwrap();
        let input = InputConfig {
            boundaries: path("mapa.geojson"),
            index_data: path("indice.json"),
            nutrition_data: path("nutricion.json"),
            indicator_config: path("configuracion_app.json"),
            weights: path("pesos.json"),
            site_config: path("site.json"),
            code_property: "DPTO_CCDGO".into(),
            name_property: "DPTO_CNMBR".into(),
            excluded_from_bounds: Vec::new(),
        };
        let mut dataset = Dataset {
            index: parse_region_table(&json!({ "5": { "Indice": 40.1 } })).unwrap(),
            nutrition: parse_region_table(&json!({ "5": { "ENSIN": 0.2 } })).unwrap(),
            ..Default::default()
        };

        assert!(dataset.reload_input(&input, &path("indice.json")).unwrap());
        let record = dataset.index.get(5).unwrap();
        assert_eq!(record.get("Indice"), Some(70.0));
        assert_eq!(record.classification(), Some(crate::classify::Classification::Critica));
        assert_eq!(dataset.nutrition.get(5).unwrap().get("ENSIN"), Some(0.2));

        assert!(dataset.reload_input(&input, &path("site.json")).unwrap());
        assert_eq!(dataset.catalog.footer(), "Última actualización: Octubre 2025");

        assert!(!dataset.reload_input(&input, &path("otro.json")).unwrap());
    }

    #[test]
    fn region_tables_parse_codes_and_skip_junk() {
        let value = json!({
            "5": { "Indice": 31.0, "Ranking": 2 },
            "08": { "Indice": 12.5, "Ranking": 1 },
            "x": { "Indice": 1.0 },
            "11": 4
        });
        let table = parse_region_table(&value).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(8).unwrap().get("Indice"), Some(12.5));
        assert!(parse_region_table(&json!([1, 2])).is_err());
    }
}
