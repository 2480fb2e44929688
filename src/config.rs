use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
    pub update: UpdateConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub boundaries: PathBuf,
    pub index_data: PathBuf,
    pub nutrition_data: PathBuf,
    pub indicator_config: PathBuf,
    pub weights: PathBuf,
    pub site_config: PathBuf,
    #[serde(default = "default_code_property")]
    pub code_property: String,
    #[serde(default = "default_name_property")]
    pub name_property: String,
    /// Region codes left out when fitting the map view (remote islands).
    #[serde(default = "default_excluded_from_bounds")]
    pub excluded_from_bounds: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub layer_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpdateConfig {
    /// Bearer token required by the update endpoint.
    pub token: String,
    #[serde(default)]
    pub files: Vec<UpdateFileConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpdateFileConfig {
    pub key: String,
    pub target: PathBuf,
    pub template: PathBuf,
}

fn default_code_property() -> String {
    "DPTO_CCDGO".to_string()
}

fn default_name_property() -> String {
    "DPTO_CNMBR".to_string()
}

fn default_excluded_from_bounds() -> Vec<String> {
    vec!["88".to_string()]
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [input]
        boundaries = "mapa/ColDepSNVlite.geojson"
        index_data = "data/datos_indice.json"
        nutrition_data = "data/datos_nutricionales.json"
        indicator_config = "data/configuracion_app.json"
        weights = "data/002_Pesos_AHP_Hambre.json"
        site_config = "config/site_config.json"

        [output]
        layer_dir = "output"

        [server]
        port = 3000

        [update]
        token = "secret"

        [[update.files]]
        key = "datos_indice"
        target = "data/datos_indice.json"
        template = "data_example/datos_indice.json"
    "#;

    #[test]
    fn defaults_fill_property_names() {
        let config = AppConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.input.code_property, "DPTO_CCDGO");
        assert_eq!(config.input.name_property, "DPTO_CNMBR");
        assert_eq!(config.input.excluded_from_bounds, vec!["88".to_string()]);
        assert_eq!(config.update.files.len(), 1);
        assert_eq!(config.update.files[0].key, "datos_indice");
    }

    #[test]
    fn missing_section_is_an_error() {
        let err = AppConfig::from_toml("[server]\nport = 1").unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML"));
    }
}
