use std::env;
use std::str::FromStr;

use foundation::LonLat;
use serde::Deserialize;

pub const DEFAULT_FEATURE_LAYER_URL: &str = "https://services2.arcgis.com/zjuHsgZRm0zT5o41/arcgis/rest/services/orlando_city/FeatureServer/0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidNumber { var: &'static str, value: String },
    Json(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidNumber { var, value } => {
                write!(f, "{var} is not a number: {value:?}")
            }
            ConfigError::Json(msg) => write!(f, "invalid widget config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Sent as the `token` parameter of feature service requests.
    pub api_key: Option<String>,
    pub basemap: String,
    /// Reference polygon layer, e.g. `.../FeatureServer/0`.
    pub feature_layer_url: String,
    pub center_lon: f64,
    pub center_lat: f64,
    pub zoom: f64,
    pub view_width_px: f64,
    pub view_height_px: f64,
    /// Buffer applied to every visibility query, in meters.
    pub query_distance_m: f64,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            basemap: "arcgis-navigation".to_string(),
            feature_layer_url: DEFAULT_FEATURE_LAYER_URL.to_string(),
            // Orlando, FL
            center_lon: -81.3789,
            center_lat: 28.5384,
            zoom: 9.0,
            view_width_px: 1280.0,
            view_height_px: 720.0,
            query_distance_m: 0.0,
        }
    }
}

impl WidgetConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the `ECOMAP_*` variables through `lookup`; unset ones keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Ok(Self {
            api_key: lookup("ECOMAP_API_KEY").filter(|k| !k.is_empty()),
            basemap: lookup("ECOMAP_BASEMAP").unwrap_or(d.basemap),
            feature_layer_url: lookup("ECOMAP_FEATURE_LAYER_URL").unwrap_or(d.feature_layer_url),
            center_lon: var_num(&lookup, "ECOMAP_CENTER_LON", d.center_lon)?,
            center_lat: var_num(&lookup, "ECOMAP_CENTER_LAT", d.center_lat)?,
            zoom: var_num(&lookup, "ECOMAP_ZOOM", d.zoom)?,
            view_width_px: var_num(&lookup, "ECOMAP_VIEW_WIDTH", d.view_width_px)?,
            view_height_px: var_num(&lookup, "ECOMAP_VIEW_HEIGHT", d.view_height_px)?,
            query_distance_m: var_num(&lookup, "ECOMAP_QUERY_DISTANCE_M", d.query_distance_m)?,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))
    }

    pub fn center(&self) -> LonLat {
        LonLat::new(self.center_lon, self.center_lat)
    }
}

fn var_num<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}
