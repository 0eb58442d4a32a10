//! Decoding of the injected point list.
//!
//! Each point is a JSON object with `longitude`/`latitude` (or `x`/`y`), a
//! category code under `dbType`, and any number of extra attributes.

use std::collections::BTreeMap;

use foundation::LonLat;
use layers::registry::PlacedPoint;
use serde::Deserialize;
use serde_json::{Number, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum PointError {
    Json(String),
    MissingGeometry { index: usize },
    InvalidCoordinate { index: usize, longitude: f64, latitude: f64 },
}

impl std::fmt::Display for PointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointError::Json(msg) => write!(f, "point list is not valid JSON: {msg}"),
            PointError::MissingGeometry { index } => {
                write!(f, "point {index} has no longitude/latitude")
            }
            PointError::InvalidCoordinate {
                index,
                longitude,
                latitude,
            } => write!(
                f,
                "point {index} has invalid coordinates ({longitude}, {latitude})"
            ),
        }
    }
}

impl std::error::Error for PointError {}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CategoryValue {
    Text(String),
    Number(Number),
}

impl CategoryValue {
    fn into_code(self) -> String {
        match self {
            CategoryValue::Text(s) => s,
            CategoryValue::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawPoint {
    #[serde(default, alias = "x")]
    longitude: Option<f64>,
    #[serde(default, alias = "y")]
    latitude: Option<f64>,
    #[serde(default, rename = "dbType")]
    category: Option<CategoryValue>,
    #[serde(flatten)]
    attributes: BTreeMap<String, Value>,
}

/// Validates one raw point. `index` is only used in errors.
pub fn decode_point(index: usize, raw: RawPoint) -> Result<PlacedPoint, PointError> {
    let (Some(longitude), Some(latitude)) = (raw.longitude, raw.latitude) else {
        return Err(PointError::MissingGeometry { index });
    };
    let location = LonLat::new(longitude, latitude);
    if !location.is_valid() {
        return Err(PointError::InvalidCoordinate {
            index,
            longitude,
            latitude,
        });
    }

    Ok(PlacedPoint {
        location,
        category: raw
            .category
            .map(CategoryValue::into_code)
            .unwrap_or_default(),
        attributes: raw.attributes,
    })
}

/// Decodes a JSON array of points, failing on the first malformed one.
pub fn decode_points(json: &str) -> Result<Vec<PlacedPoint>, PointError> {
    let raw: Vec<RawPoint> = serde_json::from_str(json).map_err(|e| PointError::Json(e.to_string()))?;
    raw.into_iter()
        .enumerate()
        .map(|(index, p)| decode_point(index, p))
        .collect()
}
