//! ArcGIS FeatureServer layer client.
//!
//! Speaks the REST `query` endpoint of a single layer
//! (`.../FeatureServer/<n>/query`) and the layer description (`...?f=json`).

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::feature::{FeatureSource, FeatureSourceError, LocalBoxFuture, SourceInfo};
use crate::query::{Feature, FeatureQuery, FeatureSet};

const WGS84_WKID: u32 = 4326;

#[derive(Debug, Clone)]
pub struct ArcGisFeatureService {
    http: reqwest::Client,
    layer_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    attributes: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    features: Vec<RawFeature>,
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayerResponse {
    #[serde(default)]
    name: String,
    geometry_type: Option<String>,
    error: Option<ServiceError>,
}

impl ArcGisFeatureService {
    pub fn new(layer_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), layer_url, api_key)
    }

    pub fn with_client(
        http: reqwest::Client,
        layer_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let layer_url = layer_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            layer_url,
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn layer_url(&self) -> &str {
        &self.layer_url
    }

    pub fn query_url(&self) -> String {
        format!("{}/query", self.layer_url)
    }

    /// Form parameters for a point query.
    pub fn query_params(&self, query: &FeatureQuery) -> Vec<(&'static str, String)> {
        let geometry = json!({
            "x": query.geometry.lon_deg,
            "y": query.geometry.lat_deg,
            "spatialReference": { "wkid": WGS84_WKID },
        });

        let mut params = vec![
            ("geometry", geometry.to_string()),
            ("geometryType", "esriGeometryPoint".to_string()),
            ("inSR", WGS84_WKID.to_string()),
            ("spatialRel", query.relationship.esri_name().to_string()),
            ("distance", query.distance_m.to_string()),
            ("units", "esriSRUnit_Meter".to_string()),
            ("where", query.where_clause()),
            ("outFields", query.out_fields_param()),
            ("returnGeometry", query.return_geometry.to_string()),
            ("f", "json".to_string()),
        ];
        self.push_token(&mut params);
        params
    }

    fn push_token(&self, params: &mut Vec<(&'static str, String)>) {
        if let Some(key) = &self.api_key {
            params.push(("token", key.clone()));
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<T, FeatureSourceError> {
        let resp = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| FeatureSourceError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeatureSourceError::Status(status.as_u16()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FeatureSourceError::Http(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| FeatureSourceError::Decode(e.to_string()))
    }
}

fn service_error(err: ServiceError) -> FeatureSourceError {
    FeatureSourceError::Service {
        code: err.code,
        message: err.message,
    }
}

fn into_feature_set(resp: QueryResponse) -> Result<FeatureSet, FeatureSourceError> {
    if let Some(err) = resp.error {
        return Err(service_error(err));
    }
    Ok(FeatureSet {
        features: resp
            .features
            .into_iter()
            .map(|f| Feature {
                attributes: f.attributes,
            })
            .collect(),
    })
}

/// Decodes a `query` response body.
pub fn decode_query_response(body: &str) -> Result<FeatureSet, FeatureSourceError> {
    let resp: QueryResponse =
        serde_json::from_str(body).map_err(|e| FeatureSourceError::Decode(e.to_string()))?;
    into_feature_set(resp)
}

impl FeatureSource for ArcGisFeatureService {
    fn load(&self) -> LocalBoxFuture<'_, Result<SourceInfo, FeatureSourceError>> {
        Box::pin(async move {
            let mut params = vec![("f", "json".to_string())];
            self.push_token(&mut params);
            let resp: LayerResponse = self.get_json(&self.layer_url, &params).await?;
            if let Some(err) = resp.error {
                return Err(service_error(err));
            }
            debug!(layer = %self.layer_url, name = %resp.name, "feature layer loaded");
            Ok(SourceInfo {
                name: resp.name,
                geometry_type: resp.geometry_type,
            })
        })
    }

    fn query(
        &self,
        query: FeatureQuery,
    ) -> LocalBoxFuture<'_, Result<FeatureSet, FeatureSourceError>> {
        Box::pin(async move {
            let params = self.query_params(&query);
            let resp: QueryResponse = self.get_json(&self.query_url(), &params).await?;
            let set = into_feature_set(resp)?;
            debug!(
                lon = query.geometry.lon_deg,
                lat = query.geometry.lat_deg,
                features = set.len(),
                "feature query answered"
            );
            Ok(set)
        })
    }
}
