//! Reference feature layers and the sources that answer their queries.
//!
//! A [`FeatureSource`] is anything that can answer "which features match this
//! geometry and predicate", asynchronously. The widget uses one as the
//! reference polygon set that decides which markers stay visible.

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use foundation::LonLat;
use foundation::math::{distance_to_ring_m, rings_contain};
use serde_json::{Map, Value};

use crate::layer::{Layer, LayerId};
use crate::query::{Feature, FeatureQuery, FeatureSet, SpatialRelationship, properties_match};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureSourceError {
    /// Transport failure before a response arrived.
    Http(String),
    /// Non-success HTTP status.
    Status(u16),
    /// The service answered with an error payload.
    Service { code: i64, message: String },
    /// The response could not be decoded.
    Decode(String),
}

impl std::fmt::Display for FeatureSourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureSourceError::Http(msg) => write!(f, "feature service request failed: {msg}"),
            FeatureSourceError::Status(status) => {
                write!(f, "feature service returned HTTP {status}")
            }
            FeatureSourceError::Service { code, message } => {
                write!(f, "feature service error {code}: {message}")
            }
            FeatureSourceError::Decode(msg) => {
                write!(f, "feature service response malformed: {msg}")
            }
        }
    }
}

impl std::error::Error for FeatureSourceError {}

/// Boxed future bound to the current thread.
///
/// Feature queries run on the UI event loop, so sources are not required to
/// be `Send`.
pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Descriptive metadata returned when a source is loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceInfo {
    pub name: String,
    pub geometry_type: Option<String>,
}

pub trait FeatureSource {
    /// Fetches layer metadata. Layer views report "updating" while this runs.
    fn load(&self) -> LocalBoxFuture<'_, Result<SourceInfo, FeatureSourceError>>;

    /// Returns the features matching `query`.
    fn query(&self, query: FeatureQuery)
    -> LocalBoxFuture<'_, Result<FeatureSet, FeatureSourceError>>;
}

/// A remote or in-memory reference layer added to the map.
#[derive(Clone)]
pub struct FeatureLayer {
    id: LayerId,
    title: String,
    source: Rc<dyn FeatureSource>,
}

impl FeatureLayer {
    pub fn new(id: u64, title: impl Into<String>, source: Rc<dyn FeatureSource>) -> Self {
        Self {
            id: LayerId(id),
            title: title.into(),
            source,
        }
    }

    pub fn source(&self) -> &dyn FeatureSource {
        self.source.as_ref()
    }
}

impl std::fmt::Debug for FeatureLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureLayer")
            .field("id", &self.id)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl Layer for FeatureLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonFeature {
    /// Outer ring first; further rings are holes (even-odd).
    pub rings: Vec<Vec<LonLat>>,
    pub attributes: Map<String, Value>,
}

impl PolygonFeature {
    pub fn new(rings: Vec<Vec<LonLat>>) -> Self {
        Self {
            rings,
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    fn intersects(&self, p: LonLat, distance_m: f64) -> bool {
        if rings_contain(&self.rings, p) {
            return true;
        }
        distance_m > 0.0
            && self
                .rings
                .iter()
                .any(|ring| distance_to_ring_m(ring, p) <= distance_m)
    }

    fn matches(&self, query: &FeatureQuery) -> bool {
        let p = query.geometry;
        match query.relationship {
            SpatialRelationship::Intersects => self.intersects(p, query.distance_m),
            SpatialRelationship::Within => rings_contain(&self.rings, p),
            // A point never contains an area.
            SpatialRelationship::Contains => false,
            SpatialRelationship::Disjoint => !self.intersects(p, query.distance_m),
        }
    }
}

/// Polygons held in memory and evaluated locally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolygonFeatureSource {
    name: String,
    features: Vec<PolygonFeature>,
}

impl PolygonFeatureSource {
    pub fn new(name: impl Into<String>, features: Vec<PolygonFeature>) -> Self {
        Self {
            name: name.into(),
            features,
        }
    }

    /// Parses `[[[[lon, lat], ...], ...], ...]`: polygons, each a list of rings.
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self, FeatureSourceError> {
        let polygons: Vec<Vec<Vec<[f64; 2]>>> =
            serde_json::from_str(json).map_err(|e| FeatureSourceError::Decode(e.to_string()))?;
        let features = polygons
            .into_iter()
            .map(|rings| {
                PolygonFeature::new(
                    rings
                        .into_iter()
                        .map(|ring| ring.into_iter().map(|[lon, lat]| LonLat::new(lon, lat)).collect())
                        .collect(),
                )
            })
            .collect();
        Ok(Self::new(name, features))
    }

    pub fn features(&self) -> &[PolygonFeature] {
        &self.features
    }

    pub fn evaluate(&self, query: &FeatureQuery) -> FeatureSet {
        let features = self
            .features
            .iter()
            .filter(|f| f.matches(query))
            .filter(|f| properties_match(&f.attributes, &query.filters))
            .map(|f| Feature {
                attributes: f.attributes.clone(),
            })
            .collect();
        FeatureSet { features }
    }
}

impl FeatureSource for PolygonFeatureSource {
    fn load(&self) -> LocalBoxFuture<'_, Result<SourceInfo, FeatureSourceError>> {
        Box::pin(std::future::ready(Ok(SourceInfo {
            name: self.name.clone(),
            geometry_type: Some("esriGeometryPolygon".to_string()),
        })))
    }

    fn query(
        &self,
        query: FeatureQuery,
    ) -> LocalBoxFuture<'_, Result<FeatureSet, FeatureSourceError>> {
        Box::pin(std::future::ready(Ok(self.evaluate(&query))))
    }
}

#[cfg(test)]
mod tests {
    use super::{FeatureSource, FeatureSourceError, PolygonFeature, PolygonFeatureSource};
    use crate::query::{FeatureQuery, PropertyFilter, SpatialRelationship};
    use foundation::LonLat;

    fn square(min_lon: f64, min_lat: f64, size: f64) -> Vec<LonLat> {
        vec![
            LonLat::new(min_lon, min_lat),
            LonLat::new(min_lon + size, min_lat),
            LonLat::new(min_lon + size, min_lat + size),
            LonLat::new(min_lon, min_lat + size),
        ]
    }

    fn orlando() -> PolygonFeatureSource {
        PolygonFeatureSource::new(
            "city",
            vec![
                PolygonFeature::new(vec![square(-81.5, 28.4, 0.2)]).with_attribute("NAME", "West"),
                PolygonFeature::new(vec![square(-81.3, 28.4, 0.2)]).with_attribute("NAME", "East"),
            ],
        )
    }

    #[tokio::test]
    async fn intersects_finds_containing_polygon() {
        let src = orlando();
        let hit = src
            .query(FeatureQuery::at(LonLat::new(-81.4, 28.5)))
            .await
            .expect("query");
        assert_eq!(hit.len(), 1);
        assert_eq!(hit.features[0].attributes["NAME"], "West");

        let miss = src
            .query(FeatureQuery::at(LonLat::new(-80.0, 28.5)))
            .await
            .expect("query");
        assert!(miss.is_empty());
    }

    #[test]
    fn distance_buffer_reaches_nearby_polygon() {
        let src = orlando();
        // About 1 km east of the east square's edge.
        let p = LonLat::new(-81.09, 28.5);
        assert!(src.evaluate(&FeatureQuery::at(p)).is_empty());
        assert_eq!(
            src.evaluate(&FeatureQuery::at(p).with_distance_m(2_000.0)).len(),
            1
        );
    }

    #[test]
    fn relationships_for_point_queries() {
        let src = orlando();
        let inside = LonLat::new(-81.2, 28.5);
        let q = FeatureQuery::at(inside);

        let within = src.evaluate(&q.clone().with_relationship(SpatialRelationship::Within));
        assert_eq!(within.len(), 1);
        let contains = src.evaluate(&q.clone().with_relationship(SpatialRelationship::Contains));
        assert!(contains.is_empty());
        let disjoint = src.evaluate(&q.with_relationship(SpatialRelationship::Disjoint));
        assert_eq!(disjoint.features[0].attributes["NAME"], "West");
    }

    #[test]
    fn attribute_filters_apply_after_geometry() {
        let src = orlando();
        let q = FeatureQuery::at(LonLat::new(-81.4, 28.5))
            .with_filter(PropertyFilter::equals("NAME", "East"));
        assert!(src.evaluate(&q).is_empty());
    }

    #[test]
    fn parses_polygon_json() {
        let src = PolygonFeatureSource::from_json(
            "file",
            "[[[[0,0],[1,0],[1,1],[0,1]]], [[[5,5],[6,5],[6,6]]]]",
        )
        .expect("parse");
        assert_eq!(src.features().len(), 2);
        assert_eq!(src.features()[1].rings[0].len(), 3);

        let err = PolygonFeatureSource::from_json("bad", "{").unwrap_err();
        assert!(matches!(err, FeatureSourceError::Decode(_)));
    }
}
