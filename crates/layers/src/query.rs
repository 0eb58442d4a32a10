use foundation::LonLat;
use serde_json::{Map, Value};

/// Spatial predicate between the query geometry and each feature.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpatialRelationship {
    Intersects,
    /// The query geometry contains the feature.
    Contains,
    /// The query geometry lies within the feature.
    Within,
    Disjoint,
}

impl SpatialRelationship {
    /// Name used by the ArcGIS REST `spatialRel` parameter.
    pub fn esri_name(&self) -> &'static str {
        match self {
            SpatialRelationship::Intersects => "esriSpatialRelIntersects",
            SpatialRelationship::Contains => "esriSpatialRelContains",
            SpatialRelationship::Within => "esriSpatialRelWithin",
            SpatialRelationship::Disjoint => "esriSpatialRelDisjoint",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyOp {
    Eq,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFilter {
    pub key: String,
    pub op: PropertyOp,
    pub value: String,
}

impl PropertyFilter {
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            op: PropertyOp::Eq,
            value: value.into(),
        }
    }

    pub fn contains(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            op: PropertyOp::Contains,
            value: value.into(),
        }
    }

    /// SQL fragment for a service-side `where` clause.
    pub fn to_sql(&self) -> String {
        let value = self.value.replace('\'', "''");
        match self.op {
            PropertyOp::Eq => format!("{} = '{}'", self.key, value),
            PropertyOp::Contains => format!("{} LIKE '%{}%'", self.key, value),
        }
    }
}

/// A spatial query against a feature layer, anchored on one point.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureQuery {
    pub geometry: LonLat,
    pub relationship: SpatialRelationship,
    /// Buffer around `geometry` in meters; 0 tests the point itself.
    pub distance_m: f64,
    pub filters: Vec<PropertyFilter>,
    /// Empty means all fields.
    pub out_fields: Vec<String>,
    pub return_geometry: bool,
}

impl FeatureQuery {
    /// Intersects query at `geometry`, no buffer, no attribute filter.
    pub fn at(geometry: LonLat) -> Self {
        Self {
            geometry,
            relationship: SpatialRelationship::Intersects,
            distance_m: 0.0,
            filters: Vec::new(),
            out_fields: Vec::new(),
            return_geometry: false,
        }
    }

    pub fn with_relationship(mut self, relationship: SpatialRelationship) -> Self {
        self.relationship = relationship;
        self
    }

    pub fn with_distance_m(mut self, distance_m: f64) -> Self {
        self.distance_m = distance_m.max(0.0);
        self
    }

    pub fn with_filter(mut self, filter: PropertyFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// `where` clause; `1=1` when there is no filter.
    pub fn where_clause(&self) -> String {
        if self.filters.is_empty() {
            return "1=1".to_string();
        }
        self.filters
            .iter()
            .map(PropertyFilter::to_sql)
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    pub fn out_fields_param(&self) -> String {
        if self.out_fields.is_empty() {
            "*".to_string()
        } else {
            self.out_fields.join(",")
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feature {
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    pub features: Vec<Feature>,
}

impl FeatureSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Client-side evaluation of attribute filters. All filters must match.
pub fn properties_match(attributes: &Map<String, Value>, filters: &[PropertyFilter]) -> bool {
    filters.iter().all(|f| {
        let Some(v) = attributes.get(&f.key) else {
            return false;
        };
        let text = value_text(v);
        match f.op {
            PropertyOp::Eq => text == f.value,
            PropertyOp::Contains => text.contains(&f.value),
        }
    })
}
