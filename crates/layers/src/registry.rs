use std::collections::BTreeMap;

use foundation::LonLat;
use foundation::handles::Handle;
use serde_json::Value;

use crate::symbology::{MarkerStyle, style_for};

/// One input point, after decoding and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPoint {
    pub location: LonLat,
    /// Raw category code; only used as a style lookup key.
    pub category: String,
    pub attributes: BTreeMap<String, Value>,
}

impl PlacedPoint {
    pub fn new(location: LonLat, category: impl Into<String>) -> Self {
        Self {
            location,
            category: category.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// String view of an attribute; non-string values are rendered as JSON.
    pub fn attribute_text(&self, key: &str) -> Option<String> {
        match self.attributes.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerHandle(pub Handle);

impl MarkerHandle {
    pub fn index(&self) -> u32 {
        self.0.index()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub point: PlacedPoint,
    pub style: MarkerStyle,
    pub visible: bool,
}

impl Marker {
    pub fn new(point: PlacedPoint) -> Self {
        let style = style_for(&point.category);
        Self {
            point,
            style,
            visible: true,
        }
    }
}

/// Append-only store of placed markers.
///
/// Handles are assigned in placement order and stay valid for the lifetime
/// of the registry. Markers are never removed; they can only be hidden.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MarkerRegistry {
    markers: Vec<Marker>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, marker: Marker) -> MarkerHandle {
        let handle = MarkerHandle(Handle::new(self.markers.len() as u32));
        self.markers.push(marker);
        handle
    }

    pub fn get(&self, handle: MarkerHandle) -> Option<&Marker> {
        self.markers.get(handle.0.slot())
    }

    /// Hides a marker. Returns `true` if it was visible before.
    pub fn hide(&mut self, handle: MarkerHandle) -> bool {
        match self.markers.get_mut(handle.0.slot()) {
            Some(marker) => std::mem::replace(&mut marker.visible, false),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Markers with their handles, in placement order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (MarkerHandle, &Marker)> + '_ {
        self.markers
            .iter()
            .enumerate()
            .map(|(i, m)| (MarkerHandle(Handle::new(i as u32)), m))
    }

    pub fn handles(&self) -> impl Iterator<Item = MarkerHandle> + '_ {
        self.iter().map(|(h, _)| h)
    }
}
