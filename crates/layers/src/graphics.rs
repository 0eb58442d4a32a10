use crate::layer::{Layer, LayerId};
use crate::registry::{Marker, MarkerHandle, MarkerRegistry, PlacedPoint};

/// Local display layer holding the widget's markers.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsLayer {
    id: LayerId,
    title: String,
    markers: MarkerRegistry,
}

impl GraphicsLayer {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id: LayerId(id),
            title: title.into(),
            markers: MarkerRegistry::new(),
        }
    }

    /// Builds a marker for `point`, styled by its category, and appends it.
    pub fn place(&mut self, point: PlacedPoint) -> MarkerHandle {
        self.markers.push(Marker::new(point))
    }

    pub fn markers(&self) -> &MarkerRegistry {
        &self.markers
    }

    pub fn markers_mut(&mut self) -> &mut MarkerRegistry {
        &mut self.markers
    }
}

impl Layer for GraphicsLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }
}
