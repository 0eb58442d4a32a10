use std::cell::RefCell;
use std::rc::Rc;

use layers::feature::FeatureLayer;
use layers::graphics::GraphicsLayer;
use layers::{Layer, LayerId};

/// A layer as held by the map. Layers are shared with whoever created them.
#[derive(Debug, Clone)]
pub enum MapLayer {
    Graphics(Rc<RefCell<GraphicsLayer>>),
    Feature(Rc<FeatureLayer>),
}

impl MapLayer {
    pub fn id(&self) -> LayerId {
        match self {
            MapLayer::Graphics(layer) => layer.borrow().id(),
            MapLayer::Feature(layer) => layer.id(),
        }
    }
}

/// Basemap plus an ordered layer stack, bottom first.
#[derive(Debug, Clone)]
pub struct Map {
    basemap: String,
    layers: Vec<MapLayer>,
}

impl Map {
    pub fn new(basemap: impl Into<String>) -> Self {
        Self {
            basemap: basemap.into(),
            layers: Vec::new(),
        }
    }

    pub fn basemap(&self) -> &str {
        &self.basemap
    }

    /// Bottom to top.
    pub fn layers(&self) -> &[MapLayer] {
        &self.layers
    }

    pub fn find_layer(&self, id: LayerId) -> Option<&MapLayer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    /// Adds `layer` on top. Returns `false` if a layer with its id is already present.
    pub fn add(&mut self, layer: MapLayer) -> bool {
        let top = self.layers.len();
        self.add_at(layer, top)
    }

    /// Inserts `layer` at `index` (0 is the bottom), clamped to the stack size.
    ///
    /// Returns `false` if a layer with its id is already present.
    pub fn add_at(&mut self, layer: MapLayer, index: usize) -> bool {
        if self.find_layer(layer.id()).is_some() {
            return false;
        }
        let index = index.min(self.layers.len());
        self.layers.insert(index, layer);
        true
    }

    pub fn remove(&mut self, id: LayerId) -> Option<MapLayer> {
        let pos = self.layers.iter().position(|l| l.id() == id)?;
        Some(self.layers.remove(pos))
    }
}
