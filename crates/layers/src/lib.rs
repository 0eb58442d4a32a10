pub mod arcgis;
pub mod feature;
pub mod graphics;
pub mod layer;
pub mod query;
pub mod registry;
pub mod symbology;

pub use layer::*;
