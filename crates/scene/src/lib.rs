pub mod layer_view;
pub mod map;
pub mod picking;
pub mod popup;
pub mod view;

pub use map::*;
pub use view::*;
