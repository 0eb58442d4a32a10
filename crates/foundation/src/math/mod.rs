pub mod geodesy;
pub mod mercator;
pub mod ring;
pub mod screen;

pub use geodesy::*;
pub use mercator::*;
pub use ring::*;
pub use screen::*;
