pub mod event_bus;
pub mod updating;

pub use event_bus::*;
pub use updating::*;
