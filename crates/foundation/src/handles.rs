/// Stable index handle into an append-only store.
///
/// Handles are never reused: the store they point into only grows.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32);

impl Handle {
    pub fn new(index: u32) -> Self {
        Handle(index)
    }

    pub fn index(&self) -> u32 {
        self.0
    }

    pub fn slot(&self) -> usize {
        self.0 as usize
    }
}
