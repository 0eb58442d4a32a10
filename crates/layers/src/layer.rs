#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub u64);

pub trait Layer {
    fn id(&self) -> LayerId;

    fn title(&self) -> &str;
}
