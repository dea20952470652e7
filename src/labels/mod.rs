pub mod rare;
pub mod taxonomy;

pub use rare::{CollectSummary, LabelEntry, LabelStats};
pub use taxonomy::{HierarchyEntry, Primitive};
