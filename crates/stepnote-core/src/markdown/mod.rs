pub mod render;
pub mod segment;
pub mod slug;

pub use render::{render, render_markdown, FormSlot, RenderedBlock, RenderedDocument, SectionAnchor};
pub use segment::{AnchorMap, Marker, Segment, SegmentedDocument};
pub use slug::slugify;
