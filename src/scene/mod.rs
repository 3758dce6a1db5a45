pub mod geometry;
pub mod lighting;
pub mod node;
pub mod panel;
pub mod resume;
pub mod text_label;
