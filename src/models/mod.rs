pub mod entry;
pub mod generation;
