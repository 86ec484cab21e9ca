pub mod entries;
pub mod generation;
