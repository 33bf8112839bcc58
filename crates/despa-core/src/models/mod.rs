//! Data models: configuration snapshot, page images, field maps and results.

pub mod catalog;
pub mod comparison;
pub mod config;
pub mod fields;
pub mod page;
