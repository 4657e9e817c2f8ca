// src/tables/mod.rs
pub mod client;
pub mod models;

pub use client::{read_with_fallback, source_for};
pub use models::{ExtractionMode, RawTable};
