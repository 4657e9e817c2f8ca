// src/extractors/mod.rs
pub mod allowance;
pub mod attendance;
pub mod blocks;
pub mod fields;
pub mod records;
pub mod text;

// Re-export key extraction types for convenience
pub use allowance::AllowanceParser;
pub use attendance::AttendanceParser;
