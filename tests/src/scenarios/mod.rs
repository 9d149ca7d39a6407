//! Cross-crate scenarios.

pub mod end_to_end;
pub mod lifecycle;
pub mod path_equivalence;
pub mod report_types;
