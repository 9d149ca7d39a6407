//! # Shared Types Crate
//!
//! This crate contains the data model used across the matching workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a crate boundary
//!   (diagnosis keys, sightings, exposure results) is defined here.
//! - **Opaque key material**: diagnosis key bytes are carried as-is; length is
//!   validated by the derivation layer, which reports malformed keys as
//!   per-key crypto failures.
//! - **Interval arithmetic in one place**: conversions between epoch seconds,
//!   interval numbers and day numbers live in [`intervals`] so the resolver and
//!   the evaluator cannot disagree on boundaries.

pub mod entities;
pub mod errors;
pub mod intervals;
pub mod roots;

pub use entities::*;
pub use errors::*;
pub use intervals::{DayNumber, IntervalClock};
pub use roots::{PackageRoot, TokenRoot};
