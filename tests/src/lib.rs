//! # Exposure Matching Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── scenarios/
//!     ├── end_to_end.rs        # single-key match, windows, replay
//!     ├── path_equivalence.rs  # Managed / ManagedPrefilter / Accelerated agree
//!     ├── report_types.rs      # dedupe, transitions, rolling-period immutability
//!     └── lifecycle.rs         # cancellation, concurrency guard, storage failures
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p en-tests
//! cargo test -p en-tests scenarios::path_equivalence::
//! cargo bench -p en-tests
//! ```

pub mod fixtures;
pub mod scenarios;
