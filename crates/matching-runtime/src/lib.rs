//! # Matching Runtime Library
//!
//! Pieces of the `matching-runtime` binary, exposed for testing.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`EN_LOG_LEVEL`, then `RUST_LOG`, default `info`)
//! 2. Load `MatchingConfig` from `EN_*` variables and validate it
//! 3. Load the JSON input into in-memory stores
//! 4. Run one trace on a blocking worker; Ctrl-C cancels it cooperatively
//! 5. Print the `TraceReport` as JSON

pub mod input;
pub mod logging;
pub mod runtime;

pub use input::RunInput;
pub use logging::init_logging;
pub use runtime::MatchingRuntime;
