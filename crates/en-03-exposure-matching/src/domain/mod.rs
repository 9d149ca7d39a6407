//! Domain layer: pure matching rules, no I/O.

pub mod cancellation;
pub mod config;
pub mod report;
pub mod request;
pub mod transition;
pub mod window;

pub use cancellation::CancellationToken;
pub use config::{MatchingConfig, MatchingConfigBuilder, MatchingPathKind, TracingParams};
pub use report::{RunOutcome, SkipReason, SkipTally, TraceReport, TracerState};
pub use request::MatchingRequest;
pub use transition::{TransitionDecision, TransitionTable};
pub use window::ValidWindow;
