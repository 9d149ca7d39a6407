//! Service layer: resolver, evaluator and the tracer that drives them.

pub mod evaluator;
pub mod resolver;
pub mod tracer;

pub use evaluator::ExposureEvaluator;
pub use resolver::{ResolverSettings, SightingWindowResolver};
pub use tracer::ExposureMatchingTracer;
