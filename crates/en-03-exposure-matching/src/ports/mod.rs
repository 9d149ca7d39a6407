//! Ports: what the matching core offers and what it needs.

pub mod inbound;
pub mod outbound;
