//! Visited-cell geo filter.

use shared_types::{DiagnosisKey, KeyIdentity};
use std::collections::{HashMap, HashSet};

use crate::ports::outbound::GeoCellFilter;

/// Admits keys whose claimed cells overlap the cells the receiver visited.
/// Keys without a claim are always admitted.
#[derive(Debug, Clone, Default)]
pub struct VisitedCellFilter {
    visited: HashSet<u64>,
    claims: HashMap<KeyIdentity, HashSet<u64>>,
}

impl VisitedCellFilter {
    pub fn new(visited: impl IntoIterator<Item = u64>) -> Self {
        Self {
            visited: visited.into_iter().collect(),
            claims: HashMap::new(),
        }
    }

    pub fn with_claim(mut self, identity: KeyIdentity, cells: impl IntoIterator<Item = u64>) -> Self {
        self.claims.entry(identity).or_default().extend(cells);
        self
    }
}

impl GeoCellFilter for VisitedCellFilter {
    fn admits(&self, key: &DiagnosisKey) -> bool {
        match self.claims.get(&key.identity()) {
            Some(cells) => !cells.is_disjoint(&self.visited),
            None => true,
        }
    }
}
