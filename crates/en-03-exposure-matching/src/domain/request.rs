//! Matching request.

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_types::{key_batch_hash, DiagnosisKey, PackageRoot, TokenRoot};

/// One batch of diagnosis keys to match on behalf of a calling app.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingRequest {
    pub package_name: String,
    #[serde_as(as = "Hex")]
    pub signature_hash: Vec<u8>,
    /// Caller-chosen token partitioning the results.
    pub token: String,
    pub diagnosis_keys: Vec<DiagnosisKey>,
}

impl MatchingRequest {
    pub fn new(
        package_name: impl Into<String>,
        signature_hash: impl Into<Vec<u8>>,
        token: impl Into<String>,
        diagnosis_keys: Vec<DiagnosisKey>,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            signature_hash: signature_hash.into(),
            token: token.into(),
            diagnosis_keys,
        }
    }

    pub fn token_root(&self) -> TokenRoot {
        TokenRoot::encode(&self.package_name, &self.signature_hash, &self.token)
    }

    pub fn package_root(&self) -> PackageRoot {
        PackageRoot::encode(&self.package_name, &self.signature_hash)
    }

    pub fn key_batch_hash(&self) -> [u8; 32] {
        key_batch_hash(&self.diagnosis_keys)
    }
}
