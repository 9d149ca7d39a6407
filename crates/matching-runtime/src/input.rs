//! JSON run input.
//!
//! ```json
//! {
//!   "token": "TOKEN",
//!   "diagnosis_keys": [
//!     {"key_data": "…hex…", "rolling_start_interval_number": 2700000,
//!      "rolling_period": 144, "report_type": "CONFIRMED_TEST"}
//!   ],
//!   "contact_records": [
//!     {"day_number": 18750, "proximity_id": "…hex…",
//!      "sightings": [{"epoch_seconds": 1620022200, "rssi": -60,
//!                     "associated_encrypted_metadata": "…hex…"}]}
//!   ]
//! }
//! ```

use anyhow::Context;
use en_03_exposure_matching::{InMemoryStores, MatchingRequest};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_types::{ContactRecord, DiagnosisKey};
use std::path::Path;

const DEFAULT_PACKAGE_NAME: &str = "local.matching.runtime";
const DEFAULT_TOKEN: &str = "local";

fn default_package_name() -> String {
    DEFAULT_PACKAGE_NAME.to_string()
}

fn default_token() -> String {
    DEFAULT_TOKEN.to_string()
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInput {
    #[serde(default = "default_package_name")]
    pub package_name: String,
    #[serde_as(as = "Hex")]
    #[serde(default)]
    pub signature_hash: Vec<u8>,
    #[serde(default = "default_token")]
    pub token: String,
    pub diagnosis_keys: Vec<DiagnosisKey>,
    #[serde(default)]
    pub contact_records: Vec<ContactRecord>,
}

impl RunInput {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse run input")
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run input {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Load contact records into `stores` and build the request.
    pub fn into_request(self, stores: &InMemoryStores) -> MatchingRequest {
        for record in self.contact_records {
            stores.add_contact_record(record);
        }
        MatchingRequest::new(
            self.package_name,
            self.signature_hash,
            self.token,
            self.diagnosis_keys,
        )
    }
}
