//! In-memory stores.
//!
//! One [`InMemoryStores`] holds the shared state; every `open_*` call hands
//! out a scoped handle over it. Used by tests and by the local runtime.
//! Failure switches let tests exercise storage error paths.

use parking_lot::RwLock;
use shared_types::{
    CompletedMatchingRequestRecord, ContactRecord, DayNumber, ExposureResult, KeyIdentity,
    PackageRoot, RollingProximityId, SightingRecord, TokenRoot,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::StorageError;
use crate::ports::outbound::{AttemptedKeyStore, ContactStore, ExposureResultStore, StoreProvider};

type ResultKey = (TokenRoot, Vec<u8>);

#[derive(Default)]
struct Shared {
    contacts: BTreeMap<(DayNumber, RollingProximityId), Vec<SightingRecord>>,
    results: HashMap<ResultKey, ExposureResult>,
    completed: Vec<(TokenRoot, CompletedMatchingRequestRecord)>,
    attempted: HashMap<(PackageRoot, KeyIdentity), u32>,
    unavailable: bool,
    fail_contact_reads: bool,
    fail_next_commit: bool,
}

impl Shared {
    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable {
            return Err(StorageError::Unavailable("in-memory store switched off".into()));
        }
        Ok(())
    }
}

/// Decrements the open-handle count when a handle is dropped.
struct HandleGuard(Arc<AtomicUsize>);

impl HandleGuard {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStores {
    shared: Arc<RwLock<Shared>>,
    open_handles: Arc<AtomicUsize>,
    raw_id_scans: Arc<AtomicUsize>,
}

impl InMemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sighting of `proximity_id` to the record of `day`.
    pub fn add_sighting(&self, day: DayNumber, proximity_id: RollingProximityId, sighting: SightingRecord) {
        self.shared
            .write()
            .contacts
            .entry((day, proximity_id))
            .or_default()
            .push(sighting);
    }

    pub fn add_contact_record(&self, record: ContactRecord) {
        let mut shared = self.shared.write();
        shared
            .contacts
            .entry((record.day_number, record.proximity_id))
            .or_default()
            .extend(record.sightings);
    }

    /// Committed result for (token, key).
    pub fn result(&self, token_root: &TokenRoot, key_data: &[u8]) -> Option<ExposureResult> {
        self.shared
            .read()
            .results
            .get(&(*token_root, key_data.to_vec()))
            .cloned()
    }

    pub fn result_count(&self, token_root: &TokenRoot) -> usize {
        self.shared
            .read()
            .results
            .keys()
            .filter(|(root, _)| root == token_root)
            .count()
    }

    pub fn completed_requests(&self, token_root: &TokenRoot) -> Vec<CompletedMatchingRequestRecord> {
        self.shared
            .read()
            .completed
            .iter()
            .filter(|(root, _)| root == token_root)
            .map(|(_, record)| record.clone())
            .collect()
    }

    pub fn attempted_rolling_period(&self, package_root: &PackageRoot, identity: &KeyIdentity) -> Option<u32> {
        self.shared
            .read()
            .attempted
            .get(&(*package_root, identity.clone()))
            .copied()
    }

    /// Handles currently open across all stores.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// Number of full identifier scans served so far.
    pub fn raw_id_scans(&self) -> usize {
        self.raw_id_scans.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.write().unavailable = unavailable;
    }

    pub fn fail_contact_reads(&self, fail: bool) {
        self.shared.write().fail_contact_reads = fail;
    }

    pub fn fail_next_commit(&self) {
        self.shared.write().fail_next_commit = true;
    }
}

impl StoreProvider for InMemoryStores {
    type Contacts = InMemoryContactStore;
    type Results = InMemoryResultStore;
    type Attempted = InMemoryAttemptedKeyStore;

    fn open_contact_store(&self) -> Result<Self::Contacts, StorageError> {
        self.shared.read().check_available()?;
        Ok(InMemoryContactStore {
            shared: Arc::clone(&self.shared),
            raw_id_scans: Arc::clone(&self.raw_id_scans),
            _guard: HandleGuard::acquire(&self.open_handles),
        })
    }

    fn open_result_store(&self) -> Result<Self::Results, StorageError> {
        self.shared.read().check_available()?;
        Ok(InMemoryResultStore {
            shared: Arc::clone(&self.shared),
            pending: HashMap::new(),
            _guard: HandleGuard::acquire(&self.open_handles),
        })
    }

    fn open_attempted_key_store(&self) -> Result<Self::Attempted, StorageError> {
        self.shared.read().check_available()?;
        Ok(InMemoryAttemptedKeyStore {
            shared: Arc::clone(&self.shared),
            _guard: HandleGuard::acquire(&self.open_handles),
        })
    }
}

pub struct InMemoryContactStore {
    shared: Arc<RwLock<Shared>>,
    raw_id_scans: Arc<AtomicUsize>,
    _guard: HandleGuard,
}

impl ContactStore for InMemoryContactStore {
    fn get_record(
        &self,
        day: DayNumber,
        proximity_id: &RollingProximityId,
    ) -> Result<Option<ContactRecord>, StorageError> {
        let shared = self.shared.read();
        shared.check_available()?;
        if shared.fail_contact_reads {
            return Err(StorageError::Io(format!("read of {} failed", day)));
        }
        Ok(shared
            .contacts
            .get(&(day, *proximity_id))
            .map(|sightings| ContactRecord {
                day_number: day,
                proximity_id: *proximity_id,
                sightings: sightings.clone(),
            }))
    }

    fn get_all_raw_ids(&self) -> Result<Vec<Vec<u8>>, StorageError> {
        let shared = self.shared.read();
        shared.check_available()?;
        self.raw_id_scans.fetch_add(1, Ordering::SeqCst);
        Ok(shared
            .contacts
            .keys()
            .map(|(_, id)| id.as_bytes().to_vec())
            .collect())
    }
}

/// Result store handle. Held writes are private to the handle until commit
/// and are discarded if the handle is dropped first.
pub struct InMemoryResultStore {
    shared: Arc<RwLock<Shared>>,
    pending: HashMap<ResultKey, ExposureResult>,
    _guard: HandleGuard,
}

impl ExposureResultStore for InMemoryResultStore {
    fn has_result(&self, token_root: &TokenRoot, key_data: &[u8]) -> Result<bool, StorageError> {
        Ok(self.get_result(token_root, key_data)?.is_some())
    }

    fn get_result(
        &self,
        token_root: &TokenRoot,
        key_data: &[u8],
    ) -> Result<Option<ExposureResult>, StorageError> {
        let key = (*token_root, key_data.to_vec());
        if let Some(result) = self.pending.get(&key) {
            return Ok(Some(result.clone()));
        }
        let shared = self.shared.read();
        shared.check_available()?;
        Ok(shared.results.get(&key).cloned())
    }

    fn store_result(
        &mut self,
        token_root: &TokenRoot,
        key_data: &[u8],
        result: &ExposureResult,
        hold_for_transaction: bool,
    ) -> Result<bool, StorageError> {
        let key = (*token_root, key_data.to_vec());
        if hold_for_transaction {
            self.pending.insert(key, result.clone());
            return Ok(true);
        }
        let mut shared = self.shared.write();
        shared.check_available()?;
        self.pending.remove(&key);
        shared.results.insert(key, result.clone());
        Ok(true)
    }

    fn commit_transaction(&mut self) -> Result<(), StorageError> {
        let mut shared = self.shared.write();
        shared.check_available()?;
        if shared.fail_next_commit {
            shared.fail_next_commit = false;
            let dropped = self.pending.len();
            self.pending.clear();
            return Err(StorageError::CommitFailed(format!(
                "{} held results not written",
                dropped
            )));
        }
        let committed = self.pending.len();
        shared.results.extend(self.pending.drain());
        debug!(committed, "In-memory result transaction committed");
        Ok(())
    }

    fn record_completed_request(
        &mut self,
        token_root: &TokenRoot,
        record: CompletedMatchingRequestRecord,
    ) -> Result<(), StorageError> {
        let mut shared = self.shared.write();
        shared.check_available()?;
        shared.completed.push((*token_root, record));
        Ok(())
    }
}

pub struct InMemoryAttemptedKeyStore {
    shared: Arc<RwLock<Shared>>,
    _guard: HandleGuard,
}

impl AttemptedKeyStore for InMemoryAttemptedKeyStore {
    fn rolling_period_changed(
        &self,
        package_root: &PackageRoot,
        identity: &KeyIdentity,
        rolling_period: u32,
    ) -> Result<bool, StorageError> {
        let shared = self.shared.read();
        shared.check_available()?;
        Ok(shared
            .attempted
            .get(&(*package_root, identity.clone()))
            .is_some_and(|&stored| stored != rolling_period))
    }

    fn store_attempted_key_rolling_period(
        &mut self,
        package_root: &PackageRoot,
        identity: &KeyIdentity,
        rolling_period: u32,
    ) -> Result<(), StorageError> {
        let mut shared = self.shared.write();
        shared.check_available()?;
        shared
            .attempted
            .insert((*package_root, identity.clone()), rolling_period);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ReportType;

    fn result(report_type: ReportType) -> ExposureResult {
        ExposureResult {
            key_data: vec![9; 16],
            rolling_start_interval_number: 0,
            transmission_risk_level: 0,
            report_type,
            exposure_windows: vec![],
            raw_exposure_windows: vec![],
            report_type_transition_count: 0,
            exposure_minutes: 5,
            risk_score: 0,
        }
    }

    fn root() -> TokenRoot {
        TokenRoot::encode("com.example", b"sig", "token")
    }

    #[test]
    fn test_contact_records_by_day() {
        let stores = InMemoryStores::new();
        let id = RollingProximityId::new([4; 16]);
        stores.add_sighting(DayNumber(10), id, SightingRecord::new(100, -60, vec![0; 4]));
        stores.add_sighting(DayNumber(10), id, SightingRecord::new(200, -61, vec![0; 4]));

        let contacts = stores.open_contact_store().unwrap();
        let record = contacts.get_record(DayNumber(10), &id).unwrap().unwrap();
        assert_eq!(record.sightings.len(), 2);
        assert!(contacts.get_record(DayNumber(11), &id).unwrap().is_none());
        assert_eq!(contacts.get_all_raw_ids().unwrap(), vec![vec![4u8; 16]]);
    }

    #[test]
    fn test_held_writes_visible_to_handle_only_until_commit() {
        let stores = InMemoryStores::new();
        let mut results = stores.open_result_store().unwrap();

        results
            .store_result(&root(), &[9; 16], &result(ReportType::ConfirmedTest), true)
            .unwrap();
        assert!(results.has_result(&root(), &[9; 16]).unwrap(), "Handle reads its own held writes");
        assert!(stores.result(&root(), &[9; 16]).is_none(), "Held write must not be durable yet");

        results.commit_transaction().unwrap();
        assert!(stores.result(&root(), &[9; 16]).is_some());
    }

    #[test]
    fn test_dropped_handle_discards_held_writes() {
        let stores = InMemoryStores::new();
        {
            let mut results = stores.open_result_store().unwrap();
            results
                .store_result(&root(), &[9; 16], &result(ReportType::ConfirmedTest), true)
                .unwrap();
            assert_eq!(stores.open_handles(), 1);
        }
        assert_eq!(stores.open_handles(), 0, "Drop must release the handle");
        assert!(stores.result(&root(), &[9; 16]).is_none());
    }

    #[test]
    fn test_failed_commit_surfaces() {
        let stores = InMemoryStores::new();
        let mut results = stores.open_result_store().unwrap();
        results
            .store_result(&root(), &[9; 16], &result(ReportType::ConfirmedTest), true)
            .unwrap();
        stores.fail_next_commit();

        assert!(matches!(
            results.commit_transaction(),
            Err(StorageError::CommitFailed(_))
        ));
        assert!(stores.result(&root(), &[9; 16]).is_none());
    }

    #[test]
    fn test_attempted_rolling_period() {
        let stores = InMemoryStores::new();
        let package = PackageRoot::encode("com.example", b"sig");
        let identity = KeyIdentity {
            key_data: vec![1; 16],
            rolling_start_interval_number: 144,
        };
        let mut attempted = stores.open_attempted_key_store().unwrap();

        assert!(!attempted.rolling_period_changed(&package, &identity, 144).unwrap());
        attempted
            .store_attempted_key_rolling_period(&package, &identity, 144)
            .unwrap();
        assert!(!attempted.rolling_period_changed(&package, &identity, 144).unwrap());
        assert!(attempted.rolling_period_changed(&package, &identity, 100).unwrap());
    }

    #[test]
    fn test_unavailable_store() {
        let stores = InMemoryStores::new();
        stores.set_unavailable(true);
        assert!(matches!(
            stores.open_contact_store(),
            Err(StorageError::Unavailable(_))
        ));
    }
}
