//! Bed assignment.
//!
//! Placing a patient touches two tables: the bed (`status_c`, `patient_id_c`) and the
//! patient (`current_ward_c`, `bed_number_c`). The store has no transactions, so both
//! operations here follow the same shape:
//!
//! 1. Serialise in-process callers on the bed, then on the patient
//! 2. Check preconditions against fresh reads
//! 3. Write the bed with a guarded update, so a concurrent writer elsewhere is detected
//! 4. Write the patient's placement
//! 5. If step 4 fails, undo step 3; if that fails too, return both errors
//!
//! Locks are always taken bed first, then patient.

use super::{BedRepository, PatientRepository};
use crate::client::RecordClient;
use crate::constants::{BED_TABLE, PATIENT_TABLE};
use crate::error::{ErrorKind, RecordError, RecordResult};
use crate::models::{Bed, BedStatus};
use crate::store::Condition;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use ward_types::RecordId;

// ============================================================================
// KEYED LOCKS
// ============================================================================

type LockKey = (&'static str, RecordId);

/// One async mutex per record, created on first use and dropped once idle.
#[derive(Debug, Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<LockKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    async fn lock(&self, table: &'static str, id: RecordId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry((table, id)).or_default().clone()
        };
        lock.lock_owned().await
    }
}

// ============================================================================
// ASSIGNMENT SERVICE
// ============================================================================

/// Assigns patients to beds and releases them.
///
/// Clones share the same locks, so every clone serialises against every other.
#[derive(Clone, Debug)]
pub struct BedAssignmentService {
    client: RecordClient,
    beds: BedRepository,
    patients: PatientRepository,
    locks: Arc<KeyedLocks>,
}

impl BedAssignmentService {
    pub fn new(client: RecordClient) -> Self {
        Self {
            beds: BedRepository::new(client.clone()),
            patients: PatientRepository::new(client.clone()),
            client,
            locks: Arc::default(),
        }
    }

    /// Place `patient_id` in `bed_id` and return the now occupied bed.
    ///
    /// # Errors
    ///
    /// - `NotFound` if either record does not exist
    /// - `Conflict` if the bed is not `Available`, the patient already occupies another bed,
    ///   or the bed changed between the check and the write
    /// - `RollbackFailed` if the patient could not be updated and the bed could not be
    ///   returned to `Available`
    pub async fn assign_patient(&self, bed_id: RecordId, patient_id: RecordId) -> RecordResult<Bed> {
        let _bed_lock = self.locks.lock(BED_TABLE, bed_id).await;
        let _patient_lock = self.locks.lock(PATIENT_TABLE, patient_id).await;

        let bed = self.beds.get_by_id(bed_id).await?;
        if bed.status != BedStatus::Available {
            return Err(self.conflict(format!(
                "bed {} in {} is {}, not Available",
                bed.number, bed.ward, bed.status
            )));
        }

        let patient = self.patients.get_by_id(patient_id).await?;
        let current = self.beds.get_by_patient(patient_id).await?;
        if let Some(other) = current.iter().find(|b| b.id != bed_id) {
            return Err(self.conflict(format!(
                "patient {} already occupies bed {} in {}",
                patient.name, other.number, other.ward
            )));
        }

        let still_available = [Condition::equal_to(
            "status_c",
            BedStatus::Available.as_str(),
        )];
        let occupied = self
            .beds
            .set_occupancy(
                bed_id,
                BedStatus::Occupied,
                Some(patient_id),
                None,
                &still_available,
            )
            .await?;

        let placement = Some((occupied.ward.as_str(), occupied.number.as_str()));
        if let Err(err) = self.patients.set_placement(patient_id, placement, &[]).await {
            let ours = [
                Condition::equal_to("status_c", BedStatus::Occupied.as_str()),
                Condition::equal_to("patient_id_c", patient_id.get()),
            ];
            let undo = self
                .beds
                .set_occupancy(bed_id, BedStatus::Available, None, None, &ours)
                .await;
            return Err(self.after_rollback(err, undo));
        }

        tracing::info!(bed = %bed_id, patient = %patient_id, ward = %occupied.ward, "assigned patient to bed");
        Ok(occupied)
    }

    /// Free `bed_id`, stamp it as cleaned now, and clear the occupant's placement if it still
    /// points at this bed. Returns the now available bed.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the bed does not exist
    /// - `Conflict` if the bed is not `Occupied`, or changed between the check and the write
    /// - `RollbackFailed` if the patient could not be updated and the bed could not be
    ///   restored
    pub async fn release_patient(&self, bed_id: RecordId) -> RecordResult<Bed> {
        let _bed_lock = self.locks.lock(BED_TABLE, bed_id).await;

        let bed = self.beds.get_by_id(bed_id).await?;
        if bed.status != BedStatus::Occupied {
            return Err(self.conflict(format!(
                "bed {} in {} is {}, not Occupied",
                bed.number, bed.ward, bed.status
            )));
        }

        let occupant = bed.patient_id;
        let _patient_lock = match occupant {
            Some(patient_id) => Some(self.locks.lock(PATIENT_TABLE, patient_id).await),
            None => None,
        };

        let mut unchanged = vec![Condition::equal_to(
            "status_c",
            BedStatus::Occupied.as_str(),
        )];
        if let Some(patient_id) = occupant {
            unchanged.push(Condition::equal_to("patient_id_c", patient_id.get()));
        }
        let released = self
            .beds
            .set_occupancy(
                bed_id,
                BedStatus::Available,
                None,
                Some(Utc::now()),
                &unchanged,
            )
            .await?;

        if let Some(patient_id) = occupant {
            if let Err(err) = self.clear_placement(&bed, patient_id).await {
                let ours = [Condition::equal_to(
                    "status_c",
                    BedStatus::Available.as_str(),
                )];
                let undo = self
                    .beds
                    .set_occupancy(
                        bed_id,
                        BedStatus::Occupied,
                        Some(patient_id),
                        bed.last_cleaned,
                        &ours,
                    )
                    .await;
                return Err(self.after_rollback(err, undo));
            }
        }

        tracing::info!(bed = %bed_id, patient = ?occupant.map(RecordId::get), "released bed");
        Ok(released)
    }

    /// Clear the patient's ward and bed if they still name `bed`. A patient who has since
    /// been deleted or moved is left alone.
    async fn clear_placement(&self, bed: &Bed, patient_id: RecordId) -> RecordResult<()> {
        let patient = match self.patients.get_by_id(patient_id).await {
            Ok(patient) => patient,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::warn!(patient = %patient_id, "occupant no longer exists");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        if patient.placement() != Some((bed.ward.as_str(), bed.number.as_str())) {
            tracing::info!(patient = %patient_id, "occupant placement already moved; left unchanged");
            return Ok(());
        }

        let still_here = [
            Condition::equal_to("current_ward_c", bed.ward.as_str()),
            Condition::equal_to("bed_number_c", bed.number.as_str()),
        ];
        self.patients
            .set_placement(patient_id, None, &still_here)
            .await
            .map(|_| ())
    }

    fn conflict(&self, message: String) -> RecordError {
        tracing::warn!("bed assignment refused: {message}");
        self.client.notifier().notify_error(&message);
        RecordError::Conflict(message)
    }

    fn after_rollback(&self, source: RecordError, undo: RecordResult<Bed>) -> RecordError {
        match undo {
            Ok(_) => {
                tracing::warn!(error = %source, "bed change rolled back");
                source
            }
            Err(rollback) => {
                let err = RecordError::RollbackFailed {
                    source: Box::new(source),
                    rollback: Box::new(rollback),
                };
                tracing::error!(error = %err, "bed and patient records disagree");
                self.client.notifier().notify_error(&err.to_string());
                err
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BedDraft, PatientDraft};
    use crate::notify::CollectingNotifier;
    use crate::store::{
        FetchQuery, FetchResponse, GetResponse, InMemoryRecordStore, MutationResponse, Record,
        RecordStore,
    };
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use ward_types::NonEmptyText;

    /// In-memory store that can be told to fail placement writes and guarded bed resets.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryRecordStore,
        fail_patient_updates: AtomicBool,
        fail_bed_resets: AtomicBool,
    }

    #[async_trait]
    impl RecordStore for FlakyStore {
        async fn fetch_records(&self, table: &str, query: &FetchQuery) -> RecordResult<FetchResponse> {
            self.inner.fetch_records(table, query).await
        }

        async fn get_record_by_id(
            &self,
            table: &str,
            id: RecordId,
            fields: &[String],
        ) -> RecordResult<GetResponse> {
            self.inner.get_record_by_id(table, id, fields).await
        }

        async fn create_records(
            &self,
            table: &str,
            records: Vec<Record>,
        ) -> RecordResult<MutationResponse> {
            self.inner.create_records(table, records).await
        }

        async fn update_records(
            &self,
            table: &str,
            records: Vec<Record>,
        ) -> RecordResult<MutationResponse> {
            if table == PATIENT_TABLE && self.fail_patient_updates.load(Ordering::SeqCst) {
                return Err(RecordError::Transport("patient write timed out".into()));
            }
            self.inner.update_records(table, records).await
        }

        async fn delete_records(
            &self,
            table: &str,
            ids: &[RecordId],
        ) -> RecordResult<MutationResponse> {
            self.inner.delete_records(table, ids).await
        }

        async fn update_record_if(
            &self,
            table: &str,
            record: Record,
            guard: &[Condition],
        ) -> RecordResult<MutationResponse> {
            if table == PATIENT_TABLE && self.fail_patient_updates.load(Ordering::SeqCst) {
                return Err(RecordError::Transport("patient write timed out".into()));
            }
            let frees_bed = table == BED_TABLE
                && record.get("status_c").and_then(Value::as_str) == Some("Available");
            if frees_bed && self.fail_bed_resets.load(Ordering::SeqCst) {
                return Err(RecordError::Transport("bed reset lost".into()));
            }
            self.inner.update_record_if(table, record, guard).await
        }
    }

    struct Ward {
        store: Arc<FlakyStore>,
        notifier: Arc<CollectingNotifier>,
        beds: BedRepository,
        patients: PatientRepository,
        service: BedAssignmentService,
    }

    fn ward() -> Ward {
        let store = Arc::new(FlakyStore::default());
        let notifier = Arc::new(CollectingNotifier::new());
        let client = RecordClient::new(store.clone(), notifier.clone());
        Ward {
            store,
            notifier,
            beds: BedRepository::new(client.clone()),
            patients: PatientRepository::new(client.clone()),
            service: BedAssignmentService::new(client),
        }
    }

    impl Ward {
        async fn bed(&self, ward: &str, number: &str) -> Bed {
            let draft = BedDraft::new(
                NonEmptyText::new(ward).unwrap(),
                NonEmptyText::new(number).unwrap(),
            );
            self.beds.create(&draft).await.unwrap()
        }

        async fn patient(&self, name: &str) -> RecordId {
            let draft = PatientDraft::new(NonEmptyText::new(name).unwrap());
            self.patients.create(&draft).await.unwrap().id
        }
    }

    #[tokio::test]
    async fn assign_then_release_icu_bed_for_patient_42() {
        let ward = ward();
        let mut patient_id = ward.patient("Jane Smith").await;
        while patient_id.get() < 42 {
            patient_id = ward.patient("Filler").await;
        }
        let bed = ward.bed("ICU", "101").await;

        let occupied = ward.service.assign_patient(bed.id, patient_id).await.unwrap();
        assert_eq!(occupied.status, BedStatus::Occupied);
        assert_eq!(occupied.patient_id.map(RecordId::get), Some(42));
        let patient = ward.patients.get_by_id(patient_id).await.unwrap();
        assert_eq!(patient.placement(), Some(("ICU", "101")));
        assert_eq!(ward.beds.get_occupied_beds().await.unwrap().len(), 1);

        let released = ward.service.release_patient(bed.id).await.unwrap();
        assert_eq!(released.status, BedStatus::Available);
        assert_eq!(released.patient_id, None);
        assert!(released.last_cleaned >= bed.last_cleaned);
        let patient = ward.patients.get_by_id(patient_id).await.unwrap();
        assert_eq!(patient.placement(), None);
        assert!(ward.notifier.take().is_empty());
    }

    #[tokio::test]
    async fn occupied_bed_cannot_be_assigned_again() {
        let ward = ward();
        let bed = ward.bed("ICU", "101").await;
        let first = ward.patient("First").await;
        let second = ward.patient("Second").await;

        ward.service.assign_patient(bed.id, first).await.unwrap();
        let err = ward.service.assign_patient(bed.id, second).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(ward.notifier.take().len(), 1);

        let bed = ward.beds.get_by_id(bed.id).await.unwrap();
        assert_eq!(bed.patient_id, Some(first));
    }

    #[tokio::test]
    async fn patient_cannot_occupy_two_beds() {
        let ward = ward();
        let a = ward.bed("ICU", "101").await;
        let b = ward.bed("ICU", "102").await;
        let patient = ward.patient("Jane").await;

        ward.service.assign_patient(a.id, patient).await.unwrap();
        let err = ward.service.assign_patient(b.id, patient).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            ward.beds.get_by_id(b.id).await.unwrap().status,
            BedStatus::Available
        );
    }

    #[tokio::test]
    async fn concurrent_assignments_to_one_bed_yield_one_winner() {
        let ward = ward();
        let bed = ward.bed("ER", "3").await;
        let a = ward.patient("A").await;
        let b = ward.patient("B").await;

        let other = ward.service.clone();
        let (first, second) = tokio::join!(
            ward.service.assign_patient(bed.id, a),
            other.assign_patient(bed.id, b)
        );
        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        let loser = first.err().or(second.err()).unwrap();
        assert_eq!(loser.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn missing_patient_or_bed_is_not_found() {
        let ward = ward();
        let bed = ward.bed("ICU", "101").await;
        let nobody = RecordId::new(999).unwrap();

        let err = ward.service.assign_patient(bed.id, nobody).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = ward.service.release_patient(nobody).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn occupied_bed_keeps_its_place_until_release() {
        let ward = ward();
        let bed = ward.bed("ICU", "101").await;
        let patient = ward.patient("Jane").await;
        ward.service.assign_patient(bed.id, patient).await.unwrap();

        let moved = BedDraft::new(NonEmptyText::new("ER").unwrap(), NonEmptyText::new("7").unwrap());
        let err = ward.beds.update(bed.id, &moved).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(ward.notifier.take().len(), 1);

        ward.service.release_patient(bed.id).await.unwrap();
        let patient = ward.patients.get_by_id(patient).await.unwrap();
        assert_eq!(patient.placement(), None);

        let moved = ward.beds.update(bed.id, &moved).await.unwrap();
        assert_eq!((moved.ward.as_str(), moved.number.as_str()), ("ER", "7"));
    }

    #[tokio::test]
    async fn releasing_an_available_bed_conflicts() {
        let ward = ward();
        let bed = ward.bed("ICU", "101").await;
        let err = ward.service.release_patient(bed.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn failed_placement_rolls_the_bed_back() {
        let ward = ward();
        let bed = ward.bed("ICU", "101").await;
        let patient = ward.patient("Jane").await;
        ward.store.fail_patient_updates.store(true, Ordering::SeqCst);

        let err = ward.service.assign_patient(bed.id, patient).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);

        let bed = ward.beds.get_by_id(bed.id).await.unwrap();
        assert_eq!(bed.status, BedStatus::Available);
        assert_eq!(bed.patient_id, None);
    }

    #[tokio::test]
    async fn failed_rollback_reports_both_errors() {
        let ward = ward();
        let bed = ward.bed("ICU", "101").await;
        let patient = ward.patient("Jane").await;
        ward.store.fail_patient_updates.store(true, Ordering::SeqCst);
        ward.store.fail_bed_resets.store(true, Ordering::SeqCst);

        let err = ward.service.assign_patient(bed.id, patient).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RollbackFailed);
        let text = err.to_string();
        assert!(text.contains("patient write timed out"));
        assert!(text.contains("bed reset lost"));
        assert!(ward
            .notifier
            .take()
            .iter()
            .any(|m| m.contains("rollback")));
    }

    #[tokio::test]
    async fn failed_release_restores_occupancy() {
        let ward = ward();
        let bed = ward.bed("ICU", "101").await;
        let patient = ward.patient("Jane").await;
        ward.service.assign_patient(bed.id, patient).await.unwrap();
        ward.store.fail_patient_updates.store(true, Ordering::SeqCst);

        let err = ward.service.release_patient(bed.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);

        let bed = ward.beds.get_by_id(bed.id).await.unwrap();
        assert_eq!(bed.status, BedStatus::Occupied);
        assert_eq!(bed.patient_id, Some(patient));
    }

    #[tokio::test]
    async fn release_leaves_a_moved_patient_alone() {
        let ward = ward();
        let bed = ward.bed("ICU", "101").await;
        let patient = ward.patient("Jane").await;
        ward.service.assign_patient(bed.id, patient).await.unwrap();
        ward.patients
            .set_placement(patient, Some(("ER", "7")), &[])
            .await
            .unwrap();

        ward.service.release_patient(bed.id).await.unwrap();
        let patient = ward.patients.get_by_id(patient).await.unwrap();
        assert_eq!(patient.placement(), Some(("ER", "7")));
    }
}
