//! Envelope handling shared by every repository.
//!
//! The store answers every call with an envelope. These helpers turn envelopes into typed
//! results: `success: false` becomes `RemoteRejected`, per-record failures become
//! `PartialFailure`, and a missing row becomes `NotFound`. Every failure is logged and
//! passed to the client's notifier before it is returned.

use crate::client::RecordClient;
use crate::constants::ID_FIELD;
use crate::error::{ErrorKind, RecordError, RecordResult};
use crate::models::Entity;
use crate::store::{Condition, FetchQuery, MutationResponse, Record, RecordOutcome};
use serde_json::Value;
use ward_types::RecordId;

/// Run `query` and decode every row that can be decoded.
pub(crate) async fn fetch_all<E: Entity>(
    client: &RecordClient,
    op: &'static str,
    query: FetchQuery,
) -> RecordResult<Vec<E>> {
    let result = async {
        let resp = client.store().fetch_records(E::TABLE, &query).await?;
        if !resp.success {
            return Err(rejected(resp.message));
        }
        Ok(decode_rows::<E>(resp.data.unwrap_or_default()))
    }
    .await;

    result.map_err(|err| report::<E>(client, op, err))
}

pub(crate) async fn fetch_one<E: Entity>(client: &RecordClient, id: RecordId) -> RecordResult<E> {
    let result = async {
        match fetch_raw::<E>(client, id).await? {
            Some(row) => E::from_record(row),
            None => Err(RecordError::NotFound { table: E::TABLE, id }),
        }
    }
    .await;

    result.map_err(|err| report::<E>(client, "get_by_id", err))
}

pub(crate) async fn create_one<E: Entity>(client: &RecordClient, record: Record) -> RecordResult<E> {
    let result = async {
        let resp = client.store().create_records(E::TABLE, vec![record]).await?;
        created_or_updated::<E>(resp)
    }
    .await;

    result.map_err(|err| report::<E>(client, "create", err))
}

/// Update one record. Only the columns present in `changes` are written.
pub(crate) async fn update_one<E: Entity>(
    client: &RecordClient,
    id: RecordId,
    changes: Record,
) -> RecordResult<E> {
    update_one_if(client, "update", id, changes, &[]).await
}

/// Update one record only while it satisfies every `guard` condition.
///
/// A refused update is re-read to say why: a vanished record is `NotFound`, a record that
/// no longer satisfies the guard is `Conflict`, anything else stays a `PartialFailure`.
pub(crate) async fn update_one_if<E: Entity>(
    client: &RecordClient,
    op: &'static str,
    id: RecordId,
    mut changes: Record,
    guard: &[Condition],
) -> RecordResult<E> {
    changes.insert(ID_FIELD.to_owned(), Value::from(id.get()));

    let result = async {
        let resp = if guard.is_empty() {
            client.store().update_records(E::TABLE, vec![changes]).await?
        } else {
            client.store().update_record_if(E::TABLE, changes, guard).await?
        };
        match created_or_updated::<E>(resp) {
            Err(err) if err.kind() == ErrorKind::PartialFailure => {
                Err(explain_refusal::<E>(client, id, guard, err).await)
            }
            other => other,
        }
    }
    .await;

    result.map_err(|err| report::<E>(client, op, err))
}

/// Delete one record; anything other than exactly one success is a failure.
pub(crate) async fn delete_one<E: Entity>(client: &RecordClient, id: RecordId) -> RecordResult<()> {
    let result = async {
        let resp = client.store().delete_records(E::TABLE, &[id]).await?;
        let outcomes = match checked_outcomes(resp) {
            Ok(outcomes) => outcomes,
            Err(err) => return Err(explain_refusal::<E>(client, id, &[], err).await),
        };
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        if succeeded != 1 {
            return Err(RecordError::PartialFailure {
                failed: outcomes.len().saturating_sub(succeeded),
                total: outcomes.len(),
                messages: vec![format!(
                    "expected one deleted record, store reported {succeeded}"
                )],
            });
        }
        Ok(())
    }
    .await;

    result.map_err(|err| report::<E>(client, "delete", err))
}

async fn fetch_raw<E: Entity>(client: &RecordClient, id: RecordId) -> RecordResult<Option<Record>> {
    let fields: Vec<String> = E::FIELDS.iter().map(|f| (*f).to_owned()).collect();
    let resp = client.store().get_record_by_id(E::TABLE, id, &fields).await?;
    if !resp.success {
        return Err(rejected(resp.message));
    }
    Ok(resp.data.filter(|row| !row.is_empty()))
}

async fn explain_refusal<E: Entity>(
    client: &RecordClient,
    id: RecordId,
    guard: &[Condition],
    err: RecordError,
) -> RecordError {
    if err.kind() != ErrorKind::PartialFailure {
        return err;
    }
    match fetch_raw::<E>(client, id).await {
        Ok(None) => RecordError::NotFound { table: E::TABLE, id },
        Ok(Some(row)) if !guard.iter().all(|c| c.matches(&row)) => RecordError::Conflict(format!(
            "{} record {id} changed before the update could be applied",
            E::TABLE
        )),
        _ => err,
    }
}

fn rejected(message: Option<String>) -> RecordError {
    RecordError::RemoteRejected(message.unwrap_or_else(|| "request was rejected".into()))
}

fn checked_outcomes(resp: MutationResponse) -> RecordResult<Vec<RecordOutcome>> {
    if !resp.success {
        return Err(rejected(resp.message));
    }
    let outcomes = resp
        .results
        .ok_or_else(|| RecordError::Malformed("mutation response has no results".into()))?;

    let messages: Vec<String> = outcomes
        .iter()
        .filter(|o| !o.success)
        .map(|o| o.message.clone().unwrap_or_else(|| "record rejected".into()))
        .collect();
    if !messages.is_empty() {
        return Err(RecordError::PartialFailure {
            failed: messages.len(),
            total: outcomes.len(),
            messages,
        });
    }
    Ok(outcomes)
}

fn created_or_updated<E: Entity>(resp: MutationResponse) -> RecordResult<E> {
    let row = checked_outcomes(resp)?
        .into_iter()
        .next()
        .and_then(|o| o.data)
        .ok_or_else(|| RecordError::Malformed(format!("{} result carries no record", E::TABLE)))?;
    E::from_record(row)
}

fn decode_rows<E: Entity>(rows: Vec<Record>) -> Vec<E> {
    let total = rows.len();
    let decoded: Vec<E> = rows
        .into_iter()
        .filter_map(|row| match E::from_record(row) {
            Ok(entity) => Some(entity),
            Err(err) => {
                tracing::warn!(table = E::TABLE, error = %err, "skipping undecodable row");
                None
            }
        })
        .collect();
    tracing::debug!(table = E::TABLE, total, kept = decoded.len(), "fetched {}", E::PLURAL);
    decoded
}

fn report<E: Entity>(client: &RecordClient, op: &'static str, err: RecordError) -> RecordError {
    if err.kind() == ErrorKind::NotFound {
        tracing::debug!(table = E::TABLE, op, "{err}");
        return err;
    }
    tracing::error!(table = E::TABLE, op, kind = err.kind().as_str(), "{err}");
    for message in err.user_messages() {
        client.notifier().notify_error(&message);
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Staff;
    use crate::notify::CollectingNotifier;
    use crate::store::{FetchResponse, GetResponse, RecordStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    type Script<T> = Mutex<VecDeque<RecordResult<T>>>;

    /// Answers each call with the next scripted response of its kind.
    #[derive(Default)]
    struct ScriptedStore {
        fetches: Script<FetchResponse>,
        gets: Script<GetResponse>,
        mutations: Script<MutationResponse>,
    }

    fn next<T>(script: &Script<T>) -> RecordResult<T> {
        script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RecordError::Transport("script exhausted".into())))
    }

    #[async_trait]
    impl RecordStore for ScriptedStore {
        async fn fetch_records(&self, _: &str, _: &FetchQuery) -> RecordResult<FetchResponse> {
            next(&self.fetches)
        }

        async fn get_record_by_id(
            &self,
            _: &str,
            _: RecordId,
            _: &[String],
        ) -> RecordResult<GetResponse> {
            next(&self.gets)
        }

        async fn create_records(&self, _: &str, _: Vec<Record>) -> RecordResult<MutationResponse> {
            next(&self.mutations)
        }

        async fn update_records(&self, _: &str, _: Vec<Record>) -> RecordResult<MutationResponse> {
            next(&self.mutations)
        }

        async fn delete_records(&self, _: &str, _: &[RecordId]) -> RecordResult<MutationResponse> {
            next(&self.mutations)
        }
    }

    fn client(store: ScriptedStore) -> (RecordClient, Arc<CollectingNotifier>) {
        let notifier = Arc::new(CollectingNotifier::new());
        (RecordClient::new(Arc::new(store), notifier.clone()), notifier)
    }

    fn row(value: Value) -> Record {
        value.as_object().cloned().expect("object")
    }

    fn id(n: i64) -> RecordId {
        RecordId::new(n).unwrap()
    }

    #[tokio::test]
    async fn unsuccessful_envelope_is_remote_rejected_and_notified() {
        let store = ScriptedStore::default();
        store.fetches.lock().unwrap().push_back(Ok(FetchResponse {
            success: false,
            data: None,
            message: Some("invalid public key".into()),
        }));
        let (client, notifier) = client(store);

        let err = fetch_all::<Staff>(&client, "get_all", FetchQuery::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteRejected);
        assert_eq!(
            notifier.take(),
            vec!["record store rejected the request: invalid public key"]
        );
    }

    #[tokio::test]
    async fn transport_errors_pass_through() {
        let (client, notifier) = client(ScriptedStore::default());
        let err = fetch_all::<Staff>(&client, "get_all", FetchQuery::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(notifier.take().len(), 1);
    }

    #[tokio::test]
    async fn per_record_failures_are_partial_failures() {
        let store = ScriptedStore::default();
        store
            .mutations
            .lock()
            .unwrap()
            .push_back(Ok(MutationResponse::with_results(vec![
                RecordOutcome::failed("name_c is required"),
            ])));
        let (client, notifier) = client(store);

        let err = create_one::<Staff>(&client, Record::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PartialFailure);
        assert_eq!(notifier.take(), vec!["name_c is required"]);
    }

    #[tokio::test]
    async fn created_result_without_data_is_malformed() {
        let store = ScriptedStore::default();
        store
            .mutations
            .lock()
            .unwrap()
            .push_back(Ok(MutationResponse::with_results(vec![RecordOutcome::ok(None)])));
        let (client, _) = client(store);

        let err = create_one::<Staff>(&client, Record::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[tokio::test]
    async fn missing_data_is_not_found_without_notification() {
        let store = ScriptedStore::default();
        store.gets.lock().unwrap().push_back(Ok(GetResponse {
            success: true,
            data: None,
            message: None,
        }));
        let (client, notifier) = client(store);

        let err = fetch_one::<Staff>(&client, id(8)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(notifier.take().is_empty());
    }

    #[tokio::test]
    async fn delete_needs_exactly_one_success() {
        let store = ScriptedStore::default();
        store
            .mutations
            .lock()
            .unwrap()
            .push_back(Ok(MutationResponse::with_results(vec![
                RecordOutcome::ok(None),
                RecordOutcome::ok(None),
            ])));
        let (client, _) = client(store);

        let err = delete_one::<Staff>(&client, id(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PartialFailure);
    }

    #[tokio::test]
    async fn refused_guarded_update_on_changed_record_is_conflict() {
        let store = ScriptedStore::default();
        store.fetches.lock().unwrap().push_back(Ok(FetchResponse {
            success: true,
            data: Some(vec![]),
            message: None,
        }));
        store.gets.lock().unwrap().push_back(Ok(GetResponse {
            success: true,
            data: Some(row(json!({"Id": 1, "name_c": "A", "shift_c": "Night"}))),
            message: None,
        }));
        let (client, _) = client(store);

        let guard = [Condition::equal_to("shift_c", "Day")];
        let err = update_one_if::<Staff>(&client, "update", id(1), Record::new(), &guard)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn undecodable_rows_are_dropped_from_lists() {
        let store = ScriptedStore::default();
        store.fetches.lock().unwrap().push_back(Ok(FetchResponse {
            success: true,
            data: Some(vec![
                row(json!({"Id": 1, "name_c": "Kept"})),
                row(json!({"name_c": "No id"})),
            ]),
            message: None,
        }));
        let (client, notifier) = client(store);

        let staff = fetch_all::<Staff>(&client, "get_all", FetchQuery::default())
            .await
            .unwrap();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0].name, "Kept");
        assert!(notifier.take().is_empty());
    }
}
