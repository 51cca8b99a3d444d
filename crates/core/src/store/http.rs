//! Record store client for the hosted backend.
//!
//! One pooled `reqwest::Client` per store. The backend answers with an envelope even on
//! many non-2xx statuses, so the body is decoded first and the status only matters when
//! the body is not an envelope.

use super::{FetchQuery, FetchResponse, GetResponse, MutationResponse, Record, RecordStore};
use crate::config::RemoteStoreConfig;
use crate::error::{RecordError, RecordResult};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use ward_types::RecordId;

const PROJECT_HEADER: &str = "x-apper-project-id";
const KEY_HEADER: &str = "x-apper-public-key";

#[derive(Clone, Debug)]
pub struct HttpRecordStore {
    base_url: String,
    project_id: String,
    public_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct RecordsBody {
    records: Vec<Record>,
}

#[derive(Serialize)]
struct DeleteBody<'a> {
    #[serde(rename = "RecordIds")]
    record_ids: &'a [RecordId],
}

impl HttpRecordStore {
    pub fn new(cfg: &RemoteStoreConfig) -> RecordResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .build()?;

        Ok(Self {
            base_url: cfg.base_url().trim_end_matches('/').to_owned(),
            project_id: cfg.project_id().to_owned(),
            public_key: cfg.public_key().to_owned(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(PROJECT_HEADER, &self.project_id)
            .header(KEY_HEADER, &self.public_key)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> RecordResult<T> {
        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        let deserializer = &mut serde_json::Deserializer::from_str(&body);
        match serde_path_to_error::deserialize::<_, T>(deserializer) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(RecordError::Transport(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            ))),
            Err(err) => {
                let path = err.path().to_string();
                Err(RecordError::Malformed(format!(
                    "response schema mismatch at {path}: {}",
                    err.into_inner()
                )))
            }
        }
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn fetch_records(&self, table: &str, query: &FetchQuery) -> RecordResult<FetchResponse> {
        tracing::debug!(table, "fetch records");
        let builder = self
            .request(Method::POST, &format!("/tables/{table}/fetch"))
            .json(query);
        self.send(builder).await
    }

    async fn get_record_by_id(
        &self,
        table: &str,
        id: RecordId,
        fields: &[String],
    ) -> RecordResult<GetResponse> {
        tracing::debug!(table, %id, "get record");
        let query = FetchQuery {
            fields: fields.to_vec(),
            ..FetchQuery::default()
        };
        let builder = self
            .request(Method::POST, &format!("/tables/{table}/records/{id}/fetch"))
            .json(&query);
        self.send(builder).await
    }

    async fn create_records(
        &self,
        table: &str,
        records: Vec<Record>,
    ) -> RecordResult<MutationResponse> {
        tracing::debug!(table, count = records.len(), "create records");
        let builder = self
            .request(Method::POST, &format!("/tables/{table}/records"))
            .json(&RecordsBody { records });
        self.send(builder).await
    }

    async fn update_records(
        &self,
        table: &str,
        records: Vec<Record>,
    ) -> RecordResult<MutationResponse> {
        tracing::debug!(table, count = records.len(), "update records");
        let builder = self
            .request(Method::PUT, &format!("/tables/{table}/records"))
            .json(&RecordsBody { records });
        self.send(builder).await
    }

    async fn delete_records(
        &self,
        table: &str,
        ids: &[RecordId],
    ) -> RecordResult<MutationResponse> {
        tracing::debug!(table, count = ids.len(), "delete records");
        let builder = self
            .request(Method::DELETE, &format!("/tables/{table}/records"))
            .json(&DeleteBody { record_ids: ids });
        self.send(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteStoreConfig;
    use crate::error::ErrorKind;
    use crate::store::Condition;
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::{delete, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::time::Duration;

    async fn spawn_stub() -> String {
        let app = Router::new()
            .route(
                "/tables/:table/fetch",
                post(|Path(table): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    let key = headers
                        .get("x-apper-public-key")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_owned();
                    Json(json!({
                        "success": true,
                        "data": [{"Id": 1, "table": table, "key": key, "query": body}]
                    }))
                }),
            )
            .route(
                "/tables/:table/records/:id/fetch",
                post(|| async { (StatusCode::BAD_GATEWAY, "upstream exploded") }),
            )
            .route(
                "/tables/:table/records",
                delete(|Json(body): Json<Value>| async move {
                    (
                        StatusCode::FORBIDDEN,
                        Json(json!({"success": false, "message": format!("denied {}", body["RecordIds"])})),
                    )
                })
                .post(|| async { "not json" }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn store(base_url: String) -> HttpRecordStore {
        let cfg = RemoteStoreConfig::new(base_url, "proj-1", "pk-test", Duration::from_secs(5))
            .expect("valid config");
        HttpRecordStore::new(&cfg).expect("client builds")
    }

    #[tokio::test]
    async fn fetch_posts_query_with_credentials() {
        let store = store(spawn_stub().await);
        assert!(!store.base_url().ends_with('/'));

        let query = FetchQuery::new(&["ward_c"]).filter(Condition::equal_to("ward_c", "ICU"));
        let resp = store.fetch_records("bed_c", &query).await.unwrap();

        assert!(resp.success);
        let rows = resp.data.unwrap();
        let row = &rows[0];
        assert_eq!(row["table"], "bed_c");
        assert_eq!(row["key"], "pk-test");
        assert_eq!(row["query"]["where"][0]["Values"][0], "ICU");
    }

    #[tokio::test]
    async fn envelope_on_error_status_is_returned_as_is() {
        let store = store(spawn_stub().await);
        let resp = store
            .delete_records("bed_c", &[RecordId::new(5).unwrap()])
            .await
            .unwrap();
        assert!(!resp.success);
        assert_eq!(resp.message.as_deref(), Some("denied [5]"));
    }

    #[tokio::test]
    async fn non_envelope_error_status_is_transport() {
        let store = store(spawn_stub().await);
        let err = store
            .get_record_by_id("bed_c", RecordId::new(1).unwrap(), &[])
            .await
            .expect_err("502 without envelope");
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn non_envelope_success_is_malformed() {
        let store = store(spawn_stub().await);
        let err = store
            .create_records("bed_c", vec![Record::new()])
            .await
            .expect_err("plain text body");
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[tokio::test]
    async fn unreachable_host_is_transport() {
        let store = store("http://127.0.0.1:9".into());
        let err = store
            .fetch_records("bed_c", &FetchQuery::default())
            .await
            .expect_err("nothing listens on port 9");
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
