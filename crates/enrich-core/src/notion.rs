//! Notion-compatible [`RecordStore`] over the public REST API.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use crate::schema::SchemaDescriptor;
use crate::store::{RecordStore, StoreError};
use crate::types::{TargetRecord, TypedValue};

pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
pub const DEFAULT_API_VERSION: &str = "2022-06-28";

pub struct NotionStore {
    client: Client,
    base_url: String,
    token: String,
    api_version: String,
}

impl NotionStore {
    pub fn new(
        base_url: &str,
        token: &str,
        api_version: &str,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            api_version: api_version.to_string(),
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, StoreError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "notion request");
        let mut req = self
            .client
            .request(method, &url)
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.api_version);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::NotFound(format!("{path}: {body}")));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<Value>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RecordStore for NotionStore {
    async fn fetch_schema(&self, store_id: &str) -> Result<SchemaDescriptor, StoreError> {
        let db = self
            .send(Method::GET, &format!("/databases/{store_id}"), None)
            .await?;
        SchemaDescriptor::from_notion_database(&db).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn query_record_by_title(
        &self,
        store_id: &str,
        title_field: &str,
        title: &str,
    ) -> Result<Option<TargetRecord>, StoreError> {
        let body = json!({
            "filter": { "property": title_field, "title": { "equals": title } },
            "page_size": 1,
        });
        let resp = self
            .send(
                Method::POST,
                &format!("/databases/{store_id}/query"),
                Some(body),
            )
            .await?;
        let results = resp
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| StoreError::Decode("query response has no results".into()))?;
        results.first().map(decode_page).transpose()
    }

    async fn create_record(
        &self,
        store_id: &str,
        fields: &BTreeMap<String, TypedValue>,
    ) -> Result<String, StoreError> {
        let body = json!({
            "parent": { "database_id": store_id },
            "properties": encode_properties(fields),
        });
        let page = self.send(Method::POST, "/pages", Some(body)).await?;
        page_id(&page)
    }

    async fn patch_record(
        &self,
        record_id: &str,
        fields: &BTreeMap<String, TypedValue>,
    ) -> Result<(), StoreError> {
        let body = json!({ "properties": encode_properties(fields) });
        self.send(Method::PATCH, &format!("/pages/{record_id}"), Some(body))
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Property encoding
// ---------------------------------------------------------------------------

fn rich_text(s: &str) -> Value {
    json!([{ "type": "text", "text": { "content": s } }])
}

pub fn encode_value(value: &TypedValue) -> Value {
    match value {
        TypedValue::Title(s) => json!({ "title": rich_text(s) }),
        TypedValue::Text(s) => json!({ "rich_text": rich_text(s) }),
        TypedValue::Email(s) => json!({ "email": s }),
        TypedValue::Url(s) => json!({ "url": s }),
        TypedValue::Phone(s) => json!({ "phone_number": s }),
        TypedValue::Number(n) => json!({ "number": n }),
        TypedValue::SingleChoice(s) => json!({ "select": { "name": s } }),
        TypedValue::MultiChoice(items) => {
            let options: Vec<Value> = items.iter().map(|s| json!({ "name": s })).collect();
            json!({ "multi_select": options })
        }
        TypedValue::Date(s) => json!({ "date": { "start": s } }),
        TypedValue::Boolean(b) => json!({ "checkbox": b }),
    }
}

pub fn encode_properties(fields: &BTreeMap<String, TypedValue>) -> Value {
    let props: Map<String, Value> = fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect();
    Value::Object(props)
}

// ---------------------------------------------------------------------------
// Property decoding
// ---------------------------------------------------------------------------

fn page_id(page: &Value) -> Result<String, StoreError> {
    page.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::Decode("page has no id".into()))
}

fn decode_page(page: &Value) -> Result<TargetRecord, StoreError> {
    let id = page_id(page)?;
    let fields = page
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .filter_map(|(name, prop)| decode_value(prop).map(|v| (name.clone(), v)))
                .collect()
        })
        .unwrap_or_default();
    Ok(TargetRecord { id, fields })
}

fn plain_text(runs: &Value) -> Option<String> {
    let text: String = runs
        .as_array()?
        .iter()
        .filter_map(|run| {
            run.get("plain_text")
                .or_else(|| run.pointer("/text/content"))
                .and_then(Value::as_str)
        })
        .collect();
    (!text.is_empty()).then_some(text)
}

fn non_empty_str(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Decode one property object. Empty and read-only properties yield `None`.
pub fn decode_value(prop: &Value) -> Option<TypedValue> {
    let ty = prop.get("type")?.as_str()?;
    let body = prop.get(ty);
    match ty {
        "title" => plain_text(body?).map(TypedValue::Title),
        "rich_text" => plain_text(body?).map(TypedValue::Text),
        "email" => non_empty_str(body).map(TypedValue::Email),
        "url" => non_empty_str(body).map(TypedValue::Url),
        "phone_number" => non_empty_str(body).map(TypedValue::Phone),
        "number" => match body? {
            Value::Number(n) => Some(TypedValue::Number(n.clone())),
            _ => None,
        },
        "select" | "status" => non_empty_str(body?.get("name")).map(TypedValue::SingleChoice),
        "multi_select" => {
            let names: Vec<String> = body?
                .as_array()?
                .iter()
                .filter_map(|o| non_empty_str(o.get("name")))
                .collect();
            (!names.is_empty()).then_some(TypedValue::MultiChoice(names))
        }
        "date" => non_empty_str(body?.get("start")).map(TypedValue::Date),
        "checkbox" => body?.as_bool().map(TypedValue::Boolean),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn store(server: &mockito::ServerGuard) -> NotionStore {
        NotionStore::new(&server.url(), "secret", DEFAULT_API_VERSION, Duration::from_secs(5))
            .unwrap()
    }

    fn fields() -> BTreeMap<String, TypedValue> {
        let mut f = BTreeMap::new();
        f.insert("Name".to_string(), TypedValue::Title("Matt Stevens".into()));
        f.insert("Position".to_string(), TypedValue::Text("CEO".into()));
        f.insert("Connections".to_string(), TypedValue::Number(500.into()));
        f.insert(
            "Skills".to_string(),
            TypedValue::MultiChoice(vec!["Leadership".into(), "Strategy".into()]),
        );
        f.insert("Verified".to_string(), TypedValue::Boolean(true));
        f
    }

    #[test]
    fn decodes_page_property_shapes() {
        let props = json!({
            "Email": {"id": "a", "type": "email", "email": "m@thf.org"},
            "Followers": {"id": "b", "type": "number", "number": 1204},
            "Seniority": {"id": "c", "type": "select", "select": {"id": "x", "name": "C-Level", "color": "red"}},
            "Skills": {"id": "d", "type": "multi_select", "multi_select": [{"name": "Leadership"}, {"name": "Strategy"}]},
            "Last Sync": {"id": "e", "type": "date", "date": {"start": "2024-05-01", "end": null}},
            "Verified": {"id": "f", "type": "checkbox", "checkbox": false}
        });
        let decoded = |name: &str| decode_value(&props[name]);
        assert_eq!(decoded("Email"), Some(TypedValue::Email("m@thf.org".into())));
        assert_eq!(decoded("Followers"), Some(TypedValue::Number(1204.into())));
        assert_eq!(decoded("Seniority"), Some(TypedValue::SingleChoice("C-Level".into())));
        assert_eq!(
            decoded("Skills"),
            Some(TypedValue::MultiChoice(vec!["Leadership".into(), "Strategy".into()]))
        );
        assert_eq!(decoded("Last Sync"), Some(TypedValue::Date("2024-05-01".into())));
        assert_eq!(decoded("Verified"), Some(TypedValue::Boolean(false)));
    }

    #[test]
    fn decode_skips_empty_and_readonly() {
        assert_eq!(decode_value(&json!({"type": "email", "email": null})), None);
        assert_eq!(decode_value(&json!({"type": "rich_text", "rich_text": []})), None);
        assert_eq!(decode_value(&json!({"type": "formula", "formula": {"string": "x"}})), None);
        assert_eq!(
            decode_value(&json!({"type": "status", "status": {"name": "Done"}})),
            Some(TypedValue::SingleChoice("Done".into()))
        );
    }

    #[tokio::test]
    async fn fetch_schema_reads_database() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/databases/db1")
            .match_header("authorization", "Bearer secret")
            .match_header("notion-version", DEFAULT_API_VERSION)
            .with_status(200)
            .with_body(
                json!({
                    "object": "database",
                    "properties": {
                        "Name": {"type": "title", "title": {}},
                        "Email": {"type": "email", "email": {}}
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let schema = store(&server).fetch_schema("db1").await.unwrap();
        assert_eq!(schema.title_field(), "Name");
        assert_eq!(schema.len(), 2);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_are_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/db1")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;
        let err = store(&server).fetch_schema("db1").await.unwrap_err();
        assert!(err.is_transient());
        assert!(matches!(err, StoreError::Status { status: 502, .. }));
    }

    #[tokio::test]
    async fn query_filters_on_title_and_decodes_first_page() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/databases/db1/query")
            .match_body(Matcher::PartialJson(json!({
                "filter": {"property": "Name", "title": {"equals": "Matt Stevens"}}
            })))
            .with_status(200)
            .with_body(
                json!({
                    "results": [{
                        "id": "page-1",
                        "properties": {
                            "Name": {"type": "title", "title": [{"plain_text": "Matt Stevens"}]},
                            "Company": {"type": "rich_text", "rich_text": [{"plain_text": "The Honor "}, {"plain_text": "Foundation"}]},
                            "Created": {"type": "created_time", "created_time": "2024-01-01T00:00:00Z"}
                        }
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let record = store(&server)
            .query_record_by_title("db1", "Name", "Matt Stevens")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.id, "page-1");
        assert_eq!(record.fields.len(), 2);
        assert_eq!(
            record.fields["Company"],
            TypedValue::Text("The Honor Foundation".into())
        );
        m.assert_async().await;
    }

    #[tokio::test]
    async fn query_with_no_results_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/databases/db1/query")
            .with_status(200)
            .with_body(r#"{"results": []}"#)
            .create_async()
            .await;
        let found = store(&server)
            .query_record_by_title("db1", "Name", "Nobody")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn create_posts_parent_and_properties() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/pages")
            .match_body(Matcher::PartialJson(json!({
                "parent": {"database_id": "db1"},
                "properties": {
                    "Name": {"title": [{"type": "text", "text": {"content": "Matt Stevens"}}]},
                    "Connections": {"number": 500},
                    "Skills": {"multi_select": [{"name": "Leadership"}, {"name": "Strategy"}]},
                    "Verified": {"checkbox": true}
                }
            })))
            .with_status(200)
            .with_body(r#"{"object": "page", "id": "new-page"}"#)
            .create_async()
            .await;

        let id = store(&server).create_record("db1", &fields()).await.unwrap();
        assert_eq!(id, "new-page");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn patch_sends_only_given_properties() {
        let mut server = mockito::Server::new_async().await;
        let mut patch = BTreeMap::new();
        patch.insert("Position".to_string(), TypedValue::Text("President".into()));
        let m = server
            .mock("PATCH", "/pages/page-1")
            .match_body(Matcher::Json(json!({
                "properties": {
                    "Position": {"rich_text": [{"type": "text", "text": {"content": "President"}}]}
                }
            })))
            .with_status(200)
            .with_body(r#"{"object": "page", "id": "page-1"}"#)
            .create_async()
            .await;

        store(&server).patch_record("page-1", &patch).await.unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn missing_page_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/pages/gone")
            .with_status(404)
            .with_body(r#"{"object": "error", "code": "object_not_found"}"#)
            .create_async()
            .await;
        let err = store(&server)
            .patch_record("gone", &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(!err.is_transient());
    }
}
