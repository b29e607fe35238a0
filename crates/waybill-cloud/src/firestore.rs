use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use url::Url;
use waybill_types::TrackingRecord;

use crate::{DEFAULT_TIMEOUT_SECS, DocumentTransport, FirestoreConfig, USER_AGENT};

/// Public Firestore REST endpoint
pub const FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com";

/// Field that holds the serialized record inside each document
const DATA_FIELD: &str = "data";

/// Document store client (provider B).
///
/// Each record is one document `{collection}/{CODE}` whose `data` field holds
/// the record in Firestore's typed-value encoding. Writes only replace the
/// `data` field; other document fields are kept.
#[derive(Debug, Clone)]
pub struct FirestoreClient {
    endpoint: String,
    project_id: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreClient {
    /// Create a client against the public endpoint
    pub fn new(api_key: &str, project_id: &str) -> Self {
        Self::with_endpoint(
            FIRESTORE_ENDPOINT,
            api_key,
            project_id,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Create a client from config
    pub fn from_config(config: &FirestoreConfig, timeout: Duration) -> Self {
        Self::with_endpoint(
            config.endpoint(),
            config.api_key.as_deref().unwrap_or_default(),
            config.project_id.as_deref().unwrap_or_default(),
            timeout,
        )
    }

    /// Create a client against an explicit endpoint
    pub fn with_endpoint(endpoint: &str, api_key: &str, project_id: &str, timeout: Duration) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());

        Self {
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
            project_id: project_id.trim().to_string(),
            api_key: api_key.trim().to_string(),
            client,
        }
    }

    /// Get the API endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the project id
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn document_url(&self, collection: &str, id: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint)
            .with_context(|| format!("invalid document store endpoint: {}", self.endpoint))?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("document store endpoint cannot be a base: {}", self.endpoint))?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                self.project_id.as_str(),
                "databases",
                "(default)",
                "documents",
                collection,
                id,
            ]);
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .extend_pairs(params.iter().copied());
        Ok(url)
    }
}

impl DocumentTransport for FirestoreClient {
    fn get(&self, collection: &str, code: &str) -> Result<Option<TrackingRecord>> {
        let url = self.document_url(collection, code, &[])?;

        let response = self
            .client
            .get(url)
            .send()
            .context("failed to send request to document store")?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            bail!(
                "document lookup in {collection} failed with status {status}: {}",
                response.text().unwrap_or_default()
            );
        }

        let document: Document = response
            .json()
            .context("failed to parse document store response")?;

        let Some(data) = document.fields.get(DATA_FIELD) else {
            return Ok(None);
        };
        let value = from_firestore_value(data)?;
        if value.is_null() {
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .with_context(|| format!("document {code} in {collection} does not hold a tracking record"))
    }

    fn upsert(&self, collection: &str, code: &str, record: &TrackingRecord) -> Result<()> {
        let url = self.document_url(collection, code, &[("updateMask.fieldPaths", DATA_FIELD)])?;
        let data = serde_json::to_value(record).context("failed to serialize tracking record")?;
        let body = json!({ "fields": { DATA_FIELD: to_firestore_value(&data) } });

        let response = self
            .client
            .patch(url)
            .json(&body)
            .send()
            .context("failed to send write to document store")?;

        let status = response.status();
        if !status.is_success() {
            bail!(
                "document write to {collection} failed with status {status}: {}",
                response.text().unwrap_or_default()
            );
        }

        Ok(())
    }
}

/// Convert plain JSON into Firestore's typed-value encoding.
pub fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(to_firestore_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), to_firestore_value(v)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

/// Convert Firestore's typed-value encoding back into plain JSON.
pub fn from_firestore_value(value: &Value) -> Result<Value> {
    let object = value
        .as_object()
        .ok_or_else(|| anyhow!("typed value must be an object"))?;
    let (kind, inner) = object
        .iter()
        .next()
        .ok_or_else(|| anyhow!("typed value has no variant"))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| anyhow!("booleanValue is not a boolean")),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| anyhow!("integerValue is not an integer"))
        }
        "doubleValue" => inner
            .as_f64()
            .map(Value::from)
            .ok_or_else(|| anyhow!("doubleValue is not a number")),
        "stringValue" | "timestampValue" | "referenceValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| anyhow!("{kind} is not a string")),
        "arrayValue" => {
            let values = match inner.get("values") {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(from_firestore_value)
                    .collect::<Result<Vec<_>>>()?,
                Some(_) => bail!("arrayValue.values is not an array"),
                None => Vec::new(),
            };
            Ok(Value::Array(values))
        }
        "mapValue" => {
            let mut out = Map::new();
            match inner.get("fields") {
                Some(Value::Object(fields)) => {
                    for (k, v) in fields {
                        out.insert(k.clone(), from_firestore_value(v)?);
                    }
                }
                Some(_) => bail!("mapValue.fields is not an object"),
                None => {}
            }
            Ok(Value::Object(out))
        }
        other => bail!("unsupported typed value: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::thread;

    use tiny_http::{Header, Response, Server, StatusCode};

    use super::*;
    use waybill_types::NewStep;

    struct Captured {
        method: String,
        url: String,
        body: String,
    }

    fn spawn_server(
        responses: Vec<(u16, String)>,
    ) -> (String, thread::JoinHandle<Vec<Captured>>) {
        let server = Server::http("127.0.0.1:0").expect("server");
        let base_url = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || {
            let mut captured = Vec::new();
            for (status, body) in responses {
                let mut req = server.recv().expect("request");
                let mut req_body = String::new();
                req.as_reader()
                    .read_to_string(&mut req_body)
                    .expect("read body");
                captured.push(Captured {
                    method: req.method().to_string(),
                    url: req.url().to_string(),
                    body: req_body,
                });
                let resp = Response::from_string(body)
                    .with_status_code(StatusCode(status))
                    .with_header(
                        Header::from_bytes("Content-Type", "application/json").expect("header"),
                    );
                req.respond(resp).expect("respond");
            }
            captured
        });
        (base_url, handle)
    }

    fn client(base: &str) -> FirestoreClient {
        FirestoreClient::with_endpoint(base, "web-key", "demo-project", Duration::from_secs(5))
    }

    fn sample_record() -> TrackingRecord {
        let mut record = TrackingRecord::new("AB12", "Cuiabá", "Vitória").with_status("Postado");
        record.append_step(
            NewStep::new("Postado", "Cuiabá")
                .with_date("19/10/2026")
                .with_time("10:00"),
        );
        record
    }

    fn document_body(record: &TrackingRecord) -> String {
        let data = serde_json::to_value(record).expect("to value");
        json!({
            "name": "projects/demo-project/databases/(default)/documents/tracking/AB12",
            "fields": {
                "data": to_firestore_value(&data),
                "owner": { "stringValue": "ops" }
            }
        })
        .to_string()
    }

    #[test]
    fn typed_value_encoding_of_scalars() {
        assert_eq!(to_firestore_value(&json!(null)), json!({ "nullValue": null }));
        assert_eq!(to_firestore_value(&json!(true)), json!({ "booleanValue": true }));
        assert_eq!(to_firestore_value(&json!(7)), json!({ "integerValue": "7" }));
        assert_eq!(to_firestore_value(&json!(1.5)), json!({ "doubleValue": 1.5 }));
        assert_eq!(to_firestore_value(&json!("x")), json!({ "stringValue": "x" }));
    }

    #[test]
    fn typed_value_encoding_of_record_round_trips() {
        let data = serde_json::to_value(sample_record()).expect("to value");
        let typed = to_firestore_value(&data);
        assert!(typed["mapValue"]["fields"]["steps"]["arrayValue"]["values"].is_array());
        assert_eq!(from_firestore_value(&typed).expect("decode"), data);
    }

    #[test]
    fn typed_value_decoding_accepts_empty_containers() {
        assert_eq!(from_firestore_value(&json!({ "arrayValue": {} })).expect("array"), json!([]));
        assert_eq!(from_firestore_value(&json!({ "mapValue": {} })).expect("map"), json!({}));
    }

    #[test]
    fn typed_value_decoding_rejects_unknown_variants() {
        assert!(from_firestore_value(&json!({ "geoPointValue": {} })).is_err());
        assert!(from_firestore_value(&json!("bare")).is_err());
        assert!(from_firestore_value(&json!({})).is_err());
    }

    #[test]
    fn get_reads_data_field_of_document() {
        let record = sample_record();
        let (base, handle) = spawn_server(vec![(200, document_body(&record))]);

        let found = client(&base).get("tracking", "AB12").expect("get");
        assert_eq!(found, Some(record));

        let captured = handle.join().expect("join");
        assert_eq!(captured[0].method, "GET");
        assert_eq!(
            captured[0].url,
            "/v1/projects/demo-project/databases/(default)/documents/tracking/AB12?key=web-key"
        );
    }

    #[test]
    fn get_missing_document_is_none() {
        let (base, handle) = spawn_server(vec![(404, r#"{"error":{"code":404}}"#.to_string())]);
        assert!(client(&base).get("tracking", "AB12").expect("get").is_none());
        handle.join().expect("join");
    }

    #[test]
    fn get_document_without_data_is_none() {
        let body = json!({ "fields": { "owner": { "stringValue": "ops" } } }).to_string();
        let (base, handle) = spawn_server(vec![(200, body)]);
        assert!(client(&base).get("tracking", "AB12").expect("get").is_none());
        handle.join().expect("join");
    }

    #[test]
    fn get_permission_denied_is_err() {
        let (base, handle) = spawn_server(vec![(403, r#"{"error":{"code":403}}"#.to_string())]);
        assert!(client(&base).get("tracking", "AB12").is_err());
        handle.join().expect("join");
    }

    #[test]
    fn upsert_patches_only_the_data_field() {
        let (base, handle) = spawn_server(vec![(200, "{}".to_string())]);
        let record = sample_record();

        client(&base)
            .upsert("tracking_data", "AB12", &record)
            .expect("upsert");

        let captured = handle.join().expect("join");
        assert_eq!(captured[0].method, "PATCH");
        assert_eq!(
            captured[0].url,
            "/v1/projects/demo-project/databases/(default)/documents/tracking_data/AB12?key=web-key&updateMask.fieldPaths=data"
        );

        let sent: Value = serde_json::from_str(&captured[0].body).expect("json");
        let fields = sent["fields"].as_object().expect("fields");
        assert_eq!(fields.len(), 1);
        let decoded = from_firestore_value(&fields["data"]).expect("decode");
        assert_eq!(decoded["destination"], "Vitória");
    }

    #[test]
    fn upsert_error_status_is_err() {
        let (base, handle) = spawn_server(vec![(500, "{}".to_string())]);
        assert!(client(&base).upsert("tracking", "AB12", &sample_record()).is_err());
        handle.join().expect("join");
    }

    #[test]
    fn get_escapes_reserved_characters_in_code() {
        let (base, handle) = spawn_server(vec![(404, "{}".to_string())]);
        assert!(client(&base).get("tracking", "AB?X#Y").expect("get").is_none());

        let captured = handle.join().expect("join");
        assert_eq!(
            captured[0].url,
            "/v1/projects/demo-project/databases/(default)/documents/tracking/AB%3FX%23Y?key=web-key"
        );
    }

    #[test]
    fn upsert_keeps_reserved_code_in_one_path_segment() {
        let (base, handle) = spawn_server(vec![(200, "{}".to_string())]);
        client(&base)
            .upsert("tracking", "A B?/#%", &sample_record())
            .expect("upsert");

        let captured = handle.join().expect("join");
        assert_eq!(captured[0].method, "PATCH");
        assert_eq!(
            captured[0].url,
            "/v1/projects/demo-project/databases/(default)/documents/tracking/A%20B%3F%2F%23%25?key=web-key&updateMask.fieldPaths=data"
        );
    }

    #[test]
    fn endpoint_path_prefix_is_kept() {
        let client = FirestoreClient::with_endpoint(
            "http://localhost:8080/emulator/",
            "k",
            "p",
            Duration::from_secs(1),
        );
        let url = client.document_url("tracking", "AB12", &[]).expect("url");
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/emulator/v1/projects/p/databases/(default)/documents/tracking/AB12?key=k"
        );
    }

    #[test]
    fn from_config_uses_endpoint_override() {
        let config = FirestoreConfig::new("k", "p").with_endpoint("http://localhost:8080/");
        let client = FirestoreClient::from_config(&config, Duration::from_secs(1));
        assert_eq!(client.endpoint(), "http://localhost:8080");
        assert_eq!(client.project_id(), "p");
    }
}
