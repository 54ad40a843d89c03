//! GraphQL-over-HTTP remote store
//!
//! Every call is a POST of `{"query", "variables"}` to a single endpoint.
//! Non-2xx statuses, undecodable bodies, and non-empty `errors` arrays
//! all surface as [`RemoteError`].

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use url::Url;

use crate::document::{DocumentHeader, Operation};
use crate::drive::Drive;

use super::errors::{RemoteError, RemoteResult};
use super::store::{DocumentPage, PageRequest, PushOutcome, RemoteStore, ReplayBatch};

/// Longest response body echoed back in an error
const MAX_ERROR_BODY: usize = 512;

const DRIVES_QUERY: &str = "query Drives { drives }";

const DRIVE_QUERY: &str = "query Drive($id: String!) { \
    drive(id: $id) { id name slug icon nodes { id name kind parentFolder documentType } } }";

const DOCUMENT_QUERY: &str = "query Document($driveId: String!, $id: String!, $first: Int!, $skip: Int!) { \
    document(driveId: $driveId, id: $id) { \
    id name documentType branch slug createdAtUtcIso lastModifiedAtUtcIso revision meta state \
    operations(first: $first, skip: $skip) { id index skip type timestampUtcMs hash error input scope } } }";

const DOCUMENT_STATE_QUERY: &str = "query DocumentState($driveId: String!, $id: String!) { \
    document(driveId: $driveId, id: $id) { state } }";

const CAPABILITIES_QUERY: &str = "query Capabilities { __schema { mutationType { fields { name } } } }";

const PUSH_MUTATION: &str = "mutation Push($driveId: String!, $documentId: String!, $documentType: String!, \
    $scope: String!, $operations: [OperationInput!]!) { \
    pushOperations(driveId: $driveId, documentId: $documentId, documentType: $documentType, \
    scope: $scope, operations: $operations) { status revision error } }";

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct DrivesData {
    drives: Vec<String>,
}

#[derive(Deserialize)]
struct DriveData {
    drive: Option<Drive>,
}

#[derive(Deserialize)]
struct RemoteDocument {
    #[serde(flatten)]
    header: DocumentHeader,
    #[serde(default)]
    state: Value,
    #[serde(default)]
    operations: Vec<Operation>,
}

#[derive(Deserialize)]
struct DocumentData {
    document: Option<RemoteDocument>,
}

#[derive(Deserialize)]
struct StateOnly {
    #[serde(default)]
    state: Value,
}

#[derive(Deserialize)]
struct DocumentStateData {
    document: Option<StateOnly>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaData {
    #[serde(rename = "__schema")]
    schema: Schema,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Schema {
    mutation_type: Option<TypeFields>,
}

#[derive(Deserialize)]
struct TypeFields {
    fields: Vec<FieldName>,
}

#[derive(Deserialize)]
struct FieldName {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushData {
    push_operations: PushOutcome,
}

/// Whether `name` is a plain GraphQL field name, safe to splice into a document
pub fn is_graphql_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Remote store reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpStore {
    /// Build a store for an `http` or `https` endpoint
    pub fn new(endpoint: &str, timeout: Duration) -> RemoteResult<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| RemoteError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(RemoteError::InvalidEndpoint(format!(
                "{}: scheme must be http or https",
                endpoint
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Request(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn execute<T: DeserializeOwned>(&self, query: &str, variables: Value) -> RemoteResult<T> {
        let body = json!({ "query": query, "variables": variables });
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: truncate(&text),
            });
        }

        decode_response(&text)
    }
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_ERROR_BODY {
        return text.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

fn decode_response<T: DeserializeOwned>(text: &str) -> RemoteResult<T> {
    let envelope: GraphQlResponse<T> =
        serde_json::from_str(text).map_err(|e| RemoteError::Decode(e.to_string()))?;

    if !envelope.errors.is_empty() {
        let messages: Vec<_> = envelope.errors.into_iter().map(|e| e.message).collect();
        return Err(RemoteError::GraphQl(messages.join("; ")));
    }

    envelope
        .data
        .ok_or_else(|| RemoteError::Decode("response carries no data".to_string()))
}

impl RemoteStore for HttpStore {
    async fn list_drives(&self) -> RemoteResult<Vec<String>> {
        let data: DrivesData = self.execute(DRIVES_QUERY, json!({})).await?;
        Ok(data.drives)
    }

    async fn drive(&self, drive_id: &str) -> RemoteResult<Drive> {
        let data: DriveData = self.execute(DRIVE_QUERY, json!({ "id": drive_id })).await?;
        data.drive
            .ok_or_else(|| RemoteError::NotFound(format!("drive {}", drive_id)))
    }

    async fn document_page(
        &self,
        drive_id: &str,
        document_id: &str,
        page: PageRequest,
    ) -> RemoteResult<DocumentPage> {
        let variables = json!({
            "driveId": drive_id,
            "id": document_id,
            "first": page.first,
            "skip": page.skip,
        });
        let data: DocumentData = self.execute(DOCUMENT_QUERY, variables).await?;
        let document = data
            .document
            .ok_or_else(|| RemoteError::NotFound(format!("document {}", document_id)))?;

        Ok(DocumentPage {
            header: document.header,
            state: document.state,
            operations: document.operations,
        })
    }

    async fn document_state(&self, drive_id: &str, document_id: &str) -> RemoteResult<Value> {
        let variables = json!({ "driveId": drive_id, "id": document_id });
        let data: DocumentStateData = self.execute(DOCUMENT_STATE_QUERY, variables).await?;
        data.document
            .map(|document| document.state)
            .ok_or_else(|| RemoteError::NotFound(format!("document {}", document_id)))
    }

    async fn create_commands(&self) -> RemoteResult<Vec<String>> {
        let data: SchemaData = self.execute(CAPABILITIES_QUERY, json!({})).await?;
        Ok(data
            .schema
            .mutation_type
            .map(|mutations| mutations.fields.into_iter().map(|f| f.name).collect())
            .unwrap_or_default())
    }

    async fn create_document(
        &self,
        command: &str,
        drive_id: &str,
        name: &str,
    ) -> RemoteResult<String> {
        if !is_graphql_name(command) {
            return Err(RemoteError::InvalidCommand(command.to_string()));
        }
        let mutation = format!(
            "mutation Create($driveId: String!, $name: String!) {{ {}(driveId: $driveId, name: $name) }}",
            command
        );
        let data: Map<String, Value> = self
            .execute(&mutation, json!({ "driveId": drive_id, "name": name }))
            .await?;

        match data.get(command) {
            Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
            other => Err(RemoteError::Decode(format!(
                "{} returned {} instead of a document id",
                command,
                other.map_or_else(|| "nothing".to_string(), |v| v.to_string())
            ))),
        }
    }

    async fn push_operations(&self, batch: &ReplayBatch) -> RemoteResult<PushOutcome> {
        let variables = serde_json::to_value(batch).map_err(|e| RemoteError::Decode(e.to_string()))?;
        let data: PushData = self.execute(PUSH_MUTATION, variables).await?;
        Ok(data.push_operations)
    }
}
