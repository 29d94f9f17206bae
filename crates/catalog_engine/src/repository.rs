use futures_util::stream::BoxStream;
use serde::Deserialize;
use serde_json::Value;

use catalog_core::{
    Conference, ConferenceId, Event, EventId, Page, PageCursor, RequestId, Session, SessionId,
    SessionQuery, WatchRequest,
};

/// Marker the backend puts into its error payload when the access key is wrong.
pub const INVALID_KEY_MARKER: &str = "invalid-request-key";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("permission denied")]
    PermissionDenied,
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Backend(String),
}

/// Long-lived push subscription. Dropping the stream unsubscribes.
pub type RecordStream<T> = BoxStream<'static, Result<T, RepositoryError>>;

/// Document-store reads and writes the screens depend on.
#[async_trait::async_trait]
pub trait CatalogRepository: Send + Sync {
    fn conferences(&self) -> RecordStream<Vec<Conference>>;

    fn conference(&self, id: &ConferenceId) -> RecordStream<Conference>;

    fn session(&self, id: &SessionId) -> RecordStream<Session>;

    fn conference_sessions(&self, id: &ConferenceId) -> RecordStream<Vec<Session>>;

    /// Events at which the session has been marked watched.
    fn watched_events(&self, session_id: &SessionId) -> RecordStream<Vec<Event>>;

    fn event(&self, id: &EventId) -> RecordStream<Event>;

    fn event_requests(&self, event_id: &EventId) -> RecordStream<Vec<WatchRequest>>;

    async fn sessions_page(
        &self,
        query: &SessionQuery,
        cursor: Option<PageCursor>,
    ) -> Result<Page<Session>, RepositoryError>;

    async fn mark_watched(&self, request_id: &RequestId) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub key: String,
    pub target_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("invalid request key")]
    InvalidKey,
    #[error("request rejected ({code}): {message}")]
    Rejected { code: String, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BackendErrorPayload {
    code: Option<String>,
    status: Option<String>,
    message: String,
    details: Option<Value>,
}

impl SubmitError {
    /// Classifies a backend error body such as
    /// `{"code":"permission-denied","message":"...","details":"invalid-request-key"}`.
    /// Bodies wrapped as `{"error":{...}}` are accepted too.
    pub fn from_backend_payload(payload: &str) -> Self {
        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(err) => {
                return SubmitError::Rejected {
                    code: "unknown".to_string(),
                    message: format!("unreadable error payload: {err}"),
                }
            }
        };
        let body = match value.get("error") {
            Some(inner @ Value::Object(_)) => inner.clone(),
            _ => value,
        };
        let parsed: BackendErrorPayload = serde_json::from_value(body).unwrap_or_default();

        let flagged = parsed.message.contains(INVALID_KEY_MARKER)
            || parsed.details.as_ref().is_some_and(carries_marker);
        if flagged {
            return SubmitError::InvalidKey;
        }
        SubmitError::Rejected {
            code: parsed
                .code
                .or(parsed.status)
                .unwrap_or_else(|| "unknown".to_string()),
            message: parsed.message,
        }
    }
}

fn carries_marker(value: &Value) -> bool {
    match value {
        Value::String(text) => text.contains(INVALID_KEY_MARKER),
        Value::Array(items) => items.iter().any(carries_marker),
        Value::Object(fields) => fields.values().any(carries_marker),
        _ => false,
    }
}

/// The backend call that stores a watch request after checking the event's access key.
#[async_trait::async_trait]
pub trait RequestSubmitter: Send + Sync {
    async fn submit_with_key(&self, request: &SubmitRequest) -> Result<(), SubmitError>;
}
