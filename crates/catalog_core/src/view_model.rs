use crate::{AsyncResult, Event, HighlightedText, Session, WatchRequest};

/// Pagination state attached to a loaded list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoreRequest {
    /// Everything has been loaded.
    #[default]
    Unrequestable,
    /// Another page exists and can be requested.
    Requestable,
    /// A continuation fetch is in flight.
    Requesting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionItem {
    pub session: Session,
    pub conference_name: String,
    pub title: HighlightedText,
    pub description: HighlightedText,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionList {
    pub items: Vec<SessionItem>,
    pub more: MoreRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDetailView {
    pub session: Session,
    pub conference_name: String,
    /// Events at which this session has already been watched.
    pub watched_events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestItem {
    pub request: WatchRequest,
    /// Empty while the session catalog is unavailable.
    pub session_title: String,
    /// A "mark watched" write for this request is in flight.
    pub marking: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestListView {
    pub event: Event,
    pub items: Vec<RequestItem>,
}

pub type SearchView = AsyncResult<SessionList>;
pub type DetailView = AsyncResult<SessionDetailView>;
pub type RequestsView = AsyncResult<RequestListView>;
