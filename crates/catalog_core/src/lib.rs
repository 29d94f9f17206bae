//! Catalog core: pure presentation state machines and search helpers.
mod async_result;
mod effect;
mod model;
pub mod query;
mod screen;
mod screens;
mod search;
pub mod submission;
mod view_model;

pub use async_result::AsyncResult;
pub use effect::{Effect, OperationId, OperationIds};
pub use model::{
    Conference, ConferenceId, Event, EventId, Page, PageCursor, RequestId, Session, SessionId,
    SessionQuery, Speaker, WatchRequest,
};
pub use screen::Screen;
pub use screens::{
    DetailMsg, DetailRequest, RequestListMsg, RequestListRequest, RequestListState, SearchMsg,
    SearchRequest, SessionDetailState, SessionFilter, SessionSearchState,
};
pub use search::{HighlightedText, Keywords, SearchMatch, Searchable, Segment};
pub use submission::{
    Phase, SubmissionEffect, SubmissionMsg, SubmissionPolicy, SubmissionState, SubmitOutcome,
};
pub use view_model::{
    DetailView, MoreRequest, RequestItem, RequestListView, RequestsView, SearchView,
    SessionDetailView, SessionItem, SessionList,
};
