use std::future::Future;
use std::sync::Arc;

use catalog_core::{
    DetailMsg, DetailRequest, EventId, OperationId, RequestId, RequestListMsg,
    RequestListRequest, RequestListState, SearchMsg, SearchRequest, SessionDetailState,
    SessionFilter, SessionId, SessionSearchState,
};
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;

use crate::controller::{Controller, Executor};
use crate::repository::{CatalogRepository, RecordStream, RepositoryError};
use crate::EngineError;

pub type SessionSearch = Controller<SessionSearchState>;
pub type SessionDetail = Controller<SessionDetailState>;
pub type RequestList = Controller<RequestListState>;

/// Executes screen requests against a [`CatalogRepository`].
#[derive(Clone)]
pub struct CatalogExecutor {
    repository: Arc<dyn CatalogRepository>,
}

impl CatalogExecutor {
    pub fn new(repository: Arc<dyn CatalogRepository>) -> Self {
        Self { repository }
    }
}

fn subscribe<T, M>(
    records: RecordStream<T>,
    wrap: impl Fn(Result<T, String>) -> M + Send + 'static,
) -> BoxStream<'static, M>
where
    T: Send + 'static,
    M: Send + 'static,
{
    records
        .map(move |result| wrap(result.map_err(|err| err.to_string())))
        .boxed()
}

fn call<T, M, F>(
    future: F,
    wrap: impl FnOnce(Result<T, String>) -> M + Send + 'static,
) -> BoxStream<'static, M>
where
    F: Future<Output = Result<T, RepositoryError>> + Send + 'static,
    T: Send + 'static,
    M: Send + 'static,
{
    stream::once(async move { wrap(future.await.map_err(|err| err.to_string())) }).boxed()
}

impl Executor<SessionSearchState> for CatalogExecutor {
    fn execute(&self, id: OperationId, request: SearchRequest) -> BoxStream<'static, SearchMsg> {
        match request {
            SearchRequest::Conferences => subscribe(self.repository.conferences(), move |result| {
                SearchMsg::ConferencesLoaded { id, result }
            }),
            SearchRequest::Page { query, cursor } => {
                let repository = self.repository.clone();
                call(
                    async move { repository.sessions_page(&query, cursor).await },
                    move |result| SearchMsg::PageLoaded { id, result },
                )
            }
        }
    }
}

impl Executor<SessionDetailState> for CatalogExecutor {
    fn execute(&self, id: OperationId, request: DetailRequest) -> BoxStream<'static, DetailMsg> {
        match request {
            DetailRequest::Session(session_id) => {
                subscribe(self.repository.session(&session_id), move |result| {
                    DetailMsg::SessionLoaded { id, result }
                })
            }
            DetailRequest::WatchedEvents(session_id) => {
                subscribe(self.repository.watched_events(&session_id), move |result| {
                    DetailMsg::WatchedEventsLoaded { id, result }
                })
            }
            DetailRequest::Conference(conference_id) => {
                subscribe(self.repository.conference(&conference_id), move |result| {
                    DetailMsg::ConferenceLoaded { id, result }
                })
            }
        }
    }
}

impl Executor<RequestListState> for CatalogExecutor {
    fn execute(
        &self,
        id: OperationId,
        request: RequestListRequest,
    ) -> BoxStream<'static, RequestListMsg> {
        match request {
            RequestListRequest::Requests(event_id) => {
                subscribe(self.repository.event_requests(&event_id), move |result| {
                    RequestListMsg::RequestsLoaded { id, result }
                })
            }
            RequestListRequest::Event(event_id) => {
                subscribe(self.repository.event(&event_id), move |result| {
                    RequestListMsg::EventLoaded { id, result }
                })
            }
            RequestListRequest::ConferenceSessions(conference_id) => subscribe(
                self.repository.conference_sessions(&conference_id),
                move |result| RequestListMsg::SessionsLoaded { id, result },
            ),
            RequestListRequest::MarkWatched(request_id) => {
                let repository = self.repository.clone();
                let target = request_id.clone();
                call(
                    async move { repository.mark_watched(&target).await },
                    move |result| RequestListMsg::MarkWatchedFinished {
                        id,
                        request_id,
                        result,
                    },
                )
            }
        }
    }
}

impl Controller<SessionSearchState> {
    /// Opens the search screen; the conference list subscription starts at once.
    pub fn open(repository: Arc<dyn CatalogRepository>) -> Result<Self, EngineError> {
        Self::new(
            SessionSearchState::new(),
            Arc::new(CatalogExecutor::new(repository)),
        )
    }

    pub fn set_filter(&self, filter: SessionFilter) {
        self.dispatch(SearchMsg::FilterChanged(filter));
    }

    /// Loads the next page if the current view says more can be requested.
    pub fn request_more(&self) {
        self.dispatch(SearchMsg::MoreRequested);
    }
}

impl Controller<SessionDetailState> {
    pub fn open(repository: Arc<dyn CatalogRepository>) -> Result<Self, EngineError> {
        Self::new(
            SessionDetailState::new(),
            Arc::new(CatalogExecutor::new(repository)),
        )
    }

    pub fn set_current_id(&self, session_id: Option<SessionId>) {
        self.dispatch(DetailMsg::CurrentIdChanged(session_id));
    }
}

impl Controller<RequestListState> {
    pub fn open(repository: Arc<dyn CatalogRepository>) -> Result<Self, EngineError> {
        Self::new(
            RequestListState::new(),
            Arc::new(CatalogExecutor::new(repository)),
        )
    }

    pub fn set_event(&self, event_id: Option<EventId>) {
        self.dispatch(RequestListMsg::EventChanged(event_id));
    }

    pub fn mark_watched(&self, request_id: RequestId) {
        self.dispatch(RequestListMsg::MarkWatched(request_id));
    }
}
