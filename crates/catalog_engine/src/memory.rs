//! In-process catalog backend with live subscriptions.
//!
//! Used by tests and demos in place of the hosted document store. Every write
//! is pushed to the open subscriptions, and any collection can be switched into
//! a failing state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use catalog_core::{
    Conference, ConferenceId, Event, EventId, Page, PageCursor, RequestId, Session, SessionId,
    SessionQuery, WatchRequest,
};
use catalog_logging::catalog_debug;
use futures_util::stream;
use futures_util::StreamExt;
use tokio::sync::watch;

use crate::repository::{
    CatalogRepository, RecordStream, RepositoryError, RequestSubmitter, SubmitError,
    SubmitRequest,
};

const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Conferences,
    Events,
    Sessions,
    Requests,
}

#[derive(Debug, Clone, Default)]
struct CatalogData {
    conferences: Vec<Conference>,
    events: Vec<Event>,
    sessions: Vec<Session>,
    requests: Vec<WatchRequest>,
    access_keys: HashMap<String, EventId>,
    failures: HashMap<Collection, RepositoryError>,
}

impl CatalogData {
    fn check(&self, collection: Collection) -> Result<(), RepositoryError> {
        match self.failures.get(&collection) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

pub struct InMemoryCatalog {
    data: watch::Sender<CatalogData>,
    page_size: usize,
    page_fetches: AtomicUsize,
    submitted: AtomicU64,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn upsert<T>(records: &mut Vec<T>, record: T, same: impl Fn(&T, &T) -> bool) {
    match records.iter_mut().find(|existing| same(existing, &record)) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        let (data, _) = watch::channel(CatalogData::default());
        Self {
            data,
            page_size: page_size.max(1),
            page_fetches: AtomicUsize::new(0),
            submitted: AtomicU64::new(0),
        }
    }

    pub fn put_conference(&self, conference: Conference) {
        self.data
            .send_modify(|data| upsert(&mut data.conferences, conference, |a, b| a.id == b.id));
    }

    pub fn put_event(&self, event: Event) {
        self.data
            .send_modify(|data| upsert(&mut data.events, event, |a, b| a.id == b.id));
    }

    pub fn put_session(&self, session: Session) {
        self.data
            .send_modify(|data| upsert(&mut data.sessions, session, |a, b| a.id == b.id));
    }

    pub fn put_request(&self, request: WatchRequest) {
        self.data
            .send_modify(|data| upsert(&mut data.requests, request, |a, b| a.id == b.id));
    }

    /// Registers the access key viewers must present to request sessions at `event_id`.
    pub fn set_access_key(&self, event_id: EventId, key: impl Into<String>) {
        let key = key.into();
        self.data.send_modify(|data| {
            data.access_keys.retain(|_, existing| *existing != event_id);
            data.access_keys.insert(key, event_id);
        });
    }

    /// Makes every read and write touching `collection` fail with `error`.
    pub fn fail(&self, collection: Collection, error: RepositoryError) {
        self.data.send_modify(|data| {
            data.failures.insert(collection, error);
        });
    }

    pub fn recover(&self, collection: Collection) {
        self.data.send_modify(|data| {
            data.failures.remove(&collection);
        });
    }

    pub fn requests(&self) -> Vec<WatchRequest> {
        self.data.borrow().requests.clone()
    }

    /// Number of session pages served so far.
    pub fn page_fetches(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
    }

    /// Number of subscription streams still alive.
    pub fn live_subscriptions(&self) -> usize {
        self.data.receiver_count()
    }

    /// Emits `project` of the current data now and again after every change.
    fn live<T, F>(&self, project: F) -> RecordStream<T>
    where
        T: Send + 'static,
        F: Fn(&CatalogData) -> Result<T, RepositoryError> + Send + Sync + 'static,
    {
        let rx = self.data.subscribe();
        stream::unfold((rx, project, true), |(mut rx, project, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let item = project(&rx.borrow_and_update());
            Some((item, (rx, project, false)))
        })
        .boxed()
    }
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalog {
    fn conferences(&self) -> RecordStream<Vec<Conference>> {
        self.live(|data| {
            data.check(Collection::Conferences)?;
            Ok(data.conferences.clone())
        })
    }

    fn conference(&self, id: &ConferenceId) -> RecordStream<Conference> {
        let id = id.clone();
        self.live(move |data| {
            data.check(Collection::Conferences)?;
            data.conferences
                .iter()
                .find(|conference| conference.id == id)
                .cloned()
                .ok_or_else(|| RepositoryError::NotFound {
                    kind: "conference",
                    id: id.to_string(),
                })
        })
    }

    fn session(&self, id: &SessionId) -> RecordStream<Session> {
        let id = id.clone();
        self.live(move |data| {
            data.check(Collection::Sessions)?;
            data.sessions
                .iter()
                .find(|session| session.id == id)
                .cloned()
                .ok_or_else(|| RepositoryError::NotFound {
                    kind: "session",
                    id: id.to_string(),
                })
        })
    }

    fn conference_sessions(&self, id: &ConferenceId) -> RecordStream<Vec<Session>> {
        let id = id.clone();
        self.live(move |data| {
            data.check(Collection::Sessions)?;
            Ok(data
                .sessions
                .iter()
                .filter(|session| session.conference_id == id)
                .cloned()
                .collect())
        })
    }

    fn watched_events(&self, session_id: &SessionId) -> RecordStream<Vec<Event>> {
        let session_id = session_id.clone();
        self.live(move |data| {
            data.check(Collection::Requests)?;
            data.check(Collection::Events)?;
            Ok(data
                .events
                .iter()
                .filter(|event| {
                    data.requests.iter().any(|request| {
                        request.watched
                            && request.session_id == session_id
                            && request.event_id == event.id
                    })
                })
                .cloned()
                .collect())
        })
    }

    fn event(&self, id: &EventId) -> RecordStream<Event> {
        let id = id.clone();
        self.live(move |data| {
            data.check(Collection::Events)?;
            data.events
                .iter()
                .find(|event| event.id == id)
                .cloned()
                .ok_or_else(|| RepositoryError::NotFound {
                    kind: "event",
                    id: id.to_string(),
                })
        })
    }

    fn event_requests(&self, event_id: &EventId) -> RecordStream<Vec<WatchRequest>> {
        let event_id = event_id.clone();
        self.live(move |data| {
            data.check(Collection::Requests)?;
            Ok(data
                .requests
                .iter()
                .filter(|request| request.event_id == event_id)
                .cloned()
                .collect())
        })
    }

    async fn sessions_page(
        &self,
        query: &SessionQuery,
        cursor: Option<PageCursor>,
    ) -> Result<Page<Session>, RepositoryError> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        let data = self.data.borrow();
        data.check(Collection::Sessions)?;

        let matching: Vec<&Session> = data
            .sessions
            .iter()
            .filter(|session| query.accepts(session))
            .collect();
        let start = match &cursor {
            None => 0,
            Some(PageCursor(after)) => matching
                .iter()
                .position(|session| session.id.as_str() == after)
                .map(|index| index + 1)
                .ok_or_else(|| RepositoryError::Backend(format!("unknown cursor {after}")))?,
        };
        let records: Vec<Session> = matching
            .iter()
            .skip(start)
            .take(self.page_size)
            .map(|session| (*session).clone())
            .collect();
        let next = match records.last() {
            Some(last) if start + records.len() < matching.len() => {
                Some(PageCursor(last.id.to_string()))
            }
            _ => None,
        };
        catalog_debug!(
            "Served {} sessions from offset {} (more: {})",
            records.len(),
            start,
            next.is_some()
        );
        Ok(Page { records, next })
    }

    async fn mark_watched(&self, request_id: &RequestId) -> Result<(), RepositoryError> {
        let mut outcome = Ok(());
        self.data.send_if_modified(|data| {
            if let Err(err) = data.check(Collection::Requests) {
                outcome = Err(err);
                return false;
            }
            match data
                .requests
                .iter_mut()
                .find(|request| request.id == *request_id)
            {
                Some(request) if request.watched => false,
                Some(request) => {
                    request.watched = true;
                    true
                }
                None => {
                    outcome = Err(RepositoryError::NotFound {
                        kind: "request",
                        id: request_id.to_string(),
                    });
                    false
                }
            }
        });
        outcome
    }
}

#[async_trait::async_trait]
impl RequestSubmitter for InMemoryCatalog {
    async fn submit_with_key(&self, request: &SubmitRequest) -> Result<(), SubmitError> {
        let number = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
        let mut outcome = Ok(());
        self.data.send_if_modified(|data| {
            if let Err(err) = data.check(Collection::Requests) {
                outcome = Err(SubmitError::Transport(err.to_string()));
                return false;
            }
            let Some(event_id) = data.access_keys.get(&request.key).cloned() else {
                outcome = Err(SubmitError::InvalidKey);
                return false;
            };
            data.requests.push(WatchRequest {
                id: RequestId::new(format!("submitted-{number}")),
                event_id,
                session_id: request.target_id.clone(),
                watched: false,
            });
            true
        });
        outcome
    }
}
