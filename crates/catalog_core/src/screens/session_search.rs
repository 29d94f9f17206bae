use std::collections::HashMap;

use crate::query::{Feed, ParamsChange, QueryParams, QueryState, Source};
use crate::{
    AsyncResult, Conference, ConferenceId, Effect, Keywords, MoreRequest, OperationId,
    OperationIds, Page, PageCursor, Screen, SearchView, Session, SessionItem, SessionList,
    SessionQuery,
};

/// Everything the session search screen filters on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionFilter {
    pub conference_id: Option<ConferenceId>,
    pub minutes: Option<u32>,
    /// Keywords in the order they were typed.
    pub keywords: Vec<String>,
}

impl SessionFilter {
    /// Builds a filter from raw keyword input, splitting it on whitespace.
    pub fn new(conference_id: Option<ConferenceId>, minutes: Option<u32>, input: &str) -> Self {
        Self {
            conference_id,
            minutes,
            keywords: input.split_whitespace().map(ToOwned::to_owned).collect(),
        }
    }

    pub fn query(&self) -> SessionQuery {
        SessionQuery {
            conference_id: self.conference_id.clone(),
            minutes: self.minutes,
        }
    }
}

impl QueryParams for SessionFilter {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchMsg {
    /// User changed the filter form.
    FilterChanged(SessionFilter),
    /// User asked for the next page.
    MoreRequested,
    ConferencesLoaded {
        id: OperationId,
        result: Result<Vec<Conference>, String>,
    },
    PageLoaded {
        id: OperationId,
        result: Result<Page<Session>, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRequest {
    /// Subscribe to the conference list (used for conference names).
    Conferences,
    /// Fetch one page of sessions; `cursor` continues a previous page.
    Page {
        query: SessionQuery,
        cursor: Option<PageCursor>,
    },
}

/// Session search: paginated session list filtered by conference, length and keywords.
#[derive(Debug, Clone, Default)]
pub struct SessionSearchState {
    ids: OperationIds,
    query: QueryState<SessionFilter, SessionList>,
    keywords: Keywords,
    conference_names: Feed<HashMap<ConferenceId, String>>,
    sessions: Feed<Vec<Session>>,
    next: Option<PageCursor>,
    requesting_more: bool,
}

impl SessionSearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self) -> Option<&SessionFilter> {
        self.query.params()
    }

    fn filter_changed(&mut self, filter: SessionFilter) -> Vec<Effect<SearchRequest>> {
        match self.query.set_params(filter.clone()) {
            ParamsChange::Unchanged | ParamsChange::Cleared => Vec::new(),
            ParamsChange::Changed => {
                self.keywords = Keywords::from_terms(&filter.keywords);
                self.next = None;
                self.requesting_more = false;
                self.sessions.start(
                    &mut self.ids,
                    SearchRequest::Page {
                        query: filter.query(),
                        cursor: None,
                    },
                )
            }
        }
    }

    fn more_requested(&mut self) -> Vec<Effect<SearchRequest>> {
        if self.more() != MoreRequest::Requestable {
            return Vec::new();
        }
        let (Some(filter), Some(cursor)) = (self.query.params(), self.next.take()) else {
            return Vec::new();
        };
        let request = SearchRequest::Page {
            query: filter.query(),
            cursor: Some(cursor),
        };
        self.requesting_more = true;
        let effects = self.sessions.continue_with(&mut self.ids, request);
        self.recompute();
        effects
    }

    fn page_loaded(&mut self, id: OperationId, result: Result<Page<Session>, String>) {
        if !self.sessions.is_live(id) {
            return;
        }
        let appending = std::mem::take(&mut self.requesting_more);
        match result {
            Ok(page) => {
                self.next = page.next;
                match self.sessions.value_mut() {
                    Source::Ready(records) if appending => records.extend(page.records),
                    value => *value = Source::Ready(page.records),
                }
            }
            Err(message) => {
                self.next = None;
                self.sessions.accept(id, Err(message));
            }
        }
        // One-shot fetch: it has delivered everything it will.
        self.sessions.finish();
        self.recompute();
    }

    fn more(&self) -> MoreRequest {
        if self.requesting_more {
            MoreRequest::Requesting
        } else if self.next.is_some() {
            MoreRequest::Requestable
        } else {
            MoreRequest::Unrequestable
        }
    }

    fn recompute(&mut self) {
        if !self.query.is_active() {
            return;
        }
        let next = match self.sessions.value() {
            Source::Pending => AsyncResult::Running,
            Source::Failed(message) => AsyncResult::Error(message.clone()),
            Source::Ready(records) => {
                let names = self.conference_names.value().optional();
                let items = records
                    .iter()
                    .filter(|session| self.keywords.matches(*session))
                    .map(|session| SessionItem {
                        conference_name: names
                            .and_then(|names| names.get(&session.conference_id))
                            .cloned()
                            .unwrap_or_default(),
                        title: self.keywords.highlight(&session.title),
                        description: self.keywords.highlight(&session.description),
                        session: session.clone(),
                    })
                    .collect();
                AsyncResult::Done(SessionList {
                    items,
                    more: self.more(),
                })
            }
        };
        self.query.set_result(next);
    }
}

impl Screen for SessionSearchState {
    type Msg = SearchMsg;
    type Request = SearchRequest;
    type View = SearchView;

    fn init(&mut self) -> Vec<Effect<SearchRequest>> {
        self.conference_names
            .start(&mut self.ids, SearchRequest::Conferences)
    }

    fn update(&mut self, msg: SearchMsg) -> Vec<Effect<SearchRequest>> {
        match msg {
            SearchMsg::FilterChanged(filter) => self.filter_changed(filter),
            SearchMsg::MoreRequested => self.more_requested(),
            SearchMsg::PageLoaded { id, result } => {
                self.page_loaded(id, result);
                Vec::new()
            }
            SearchMsg::ConferencesLoaded { id, result } => {
                let names = result.map(|conferences| {
                    conferences
                        .into_iter()
                        .map(|conference| (conference.id, conference.name))
                        .collect()
                });
                if self.conference_names.accept(id, names) {
                    self.recompute();
                }
                Vec::new()
            }
        }
    }

    fn view(&self) -> SearchView {
        self.query.result().clone()
    }

    fn consume_dirty(&mut self) -> bool {
        self.query.consume_dirty()
    }
}
