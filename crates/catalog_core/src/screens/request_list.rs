use std::collections::{BTreeMap, HashMap};

use catalog_logging::{catalog_info, catalog_warn};

use crate::query::{Feed, ParamsChange, QueryState};
use crate::{
    AsyncResult, ConferenceId, Effect, Event, EventId, OperationId, OperationIds, RequestId,
    RequestItem, RequestListView, RequestsView, Screen, Session, SessionId, WatchRequest,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestListMsg {
    /// The organizer switched events; `None` deselects.
    EventChanged(Option<EventId>),
    RequestsLoaded {
        id: OperationId,
        result: Result<Vec<WatchRequest>, String>,
    },
    EventLoaded {
        id: OperationId,
        result: Result<Event, String>,
    },
    SessionsLoaded {
        id: OperationId,
        result: Result<Vec<Session>, String>,
    },
    /// The organizer marked a request as watched.
    MarkWatched(RequestId),
    MarkWatchedFinished {
        id: OperationId,
        request_id: RequestId,
        result: Result<(), String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestListRequest {
    Requests(EventId),
    Event(EventId),
    ConferenceSessions(ConferenceId),
    MarkWatched(RequestId),
}

/// Watch requests of one event, joined with the event and session titles.
///
/// Requests and the event record are required. Session titles come from the
/// sessions of the event's conference and degrade to empty strings.
#[derive(Debug, Clone, Default)]
pub struct RequestListState {
    ids: OperationIds,
    query: QueryState<Option<EventId>, RequestListView>,
    requests: Feed<Vec<WatchRequest>>,
    event: Feed<Event>,
    session_titles: Feed<HashMap<SessionId, String>>,
    conference_id: Option<ConferenceId>,
    marking: BTreeMap<RequestId, OperationId>,
}

impl RequestListState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_id(&self) -> Option<&EventId> {
        self.query.params().and_then(Option::as_ref)
    }

    fn event_changed(&mut self, event_id: Option<EventId>) -> Vec<Effect<RequestListRequest>> {
        match self.query.set_params(event_id.clone()) {
            ParamsChange::Unchanged => Vec::new(),
            ParamsChange::Cleared => self.clear_all(),
            ParamsChange::Changed => {
                let Some(event_id) = event_id else {
                    return Vec::new();
                };
                let mut effects = self.clear_all();
                effects.extend(
                    self.requests
                        .start(&mut self.ids, RequestListRequest::Requests(event_id.clone())),
                );
                effects.extend(
                    self.event
                        .start(&mut self.ids, RequestListRequest::Event(event_id)),
                );
                effects
            }
        }
    }

    fn clear_all(&mut self) -> Vec<Effect<RequestListRequest>> {
        self.conference_id = None;
        // Writes already sent are not cancelled; their results are simply ignored.
        self.marking.clear();
        let cleared: [Option<Effect<RequestListRequest>>; 3] = [
            self.requests.clear(),
            self.event.clear(),
            self.session_titles.clear(),
        ];
        cleared.into_iter().flatten().collect()
    }

    fn cancel_all(&mut self) -> Vec<Effect<RequestListRequest>> {
        let cancelled: [Option<Effect<RequestListRequest>>; 3] = [
            self.requests.cancel(),
            self.event.cancel(),
            self.session_titles.cancel(),
        ];
        cancelled.into_iter().flatten().collect()
    }

    fn follow_conference(&mut self) -> Vec<Effect<RequestListRequest>> {
        let Some(conference_id) = self
            .event
            .value()
            .optional()
            .map(|event| event.conference_id.clone())
        else {
            return Vec::new();
        };
        if self.conference_id.as_ref() == Some(&conference_id) {
            return Vec::new();
        }
        self.conference_id = Some(conference_id.clone());
        self.session_titles.start(
            &mut self.ids,
            RequestListRequest::ConferenceSessions(conference_id),
        )
    }

    fn mark_watched(&mut self, request_id: RequestId) -> Vec<Effect<RequestListRequest>> {
        let markable = self.requests.value().optional().is_some_and(|requests| {
            requests
                .iter()
                .any(|request| request.id == request_id && !request.watched)
        });
        if !markable || !self.query.result().is_done() || self.marking.contains_key(&request_id) {
            return Vec::new();
        }
        let id = self.ids.next();
        self.marking.insert(request_id.clone(), id);
        let mut effects = self.settle();
        effects.push(Effect::Start {
            id,
            request: RequestListRequest::MarkWatched(request_id),
        });
        effects
    }

    fn mark_watched_finished(
        &mut self,
        id: OperationId,
        request_id: RequestId,
        result: Result<(), String>,
    ) -> Vec<Effect<RequestListRequest>> {
        if self.marking.get(&request_id) != Some(&id) {
            return Vec::new();
        }
        self.marking.remove(&request_id);
        match result {
            Ok(()) => catalog_info!("Request {} marked as watched", request_id),
            Err(message) => {
                catalog_warn!("Failed to mark request {} as watched: {}", request_id, message)
            }
        }
        self.settle()
    }

    fn settle(&mut self) -> Vec<Effect<RequestListRequest>> {
        if !self.query.is_active() {
            return Vec::new();
        }
        let next = match (self.requests.value().required(), self.event.value().required()) {
            (Err(message), _) | (_, Err(message)) => AsyncResult::Error(message.to_owned()),
            (Ok(Some(requests)), Ok(Some(event))) => {
                let titles = self.session_titles.value().optional();
                let items = requests
                    .iter()
                    .map(|request| RequestItem {
                        session_title: titles
                            .and_then(|titles| titles.get(&request.session_id))
                            .cloned()
                            .unwrap_or_default(),
                        marking: self.marking.contains_key(&request.id),
                        request: request.clone(),
                    })
                    .collect();
                AsyncResult::Done(RequestListView {
                    event: event.clone(),
                    items,
                })
            }
            _ => AsyncResult::Running,
        };
        let failed = next.is_error();
        self.query.set_result(next);
        if failed {
            self.cancel_all()
        } else {
            Vec::new()
        }
    }
}

impl Screen for RequestListState {
    type Msg = RequestListMsg;
    type Request = RequestListRequest;
    type View = RequestsView;

    fn update(&mut self, msg: RequestListMsg) -> Vec<Effect<RequestListRequest>> {
        match msg {
            RequestListMsg::EventChanged(event_id) => self.event_changed(event_id),
            RequestListMsg::RequestsLoaded { id, result } => {
                if !self.requests.accept(id, result) {
                    return Vec::new();
                }
                self.settle()
            }
            RequestListMsg::EventLoaded { id, result } => {
                if !self.event.accept(id, result) {
                    return Vec::new();
                }
                let mut effects = self.follow_conference();
                effects.extend(self.settle());
                effects
            }
            RequestListMsg::SessionsLoaded { id, result } => {
                let titles = result.map(|sessions| {
                    sessions
                        .into_iter()
                        .map(|session| (session.id, session.title))
                        .collect()
                });
                if !self.session_titles.accept(id, titles) {
                    return Vec::new();
                }
                self.settle()
            }
            RequestListMsg::MarkWatched(request_id) => self.mark_watched(request_id),
            RequestListMsg::MarkWatchedFinished {
                id,
                request_id,
                result,
            } => self.mark_watched_finished(id, request_id, result),
        }
    }

    fn view(&self) -> RequestsView {
        self.query.result().clone()
    }

    fn consume_dirty(&mut self) -> bool {
        self.query.consume_dirty()
    }
}
