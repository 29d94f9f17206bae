use crate::query::{Feed, ParamsChange, QueryState};
use crate::{
    AsyncResult, Conference, ConferenceId, DetailView, Effect, Event, OperationId, OperationIds,
    Screen, Session, SessionDetailView, SessionId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailMsg {
    /// The selected session changed; `None` deselects.
    CurrentIdChanged(Option<SessionId>),
    SessionLoaded {
        id: OperationId,
        result: Result<Session, String>,
    },
    WatchedEventsLoaded {
        id: OperationId,
        result: Result<Vec<Event>, String>,
    },
    ConferenceLoaded {
        id: OperationId,
        result: Result<Conference, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailRequest {
    Session(SessionId),
    WatchedEvents(SessionId),
    Conference(ConferenceId),
}

/// Session detail: one session joined with its conference name and the events
/// where it was already watched.
///
/// The session and the watched-event list are required. The conference is
/// looked up from the session's `conference_id` and only contributes a name,
/// so it never holds back or fails the view.
#[derive(Debug, Clone, Default)]
pub struct SessionDetailState {
    ids: OperationIds,
    query: QueryState<Option<SessionId>, SessionDetailView>,
    session: Feed<Session>,
    watched_events: Feed<Vec<Event>>,
    conference: Feed<Conference>,
    conference_id: Option<ConferenceId>,
}

impl SessionDetailState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_id(&self) -> Option<&SessionId> {
        self.query.params().and_then(Option::as_ref)
    }

    fn current_id_changed(&mut self, session_id: Option<SessionId>) -> Vec<Effect<DetailRequest>> {
        match self.query.set_params(session_id.clone()) {
            ParamsChange::Unchanged => Vec::new(),
            ParamsChange::Cleared => self.clear_all(),
            ParamsChange::Changed => {
                let Some(session_id) = session_id else {
                    return Vec::new();
                };
                let mut effects = self.clear_all();
                effects.extend(
                    self.session
                        .start(&mut self.ids, DetailRequest::Session(session_id.clone())),
                );
                effects.extend(
                    self.watched_events
                        .start(&mut self.ids, DetailRequest::WatchedEvents(session_id)),
                );
                effects
            }
        }
    }

    fn clear_all(&mut self) -> Vec<Effect<DetailRequest>> {
        self.conference_id = None;
        let cleared: [Option<Effect<DetailRequest>>; 3] = [
            self.session.clear(),
            self.watched_events.clear(),
            self.conference.clear(),
        ];
        cleared.into_iter().flatten().collect()
    }

    fn cancel_all(&mut self) -> Vec<Effect<DetailRequest>> {
        let cancelled: [Option<Effect<DetailRequest>>; 3] = [
            self.session.cancel(),
            self.watched_events.cancel(),
            self.conference.cancel(),
        ];
        cancelled.into_iter().flatten().collect()
    }

    /// Follows the session's conference, re-subscribing only when it moved.
    fn follow_conference(&mut self) -> Vec<Effect<DetailRequest>> {
        let Some(conference_id) = self
            .session
            .value()
            .optional()
            .map(|session| session.conference_id.clone())
        else {
            return Vec::new();
        };
        if self.conference_id.as_ref() == Some(&conference_id) {
            return Vec::new();
        }
        self.conference_id = Some(conference_id.clone());
        self.conference
            .start(&mut self.ids, DetailRequest::Conference(conference_id))
    }

    /// Recomputes the view. A failed required source ends every operation of
    /// the current selection.
    fn settle(&mut self) -> Vec<Effect<DetailRequest>> {
        if !self.query.is_active() {
            return Vec::new();
        }
        let next = match (
            self.session.value().required(),
            self.watched_events.value().required(),
        ) {
            (Err(message), _) | (_, Err(message)) => AsyncResult::Error(message.to_owned()),
            (Ok(Some(session)), Ok(Some(watched_events))) => {
                AsyncResult::Done(SessionDetailView {
                    session: session.clone(),
                    conference_name: self
                        .conference
                        .value()
                        .optional()
                        .map(|conference| conference.name.clone())
                        .unwrap_or_default(),
                    watched_events: watched_events.clone(),
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

impl Screen for SessionDetailState {
    type Msg = DetailMsg;
    type Request = DetailRequest;
    type View = DetailView;

    fn update(&mut self, msg: DetailMsg) -> Vec<Effect<DetailRequest>> {
        match msg {
            DetailMsg::CurrentIdChanged(session_id) => self.current_id_changed(session_id),
            DetailMsg::SessionLoaded { id, result } => {
                if !self.session.accept(id, result) {
                    return Vec::new();
                }
                let mut effects = self.follow_conference();
                effects.extend(self.settle());
                effects
            }
            DetailMsg::WatchedEventsLoaded { id, result } => {
                if !self.watched_events.accept(id, result) {
                    return Vec::new();
                }
                self.settle()
            }
            DetailMsg::ConferenceLoaded { id, result } => {
                if !self.conference.accept(id, result) {
                    return Vec::new();
                }
                self.settle()
            }
        }
    }

    fn view(&self) -> DetailView {
        self.query.result().clone()
    }

    fn consume_dirty(&mut self) -> bool {
        self.query.consume_dirty()
    }
}
