use catalog_core::{
    AsyncResult, Conference, ConferenceId, DetailMsg, DetailRequest, Effect, Event, EventId,
    OperationId, Screen, Session, SessionDetailState, SessionId,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    catalog_logging::initialize_for_tests();
}

fn session(id: &str, conference: &str) -> Session {
    Session {
        id: SessionId::from(id),
        conference_id: ConferenceId::from(conference),
        title: format!("Talk {id}"),
        description: "About things".to_string(),
        minutes: 25,
        speakers: Vec::new(),
    }
}

fn event(id: &str) -> Event {
    Event {
        id: EventId::from(id),
        conference_id: ConferenceId::from("c1"),
        name: format!("Viewing {id}"),
    }
}

fn start_id(effects: &[Effect<DetailRequest>], wanted: &DetailRequest) -> OperationId {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Start { id, request } if request == wanted => Some(*id),
            _ => None,
        })
        .expect("operation started")
}

struct Selected {
    state: SessionDetailState,
    session_op: OperationId,
    watched_op: OperationId,
}

fn select(session_id: &str) -> Selected {
    let mut state = SessionDetailState::new();
    let effects = state.update(DetailMsg::CurrentIdChanged(Some(SessionId::from(session_id))));
    assert_eq!(effects.len(), 2);
    Selected {
        session_op: start_id(&effects, &DetailRequest::Session(SessionId::from(session_id))),
        watched_op: start_id(
            &effects,
            &DetailRequest::WatchedEvents(SessionId::from(session_id)),
        ),
        state,
    }
}

#[test]
fn no_selection_stays_initial() {
    init_logging();
    let mut state = SessionDetailState::new();
    let effects = state.update(DetailMsg::CurrentIdChanged(None));
    assert!(effects.is_empty());
    assert_eq!(state.view(), AsyncResult::Initial);
}

#[test]
fn waits_for_required_sources_then_joins() {
    init_logging();
    let Selected {
        mut state,
        session_op,
        watched_op,
    } = select("s1");
    assert_eq!(state.view(), AsyncResult::Running);

    let effects = state.update(DetailMsg::SessionLoaded {
        id: session_op,
        result: Ok(session("s1", "c1")),
    });
    let conference_op = start_id(
        &effects,
        &DetailRequest::Conference(ConferenceId::from("c1")),
    );
    // The watched-event list is still missing.
    assert_eq!(state.view(), AsyncResult::Running);

    state.update(DetailMsg::WatchedEventsLoaded {
        id: watched_op,
        result: Ok(vec![event("e1")]),
    });
    let view = state.view();
    let detail = view.data().expect("done");
    assert_eq!(detail.session.id, SessionId::from("s1"));
    assert_eq!(detail.conference_name, "");
    assert_eq!(detail.watched_events, vec![event("e1")]);

    state.update(DetailMsg::ConferenceLoaded {
        id: conference_op,
        result: Ok(Conference {
            id: ConferenceId::from("c1"),
            name: "KotlinConf".to_string(),
        }),
    });
    assert_eq!(
        state.view().data().expect("done").conference_name,
        "KotlinConf"
    );
}

#[test]
fn conference_is_resubscribed_only_when_it_changes() {
    init_logging();
    let Selected {
        mut state,
        session_op,
        ..
    } = select("s1");
    let first = state.update(DetailMsg::SessionLoaded {
        id: session_op,
        result: Ok(session("s1", "c1")),
    });
    assert_eq!(first.len(), 1);

    let mut edited = session("s1", "c1");
    edited.title = "Renamed".to_string();
    let same_conference = state.update(DetailMsg::SessionLoaded {
        id: session_op,
        result: Ok(edited),
    });
    assert!(same_conference.is_empty());

    let old_conference = start_id(&first, &DetailRequest::Conference(ConferenceId::from("c1")));
    let moved = state.update(DetailMsg::SessionLoaded {
        id: session_op,
        result: Ok(session("s1", "c2")),
    });
    assert!(moved.contains(&Effect::Cancel { id: old_conference }));
    start_id(&moved, &DetailRequest::Conference(ConferenceId::from("c2")));
}

#[test]
fn conference_failure_degrades_to_empty_name() {
    init_logging();
    let Selected {
        mut state,
        session_op,
        watched_op,
    } = select("s1");
    let effects = state.update(DetailMsg::SessionLoaded {
        id: session_op,
        result: Ok(session("s1", "c1")),
    });
    let conference_op = start_id(
        &effects,
        &DetailRequest::Conference(ConferenceId::from("c1")),
    );
    state.update(DetailMsg::ConferenceLoaded {
        id: conference_op,
        result: Err("conference missing".to_string()),
    });
    state.update(DetailMsg::WatchedEventsLoaded {
        id: watched_op,
        result: Ok(Vec::new()),
    });

    let view = state.view();
    assert!(view.is_done());
    assert_eq!(view.data().expect("done").conference_name, "");
}

#[test]
fn session_failure_is_an_error_and_stops_the_selection() {
    init_logging();
    let Selected {
        mut state,
        session_op,
        watched_op,
    } = select("s1");

    let effects = state.update(DetailMsg::SessionLoaded {
        id: session_op,
        result: Err("session s1 not found".to_string()),
    });
    assert_eq!(
        state.view(),
        AsyncResult::Error("session s1 not found".to_string())
    );
    assert!(effects.contains(&Effect::Cancel { id: session_op }));
    assert!(effects.contains(&Effect::Cancel { id: watched_op }));

    // Late data of the failed selection is ignored.
    state.update(DetailMsg::WatchedEventsLoaded {
        id: watched_op,
        result: Ok(Vec::new()),
    });
    assert!(state.view().is_error());

    // Selecting the same id again is a no-op; a different id recovers.
    assert!(state
        .update(DetailMsg::CurrentIdChanged(Some(SessionId::from("s1"))))
        .is_empty());
    let effects = state.update(DetailMsg::CurrentIdChanged(Some(SessionId::from("s2"))));
    assert_eq!(effects.len(), 2);
    assert_eq!(state.view(), AsyncResult::Running);
}

#[test]
fn watched_events_failure_is_an_error() {
    init_logging();
    let Selected {
        mut state,
        session_op,
        watched_op,
    } = select("s1");
    state.update(DetailMsg::SessionLoaded {
        id: session_op,
        result: Ok(session("s1", "c1")),
    });
    state.update(DetailMsg::WatchedEventsLoaded {
        id: watched_op,
        result: Err("query failed".to_string()),
    });
    assert_eq!(state.view(), AsyncResult::Error("query failed".to_string()));
}

#[test]
fn switching_selection_drops_old_results() {
    init_logging();
    let Selected {
        mut state,
        session_op,
        watched_op,
    } = select("s1");
    let effects = state.update(DetailMsg::CurrentIdChanged(Some(SessionId::from("s2"))));
    assert!(effects.contains(&Effect::Cancel { id: session_op }));
    assert!(effects.contains(&Effect::Cancel { id: watched_op }));

    state.update(DetailMsg::SessionLoaded {
        id: session_op,
        result: Ok(session("s1", "c1")),
    });
    state.update(DetailMsg::WatchedEventsLoaded {
        id: watched_op,
        result: Ok(Vec::new()),
    });
    assert_eq!(state.view(), AsyncResult::Running);

    let cleared = state.update(DetailMsg::CurrentIdChanged(None));
    assert_eq!(cleared.len(), 2);
    assert_eq!(state.view(), AsyncResult::Initial);
    assert_eq!(state.current_id(), None);
}
