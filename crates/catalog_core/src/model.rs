use std::fmt;

use crate::search::Searchable;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

string_id!(
    /// Identifies a conference (one yearly edition of a talk series).
    ConferenceId
);
string_id!(
    /// Identifies an event; requests and access keys are scoped to an event.
    EventId
);
string_id!(SessionId);
string_id!(RequestId);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conference {
    pub id: ConferenceId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: EventId,
    pub conference_id: ConferenceId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speaker {
    pub name: String,
    pub handle: Option<String>,
}

/// One recorded talk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub conference_id: ConferenceId,
    pub title: String,
    pub description: String,
    pub minutes: u32,
    pub speakers: Vec<Speaker>,
}

impl Searchable for Session {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = Vec::with_capacity(2 + self.speakers.len() * 2);
        fields.push(self.title.as_str());
        fields.push(self.description.as_str());
        for speaker in &self.speakers {
            fields.push(speaker.name.as_str());
            if let Some(handle) = &speaker.handle {
                fields.push(handle.as_str());
            }
        }
        fields
    }
}

/// A viewer's request to watch a session at an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRequest {
    pub id: RequestId,
    pub event_id: EventId,
    pub session_id: SessionId,
    pub watched: bool,
}

/// Opaque continuation token for a paginated query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCursor(pub String);

/// One page of a paginated query. `next` is present while more records exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub next: Option<PageCursor>,
}

impl<T> Page<T> {
    pub fn last(records: Vec<T>) -> Self {
        Self {
            records,
            next: None,
        }
    }
}

/// Backend-side part of a session filter; keywords are applied locally.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct SessionQuery {
    pub conference_id: Option<ConferenceId>,
    pub minutes: Option<u32>,
}

impl SessionQuery {
    pub fn accepts(&self, session: &Session) -> bool {
        self.conference_id
            .as_ref()
            .is_none_or(|id| *id == session.conference_id)
            && self.minutes.is_none_or(|minutes| minutes == session.minutes)
    }
}
