/// Lifecycle of one asynchronous, repeatable query.
///
/// Exactly one variant is active at a time. A fresh query moves
/// `Initial -> Running -> Done | Error`, and a finished query re-enters
/// `Running` when it is issued again.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AsyncResult<D, E = String> {
    /// Nothing has been requested yet.
    #[default]
    Initial,
    /// An operation is in flight.
    Running,
    /// The operation succeeded; the payload is replaced wholesale on re-fetch.
    Done(D),
    /// The operation failed.
    Error(E),
}

impl<D, E> AsyncResult<D, E> {
    pub fn initial() -> Self {
        Self::Initial
    }

    pub fn running() -> Self {
        Self::Running
    }

    pub fn done(data: D) -> Self {
        Self::Done(data)
    }

    pub fn errored(error: E) -> Self {
        Self::Error(error)
    }

    pub fn is_initial(&self) -> bool {
        matches!(self, Self::Initial)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Payload of a `Done` value.
    pub fn data(&self) -> Option<&D> {
        match self {
            Self::Done(data) => Some(data),
            _ => None,
        }
    }

    /// Payload of an `Error` value.
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> AsyncResult<&D, &E> {
        match self {
            Self::Initial => AsyncResult::Initial,
            Self::Running => AsyncResult::Running,
            Self::Done(data) => AsyncResult::Done(data),
            Self::Error(error) => AsyncResult::Error(error),
        }
    }

    pub fn map<T>(self, f: impl FnOnce(D) -> T) -> AsyncResult<T, E> {
        match self {
            Self::Initial => AsyncResult::Initial,
            Self::Running => AsyncResult::Running,
            Self::Done(data) => AsyncResult::Done(f(data)),
            Self::Error(error) => AsyncResult::Error(error),
        }
    }

    pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> AsyncResult<D, F> {
        match self {
            Self::Initial => AsyncResult::Initial,
            Self::Running => AsyncResult::Running,
            Self::Done(data) => AsyncResult::Done(data),
            Self::Error(error) => AsyncResult::Error(f(error)),
        }
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// Resetting to `Initial` is always allowed since the query may be deselected.
    /// A live subscription may replace one `Done` payload with the next.
    pub fn can_transition_to<T, F>(&self, next: &AsyncResult<T, F>) -> bool {
        match (self, next) {
            (_, AsyncResult::Initial) => true,
            (Self::Initial, AsyncResult::Running) => true,
            (Self::Initial, _) => false,
            (Self::Running, _) => true,
            (Self::Done(_), _) => true,
            (Self::Error(_), AsyncResult::Running) => true,
            (Self::Error(_), _) => false,
        }
    }
}

impl<D, E> From<Result<D, E>> for AsyncResult<D, E> {
    fn from(result: Result<D, E>) -> Self {
        match result {
            Ok(data) => Self::Done(data),
            Err(error) => Self::Error(error),
        }
    }
}
