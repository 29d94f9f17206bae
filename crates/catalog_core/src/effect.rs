use std::fmt;

/// Identifies one collaborator operation started by a screen.
///
/// Ids are allocated in increasing order per screen; messages tagged with an id
/// that is no longer live belong to a superseded operation and are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationId(pub u64);

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperationIds {
    last: u64,
}

impl OperationIds {
    pub fn next(&mut self) -> OperationId {
        self.last += 1;
        OperationId(self.last)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect<R> {
    /// Start a subscription or one-shot call; its results come back tagged with `id`.
    Start { id: OperationId, request: R },
    /// Stop delivering results of `id`. Cancelling a finished operation is harmless.
    Cancel { id: OperationId },
}
