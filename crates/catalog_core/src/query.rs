//! Building blocks shared by every screen: parameter bookkeeping around the
//! current [`AsyncResult`], and per-source slots that remember which operation
//! is allowed to write into them.

use catalog_logging::{catalog_debug, catalog_warn};

use crate::{AsyncResult, Effect, OperationId, OperationIds};

/// Parameters of a screen query.
pub trait QueryParams: Clone + PartialEq {
    /// Parameters that select nothing reset the query to `Initial` instead of fetching.
    fn selects_nothing(&self) -> bool {
        false
    }
}

impl<T: Clone + PartialEq> QueryParams for Option<T> {
    fn selects_nothing(&self) -> bool {
        self.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamsChange {
    /// Structurally equal to the current parameters; nothing to do.
    Unchanged,
    /// The new parameters select nothing; the result is back to `Initial`.
    Cleared,
    /// New parameters; the result is `Running` and a fetch must start.
    Changed,
}

/// Current parameters and current result of one logical query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState<P, D> {
    params: Option<P>,
    result: AsyncResult<D>,
    dirty: bool,
}

impl<P, D> Default for QueryState<P, D> {
    fn default() -> Self {
        Self {
            params: None,
            result: AsyncResult::Initial,
            dirty: false,
        }
    }
}

impl<P: QueryParams, D: Clone + PartialEq> QueryState<P, D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(&self) -> Option<&P> {
        self.params.as_ref()
    }

    pub fn result(&self) -> &AsyncResult<D> {
        &self.result
    }

    pub fn set_params(&mut self, params: P) -> ParamsChange {
        if self.params.as_ref() == Some(&params) {
            return ParamsChange::Unchanged;
        }
        let cleared = params.selects_nothing();
        self.params = Some(params);
        if cleared {
            self.set_result(AsyncResult::Initial);
            ParamsChange::Cleared
        } else {
            self.set_result(AsyncResult::Running);
            ParamsChange::Changed
        }
    }

    /// Replaces the current result, marking the state dirty when it changed.
    pub fn set_result(&mut self, next: AsyncResult<D>) {
        if self.result == next {
            return;
        }
        if !self.result.can_transition_to(&next) {
            catalog_warn!(
                "Unexpected result transition {} -> {}",
                variant_name(&self.result),
                variant_name(&next)
            );
        }
        self.result = next;
        self.dirty = true;
    }

    /// Whether the current parameters expect data (a fetch was started for them).
    pub fn is_active(&self) -> bool {
        self.params
            .as_ref()
            .is_some_and(|params| !params.selects_nothing())
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

fn variant_name<D, E>(result: &AsyncResult<D, E>) -> &'static str {
    match result {
        AsyncResult::Initial => "Initial",
        AsyncResult::Running => "Running",
        AsyncResult::Done(_) => "Done",
        AsyncResult::Error(_) => "Error",
    }
}

/// Latest known value of one collaborator source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Source<T> {
    /// Nothing has arrived yet for the live operation.
    #[default]
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> Source<T> {
    /// Join view of a required source: `Ok(None)` defers, `Err` surfaces the failure.
    pub fn required(&self) -> Result<Option<&T>, &str> {
        match self {
            Source::Pending => Ok(None),
            Source::Ready(value) => Ok(Some(value)),
            Source::Failed(message) => Err(message.as_str()),
        }
    }

    /// Join view of an optional source: anything but a value degrades to `None`.
    pub fn optional(&self) -> Option<&T> {
        match self {
            Source::Ready(value) => Some(value),
            Source::Pending | Source::Failed(_) => None,
        }
    }
}

/// A [`Source`] together with the operation currently feeding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed<T> {
    op: Option<OperationId>,
    value: Source<T>,
}

impl<T> Default for Feed<T> {
    fn default() -> Self {
        Self {
            op: None,
            value: Source::Pending,
        }
    }
}

impl<T> Feed<T> {
    pub fn value(&self) -> &Source<T> {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Source<T> {
        &mut self.value
    }

    pub fn is_live(&self, id: OperationId) -> bool {
        self.op == Some(id)
    }

    /// Cancels the current operation, forgets the value and starts `request`.
    pub fn start<R>(&mut self, ids: &mut OperationIds, request: R) -> Vec<Effect<R>> {
        self.value = Source::Pending;
        self.continue_with(ids, request)
    }

    /// Cancels the current operation and starts `request`, keeping the value.
    pub fn continue_with<R>(&mut self, ids: &mut OperationIds, request: R) -> Vec<Effect<R>> {
        let mut effects = Vec::with_capacity(2);
        effects.extend(self.cancel());
        let id = ids.next();
        self.op = Some(id);
        effects.push(Effect::Start { id, request });
        effects
    }

    /// Cancels the current operation; the value is kept.
    pub fn cancel<R>(&mut self) -> Option<Effect<R>> {
        self.op.take().map(|id| Effect::Cancel { id })
    }

    /// Forgets the current operation once it has delivered its last result.
    /// Unlike [`Feed::cancel`] nothing is left to stop, so no effect is produced.
    pub fn finish(&mut self) {
        self.op = None;
    }

    /// Cancels the current operation and forgets the value.
    pub fn clear<R>(&mut self) -> Option<Effect<R>> {
        self.value = Source::Pending;
        self.cancel()
    }

    /// Stores `result` if it comes from the live operation. Returns whether it was applied.
    pub fn accept(&mut self, id: OperationId, result: Result<T, String>) -> bool {
        if !self.is_live(id) {
            catalog_debug!("Dropping stale result from {}", id);
            return false;
        }
        self.value = match result {
            Ok(value) => Source::Ready(value),
            Err(message) => Source::Failed(message),
        };
        true
    }
}
