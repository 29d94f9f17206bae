use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use catalog_core::{Effect, OperationId, Screen};
use catalog_logging::{catalog_debug, catalog_trace};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::EngineError;

/// Turns a screen's operation requests into message streams.
///
/// Every message on the returned stream must carry `id`. Subscriptions keep
/// the stream open; one-shot calls yield a single message and end.
pub trait Executor<S: Screen>: Send + Sync {
    fn execute(&self, id: OperationId, request: S::Request) -> BoxStream<'static, S::Msg>;
}

struct Running<S> {
    screen: S,
    operations: HashMap<OperationId, CancellationToken>,
}

struct Inner<S: Screen> {
    running: Mutex<Running<S>>,
    view_tx: watch::Sender<S::View>,
    executor: Arc<dyn Executor<S>>,
    runtime: Handle,
}

/// Drives a [`Screen`] on a tokio runtime.
///
/// Messages are applied one at a time. Start effects spawn a task forwarding
/// the executor's stream back into the screen; cancel effects stop that task.
/// The latest view is published on a watch channel, so late subscribers see it
/// immediately. Dropping the controller cancels every running operation.
pub struct Controller<S: Screen> {
    inner: Arc<Inner<S>>,
}

impl<S> Controller<S>
where
    S: Screen + Send + 'static,
    S::Msg: Send + 'static,
    S::Request: Send + 'static,
    S::View: Clone + Send + Sync + 'static,
{
    /// Opens `screen` on the current tokio runtime and runs its initial effects.
    pub fn new(mut screen: S, executor: Arc<dyn Executor<S>>) -> Result<Self, EngineError> {
        let runtime = Handle::try_current()?;
        let effects = screen.init();
        screen.consume_dirty();
        let (view_tx, _) = watch::channel(screen.view());
        let inner = Arc::new(Inner {
            running: Mutex::new(Running {
                screen,
                operations: HashMap::new(),
            }),
            view_tx,
            executor,
            runtime,
        });
        {
            let mut running = inner.lock();
            inner.apply(&mut running, effects);
        }
        Ok(Self { inner })
    }

    pub fn dispatch(&self, msg: S::Msg) {
        self.inner.dispatch(msg);
    }

    /// The most recently published view.
    pub fn view(&self) -> S::View {
        self.inner.view_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<S::View> {
        self.inner.view_tx.subscribe()
    }

    /// Number of operations whose results are still being forwarded.
    pub fn active_operations(&self) -> usize {
        self.inner.lock().operations.len()
    }
}

impl<S> Inner<S>
where
    S: Screen + Send + 'static,
    S::Msg: Send + 'static,
    S::Request: Send + 'static,
    S::View: Clone + Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, Running<S>> {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn dispatch(self: &Arc<Self>, msg: S::Msg) {
        let mut running = self.lock();
        let effects = running.screen.update(msg);
        if running.screen.consume_dirty() {
            self.view_tx.send_replace(running.screen.view());
        }
        self.apply(&mut running, effects);
    }

    fn apply(self: &Arc<Self>, running: &mut Running<S>, effects: Vec<Effect<S::Request>>) {
        for effect in effects {
            match effect {
                Effect::Start { id, request } => {
                    catalog_trace!("Starting {}", id);
                    let token = CancellationToken::new();
                    running.operations.insert(id, token.clone());
                    let stream = self.executor.execute(id, request);
                    self.runtime
                        .spawn(forward(Arc::downgrade(self), id, token, stream));
                }
                Effect::Cancel { id } => {
                    if let Some(token) = running.operations.remove(&id) {
                        catalog_trace!("Cancelling {}", id);
                        token.cancel();
                    }
                }
            }
        }
    }

    fn finished(&self, id: OperationId) {
        self.lock().operations.remove(&id);
    }
}

impl<S: Screen> Drop for Inner<S> {
    fn drop(&mut self) {
        let running = match self.running.get_mut() {
            Ok(running) => running,
            Err(poisoned) => poisoned.into_inner(),
        };
        for (_, token) in running.operations.drain() {
            token.cancel();
        }
    }
}

async fn forward<S>(
    inner: Weak<Inner<S>>,
    id: OperationId,
    token: CancellationToken,
    mut stream: BoxStream<'static, S::Msg>,
) where
    S: Screen + Send + 'static,
    S::Msg: Send + 'static,
    S::Request: Send + 'static,
    S::View: Clone + Send + Sync + 'static,
{
    loop {
        let msg = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            next = stream.next() => match next {
                Some(msg) => msg,
                None => break,
            },
        };
        let Some(owner) = inner.upgrade() else {
            return;
        };
        owner.dispatch(msg);
    }
    catalog_debug!("{} completed", id);
    if let Some(owner) = inner.upgrade() {
        owner.finished(id);
    }
}
