use crate::Effect;

/// A presentation state machine driven by messages.
///
/// `update` applies one message and returns the collaborator operations to
/// start or cancel. Implementations are pure; executing effects and feeding
/// results back as messages is the caller's job.
pub trait Screen {
    type Msg;
    type Request;
    type View;

    /// Operations to start as soon as the screen is opened.
    fn init(&mut self) -> Vec<Effect<Self::Request>> {
        Vec::new()
    }

    fn update(&mut self, msg: Self::Msg) -> Vec<Effect<Self::Request>>;

    fn view(&self) -> Self::View;

    /// Returns whether the view changed since the last call, and resets the flag.
    fn consume_dirty(&mut self) -> bool;
}
