use std::sync::Arc;

use session_core::EventDispatcher;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) dispatcher: Arc<EventDispatcher>,
    pub(crate) max_send_queue: usize,
}
