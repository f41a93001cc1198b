pub mod dispatcher;
pub mod error;
pub mod keys;
pub mod pose_store;
pub mod session;

pub use dispatcher::{EventDispatcher, Outbox};
pub use error::SessionError;
pub use session::{Session, SessionManager, SessionState};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
