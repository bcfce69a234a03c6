//! Session state: data model, observable store, persistence and auxiliary operations.

pub mod actions;
mod models;
mod storage;
mod store;

pub use models::{ChatMessage, ChatRole, CodeRevision, Session};
pub use storage::{SessionPersister, SessionStorage};
pub use store::{SessionStore, Subscription};
