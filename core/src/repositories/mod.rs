//! Persistence contracts and the reference in-memory implementation.

pub mod session;

pub use session::{InMemorySessionStore, ScriptedSessionStore, SessionStore};
