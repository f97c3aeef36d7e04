//! Durable session storage and debounced saving

mod migration;
mod saver;
mod store;

pub use migration::{migrate_session, migrate_slides, MigrationReport};
pub use saver::SessionSaver;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
