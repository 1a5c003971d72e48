//! Identity, session, and intent persistence over two abstract storage
//! scopes: one durable across sessions (the per-browser analog) and one
//! scoped to the current session (the per-tab analog). Both scopes share the
//! [`KeyValueScope`] shape so any persistent or ephemeral store can stand in
//! behind them in tests.

pub mod error;
pub mod identity;
pub mod scope;
pub mod sqlite;

pub use error::StoreError;
pub use identity::{IdentityStore, SessionRecord};
pub use scope::{KeyValueScope, MemoryScope};
pub use sqlite::SqliteScope;
