//! Persistence layer for the shared drawboard.
//!
//! This crate owns the data that outlives a connection:
//!
//! 1. **Model**: [`User`], [`Session`], [`ArchivedEvent`], and the
//!    [`TokenHash`] newtype that keeps refresh-token plaintext out of storage
//! 2. **Store contract**: [`DocumentStore`], the small async CRUD surface
//!    everything above talks to, with [`MemoryStore`] as the bundled backend
//! 3. **Sessions**: [`SessionStore`], which enforces one live refresh
//!    session per user
//! 4. **Archive**: [`EventArchive`], which writes typed drawing events
//!
//! # How it fits in the stack
//!
//! ```text
//! Auth Gateway (above)  ← signs people in, rotates refresh sessions
//!     ↕
//! Session Layer (this crate)  ← users, sessions, archived events
//!     ↕
//! Protocol Layer (below)  ← provides the DrawingEvent schema
//! ```

mod archive;
mod error;
mod memory;
mod model;
mod sessions;
mod store;

pub use archive::EventArchive;
pub use error::{ArchiveError, SessionError, StoreError};
pub use memory::MemoryStore;
pub use model::{ArchivedEvent, Session, SessionTimes, TokenHash, User};
pub use sessions::SessionStore;
pub use store::DocumentStore;
