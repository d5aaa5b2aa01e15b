//! Archival of typed drawing events.

use drawboard_protocol::DrawingEvent;

use crate::{ArchiveError, ArchivedEvent, DocumentStore};

/// Writes batches of already-parsed drawing events to the store.
#[derive(Debug, Clone)]
pub struct EventArchive<S> {
    store: S,
}

impl<S: DocumentStore> EventArchive<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Stores every event in `events`, in the order given, and returns how
    /// many rows were written.
    ///
    /// Events are already typed, so there's nothing left to reject: if any
    /// payload fails to re-encode, nothing from the batch is written.
    pub async fn archive(&self, events: Vec<DrawingEvent>) -> Result<usize, ArchiveError> {
        let rows = events
            .iter()
            .map(ArchivedEvent::from_event)
            .collect::<Result<Vec<_>, _>>()?;
        let written = self.store.insert_events(rows).await?;
        tracing::debug!(written, "archived drawing events");
        Ok(written)
    }

    /// Everything archived so far, oldest first.
    pub async fn list(&self) -> Result<Vec<ArchivedEvent>, ArchiveError> {
        Ok(self.store.list_events().await?)
    }
}
