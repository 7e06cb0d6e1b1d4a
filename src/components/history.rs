// ============================================================================
// HISTORY MANAGER — full-surface snapshots with a cursor and a durable mirror
// ============================================================================

use crate::canvas::RasterSurface;
use crate::error::PaintResult;
use crate::io::{self, SAVED_DRAWING_KEY, SnapshotStore};

/// One encoded full-surface snapshot. Opaque to everything but [`io`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    bytes: Vec<u8>,
}

impl HistoryEntry {
    pub fn capture(surface: &RasterSurface) -> PaintResult<Self> {
        Ok(Self { bytes: io::encode_snapshot(surface)? })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn decode(&self) -> PaintResult<RasterSurface> {
        io::decode_snapshot(&self.bytes)
    }

    pub fn memory_size(&self) -> usize {
        self.bytes.len()
    }
}

/// Linear undo/redo over snapshots.
///
/// `cursor` always indexes the entry matching the live surface, so
/// `0 <= cursor < entries.len()` whenever there are entries. Committing after
/// an undo discards everything past the cursor. The entry at the cursor is
/// mirrored to the store after every commit, undo and redo.
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    max_entries: usize,
    store: Box<dyn SnapshotStore>,
}

impl History {
    pub fn new(max_entries: usize, store: Box<dyn SnapshotStore>) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            max_entries: max_entries.max(1),
            store,
        }
    }

    /// The snapshot a previous session left in the store, if it decodes.
    pub fn load_stored(&self) -> Option<RasterSurface> {
        let bytes = match self.store.read(SAVED_DRAWING_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                crate::log_warn!("history: could not read stored drawing: {}", e);
                return None;
            }
        };
        match io::decode_snapshot(&bytes) {
            Ok(surface) => Some(surface),
            Err(e) => {
                crate::log_warn!("history: stored drawing is unusable: {}", e);
                None
            }
        }
    }

    /// Replace all entries with `surface` as entry 0. The store is left alone.
    pub fn seed(&mut self, surface: &RasterSurface) -> PaintResult<()> {
        let entry = HistoryEntry::capture(surface)?;
        self.entries.clear();
        self.entries.push(entry);
        self.cursor = 0;
        Ok(())
    }

    /// Record `surface` as the newest entry.
    pub fn commit(&mut self, surface: &RasterSurface) -> PaintResult<()> {
        let entry = HistoryEntry::capture(surface)?;

        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(entry);
        self.cursor = self.entries.len() - 1;
        self.prune();
        self.mirror();
        Ok(())
    }

    /// Step back. `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor == 0 || self.entries.is_empty() {
            return None;
        }
        self.cursor -= 1;
        self.mirror();
        self.entries.get(self.cursor)
    }

    /// Step forward. `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.mirror();
        self.entries.get(self.cursor)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encoded bytes held across all entries.
    pub fn memory_usage(&self) -> usize {
        self.entries.iter().map(HistoryEntry::memory_size).sum()
    }

    /// Forget every entry and the stored drawing.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        if let Err(e) = self.store.remove(SAVED_DRAWING_KEY) {
            crate::log_warn!("history: could not remove stored drawing: {}", e);
        }
    }

    /// Drop the oldest entries beyond the cap.
    fn prune(&mut self) {
        let excess = self.entries.len().saturating_sub(self.max_entries);
        if excess > 0 {
            self.entries.drain(..excess);
            self.cursor = self.cursor.saturating_sub(excess);
        }
    }

    fn mirror(&mut self) {
        let Some(entry) = self.entries.get(self.cursor) else { return };
        if let Err(e) = self.store.write(SAVED_DRAWING_KEY, entry.as_bytes()) {
            crate::log_warn!("history: could not persist drawing: {}", e);
        }
    }
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("entries", &self.entries.len())
            .field("cursor", &self.cursor)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}
