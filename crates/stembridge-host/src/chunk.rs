//! Chunked state persistence.
//!
//! The host saves plugin state in two calls: first it asks for the size of
//! a chunk, then for the chunk itself. The snapshot taken for the size
//! request is cached so both calls agree, and dropped once delivered.
//!
//! A chunk is an 8-byte header followed by the state payload:
//!
//! ```text
//! [0..4]  chunk id (four-character code)
//! [4..8]  total size including header, u32 little-endian
//! [8..]   payload
//! ```

use parking_lot::Mutex;
use stembridge_core::host::StateStore;
use stembridge_core::{BridgeError, BridgeResult, FourCharCode};

/// Id of the chunk carrying the bridge state.
pub const STATE_CHUNK_ID: FourCharCode = FourCharCode::new(b"sbst");

/// Size of the chunk header.
pub const CHUNK_HEADER_BYTES: usize = 8;

/// Serves one chunk id from a [`StateStore`].
pub struct ChunkStore {
    id: FourCharCode,
    cache: Mutex<Option<Vec<u8>>>,
}

impl ChunkStore {
    pub fn new(id: FourCharCode) -> Self {
        Self {
            id,
            cache: Mutex::new(None),
        }
    }

    pub fn id(&self) -> FourCharCode {
        self.id
    }

    fn owns(&self, id: FourCharCode) -> bool {
        id == self.id
    }

    /// Total chunk size for `id`, or `None` if the id is not ours.
    ///
    /// Captures a snapshot and keeps it for the following
    /// [`chunk`](Self::chunk) call.
    pub fn size<S: StateStore + ?Sized>(
        &self,
        id: FourCharCode,
        store: &S,
    ) -> BridgeResult<Option<usize>> {
        if !self.owns(id) {
            return Ok(None);
        }
        let payload = store.snapshot()?;
        let size = CHUNK_HEADER_BYTES + payload.len();
        *self.cache.lock() = Some(payload);
        Ok(Some(size))
    }

    /// The full chunk for `id`, or `None` if the id is not ours.
    ///
    /// Uses the snapshot cached by [`size`](Self::size) if there is one,
    /// capturing a fresh one otherwise. The cache is cleared either way.
    pub fn chunk<S: StateStore + ?Sized>(
        &self,
        id: FourCharCode,
        store: &S,
    ) -> BridgeResult<Option<Vec<u8>>> {
        if !self.owns(id) {
            return Ok(None);
        }
        let cached = self.cache.lock().take();
        let payload = match cached {
            Some(payload) => payload,
            None => store.snapshot()?,
        };
        Ok(Some(self.write_chunk(&payload)?))
    }

    /// Restore from a chunk for `id`. Returns `None` if the id is not ours.
    ///
    /// A chunk with an empty payload restores nothing.
    pub fn restore<S: StateStore + ?Sized>(
        &self,
        id: FourCharCode,
        chunk: &[u8],
        store: &S,
    ) -> BridgeResult<Option<()>> {
        if !self.owns(id) {
            return Ok(None);
        }
        let payload = self.read_chunk(chunk)?;
        if payload.is_empty() {
            log::debug!("chunk '{}' is empty, nothing to restore", self.id);
            return Ok(Some(()));
        }
        store.restore(payload)?;
        Ok(Some(()))
    }

    fn write_chunk(&self, payload: &[u8]) -> BridgeResult<Vec<u8>> {
        let total = CHUNK_HEADER_BYTES + payload.len();
        let size = u32::try_from(total)
            .map_err(|_| BridgeError::CorruptState(format!("chunk of {total} bytes is too large")))?;

        let mut chunk = Vec::with_capacity(total);
        chunk.extend_from_slice(self.id.as_bytes());
        chunk.extend_from_slice(&size.to_le_bytes());
        chunk.extend_from_slice(payload);
        Ok(chunk)
    }

    fn read_chunk<'a>(&self, chunk: &'a [u8]) -> BridgeResult<&'a [u8]> {
        let Some((header, payload)) = chunk.split_first_chunk::<CHUNK_HEADER_BYTES>() else {
            return Err(BridgeError::CorruptState(format!(
                "chunk of {} bytes is shorter than its header",
                chunk.len()
            )));
        };

        let id = FourCharCode([header[0], header[1], header[2], header[3]]);
        if id != self.id {
            return Err(BridgeError::UnknownChunk(id));
        }

        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        if size != chunk.len() {
            return Err(BridgeError::CorruptState(format!(
                "chunk header declares {size} bytes, got {}",
                chunk.len()
            )));
        }
        Ok(payload)
    }
}

impl Default for ChunkStore {
    fn default() -> Self {
        Self::new(STATE_CHUNK_ID)
    }
}
