//! Persisted plugin state.
//!
//! The state blob is a serde struct encoded with bincode (fixed-width
//! integers, little endian). Layout:
//!
//! ```text
//! magic    [u8; 4]   "SBST"
//! version  u16       1
//! entries  Vec<(id: String, value: f64)>
//! ```
//!
//! Parameters are keyed by id rather than index so that state saved by an
//! older build still restores after parameters are added or reordered.
//! Unknown ids are skipped; parameters absent from the blob keep their
//! current value.
//!
//! Restoring is all-or-nothing: the whole blob is decoded and validated
//! before a single value is written.

use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::parameters::ParameterSet;
use crate::types::{ParameterIndex, ParameterValue};

/// Leading bytes of every state blob.
pub const STATE_MAGIC: [u8; 4] = *b"SBST";

/// Current state format version.
pub const STATE_VERSION: u16 = 1;

/// Largest blob accepted on restore.
pub const MAX_STATE_BYTES: u64 = 1 << 20;

#[derive(Debug, Serialize, Deserialize)]
struct StateBlob {
    magic: [u8; 4],
    version: u16,
    entries: Vec<StateEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateEntry {
    id: String,
    value: f64,
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_STATE_BYTES)
        .reject_trailing_bytes()
}

/// Validated state, ready to be applied to a [`ParameterSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedState {
    values: Vec<(ParameterIndex, ParameterValue)>,
    skipped: usize,
}

impl PersistedState {
    /// Capture the current values of a parameter set.
    pub fn capture(parameters: &ParameterSet) -> Self {
        Self {
            values: parameters
                .iter()
                .map(|(index, _, value)| (index, value))
                .collect(),
            skipped: 0,
        }
    }

    /// Encode captured values.
    pub fn encode(&self, parameters: &ParameterSet) -> BridgeResult<Vec<u8>> {
        let entries = self
            .values
            .iter()
            .filter_map(|&(index, value)| {
                let info = parameters.info(index).ok()?;
                Some(StateEntry {
                    id: info.id.to_string(),
                    value,
                })
            })
            .collect();

        let blob = StateBlob {
            magic: STATE_MAGIC,
            version: STATE_VERSION,
            entries,
        };
        Ok(options().serialize(&blob)?)
    }

    /// Decode and validate a blob against a parameter set.
    ///
    /// Nothing is modified. Fails with [`BridgeError::CorruptState`] on
    /// truncated or garbage input, a foreign magic, an unsupported version,
    /// or a non-finite value.
    pub fn decode(bytes: &[u8], parameters: &ParameterSet) -> BridgeResult<Self> {
        let blob: StateBlob = options()
            .deserialize(bytes)
            .map_err(|e| BridgeError::CorruptState(e.to_string()))?;

        if blob.magic != STATE_MAGIC {
            return Err(BridgeError::CorruptState(format!(
                "unexpected magic {:02x?}",
                blob.magic
            )));
        }
        if blob.version == 0 || blob.version > STATE_VERSION {
            return Err(BridgeError::CorruptState(format!(
                "unsupported state version {}",
                blob.version
            )));
        }

        let mut values = Vec::with_capacity(blob.entries.len());
        let mut skipped = 0;
        for entry in blob.entries {
            if !entry.value.is_finite() {
                return Err(BridgeError::CorruptState(format!(
                    "parameter '{}' has non-finite value",
                    entry.id
                )));
            }
            match parameters.index_of(&entry.id) {
                Some(index) => values.push((index, entry.value.clamp(0.0, 1.0))),
                None => {
                    log::debug!("ignoring unknown parameter '{}' in state", entry.id);
                    skipped += 1;
                }
            }
        }

        Ok(Self { values, skipped })
    }

    /// Write every value into the parameter set.
    pub fn apply(&self, parameters: &ParameterSet) {
        for &(index, value) in &self.values {
            parameters.store_validated(index, value);
        }
    }

    /// Number of values this state carries for known parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of entries skipped because their id is unknown.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
