use crate::types::{LinkCost, RouteEntry, RouterId, VectorEntry};
use thiserror::Error;

/// Largest datagram a router sends or accepts.
pub const MAX_MESSAGE_SIZE: usize = 1024;

const HEADER_LEN: usize = 2;
const RECORD_LEN: usize = 4;

/// Most records that fit in one message.
pub const MAX_ENTRIES: usize = (MAX_MESSAGE_SIZE - HEADER_LEN) / RECORD_LEN;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("message of {0} bytes is shorter than the entry-count header")]
    MissingHeader(usize),

    #[error("message of {0} bytes exceeds the {max}-byte limit", max = MAX_MESSAGE_SIZE)]
    Oversized(usize),

    #[error("header declares {declared} entries but only {available} bytes of records follow")]
    Truncated { declared: usize, available: usize },

    #[error("{0} entries do not fit in one message (max {max})", max = MAX_ENTRIES)]
    TooManyEntries(usize),
}

/// A distance vector as sent on the wire.
///
/// Layout, big-endian: `u16` entry count, then per entry `u16` destination
/// and `u16` cost. No type, version or checksum fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advertisement {
    pub entries: Vec<VectorEntry>,
}

impl Advertisement {
    pub fn new(entries: Vec<VectorEntry>) -> Self {
        Self { entries }
    }

    pub fn from_routes(routes: &[RouteEntry]) -> Self {
        Self {
            entries: routes.iter().map(RouteEntry::to_vector_entry).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        if self.entries.len() > MAX_ENTRIES {
            return Err(CodecError::TooManyEntries(self.entries.len()));
        }

        let mut buf = Vec::with_capacity(HEADER_LEN + RECORD_LEN * self.entries.len());
        buf.extend_from_slice(&(self.entries.len() as u16).to_be_bytes());
        for entry in &self.entries {
            buf.extend_from_slice(&entry.destination.0.to_be_bytes());
            buf.extend_from_slice(&entry.cost.0.to_be_bytes());
        }
        Ok(buf)
    }

    /// Parse a received datagram. Bytes after the declared records are ignored.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() > MAX_MESSAGE_SIZE {
            return Err(CodecError::Oversized(data.len()));
        }
        if data.len() < HEADER_LEN {
            return Err(CodecError::MissingHeader(data.len()));
        }

        let declared = u16::from_be_bytes([data[0], data[1]]) as usize;
        let records = &data[HEADER_LEN..];
        if declared * RECORD_LEN > records.len() {
            return Err(CodecError::Truncated {
                declared,
                available: records.len(),
            });
        }

        let entries = records
            .chunks_exact(RECORD_LEN)
            .take(declared)
            .map(|rec| {
                VectorEntry::new(
                    RouterId(u16::from_be_bytes([rec[0], rec[1]])),
                    LinkCost(u16::from_be_bytes([rec[2], rec[3]])),
                )
            })
            .collect();

        Ok(Self { entries })
    }
}
