//! Lazy chunk iteration over a buffered prefix followed by a [`BinarySource`]
//! (spec §4.2 `chunkBy`/`toStream`).

use bytes::{Bytes, BytesMut};

use super::source::BinarySource;
use crate::error::Result;

pub struct ChunkStream {
    prefix: Option<Bytes>,
    source: BinarySource,
    /// `Some(n)` for `chunkBy(n)`; `None` to pass bytes through as they
    /// arrive from the source (`toStream()`).
    fixed_size: Option<usize>,
    carry: BytesMut,
    exhausted: bool,
}

impl ChunkStream {
    pub(super) fn new(prefix: Bytes, source: BinarySource, fixed_size: Option<usize>) -> Self {
        Self {
            prefix: Some(prefix),
            source,
            fixed_size,
            carry: BytesMut::new(),
            exhausted: false,
        }
    }

    /// Pull the next chunk. `None` once both the buffered prefix and the
    /// source are drained.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let Some(n) = self.fixed_size else {
            // toStream(): pass bytes through as-received, prefix first.
            if let Some(prefix) = self.prefix.take() {
                if !prefix.is_empty() {
                    return Ok(Some(prefix));
                }
            }
            return self.source.next_chunk().await;
        };

        if let Some(prefix) = self.prefix.take() {
            self.carry.extend_from_slice(&prefix);
        }

        while self.carry.len() < n && !self.exhausted {
            match self.source.next_chunk().await? {
                Some(bytes) => self.carry.extend_from_slice(&bytes),
                None => self.exhausted = true,
            }
        }

        if self.carry.is_empty() {
            return Ok(None);
        }

        let take = n.min(self.carry.len());
        Ok(Some(self.carry.split_to(take).freeze()))
    }

    /// Convenience: drain every remaining chunk into one buffer.
    pub async fn drain_all(&mut self) -> Result<Bytes> {
        let mut out = BytesMut::new();
        while let Some(chunk) = self.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }
}
