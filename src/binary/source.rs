//! Backing sources for [`super::BinaryData`]: a file handle or an in-memory
//! byte source, unified behind one pull-based `next_chunk` method.

use bytes::Bytes;
use tokio::io::AsyncReadExt;

use crate::error::Result;

const READ_CHUNK: usize = 64 * 1024;

enum Kind {
    File { path: String, handle: Option<tokio::fs::File> },
    Memory { data: Bytes, offset: usize },
}

pub struct BinarySource {
    kind: Kind,
}

impl BinarySource {
    pub fn file(path: String) -> Self {
        Self {
            kind: Kind::File { path, handle: None },
        }
    }

    pub fn memory(data: Bytes) -> Self {
        Self {
            kind: Kind::Memory { data, offset: 0 },
        }
    }

    pub async fn open(&mut self) -> Result<()> {
        if let Kind::File { path, handle } = &mut self.kind {
            let file = tokio::fs::File::open(path).await?;
            *handle = Some(file);
        }
        Ok(())
    }

    /// Pull the next chunk of bytes, or `None` at end of source.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        match &mut self.kind {
            Kind::File { handle, .. } => {
                let file = handle
                    .as_mut()
                    .expect("BinarySource::open must be called before reading");
                let mut buf = vec![0u8; READ_CHUNK];
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    Ok(None)
                } else {
                    buf.truncate(n);
                    Ok(Some(Bytes::from(buf)))
                }
            }
            Kind::Memory { data, offset } => {
                if *offset >= data.len() {
                    Ok(None)
                } else {
                    let end = (*offset + READ_CHUNK).min(data.len());
                    let piece = data.slice(*offset..end);
                    *offset = end;
                    Ok(Some(piece))
                }
            }
        }
    }
}
