pub mod scheduler;

use std::fmt::Debug;
use std::fs::File;
use std::future;
use std::io::{Read, Seek, SeekFrom};

use bytes::Bytes;
use futures::future::BoxFuture;
use quarry_error::{QuarryError, Result};

/// Source of bytes addressable by byte range.
///
/// All reads are exact: a source either returns `len` bytes starting at
/// `start` or errors. Short reads are surfaced to the caller as-is, no
/// retries happen at this layer.
pub trait FileSource: Sync + Send + Debug {
    /// Read an exact range of bytes from the source.
    fn read_range(&mut self, start: usize, len: usize) -> BoxFuture<'static, Result<Bytes>>;

    /// Get the total size in bytes of the source.
    fn size(&mut self) -> BoxFuture<'static, Result<usize>>;

    /// Close the source.
    ///
    /// Reading from or closing an already closed source is an error.
    fn close(&mut self) -> BoxFuture<'static, Result<()>>;
}

/// In-memory byte buffer acting as a file source.
///
/// Cheap to clone ranges out of since the underlying buffer is reference
/// counted.
#[derive(Debug, Clone)]
pub struct MemorySource {
    buf: Bytes,
    closed: bool,
}

impl MemorySource {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        MemorySource {
            buf: buf.into(),
            closed: false,
        }
    }
}

impl FileSource for MemorySource {
    fn read_range(&mut self, start: usize, len: usize) -> BoxFuture<'static, Result<Bytes>> {
        let result = if self.closed {
            Err(QuarryError::new("Read on closed source"))
        } else if start + len > self.buf.len() {
            Err(QuarryError::new(format!(
                "Byte range out of bounds, start: {start}, len: {len}, size: {}",
                self.buf.len()
            )))
        } else {
            Ok(self.buf.slice(start..start + len))
        };
        Box::pin(future::ready(result))
    }

    fn size(&mut self) -> BoxFuture<'static, Result<usize>> {
        let result = if self.closed {
            Err(QuarryError::new("Size on closed source"))
        } else {
            Ok(self.buf.len())
        };
        Box::pin(future::ready(result))
    }

    fn close(&mut self) -> BoxFuture<'static, Result<()>> {
        let result = if self.closed {
            Err(QuarryError::new("Source already closed"))
        } else {
            self.closed = true;
            Ok(())
        };
        Box::pin(future::ready(result))
    }
}

/// Implementation of range reads on top of a file.
///
/// Reads happen synchronously with the result returned in an
/// immediately-ready future. Callers that care about blocking should wrap
/// the file in their runtime's blocking primitive.
impl FileSource for File {
    fn read_range(&mut self, start: usize, len: usize) -> BoxFuture<'static, Result<Bytes>> {
        let mut buf = vec![0; len];
        let result = read_at_sync(self, start, &mut buf);
        Box::pin(future::ready(result.map(|_| Bytes::from(buf))))
    }

    fn size(&mut self) -> BoxFuture<'static, Result<usize>> {
        let result = self
            .metadata()
            .map(|m| m.len() as usize)
            .map_err(QuarryError::from);
        Box::pin(future::ready(result))
    }

    fn close(&mut self) -> BoxFuture<'static, Result<()>> {
        // Actual closing happens when the file is dropped.
        Box::pin(future::ready(Ok(())))
    }
}

/// Helper for synchronously reading into a buffer.
fn read_at_sync<R>(mut reader: R, start: usize, buf: &mut [u8]) -> Result<()>
where
    R: Read + Seek,
{
    reader.seek(SeekFrom::Start(start as u64))?;
    reader.read_exact(buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_source_reads_exact_range() {
        let mut source = MemorySource::new(vec![0, 1, 2, 3, 4, 5, 6, 7]);
        let got = source.read_range(2, 3).await.unwrap();
        assert_eq!(got.as_ref(), &[2, 3, 4]);
        assert_eq!(8, source.size().await.unwrap());
    }

    #[tokio::test]
    async fn memory_source_rejects_out_of_bounds() {
        let mut source = MemorySource::new(vec![0, 1, 2, 3]);
        source.read_range(2, 3).await.unwrap_err();
    }

    #[tokio::test]
    async fn memory_source_rejects_use_after_close() {
        let mut source = MemorySource::new(vec![0, 1, 2, 3]);
        source.close().await.unwrap();
        source.read_range(0, 1).await.unwrap_err();
        source.close().await.unwrap_err();
    }
}
