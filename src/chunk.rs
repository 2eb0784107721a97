use crate::{Error, Result};
use std::fmt;
use tracing::instrument;

/// Inclusive byte range of the remote resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by the range, 0 when `end` precedes `start`
    pub fn len(&self) -> u64 {
        self.end
            .checked_sub(self.start)
            .map_or(0, |d| d.saturating_add(1))
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Formatted value for the `Range` header
    pub fn header_value(&self) -> String {
        format!("bytes={}", self)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One chunk of the download, `range` is `None` when the whole resource is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkSpec {
    pub index: usize,
    pub range: Option<ByteRange>,
}

impl ChunkSpec {
    pub fn new(index: usize, start: u64, end: u64) -> Self {
        Self {
            index,
            range: Some(ByteRange { start, end }),
        }
    }
    /// A chunk that fetches the entire resource without a Range header
    pub fn whole(index: usize) -> Self {
        Self { index, range: None }
    }
    pub fn len(&self) -> Option<u64> {
        self.range.map(|r| r.len())
    }
}

impl fmt::Display for ChunkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.range {
            Some(range) => write!(f, "#{} [{}]", self.index, range),
            None => write!(f, "#{} [whole]", self.index),
        }
    }
}

/// Iterator over the chunks of a download
///
/// Yields `chunk_count` chunks of `chunk_size` bytes followed by one
/// shorter chunk when the total doesn't divide evenly.
#[derive(Debug, Clone, Copy)]
pub struct Chunks {
    chunk_size: u64,
    chunk_count: u64,
    remainder: u64,
    current: u64,
}

impl Chunks {
    /// Create the iterator
    /// # Arguments
    /// * `total_bytes` - how many bytes to fetch in total
    /// * `chunk_size` - the size of each regular chunk
    /// * `chunk_count` - how many regular chunks to request
    pub fn new(total_bytes: u64, chunk_size: u64, chunk_count: u64) -> Result<Self> {
        if total_bytes == 0 {
            return Err(Error::Config("\"bytes\" cannot be set to 0".to_string()));
        }
        if chunk_size == 0 {
            return Err(Error::Config("\"size\" cannot be set to 0".to_string()));
        }
        if chunk_count == 0 {
            return Err(Error::Config("\"chunks\" cannot be set to 0".to_string()));
        }
        let covered = chunk_size.checked_mul(chunk_count).ok_or_else(|| {
            Error::Config(format!(
                "{} chunks of {} bytes overflow the addressable range",
                chunk_count, chunk_size
            ))
        })?;
        Ok(Self {
            chunk_size,
            chunk_count,
            remainder: total_bytes.saturating_sub(covered),
            current: 0,
        })
    }
    /// Bytes left over after the regular chunks, fetched by one extra chunk
    pub fn remainder(&self) -> u64 {
        self.remainder
    }
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }
    fn total_chunks(&self) -> u64 {
        self.chunk_count + u64::from(self.remainder > 0)
    }
}

impl Iterator for Chunks {
    type Item = ChunkSpec;
    fn next(&mut self) -> Option<Self::Item> {
        let start = self.current * self.chunk_size;
        let len = if self.current < self.chunk_count {
            self.chunk_size
        } else if self.current == self.chunk_count && self.remainder > 0 {
            self.remainder
        } else {
            return None;
        };
        let spec = ChunkSpec::new(self.current as usize, start, start + len - 1);
        self.current += 1;
        Some(spec)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.total_chunks() - self.current.min(self.total_chunks())) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Chunks {}

/// Compute the ordered chunk list for a download
///
/// # Example
///
/// ```
/// use multiget::plan;
/// # fn main() -> Result<(), multiget::Error> {
/// let specs = plan(10, 4, 2)?;
/// assert_eq!(specs.len(), 3);
/// assert_eq!(specs[2].len(), Some(2));
/// # Ok(())
/// # }
/// ```
#[instrument]
pub fn plan(total_bytes: u64, chunk_size: u64, chunk_count: u64) -> Result<Vec<ChunkSpec>> {
    Ok(Chunks::new(total_bytes, chunk_size, chunk_count)?.collect())
}
