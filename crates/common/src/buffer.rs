//! In-memory, offset-addressable write buffer
//!
//! Accumulates the new content of a file until it is flushed to the
//! remote repository as one whole object. Writes may land anywhere: past
//! the end (the gap is zero-filled), at the end (append) or inside the
//! existing bytes (overwrite).

/// Errors returned when a write is rejected. A rejected write never
/// mutates the buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("offset {0} out of range (too small)")]
    NegativeOffset(i64),
    #[error("offset + data length {end} out of range (limit {max})")]
    CapacityExceeded { end: usize, max: usize },
}

/// Growable byte buffer with an optional upper bound.
///
/// A maximum of `0` means the buffer is unbounded. When bounded, a write
/// whose end offset would reach or exceed the maximum is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBuffer {
    data: Vec<u8>,
    max: usize,
}

impl WriteBuffer {
    /// Create a buffer of `size` zero bytes limited to `max` bytes.
    ///
    /// A bounded maximum smaller than `size` is raised to `size`.
    pub fn new(size: usize, max: usize) -> Self {
        let max = if max > 0 && max < size { size } else { max };
        Self {
            data: vec![0; size],
            max,
        }
    }

    /// Create an empty buffer with no upper bound
    pub fn unbounded() -> Self {
        Self::new(0, 0)
    }

    /// Create a buffer seeded with existing content
    pub fn from_bytes(data: impl Into<Vec<u8>>, max: usize) -> Self {
        let data = data.into();
        let max = if max > 0 && max < data.len() {
            data.len()
        } else {
            max
        };
        Self { data, max }
    }

    /// Change the maximum. A bounded maximum below the current length is
    /// raised to the current length; `0` removes the bound.
    pub fn set_max(&mut self, max: usize) {
        self.max = if max > 0 && max < self.data.len() {
            self.data.len()
        } else {
            max
        };
    }

    /// Current length and maximum (`0` when unbounded)
    pub fn shape(&self) -> (usize, usize) {
        (self.data.len(), self.max)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The full backing sequence, as it would be flushed
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Write `data` at `offset`, returning the number of bytes written.
    pub fn write_at(&mut self, data: &[u8], offset: i64) -> Result<usize, BufferError> {
        let offset = usize::try_from(offset).map_err(|_| BufferError::NegativeOffset(offset))?;
        let end = offset.saturating_add(data.len());
        self.check_end(end)?;

        if offset == self.data.len() {
            self.data.extend_from_slice(data);
            return Ok(data.len());
        }

        if end > self.data.len() {
            self.data.resize(end, 0);
        }

        self.data[offset..end].copy_from_slice(data);
        Ok(data.len())
    }

    /// Shrink to `len`, or zero-extend to it under the same capacity rule
    /// as writes.
    pub fn truncate(&mut self, len: usize) -> Result<(), BufferError> {
        if len > self.data.len() {
            self.check_end(len)?;
        }
        self.data.resize(len, 0);
        Ok(())
    }

    fn check_end(&self, end: usize) -> Result<(), BufferError> {
        if self.max > 0 && end >= self.max {
            return Err(BufferError::CapacityExceeded { end, max: self.max });
        }
        Ok(())
    }
}
