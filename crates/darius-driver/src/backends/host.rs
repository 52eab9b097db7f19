//! Host-memory collaborators
//!
//! Stand-ins for the command window and DMA buffers that keep everything in
//! ordinary heap memory. Used for dry runs (inspect exactly what would reach
//! the hardware) and for tests, where no accelerator is present.

use tracing::debug;

use crate::backend::{DmaBuffer, RegisterWindow};
use crate::error::{DariusError, Result};

/// Register window that records every byte written to it
#[derive(Debug, Clone, Default)]
pub struct RecordingWindow {
    bytes: Vec<u8>,
    writes: usize,
    limit: Option<usize>,
}

impl RecordingWindow {
    /// Unbounded window
    pub fn new() -> Self {
        Self::default()
    }

    /// Window that rejects writes past `limit` bytes
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Bytes written so far (zero-filled between writes)
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of write calls
    pub const fn writes(&self) -> usize {
        self.writes
    }
}

impl RegisterWindow for RecordingWindow {
    fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| DariusError::mmio(format!("Offset {offset:#x} exceeds address space")))?;
        let end = start
            .checked_add(bytes.len())
            .ok_or_else(|| DariusError::mmio("write span overflows"))?;
        if let Some(limit) = self.limit {
            if end > limit {
                return Err(DariusError::mmio(format!(
                    "Out of bounds write: offset={start:#x}, len={}, limit={limit:#x}",
                    bytes.len()
                )));
            }
        }
        if self.bytes.len() < end {
            self.bytes.resize(end, 0);
        }
        self.bytes[start..end].copy_from_slice(bytes);
        self.writes += 1;
        debug!("Recorded {} bytes at {:#x}", bytes.len(), start);
        Ok(())
    }
}

/// DMA buffer backed by a host `Vec`
#[derive(Debug, Clone, PartialEq)]
pub struct HostBuffer<T> {
    data: Vec<T>,
    physical_address: u64,
}

impl<T: Copy + Default> HostBuffer<T> {
    /// Zeroed buffer of `len` elements reporting `physical_address`
    pub fn zeroed(len: usize, physical_address: u64) -> Self {
        Self {
            data: vec![T::default(); len],
            physical_address,
        }
    }
}

impl<T> HostBuffer<T> {
    /// Wrap existing data
    pub const fn from_vec(data: Vec<T>, physical_address: u64) -> Self {
        Self {
            data,
            physical_address,
        }
    }

    /// Take the data back
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T: Copy + Send + std::fmt::Debug> DmaBuffer for HostBuffer<T> {
    type Elem = T;

    fn physical_address(&self) -> u64 {
        self.physical_address
    }

    fn as_slice(&self) -> &[T] {
        &self.data
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}
