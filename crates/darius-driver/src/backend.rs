//! Hardware collaborator contracts
//!
//! The driver touches the accelerator through exactly two seams:
//!
//! - a [`RegisterWindow`] the encoded command is written into, and
//! - [`DmaBuffer`]s holding the ifm, weights and ofm, addressable by the
//!   accelerator's datamover.
//!
//! Both stand for a single physical accelerator. Nothing here serialises
//! access: a caller driving the IP from several threads must hold its own
//! lock around a whole invocation (command write, buffer fills, start,
//! completion).

use std::fmt::Debug;

use crate::error::Result;

/// Byte-addressed register window of the IP
pub trait RegisterWindow: Debug + Send {
    /// Write `bytes` starting at `offset` from the window base
    ///
    /// # Errors
    ///
    /// Returns an error if the write falls outside the window or the
    /// underlying device rejects it.
    fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<()>;
}

/// Flat element buffer in DMA-capable memory
///
/// Allocation and release stay with whoever created the buffer; the driver
/// only reads and writes elements by index.
pub trait DmaBuffer: Debug + Send {
    /// Element type as seen by the accelerator
    type Elem: Copy;

    /// Physical address of element 0, as seen by the accelerator
    fn physical_address(&self) -> u64;

    /// Elements of the buffer
    fn as_slice(&self) -> &[Self::Elem];

    /// Mutable elements of the buffer
    fn as_mut_slice(&mut self) -> &mut [Self::Elem];

    /// Number of elements
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// True if the buffer holds no elements
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
