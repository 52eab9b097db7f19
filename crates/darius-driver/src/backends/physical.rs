//! DMA buffers in reserved physical memory
//!
//! The accelerator's datamover reads and writes physical addresses directly.
//! On boards without a contiguous-memory allocator exposed to user space,
//! a range is reserved at boot (device tree `reserved-memory` or `mem=`)
//! and carved into buffers here. Elements are 16 bits wide, matching the
//! IP's input width.

use darius_chip::limits::ELEMENT_BYTES;
use std::path::Path;

use crate::backend::DmaBuffer;
use crate::error::{DariusError, Result};
use crate::mmio::MappedRegion;

/// 16-bit element buffer over a reserved physical range
#[derive(Debug)]
pub struct PhysicalBuffer {
    region: MappedRegion,
}

impl PhysicalBuffer {
    /// Map `len` elements at physical address `base`
    ///
    /// # Errors
    ///
    /// Returns an error if `base` is not element aligned or the range
    /// cannot be mapped.
    pub fn map(mem_path: &Path, base: u64, len: usize) -> Result<Self> {
        if base % ELEMENT_BYTES != 0 {
            return Err(DariusError::mmio(format!(
                "DMA buffer base {base:#x} is not {ELEMENT_BYTES}-byte aligned"
            )));
        }
        let bytes = len
            .checked_mul(std::mem::size_of::<u16>())
            .ok_or_else(|| DariusError::mmio("DMA buffer size overflows"))?;
        let region = MappedRegion::map(mem_path, base, bytes)?;
        Ok(Self { region })
    }

    /// Zero every element
    pub fn clear(&mut self) {
        self.region.as_u16_slice_mut().fill(0);
    }
}

impl DmaBuffer for PhysicalBuffer {
    type Elem = u16;

    fn physical_address(&self) -> u64 {
        self.region.base()
    }

    fn as_slice(&self) -> &[u16] {
        self.region.as_u16_slice()
    }

    fn as_mut_slice(&mut self) -> &mut [u16] {
        self.region.as_u16_slice_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misaligned_base_is_rejected() {
        let err = PhysicalBuffer::map(Path::new("/dev/mem"), 0x1000_0001, 16).unwrap_err();
        assert!(matches!(err, DariusError::Mmio { .. }));
    }

    #[test]
    #[ignore] // Requires root and a reserved DMA range
    fn map_reserved_range() {
        let base = std::env::var("DARIUS_DMA_BASE")
            .ok()
            .and_then(|v| crate::mmio::parse_hex(&v))
            .expect("DARIUS_DMA_BASE");
        let mut buf = PhysicalBuffer::map(Path::new("/dev/mem"), base, 1024).expect("map");
        buf.clear();
        assert!(buf.as_slice().iter().all(|&v| v == 0));
    }
}
