//! Physical memory windows over `/dev/mem`
//!
//! The command window of the IP and any DMA carve-out are plain physical
//! address ranges on the SoC bus. They are reached by mapping `/dev/mem`
//! with `O_SYNC` so the mapping is uncached.
//!
//! Each [`MappedRegion`] represents exclusive use of a hardware range;
//! callers are responsible for not opening the same window twice and for
//! serialising access across threads (writes take `&mut self`).

use rustix::fs::OFlags;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use darius_chip::command::WINDOW_SPAN;

use crate::backend::RegisterWindow;
use crate::error::{DariusError, Result};

/// Default physical memory device
pub const DEFAULT_MEM_PATH: &str = "/dev/mem";

/// Device memory configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmioConfig {
    /// Physical memory device (normally `/dev/mem`)
    pub mem_path: PathBuf,
    /// Physical address of the IP command window
    pub command_base: u64,
    /// Bytes to map at `command_base`
    pub command_span: usize,
}

impl MmioConfig {
    /// Configuration for a command window at `command_base`
    pub fn new(command_base: u64) -> Self {
        Self {
            mem_path: PathBuf::from(DEFAULT_MEM_PATH),
            command_base,
            command_span: WINDOW_SPAN,
        }
    }

    /// Read configuration from the environment
    ///
    /// - `DARIUS_CMD_BASE`: command window physical address, hex with or
    ///   without `0x` (required)
    /// - `DARIUS_MEM_PATH`: memory device (default `/dev/mem`)
    ///
    /// # Errors
    ///
    /// Returns an error if `DARIUS_CMD_BASE` is missing or not a hex number.
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var("DARIUS_CMD_BASE")
            .map_err(|_| DariusError::mmio("DARIUS_CMD_BASE is not set"))?;
        let command_base = parse_hex(&raw)
            .ok_or_else(|| DariusError::mmio(format!("DARIUS_CMD_BASE is not a hex address: {raw}")))?;

        let mut config = Self::new(command_base);
        if let Some(path) = std::env::var_os("DARIUS_MEM_PATH") {
            config.mem_path = PathBuf::from(path);
        }
        tracing::debug!(
            "MMIO config: {} @ {:#x}",
            config.mem_path.display(),
            config.command_base
        );
        Ok(config)
    }

    /// Map the command window
    ///
    /// # Errors
    ///
    /// Returns an error if the memory device cannot be opened or mapped.
    pub fn open_command_window(&self) -> Result<MappedRegion> {
        MappedRegion::map(&self.mem_path, self.command_base, self.command_span)
    }
}

/// Parse a hex address, `0x` prefix optional
pub fn parse_hex(text: &str) -> Option<u64> {
    let digits = text
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    u64::from_str_radix(digits, 16).ok()
}

/// Mapped physical address range
///
/// Bounds-checked access to a range of physical memory.
#[derive(Debug)]
pub struct MappedRegion {
    /// Start of the whole (page aligned) mapping
    map_ptr: NonNull<u8>,
    /// Length of the whole mapping
    map_len: usize,
    /// Distance from the page boundary to `base`
    page_offset: usize,
    /// Bytes usable from `base`
    size: usize,
    /// Physical address of the first usable byte
    base: u64,
    _file: File,
}

impl MappedRegion {
    /// Map `size` bytes of physical memory starting at `base`
    ///
    /// `base` need not be page aligned.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` cannot be opened, `size` is zero, or
    /// `mmap` fails.
    pub fn map(path: &Path, base: u64, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(DariusError::mmio("cannot map an empty window"));
        }

        // O_SYNC gives an uncached mapping of device memory
        #[allow(clippy::cast_possible_wrap)]
        let sync_flag = OFlags::SYNC.bits() as i32;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(sync_flag)
            .open(path)
            .map_err(|e| DariusError::mmio(format!("Cannot open {}: {e}", path.display())))?;

        let page = rustix::param::page_size() as u64;
        let page_base = base - base % page;
        let page_offset = usize::try_from(base - page_base)
            .map_err(|_| DariusError::mmio("page offset exceeds address space"))?;
        let map_len = size
            .checked_add(page_offset)
            .ok_or_else(|| DariusError::mmio("window size overflows"))?;

        // SAFETY: mmap of a freshly opened memory device.
        // Invariants: (1) fd valid, kept alive in `_file` for the lifetime of the
        // mapping; (2) map_len non-zero; (3) page_base is page aligned; (4) the
        // result is unmapped exactly once in Drop.
        let addr = unsafe {
            mmap(
                std::ptr::null_mut(),
                map_len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                page_base,
            )
        }
        .map_err(|e| DariusError::mmio(format!("mmap of {base:#x} failed: {e}")))?;

        let map_ptr =
            NonNull::new(addr.cast::<u8>()).ok_or_else(|| DariusError::mmio("mmap returned null"))?;

        tracing::info!("Mapped {:#x} (+{:#x}) at {:p}", base, size, map_ptr);

        Ok(Self {
            map_ptr,
            map_len,
            page_offset,
            size,
            base,
            _file: file,
        })
    }

    fn check_bounds(&self, offset: usize, len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(DariusError::mmio(format!(
                "Out of bounds access: offset={offset:#x}, len={len}, limit={:#x}",
                self.size
            ))),
        }
    }

    fn ptr(&self) -> *mut u8 {
        // SAFETY: page_offset < page size ≤ map_len, inside the mapping
        unsafe { self.map_ptr.as_ptr().add(self.page_offset) }
    }

    /// Read a 32-bit word
    ///
    /// # Errors
    ///
    /// Returns an error if `offset` is out of bounds or not word aligned.
    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        self.check_bounds(offset, 4)?;
        if offset % 4 != 0 {
            return Err(DariusError::mmio(format!("Unaligned read at {offset:#x}")));
        }
        // SAFETY: volatile read inside the mapping.
        // Invariants: (1) offset + 4 <= size (checked); (2) offset word aligned and
        // base word aligned by the bus, so the pointer is aligned for u32.
        #[allow(clippy::cast_ptr_alignment)]
        let value = unsafe { self.ptr().add(offset).cast::<u32>().read_volatile() };
        Ok(value)
    }

    /// Write a 32-bit word
    ///
    /// # Errors
    ///
    /// Returns an error if `offset` is out of bounds or not word aligned.
    pub fn write_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        self.check_bounds(offset, 4)?;
        if offset % 4 != 0 {
            return Err(DariusError::mmio(format!("Unaligned write at {offset:#x}")));
        }
        tracing::trace!("Write u32 @ {offset:#x} = {value:#x}");
        // SAFETY: volatile write inside the mapping; same invariants as read_u32.
        // Volatile because the IP latches the command on each store.
        #[allow(clippy::cast_ptr_alignment)]
        unsafe {
            self.ptr().add(offset).cast::<u32>().write_volatile(value);
        }
        Ok(())
    }

    /// Usable bytes from the base address
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Physical address of the first usable byte
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// View the region as 16-bit elements
    pub(crate) fn as_u16_slice(&self) -> &[u16] {
        // SAFETY: the mapping is valid for `size` bytes and lives as long as
        // `self`; u16 has no invalid bit patterns; the physical base of a DMA
        // buffer is at least 2-byte aligned.
        unsafe { std::slice::from_raw_parts(self.ptr().cast::<u16>(), self.size / 2) }
    }

    /// Mutable view of the region as 16-bit elements
    pub(crate) fn as_u16_slice_mut(&mut self) -> &mut [u16] {
        // SAFETY: as for `as_u16_slice`; `&mut self` guarantees exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.ptr().cast::<u16>(), self.size / 2) }
    }
}

impl RegisterWindow for MappedRegion {
    fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let offset = usize::try_from(offset)
            .map_err(|_| DariusError::mmio(format!("Offset {offset:#x} exceeds address space")))?;
        if bytes.len() % 4 != 0 {
            return Err(DariusError::mmio(format!(
                "Register writes are whole words, got {} bytes",
                bytes.len()
            )));
        }
        self.check_bounds(offset, bytes.len())?;
        for (i, word) in bytes.chunks_exact(4).enumerate() {
            let value = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            self.write_u32(offset + i * 4, value)?;
        }
        Ok(())
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        // SAFETY: map_ptr/map_len are exactly what mmap returned in map();
        // Drop runs once and no references into the mapping outlive self.
        unsafe {
            if let Err(e) = munmap(self.map_ptr.as_ptr().cast(), self.map_len) {
                tracing::error!("munmap failed during drop: {e}");
            }
        }
        tracing::debug!("Unmapped {:#x}", self.base);
    }
}

// SAFETY: MappedRegion owns its mapping exclusively; moving it between
// threads does not invalidate the mapping.
unsafe impl Send for MappedRegion {}

// SAFETY: shared access is read-only (volatile reads, slice views); every
// write requires &mut self.
unsafe impl Sync for MappedRegion {}
