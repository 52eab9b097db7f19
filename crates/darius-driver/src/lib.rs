//! Pure Rust driver for the Darius convolution / max-pool accelerator.
//!
//! The IP is a fixed 8 × 8 systolic array behind a positional command
//! descriptor. This crate covers everything between a layer description and
//! the bytes the IP consumes:
//!
//! - derive tiling geometry from the layer shape ([`DerivedGeometry`])
//! - check it against the bitstream's structural limits ([`validate()`])
//! - encode the command descriptor ([`CommandDescriptor`])
//! - relayout feature maps and weights into PE-grid order ([`relayout`])
//! - compute grid utilisation from a measured cycle count ([`efficiency()`])
//!
//! Hardware is reached only through [`RegisterWindow`] and [`DmaBuffer`];
//! [`mmio`] and [`backends`] provide `/dev/mem` and host-memory versions.
//!
//! # Quick start
//!
//! ```
//! use darius_driver::backends::{HostBuffer, RecordingWindow};
//! use darius_driver::{Accelerator, ConvConfig, PoolConfig, ValidationProfile};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let conv = ConvConfig::square(32, 16, 3, 1, 1, 16);
//! let mut ifm = HostBuffer::<u16>::zeroed(32 * 32 * 16, 0x1000_0000);
//! let mut weights = HostBuffer::<u16>::zeroed(16 * 16 * 9, 0x1100_0000);
//! let ofm = HostBuffer::<u16>::zeroed(32 * 32 * 16, 0x1200_0000);
//!
//! let acc = Accelerator::with_buffers(
//!     conv,
//!     Some(PoolConfig::square(2, 2)),
//!     ValidationProfile::conv_pool(),
//!     &ifm,
//!     &weights,
//!     &ofm,
//! )?;
//!
//! let mut window = RecordingWindow::new();
//! let cmd = acc.load_command(&mut window)?;
//! assert_eq!(cmd.len(), 128);
//!
//! acc.load_ifm(&vec![1u16; 32 * 32 * 16], &mut ifm)?;
//! acc.load_weights(&vec![1u16; 16 * 16 * 9], &mut weights)?;
//! // … start the IP, wait, read the cycle counter …
//! let pct = acc.efficiency(40_000)?;
//! assert!(pct > 0.0);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

mod accelerator;
mod backend;
pub mod backends;
mod command;
mod config;
mod efficiency;
mod error;
mod geometry;
pub mod mmio;
pub mod relayout;
mod validate;

/// Silicon constants (re-exported from darius-chip).
pub mod chip {
    pub use darius_chip::command::CommandLayout;
    pub use darius_chip::grid::{GridTopology, COLS, ROWS};
    pub use darius_chip::limits;
}

pub use accelerator::Accelerator;
pub use backend::{DmaBuffer, RegisterWindow};
pub use command::CommandDescriptor;
pub use config::{BufferAddresses, ConvConfig, PoolConfig, ValidationProfile};
pub use darius_chip::command::CommandLayout;
pub use efficiency::{efficiency, mac_count};
pub use error::{DariusError, Limit, Result};
pub use geometry::{DerivedGeometry, PoolGeometry};
pub use mmio::{MappedRegion, MmioConfig};
pub use validate::validate;

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        Accelerator, BufferAddresses, CommandDescriptor, ConvConfig, DariusError, DerivedGeometry,
        DmaBuffer, Limit, PoolConfig, RegisterWindow, Result, ValidationProfile,
    };
}
