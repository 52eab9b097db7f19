//! Collaborator implementations
//!
//! - [`host`]: host-memory register window and buffers for dry runs and tests
//! - [`physical`]: DMA buffers over a reserved physical range

pub mod host;
pub mod physical;

pub use host::{HostBuffer, RecordingWindow};
pub use physical::PhysicalBuffer;
