//! Per-invocation configuration
//!
//! Everything the caller supplies for one accelerator run: the convolution
//! shape, the optional max-pool shape, the physical addresses of the three
//! DMA buffers, and the validation profile of the loaded bitstream.

use darius_chip::command::CommandLayout;
use darius_chip::limits::{MAX_DEPTH_CONV_ONLY, MAX_DEPTH_CONV_POOL};

/// Convolution shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvConfig {
    /// Input feature map height
    pub ifm_height: u32,
    /// Input feature map width
    pub ifm_width: u32,
    /// Input feature map depth
    pub ifm_depth: u32,
    /// Kernel height
    pub kernel_height: u32,
    /// Kernel width
    pub kernel_width: u32,
    /// Zero padding on each border
    pub pad: u32,
    /// Convolution stride
    pub stride: u32,
    /// Output channels (ofm depth)
    pub channels: u32,
}

impl ConvConfig {
    /// Square input and kernel, the common case
    pub const fn square(ifm_size: u32, ifm_depth: u32, kernel: u32, pad: u32, stride: u32, channels: u32) -> Self {
        Self {
            ifm_height: ifm_size,
            ifm_width: ifm_size,
            ifm_depth,
            kernel_height: kernel,
            kernel_width: kernel,
            pad,
            stride,
            channels,
        }
    }
}

/// Max-pool shape
///
/// A `stride` of 0 disables pooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolConfig {
    /// Pool window height
    pub kernel_height: u32,
    /// Pool window width
    pub kernel_width: u32,
    /// Pool stride (0 = pooling disabled)
    pub stride: u32,
}

impl PoolConfig {
    /// Square pool window
    pub const fn square(kernel: u32, stride: u32) -> Self {
        Self {
            kernel_height: kernel,
            kernel_width: kernel,
            stride,
        }
    }

    /// Pool configuration that leaves the pool unit bypassed
    pub const fn disabled() -> Self {
        Self {
            kernel_height: 0,
            kernel_width: 0,
            stride: 0,
        }
    }
}

/// Physical addresses of the DMA buffers, as seen by the accelerator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferAddresses {
    /// Input feature map buffer
    pub ifm: u32,
    /// Weight buffer
    pub weights: u32,
    /// Output feature map buffer
    pub ofm: u32,
}

/// Validation rules of one bitstream
///
/// The conv+pool and conv-only overlays share every check but differ in
/// depth range, iteration counter handling and command layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationProfile {
    /// Largest ifm depth and channel count
    pub max_depth: u32,
    /// Enforce the slice iteration counter width
    pub check_iteration_width: bool,
    /// Let a zero stride through the stride check
    pub legacy_zero_stride: bool,
    /// Command layout the bitstream parses
    pub layout: CommandLayout,
}

impl ValidationProfile {
    /// Convolution with max-pool overlay
    pub const fn conv_pool() -> Self {
        Self {
            max_depth: MAX_DEPTH_CONV_POOL,
            check_iteration_width: false,
            legacy_zero_stride: false,
            layout: CommandLayout::ConvPool,
        }
    }

    /// Convolution-only overlay
    pub const fn conv_only() -> Self {
        Self {
            max_depth: MAX_DEPTH_CONV_ONLY,
            check_iteration_width: true,
            legacy_zero_stride: false,
            layout: CommandLayout::ConvOnly,
        }
    }

    /// Tolerate stride 0 in the stride check
    ///
    /// A zero stride still derives an empty ofm plane, so the configuration
    /// is rejected by the ofm plane check instead.
    #[must_use]
    pub const fn with_legacy_zero_stride(mut self, allow: bool) -> Self {
        self.legacy_zero_stride = allow;
        self
    }
}

impl Default for ValidationProfile {
    fn default() -> Self {
        Self::conv_pool()
    }
}
