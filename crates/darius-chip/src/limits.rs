//! Structural limits of the IP core.
//!
//! Each limit traces back to a synthesis parameter or a fixed resource:
//!
//! ```text
//! C_MAX_ADDR_WIDTH          = 12   line-buffer address width (plane ≤ 4096)
//! C_MAX_ITER_WIDTH          = 6    slice iteration counter width (≤ 64 slices)
//! C_MAX_IMG_DIMENSION_WIDTH = 10   image dimension register width
//! C_MAX_INPUT_WIDTH         = 16   element width in bits
//! datamover BTT             = 23   bytes-to-transfer field width
//! accumulation loopback     = 10   cycles of pipeline fill/drain
//! ```

use std::ops::RangeInclusive;

/// Line-buffer address width in bits. // C_MAX_ADDR_WIDTH
pub const MAX_ADDR_WIDTH: u32 = 12;

/// Slice iteration counter width in bits. // C_MAX_ITER_WIDTH
pub const MAX_ITER_WIDTH: u32 = 6;

/// Image dimension register width in bits. // C_MAX_IMG_DIMENSION_WIDTH
pub const MAX_IMG_DIMENSION_WIDTH: u32 = 10;

/// Width of one feature-map / weight element in bits. // C_MAX_INPUT_WIDTH
pub const INPUT_WIDTH_BITS: u32 = 16;

/// Bytes per element on the wire.
pub const ELEMENT_BYTES: u64 = (INPUT_WIDTH_BITS / 8) as u64;

/// Largest spatial plane (height × width) a line buffer holds.
pub const MAX_PLANE_ELEMENTS: u64 = 1 << MAX_ADDR_WIDTH;

/// Largest single transfer the AXI datamover accepts, in bytes.
pub const MAX_BYTES_TO_TRANSFER: u64 = 1 << 23;

/// Minimum ofm plane size; the accumulation loopback has a 10 cycle delay.
pub const MIN_OFM_PLANE: u64 = 10;

/// Supported ifm height and width.
pub const IFM_DIM: RangeInclusive<u32> = 6..=32;

/// Supported kernel height and width.
pub const KERNEL_DIM: RangeInclusive<u32> = 1..=16;

/// Supported padding.
pub const PAD: RangeInclusive<u32> = 0..=16;

/// Supported convolution strides.
pub const STRIDES: [u32; 3] = [1, 2, 4];

/// Smallest ifm depth / channel count.
pub const MIN_DEPTH: u32 = 8;

/// Depth and channel counts must be a multiple of this.
pub const DEPTH_MULTIPLE: u32 = 8;

/// Largest depth on the conv+pool bitstream.
pub const MAX_DEPTH_CONV_POOL: u32 = 512;

/// Largest depth on the conv-only bitstream.
pub const MAX_DEPTH_CONV_ONLY: u32 = 1024;

/// Max-pool unit limits.
///
/// A requested pool whose output falls outside these bounds is not an error:
/// the unit is bypassed and the command carries plain convolution geometry.
pub mod pool {
    /// Pool output height and width must exceed this.
    pub const MIN_OUTPUT_EXCLUSIVE: i64 = 5;
    /// `pool_output_width × pool_kernel_width` must stay below this.
    pub const MAX_ROW_SPAN_EXCLUSIVE: i64 = 1 << 9;
    /// Pool output width must stay below this.
    pub const MAX_OUTPUT_WIDTH_EXCLUSIVE: i64 = 1 << 8;
}
