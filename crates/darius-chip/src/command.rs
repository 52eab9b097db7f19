//! Command descriptor wire layout.
//!
//! The control logic reads the descriptor positionally from offset 0 of the
//! command window: fields are little-endian and tightly packed, with no
//! padding between groups. Field names exist only on this side of the bus.
//!
//! ## Convolution-only layout (64 bytes)
//!
//! | Offset | Width | Fields |
//! |--------|-------|--------|
//! | 0  | u16 × 12 | ifm_h, ifm_w, kh, kw, stride, pad, ofm_h, ofm_w, ifm_slices, ofm_slices, ofm_fragments, ifm_mem_fragments |
//! | 24 | u32 × 10 | ifm_baseaddr, ifm_packet_length, ifm_depth_offset, ifm_height_offset, ofm_baseaddr, ofm_packet_length, weights_baseaddr, weights_packet_length, weight_depth_offset, reserved |
//!
//! ## Convolution + max-pool layout (128 bytes)
//!
//! | Offset | Width | Fields |
//! |--------|-------|--------|
//! | 0  | u16 × 12 | as above |
//! | 24 | u32 × 9  | as above, without `reserved` |
//! | 60 | u16 × 2  | mode (zero) |
//! | 64 | u16 × 8  | pool_input_h, pool_input_w, pool_kernel_h, pool_kernel_w, pool_output_h, pool_output_w, pool_stride, 0 |
//! | 80 | u32 × 12 | reserved (zero) |

/// Number of 16-bit geometry fields.
pub const GEOMETRY_FIELDS: usize = 12;
/// Number of 32-bit address/offset fields in the conv-only layout.
pub const ADDRESS_FIELDS_CONV_ONLY: usize = 10;
/// Number of 32-bit address/offset fields in the conv+pool layout.
pub const ADDRESS_FIELDS_CONV_POOL: usize = 9;
/// Number of 16-bit mode fields.
pub const MODE_FIELDS: usize = 2;
/// Number of 16-bit pool fields.
pub const POOL_FIELDS: usize = 8;
/// Number of trailing 32-bit reserved words in the conv+pool layout.
pub const RESERVED_WORDS: usize = 12;

/// Byte offset of the geometry block.
pub const GEOMETRY_OFFSET: usize = 0;
/// Byte offset of the address block.
pub const ADDRESS_OFFSET: usize = GEOMETRY_OFFSET + GEOMETRY_FIELDS * 2;
/// Byte offset of the mode block (conv+pool only).
pub const MODE_OFFSET: usize = ADDRESS_OFFSET + ADDRESS_FIELDS_CONV_POOL * 4;
/// Byte offset of the pool block (conv+pool only).
pub const POOL_OFFSET: usize = MODE_OFFSET + MODE_FIELDS * 2;
/// Byte offset of the reserved block (conv+pool only).
pub const RESERVED_OFFSET: usize = POOL_OFFSET + POOL_FIELDS * 2;

/// Offset of the command descriptor inside the command window.
pub const WINDOW_OFFSET: u64 = 0;

/// Mapping span of the command window used by the reference overlay.
pub const WINDOW_SPAN: usize = 5_000_000;

/// Index of each 16-bit geometry field.
pub mod geometry {
    /// Input feature map height.
    pub const IFM_HEIGHT: usize = 0;
    /// Input feature map width.
    pub const IFM_WIDTH: usize = 1;
    /// Kernel height.
    pub const KERNEL_HEIGHT: usize = 2;
    /// Kernel width.
    pub const KERNEL_WIDTH: usize = 3;
    /// Convolution stride.
    pub const STRIDE: usize = 4;
    /// Padding.
    pub const PAD: usize = 5;
    /// Output feature map height.
    pub const OFM_HEIGHT: usize = 6;
    /// Output feature map width.
    pub const OFM_WIDTH: usize = 7;
    /// Input depth slices.
    pub const IFM_SLICES: usize = 8;
    /// Output depth slices.
    pub const OFM_SLICES: usize = 9;
    /// Output fragments.
    pub const OFM_FRAGMENTS: usize = 10;
    /// Input memory fragments.
    pub const IFM_MEM_FRAGMENTS: usize = 11;
}

/// Index of each 32-bit address/offset field.
pub mod address {
    /// IFM buffer physical address.
    pub const IFM_BASEADDR: usize = 0;
    /// IFM packet length.
    pub const IFM_PACKET_LENGTH: usize = 1;
    /// IFM depth offset.
    pub const IFM_DEPTH_OFFSET: usize = 2;
    /// IFM height offset.
    pub const IFM_HEIGHT_OFFSET: usize = 3;
    /// OFM buffer physical address.
    pub const OFM_BASEADDR: usize = 4;
    /// OFM packet length.
    pub const OFM_PACKET_LENGTH: usize = 5;
    /// Weight buffer physical address.
    pub const WEIGHTS_BASEADDR: usize = 6;
    /// Weight packet length.
    pub const WEIGHTS_PACKET_LENGTH: usize = 7;
    /// Weight depth offset.
    pub const WEIGHT_DEPTH_OFFSET: usize = 8;
    /// Reserved word (conv-only layout).
    pub const RESERVED: usize = 9;
}

/// Index of each 16-bit pool field.
pub mod pool {
    /// Pool input height.
    pub const INPUT_HEIGHT: usize = 0;
    /// Pool input width.
    pub const INPUT_WIDTH: usize = 1;
    /// Pool kernel height.
    pub const KERNEL_HEIGHT: usize = 2;
    /// Pool kernel width.
    pub const KERNEL_WIDTH: usize = 3;
    /// Pool output height.
    pub const OUTPUT_HEIGHT: usize = 4;
    /// Pool output width.
    pub const OUTPUT_WIDTH: usize = 5;
    /// Pool stride.
    pub const STRIDE: usize = 6;
}

/// Descriptor layout understood by a given bitstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandLayout {
    /// Convolution-only IP (`CNNDataflow`).
    ConvOnly,
    /// Convolution with max-pool IP.
    ConvPool,
}

impl CommandLayout {
    /// Total descriptor length in bytes.
    #[must_use]
    pub const fn len(self) -> usize {
        match self {
            Self::ConvOnly => ADDRESS_OFFSET + ADDRESS_FIELDS_CONV_ONLY * 4,
            Self::ConvPool => RESERVED_OFFSET + RESERVED_WORDS * 4,
        }
    }

    /// Number of 32-bit address/offset fields.
    #[must_use]
    pub const fn address_fields(self) -> usize {
        match self {
            Self::ConvOnly => ADDRESS_FIELDS_CONV_ONLY,
            Self::ConvPool => ADDRESS_FIELDS_CONV_POOL,
        }
    }

    /// Byte offset of geometry field `index`.
    #[must_use]
    pub const fn geometry_field(index: usize) -> usize {
        GEOMETRY_OFFSET + index * 2
    }

    /// Byte offset of address field `index`.
    #[must_use]
    pub const fn address_field(index: usize) -> usize {
        ADDRESS_OFFSET + index * 4
    }

    /// Byte offset of pool field `index` (conv+pool only).
    #[must_use]
    pub const fn pool_field(index: usize) -> usize {
        POOL_OFFSET + index * 2
    }
}

impl std::fmt::Display for CommandLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConvOnly => write!(f, "conv"),
            Self::ConvPool => write!(f, "conv+pool"),
        }
    }
}
