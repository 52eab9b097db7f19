//! Error types for Darius driver operations

use std::fmt;
use thiserror::Error;

use darius_chip::limits::MIN_DEPTH;

/// Result type alias for Darius operations
pub type Result<T> = std::result::Result<T, DariusError>;

/// Structural limit of the accelerator that a configuration can violate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    /// IFM height outside 6..=32
    IfmHeight,
    /// IFM width outside 6..=32
    IfmWidth,
    /// IFM depth outside `MIN_DEPTH..=max` for the active profile
    IfmDepthRange {
        /// Deepest IFM the profile accepts
        max: u32,
    },
    /// IFM depth not a multiple of 8
    IfmDepthMultiple,
    /// Kernel height outside 1..=16
    KernelHeight,
    /// Kernel width outside 1..=16
    KernelWidth,
    /// Stride not one of 1, 2, 4
    Stride,
    /// Padding outside 0..=16
    Pad,
    /// Output channel count outside `MIN_DEPTH..=max` for the active profile
    ChannelsRange {
        /// Most channels the profile accepts
        max: u32,
    },
    /// Output channel count not a multiple of 8
    ChannelsMultiple,
    /// OFM plane smaller than the accumulation loopback latency
    OfmPlaneTooSmall,
    /// IFM plane larger than the line buffer
    IfmPlaneTooLarge,
    /// OFM plane larger than the line buffer
    OfmPlaneTooLarge,
    /// IFM slice count wider than the iteration counter
    IfmSliceIterations,
    /// OFM slice count wider than the iteration counter
    OfmSliceIterations,
    /// OFM volume larger than one datamover transfer
    BytesToTransfer,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::IfmDepthRange { max } => {
                return write!(f, "IFM depth must be in range {MIN_DEPTH} to {max}");
            }
            Self::ChannelsRange { max } => {
                return write!(f, "number of channels must be in range {MIN_DEPTH} to {max}");
            }
            Self::IfmHeight => "IFM height must be in range 6 to 32",
            Self::IfmWidth => "IFM width must be in range 6 to 32",
            Self::IfmDepthMultiple => "IFM depth must be a multiple of 8",
            Self::KernelHeight => "kernel height must be in range 1 to 16",
            Self::KernelWidth => "kernel width must be in range 1 to 16",
            Self::Stride => "stride must be 1, 2 or 4",
            Self::Pad => "pad must be in range 0 to 16",
            Self::ChannelsMultiple => "number of channels must be a multiple of 8",
            Self::OfmPlaneTooSmall => "OFM plane is smaller than the accumulation loopback delay",
            Self::IfmPlaneTooLarge => "IFM plane does not fit in the line buffer",
            Self::OfmPlaneTooLarge => "OFM plane does not fit in the line buffer",
            Self::IfmSliceIterations => "IFM slices exceed the iteration counter width",
            Self::OfmSliceIterations => "OFM slices exceed the iteration counter width",
            Self::BytesToTransfer => "OFM volume exceeds the datamover bytes-to-transfer limit",
        };
        f.write_str(text)
    }
}

/// Errors that can occur during Darius operations
#[derive(Debug, Error)]
pub enum DariusError {
    /// Configuration violates a structural limit of the accelerator
    #[error("Unsupported configuration: {limit} (got {value})")]
    Configuration {
        /// Violated limit
        limit: Limit,
        /// Offending value
        value: u64,
    },

    /// A validated value did not fit its command field
    #[error("Command field {field} cannot hold {value}")]
    Encoding {
        /// Field name
        field: &'static str,
        /// Value that overflowed the field
        value: u64,
    },

    /// Buffer handed to a relayout is too small
    #[error("{buffer} buffer holds {actual} elements, {required} required")]
    LayoutPrecondition {
        /// Which buffer (source or target)
        buffer: &'static str,
        /// Minimum element count
        required: usize,
        /// Element count supplied
        actual: usize,
    },

    /// Efficiency requested for a run that reported zero cycles
    #[error("Hardware cycle count is zero")]
    ZeroCycles,

    /// DMA buffer address not reachable by the 32-bit address fields
    #[error("{buffer} buffer at {address:#x} is outside the 32-bit address space")]
    AddressOutOfRange {
        /// Which buffer
        buffer: &'static str,
        /// Physical address
        address: u64,
    },

    /// I/O error while opening device memory
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// Memory-mapped access failed
    #[error("MMIO error: {reason}")]
    Mmio {
        /// Reason for failure
        reason: String,
    },
}

impl DariusError {
    /// Create a configuration error
    pub fn configuration(limit: Limit, value: impl Into<u64>) -> Self {
        Self::Configuration {
            limit,
            value: value.into(),
        }
    }

    /// Create an encoding error
    pub fn encoding(field: &'static str, value: impl Into<u64>) -> Self {
        Self::Encoding {
            field,
            value: value.into(),
        }
    }

    /// Create a layout precondition error
    pub const fn layout_precondition(buffer: &'static str, required: usize, actual: usize) -> Self {
        Self::LayoutPrecondition {
            buffer,
            required,
            actual,
        }
    }

    /// Create an MMIO error
    pub fn mmio(reason: impl Into<String>) -> Self {
        Self::Mmio {
            reason: reason.into(),
        }
    }

    /// Violated limit, if this is a configuration error
    pub const fn limit(&self) -> Option<Limit> {
        match self {
            Self::Configuration { limit, .. } => Some(*limit),
            _ => None,
        }
    }
}
