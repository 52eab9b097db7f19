//! Derived tiling geometry
//!
//! Everything the command descriptor and the relayouts need is a pure
//! function of the convolution and pool shapes. It is computed once per
//! invocation and never mutated.
//!
//! Derivation is total: nonsensical shapes produce nonsensical (but finite)
//! geometry, and the validator rejects them afterwards. A zero stride or a
//! kernel larger than the padded input derives an empty ofm plane.

use darius_chip::grid::{GridTopology, COLS, ROWS};
use darius_chip::limits::pool as pool_limits;
use tracing::{debug, warn};

use crate::config::{ConvConfig, PoolConfig};

/// Max-pool block of the command descriptor
///
/// All zero when the pool unit is bypassed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolGeometry {
    /// Pool input height (the ofm height)
    pub input_height: u64,
    /// Pool input width (the ofm width)
    pub input_width: u64,
    /// Pool window height
    pub kernel_height: u64,
    /// Pool window width
    pub kernel_width: u64,
    /// Pool output height
    pub output_height: u64,
    /// Pool output width
    pub output_width: u64,
    /// Pool stride
    pub stride: u64,
}

impl PoolGeometry {
    /// Whether the pool unit is active
    pub const fn is_enabled(&self) -> bool {
        self.stride != 0
    }
}

/// Geometry derived from a [`ConvConfig`] and optional [`PoolConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedGeometry {
    /// Output feature map height
    pub ofm_height: u64,
    /// Output feature map width
    pub ofm_width: u64,
    /// Output feature map depth (channels)
    pub ofm_depth: u64,
    /// Input depth slices, `ceil(ifm_depth / ROWS)`
    pub ifm_slices: u64,
    /// Output depth slices, `ceil(ofm_depth / COLS)`
    pub ofm_slices: u64,
    /// Output fragments
    pub ofm_fragments: u64,
    /// Input memory fragments
    pub ifm_mem_fragments: u64,
    /// Elements streamed per IFM packet
    pub ifm_packet_length: u64,
    /// Distance between IFM depth blocks
    pub ifm_depth_offset: u64,
    /// Distance between IFM row blocks
    pub ifm_height_offset: u64,
    /// Elements written per OFM packet
    pub ofm_packet_length: u64,
    /// Elements in the full (unpooled) ofm volume
    pub ofm_offset: u64,
    /// Elements streamed per weight packet
    pub weights_packet_length: u64,
    /// Distance between weight column groups
    pub weight_depth_offset: u64,
    /// Weights per output channel, `kh × kw × ifm_depth`
    pub weight_offset: u64,
    /// Weights per row slice, `ROWS × kh × kw`
    pub weight_pkt_offset: u64,
    /// Spatial plane of the input, `ifm_height × ifm_width`
    pub ifm_plane: u64,
    /// Kernel window, `kernel_height × kernel_width`
    pub kernel_area: u64,
    /// Max-pool block
    pub pool: PoolGeometry,
}

impl DerivedGeometry {
    /// Derive geometry for one invocation
    pub fn derive(conv: &ConvConfig, pool: Option<&PoolConfig>) -> Self {
        let ifm_height = u64::from(conv.ifm_height);
        let ifm_width = u64::from(conv.ifm_width);
        let ifm_depth = u64::from(conv.ifm_depth);
        let ofm_depth = u64::from(conv.channels);

        let ofm_height = conv_output_dim(conv.ifm_height, conv.kernel_height, conv.pad, conv.stride);
        let ofm_width = conv_output_dim(conv.ifm_width, conv.kernel_width, conv.pad, conv.stride);

        let ifm_slices = GridTopology::DARIUS.row_slices(ifm_depth);
        let ofm_slices = GridTopology::DARIUS.col_slices(ofm_depth);

        let ifm_plane = ifm_height.saturating_mul(ifm_width);
        let kernel_area = u64::from(conv.kernel_height).saturating_mul(u64::from(conv.kernel_width));
        let weight_offset = kernel_area.saturating_mul(ifm_depth);

        let pool = derive_pool(ofm_height, ofm_width, pool);
        let ofm_packet_length = if pool.is_enabled() {
            pool.output_height
                .saturating_mul(pool.output_width)
                .saturating_mul(ofm_slices)
        } else {
            ofm_height.saturating_mul(ofm_width).saturating_mul(ofm_slices)
        };

        let geometry = Self {
            ofm_height,
            ofm_width,
            ofm_depth,
            ifm_slices,
            ofm_slices,
            ofm_fragments: 1,
            ifm_mem_fragments: 1,
            ifm_packet_length: ifm_plane.saturating_mul(ifm_slices),
            ifm_depth_offset: ifm_plane.saturating_mul(ifm_depth),
            ifm_height_offset: 0,
            ofm_packet_length,
            ofm_offset: ofm_height.saturating_mul(ofm_width).saturating_mul(ofm_depth),
            weights_packet_length: weight_offset,
            weight_depth_offset: weight_offset.saturating_mul(COLS as u64),
            weight_offset,
            weight_pkt_offset: kernel_area.saturating_mul(ROWS as u64),
            ifm_plane,
            kernel_area,
            pool,
        };

        debug!(
            "Geometry: ofm {}x{}x{}, slices {}/{}, pool {}",
            geometry.ofm_height,
            geometry.ofm_width,
            geometry.ofm_depth,
            geometry.ifm_slices,
            geometry.ofm_slices,
            if geometry.is_pooling() { "on" } else { "off" }
        );

        geometry
    }

    /// Whether the pool unit stays active for this invocation
    pub const fn is_pooling(&self) -> bool {
        self.pool.is_enabled()
    }

    /// Spatial plane of the convolution output
    pub const fn ofm_plane(&self) -> u64 {
        self.ofm_height.saturating_mul(self.ofm_width)
    }

    /// Elements the accelerator writes to the ofm buffer
    pub const fn ofm_elements(&self) -> u64 {
        if self.is_pooling() {
            self.pool
                .output_height
                .saturating_mul(self.pool.output_width)
                .saturating_mul(self.ofm_depth)
        } else {
            self.ofm_offset
        }
    }
}

/// `ceil((input + 2·pad − kernel) / stride + 1)`, clamped at 0
fn conv_output_dim(input: u32, kernel: u32, pad: u32, stride: u32) -> u64 {
    if stride == 0 {
        return 0;
    }
    let span = i64::from(input) + 2 * i64::from(pad) - i64::from(kernel);
    let out = ceil_div(span, i64::from(stride)) + 1;
    u64::try_from(out).unwrap_or(0)
}

/// Ceiling division for a positive divisor
const fn ceil_div(numer: i64, denom: i64) -> i64 {
    let quot = numer.div_euclid(denom);
    if numer.rem_euclid(denom) == 0 {
        quot
    } else {
        quot + 1
    }
}

/// Pool block, or all zeros when the pool unit is bypassed
///
/// A pool that is requested but whose output would be too small for the
/// pool unit (≤ 5 in either dimension) or too wide for its row buffer is
/// silently bypassed: the invocation proceeds as a plain convolution.
fn derive_pool(ofm_height: u64, ofm_width: u64, pool: Option<&PoolConfig>) -> PoolGeometry {
    let Some(pool) = pool else {
        return PoolGeometry::default();
    };
    if pool.stride == 0 {
        debug!("Pool stride of 0 disables max-pooling; only convolution will run");
        return PoolGeometry::default();
    }

    let stride = i64::from(pool.stride);
    let kernel_height = i64::from(pool.kernel_height);
    let kernel_width = i64::from(pool.kernel_width);
    let input_height = i64::try_from(ofm_height).unwrap_or(i64::MAX);
    let input_width = i64::try_from(ofm_width).unwrap_or(i64::MAX);

    let output_height = ceil_div(input_height - kernel_height, stride) + 1;
    let output_width = ceil_div(input_width - kernel_width, stride) + 1;

    let fits = output_height > pool_limits::MIN_OUTPUT_EXCLUSIVE
        && output_width > pool_limits::MIN_OUTPUT_EXCLUSIVE
        && output_width.saturating_mul(kernel_width) < pool_limits::MAX_ROW_SPAN_EXCLUSIVE
        && output_width < pool_limits::MAX_OUTPUT_WIDTH_EXCLUSIVE;

    if !fits {
        warn!(
            "Pool output {}x{} is outside the pool unit range; max-pool bypassed",
            output_height, output_width
        );
        return PoolGeometry::default();
    }

    // `fits` guarantees both outputs are positive
    #[allow(clippy::cast_sign_loss)]
    let (output_height, output_width) = (output_height as u64, output_width as u64);

    PoolGeometry {
        input_height: ofm_height,
        input_width: ofm_width,
        kernel_height: u64::from(pool.kernel_height),
        kernel_width: u64::from(pool.kernel_width),
        output_height,
        output_width,
        stride: u64::from(pool.stride),
    }
}
