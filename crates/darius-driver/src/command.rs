//! Command descriptor encoding
//!
//! Packs validated geometry into the positional, little-endian record the
//! control logic parses (see [`darius_chip::command`] for the layout).
//! Encoding is deterministic and has no side effects. The descriptor is
//! written to the command window once and then dropped.

use bytes::{BufMut, Bytes, BytesMut};
use darius_chip::command::{CommandLayout, MODE_FIELDS, RESERVED_WORDS};
use tracing::debug;

use crate::config::{BufferAddresses, ConvConfig};
use crate::error::{DariusError, Result};
use crate::geometry::DerivedGeometry;

/// Encoded command descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    bytes: Bytes,
    layout: CommandLayout,
}

impl CommandDescriptor {
    /// Encode a validated configuration
    ///
    /// # Errors
    ///
    /// Returns [`DariusError::Encoding`] if a value does not fit its wire
    /// field. This cannot happen for a configuration that passed
    /// [`validate`](crate::validate()), so it indicates an internal fault.
    pub fn encode(
        conv: &ConvConfig,
        geom: &DerivedGeometry,
        addrs: &BufferAddresses,
        layout: CommandLayout,
    ) -> Result<Self> {
        let mut buf = BytesMut::with_capacity(layout.len());

        let shorts: [(&'static str, u64); 12] = [
            ("ifm_height", conv.ifm_height.into()),
            ("ifm_width", conv.ifm_width.into()),
            ("kernel_height", conv.kernel_height.into()),
            ("kernel_width", conv.kernel_width.into()),
            ("stride", conv.stride.into()),
            ("pad", conv.pad.into()),
            ("ofm_height", geom.ofm_height),
            ("ofm_width", geom.ofm_width),
            ("ifm_slices", geom.ifm_slices),
            ("ofm_slices", geom.ofm_slices),
            ("ofm_fragments", geom.ofm_fragments),
            ("ifm_mem_fragments", geom.ifm_mem_fragments),
        ];
        for (field, value) in shorts {
            buf.put_u16_le(narrow_u16(field, value)?);
        }

        let ints: [(&'static str, u64); 9] = [
            ("ifm_baseaddr", addrs.ifm.into()),
            ("ifm_packet_length", geom.ifm_packet_length),
            ("ifm_depth_offset", geom.ifm_depth_offset),
            ("ifm_height_offset", geom.ifm_height_offset),
            ("ofm_baseaddr", addrs.ofm.into()),
            ("ofm_packet_length", geom.ofm_packet_length),
            ("weights_baseaddr", addrs.weights.into()),
            ("weights_packet_length", geom.weights_packet_length),
            ("weight_depth_offset", geom.weight_depth_offset),
        ];
        for (field, value) in ints {
            buf.put_u32_le(narrow_u32(field, value)?);
        }
        // trailing reserved address words
        for _ in ints.len()..layout.address_fields() {
            buf.put_u32_le(0);
        }

        match layout {
            CommandLayout::ConvOnly => {}
            CommandLayout::ConvPool => {
                for _ in 0..MODE_FIELDS {
                    buf.put_u16_le(0);
                }
                let pool = &geom.pool;
                let pool_fields: [(&'static str, u64); 8] = [
                    ("pool_input_height", pool.input_height),
                    ("pool_input_width", pool.input_width),
                    ("pool_kernel_height", pool.kernel_height),
                    ("pool_kernel_width", pool.kernel_width),
                    ("pool_output_height", pool.output_height),
                    ("pool_output_width", pool.output_width),
                    ("pool_stride", pool.stride),
                    ("pool_reserved", 0),
                ];
                for (field, value) in pool_fields {
                    buf.put_u16_le(narrow_u16(field, value)?);
                }
                buf.put_bytes(0, RESERVED_WORDS * 4);
            }
        }

        debug_assert_eq!(buf.len(), layout.len());
        debug!("Encoded {} byte {} command", buf.len(), layout);

        Ok(Self {
            bytes: buf.freeze(),
            layout,
        })
    }

    /// Raw descriptor bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Descriptor length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if the descriptor is empty (never, for an encoded command)
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Layout the descriptor was encoded with
    pub const fn layout(&self) -> CommandLayout {
        self.layout
    }

    /// Descriptor as little-endian 32-bit register words
    pub fn to_words(&self) -> Vec<u32> {
        self.bytes
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect()
    }
}

impl std::fmt::Display for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, word) in self.to_words().iter().enumerate() {
            if i > 0 {
                if i % 4 == 0 {
                    writeln!(f)?;
                } else {
                    write!(f, " ")?;
                }
            }
            write!(f, "{word:08x}")?;
        }
        Ok(())
    }
}

fn narrow_u16(field: &'static str, value: u64) -> Result<u16> {
    u16::try_from(value).map_err(|_| DariusError::encoding(field, value))
}

fn narrow_u32(field: &'static str, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| DariusError::encoding(field, value))
}
