//! One accelerator invocation
//!
//! [`Accelerator`] ties the pieces together for a single run:
//!
//! ```text
//! new()            derive geometry (once)
//! command()        validate → encode
//! load_command()   write descriptor to the command window
//! load_ifm()       relayout ifm into its DMA buffer
//! load_weights()   relayout weights into their DMA buffer
//!   … caller starts the IP and waits for completion …
//! read_ofm()       view the produced output
//! efficiency()     grid utilisation from the measured cycle count
//! ```
//!
//! Starting the IP and waiting for it are left to the caller, as is
//! serialising access to the single hardware instance.

use darius_chip::command::{CommandLayout, WINDOW_OFFSET};
use tracing::{debug, info, warn};

use crate::backend::{DmaBuffer, RegisterWindow};
use crate::command::CommandDescriptor;
use crate::config::{BufferAddresses, ConvConfig, PoolConfig, ValidationProfile};
use crate::error::{DariusError, Result};
use crate::geometry::DerivedGeometry;
use crate::{efficiency, relayout, validate};

/// A configured convolution (with optional max-pool) run
#[derive(Debug, Clone)]
pub struct Accelerator {
    conv: ConvConfig,
    pool: Option<PoolConfig>,
    addrs: BufferAddresses,
    profile: ValidationProfile,
    geometry: DerivedGeometry,
}

impl Accelerator {
    /// Configure a run with explicit buffer addresses
    ///
    /// A pool configuration is dropped when `profile` uses the conv-only
    /// layout.
    pub fn new(
        conv: ConvConfig,
        pool: Option<PoolConfig>,
        addrs: BufferAddresses,
        profile: ValidationProfile,
    ) -> Self {
        // The conv-only IP has no pool unit
        let pool = match (profile.layout, pool) {
            (CommandLayout::ConvOnly, Some(_)) => {
                warn!("Pool configuration ignored for the conv-only layout");
                None
            }
            (_, pool) => pool,
        };
        let geometry = DerivedGeometry::derive(&conv, pool.as_ref());
        debug!("Accelerator configured for {} layout", profile.layout);
        Self {
            conv,
            pool,
            addrs,
            profile,
            geometry,
        }
    }

    /// Configure a run whose buffer addresses come from its DMA buffers
    ///
    /// # Errors
    ///
    /// Returns [`DariusError::AddressOutOfRange`] if a buffer lies above
    /// 4 GiB, where the 32-bit address fields cannot reach it.
    pub fn with_buffers<I, W, O>(
        conv: ConvConfig,
        pool: Option<PoolConfig>,
        profile: ValidationProfile,
        ifm: &I,
        weights: &W,
        ofm: &O,
    ) -> Result<Self>
    where
        I: DmaBuffer,
        W: DmaBuffer,
        O: DmaBuffer,
    {
        let addrs = BufferAddresses {
            ifm: address32("ifm", ifm.physical_address())?,
            weights: address32("weights", weights.physical_address())?,
            ofm: address32("ofm", ofm.physical_address())?,
        };
        Ok(Self::new(conv, pool, addrs, profile))
    }

    /// Convolution shape
    pub const fn config(&self) -> &ConvConfig {
        &self.conv
    }

    /// Requested pool shape
    pub const fn pool(&self) -> Option<&PoolConfig> {
        self.pool.as_ref()
    }

    /// Buffer addresses written into the command
    pub const fn addresses(&self) -> &BufferAddresses {
        &self.addrs
    }

    /// Validation profile
    pub const fn profile(&self) -> &ValidationProfile {
        &self.profile
    }

    /// Derived geometry
    pub const fn geometry(&self) -> &DerivedGeometry {
        &self.geometry
    }

    /// Check the configuration against the bitstream's limits
    ///
    /// # Errors
    ///
    /// Returns [`DariusError::Configuration`] naming the violated limit.
    pub fn validate(&self) -> Result<()> {
        validate::validate(&self.conv, &self.geometry, &self.profile)
    }

    /// Validate and encode the command descriptor
    ///
    /// # Errors
    ///
    /// Returns [`DariusError::Configuration`] if validation fails.
    pub fn command(&self) -> Result<CommandDescriptor> {
        self.validate()?;
        let cmd = CommandDescriptor::encode(&self.conv, &self.geometry, &self.addrs, self.profile.layout)?;
        info!(
            "Built {} command ({} bytes, pooling {})",
            cmd.layout(),
            cmd.len(),
            if self.geometry.is_pooling() { "on" } else { "off" }
        );
        Ok(cmd)
    }

    /// Validate, encode and write the command to the command window
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the window rejects the write.
    pub fn load_command<R: RegisterWindow>(&self, window: &mut R) -> Result<CommandDescriptor> {
        let cmd = self.command()?;
        window.write(WINDOW_OFFSET, cmd.as_bytes())?;
        info!("Loaded command at offset {:#x}", WINDOW_OFFSET);
        Ok(cmd)
    }

    /// Relayout a depth-major ifm into its DMA buffer
    ///
    /// # Errors
    ///
    /// Returns [`DariusError::LayoutPrecondition`] if `src` or the buffer is
    /// too small.
    pub fn load_ifm<B: DmaBuffer>(&self, src: &[B::Elem], buffer: &mut B) -> Result<()> {
        relayout::relayout_ifm(&self.geometry, src, buffer.as_mut_slice())?;
        info!(
            "Loaded {} ifm elements at {:#x}",
            relayout::ifm_elements(&self.geometry),
            buffer.physical_address()
        );
        Ok(())
    }

    /// Relayout natural-order weights into their DMA buffer
    ///
    /// # Errors
    ///
    /// Returns [`DariusError::LayoutPrecondition`] if `src` or the buffer is
    /// too small.
    pub fn load_weights<B: DmaBuffer>(&self, src: &[B::Elem], buffer: &mut B) -> Result<()> {
        relayout::relayout_weights(&self.geometry, src, buffer.as_mut_slice())?;
        info!(
            "Loaded {} weights at {:#x}",
            relayout::weight_elements(&self.geometry),
            buffer.physical_address()
        );
        Ok(())
    }

    /// Output elements the accelerator produces in the ofm buffer
    pub fn ofm_elements(&self) -> usize {
        usize::try_from(self.geometry.ofm_elements()).unwrap_or(usize::MAX)
    }

    /// View of the produced output
    ///
    /// # Errors
    ///
    /// Returns [`DariusError::LayoutPrecondition`] if the buffer is smaller
    /// than the output volume.
    pub fn read_ofm<'a, B: DmaBuffer>(&self, buffer: &'a B) -> Result<&'a [B::Elem]> {
        let count = self.ofm_elements();
        buffer
            .as_slice()
            .get(..count)
            .ok_or_else(|| DariusError::layout_precondition("ofm", count, buffer.len()))
    }

    /// Grid utilisation in percent for a run that took `hw_cycles`
    ///
    /// # Errors
    ///
    /// Returns [`DariusError::ZeroCycles`] if `hw_cycles` is 0.
    pub fn efficiency(&self, hw_cycles: u64) -> Result<f64> {
        efficiency::efficiency(&self.conv, &self.geometry, hw_cycles)
    }
}

fn address32(buffer: &'static str, address: u64) -> Result<u32> {
    u32::try_from(address).map_err(|_| DariusError::AddressOutOfRange { buffer, address })
}
