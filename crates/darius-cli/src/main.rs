//! `darius`: command-line front end for the Darius accelerator driver.
//!
//! ```text
//! USAGE:
//!   darius check [shape]                 Validate a layer against the hardware limits
//!   darius geometry [shape]              Print the derived geometry
//!   darius encode [shape]                Hex dump of the encoded command
//!   darius efficiency --cycles N [shape] MAC utilisation for a measured cycle count
//! ```
//!
//! Every subcommand takes the same shape flags, e.g.
//! `darius encode --ifm-height 32 --ifm-width 32 --ifm-depth 16 --kernel-height 3
//! --kernel-width 3 --pad 1 --stride 1 --channels 16 --pool-kernel 2 --pool-stride 2`.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use darius_driver::{
    mac_count, Accelerator, BufferAddresses, ConvConfig, DariusError, PoolConfig, ValidationProfile,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "darius", about = "Darius convolution accelerator CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Validate a layer and report the first violated limit.
    Check(Shape),
    /// Print the geometry derived for a layer.
    Geometry(Shape),
    /// Print the encoded command descriptor as a hex dump.
    Encode {
        #[command(flatten)]
        shape: Shape,
        /// DMA address of the input feature map.
        #[arg(long, value_parser = parse_addr, default_value = "0")]
        ifm_addr: u32,
        /// DMA address of the weights.
        #[arg(long, value_parser = parse_addr, default_value = "0")]
        weights_addr: u32,
        /// DMA address of the output feature map.
        #[arg(long, value_parser = parse_addr, default_value = "0")]
        ofm_addr: u32,
    },
    /// Compute MAC utilisation from a measured cycle count.
    Efficiency {
        #[command(flatten)]
        shape: Shape,
        /// Hardware cycles the invocation took.
        #[arg(long)]
        cycles: u64,
    },
}

/// Layer shape shared by every subcommand.
#[derive(Args)]
struct Shape {
    /// Input feature map height.
    #[arg(long)]
    ifm_height: u32,
    /// Input feature map width.
    #[arg(long)]
    ifm_width: u32,
    /// Input feature map depth.
    #[arg(long)]
    ifm_depth: u32,
    /// Kernel height.
    #[arg(long)]
    kernel_height: u32,
    /// Kernel width.
    #[arg(long)]
    kernel_width: u32,
    /// Zero padding on every edge.
    #[arg(long, default_value_t = 0)]
    pad: u32,
    /// Convolution stride (1, 2 or 4).
    #[arg(long, default_value_t = 1)]
    stride: u32,
    /// Output channels.
    #[arg(long)]
    channels: u32,
    /// Square max-pool kernel; pooling is off when omitted.
    #[arg(long, requires = "pool_stride")]
    pool_kernel: Option<u32>,
    /// Max-pool stride; 0 disables pooling.
    #[arg(long, requires = "pool_kernel")]
    pool_stride: Option<u32>,
    /// Use the conv-only command layout and limits.
    #[arg(long, conflicts_with_all = ["pool_kernel", "pool_stride"])]
    conv_only: bool,
}

impl Shape {
    fn conv(&self) -> ConvConfig {
        ConvConfig {
            ifm_height: self.ifm_height,
            ifm_width: self.ifm_width,
            ifm_depth: self.ifm_depth,
            kernel_height: self.kernel_height,
            kernel_width: self.kernel_width,
            pad: self.pad,
            stride: self.stride,
            channels: self.channels,
        }
    }

    fn pool(&self) -> Option<PoolConfig> {
        match (self.pool_kernel, self.pool_stride) {
            (Some(kernel), Some(stride)) => Some(PoolConfig::square(kernel, stride)),
            _ => None,
        }
    }

    const fn profile(&self) -> ValidationProfile {
        if self.conv_only {
            ValidationProfile::conv_only()
        } else {
            ValidationProfile::conv_pool()
        }
    }

    fn accelerator(&self, addrs: BufferAddresses) -> Accelerator {
        Accelerator::new(self.conv(), self.pool(), addrs, self.profile())
    }
}

fn parse_addr(s: &str) -> std::result::Result<u32, String> {
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };
    u32::from_str_radix(digits, radix).map_err(|e| format!("invalid address {s}: {e}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Check(shape) => cmd_check(&shape)?,
        Cmd::Geometry(shape) => cmd_geometry(&shape),
        Cmd::Encode {
            shape,
            ifm_addr,
            weights_addr,
            ofm_addr,
        } => cmd_encode(
            &shape,
            BufferAddresses {
                ifm: ifm_addr,
                weights: weights_addr,
                ofm: ofm_addr,
            },
        )?,
        Cmd::Efficiency { shape, cycles } => cmd_efficiency(&shape, cycles)?,
    }

    Ok(())
}

fn cmd_check(shape: &Shape) -> Result<()> {
    let acc = shape.accelerator(BufferAddresses::default());
    match acc.validate() {
        Ok(()) => {
            println!("OK: supported by the {} layout", acc.profile().layout);
            Ok(())
        }
        Err(err @ DariusError::Configuration { .. }) => {
            println!("Unsupported: {err}");
            std::process::exit(1);
        }
        Err(err) => Err(err.into()),
    }
}

fn cmd_geometry(shape: &Shape) {
    let acc = shape.accelerator(BufferAddresses::default());
    let g = acc.geometry();

    println!("OFM            : {}×{}×{}", g.ofm_height, g.ofm_width, g.ofm_depth);
    println!("Slices         : ifm={} ofm={}", g.ifm_slices, g.ofm_slices);
    println!("Fragments      : ofm={} ifm_mem={}", g.ofm_fragments, g.ifm_mem_fragments);
    println!(
        "IFM packet     : len={} depth_offset={} height_offset={}",
        g.ifm_packet_length, g.ifm_depth_offset, g.ifm_height_offset
    );
    println!("OFM packet     : len={} offset={}", g.ofm_packet_length, g.ofm_offset);
    println!(
        "Weight packet  : len={} depth_offset={} offset={} pkt_offset={}",
        g.weights_packet_length, g.weight_depth_offset, g.weight_offset, g.weight_pkt_offset
    );
    if g.is_pooling() {
        let p = &g.pool;
        println!(
            "Max-pool       : {}×{} → {}×{} (kernel {}×{}, stride {})",
            p.input_height,
            p.input_width,
            p.output_height,
            p.output_width,
            p.kernel_height,
            p.kernel_width,
            p.stride
        );
    } else {
        println!("Max-pool       : off");
    }
    println!("MACs           : {}", mac_count(acc.config(), g));

    if let Err(err) = acc.validate() {
        println!("Warning        : {err}");
    }
}

fn cmd_encode(shape: &Shape, addrs: BufferAddresses) -> Result<()> {
    let acc = shape.accelerator(addrs);
    let cmd = acc.command()?;
    debug!("Encoded {} byte {} command", cmd.len(), cmd.layout());
    println!("{cmd}");
    Ok(())
}

fn cmd_efficiency(shape: &Shape, cycles: u64) -> Result<()> {
    let acc = shape.accelerator(BufferAddresses::default());
    let pct = acc.efficiency(cycles)?;
    println!(
        "{} MACs in {cycles} cycles: {pct:.2}% of peak",
        mac_count(acc.config(), acc.geometry())
    );
    Ok(())
}
