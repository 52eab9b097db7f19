//! End-to-end invocation tests against host-memory collaborators
//!
//! Covers the full path a caller takes: configure, validate, encode, write
//! the command, relayout ifm and weights, then compute efficiency.

use darius_driver::backends::{HostBuffer, RecordingWindow};
use darius_driver::relayout::{ifm_elements, restore_ifm, restore_weights, weight_elements, weight_source_len};
use darius_driver::{
    Accelerator, BufferAddresses, CommandLayout, ConvConfig, DariusError, DmaBuffer, Limit,
    PoolConfig, ValidationProfile,
};

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

fn layer() -> ConvConfig {
    ConvConfig {
        ifm_height: 14,
        ifm_width: 14,
        ifm_depth: 32,
        kernel_height: 3,
        kernel_width: 3,
        pad: 1,
        stride: 1,
        channels: 16,
    }
}

#[test]
fn conv_pool_invocation() {
    let conv = layer();
    let mut ifm = HostBuffer::<u16>::zeroed(14 * 14 * 32, 0x3000_0000);
    let mut weights = HostBuffer::<u16>::zeroed(16 * 32 * 9, 0x3100_0000);
    let ofm = HostBuffer::<u16>::zeroed(14 * 14 * 16, 0x3200_0000);

    let acc = Accelerator::with_buffers(
        conv,
        Some(PoolConfig::square(2, 2)),
        ValidationProfile::conv_pool(),
        &ifm,
        &weights,
        &ofm,
    )
    .expect("buffers below 4 GiB");

    let geom = acc.geometry();
    assert_eq!((geom.ofm_height, geom.ofm_width), (14, 14));
    // (14 - 2) / 2 + 1 = 7
    assert!(geom.is_pooling());
    assert_eq!((geom.pool.output_height, geom.pool.output_width), (7, 7));

    let mut window = RecordingWindow::with_limit(4096);
    let cmd = acc.load_command(&mut window).expect("valid layer");
    assert_eq!(window.writes(), 1);
    assert_eq!(window.bytes(), cmd.as_bytes());

    let b = window.bytes();
    assert_eq!(b.len(), 128);
    assert_eq!(u16_at(b, 0), 14);
    assert_eq!(u16_at(b, 16), 4); // ifm_slices
    assert_eq!(u16_at(b, 18), 2); // ofm_slices
    assert_eq!(u32_at(b, 24), 0x3000_0000);
    assert_eq!(u32_at(b, 40), 0x3200_0000);
    assert_eq!(u32_at(b, 44), 7 * 7 * 2); // pooled ofm_packet_length
    assert_eq!(u32_at(b, 48), 0x3100_0000);
    assert_eq!(u16_at(b, 64), 14); // pool_input_height
    assert_eq!(u16_at(b, 72), 7); // pool_output_height
    assert_eq!(u16_at(b, 76), 2); // pool_stride

    let ifm_src: Vec<u16> = (0..14 * 14 * 32).map(|v| v as u16).collect();
    acc.load_ifm(&ifm_src, &mut ifm).expect("ifm sized");
    let mut restored = vec![0u16; ifm_src.len()];
    restore_ifm(geom, ifm.as_slice(), &mut restored).unwrap();
    assert_eq!(restored, ifm_src);

    let w_src: Vec<u16> = (0..16 * 32 * 9).map(|v| v as u16).collect();
    acc.load_weights(&w_src, &mut weights).expect("weights sized");
    let mut restored = vec![0u16; w_src.len()];
    restore_weights(geom, weights.as_slice(), &mut restored).unwrap();
    assert_eq!(restored, w_src);

    assert_eq!(acc.read_ofm(&ofm).unwrap().len(), 7 * 7 * 16);
}

#[test]
fn conv_only_invocation() {
    let conv = ConvConfig {
        ifm_depth: 1024,
        ..layer()
    };
    let acc = Accelerator::new(
        conv,
        None,
        BufferAddresses::default(),
        ValidationProfile::conv_only(),
    );
    // 128 ifm slices overflow the 6-bit iteration counter
    let err = acc.command().unwrap_err();
    assert!(matches!(
        err,
        DariusError::Configuration {
            limit: Limit::IfmSliceIterations,
            value: 128
        }
    ));

    let acc = Accelerator::new(
        ConvConfig {
            ifm_depth: 512,
            ..layer()
        },
        None,
        BufferAddresses::default(),
        ValidationProfile::conv_only(),
    );
    let cmd = acc.command().unwrap();
    assert_eq!(cmd.layout(), CommandLayout::ConvOnly);
    assert_eq!(cmd.len(), 64);
    assert_eq!(u16_at(cmd.as_bytes(), 16), 64);
}

#[test]
fn undersized_dma_buffers_are_rejected() {
    let acc = Accelerator::new(
        layer(),
        None,
        BufferAddresses::default(),
        ValidationProfile::conv_pool(),
    );
    let geom = acc.geometry();

    let mut short_ifm = HostBuffer::<u16>::zeroed(ifm_elements(geom) - 1, 0);
    let src = vec![0u16; ifm_elements(geom)];
    let err = acc.load_ifm(&src, &mut short_ifm).unwrap_err();
    assert!(matches!(err, DariusError::LayoutPrecondition { buffer: "ifm target", .. }));

    let mut w = HostBuffer::<u16>::zeroed(weight_elements(geom), 0);
    let short_src = vec![0u16; weight_source_len(geom) - 1];
    let err = acc.load_weights(&short_src, &mut w).unwrap_err();
    assert!(matches!(err, DariusError::LayoutPrecondition { buffer: "weight source", .. }));
}

#[test]
fn efficiency_from_cycle_count() {
    let acc = Accelerator::new(
        ConvConfig::square(8, 8, 1, 0, 1, 8),
        None,
        BufferAddresses::default(),
        ValidationProfile::conv_pool(),
    );
    let pct = acc.efficiency(8).unwrap();
    assert!((pct - 800.0).abs() < 1e-9);
    assert!(matches!(acc.efficiency(0), Err(DariusError::ZeroCycles)));
}
