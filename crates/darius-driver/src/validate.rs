//! Configuration validation
//!
//! Checks a convolution against the structural limits of the loaded
//! bitstream. Checks run in a fixed order and the first violation is
//! returned as a structured [`DariusError::Configuration`]; nothing is
//! clamped. A command must never be encoded for a configuration that fails
//! here.

use darius_chip::limits::{
    DEPTH_MULTIPLE, ELEMENT_BYTES, IFM_DIM, KERNEL_DIM, MAX_BYTES_TO_TRANSFER, MAX_ITER_WIDTH,
    MAX_PLANE_ELEMENTS, MIN_DEPTH, MIN_OFM_PLANE, PAD, STRIDES,
};
use tracing::debug;

use crate::config::{ConvConfig, ValidationProfile};
use crate::error::{DariusError, Limit, Result};
use crate::geometry::DerivedGeometry;

/// Validate `conv` and its derived geometry against `profile`
///
/// # Errors
///
/// Returns [`DariusError::Configuration`] naming the first violated limit
/// and the offending value.
pub fn validate(conv: &ConvConfig, geom: &DerivedGeometry, profile: &ValidationProfile) -> Result<()> {
    check(IFM_DIM.contains(&conv.ifm_height), Limit::IfmHeight, conv.ifm_height)?;
    check(IFM_DIM.contains(&conv.ifm_width), Limit::IfmWidth, conv.ifm_width)?;

    check_depth(
        conv.ifm_depth,
        profile.max_depth,
        Limit::IfmDepthRange { max: profile.max_depth },
        Limit::IfmDepthMultiple,
    )?;

    check(KERNEL_DIM.contains(&conv.kernel_height), Limit::KernelHeight, conv.kernel_height)?;
    check(KERNEL_DIM.contains(&conv.kernel_width), Limit::KernelWidth, conv.kernel_width)?;

    let stride_ok = STRIDES.contains(&conv.stride) || (conv.stride == 0 && profile.legacy_zero_stride);
    check(stride_ok, Limit::Stride, conv.stride)?;

    check(PAD.contains(&conv.pad), Limit::Pad, conv.pad)?;

    check_depth(
        conv.channels,
        profile.max_depth,
        Limit::ChannelsRange { max: profile.max_depth },
        Limit::ChannelsMultiple,
    )?;

    // The accumulation loopback has a 10 cycle delay
    let ofm_plane = geom.ofm_plane();
    check(ofm_plane >= MIN_OFM_PLANE, Limit::OfmPlaneTooSmall, ofm_plane)?;

    // Planes are bounded by the line buffer BRAM
    check(geom.ifm_plane <= MAX_PLANE_ELEMENTS, Limit::IfmPlaneTooLarge, geom.ifm_plane)?;
    check(ofm_plane <= MAX_PLANE_ELEMENTS, Limit::OfmPlaneTooLarge, ofm_plane)?;

    if profile.check_iteration_width {
        check(
            ceil_log2(geom.ifm_slices) <= MAX_ITER_WIDTH,
            Limit::IfmSliceIterations,
            geom.ifm_slices,
        )?;
        check(
            ceil_log2(geom.ofm_slices) <= MAX_ITER_WIDTH,
            Limit::OfmSliceIterations,
            geom.ofm_slices,
        )?;
    }

    // One datamover transfer carries the whole ofm volume
    let ofm_bytes = ofm_plane
        .saturating_mul(u64::from(conv.channels))
        .saturating_mul(ELEMENT_BYTES);
    check(ofm_bytes <= MAX_BYTES_TO_TRANSFER, Limit::BytesToTransfer, ofm_bytes)?;

    debug!("All {} arguments are in supported range", profile.layout);
    Ok(())
}

fn check(ok: bool, limit: Limit, value: impl Into<u64>) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(DariusError::configuration(limit, value))
    }
}

fn check_depth(depth: u32, max_depth: u32, range: Limit, multiple: Limit) -> Result<()> {
    check((MIN_DEPTH..=max_depth).contains(&depth), range, depth)?;
    check(depth % DEPTH_MULTIPLE == 0, multiple, depth)
}

/// `ceil(log2(n))`, with 0 for `n ≤ 1`
const fn ceil_log2(n: u64) -> u32 {
    if n <= 1 {
        0
    } else {
        u64::BITS - (n - 1).leading_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ConvConfig {
        ConvConfig::square(16, 16, 3, 1, 1, 16)
    }

    fn run(conv: &ConvConfig, profile: &ValidationProfile) -> Result<()> {
        validate(conv, &DerivedGeometry::derive(conv, None), profile)
    }

    fn limit_of(conv: &ConvConfig, profile: &ValidationProfile) -> Option<Limit> {
        run(conv, profile).err().and_then(|e| e.limit())
    }

    #[test]
    fn accepts_reference_config() {
        run(&base(), &ValidationProfile::conv_pool()).unwrap();
        run(&base(), &ValidationProfile::conv_only()).unwrap();
    }

    #[test]
    fn ifm_depth_must_be_multiple_of_eight() {
        let profile = ValidationProfile::conv_pool();
        let conv = ConvConfig { ifm_depth: 9, ..base() };
        let err = run(&conv, &profile).unwrap_err();
        assert!(matches!(
            err,
            DariusError::Configuration {
                limit: Limit::IfmDepthMultiple,
                value: 9
            }
        ));

        run(&ConvConfig { ifm_depth: 8, ..base() }, &profile).unwrap();
        run(&ConvConfig { ifm_depth: 512, ..base() }, &profile).unwrap();
    }

    #[test]
    fn depth_range_depends_on_profile() {
        let deep = ConvConfig { ifm_depth: 1024, ..base() };
        assert_eq!(
            limit_of(&deep, &ValidationProfile::conv_pool()),
            Some(Limit::IfmDepthRange { max: 512 })
        );
        let wide = ConvConfig { channels: 520, ..base() };
        assert_eq!(
            limit_of(&wide, &ValidationProfile::conv_pool()),
            Some(Limit::ChannelsRange { max: 512 })
        );
        run(&wide, &ValidationProfile::conv_only()).unwrap();
        assert_eq!(
            limit_of(&ConvConfig { ifm_depth: 0, ..base() }, &ValidationProfile::conv_pool()),
            Some(Limit::IfmDepthRange { max: 512 })
        );
    }

    #[test]
    fn depth_range_message_names_profile_bounds() {
        let deep = ConvConfig { ifm_depth: 2048, ..base() };
        let err = run(&deep, &ValidationProfile::conv_pool()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported configuration: IFM depth must be in range 8 to 512 (got 2048)"
        );
        let err = run(&deep, &ValidationProfile::conv_only()).unwrap_err();
        assert!(err.to_string().contains("range 8 to 1024"));

        let wide = ConvConfig { channels: 2048, ..base() };
        let err = run(&wide, &ValidationProfile::conv_only()).unwrap_err();
        assert!(err.to_string().contains("number of channels must be in range 8 to 1024"));
    }

    #[test]
    fn iteration_width_only_on_conv_only() {
        // 1024 / 8 = 128 slices needs 7 counter bits
        let deep = ConvConfig { ifm_depth: 1024, ..base() };
        assert_eq!(
            limit_of(&deep, &ValidationProfile::conv_only()),
            Some(Limit::IfmSliceIterations)
        );
        let wide = ConvConfig { channels: 1024, ..base() };
        assert_eq!(
            limit_of(&wide, &ValidationProfile::conv_only()),
            Some(Limit::OfmSliceIterations)
        );
        // 512 / 8 = 64 slices fits in 6 bits
        run(&ConvConfig { ifm_depth: 512, channels: 512, ..base() }, &ValidationProfile::conv_only()).unwrap();
    }

    #[test]
    fn ofm_plane_latency_floor() {
        let profile = ValidationProfile::conv_pool();
        // 6x6 input, 4x4 kernel → 3x3 = 9
        let nine = ConvConfig {
            ifm_height: 6,
            ifm_width: 6,
            kernel_height: 4,
            kernel_width: 4,
            pad: 0,
            ..base()
        };
        let err = run(&nine, &profile).unwrap_err();
        assert!(matches!(
            err,
            DariusError::Configuration {
                limit: Limit::OfmPlaneTooSmall,
                value: 9
            }
        ));
        // 6x6 input, 5x2 kernel → 2x5 = 10
        let ten = ConvConfig {
            kernel_height: 5,
            kernel_width: 2,
            ..nine
        };
        run(&ten, &profile).unwrap();
    }

    #[test]
    fn out_of_range_shapes() {
        let profile = ValidationProfile::conv_pool();
        let cases = [
            (ConvConfig { ifm_height: 5, ..base() }, Limit::IfmHeight),
            (ConvConfig { ifm_width: 33, ..base() }, Limit::IfmWidth),
            (ConvConfig { kernel_height: 0, ..base() }, Limit::KernelHeight),
            (ConvConfig { kernel_width: 17, ..base() }, Limit::KernelWidth),
            (ConvConfig { stride: 3, ..base() }, Limit::Stride),
            (ConvConfig { stride: 8, ..base() }, Limit::Stride),
            (ConvConfig { pad: 17, ..base() }, Limit::Pad),
            (ConvConfig { channels: 12, ..base() }, Limit::ChannelsMultiple),
        ];
        for (conv, limit) in cases {
            assert_eq!(limit_of(&conv, &profile), Some(limit), "{conv:?}");
        }
    }

    #[test]
    fn zero_stride_policy() {
        let conv = ConvConfig { stride: 0, ..base() };
        assert_eq!(limit_of(&conv, &ValidationProfile::conv_pool()), Some(Limit::Stride));
        assert_eq!(limit_of(&conv, &ValidationProfile::conv_only()), Some(Limit::Stride));

        // Tolerated by the stride check, but the ofm plane is empty
        let legacy = ValidationProfile::conv_only().with_legacy_zero_stride(true);
        assert_eq!(limit_of(&conv, &legacy), Some(Limit::OfmPlaneTooSmall));
    }

    #[test]
    fn ofm_plane_must_fit_line_buffer() {
        // 32 + 2·16 - 1 + 1 = 64 → 4096 fits exactly
        let conv = ConvConfig::square(32, 8, 1, 16, 1, 8);
        run(&conv, &ValidationProfile::conv_pool()).unwrap();

        // Pretend a larger plane to exercise the check directly
        let mut geom = DerivedGeometry::derive(&conv, None);
        geom.ofm_width = 65;
        let err = validate(&conv, &geom, &ValidationProfile::conv_pool()).unwrap_err();
        assert_eq!(err.limit(), Some(Limit::OfmPlaneTooLarge));
    }

    #[test]
    fn bytes_to_transfer_limit() {
        let profile = ValidationProfile {
            max_depth: 4096,
            ..ValidationProfile::conv_pool()
        };
        // 64 × 64 × 1024 × 2 = 2^23, exactly the limit
        run(&ConvConfig::square(32, 8, 1, 16, 1, 1024), &profile).unwrap();
        // 64 × 64 × 2048 × 2 = 2^24
        let err = run(&ConvConfig::square(32, 8, 1, 16, 1, 2048), &profile).unwrap_err();
        assert!(matches!(
            err,
            DariusError::Configuration {
                limit: Limit::BytesToTransfer,
                value: 16_777_216
            }
        ));
    }

    #[test]
    fn ceil_log2_values() {
        assert_eq!(ceil_log2(0), 0);
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(3), 2);
        assert_eq!(ceil_log2(64), 6);
        assert_eq!(ceil_log2(65), 7);
    }
}
