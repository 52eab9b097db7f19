//! Tensor relayout between natural order and PE-grid order
//!
//! The accelerator streams feature maps and weights in an interleaved order
//! matched to its 8 × 8 grid:
//!
//! - **IFM**: depth-major `(depth, height, width)` becomes row-grid order.
//!   Each group of `ROWS` depth planes is interleaved element by element so
//!   every PE row streams one contiguous spatial plane per slice.
//! - **Weights**: `(ofm_depth, ifm_depth, kh, kw)` becomes
//!   `(ofm_slice, ifm_slice, k, row, col)`, so every (row, col) PE receives
//!   its depth-serial weight stream contiguously.
//!
//! Buffer lengths are checked once at the boundary; the index walk itself is
//! plain arithmetic. When the depth is not a multiple of the grid size the
//! tail of the source is read as padding and must be zeroed by the caller.

use darius_chip::grid::{COLS, ROWS};
use tracing::debug;

use crate::error::{DariusError, Result};
use crate::geometry::DerivedGeometry;

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn ensure_len(buffer: &'static str, required: usize, actual: usize) -> Result<()> {
    if actual < required {
        return Err(DariusError::layout_precondition(buffer, required, actual));
    }
    Ok(())
}

// ── Input feature map ────────────────────────────────────────────────────────

/// Elements in the grid-ordered IFM buffer, `ifm_slices × ROWS × H × W`
pub fn ifm_elements(geom: &DerivedGeometry) -> usize {
    to_usize(geom.ifm_slices)
        .saturating_mul(ROWS)
        .saturating_mul(to_usize(geom.ifm_plane))
}

/// Source index of every grid-ordered IFM element, in target order
pub fn ifm_source_indices(geom: &DerivedGeometry) -> impl Iterator<Item = usize> {
    let plane = to_usize(geom.ifm_plane);
    // An empty plane must not walk the outer slices
    let slices = if plane == 0 { 0 } else { to_usize(geom.ifm_slices) };
    (0..slices).flat_map(move |i| {
        (0..plane).flat_map(move |j| (0..ROWS).map(move |k| i * plane * ROWS + k * plane + j))
    })
}

/// Copy a depth-major IFM into grid order
///
/// # Errors
///
/// Returns [`DariusError::LayoutPrecondition`] if either buffer holds fewer
/// than [`ifm_elements`] elements.
pub fn relayout_ifm<T: Copy>(geom: &DerivedGeometry, src: &[T], dst: &mut [T]) -> Result<()> {
    let count = ifm_elements(geom);
    ensure_len("ifm source", count, src.len())?;
    ensure_len("ifm target", count, dst.len())?;

    for (slot, index) in dst.iter_mut().zip(ifm_source_indices(geom)) {
        *slot = src[index];
    }

    debug!("Relayout IFM: {} elements, {} slices", count, geom.ifm_slices);
    Ok(())
}

/// Copy a grid-ordered IFM back to depth-major order
///
/// # Errors
///
/// Returns [`DariusError::LayoutPrecondition`] if either buffer holds fewer
/// than [`ifm_elements`] elements.
pub fn restore_ifm<T: Copy>(geom: &DerivedGeometry, grid: &[T], dst: &mut [T]) -> Result<()> {
    let count = ifm_elements(geom);
    ensure_len("ifm grid", count, grid.len())?;
    ensure_len("ifm target", count, dst.len())?;

    for (&value, index) in grid.iter().zip(ifm_source_indices(geom)) {
        dst[index] = value;
    }
    Ok(())
}

// ── Weights ──────────────────────────────────────────────────────────────────

/// Elements in the grid-ordered weight buffer,
/// `ofm_slices × ifm_slices × kh × kw × ROWS × COLS`
pub fn weight_elements(geom: &DerivedGeometry) -> usize {
    to_usize(geom.ofm_slices)
        .saturating_mul(to_usize(geom.ifm_slices))
        .saturating_mul(to_usize(geom.kernel_area))
        .saturating_mul(ROWS * COLS)
}

/// Smallest natural-order weight buffer the relayout reads from
///
/// One past the largest source index.
pub fn weight_source_len(geom: &DerivedGeometry) -> usize {
    if weight_elements(geom) == 0 {
        return 0;
    }
    let offset = to_usize(geom.weight_offset);
    let pkt_offset = to_usize(geom.weight_pkt_offset);
    let kernel = to_usize(geom.kernel_area);
    let last = (to_usize(geom.ofm_slices) - 1)
        .saturating_mul(COLS)
        .saturating_mul(offset)
        .saturating_add((COLS - 1).saturating_mul(offset))
        .saturating_add((to_usize(geom.ifm_slices) - 1).saturating_mul(pkt_offset))
        .saturating_add((ROWS - 1).saturating_mul(kernel))
        .saturating_add(kernel - 1);
    last.saturating_add(1)
}

/// Source index of every grid-ordered weight, in target order
pub fn weight_source_indices(geom: &DerivedGeometry) -> impl Iterator<Item = usize> {
    let ofm_slices = if weight_elements(geom) == 0 {
        0
    } else {
        to_usize(geom.ofm_slices)
    };
    let ifm_slices = to_usize(geom.ifm_slices);
    let kernel = to_usize(geom.kernel_area);
    let offset = to_usize(geom.weight_offset);
    let pkt_offset = to_usize(geom.weight_pkt_offset);

    (0..ofm_slices).flat_map(move |i| {
        (0..ifm_slices).flat_map(move |j| {
            (0..kernel).flat_map(move |k| {
                (0..ROWS).flat_map(move |r| {
                    (0..COLS).map(move |c| {
                        i * COLS * offset + c * offset + j * pkt_offset + r * kernel + k
                    })
                })
            })
        })
    })
}

/// Copy natural-order weights into grid order
///
/// # Errors
///
/// Returns [`DariusError::LayoutPrecondition`] if the source is shorter than
/// [`weight_source_len`] or the target shorter than [`weight_elements`].
pub fn relayout_weights<T: Copy>(geom: &DerivedGeometry, src: &[T], dst: &mut [T]) -> Result<()> {
    let count = weight_elements(geom);
    ensure_len("weight source", weight_source_len(geom), src.len())?;
    ensure_len("weight target", count, dst.len())?;

    for (slot, index) in dst.iter_mut().zip(weight_source_indices(geom)) {
        *slot = src[index];
    }

    debug!(
        "Relayout weights: {} elements, {}x{} slices",
        count, geom.ofm_slices, geom.ifm_slices
    );
    Ok(())
}

/// Copy grid-ordered weights back to natural order
///
/// # Errors
///
/// Returns [`DariusError::LayoutPrecondition`] if the grid buffer is shorter
/// than [`weight_elements`] or the target shorter than [`weight_source_len`].
pub fn restore_weights<T: Copy>(geom: &DerivedGeometry, grid: &[T], dst: &mut [T]) -> Result<()> {
    ensure_len("weight grid", weight_elements(geom), grid.len())?;
    ensure_len("weight target", weight_source_len(geom), dst.len())?;

    for (&value, index) in grid.iter().zip(weight_source_indices(geom)) {
        dst[index] = value;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConvConfig;

    fn geometry(conv: &ConvConfig) -> DerivedGeometry {
        DerivedGeometry::derive(conv, None)
    }

    fn assert_permutation(mut indices: Vec<usize>, len: usize) {
        assert_eq!(indices.len(), len);
        indices.sort_unstable();
        assert!(indices.iter().copied().eq(0..len));
    }

    #[test]
    fn ifm_single_slice_is_bijection() {
        let geom = geometry(&ConvConfig::square(6, 8, 1, 0, 1, 8));
        assert_eq!(ifm_elements(&geom), 8 * 36);
        assert_permutation(ifm_source_indices(&geom).collect(), 8 * 36);
    }

    #[test]
    fn ifm_interleaves_depth_lanes() {
        let geom = geometry(&ConvConfig::square(6, 16, 1, 0, 1, 8));
        let src: Vec<u32> = (0..16 * 36).collect();
        let mut dst = vec![0u32; src.len()];
        relayout_ifm(&geom, &src, &mut dst).unwrap();

        // First pixel of each of the 8 depth planes of slice 0
        assert_eq!(&dst[..8], &[0, 36, 72, 108, 144, 180, 216, 252]);
        // Second pixel
        assert_eq!(dst[8], 1);
        // Slice 1 starts after 8 × 36 elements
        assert_eq!(dst[8 * 36], 8 * 36);
        assert_permutation(dst.iter().map(|&v| v as usize).collect(), 16 * 36);
    }

    #[test]
    fn ifm_round_trip() {
        let geom = geometry(&ConvConfig::square(7, 24, 3, 1, 1, 8));
        let src: Vec<i16> = (0..24 * 49).map(|v| (v % 30_000) as i16 - 100).collect();
        let mut grid = vec![0i16; src.len()];
        let mut back = vec![0i16; src.len()];
        relayout_ifm(&geom, &src, &mut grid).unwrap();
        restore_ifm(&geom, &grid, &mut back).unwrap();
        assert_eq!(back, src);
        assert_ne!(grid, src);
    }

    #[test]
    fn ifm_partial_slice_reads_padding() {
        // depth 12 → 2 slices, source must cover 16 planes
        let geom = geometry(&ConvConfig::square(6, 12, 1, 0, 1, 8));
        assert_eq!(ifm_elements(&geom), 16 * 36);
        let short = vec![0u16; 12 * 36];
        let mut dst = vec![0u16; 16 * 36];
        let err = relayout_ifm(&geom, &short, &mut dst).unwrap_err();
        assert!(matches!(
            err,
            DariusError::LayoutPrecondition {
                buffer: "ifm source",
                required: 576,
                actual: 432
            }
        ));
    }

    #[test]
    fn ifm_undersized_target() {
        let geom = geometry(&ConvConfig::square(6, 8, 1, 0, 1, 8));
        let src = vec![0u16; 288];
        let mut dst = vec![0u16; 287];
        let err = relayout_ifm(&geom, &src, &mut dst).unwrap_err();
        assert!(matches!(err, DariusError::LayoutPrecondition { buffer: "ifm target", .. }));
    }

    #[test]
    fn weights_unit_kernel_is_bijection() {
        let geom = geometry(&ConvConfig::square(6, 8, 1, 0, 1, 8));
        assert_eq!(weight_elements(&geom), 64);
        assert_eq!(weight_source_len(&geom), 64);
        assert_permutation(weight_source_indices(&geom).collect(), 64);
    }

    #[test]
    fn weights_group_by_pe() {
        // ofm 8, ifm 8, 1x1: weight[o][d] at o*8 + d; PE (r, c) gets weight[c][r]
        let geom = geometry(&ConvConfig::square(6, 8, 1, 0, 1, 8));
        let src: Vec<u32> = (0..64).collect();
        let mut dst = vec![0u32; 64];
        relayout_weights(&geom, &src, &mut dst).unwrap();
        for r in 0..ROWS {
            for c in 0..COLS {
                assert_eq!(dst[r * COLS + c] as usize, c * 8 + r);
            }
        }
    }

    #[test]
    fn weights_multi_slice_round_trip() {
        let conv = ConvConfig {
            ifm_height: 8,
            ifm_width: 8,
            ifm_depth: 16,
            kernel_height: 3,
            kernel_width: 2,
            pad: 0,
            stride: 1,
            channels: 24,
        };
        let geom = geometry(&conv);
        let len = 24 * 16 * 3 * 2;
        assert_eq!(weight_elements(&geom), len);
        assert_eq!(weight_source_len(&geom), len);
        assert_permutation(weight_source_indices(&geom).collect(), len);

        let src: Vec<f32> = (0..len).map(|v| v as f32 * 0.5).collect();
        let mut grid = vec![0.0f32; len];
        let mut back = vec![0.0f32; len];
        relayout_weights(&geom, &src, &mut grid).unwrap();
        restore_weights(&geom, &grid, &mut back).unwrap();
        assert_eq!(back, src);
    }

    #[test]
    fn weights_undersized_source() {
        let geom = geometry(&ConvConfig::square(6, 16, 3, 0, 1, 16));
        let src = vec![0u16; weight_source_len(&geom) - 1];
        let mut dst = vec![0u16; weight_elements(&geom)];
        let err = relayout_weights(&geom, &src, &mut dst).unwrap_err();
        assert!(matches!(err, DariusError::LayoutPrecondition { buffer: "weight source", .. }));
    }

    #[test]
    fn empty_geometry_needs_no_buffers() {
        let geom = geometry(&ConvConfig::square(6, 0, 1, 0, 1, 0));
        assert_eq!(ifm_elements(&geom), 0);
        assert_eq!(weight_source_len(&geom), 0);
        relayout_weights::<u16>(&geom, &[], &mut []).unwrap();
        relayout_ifm::<u16>(&geom, &[], &mut []).unwrap();
    }

    #[test]
    fn empty_inner_dimension_returns_immediately() {
        let deep = ConvConfig {
            ifm_height: 0,
            ifm_width: 16,
            ifm_depth: u32::MAX,
            kernel_height: 0,
            kernel_width: 3,
            pad: 0,
            stride: 1,
            channels: u32::MAX,
        };
        let geom = geometry(&deep);
        assert!(geom.ifm_slices > 1 << 28);
        assert_eq!(ifm_elements(&geom), 0);
        assert_eq!(weight_elements(&geom), 0);
        assert!(ifm_source_indices(&geom).next().is_none());
        assert!(weight_source_indices(&geom).next().is_none());

        let mut dst = [7u16; 4];
        relayout_ifm(&geom, &[], &mut dst).unwrap();
        restore_ifm(&geom, &[1, 2], &mut dst).unwrap();
        relayout_weights(&geom, &[], &mut dst).unwrap();
        restore_weights(&geom, &[1, 2], &mut dst).unwrap();
        assert_eq!(dst, [7; 4]);
    }
}
