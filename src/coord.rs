use crate::structure::{DataDimension, MemoryLayout};

/// Converts N-dimensional coordinates to a flat linear index, honoring
/// `memory_layout`. Row-major: `Σ_i coords[i] · Π_{j>i} size[j]`.
/// Column-major is the symmetric definition over the reversed dimension
/// order.
pub fn coordinates_to_linear(
    coords: &[u64],
    dimensions: &[DataDimension],
    layout: MemoryLayout,
) -> u64 {
    debug_assert_eq!(coords.len(), dimensions.len());
    match layout {
        MemoryLayout::RowMajor => {
            let mut linear = 0u64;
            for i in 0..coords.len() {
                let mut stride = 1u64;
                for d in dimensions.iter().skip(i + 1) {
                    stride *= d.size;
                }
                linear += coords[i] * stride;
            }
            linear
        }
        MemoryLayout::ColumnMajor => {
            let mut linear = 0u64;
            for i in (0..coords.len()).rev() {
                let mut stride = 1u64;
                for d in dimensions.iter().take(i) {
                    stride *= d.size;
                }
                linear += coords[i] * stride;
            }
            linear
        }
    }
}

/// Inverse of `coordinates_to_linear`: recovers the N-D coordinate for a
/// flat index under the same memory layout.
pub fn linear_index_to_coordinates(
    mut index: u64,
    dimensions: &[DataDimension],
    layout: MemoryLayout,
) -> Vec<u64> {
    let mut coords = vec![0u64; dimensions.len()];
    match layout {
        MemoryLayout::RowMajor => {
            for i in (0..dimensions.len()).rev() {
                let size = dimensions[i].size.max(1);
                coords[i] = index % size;
                index /= size;
            }
        }
        MemoryLayout::ColumnMajor => {
            for i in 0..dimensions.len() {
                let size = dimensions[i].size.max(1);
                coords[i] = index % size;
                index /= size;
            }
        }
    }
    coords
}

/// Ripple-carry advance of a single scalar position along one dimension,
/// honoring an optional loop region. Shared by both access-processor
/// families.
pub fn advance_position(
    position: u64,
    steps: u64,
    dim_size: u64,
    loop_start: u64,
    loop_end: u64,
    looping: bool,
) -> u64 {
    let advanced = position + steps;
    if looping {
        let span = loop_end.saturating_sub(loop_start).max(1);
        if advanced >= loop_end {
            loop_start + ((advanced - loop_start) % span)
        } else {
            advanced
        }
    } else {
        advanced.min(dim_size.saturating_sub(1).max(position))
    }
}

/// Wraps a single coordinate of an N-D position vector into
/// `[loop_start[dim], loop_end[dim])`, carrying any overshoot.
pub fn wrap_position_with_loop(
    position: u64,
    loop_start: &[u64],
    loop_end: &[u64],
    dim: usize,
    looping: bool,
) -> u64 {
    if !looping || dim >= loop_start.len() || dim >= loop_end.len() {
        return position;
    }
    let start = loop_start[dim];
    let end = loop_end[dim];
    if end <= start {
        return position;
    }
    if position >= end {
        let span = end - start;
        start + ((position - start) % span)
    } else {
        position
    }
}

/// Ripple-carries an N-D position cursor forward by one step, starting
/// from the last dimension (mirrors `RegionSegment::advance_position`).
/// Returns `false` once every dimension has rolled over (the cursor is
/// back at `start`).
pub fn ripple_advance(current: &mut [u64], start: &[u64], end_inclusive: &[u64]) -> bool {
    for dim in (0..current.len()).rev() {
        if current[dim] < end_inclusive[dim] {
            current[dim] += 1;
            return true;
        }
        current[dim] = start[dim];
    }
    false
}

/// Extracts a rectangular region's worth of `f64` samples from a flat
/// row-major buffer, generalized over `DataVariant`'s `as_f64_vec`
/// projection by the caller.
pub fn extract_region_f64(
    source: &[f64],
    start: &[u64],
    end_inclusive: &[u64],
    dimensions: &[DataDimension],
    layout: MemoryLayout,
) -> Vec<f64> {
    let volume: u64 = start
        .iter()
        .zip(end_inclusive)
        .map(|(s, e)| e - s + 1)
        .product();
    let mut result = Vec::with_capacity(volume as usize);
    let mut current = start.to_vec();
    loop {
        let idx = coordinates_to_linear(&current, dimensions, layout) as usize;
        result.push(source[idx]);
        if !ripple_advance(&mut current, start, end_inclusive) {
            break;
        }
    }
    result
}

/// Writes `values` into `dest` at the coordinates spanned by
/// `[start, end_inclusive]`, in the same row-major sweep order as
/// `extract_region_f64`.
pub fn set_region_f64(
    dest: &mut [f64],
    values: &[f64],
    start: &[u64],
    end_inclusive: &[u64],
    dimensions: &[DataDimension],
    layout: MemoryLayout,
) {
    let mut current = start.to_vec();
    let mut values_iter = values.iter();
    loop {
        let Some(value) = values_iter.next() else { break };
        let idx = coordinates_to_linear(&current, dimensions, layout) as usize;
        dest[idx] = *value;
        if !ripple_advance(&mut current, start, end_inclusive) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{DataDimension, DimensionRole};

    fn dims() -> Vec<DataDimension> {
        vec![
            DataDimension::new("time", 4, 1, DimensionRole::Time),
            DataDimension::new("channel", 2, 1, DimensionRole::Channel),
        ]
    }

    #[test]
    fn row_major_linear_index() {
        let d = dims();
        assert_eq!(coordinates_to_linear(&[0, 0], &d, MemoryLayout::RowMajor), 0);
        assert_eq!(coordinates_to_linear(&[1, 0], &d, MemoryLayout::RowMajor), 2);
        assert_eq!(coordinates_to_linear(&[1, 1], &d, MemoryLayout::RowMajor), 3);
    }

    #[test]
    fn linear_index_round_trips_through_coordinates_row_major() {
        let d = dims();
        for t in 0..4u64 {
            for c in 0..2u64 {
                let linear = coordinates_to_linear(&[t, c], &d, MemoryLayout::RowMajor);
                assert_eq!(linear_index_to_coordinates(linear, &d, MemoryLayout::RowMajor), vec![t, c]);
            }
        }
    }

    #[test]
    fn linear_index_round_trips_through_coordinates_column_major() {
        let d = dims();
        for t in 0..4u64 {
            for c in 0..2u64 {
                let linear = coordinates_to_linear(&[t, c], &d, MemoryLayout::ColumnMajor);
                assert_eq!(linear_index_to_coordinates(linear, &d, MemoryLayout::ColumnMajor), vec![t, c]);
            }
        }
    }

    #[test]
    fn advance_wraps_on_loop() {
        let p = advance_position(8, 3, 10, 0, 10, true);
        assert_eq!(p, 1);
    }

    #[test]
    fn advance_freezes_without_loop() {
        let p = advance_position(8, 5, 10, 0, 10, false);
        assert_eq!(p, 9);
    }

    #[test]
    fn ripple_advance_carries_into_higher_dims() {
        let start = vec![0, 0];
        let end = vec![1, 1];
        let mut cur = vec![0, 1];
        assert!(ripple_advance(&mut cur, &start, &end));
        assert_eq!(cur, vec![1, 0]);
        assert!(ripple_advance(&mut cur, &start, &end));
        assert_eq!(cur, vec![1, 1]);
        assert!(!ripple_advance(&mut cur, &start, &end));
        assert_eq!(cur, vec![0, 0]);
    }

    #[test]
    fn extract_region_roundtrips_into_same_shape() {
        let d = dims();
        let source: Vec<f64> = (0..8).map(|x| x as f64).collect();
        let region = extract_region_f64(&source, &[1, 0], &[2, 1], &d, MemoryLayout::RowMajor);
        assert_eq!(region, vec![2.0, 3.0, 4.0, 5.0]);
    }
}
