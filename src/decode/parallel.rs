//! Parallel block materialization helpers.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Below this many blocks the sequential path is used even with `parallel`.
#[cfg(feature = "parallel")]
pub const MIN_PARALLEL_BLOCKS: usize = 4;

/// Map each block independently; results keep input order.
#[cfg(feature = "parallel")]
pub fn map_blocks<T, R, F>(blocks: &[T], func: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    if blocks.len() < MIN_PARALLEL_BLOCKS {
        return blocks.iter().map(func).collect();
    }
    blocks.par_iter().map(func).collect()
}

#[cfg(not(feature = "parallel"))]
pub fn map_blocks<T, R, F>(blocks: &[T], func: F) -> Vec<R>
where
    F: Fn(&T) -> R,
{
    blocks.iter().map(func).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_map_blocks_keeps_order() {
        let blocks: Vec<usize> = (0..64).collect();
        let mapped = map_blocks(&blocks, |value| value * 2);
        assert_eq!(mapped, (0..64).map(|value| value * 2).collect::<Vec<_>>());
    }
}
