//! Image chunking

/// A contiguous piece of an image, at most one block long
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    /// Byte offset of the block within its image
    pub offset: usize,
    /// Block contents
    pub data: &'a [u8],
}

/// Split an image into blocks of `block_size` bytes
///
/// Every block but the last is exactly `block_size` long; blocks come out in
/// increasing offset order. An empty image yields no blocks.
///
/// # Panics
/// Panics if `block_size` is zero. Sessions reject a zero block size when
/// they are created, so the sequencers never hit this.
pub fn chunks(image: &[u8], block_size: usize) -> impl ExactSizeIterator<Item = Block<'_>> + '_ {
    image
        .chunks(block_size)
        .enumerate()
        .map(move |(i, data)| Block {
            offset: i * block_size,
            data,
        })
}

/// Number of blocks an image of `len` bytes splits into
pub fn block_count(len: usize, block_size: usize) -> usize {
    len.div_ceil(block_size)
}
