// Fixed-size block splitting for staged delivery
use std::io::{self, Read};
use std::num::NonZeroUsize;

/// One block of file data and its position in the sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub index: usize,
    pub data: Vec<u8>,
}

/// Number of blocks needed to carry `file_size` bytes: ceil(size / block_size).
pub fn block_count(
    file_size: u64,
    block_size: NonZeroUsize,
) -> usize {
    file_size.div_ceil(block_size.get() as u64) as usize
}

/// Reads a source in blocks of exactly `block_size` bytes; only the last
/// block may be shorter. Yields nothing for an empty source.
pub struct BlockReader<R> {
    inner: R,
    block_size: usize,
    next_index: usize,
    done: bool,
}

impl<R: Read> BlockReader<R> {
    pub fn new(
        inner: R,
        block_size: NonZeroUsize,
    ) -> Self {
        BlockReader {
            inner,
            block_size: block_size.get(),
            next_index: 0,
            done: false,
        }
    }
}

impl<R: Read> Iterator for BlockReader<R> {
    type Item = io::Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        // Grow with what the source actually holds; a huge block size must
        // not turn into a huge allocation for a small file.
        let mut data = Vec::new();
        let limit = self.block_size as u64;
        if let Err(e) = self.inner.by_ref().take(limit).read_to_end(&mut data) {
            self.done = true;
            return Some(Err(e));
        }
        if data.is_empty() {
            self.done = true;
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;
        Some(Ok(Block { index, data }))
    }
}
