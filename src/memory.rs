use crate::{
    constants::{MEMORY_EXPANSION_QUOTIENT, WORD_SIZE_IN_BYTES_USIZE},
    errors::{ExceptionalHalt, InternalError, VMError},
};
use ethereum_types::U256;
use std::{cell::RefCell, rc::Rc};
use ExceptionalHalt::{OutOfBounds, OutOfGas};

const PAGE_SIZE: usize = 4096;

/// A cheaply clonable, call-frame-shared memory buffer.
///
/// All frames of one transaction share a single backing vector; each frame
/// addresses the region starting at its own base offset. Entering a child
/// frame clones the handle with the base moved to the current end of the
/// buffer, and tearing the child down truncates back to that base.
#[derive(Debug, Clone)]
pub struct Memory {
    buffer: Rc<RefCell<Vec<u8>>>,
    current_base: usize,
    /// Frame-visible size in bytes. Grows only through `resize`, which is
    /// always fed word-aligned sizes, so this is what MSIZE reports and what
    /// expansion gas is computed against.
    len: usize,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            buffer: Rc::new(RefCell::new(Vec::with_capacity(PAGE_SIZE))),
            current_base: 0,
            len: 0,
        }
    }

    /// Handle for a child frame, based at the current physical end of the
    /// buffer. Truncating back to that base on teardown therefore never cuts
    /// into the parent's region.
    pub fn next_memory(&self) -> Memory {
        let current_end = self.buffer.borrow().len();
        Memory {
            buffer: Rc::clone(&self.buffer),
            current_base: current_end,
            len: 0,
        }
    }

    /// Drop this frame's region. Used when tearing down the frame that owns
    /// the tail of the buffer.
    pub fn clean_from_base(&self) {
        let mut buffer = self.buffer.borrow_mut();
        if self.current_base <= buffer.len() {
            buffer.truncate(self.current_base);
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Grow the frame-visible region to `new_size` bytes (word-aligned by
    /// the callers), zero-filling lazily through the page-sized buffer
    /// growth.
    pub fn resize(&mut self, new_size: usize) -> Result<(), VMError> {
        if new_size <= self.len {
            return Ok(());
        }
        self.len = new_size;

        let required = self
            .current_base
            .checked_add(new_size)
            .ok_or(OutOfBounds)?;
        let mut buffer = self.buffer.borrow_mut();
        if required > buffer.len() {
            let padded = required
                .checked_next_multiple_of(PAGE_SIZE)
                .ok_or(OutOfBounds)?;
            buffer.resize(padded, 0);
        }
        Ok(())
    }

    pub fn load_word(&mut self, offset: usize) -> Result<U256, VMError> {
        let bytes: [u8; WORD_SIZE_IN_BYTES_USIZE] = self
            .load_range(offset, WORD_SIZE_IN_BYTES_USIZE)?
            .try_into()
            .map_err(|_| InternalError::Slicing)?;
        Ok(U256::from_big_endian(&bytes))
    }

    pub fn load_range(&mut self, offset: usize, size: usize) -> Result<Vec<u8>, VMError> {
        if size == 0 {
            return Ok(Vec::new());
        }
        self.resize(calculate_memory_size(offset, size)?)?;

        let start = self.current_base.checked_add(offset).ok_or(OutOfBounds)?;
        let end = start.checked_add(size).ok_or(OutOfBounds)?;
        let buffer = self.buffer.borrow();
        Ok(buffer.get(start..end).ok_or(OutOfBounds)?.to_vec())
    }

    pub fn store_word(&mut self, offset: usize, word: U256) -> Result<(), VMError> {
        self.store_data(offset, &word.to_big_endian())
    }

    pub fn store_data(&mut self, offset: usize, data: &[u8]) -> Result<(), VMError> {
        if data.is_empty() {
            return Ok(());
        }
        self.resize(calculate_memory_size(offset, data.len())?)?;

        let start = self.current_base.checked_add(offset).ok_or(OutOfBounds)?;
        let end = start.checked_add(data.len()).ok_or(OutOfBounds)?;
        let mut buffer = self.buffer.borrow_mut();
        buffer
            .get_mut(start..end)
            .ok_or(OutOfBounds)?
            .copy_from_slice(data);
        Ok(())
    }

    /// MCOPY. Overlapping ranges behave like a memmove.
    pub fn copy_within(
        &mut self,
        from_offset: usize,
        to_offset: usize,
        size: usize,
    ) -> Result<(), VMError> {
        if size == 0 {
            return Ok(());
        }
        self.resize(calculate_memory_size(from_offset.max(to_offset), size)?)?;

        let from = self
            .current_base
            .checked_add(from_offset)
            .ok_or(OutOfBounds)?;
        let to = self
            .current_base
            .checked_add(to_offset)
            .ok_or(OutOfBounds)?;
        let end = from.checked_add(size).ok_or(OutOfBounds)?;
        let to_end = to.checked_add(size).ok_or(OutOfBounds)?;

        let mut buffer = self.buffer.borrow_mut();
        if end > buffer.len() || to_end > buffer.len() {
            return Err(OutOfBounds.into());
        }
        buffer.copy_within(from..end, to);
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

/// When memory expands, only the incremental cost of the new words is paid.
pub fn expansion_cost(new_memory_size: usize, current_memory_size: usize) -> Result<u64, VMError> {
    if new_memory_size <= current_memory_size {
        return Ok(0);
    }
    cost(new_memory_size)?
        .checked_sub(cost(current_memory_size)?)
        .ok_or(InternalError::Underflow.into())
}

/// Total cost of a memory of `memory_size` bytes:
/// `3 * words + words^2 / 512`.
fn cost(memory_size: usize) -> Result<u64, VMError> {
    let memory_size_word = memory_size
        .checked_add(WORD_SIZE_IN_BYTES_USIZE - 1)
        .ok_or(OutOfGas)?
        / WORD_SIZE_IN_BYTES_USIZE;

    let quadratic = memory_size_word.checked_pow(2).ok_or(OutOfGas)? / MEMORY_EXPANSION_QUOTIENT;
    let linear = 3usize.checked_mul(memory_size_word).ok_or(OutOfGas)?;

    quadratic
        .checked_add(linear)
        .ok_or(OutOfGas)?
        .try_into()
        .map_err(|_| ExceptionalHalt::VeryLargeNumber.into())
}

/// Word-aligned size a memory access of `size` bytes at `offset` requires.
pub fn calculate_memory_size(offset: usize, size: usize) -> Result<usize, VMError> {
    if size == 0 {
        return Ok(0);
    }
    offset
        .checked_add(size)
        .and_then(|end| end.checked_next_multiple_of(WORD_SIZE_IN_BYTES_USIZE))
        .ok_or(OutOfBounds.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_past_written_bytes_return_zeros() {
        let mut memory = Memory::new();
        memory.store_data(0, &[0xff; 4]).unwrap();
        let read = memory.load_range(2, 8).unwrap();
        assert_eq!(read, [0xff, 0xff, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn len_is_word_granular() {
        let mut memory = Memory::new();
        memory.store_data(10, &[1]).unwrap();
        assert_eq!(memory.len(), 32);
        memory.load_word(32).unwrap();
        assert_eq!(memory.len(), 64);
    }

    #[test]
    fn child_memory_is_isolated_from_parent() {
        let mut parent = Memory::new();
        parent.store_word(0, U256::from(42)).unwrap();

        let mut child = parent.next_memory();
        assert_eq!(child.len(), 0);
        child.store_word(0, U256::from(7)).unwrap();
        assert_eq!(child.load_word(0).unwrap(), U256::from(7));
        child.clean_from_base();

        assert_eq!(parent.load_word(0).unwrap(), U256::from(42));
    }

    #[test]
    fn expansion_cost_is_quadratic() {
        // One word: 3 gas. 32 words: 3*32 + 1024/512 = 98.
        assert_eq!(expansion_cost(32, 0).unwrap(), 3);
        assert_eq!(expansion_cost(1024, 0).unwrap(), 98);
        assert_eq!(expansion_cost(1024, 1024).unwrap(), 0);
        assert_eq!(expansion_cost(1024, 32).unwrap(), 95);
    }

    #[test]
    fn copy_within_handles_overlap() {
        let mut memory = Memory::new();
        memory.store_data(0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        memory.copy_within(0, 4, 8).unwrap();
        assert_eq!(
            memory.load_range(4, 8).unwrap(),
            [1, 2, 3, 4, 5, 6, 7, 8]
        );
    }
}
