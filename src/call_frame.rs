use crate::{
    account::AccountInfo,
    code::Code,
    constants::STACK_LIMIT,
    errors::{ExceptionalHalt, VMError},
    memory::Memory,
};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::HashMap;

/// A log record emitted by LOG0..LOG4.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    #[serde(with = "crate::utils::serde_hex_bytes")]
    pub data: Bytes,
}

/// The 1024-slot operand stack.
///
/// Values grow downward through a boxed array so that a multi-item pop is a
/// single bounds check plus a slice reinterpretation; handlers destructure
/// the returned array by value.
#[derive(Debug, Clone)]
pub struct Stack {
    values: Box<[U256; STACK_LIMIT]>,
    offset: usize,
}

impl Default for Stack {
    fn default() -> Self {
        let values: Box<[U256]> = vec![U256::zero(); STACK_LIMIT].into_boxed_slice();
        Self {
            // Infallible: the vector length is exactly STACK_LIMIT.
            values: values.try_into().unwrap_or_else(|_| unreachable!()),
            offset: STACK_LIMIT,
        }
    }
}

impl Stack {
    /// Pop `N` items; the first array element is the former top of stack.
    #[inline]
    pub fn pop<const N: usize>(&mut self) -> Result<&[U256; N], ExceptionalHalt> {
        let next_offset = self
            .offset
            .checked_add(N)
            .ok_or(ExceptionalHalt::StackUnderflow)?;
        if next_offset > STACK_LIMIT {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        let popped = self.offset;
        self.offset = next_offset;

        let slice = &self.values[popped..next_offset];
        // Infallible: the slice length is exactly N.
        slice
            .try_into()
            .map_err(|_| ExceptionalHalt::StackUnderflow)
    }

    #[inline]
    pub fn pop1(&mut self) -> Result<U256, ExceptionalHalt> {
        if self.offset >= STACK_LIMIT {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        let value = self.values[self.offset];
        self.offset += 1;
        Ok(value)
    }

    #[inline]
    pub fn push(&mut self, value: U256) -> Result<(), ExceptionalHalt> {
        if self.offset == 0 {
            return Err(ExceptionalHalt::StackOverflow);
        }
        self.offset -= 1;
        self.values[self.offset] = value;
        Ok(())
    }

    #[inline]
    pub fn push_zero(&mut self) -> Result<(), ExceptionalHalt> {
        self.push(U256::zero())
    }

    pub fn len(&self) -> usize {
        STACK_LIMIT - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset == STACK_LIMIT
    }

    /// Item at `depth` below the top (0 is the top itself).
    pub fn get(&self, depth: usize) -> Result<U256, ExceptionalHalt> {
        let index = self
            .offset
            .checked_add(depth)
            .ok_or(ExceptionalHalt::StackUnderflow)?;
        if index >= STACK_LIMIT {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        Ok(self.values[index])
    }

    /// DUP: push a copy of the item at `depth` below the top.
    pub fn dup(&mut self, depth: usize) -> Result<(), ExceptionalHalt> {
        let value = self.get(depth)?;
        self.push(value)
    }

    /// SWAP: exchange the top with the item at `depth` below it.
    pub fn swap(&mut self, depth: usize) -> Result<(), ExceptionalHalt> {
        let other = self
            .offset
            .checked_add(depth)
            .ok_or(ExceptionalHalt::StackUnderflow)?;
        if depth == 0 || other >= STACK_LIMIT {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        self.values.swap(self.offset, other);
        Ok(())
    }

    /// EXCHANGE: swap the items at `a` and `b` below the top.
    pub fn exchange(&mut self, a: usize, b: usize) -> Result<(), ExceptionalHalt> {
        let first = self
            .offset
            .checked_add(a)
            .ok_or(ExceptionalHalt::StackUnderflow)?;
        let second = self
            .offset
            .checked_add(b)
            .ok_or(ExceptionalHalt::StackUnderflow)?;
        if first >= STACK_LIMIT || second >= STACK_LIMIT {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        self.values.swap(first, second);
        Ok(())
    }

    /// Snapshot from top to bottom, for tracers.
    pub fn to_vec(&self) -> Vec<U256> {
        self.values[self.offset..].to_vec()
    }

    pub fn clear(&mut self) {
        self.offset = STACK_LIMIT;
    }
}

/// Original values of everything a frame has touched, keyed for exact-undo.
///
/// On revert the recorded originals are written back into the state cache;
/// on success the backup folds into the parent frame's backup (entries
/// already present in the parent win, since they are older).
#[derive(Debug, Clone, Default)]
pub struct CallFrameBackup {
    pub original_accounts_info: FxHashMap<Address, AccountInfo>,
    pub original_account_storage_slots: FxHashMap<Address, HashMap<H256, U256>>,
}

impl CallFrameBackup {
    pub fn clear(&mut self) {
        self.original_accounts_info.clear();
        self.original_account_storage_slots.clear();
    }

    /// Fold a child's backup into this one. Existing entries are kept: they
    /// record older originals.
    pub fn merge_child(&mut self, child: &CallFrameBackup) {
        for (address, info) in &child.original_accounts_info {
            self.original_accounts_info.entry(*address).or_insert(*info);
        }
        for (address, slots) in &child.original_account_storage_slots {
            let entry = self
                .original_account_storage_slots
                .entry(*address)
                .or_default();
            for (key, value) in slots {
                entry.entry(*key).or_insert(*value);
            }
        }
    }
}

/// One frame in the return stack of an EOF function call.
#[derive(Debug, Clone, Copy)]
pub struct ReturnStackFrame {
    pub code_section: usize,
    pub pc: usize,
}

/// A single activation record of the interpreter: one message call or
/// contract creation.
#[derive(Debug)]
pub struct CallFrame {
    pub msg_sender: Address,
    /// Account whose storage and balance this frame operates on.
    pub to: Address,
    /// Account the executing code was loaded from (differs from `to` for
    /// DELEGATECALL and CALLCODE).
    pub code_address: Address,
    pub bytecode: Code,
    pub msg_value: U256,
    pub calldata: Bytes,
    pub is_static: bool,
    pub gas_limit: u64,
    /// Signed so the hot path can subtract first and fault on negative.
    pub gas_remaining: i64,
    pub depth: usize,
    pub should_transfer_value: bool,
    pub is_create: bool,
    /// Where the parent wants return data copied.
    pub ret_offset: usize,
    pub ret_size: usize,
    pub stack: Stack,
    pub memory: Memory,
    pub pc: usize,
    /// Active EOF code section; always 0 for legacy code.
    pub code_section: usize,
    /// CALLF/RETF return stack.
    pub return_stack: Vec<ReturnStackFrame>,
    pub output: Bytes,
    /// Return data of the most recent completed subcall.
    pub sub_return_data: Bytes,
    /// Whether the parent expects EXT*CALL status codes instead of the
    /// legacy success flag (and no return-area copy).
    pub uses_ext_status: bool,
    pub call_frame_backup: CallFrameBackup,
}

impl CallFrame {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        msg_sender: Address,
        to: Address,
        code_address: Address,
        bytecode: Code,
        msg_value: U256,
        calldata: Bytes,
        is_static: bool,
        gas_limit: u64,
        depth: usize,
        should_transfer_value: bool,
        is_create: bool,
        ret_offset: usize,
        ret_size: usize,
        stack: Stack,
        memory: Memory,
    ) -> Self {
        Self {
            msg_sender,
            to,
            code_address,
            bytecode,
            msg_value,
            calldata,
            is_static,
            gas_limit,
            gas_remaining: gas_limit as i64,
            depth,
            should_transfer_value,
            is_create,
            ret_offset,
            ret_size,
            stack,
            memory,
            pc: 0,
            code_section: 0,
            return_stack: Vec::new(),
            output: Bytes::new(),
            sub_return_data: Bytes::new(),
            uses_ext_status: false,
            call_frame_backup: CallFrameBackup::default(),
        }
    }

    /// The byte stream the program counter walks: the active code section
    /// for EOF, the whole bytecode for legacy code.
    #[inline]
    pub fn code_bytes(&self) -> &[u8] {
        match &self.bytecode.eof {
            Some(container) => &container.code_sections[self.code_section],
            None => &self.bytecode.bytecode,
        }
    }

    /// Fetch the opcode at the program counter; past the end of code this
    /// reads as STOP.
    #[inline]
    pub fn next_opcode(&self) -> u8 {
        self.code_bytes().get(self.pc).copied().unwrap_or(0x00)
    }

    /// Charge gas, faulting when the frame's allowance is exhausted.
    #[inline]
    pub fn increase_consumed_gas(&mut self, cost: u64) -> Result<(), VMError> {
        let cost: i64 = cost
            .try_into()
            .map_err(|_| ExceptionalHalt::OutOfGas)?;
        self.gas_remaining = self
            .gas_remaining
            .checked_sub(cost)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        if self.gas_remaining < 0 {
            return Err(ExceptionalHalt::OutOfGas.into());
        }
        Ok(())
    }

    /// Gas spent so far, saturating when the frame has already faulted.
    pub fn gas_used(&self) -> u64 {
        self.gas_limit.saturating_sub(self.gas_remaining.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_pop_returns_top_first() {
        let mut stack = Stack::default();
        stack.push(U256::from(1)).unwrap();
        stack.push(U256::from(2)).unwrap();
        let [top, below] = *stack.pop().unwrap();
        assert_eq!(top, U256::from(2));
        assert_eq!(below, U256::from(1));
        assert!(stack.is_empty());
    }

    #[test]
    fn underflow_and_overflow_are_detected() {
        let mut stack = Stack::default();
        assert_eq!(stack.pop1().unwrap_err(), ExceptionalHalt::StackUnderflow);
        for i in 0..STACK_LIMIT {
            stack.push(U256::from(i)).unwrap();
        }
        assert_eq!(
            stack.push(U256::zero()).unwrap_err(),
            ExceptionalHalt::StackOverflow
        );
    }

    #[test]
    fn dup_then_pop_restores_stack() {
        let mut stack = Stack::default();
        stack.push(U256::from(7)).unwrap();
        stack.dup(0).unwrap();
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop1().unwrap(), U256::from(7));
        assert_eq!(stack.pop1().unwrap(), U256::from(7));
    }

    #[test]
    fn swap_exchanges_top_with_depth() {
        let mut stack = Stack::default();
        stack.push(U256::from(1)).unwrap();
        stack.push(U256::from(2)).unwrap();
        stack.push(U256::from(3)).unwrap();
        stack.swap(2).unwrap();
        assert_eq!(stack.pop1().unwrap(), U256::from(1));
        assert_eq!(stack.pop1().unwrap(), U256::from(2));
        assert_eq!(stack.pop1().unwrap(), U256::from(3));
    }

    #[test]
    fn gas_charge_faults_when_exhausted() {
        let mut frame = CallFrame::new(
            Address::zero(),
            Address::zero(),
            Address::zero(),
            Code::default(),
            U256::zero(),
            Bytes::new(),
            false,
            10,
            0,
            false,
            false,
            0,
            0,
            Stack::default(),
            Memory::default(),
        );
        frame.increase_consumed_gas(10).unwrap();
        assert!(frame.increase_consumed_gas(1).is_err());
        assert_eq!(frame.gas_used(), 10);
    }
}
