//! # Control flow, memory and storage operations
//!
//! Includes the following opcodes:
//!   - `POP`, `PC`, `GAS`, `MSIZE`
//!   - `MLOAD`, `MSTORE`, `MSTORE8`, `MCOPY`
//!   - `SLOAD`, `SSTORE`, `TLOAD`, `TSTORE`
//!   - `JUMP`, `JUMPI`, `JUMPDEST`

use crate::{
    constants::WORD_SIZE_IN_BYTES_USIZE,
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    opcode_handlers::OpcodeHandler,
    opcodes::Opcode,
    utils::{size_offset_to_usize, u256_to_usize},
    vm::VM,
};
use ethereum_types::U256;
use std::slice;

/// Implementation for the `POP` opcode.
pub struct OpPopHandler;
impl OpcodeHandler for OpPopHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::POP)?;
        vm.current_call_frame.stack.pop1()?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `GAS` opcode: remaining gas after this opcode.
pub struct OpGasHandler;
impl OpcodeHandler for OpGasHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::GAS)?;
        let remaining = vm.current_call_frame.gas_remaining.max(0) as u64;
        vm.current_call_frame.stack.push(U256::from(remaining))?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `PC` opcode.
pub struct OpPcHandler;
impl OpcodeHandler for OpPcHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::PC)?;
        // The dispatch loop pre-increments the program counter, so the
        // opcode's own offset is one behind.
        let pc = vm.current_call_frame.pc.wrapping_sub(1);
        vm.current_call_frame.stack.push(U256::from(pc))?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `MSIZE` opcode.
pub struct OpMSizeHandler;
impl OpcodeHandler for OpMSizeHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::MSIZE)?;
        let size = vm.current_call_frame.memory.len();
        vm.current_call_frame.stack.push(U256::from(size))?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `MLOAD` opcode.
pub struct OpMLoadHandler;
impl OpcodeHandler for OpMLoadHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let offset = u256_to_usize(vm.current_call_frame.stack.pop1()?)?;
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::mload(
                calculate_memory_size(offset, WORD_SIZE_IN_BYTES_USIZE)?,
                vm.current_call_frame.memory.len(),
            )?)?;

        let word = vm.current_call_frame.memory.load_word(offset)?;
        vm.current_call_frame.stack.push(word)?;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `MSTORE` opcode.
pub struct OpMStoreHandler;
impl OpcodeHandler for OpMStoreHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [offset, value] = *vm.current_call_frame.stack.pop()?;
        let offset = u256_to_usize(offset)?;

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::mstore(
                calculate_memory_size(offset, WORD_SIZE_IN_BYTES_USIZE)?,
                vm.current_call_frame.memory.len(),
            )?)?;

        vm.current_call_frame.memory.store_word(offset, value)?;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `MSTORE8` opcode: store the low byte of the value.
pub struct OpMStore8Handler;
impl OpcodeHandler for OpMStore8Handler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [offset, value] = *vm.current_call_frame.stack.pop()?;
        let offset = u256_to_usize(offset)?;
        let byte = value.byte(0);

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::mstore8(
                calculate_memory_size(offset, 1)?,
                vm.current_call_frame.memory.len(),
            )?)?;

        vm.current_call_frame
            .memory
            .store_data(offset, slice::from_ref(&byte))?;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `MCOPY` opcode ([EIP-5656], Cancun).
pub struct OpMCopyHandler;
impl OpcodeHandler for OpMCopyHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [dest_offset, src_offset, size] = *vm.current_call_frame.stack.pop()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let src_offset = if size == 0 {
            0
        } else {
            u256_to_usize(src_offset)?
        };

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::mcopy(
                calculate_memory_size(dest_offset.max(src_offset), size)?,
                vm.current_call_frame.memory.len(),
                size,
            )?)?;

        vm.current_call_frame
            .memory
            .copy_within(src_offset, dest_offset, size)?;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `SLOAD` opcode.
pub struct OpSLoadHandler;
impl OpcodeHandler for OpSLoadHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let key = crate::utils::u256_to_h256(vm.current_call_frame.stack.pop1()?);
        let to = vm.current_call_frame.to;

        let (value, was_cold) = vm.access_storage_slot(to, key)?;
        let fork = vm.env.config.fork;
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::sload(was_cold, fork))?;

        vm.current_call_frame.stack.push(value)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `SSTORE` opcode; the metered body lives on the VM
/// since the EOF dispatch path shares it.
pub struct OpSStoreHandler;
impl OpcodeHandler for OpSStoreHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [key, new_value] = *vm.current_call_frame.stack.pop()?;
        vm.op_sstore_inner(key, new_value)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `TLOAD` opcode ([EIP-1153], Cancun).
pub struct OpTLoadHandler;
impl OpcodeHandler for OpTLoadHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::TLOAD)?;

        let key = vm.current_call_frame.stack.pop1()?;
        let to = vm.current_call_frame.to;
        let value = vm.substate.get_transient(&to, &key);
        vm.current_call_frame.stack.push(value)?;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `TSTORE` opcode ([EIP-1153], Cancun).
pub struct OpTStoreHandler;
impl OpcodeHandler for OpTStoreHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        if vm.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::TSTORE)?;

        let [key, value] = *vm.current_call_frame.stack.pop()?;
        let to = vm.current_call_frame.to;
        vm.substate.set_transient(&to, &key, value);

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `JUMPDEST` opcode.
pub struct OpJumpDestHandler;
impl OpcodeHandler for OpJumpDestHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::JUMPDEST)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `JUMP` opcode.
pub struct OpJumpHandler;
impl OpcodeHandler for OpJumpHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::JUMP)?;

        let target = vm.current_call_frame.stack.pop1()?;
        jump(vm, target.try_into().unwrap_or(usize::MAX))?;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `JUMPI` opcode.
pub struct OpJumpIHandler;
impl OpcodeHandler for OpJumpIHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::JUMPI)?;

        let [target, condition] = *vm.current_call_frame.stack.pop()?;
        if !condition.is_zero() {
            jump(vm, target.try_into().unwrap_or(usize::MAX))?;
        }

        Ok(OpcodeResult::Continue)
    }
}

/// A jump target must be a `JUMPDEST` byte that is not inside a PUSH
/// immediate.
fn jump(vm: &mut VM<'_>, target: usize) -> Result<(), VMError> {
    let frame = &mut vm.current_call_frame;
    let valid = frame
        .bytecode
        .bytecode
        .get(target)
        .is_some_and(|&byte| {
            byte == Opcode::JUMPDEST as u8 && !frame.bytecode.jump_targets.is_blacklisted(target)
        });

    if valid {
        // Skip over the JUMPDEST itself and charge its cost here.
        frame.pc = target.wrapping_add(1);
        frame.increase_consumed_gas(gas_cost::JUMPDEST)?;
        Ok(())
    } else {
        Err(ExceptionalHalt::InvalidJump.into())
    }
}
