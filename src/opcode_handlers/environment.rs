//! # Environmental information
//!
//! Includes the following opcodes:
//!   - `ADDRESS`, `ORIGIN`, `CALLER`, `CALLVALUE`, `GASPRICE`
//!   - `BALANCE`, `SELFBALANCE`
//!   - `CALLDATALOAD`, `CALLDATASIZE`, `CALLDATACOPY`
//!   - `CODESIZE`, `CODECOPY`
//!   - `EXTCODESIZE`, `EXTCODECOPY`, `EXTCODEHASH`
//!   - `RETURNDATASIZE`, `RETURNDATACOPY`

use crate::{
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    opcode_handlers::OpcodeHandler,
    utils::{address_to_word, size_offset_to_usize, u256_to_usize, word_to_address},
    vm::VM,
};
use ethereum_types::U256;

/// Implementation for the `ADDRESS` opcode.
pub struct OpAddressHandler;
impl OpcodeHandler for OpAddressHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::ADDRESS)?;
        let address = vm.current_call_frame.to;
        vm.current_call_frame.stack.push(address_to_word(address))?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `BALANCE` opcode.
pub struct OpBalanceHandler;
impl OpcodeHandler for OpBalanceHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let address = word_to_address(vm.current_call_frame.stack.pop1()?);
        let was_cold = vm.substate.add_accessed_address(address);
        let fork = vm.env.config.fork;
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::balance(was_cold, fork))?;

        let balance = vm.db.get_account(address)?.info.balance;
        vm.current_call_frame.stack.push(balance)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `SELFBALANCE` opcode.
pub struct OpSelfBalanceHandler;
impl OpcodeHandler for OpSelfBalanceHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::SELFBALANCE)?;
        let address = vm.current_call_frame.to;
        let balance = vm.db.get_account(address)?.info.balance;
        vm.current_call_frame.stack.push(balance)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `ORIGIN` opcode.
pub struct OpOriginHandler;
impl OpcodeHandler for OpOriginHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::ORIGIN)?;
        let origin = vm.env.origin;
        vm.current_call_frame.stack.push(address_to_word(origin))?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `CALLER` opcode.
pub struct OpCallerHandler;
impl OpcodeHandler for OpCallerHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::CALLER)?;
        let sender = vm.current_call_frame.msg_sender;
        vm.current_call_frame.stack.push(address_to_word(sender))?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `CALLVALUE` opcode.
pub struct OpCallValueHandler;
impl OpcodeHandler for OpCallValueHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::CALLVALUE)?;
        let value = vm.current_call_frame.msg_value;
        vm.current_call_frame.stack.push(value)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `GASPRICE` opcode.
pub struct OpGasPriceHandler;
impl OpcodeHandler for OpGasPriceHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::GASPRICE)?;
        let gas_price = vm.env.gas_price;
        vm.current_call_frame.stack.push(gas_price)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `CALLDATALOAD` opcode: 32 bytes of calldata at the
/// offset, zero-padded past the end.
pub struct OpCallDataLoadHandler;
impl OpcodeHandler for OpCallDataLoadHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::CALLDATALOAD)?;

        let offset = vm.current_call_frame.stack.pop1()?;
        let calldata = &vm.current_call_frame.calldata;

        let mut word = [0u8; 32];
        if let Ok(offset) = u256_to_usize(offset) {
            if offset < calldata.len() {
                let available = (calldata.len() - offset).min(32);
                word[..available].copy_from_slice(&calldata[offset..offset + available]);
            }
        }
        vm.current_call_frame
            .stack
            .push(U256::from_big_endian(&word))?;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `CALLDATASIZE` opcode.
pub struct OpCallDataSizeHandler;
impl OpcodeHandler for OpCallDataSizeHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::CALLDATASIZE)?;
        let size = vm.current_call_frame.calldata.len();
        vm.current_call_frame.stack.push(U256::from(size))?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `CALLDATACOPY` opcode.
pub struct OpCallDataCopyHandler;
impl OpcodeHandler for OpCallDataCopyHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [dest_offset, data_offset, size] = *vm.current_call_frame.stack.pop()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::calldatacopy(
                calculate_memory_size(dest_offset, size)?,
                vm.current_call_frame.memory.len(),
                size,
            )?)?;

        if size == 0 {
            return Ok(OpcodeResult::Continue);
        }

        let data = copy_with_zero_fill(&vm.current_call_frame.calldata, data_offset, size);
        vm.current_call_frame.memory.store_data(dest_offset, &data)?;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `CODESIZE` opcode.
pub struct OpCodeSizeHandler;
impl OpcodeHandler for OpCodeSizeHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::CODESIZE)?;
        let size = vm.current_call_frame.bytecode.len();
        vm.current_call_frame.stack.push(U256::from(size))?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `CODECOPY` opcode.
pub struct OpCodeCopyHandler;
impl OpcodeHandler for OpCodeCopyHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [dest_offset, code_offset, size] = *vm.current_call_frame.stack.pop()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::codecopy(
                calculate_memory_size(dest_offset, size)?,
                vm.current_call_frame.memory.len(),
                size,
            )?)?;

        if size == 0 {
            return Ok(OpcodeResult::Continue);
        }

        let data = copy_with_zero_fill(
            &vm.current_call_frame.bytecode.bytecode,
            code_offset,
            size,
        );
        vm.current_call_frame.memory.store_data(dest_offset, &data)?;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `EXTCODESIZE` opcode.
pub struct OpExtCodeSizeHandler;
impl OpcodeHandler for OpExtCodeSizeHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let address = word_to_address(vm.current_call_frame.stack.pop1()?);
        let was_cold = vm.substate.add_accessed_address(address);
        let fork = vm.env.config.fork;
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::extcodesize(was_cold, fork))?;

        let size = vm.db.get_account_code(address)?.len();
        vm.current_call_frame.stack.push(U256::from(size))?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `EXTCODECOPY` opcode.
pub struct OpExtCodeCopyHandler;
impl OpcodeHandler for OpExtCodeCopyHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [address, dest_offset, code_offset, size] = *vm.current_call_frame.stack.pop()?;
        let address = word_to_address(address);
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;

        let was_cold = vm.substate.add_accessed_address(address);
        let fork = vm.env.config.fork;
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::extcodecopy(
                size,
                calculate_memory_size(dest_offset, size)?,
                vm.current_call_frame.memory.len(),
                was_cold,
                fork,
            )?)?;

        if size == 0 {
            return Ok(OpcodeResult::Continue);
        }

        let code = vm.db.get_account_code(address)?;
        let data = copy_with_zero_fill(&code.bytecode, code_offset, size);
        vm.current_call_frame.memory.store_data(dest_offset, &data)?;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `EXTCODEHASH` opcode: zero for empty accounts, the
/// code hash otherwise.
pub struct OpExtCodeHashHandler;
impl OpcodeHandler for OpExtCodeHashHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let address = word_to_address(vm.current_call_frame.stack.pop1()?);
        let was_cold = vm.substate.add_accessed_address(address);
        let fork = vm.env.config.fork;
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::extcodehash(was_cold, fork))?;

        let account = vm.db.get_account(address)?;
        if account.is_empty() {
            vm.current_call_frame.stack.push_zero()?;
        } else {
            let hash = U256::from_big_endian(account.info.code_hash.as_bytes());
            vm.current_call_frame.stack.push(hash)?;
        }
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `RETURNDATASIZE` opcode.
pub struct OpReturnDataSizeHandler;
impl OpcodeHandler for OpReturnDataSizeHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::RETURNDATASIZE)?;
        let size = vm.current_call_frame.sub_return_data.len();
        vm.current_call_frame.stack.push(U256::from(size))?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `RETURNDATACOPY` opcode. Unlike the other copy
/// opcodes, reading past the end of return data is a fault.
pub struct OpReturnDataCopyHandler;
impl OpcodeHandler for OpReturnDataCopyHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [dest_offset, data_offset, size] = *vm.current_call_frame.stack.pop()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::returndatacopy(
                calculate_memory_size(dest_offset, size)?,
                vm.current_call_frame.memory.len(),
                size,
            )?)?;

        let data_offset = u256_to_usize(data_offset)
            .map_err(|_| ExceptionalHalt::ReturnDataOutOfBounds)?;
        let end = data_offset
            .checked_add(size)
            .ok_or(ExceptionalHalt::ReturnDataOutOfBounds)?;
        if end > vm.current_call_frame.sub_return_data.len() {
            return Err(ExceptionalHalt::ReturnDataOutOfBounds.into());
        }

        if size == 0 {
            return Ok(OpcodeResult::Continue);
        }

        let data = vm.current_call_frame.sub_return_data[data_offset..end].to_vec();
        vm.current_call_frame.memory.store_data(dest_offset, &data)?;

        Ok(OpcodeResult::Continue)
    }
}

/// Bounded copy out of a byte buffer, zero-filling past its end.
fn copy_with_zero_fill(source: &[u8], offset: U256, size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size];
    if let Ok(offset) = u256_to_usize(offset) {
        if offset < source.len() {
            let available = (source.len() - offset).min(size);
            data[..available].copy_from_slice(&source[offset..offset + available]);
        }
    }
    data
}
