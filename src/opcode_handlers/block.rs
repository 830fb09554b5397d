//! # Block information
//!
//! Includes the following opcodes:
//!   - `BLOCKHASH`, `COINBASE`, `TIMESTAMP`, `NUMBER`, `PREVRANDAO`
//!   - `GASLIMIT`, `CHAINID`, `BASEFEE`, `BLOBHASH`, `BLOBBASEFEE`

use crate::{
    constants::LAST_AVAILABLE_BLOCK_LIMIT,
    environment::Fork,
    errors::{OpcodeResult, VMError},
    gas_cost,
    opcode_handlers::OpcodeHandler,
    utils::address_to_word,
    vm::VM,
};
use ethereum_types::U256;

/// Implementation for the `BLOCKHASH` opcode: hashes are served for the 256
/// most recent blocks, anything else reads as zero.
pub struct OpBlockHashHandler;
impl OpcodeHandler for OpBlockHashHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::BLOCKHASH)?;

        let requested = vm.current_call_frame.stack.pop1()?;
        let current = vm.env.block_number;

        let in_range = requested < current
            && requested
                >= current.saturating_sub(U256::from(LAST_AVAILABLE_BLOCK_LIMIT));
        let requested = match u64::try_from(requested) {
            Ok(number) if in_range => number,
            _ => {
                vm.current_call_frame.stack.push_zero()?;
                return Ok(OpcodeResult::Continue);
            }
        };

        let hash = vm.db.store.get_block_hash(requested)?;
        vm.current_call_frame
            .stack
            .push(U256::from_big_endian(hash.as_bytes()))?;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `COINBASE` opcode.
pub struct OpCoinbaseHandler;
impl OpcodeHandler for OpCoinbaseHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::COINBASE)?;
        let coinbase = vm.env.coinbase;
        vm.current_call_frame.stack.push(address_to_word(coinbase))?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `TIMESTAMP` opcode.
pub struct OpTimestampHandler;
impl OpcodeHandler for OpTimestampHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::TIMESTAMP)?;
        let timestamp = vm.env.timestamp;
        vm.current_call_frame.stack.push(timestamp)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `NUMBER` opcode.
pub struct OpNumberHandler;
impl OpcodeHandler for OpNumberHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::NUMBER)?;
        let number = vm.env.block_number;
        vm.current_call_frame.stack.push(number)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for opcode 0x44: DIFFICULTY until Paris, PREVRANDAO after
/// the merge.
pub struct OpPrevRandaoHandler;
impl OpcodeHandler for OpPrevRandaoHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::PREVRANDAO)?;
        let value = if vm.env.config.fork >= Fork::Paris {
            U256::from_big_endian(vm.env.prev_randao.as_bytes())
        } else {
            vm.env.difficulty
        };
        vm.current_call_frame.stack.push(value)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `GASLIMIT` opcode (the block's, not the frame's).
pub struct OpGasLimitHandler;
impl OpcodeHandler for OpGasLimitHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::GASLIMIT)?;
        let gas_limit = vm.env.block_gas_limit;
        vm.current_call_frame.stack.push(U256::from(gas_limit))?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `CHAINID` opcode ([EIP-1344], Istanbul).
pub struct OpChainIdHandler;
impl OpcodeHandler for OpChainIdHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::CHAINID)?;
        let chain_id = vm.env.config.chain_id;
        vm.current_call_frame.stack.push(U256::from(chain_id))?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `BASEFEE` opcode ([EIP-3198], London).
pub struct OpBaseFeeHandler;
impl OpcodeHandler for OpBaseFeeHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::BASEFEE)?;
        let base_fee = vm.env.base_fee_per_gas;
        vm.current_call_frame.stack.push(base_fee)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `BLOBHASH` opcode ([EIP-4844], Cancun): the
/// transaction's versioned hash at the given index, zero when out of range.
pub struct OpBlobHashHandler;
impl OpcodeHandler for OpBlobHashHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::BLOBHASH)?;

        let index = vm.current_call_frame.stack.pop1()?;
        let hash = usize::try_from(index)
            .ok()
            .and_then(|i| vm.tx.blob_versioned_hashes.get(i))
            .copied();

        match hash {
            Some(hash) => vm
                .current_call_frame
                .stack
                .push(U256::from_big_endian(hash.as_bytes()))?,
            None => vm.current_call_frame.stack.push_zero()?,
        }
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `BLOBBASEFEE` opcode ([EIP-7516], Cancun).
pub struct OpBlobBaseFeeHandler;
impl OpcodeHandler for OpBlobBaseFeeHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::BLOBBASEFEE)?;
        let blob_base_fee = vm.env.blob_base_fee;
        vm.current_call_frame.stack.push(blob_base_fee)?;
        Ok(OpcodeResult::Continue)
    }
}
