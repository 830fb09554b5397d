//! # Comparison and bitwise operations
//!
//! Includes the following opcodes:
//!   - `LT`, `GT`, `SLT`, `SGT`, `EQ`, `ISZERO`
//!   - `AND`, `OR`, `XOR`, `NOT`
//!   - `BYTE`, `SHL`, `SHR`, `SAR`

use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    opcode_handlers::OpcodeHandler,
    vm::VM,
};
use ethereum_types::U256;
use std::cmp::Ordering;

/// Signed comparison of two words as two's-complement integers.
fn signed_cmp(lhs: U256, rhs: U256) -> Ordering {
    match (lhs.bit(255), rhs.bit(255)) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        // Same sign: two's-complement order matches unsigned order.
        _ => lhs.cmp(&rhs),
    }
}

fn push_bool(vm: &mut VM<'_>, value: bool) -> Result<(), VMError> {
    if value {
        vm.current_call_frame.stack.push(U256::one())?;
    } else {
        vm.current_call_frame.stack.push_zero()?;
    }
    Ok(())
}

/// Implementation for the `LT` opcode.
pub struct OpLtHandler;
impl OpcodeHandler for OpLtHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::LT)?;
        let [lhs, rhs] = *vm.current_call_frame.stack.pop()?;
        push_bool(vm, lhs < rhs)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `GT` opcode.
pub struct OpGtHandler;
impl OpcodeHandler for OpGtHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::GT)?;
        let [lhs, rhs] = *vm.current_call_frame.stack.pop()?;
        push_bool(vm, lhs > rhs)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `SLT` opcode.
pub struct OpSLtHandler;
impl OpcodeHandler for OpSLtHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::SLT)?;
        let [lhs, rhs] = *vm.current_call_frame.stack.pop()?;
        push_bool(vm, signed_cmp(lhs, rhs) == Ordering::Less)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `SGT` opcode.
pub struct OpSGtHandler;
impl OpcodeHandler for OpSGtHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::SGT)?;
        let [lhs, rhs] = *vm.current_call_frame.stack.pop()?;
        push_bool(vm, signed_cmp(lhs, rhs) == Ordering::Greater)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `EQ` opcode.
pub struct OpEqHandler;
impl OpcodeHandler for OpEqHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::EQ)?;
        let [lhs, rhs] = *vm.current_call_frame.stack.pop()?;
        push_bool(vm, lhs == rhs)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `ISZERO` opcode.
pub struct OpIsZeroHandler;
impl OpcodeHandler for OpIsZeroHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::ISZERO)?;
        let value = vm.current_call_frame.stack.pop1()?;
        push_bool(vm, value.is_zero())?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `AND` opcode.
pub struct OpAndHandler;
impl OpcodeHandler for OpAndHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::AND)?;
        let [lhs, rhs] = *vm.current_call_frame.stack.pop()?;
        vm.current_call_frame.stack.push(lhs & rhs)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `OR` opcode.
pub struct OpOrHandler;
impl OpcodeHandler for OpOrHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::OR)?;
        let [lhs, rhs] = *vm.current_call_frame.stack.pop()?;
        vm.current_call_frame.stack.push(lhs | rhs)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `XOR` opcode.
pub struct OpXorHandler;
impl OpcodeHandler for OpXorHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::XOR)?;
        let [lhs, rhs] = *vm.current_call_frame.stack.pop()?;
        vm.current_call_frame.stack.push(lhs ^ rhs)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `NOT` opcode.
pub struct OpNotHandler;
impl OpcodeHandler for OpNotHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::NOT)?;
        let value = vm.current_call_frame.stack.pop1()?;
        vm.current_call_frame.stack.push(!value)?;
        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `BYTE` opcode: the `index`-th most significant
/// byte of the value, zero when the index runs off the word.
pub struct OpByteHandler;
impl OpcodeHandler for OpByteHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::BYTE)?;
        let [index, value] = *vm.current_call_frame.stack.pop()?;

        match usize::try_from(index) {
            Ok(index) if index < 32 => {
                // U256::byte indexes from the least significant end.
                let byte = value.byte(31 - index);
                vm.current_call_frame.stack.push(U256::from(byte))?;
            }
            _ => vm.current_call_frame.stack.push_zero()?,
        }

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `SHL` opcode; shifts of 256 or more produce zero.
pub struct OpShlHandler;
impl OpcodeHandler for OpShlHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::SHL)?;
        let [shift, value] = *vm.current_call_frame.stack.pop()?;

        if shift < U256::from(256) {
            vm.current_call_frame.stack.push(value << shift.as_usize())?;
        } else {
            vm.current_call_frame.stack.push_zero()?;
        }

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `SHR` opcode; shifts of 256 or more produce zero.
pub struct OpShrHandler;
impl OpcodeHandler for OpShrHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::SHR)?;
        let [shift, value] = *vm.current_call_frame.stack.pop()?;

        if shift < U256::from(256) {
            vm.current_call_frame.stack.push(value >> shift.as_usize())?;
        } else {
            vm.current_call_frame.stack.push_zero()?;
        }

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `SAR` opcode: arithmetic right shift, filling with
/// the sign bit; oversized shifts collapse to all-zeros or all-ones.
pub struct OpSarHandler;
impl OpcodeHandler for OpSarHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::SAR)?;
        let [shift, value] = *vm.current_call_frame.stack.pop()?;

        let negative = value.bit(255);
        let result = if shift < U256::from(256) {
            let shift = shift.as_usize();
            let shifted = value >> shift;
            if negative && shift > 0 {
                // Fill the vacated high bits with ones.
                shifted | (U256::MAX << (256 - shift))
            } else {
                shifted
            }
        } else if negative {
            U256::MAX
        } else {
            U256::zero()
        };
        vm.current_call_frame.stack.push(result)?;

        Ok(OpcodeResult::Continue)
    }
}
