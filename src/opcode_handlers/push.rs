//! # Push operations
//!
//! Opcodes `PUSH0` and `PUSH1`..`PUSH32`.

use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    opcode_handlers::OpcodeHandler,
    vm::VM,
};
use ethereum_types::U256;

/// Generic `PUSHN` implementation, monomorphized per immediate width.
///
/// Immediates that run past the end of code are zero-padded, as if the code
/// were followed by infinite zero bytes.
pub struct OpPushHandler<const N: usize>;
impl<const N: usize> OpcodeHandler for OpPushHandler<N> {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = &mut vm.current_call_frame;
        frame.increase_consumed_gas(gas_cost::PUSHN)?;

        let pc = frame.pc;
        let code = frame.code_bytes();
        let value = match code.get(pc..pc + N) {
            Some(immediate) => U256::from_big_endian(immediate),
            None => {
                // Partial immediate at the end of code: take what is there,
                // keep the zero padding on the right.
                let available = code.get(pc..).unwrap_or_default();
                let mut padded = [0u8; 32];
                padded[32 - N..32 - N + available.len()].copy_from_slice(available);
                U256::from_big_endian(&padded[32 - N..])
            }
        };

        frame.stack.push(value)?;
        frame.pc = pc + N;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `PUSH0` opcode ([EIP-3855], Shanghai).
pub struct OpPush0Handler;
impl OpcodeHandler for OpPush0Handler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::PUSH0)?;
        vm.current_call_frame.stack.push_zero()?;
        Ok(OpcodeResult::Continue)
    }
}
