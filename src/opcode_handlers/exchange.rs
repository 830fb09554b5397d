//! # Exchange operations
//!
//! Opcodes `SWAP1`..`SWAP16`.

use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    opcode_handlers::OpcodeHandler,
    vm::VM,
};

/// Generic `SWAPN` implementation; `SWAP1` exchanges the top two items.
pub struct OpSwapHandler<const DEPTH: usize>;
impl<const DEPTH: usize> OpcodeHandler for OpSwapHandler<DEPTH> {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::SWAPN)?;
        vm.current_call_frame.stack.swap(DEPTH)?;
        Ok(OpcodeResult::Continue)
    }
}
