pub mod arithmetic;
pub mod bitwise_comparison;
pub mod block;
pub mod dup;
pub mod environment;
pub mod eof;
pub mod exchange;
pub mod keccak;
pub mod logging;
pub mod push;
pub mod stack_memory_storage_flow;
pub mod system;

use crate::{
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    vm::VM,
};

/// One opcode implementation. Handlers are plain functions over the VM; the
/// dispatch loop owns the shared prologue (fetch, PC advance) and epilogue
/// (halt/error folding).
pub trait OpcodeHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError>;
}

/// Implementation for the `STOP` opcode.
pub struct OpStopHandler;
impl OpcodeHandler for OpStopHandler {
    fn eval(_vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        Ok(OpcodeResult::Halt)
    }
}

/// Implementation for `INVALID` (0xFE) and every unassigned opcode byte.
pub struct OpInvalidHandler;
impl OpcodeHandler for OpInvalidHandler {
    fn eval(_vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        Err(ExceptionalHalt::InvalidOpcode.into())
    }
}
