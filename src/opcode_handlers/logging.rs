//! # Logging operations
//!
//! Opcodes `LOG0`..`LOG4`.

use crate::{
    call_frame::Log,
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    opcode_handlers::OpcodeHandler,
    utils::{size_offset_to_usize, u256_to_h256},
    vm::VM,
};
use bytes::Bytes;

/// Generic `LOGN` implementation over the topic count.
pub struct OpLogHandler<const N: usize>;
impl<const N: usize> OpcodeHandler for OpLogHandler<N> {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        if vm.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let [offset, size] = *vm.current_call_frame.stack.pop()?;
        let (size, offset) = size_offset_to_usize(size, offset)?;

        let mut topics = Vec::with_capacity(N);
        for _ in 0..N {
            topics.push(u256_to_h256(vm.current_call_frame.stack.pop1()?));
        }

        vm.current_call_frame.increase_consumed_gas(gas_cost::log(
            calculate_memory_size(offset, size)?,
            vm.current_call_frame.memory.len(),
            size,
            N,
        )?)?;

        let data = vm.current_call_frame.memory.load_range(offset, size)?;
        let log = Log {
            address: vm.current_call_frame.to,
            topics,
            data: Bytes::from(data),
        };
        vm.tracer.borrow_mut().log(&log);
        vm.substate.add_log(log);

        Ok(OpcodeResult::Continue)
    }
}
