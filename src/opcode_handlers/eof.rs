//! # EOF-only operations
//!
//! Includes the following opcodes:
//!   - `RJUMP`, `RJUMPI`, `RJUMPV`
//!   - `CALLF`, `RETF`, `JUMPF`
//!   - `DUPN`, `SWAPN`, `EXCHANGE`
//!   - `DATALOAD`, `DATALOADN`, `DATASIZE`, `DATACOPY`
//!   - `RETURNDATALOAD`
//!   - `EXTCALL`, `EXTDELEGATECALL`, `EXTSTATICCALL`
//!   - `EOFCREATE`, `RETURNCONTRACT`
//!
//! Immediates and jump targets were proven well-formed by container
//! validation, so the handlers only enforce the runtime rules (gas, return
//! stack depth, operand stack headroom on section calls).

use crate::{
    call_frame::{CallFrame, ReturnStackFrame},
    code::{eof, Code},
    constants::{
        EXTCALL_REVERTED, FAIL, MAX_CALL_DEPTH, MIN_CALLEE_GAS, MIN_RETAINED_GAS,
        RETURN_STACK_LIMIT, WORD_SIZE_IN_BYTES_USIZE,
    },
    errors::{ExceptionalHalt, InternalError, OpcodeResult, VMError},
    gas_cost,
    gas_schedule::GasSchedule,
    memory::calculate_memory_size,
    opcode_handlers::OpcodeHandler,
    tracing::CallType,
    utils::{calculate_create2_address, size_offset_to_usize, u256_to_usize, word_to_address},
    vm::VM,
};
use bytes::Bytes;
use ethereum_types::U256;
use std::sync::Arc;

fn read_u8(frame: &CallFrame) -> u8 {
    frame.code_bytes().get(frame.pc).copied().unwrap_or(0)
}

fn read_u16(frame: &CallFrame, at: usize) -> u16 {
    let code = frame.code_bytes();
    u16::from_be_bytes([
        code.get(at).copied().unwrap_or(0),
        code.get(at + 1).copied().unwrap_or(0),
    ])
}

fn read_i16(frame: &CallFrame, at: usize) -> i16 {
    read_u16(frame, at) as i16
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

/// Implementation for the `RJUMP` opcode: unconditional relative jump.
pub struct OpRJumpHandler;
impl OpcodeHandler for OpRJumpHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::RJUMP)?;

        let frame = &mut vm.current_call_frame;
        let rel = read_i16(frame, frame.pc);
        frame.pc = (frame.pc as i64 + 2 + rel as i64) as usize;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `RJUMPI` opcode.
pub struct OpRJumpIHandler;
impl OpcodeHandler for OpRJumpIHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::RJUMPI)?;

        let condition = vm.current_call_frame.stack.pop1()?;
        let frame = &mut vm.current_call_frame;
        let rel = if condition.is_zero() {
            0
        } else {
            read_i16(frame, frame.pc) as i64
        };
        frame.pc = (frame.pc as i64 + 2 + rel) as usize;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `RJUMPV` opcode: jump table indexed by the popped
/// case; out-of-range cases fall through.
pub struct OpRJumpVHandler;
impl OpcodeHandler for OpRJumpVHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::RJUMPV)?;

        let case = vm.current_call_frame.stack.pop1()?;
        let frame = &mut vm.current_call_frame;
        let max_index = read_u8(frame) as usize;
        let table_end = frame.pc + 1 + 2 * (max_index + 1);

        let rel = match usize::try_from(case) {
            Ok(case) if case <= max_index => read_i16(frame, frame.pc + 1 + 2 * case) as i64,
            _ => 0,
        };
        frame.pc = (table_end as i64 + rel) as usize;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `CALLF` opcode: call into another code section
/// through the return stack.
pub struct OpCallFHandler;
impl OpcodeHandler for OpCallFHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::CALLF)?;

        let frame = &mut vm.current_call_frame;
        let target = read_u16(frame, frame.pc) as usize;
        let container = frame
            .bytecode
            .eof
            .as_ref()
            .ok_or(ExceptionalHalt::InvalidOpcode)?;
        let callee = container.types[target];

        if frame.return_stack.len() >= RETURN_STACK_LIMIT {
            return Err(ExceptionalHalt::StackOverflow.into());
        }
        // Validation proved per-section bounds; the cross-section headroom
        // is a runtime property.
        let headroom = (callee.max_stack_height as usize).saturating_sub(callee.inputs as usize);
        if frame.stack.len() + headroom > crate::constants::STACK_LIMIT {
            return Err(ExceptionalHalt::StackOverflow.into());
        }

        frame.return_stack.push(ReturnStackFrame {
            code_section: frame.code_section,
            pc: frame.pc + 2,
        });
        frame.code_section = target;
        frame.pc = 0;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `RETF` opcode.
pub struct OpRetFHandler;
impl OpcodeHandler for OpRetFHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::RETF)?;

        let frame = &mut vm.current_call_frame;
        let caller = frame
            .return_stack
            .pop()
            .ok_or(ExceptionalHalt::InvalidOpcode)?;
        frame.code_section = caller.code_section;
        frame.pc = caller.pc;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `JUMPF` opcode: tail-call into another section
/// without growing the return stack.
pub struct OpJumpFHandler;
impl OpcodeHandler for OpJumpFHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::JUMPF)?;

        let frame = &mut vm.current_call_frame;
        let target = read_u16(frame, frame.pc) as usize;
        let container = frame
            .bytecode
            .eof
            .as_ref()
            .ok_or(ExceptionalHalt::InvalidOpcode)?;
        let callee = container.types[target];

        let headroom = (callee.max_stack_height as usize).saturating_sub(callee.inputs as usize);
        if frame.stack.len() + headroom > crate::constants::STACK_LIMIT {
            return Err(ExceptionalHalt::StackOverflow.into());
        }

        frame.code_section = target;
        frame.pc = 0;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `DUPN` opcode: duplicate the `(imm + 1)`-th item.
pub struct OpDupNHandler;
impl OpcodeHandler for OpDupNHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::DUPN)?;

        let frame = &mut vm.current_call_frame;
        let depth = read_u8(frame) as usize;
        frame.stack.dup(depth)?;
        frame.pc += 1;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `SWAPN` opcode: swap the top with the
/// `(imm + 2)`-th item.
pub struct OpSwapNHandler;
impl OpcodeHandler for OpSwapNHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::SWAPN)?;

        let frame = &mut vm.current_call_frame;
        let depth = read_u8(frame) as usize + 1;
        frame.stack.swap(depth)?;
        frame.pc += 1;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `EXCHANGE` opcode: swap the `(n + 1)`-th and
/// `(n + m + 1)`-th items, with n and m encoded in the immediate nibbles.
pub struct OpExchangeHandler;
impl OpcodeHandler for OpExchangeHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::EXCHANGE)?;

        let frame = &mut vm.current_call_frame;
        let imm = read_u8(frame);
        let n = (imm >> 4) as usize + 1;
        let m = (imm & 0x0F) as usize + 1;
        frame.stack.exchange(n, n + m)?;
        frame.pc += 1;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `DATALOAD` opcode: a word from the data section,
/// zero-padded past its end.
pub struct OpDataLoadHandler;
impl OpcodeHandler for OpDataLoadHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::DATALOAD)?;

        let offset = vm.current_call_frame.stack.pop1()?;
        let frame = &mut vm.current_call_frame;
        let container = frame
            .bytecode
            .eof
            .as_ref()
            .ok_or(ExceptionalHalt::InvalidOpcode)?;
        let word = copy_with_zero_fill(&container.data, offset, WORD_SIZE_IN_BYTES_USIZE);
        frame.stack.push(U256::from_big_endian(&word))?;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `DATALOADN` opcode; the immediate offset was
/// bounds-checked by validation.
pub struct OpDataLoadNHandler;
impl OpcodeHandler for OpDataLoadNHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::DATALOADN)?;

        let frame = &mut vm.current_call_frame;
        let offset = read_u16(frame, frame.pc) as usize;
        let container = frame
            .bytecode
            .eof
            .as_ref()
            .ok_or(ExceptionalHalt::InvalidOpcode)?;
        let word = copy_with_zero_fill(
            &container.data,
            U256::from(offset),
            WORD_SIZE_IN_BYTES_USIZE,
        );
        frame.stack.push(U256::from_big_endian(&word))?;
        frame.pc += 2;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `DATASIZE` opcode.
pub struct OpDataSizeHandler;
impl OpcodeHandler for OpDataSizeHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::DATASIZE)?;

        let frame = &mut vm.current_call_frame;
        let size = frame
            .bytecode
            .eof
            .as_ref()
            .map(|container| container.data.len())
            .unwrap_or(0);
        frame.stack.push(U256::from(size))?;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `DATACOPY` opcode.
pub struct OpDataCopyHandler;
impl OpcodeHandler for OpDataCopyHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [mem_offset, data_offset, size] = *vm.current_call_frame.stack.pop()?;
        let (size, mem_offset) = size_offset_to_usize(size, mem_offset)?;

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::datacopy(
                calculate_memory_size(mem_offset, size)?,
                vm.current_call_frame.memory.len(),
                size,
            )?)?;

        if size == 0 {
            return Ok(OpcodeResult::Continue);
        }

        let frame = &mut vm.current_call_frame;
        let container = frame
            .bytecode
            .eof
            .as_ref()
            .ok_or(ExceptionalHalt::InvalidOpcode)?;
        let data = copy_with_zero_fill(&container.data, data_offset, size);
        frame.memory.store_data(mem_offset, &data)?;

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `RETURNDATALOAD` opcode: a word of the last
/// subcall's return data, zero-padded.
pub struct OpReturnDataLoadHandler;
impl OpcodeHandler for OpReturnDataLoadHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::RETURNDATALOAD)?;

        let offset = vm.current_call_frame.stack.pop1()?;
        let frame = &mut vm.current_call_frame;
        let word = copy_with_zero_fill(&frame.sub_return_data, offset, WORD_SIZE_IN_BYTES_USIZE);
        frame.stack.push(U256::from_big_endian(&word))?;

        Ok(OpcodeResult::Continue)
    }
}

/// What an EXT*CALL does differently from its siblings.
enum ExtCallKind {
    Call,
    DelegateCall,
    StaticCall,
}

/// Shared body of the EXT*CALL family ([EIP-7069]): full-word target with a
/// range check, no gas argument (the callee gets everything above the
/// retained 1/64), status-code results, return data via RETURNDATA* only.
fn ext_call(vm: &mut VM<'_>, kind: ExtCallKind) -> Result<OpcodeResult, VMError> {
    let target_word = vm.current_call_frame.stack.pop1()?;
    let [args_offset, args_size] = *vm.current_call_frame.stack.pop()?;
    let value = match kind {
        ExtCallKind::Call => vm.current_call_frame.stack.pop1()?,
        _ => U256::zero(),
    };
    let (args_size, args_offset) = size_offset_to_usize(args_size, args_offset)?;

    // The target is a full stack word; anything above 2^160 - 1 faults.
    if target_word > U256::from_big_endian(&[0xff; 20]) {
        return Err(ExceptionalHalt::AddressOutOfRange.into());
    }
    let target = word_to_address(target_word);

    if vm.current_call_frame.is_static && !value.is_zero() {
        return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
    }

    let fork = vm.env.config.fork;
    let schedule = GasSchedule::for_fork(fork);

    let address_was_cold = vm.substate.add_accessed_address(target);
    let callee_is_empty = vm.db.get_account(target)?.is_empty();

    let new_memory_size = calculate_memory_size(args_offset, args_size)?;
    let memory_expansion = crate::memory::expansion_cost(
        new_memory_size,
        vm.current_call_frame.memory.len(),
    )?;

    let mut base_cost = memory_expansion
        .checked_add(schedule.call_cost(address_was_cold))
        .ok_or(ExceptionalHalt::OutOfGas)?;
    if !value.is_zero() {
        base_cost = base_cost
            .checked_add(gas_cost::CALL_POSITIVE_VALUE)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        if callee_is_empty {
            base_cost = base_cost
                .checked_add(schedule.call_new_account)
                .ok_or(ExceptionalHalt::OutOfGas)?;
        }
    }
    vm.current_call_frame.increase_consumed_gas(base_cost)?;
    vm.current_call_frame.memory.resize(new_memory_size)?;

    let data = vm.get_calldata(args_offset, args_size)?;

    // Retained-gas rule: the caller keeps at least 1/64 of what remains and
    // never less than the retained floor.
    let remaining = vm.current_call_frame.gas_remaining.max(0) as u64;
    let retained = (remaining / 64).max(MIN_RETAINED_GAS);
    let gas_limit = remaining.saturating_sub(retained);

    let sender_balance = vm
        .db
        .get_account(vm.current_call_frame.to)?
        .info
        .balance;
    let depth_exceeded = vm.current_call_frame.depth + 1 > MAX_CALL_DEPTH;

    if gas_limit < MIN_CALLEE_GAS || sender_balance < value || depth_exceeded {
        // Light failure: no child frame, status 1.
        vm.current_call_frame.sub_return_data = Bytes::new();
        vm.current_call_frame.stack.push(EXTCALL_REVERTED)?;
        return Ok(OpcodeResult::Continue);
    }

    let bytecode = vm.db.get_account_code(target)?;

    let (call_type, msg_sender, to, code_address, msg_value, should_transfer, is_static) =
        match kind {
            ExtCallKind::Call => (
                CallType::ExtCall,
                vm.current_call_frame.to,
                target,
                target,
                value,
                true,
                vm.current_call_frame.is_static,
            ),
            ExtCallKind::DelegateCall => {
                // Only EOF code may run in the caller's context.
                if !bytecode.is_eof() {
                    vm.current_call_frame.sub_return_data = Bytes::new();
                    vm.current_call_frame.stack.push(EXTCALL_REVERTED)?;
                    return Ok(OpcodeResult::Continue);
                }
                (
                    CallType::ExtDelegateCall,
                    vm.current_call_frame.msg_sender,
                    vm.current_call_frame.to,
                    target,
                    vm.current_call_frame.msg_value,
                    false,
                    vm.current_call_frame.is_static,
                )
            }
            ExtCallKind::StaticCall => (
                CallType::ExtStaticCall,
                vm.current_call_frame.to,
                target,
                target,
                U256::zero(),
                true,
                true,
            ),
        };

    vm.current_call_frame.increase_consumed_gas(gas_limit)?;
    vm.tracer_enter(call_type, msg_sender, to, msg_value, gas_limit, &data);

    // The reserved gas was already charged; the unused part flows back when
    // the child returns.
    let result = vm.generic_call(
        gas_limit,
        msg_value,
        msg_sender,
        to,
        code_address,
        should_transfer,
        is_static,
        data,
        0,
        0,
        bytecode,
        true,
    )?;
    Ok(result)
}

pub struct OpExtCallHandler;
impl OpcodeHandler for OpExtCallHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        ext_call(vm, ExtCallKind::Call)
    }
}

pub struct OpExtDelegateCallHandler;
impl OpcodeHandler for OpExtDelegateCallHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        ext_call(vm, ExtCallKind::DelegateCall)
    }
}

pub struct OpExtStaticCallHandler;
impl OpcodeHandler for OpExtStaticCallHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        ext_call(vm, ExtCallKind::StaticCall)
    }
}

/// Implementation for the `EOFCREATE` opcode ([EIP-7620]): instantiate a
/// validated subcontainer with a salt, CREATE2-style.
pub struct OpEofCreateHandler;
impl OpcodeHandler for OpEofCreateHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let container_index = read_u8(&vm.current_call_frame) as usize;
        vm.current_call_frame.pc += 1;

        let [value, salt, input_offset, input_size] = *vm.current_call_frame.stack.pop()?;
        let (input_size, input_offset) = size_offset_to_usize(input_size, input_offset)?;

        if vm.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let initcontainer = {
            let container = vm
                .current_call_frame
                .bytecode
                .eof
                .as_ref()
                .ok_or(ExceptionalHalt::InvalidOpcode)?;
            container
                .subcontainers
                .get(container_index)
                .ok_or(ExceptionalHalt::InvalidOpcode)?
                .clone()
        };

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::eofcreate(
                calculate_memory_size(input_offset, input_size)?,
                vm.current_call_frame.memory.len(),
                initcontainer.len(),
            )?)?;

        vm.current_call_frame.sub_return_data = Bytes::new();

        let fork = vm.env.config.fork;
        let gas_limit = gas_cost::max_message_call_gas(
            vm.current_call_frame.gas_remaining.max(0) as u64,
            fork,
        );
        vm.current_call_frame.increase_consumed_gas(gas_limit)?;

        let calldata = vm.get_calldata(input_offset, input_size)?;

        let deployer = vm.current_call_frame.to;
        let (deployer_balance, deployer_nonce) = {
            let account = vm.db.get_account(deployer)?;
            (account.info.balance, account.info.nonce)
        };
        let new_address = calculate_create2_address(deployer, &initcontainer, salt);
        vm.substate.add_accessed_address(new_address);

        vm.tracer_enter(
            CallType::EofCreate,
            deployer,
            new_address,
            value,
            gas_limit,
            &calldata,
        );

        let new_depth = vm
            .current_call_frame
            .depth
            .checked_add(1)
            .ok_or(InternalError::Overflow)?;

        let checks = [
            (deployer_balance < value, "OutOfFund"),
            (new_depth > MAX_CALL_DEPTH, "MaxDepth"),
            (deployer_nonce == u64::MAX, "MaxNonce"),
        ];
        for (condition, reason) in checks {
            if condition {
                vm.early_revert_message_call(gas_limit, reason.to_string())?;
                return Ok(OpcodeResult::Continue);
            }
        }

        vm.increment_account_nonce(deployer)?;

        if vm.db.get_account(new_address)?.create_would_collide() {
            vm.current_call_frame.stack.push(FAIL)?;
            vm.tracer_exit_early(gas_limit, Some("CreateAccExists".to_string()))?;
            return Ok(OpcodeResult::Continue);
        }

        // Subcontainers were validated with the factory, so this parse only
        // fails if state is corrupt.
        let parsed = eof::EofContainer::parse(initcontainer)
            .map_err(|_| ExceptionalHalt::InvalidEofContainer)?;

        let mut stack = vm.stack_pool.pop().unwrap_or_default();
        stack.clear();
        let next_memory = vm.current_call_frame.memory.next_memory();

        let new_call_frame = CallFrame::new(
            deployer,
            new_address,
            new_address,
            Code::from_eof(Arc::new(parsed)),
            value,
            calldata,
            false,
            gas_limit,
            new_depth,
            true,
            true,
            0,
            0,
            stack,
            next_memory,
        );
        vm.add_callframe(new_call_frame);

        vm.get_account_mut(new_address)?
            .mark(crate::account::AccountStatus::Created);
        vm.increment_account_nonce(new_address)?;
        vm.transfer(deployer, new_address, value)?;

        vm.substate.push_backup();
        vm.substate.add_created_account(new_address);

        Ok(OpcodeResult::Continue)
    }
}

/// Implementation for the `RETURNCONTRACT` opcode ([EIP-7620]): terminate
/// initcontainer execution by deploying a subcontainer with aux data
/// appended to its data section.
pub struct OpReturnContractHandler;
impl OpcodeHandler for OpReturnContractHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let container_index = read_u8(&vm.current_call_frame) as usize;
        vm.current_call_frame.pc += 1;

        let [aux_offset, aux_size] = *vm.current_call_frame.stack.pop()?;
        let (aux_size, aux_offset) = size_offset_to_usize(aux_size, aux_offset)?;

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::exit_opcode(
                calculate_memory_size(aux_offset, aux_size)?,
                vm.current_call_frame.memory.len(),
            )?)?;

        let aux_data = vm.current_call_frame.memory.load_range(aux_offset, aux_size)?;

        let frame = &mut vm.current_call_frame;
        let container = frame
            .bytecode
            .eof
            .as_ref()
            .ok_or(ExceptionalHalt::InvalidOpcode)?;
        let deploy_container = container
            .subcontainers
            .get(container_index)
            .ok_or(ExceptionalHalt::InvalidOpcode)?;

        let parsed = eof::EofContainer::parse(deploy_container.clone())
            .map_err(|_| ExceptionalHalt::InvalidEofContainer)?;

        let final_data_size = parsed
            .data
            .len()
            .checked_add(aux_data.len())
            .ok_or(ExceptionalHalt::OutOfBounds)?;
        if final_data_size < parsed.declared_data_size || final_data_size > u16::MAX as usize {
            return Err(ExceptionalHalt::InvalidEofContainer.into());
        }

        // Assemble the deployed container and fix the header's data size to
        // the final length.
        let mut deployed = deploy_container.to_vec();
        deployed.extend_from_slice(&aux_data);
        eof::patch_data_size(&mut deployed, final_data_size as u16)
            .map_err(|_| ExceptionalHalt::InvalidEofContainer)?;

        frame.output = Bytes::from(deployed);

        Ok(OpcodeResult::Halt)
    }
}
