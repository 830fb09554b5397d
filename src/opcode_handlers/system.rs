//! # System operations
//!
//! Includes the following opcodes:
//!   - `CALL`, `CALLCODE`, `DELEGATECALL`, `STATICCALL`
//!   - `CREATE`, `CREATE2`
//!   - `RETURN`, `REVERT`, `SELFDESTRUCT`

use crate::{
    call_frame::CallFrame,
    code::Code,
    constants::{FAIL, INIT_CODE_MAX_SIZE, MAX_CALL_DEPTH, SUCCESS},
    environment::Fork,
    errors::{ContextResult, ExceptionalHalt, InternalError, OpcodeResult, TxResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    opcode_handlers::OpcodeHandler,
    precompiles,
    tracing::CallType,
    utils::{
        address_to_word, calculate_create2_address, calculate_create_address, size_offset_to_usize,
        word_to_address,
    },
    vm::VM,
};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};

pub struct OpCallHandler;
impl OpcodeHandler for OpCallHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [gas, callee, value, args_offset, args_len, ret_offset, ret_len] =
            *vm.current_call_frame.stack.pop()?;
        let callee = word_to_address(callee);
        let (args_len, args_offset) = size_offset_to_usize(args_len, args_offset)?;
        let (ret_len, ret_offset) = size_offset_to_usize(ret_len, ret_offset)?;

        if vm.current_call_frame.is_static && !value.is_zero() {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let (new_memory_size, address_is_empty, address_was_cold, address_exists) =
            vm.get_call_gas_params(args_offset, args_len, ret_offset, ret_len, callee)?;
        let fork = vm.env.config.fork;
        let (gas_cost, gas_limit) = gas_cost::call(
            new_memory_size,
            vm.current_call_frame.memory.len(),
            address_was_cold,
            address_is_empty,
            address_exists,
            value,
            gas,
            vm.current_call_frame.gas_remaining.max(0) as u64,
            fork,
        )?;
        vm.current_call_frame.increase_consumed_gas(gas_cost)?;

        // Expand memory now: the return area must exist before the child
        // frame runs.
        vm.current_call_frame.memory.resize(new_memory_size)?;

        let data = vm.get_calldata(args_offset, args_len)?;
        let bytecode = vm.db.get_account_code(callee)?;
        let from = vm.current_call_frame.to;
        vm.tracer_enter(CallType::Call, from, callee, value, gas_limit, &data);

        vm.generic_call(
            gas_limit, value, from, callee, callee, true,
            vm.current_call_frame.is_static,
            data, ret_offset, ret_len, bytecode, false,
        )
    }
}

pub struct OpCallCodeHandler;
impl OpcodeHandler for OpCallCodeHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [gas, address, value, args_offset, args_len, ret_offset, ret_len] =
            *vm.current_call_frame.stack.pop()?;
        let address = word_to_address(address);
        let (args_len, args_offset) = size_offset_to_usize(args_len, args_offset)?;
        let (ret_len, ret_offset) = size_offset_to_usize(ret_len, ret_offset)?;

        let (new_memory_size, _, address_was_cold, _) =
            vm.get_call_gas_params(args_offset, args_len, ret_offset, ret_len, address)?;
        let fork = vm.env.config.fork;
        let (gas_cost, gas_limit) = gas_cost::callcode(
            new_memory_size,
            vm.current_call_frame.memory.len(),
            address_was_cold,
            value,
            gas,
            vm.current_call_frame.gas_remaining.max(0) as u64,
            fork,
        )?;
        vm.current_call_frame.increase_consumed_gas(gas_cost)?;
        vm.current_call_frame.memory.resize(new_memory_size)?;

        let data = vm.get_calldata(args_offset, args_len)?;
        let bytecode = vm.db.get_account_code(address)?;
        // CALLCODE runs foreign code against the caller's own account.
        let to = vm.current_call_frame.to;
        vm.tracer_enter(CallType::CallCode, to, to, value, gas_limit, &data);

        vm.generic_call(
            gas_limit, value, to, to, address, true,
            vm.current_call_frame.is_static,
            data, ret_offset, ret_len, bytecode, false,
        )
    }
}

pub struct OpDelegateCallHandler;
impl OpcodeHandler for OpDelegateCallHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [gas, address, args_offset, args_len, ret_offset, ret_len] =
            *vm.current_call_frame.stack.pop()?;
        let address = word_to_address(address);
        let (args_len, args_offset) = size_offset_to_usize(args_len, args_offset)?;
        let (ret_len, ret_offset) = size_offset_to_usize(ret_len, ret_offset)?;

        let (new_memory_size, _, address_was_cold, _) =
            vm.get_call_gas_params(args_offset, args_len, ret_offset, ret_len, address)?;
        let fork = vm.env.config.fork;
        let (gas_cost, gas_limit) = gas_cost::delegatecall(
            new_memory_size,
            vm.current_call_frame.memory.len(),
            address_was_cold,
            gas,
            vm.current_call_frame.gas_remaining.max(0) as u64,
            fork,
        )?;
        vm.current_call_frame.increase_consumed_gas(gas_cost)?;
        vm.current_call_frame.memory.resize(new_memory_size)?;

        let data = vm.get_calldata(args_offset, args_len)?;
        let bytecode = vm.db.get_account_code(address)?;

        // Legacy code cannot take EOF code as its own.
        if bytecode.is_eof() {
            vm.early_revert_message_call(gas_limit, "DelegateToEofCode".to_string())?;
            return Ok(OpcodeResult::Continue);
        }

        let msg_sender = vm.current_call_frame.msg_sender;
        let to = vm.current_call_frame.to;
        let msg_value = vm.current_call_frame.msg_value;
        vm.tracer_enter(CallType::DelegateCall, msg_sender, to, msg_value, gas_limit, &data);

        vm.generic_call(
            gas_limit, msg_value, msg_sender, to, address, false,
            vm.current_call_frame.is_static,
            data, ret_offset, ret_len, bytecode, false,
        )
    }
}

pub struct OpStaticCallHandler;
impl OpcodeHandler for OpStaticCallHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [gas, address, args_offset, args_len, ret_offset, ret_len] =
            *vm.current_call_frame.stack.pop()?;
        let address = word_to_address(address);
        let (args_len, args_offset) = size_offset_to_usize(args_len, args_offset)?;
        let (ret_len, ret_offset) = size_offset_to_usize(ret_len, ret_offset)?;

        let (new_memory_size, _, address_was_cold, _) =
            vm.get_call_gas_params(args_offset, args_len, ret_offset, ret_len, address)?;
        let fork = vm.env.config.fork;
        let (gas_cost, gas_limit) = gas_cost::staticcall(
            new_memory_size,
            vm.current_call_frame.memory.len(),
            address_was_cold,
            gas,
            vm.current_call_frame.gas_remaining.max(0) as u64,
            fork,
        )?;
        vm.current_call_frame.increase_consumed_gas(gas_cost)?;
        vm.current_call_frame.memory.resize(new_memory_size)?;

        let data = vm.get_calldata(args_offset, args_len)?;
        let bytecode = vm.db.get_account_code(address)?;
        let from = vm.current_call_frame.to;
        vm.tracer_enter(CallType::StaticCall, from, address, U256::zero(), gas_limit, &data);

        vm.generic_call(
            gas_limit,
            U256::zero(),
            from,
            address,
            address,
            true,
            true,
            data,
            ret_offset,
            ret_len,
            bytecode,
            false,
        )
    }
}

pub struct OpReturnHandler;
impl OpcodeHandler for OpReturnHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [offset, len] = *vm.current_call_frame.stack.pop()?;
        let (len, offset) = size_offset_to_usize(len, offset)?;

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::exit_opcode(
                calculate_memory_size(offset, len)?,
                vm.current_call_frame.memory.len(),
            )?)?;

        if len != 0 {
            let data = vm.current_call_frame.memory.load_range(offset, len)?;
            vm.current_call_frame.output = Bytes::from(data);
        }

        Ok(OpcodeResult::Halt)
    }
}

pub struct OpRevertHandler;
impl OpcodeHandler for OpRevertHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [offset, len] = *vm.current_call_frame.stack.pop()?;
        let (len, offset) = size_offset_to_usize(len, offset)?;

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::exit_opcode(
                calculate_memory_size(offset, len)?,
                vm.current_call_frame.memory.len(),
            )?)?;

        if len != 0 {
            let data = vm.current_call_frame.memory.load_range(offset, len)?;
            vm.current_call_frame.output = Bytes::from(data);
        }

        Err(VMError::RevertOpcode)
    }
}

pub struct OpCreateHandler;
impl OpcodeHandler for OpCreateHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [value, code_offset, code_len] = *vm.current_call_frame.stack.pop()?;
        let (code_len, code_offset) = size_offset_to_usize(code_len, code_offset)?;

        let fork = vm.env.config.fork;
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::create(
                calculate_memory_size(code_offset, code_len)?,
                vm.current_call_frame.memory.len(),
                code_len,
                fork,
            )?)?;

        vm.generic_create(value, code_offset, code_len, None)
    }
}

pub struct OpCreate2Handler;
impl OpcodeHandler for OpCreate2Handler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [value, code_offset, code_len, salt] = *vm.current_call_frame.stack.pop()?;
        let (code_len, code_offset) = size_offset_to_usize(code_len, code_offset)?;

        let fork = vm.env.config.fork;
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::create_2(
                calculate_memory_size(code_offset, code_len)?,
                vm.current_call_frame.memory.len(),
                code_len,
                fork,
            )?)?;

        vm.generic_create(value, code_offset, code_len, Some(salt))
    }
}

pub struct OpSelfDestructHandler;
impl OpcodeHandler for OpSelfDestructHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        if vm.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let beneficiary = word_to_address(vm.current_call_frame.stack.pop1()?);
        let self_address = vm.current_call_frame.to;
        let fork = vm.env.config.fork;

        let balance = vm.db.get_account(self_address)?.info.balance;
        let beneficiary_was_cold = vm.substate.add_accessed_address(beneficiary);
        let beneficiary_is_empty = vm.db.get_account(beneficiary)?.is_empty();
        let beneficiary_exists = vm.db.account_exists(beneficiary)?;

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::selfdestruct(
                beneficiary_was_cold,
                beneficiary_is_empty,
                beneficiary_exists,
                balance,
                fork,
            )?)?;

        // Refund only for the first selfdestruct of this account, and only
        // on forks that still refund it at all.
        let schedule = crate::gas_schedule::GasSchedule::for_fork(fork);
        if schedule.selfdestruct_refund > 0 && !vm.substate.is_selfdestruct(&self_address) {
            vm.substate.refunded_gas = vm
                .substate
                .refunded_gas
                .checked_add(schedule.selfdestruct_refund)
                .ok_or(InternalError::Overflow)?;
        }

        // [EIP-6780]: from Cancun, only accounts created in this same
        // transaction are actually deleted; everyone else just loses the
        // balance.
        let eip6780_active = fork >= Fork::Cancun && vm.env.config.eip6780;
        let do_selfdestruct = if eip6780_active {
            vm.substate.is_account_created(&self_address)
        } else {
            true
        };

        vm.transfer(self_address, beneficiary, balance)?;
        if do_selfdestruct {
            vm.substate.add_selfdestruct(self_address);
            // When the beneficiary is the account itself the ether is burnt.
            vm.get_account_mut(self_address)?.info.balance = U256::zero();
        }

        vm.tracer_enter(
            CallType::SelfDestruct,
            self_address,
            beneficiary,
            balance,
            0,
            &Bytes::new(),
        );
        vm.tracer_exit_early(0, None)?;

        Ok(OpcodeResult::Halt)
    }
}

impl<'a> VM<'a> {
    /// Shared body of CREATE and CREATE2.
    pub fn generic_create(
        &mut self,
        value: U256,
        code_offset_in_memory: usize,
        code_size_in_memory: usize,
        salt: Option<U256>,
    ) -> Result<OpcodeResult, VMError> {
        // [EIP-3860] initcode size is a hard cap from Shanghai on.
        if code_size_in_memory > INIT_CODE_MAX_SIZE && self.env.config.fork >= Fork::Shanghai {
            return Err(ExceptionalHalt::OutOfGas.into());
        }
        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        self.current_call_frame.sub_return_data = Bytes::new();

        // Reserve the child's gas allowance up front.
        let fork = self.env.config.fork;
        let gas_limit = gas_cost::max_message_call_gas(
            self.current_call_frame.gas_remaining.max(0) as u64,
            fork,
        );
        self.current_call_frame.increase_consumed_gas(gas_limit)?;

        let code = Bytes::from(
            self.current_call_frame
                .memory
                .load_range(code_offset_in_memory, code_size_in_memory)?,
        );

        let deployer = self.current_call_frame.to;
        let (deployer_balance, deployer_nonce) = {
            let account = self.db.get_account(deployer)?;
            (account.info.balance, account.info.nonce)
        };

        let new_address = match salt {
            Some(salt) => calculate_create2_address(deployer, &code, salt),
            None => calculate_create_address(deployer, deployer_nonce),
        };

        self.substate.add_accessed_address(new_address);

        let call_type = match salt {
            Some(_) => CallType::Create2,
            None => CallType::Create,
        };
        self.tracer_enter(call_type, deployer, new_address, value, gas_limit, &code);

        let new_depth = self
            .current_call_frame
            .depth
            .checked_add(1)
            .ok_or(InternalError::Overflow)?;

        // Failures that push 0 and hand the reserved gas back.
        let checks = [
            (deployer_balance < value, "OutOfFund"),
            (new_depth > MAX_CALL_DEPTH, "MaxDepth"),
            (deployer_nonce == u64::MAX, "MaxNonce"),
        ];
        for (condition, reason) in checks {
            if condition {
                self.early_revert_message_call(gas_limit, reason.to_string())?;
                return Ok(OpcodeResult::Continue);
            }
        }

        // The deployer's nonce moves even when the deployment fails below.
        self.increment_account_nonce(deployer)?;

        // Colliding with an existing contract consumes the reserved gas.
        if self.db.get_account(new_address)?.create_would_collide() {
            self.current_call_frame.stack.push(FAIL)?;
            self.tracer_exit_early(gas_limit, Some("CreateAccExists".to_string()))?;
            return Ok(OpcodeResult::Continue);
        }

        let mut stack = self.stack_pool.pop().unwrap_or_default();
        stack.clear();
        let next_memory = self.current_call_frame.memory.next_memory();

        let new_call_frame = CallFrame::new(
            deployer,
            new_address,
            new_address,
            // Initcode identity is irrelevant; it never lands in state.
            Code::from_bytecode_with_hash(code, H256::zero()),
            value,
            Bytes::new(),
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
        self.add_callframe(new_call_frame);

        // Journaled in the child: undone when the create reverts.
        self.get_account_mut(new_address)?
            .mark(crate::account::AccountStatus::Created);
        if fork >= Fork::SpuriousDragon {
            self.increment_account_nonce(new_address)?;
        }
        self.transfer(deployer, new_address, value)?;

        self.substate.push_backup();
        self.substate.add_created_account(new_address);

        Ok(OpcodeResult::Continue)
    }

    /// Shared body of the whole call family; the per-kind handlers derive
    /// sender/recipient/code and flags, this builds and enters the frame.
    #[allow(clippy::too_many_arguments)]
    #[inline(always)]
    pub fn generic_call(
        &mut self,
        gas_limit: u64,
        value: U256,
        msg_sender: Address,
        to: Address,
        code_address: Address,
        should_transfer_value: bool,
        is_static: bool,
        calldata: Bytes,
        ret_offset: usize,
        ret_size: usize,
        bytecode: Code,
        uses_ext_status: bool,
    ) -> Result<OpcodeResult, VMError> {
        self.current_call_frame.sub_return_data = Bytes::new();

        if should_transfer_value && !value.is_zero() {
            let sender_balance = self.db.get_account(msg_sender)?.info.balance;
            if sender_balance < value {
                self.early_revert_message_call(gas_limit, "OutOfFund".to_string())?;
                return Ok(OpcodeResult::Continue);
            }
        }

        let new_depth = self
            .current_call_frame
            .depth
            .checked_add(1)
            .ok_or(InternalError::Overflow)?;
        if new_depth > MAX_CALL_DEPTH {
            self.early_revert_message_call(gas_limit, "MaxDepth".to_string())?;
            return Ok(OpcodeResult::Continue);
        }

        if precompiles::is_precompile(&code_address, self.env.config.fork) {
            let mut gas_remaining = gas_limit;
            let ctx_result = Self::execute_precompile(
                code_address,
                &calldata,
                gas_limit,
                &mut gas_remaining,
                self.env.config.fork,
                self.db.store.precompile_cache(),
            )?;

            let frame = &mut self.current_call_frame;

            // Hand unused gas back to the caller.
            if ctx_result.is_success() {
                let unused = gas_limit
                    .checked_sub(ctx_result.gas_used)
                    .ok_or(InternalError::Underflow)?;
                frame.gas_remaining = frame
                    .gas_remaining
                    .checked_add(unused as i64)
                    .ok_or(InternalError::Overflow)?;
            }

            let copy_len = ctx_result.output.len().min(ret_size);
            let return_slice = ctx_result
                .output
                .get(..copy_len)
                .ok_or(InternalError::Slicing)?
                .to_vec();
            frame.memory.store_data(ret_offset, &return_slice)?;
            frame.sub_return_data = ctx_result.output.clone();

            frame.stack.push(match (&ctx_result.result, uses_ext_status) {
                (TxResult::Success, false) => SUCCESS,
                (TxResult::Revert(_), false) => FAIL,
                (TxResult::Success, true) => crate::constants::EXTCALL_SUCCESS,
                (TxResult::Revert(_), true) => crate::constants::EXTCALL_FAILED,
            })?;

            if should_transfer_value && ctx_result.is_success() {
                self.transfer(msg_sender, to, value)?;
            }

            self.tracer_exit_context(&ctx_result, false)?;
        } else {
            let mut stack = self.stack_pool.pop().unwrap_or_default();
            stack.clear();
            let next_memory = self.current_call_frame.memory.next_memory();

            let mut new_call_frame = CallFrame::new(
                msg_sender,
                to,
                code_address,
                bytecode,
                value,
                calldata,
                is_static,
                gas_limit,
                new_depth,
                should_transfer_value,
                false,
                ret_offset,
                ret_size,
                stack,
                next_memory,
            );
            new_call_frame.uses_ext_status = uses_ext_status;
            self.add_callframe(new_call_frame);

            if should_transfer_value {
                self.transfer(msg_sender, to, value)?;
            }

            self.substate.push_backup();
        }

        Ok(OpcodeResult::Continue)
    }

    /// Wire a finished child frame back into its parent.
    pub fn handle_return(&mut self, ctx_result: &ContextResult) -> Result<(), VMError> {
        self.handle_state_backup(ctx_result)?;
        let executed_call_frame = self.pop_call_frame()?;

        if executed_call_frame.is_create {
            self.handle_return_create(executed_call_frame, ctx_result)?;
        } else {
            self.handle_return_call(executed_call_frame, ctx_result)?;
        }
        Ok(())
    }

    pub fn handle_return_call(
        &mut self,
        executed_call_frame: CallFrame,
        ctx_result: &ContextResult,
    ) -> Result<(), VMError> {
        let gas_limit = executed_call_frame.gas_limit;
        let ret_offset = executed_call_frame.ret_offset;
        let ret_size = executed_call_frame.ret_size;
        let uses_ext_status = executed_call_frame.uses_ext_status;

        executed_call_frame.memory.clean_from_base();

        let parent = &mut self.current_call_frame;

        let child_unused_gas = gas_limit
            .checked_sub(ctx_result.gas_used)
            .ok_or(InternalError::Underflow)?;
        parent.gas_remaining = parent
            .gas_remaining
            .checked_add(child_unused_gas as i64)
            .ok_or(InternalError::Overflow)?;

        // Copy (a prefix of) the return data into the reserved area; the
        // EXT*CALL family exposes it through RETURNDATA* only.
        if !uses_ext_status {
            let copy_len = ctx_result.output.len().min(ret_size);
            let return_slice = ctx_result
                .output
                .get(..copy_len)
                .ok_or(InternalError::Slicing)?
                .to_vec();
            parent.memory.store_data(ret_offset, &return_slice)?;
        }
        parent.sub_return_data = ctx_result.output.clone();

        let status = match (&ctx_result.result, uses_ext_status) {
            (TxResult::Success, false) => SUCCESS,
            (TxResult::Revert(_), false) => FAIL,
            (TxResult::Success, true) => crate::constants::EXTCALL_SUCCESS,
            (TxResult::Revert(err), true) => {
                if err.is_revert_opcode() {
                    crate::constants::EXTCALL_REVERTED
                } else {
                    crate::constants::EXTCALL_FAILED
                }
            }
        };
        self.current_call_frame.stack.push(status)?;

        if ctx_result.is_success() {
            self.merge_call_frame_backup_with_parent(&executed_call_frame.call_frame_backup)?;
        }

        self.tracer_exit_context(ctx_result, false)?;

        let mut stack = executed_call_frame.stack;
        stack.clear();
        self.stack_pool.push(stack);

        Ok(())
    }

    pub fn handle_return_create(
        &mut self,
        executed_call_frame: CallFrame,
        ctx_result: &ContextResult,
    ) -> Result<(), VMError> {
        let gas_limit = executed_call_frame.gas_limit;
        let to = executed_call_frame.to;

        executed_call_frame.memory.clean_from_base();

        let parent = &mut self.current_call_frame;

        let unused_gas = gas_limit
            .checked_sub(ctx_result.gas_used)
            .ok_or(InternalError::Underflow)?;
        parent.gas_remaining = parent
            .gas_remaining
            .checked_add(unused_gas as i64)
            .ok_or(InternalError::Overflow)?;

        match &ctx_result.result {
            TxResult::Success => {
                parent.stack.push(address_to_word(to))?;
                self.merge_call_frame_backup_with_parent(
                    &executed_call_frame.call_frame_backup,
                )?;
            }
            TxResult::Revert(err) => {
                // REVERT inside initcode hands its data to the deployer.
                if err.is_revert_opcode() {
                    parent.sub_return_data = ctx_result.output.clone();
                }
                parent.stack.push(FAIL)?;
            }
        }

        self.tracer_exit_context(ctx_result, false)?;

        let mut stack = executed_call_frame.stack;
        stack.clear();
        self.stack_pool.push(stack);

        Ok(())
    }

    /// Values the CALL-family cost formulas need: the new memory size over
    /// both buffers, and the callee's warmth/emptiness/existence.
    pub(crate) fn get_call_gas_params(
        &mut self,
        args_offset: usize,
        args_size: usize,
        return_data_offset: usize,
        return_data_size: usize,
        address: Address,
    ) -> Result<(usize, bool, bool, bool), VMError> {
        let address_was_cold = self.substate.add_accessed_address(address);
        let account_is_empty = self.db.get_account(address)?.is_empty();
        let account_exists = self.db.account_exists(address)?;

        let new_memory_size_for_args = calculate_memory_size(args_offset, args_size)?;
        let new_memory_size_for_return = calculate_memory_size(return_data_offset, return_data_size)?;
        let new_memory_size = new_memory_size_for_args.max(new_memory_size_for_return);

        Ok((new_memory_size, account_is_empty, address_was_cold, account_exists))
    }

    pub(crate) fn get_calldata(&mut self, offset: usize, size: usize) -> Result<Bytes, VMError> {
        Ok(Bytes::from(
            self.current_call_frame.memory.load_range(offset, size)?,
        ))
    }

    /// A call that never produced a child frame: hand the reserved gas back
    /// and report failure on the stack.
    pub(crate) fn early_revert_message_call(
        &mut self,
        gas_limit: u64,
        reason: String,
    ) -> Result<(), VMError> {
        let frame = &mut self.current_call_frame;
        frame.gas_remaining = frame
            .gas_remaining
            .checked_add(gas_limit as i64)
            .ok_or(InternalError::Overflow)?;
        frame.stack.push(FAIL)?;

        self.tracer_exit_early(0, Some(reason))?;
        Ok(())
    }
}
