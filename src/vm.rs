use crate::{
    account::{Account, AccountStatus},
    call_frame::{CallFrame, Log, Stack},
    code::Code,
    db::{cache, gen_db::GeneralizedDatabase},
    environment::{Environment, Fork, TxEnv, TxKind},
    errors::{
        ContextResult, ExceptionalHalt, ExecutionReport, InternalError, OpcodeResult, TxResult,
        VMError,
    },
    hooks::hook::{get_default_hooks, Hook},
    memory::Memory,
    opcodes::OpCodeFn,
    precompiles,
    tracing::{CallType, DynTracer},
    utils::{calculate_create_address, u256_to_h256},
};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use rustc_hash::{FxHashMap, FxHashSet};
use std::{cell::RefCell, mem, rc::Rc};

/// [EIP-1153] per-transaction storage, never persisted.
pub type TransientStorage = FxHashMap<(Address, U256), U256>;

/// Lookup table for code inside validated EOF containers, shared by every VM.
static EOF_OPCODE_TABLE: [OpCodeFn; 256] = VM::<'static>::build_eof_opcode_table();

/// Execution substate accumulated while a transaction runs: warm access
/// sets, created and self-destructed accounts, refunds, transient storage
/// and logs.
///
/// Entering a frame pushes a checkpoint (the previous substate becomes the
/// boxed parent); a reverting frame drops its delta wholesale while a
/// successful one folds it into the parent. Reads walk the parent chain, so
/// warmth and transient values recorded by ancestors stay visible.
#[derive(Debug, Default)]
pub struct Substate {
    parent: Option<Box<Self>>,
    selfdestruct_set: FxHashSet<Address>,
    accessed_addresses: FxHashSet<Address>,
    accessed_storage_slots: FxHashMap<Address, FxHashSet<H256>>,
    created_accounts: FxHashSet<Address>,
    pub refunded_gas: u64,
    transient_storage: TransientStorage,
    logs: Vec<Log>,
}

impl Substate {
    pub fn from_accesses(
        accessed_addresses: FxHashSet<Address>,
        accessed_storage_slots: FxHashMap<Address, FxHashSet<H256>>,
    ) -> Self {
        Self {
            accessed_addresses,
            accessed_storage_slots,
            ..Default::default()
        }
    }

    /// Warm up the initial access set: sender, recipient, coinbase (from
    /// Shanghai), the fork's precompiles, and the transaction access list.
    pub fn initialize(env: &Environment, tx: &TxEnv) -> Self {
        let mut accessed_addresses = FxHashSet::default();
        let mut accessed_storage_slots: FxHashMap<Address, FxHashSet<H256>> = FxHashMap::default();

        accessed_addresses.insert(env.origin);
        if let TxKind::Call(to) = tx.to {
            accessed_addresses.insert(to);
        }

        // [EIP-3651]
        if env.config.fork >= Fork::Shanghai {
            accessed_addresses.insert(env.coinbase);
        }

        for i in 1..=precompiles::max_precompile_address(env.config.fork) {
            accessed_addresses.insert(Address::from_low_u64_be(i));
        }

        for (address, keys) in &tx.access_list {
            accessed_addresses.insert(*address);
            let warm_slots = accessed_storage_slots.entry(*address).or_default();
            for key in keys {
                warm_slots.insert(*key);
            }
        }

        Self::from_accesses(accessed_addresses, accessed_storage_slots)
    }

    /// Push a checkpoint. Data recorded so far remains readable through the
    /// parent chain.
    pub fn push_backup(&mut self) {
        let parent = mem::take(self);
        self.refunded_gas = parent.refunded_gas;
        self.parent = Some(Box::new(parent));
    }

    /// Fold the current delta into the last checkpoint.
    pub fn commit_backup(&mut self) {
        let Some(parent) = self.parent.take() else {
            return;
        };
        let mut restored = *parent;
        mem::swap(self, &mut restored);
        let delta = restored;

        self.selfdestruct_set.extend(delta.selfdestruct_set);
        self.accessed_addresses.extend(delta.accessed_addresses);
        for (address, slots) in delta.accessed_storage_slots {
            self.accessed_storage_slots
                .entry(address)
                .or_default()
                .extend(slots);
        }
        self.created_accounts.extend(delta.created_accounts);
        self.refunded_gas = delta.refunded_gas;
        self.transient_storage.extend(delta.transient_storage);
        self.logs.extend(delta.logs);
    }

    /// Discard the current delta, reverting to the last checkpoint.
    pub fn revert_backup(&mut self) {
        if let Some(parent) = self.parent.take() {
            *self = *parent;
        }
    }

    /// Mark an address accessed; returns whether it was cold (not seen
    /// anywhere up the chain).
    pub fn add_accessed_address(&mut self, address: Address) -> bool {
        if self.is_address_accessed(&address) {
            return false;
        }
        self.accessed_addresses.insert(address);
        true
    }

    pub fn is_address_accessed(&self, address: &Address) -> bool {
        self.accessed_addresses.contains(address)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.is_address_accessed(address))
    }

    /// Mark a storage slot accessed; returns whether it was cold.
    pub fn add_accessed_slot(&mut self, address: Address, key: H256) -> bool {
        if self.is_slot_accessed(&address, &key) {
            return false;
        }
        self.accessed_storage_slots
            .entry(address)
            .or_default()
            .insert(key);
        true
    }

    pub fn is_slot_accessed(&self, address: &Address, key: &H256) -> bool {
        self.accessed_storage_slots
            .get(address)
            .is_some_and(|slots| slots.contains(key))
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.is_slot_accessed(address, key))
    }

    pub fn add_selfdestruct(&mut self, address: Address) {
        self.selfdestruct_set.insert(address);
    }

    pub fn is_selfdestruct(&self, address: &Address) -> bool {
        self.selfdestruct_set.contains(address)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.is_selfdestruct(address))
    }

    /// All self-destructed addresses, bottom of the chain first.
    pub fn collect_selfdestructs(&self) -> Vec<Address> {
        let mut addresses = match self.parent.as_deref() {
            Some(parent) => parent.collect_selfdestructs(),
            None => Vec::new(),
        };
        addresses.extend(self.selfdestruct_set.iter().copied());
        addresses
    }

    pub fn add_created_account(&mut self, address: Address) {
        self.created_accounts.insert(address);
    }

    pub fn is_account_created(&self, address: &Address) -> bool {
        self.created_accounts.contains(address)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.is_account_created(address))
    }

    pub fn get_transient(&self, to: &Address, key: &U256) -> U256 {
        match self.transient_storage.get(&(*to, *key)) {
            Some(value) => *value,
            None => self
                .parent
                .as_ref()
                .map(|parent| parent.get_transient(to, key))
                .unwrap_or_default(),
        }
    }

    pub fn set_transient(&mut self, to: &Address, key: &U256, value: U256) {
        self.transient_storage.insert((*to, *key), value);
    }

    pub fn add_log(&mut self, log: Log) {
        self.logs.push(log);
    }

    /// All logs in emission order.
    pub fn extract_logs(&self) -> Vec<Log> {
        fn walk(substate: &Substate, target: &mut Vec<Log>) {
            if let Some(parent) = substate.parent.as_deref() {
                walk(parent, target);
            }
            target.extend_from_slice(&substate.logs);
        }

        let mut logs = Vec::new();
        walk(self, &mut logs);
        logs
    }
}

/// The interpreter. One instance executes one transaction against a world
/// view; it has no shared mutable state of its own beyond the caches handed
/// in through the database.
pub struct VM<'a> {
    /// Parent frames of the currently executing one.
    pub call_frames: Vec<CallFrame>,
    pub current_call_frame: CallFrame,
    pub env: Environment,
    pub substate: Substate,
    pub db: &'a mut GeneralizedDatabase,
    pub tx: TxEnv,
    pub hooks: Vec<Rc<RefCell<dyn Hook>>>,
    /// Pre-transaction storage values, for SSTORE metering.
    pub storage_original_values: FxHashMap<(Address, H256), U256>,
    pub tracer: DynTracer,
    /// Operand stacks recycled across frames.
    pub stack_pool: Vec<Stack>,
    pub(crate) opcode_table: [OpCodeFn; 256],
}

impl<'a> VM<'a> {
    pub fn new(
        env: Environment,
        db: &'a mut GeneralizedDatabase,
        tx: &TxEnv,
        tracer: DynTracer,
    ) -> Result<Self, VMError> {
        db.tx_backup = None;

        let substate = Substate::initialize(&env, tx);
        let fork = env.config.fork;

        let (callee, bytecode, is_create) = match tx.to {
            TxKind::Call(to) => (to, db.get_account_code(to)?, false),
            TxKind::Create => {
                let nonce = db.get_account(env.origin)?.info.nonce;
                let callee = calculate_create_address(env.origin, nonce);
                // Initcode runs from a pseudo-code object; its hash is never
                // observable.
                let code = Code::from_bytecode_with_hash(tx.data.clone(), H256::zero());
                (callee, code, true)
            }
        };

        let initial_call_frame = CallFrame::new(
            env.origin,
            callee,
            callee,
            bytecode,
            tx.value,
            if is_create { Bytes::new() } else { tx.data.clone() },
            false,
            env.gas_limit,
            0,
            true,
            is_create,
            0,
            0,
            Stack::default(),
            Memory::default(),
        );

        let mut vm = Self {
            call_frames: Vec::new(),
            current_call_frame: initial_call_frame,
            substate,
            db,
            tx: tx.clone(),
            hooks: get_default_hooks(),
            storage_original_values: FxHashMap::default(),
            tracer,
            stack_pool: Vec::new(),
            opcode_table: VM::build_opcode_table(fork),
            env,
        };

        let call_type = if is_create {
            CallType::Create
        } else {
            CallType::Call
        };
        vm.tracer.borrow_mut().enter(
            call_type,
            vm.env.origin,
            callee,
            vm.tx.value,
            vm.env.gas_limit,
            &vm.tx.data,
        );

        Ok(vm)
    }

    pub fn add_hook(&mut self, hook: impl Hook + 'static) {
        self.hooks.push(Rc::new(RefCell::new(hook)));
    }

    /// Execute the whole transaction.
    pub fn execute(&mut self) -> Result<ExecutionReport, VMError> {
        if let Err(e) = self.prepare_execution() {
            // The transaction is invalid; undo anything the preparation
            // hooks already touched.
            self.restore_cache_state()?;
            return Err(e);
        }

        // Changes made during preparation (nonce bump, upfront gas payment)
        // stick even if execution reverts.
        self.current_call_frame.call_frame_backup.clear();

        if self.current_call_frame.is_create {
            if let Some(ctx_result) = self.handle_create_transaction()? {
                return self.finalize_execution(ctx_result);
            }
        } else if self.current_call_frame.should_transfer_value {
            self.transfer(
                self.env.origin,
                self.current_call_frame.to,
                self.tx.value,
            )?;
        }

        self.substate.push_backup();
        let ctx_result = self.run_execution()?;

        self.finalize_execution(ctx_result)
    }

    /// Run a transaction and roll the cache back afterwards.
    pub fn stateless_execute(&mut self) -> Result<ExecutionReport, VMError> {
        // The backup must run before any other hook touches state.
        self.hooks.insert(
            0,
            Rc::new(RefCell::new(crate::hooks::backup_hook::BackupHook::default())),
        );
        let report = self.execute()?;
        self.db.undo_last_transaction()?;
        Ok(report)
    }

    /// Main dispatch loop for the current frame tree.
    pub fn run_execution(&mut self) -> Result<ContextResult, VMError> {
        if !self.current_call_frame.is_create
            && precompiles::is_precompile(&self.current_call_frame.code_address, self.env.config.fork)
        {
            let frame = &mut self.current_call_frame;
            let mut gas_remaining = frame.gas_remaining.max(0) as u64;
            let result = Self::execute_precompile(
                frame.code_address,
                &frame.calldata,
                frame.gas_limit,
                &mut gas_remaining,
                self.env.config.fork,
                self.db.store.precompile_cache(),
            );
            frame.gas_remaining = gas_remaining as i64;
            return result;
        }

        loop {
            let opcode = self.current_call_frame.next_opcode();

            self.tracer.borrow_mut().on_opcode(
                opcode,
                self.current_call_frame.pc,
                self.current_call_frame.gas_remaining.max(0) as u64,
                self.current_call_frame.depth,
            );

            self.current_call_frame.pc += 1;

            let op_fn = if self.current_call_frame.bytecode.is_eof() {
                EOF_OPCODE_TABLE[opcode as usize]
            } else {
                self.opcode_table[opcode as usize]
            };
            let op_result = op_fn.call(self);

            let result = match op_result {
                Ok(OpcodeResult::Continue) => continue,
                Ok(OpcodeResult::Halt) => self.handle_opcode_result()?,
                Err(error) => self.handle_opcode_error(error)?,
            };

            // The initial frame finished: commit or revert and report.
            if self.call_frames.is_empty() {
                self.handle_state_backup(&result)?;
                return Ok(result);
            }

            self.handle_return(&result)?;
        }
    }

    /// Run a precompile against a mutable gas allowance.
    pub fn execute_precompile(
        code_address: Address,
        calldata: &Bytes,
        gas_limit: u64,
        gas_remaining: &mut u64,
        fork: Fork,
        cache: Option<&precompiles::PrecompileCache>,
    ) -> Result<ContextResult, VMError> {
        let result = precompiles::execute_precompile(code_address, calldata, gas_remaining, fork, cache);
        Self::handle_precompile_result(result, gas_limit, *gas_remaining)
    }

    pub(crate) fn handle_precompile_result(
        precompile_result: Result<Bytes, VMError>,
        gas_limit: u64,
        gas_remaining: u64,
    ) -> Result<ContextResult, VMError> {
        match precompile_result {
            Ok(output) => Ok(ContextResult {
                result: TxResult::Success,
                gas_used: gas_limit
                    .checked_sub(gas_remaining)
                    .ok_or(InternalError::Underflow)?,
                output,
            }),
            Err(error) => {
                if error.should_propagate() {
                    return Err(error);
                }
                // A failing precompile burns everything it was given.
                Ok(ContextResult {
                    result: TxResult::Revert(error),
                    gas_used: gas_limit,
                    output: Bytes::new(),
                })
            }
        }
    }

    fn prepare_execution(&mut self) -> Result<(), VMError> {
        for hook in self.hooks.clone() {
            hook.borrow_mut().prepare_execution(self)?;
        }
        Ok(())
    }

    fn finalize_execution(
        &mut self,
        mut ctx_result: ContextResult,
    ) -> Result<ExecutionReport, VMError> {
        for hook in self.hooks.clone() {
            hook.borrow_mut().finalize_execution(self, &mut ctx_result)?;
        }

        self.tracer_exit_context(&ctx_result, true)?;

        // A reverted transaction emits no logs.
        let logs = if ctx_result.is_success() {
            self.substate.extract_logs()
        } else {
            Vec::new()
        };

        Ok(ExecutionReport {
            result: ctx_result.result.clone(),
            gas_used: ctx_result.gas_used,
            gas_refunded: self.substate.refunded_gas,
            output: mem::take(&mut ctx_result.output),
            logs,
        })
    }

    /// Create transactions fail up front when the derived address is
    /// occupied; EOF initcode must also parse and validate before running.
    fn handle_create_transaction(&mut self) -> Result<Option<ContextResult>, VMError> {
        if self.env.config.fork >= Fork::Eof
            && crate::code::eof::EofContainer::is_eof_prefixed(&self.tx.data)
        {
            match Code::parse_initcode(self.tx.data.clone()) {
                Ok(container) => {
                    self.current_call_frame.bytecode = Code::from_eof(container);
                }
                Err(_) => {
                    return Ok(Some(ContextResult {
                        result: TxResult::Revert(
                            ExceptionalHalt::InvalidEofContainer.into(),
                        ),
                        gas_used: self.env.gas_limit,
                        output: Bytes::new(),
                    }));
                }
            }
        }

        let new_address = self.current_call_frame.to;
        if self.db.get_account(new_address)?.create_would_collide() {
            return Ok(Some(ContextResult {
                result: TxResult::Revert(ExceptionalHalt::CreateCollision.into()),
                gas_used: self.env.gas_limit,
                output: Bytes::new(),
            }));
        }

        self.substate.add_accessed_address(new_address);
        self.substate.add_created_account(new_address);
        self.get_account_mut(new_address)?.mark(AccountStatus::Created);
        // [EIP-161] contract nonces start at one.
        if self.env.config.fork >= Fork::SpuriousDragon {
            self.increment_account_nonce(new_address)?;
        }
        self.transfer(self.env.origin, new_address, self.tx.value)?;

        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Frame plumbing
    // -----------------------------------------------------------------------

    pub fn add_callframe(&mut self, frame: CallFrame) {
        let parent = mem::replace(&mut self.current_call_frame, frame);
        self.call_frames.push(parent);
    }

    pub fn pop_call_frame(&mut self) -> Result<CallFrame, VMError> {
        let parent = self
            .call_frames
            .pop()
            .ok_or(InternalError::CouldNotPopCallframe)?;
        Ok(mem::replace(&mut self.current_call_frame, parent))
    }

    /// Commit or revert the journal for a finished context.
    pub fn handle_state_backup(&mut self, ctx_result: &ContextResult) -> Result<(), VMError> {
        if ctx_result.is_success() {
            self.substate.commit_backup();
        } else {
            self.substate.revert_backup();
            self.restore_cache_state()?;
        }
        Ok(())
    }

    /// Undo every state change recorded in the current frame's backup.
    pub fn restore_cache_state(&mut self) -> Result<(), VMError> {
        let backup = mem::take(&mut self.current_call_frame.call_frame_backup);

        for (address, info) in backup.original_accounts_info {
            if let Some(account) = cache::get_account_mut(&mut self.db.current_accounts_state, &address)
            {
                account.info = info;
            }
        }
        for (address, slots) in backup.original_account_storage_slots {
            if let Some(account) = cache::get_account_mut(&mut self.db.current_accounts_state, &address)
            {
                for (key, value) in slots {
                    account.storage.insert(key, value);
                }
            }
        }
        Ok(())
    }

    pub fn merge_call_frame_backup_with_parent(
        &mut self,
        child_backup: &crate::call_frame::CallFrameBackup,
    ) -> Result<(), VMError> {
        self.current_call_frame
            .call_frame_backup
            .merge_child(child_backup);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Journaled world-state access
    // -----------------------------------------------------------------------

    /// Record the pre-image of an account's info in the current frame's
    /// backup, once.
    fn backup_account_info(&mut self, address: Address) -> Result<(), VMError> {
        self.db.load_account(address)?;
        let backup = &mut self.current_call_frame.call_frame_backup;
        if backup.original_accounts_info.contains_key(&address) {
            return Ok(());
        }
        let info = cache::get_account(&self.db.current_accounts_state, &address)
            .ok_or(InternalError::AccountNotCached)?
            .info;
        backup.original_accounts_info.insert(address, info);
        Ok(())
    }

    /// Mutable account access with journaling.
    pub fn get_account_mut(&mut self, address: Address) -> Result<&mut Account, VMError> {
        self.backup_account_info(address)?;
        let account = cache::get_account_mut(&mut self.db.current_accounts_state, &address)
            .ok_or(InternalError::AccountNotCached)?;
        if account.is_unmodified() {
            account.mark(AccountStatus::Modified);
        }
        Ok(account)
    }

    pub fn increase_account_balance(
        &mut self,
        address: Address,
        increase: U256,
    ) -> Result<(), VMError> {
        let account = self.get_account_mut(address)?;
        account.info.balance = account
            .info
            .balance
            .checked_add(increase)
            .ok_or(InternalError::Overflow)?;
        Ok(())
    }

    pub fn decrease_account_balance(
        &mut self,
        address: Address,
        decrease: U256,
    ) -> Result<(), VMError> {
        let account = self.get_account_mut(address)?;
        account.info.balance = account
            .info
            .balance
            .checked_sub(decrease)
            .ok_or(InternalError::Underflow)?;
        Ok(())
    }

    /// Move value between accounts. Callers check the balance first; an
    /// underflow here is a bug.
    pub fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), VMError> {
        if value.is_zero() {
            return Ok(());
        }
        self.decrease_account_balance(from, value)?;
        self.increase_account_balance(to, value)
    }

    pub fn increment_account_nonce(&mut self, address: Address) -> Result<u64, VMError> {
        let account = self.get_account_mut(address)?;
        account.info.nonce = account
            .info
            .nonce
            .checked_add(1)
            .ok_or(InternalError::Overflow)?;
        Ok(account.info.nonce)
    }

    /// Replace an account's code (successful deployment).
    pub fn update_account_bytecode(
        &mut self,
        address: Address,
        new_code: Code,
    ) -> Result<(), VMError> {
        let hash = new_code.hash;
        self.db.insert_code(new_code);
        let account = self.get_account_mut(address)?;
        account.info.code_hash = hash;
        Ok(())
    }

    /// Storage read through the cache, falling back to the store.
    pub fn get_storage_value(&mut self, address: Address, key: H256) -> Result<U256, VMError> {
        if let Some(account) = cache::get_account(&self.db.current_accounts_state, &address) {
            if let Some(value) = account.storage.get(&key) {
                return Ok(*value);
            }
        }

        let value = self.db.store.get_storage_value(address, key)?;

        // Cache the read without marking the account modified.
        self.db.load_account(address)?;
        if let Some(account) = cache::get_account_mut(&mut self.db.current_accounts_state, &address)
        {
            account.storage.entry(key).or_insert(value);
        }
        Ok(value)
    }

    /// Value a slot had before this transaction, for SSTORE metering.
    pub fn get_original_storage(&mut self, address: Address, key: H256) -> Result<U256, VMError> {
        if let Some(value) = self.storage_original_values.get(&(address, key)) {
            return Ok(*value);
        }
        let value = self.get_storage_value(address, key)?;
        self.storage_original_values.insert((address, key), value);
        Ok(value)
    }

    /// Read a slot and record its warmth; returns `(value, was_cold)`.
    pub fn access_storage_slot(
        &mut self,
        address: Address,
        key: H256,
    ) -> Result<(U256, bool), VMError> {
        let was_cold = self.substate.add_accessed_slot(address, key);
        let value = self.get_storage_value(address, key)?;
        Ok((value, was_cold))
    }

    /// Journaled storage write.
    pub fn update_account_storage(
        &mut self,
        address: Address,
        key: H256,
        new_value: U256,
        current_value: U256,
    ) -> Result<(), VMError> {
        let backup = &mut self.current_call_frame.call_frame_backup;
        backup
            .original_account_storage_slots
            .entry(address)
            .or_default()
            .entry(key)
            .or_insert(current_value);

        let account = self.get_account_mut(address)?;
        account.storage.insert(key, new_value);
        Ok(())
    }

    /// SSTORE body shared by the legacy and EOF dispatch paths. The gas and
    /// refund schedule follows the fork's metering model.
    pub fn op_sstore_inner(&mut self, key: U256, new_value: U256) -> Result<(), VMError> {
        use crate::gas_cost::{self, SSTORE_STIPEND};

        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let fork = self.env.config.fork;

        // [EIP-2200] leave headroom for the call stipend.
        if fork >= Fork::Istanbul && self.current_call_frame.gas_remaining <= SSTORE_STIPEND {
            return Err(ExceptionalHalt::OutOfGas.into());
        }

        let to = self.current_call_frame.to;
        let key = u256_to_h256(key);

        let (current_value, storage_slot_was_cold) = self.access_storage_slot(to, key)?;
        let original_value = self.get_original_storage(to, key)?;

        let delta = gas_cost::sstore_refund_delta(original_value, current_value, new_value, fork);
        if delta >= 0 {
            self.substate.refunded_gas = self
                .substate
                .refunded_gas
                .checked_add(delta as u64)
                .ok_or(InternalError::Overflow)?;
        } else {
            self.substate.refunded_gas = self
                .substate
                .refunded_gas
                .checked_sub(delta.unsigned_abs())
                .ok_or(InternalError::Underflow)?;
        }

        self.current_call_frame
            .increase_consumed_gas(gas_cost::sstore(
                original_value,
                current_value,
                new_value,
                storage_slot_was_cold,
                fork,
            )?)?;

        if new_value != current_value {
            self.update_account_storage(to, key, new_value, current_value)?;
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tracer plumbing
    // -----------------------------------------------------------------------

    pub fn tracer_enter(
        &mut self,
        call_type: CallType,
        from: Address,
        to: Address,
        value: U256,
        gas: u64,
        input: &Bytes,
    ) {
        self.tracer
            .borrow_mut()
            .enter(call_type, from, to, value, gas, input);
    }

    pub fn tracer_exit_context(
        &mut self,
        ctx_result: &ContextResult,
        is_top: bool,
    ) -> Result<(), VMError> {
        let (error, revert_reason) = match &ctx_result.result {
            TxResult::Success => (None, None),
            TxResult::Revert(err) => (
                Some(err.to_string()),
                String::from_utf8(ctx_result.output.to_vec()).ok(),
            ),
        };
        self.tracer
            .borrow_mut()
            .exit(
                ctx_result.gas_used,
                ctx_result.output.clone(),
                error,
                revert_reason,
                is_top,
            )
            .map_err(VMError::Internal)
    }

    pub fn tracer_exit_early(&mut self, gas_used: u64, error: Option<String>) -> Result<(), VMError> {
        self.tracer
            .borrow_mut()
            .exit(gas_used, Bytes::new(), error, None, false)
            .map_err(VMError::Internal)
    }
}
