use crate::{
    account::AccountStatus,
    constants::INIT_CODE_MAX_SIZE,
    environment::Fork,
    errors::{ContextResult, InternalError, TxValidationError, VMError},
    gas_cost,
    gas_schedule::GasSchedule,
    hooks::hook::Hook,
    vm::VM,
};
use ethereum_types::U256;

/// Mainnet transaction processing around bytecode execution: upfront
/// validation and payment, intrinsic gas, and at the end refunds, fee
/// payment and account cleanup.
pub struct DefaultHook;

impl Hook for DefaultHook {
    fn prepare_execution(&mut self, vm: &mut VM<'_>) -> Result<(), VMError> {
        let sender = vm.env.origin;
        let fork = vm.env.config.fork;

        let sender_account = vm.db.get_account(sender)?;
        // [EIP-3607] code-bearing accounts cannot originate transactions.
        if sender_account.has_code() {
            return Err(TxValidationError::SenderNotEoa.into());
        }
        if sender_account.info.nonce == u64::MAX {
            return Err(TxValidationError::NonceIsMax.into());
        }

        let gas_fee = vm
            .env
            .gas_price
            .checked_mul(U256::from(vm.env.gas_limit))
            .ok_or(InternalError::Overflow)?;
        let upfront_cost = gas_fee
            .checked_add(vm.tx.value)
            .ok_or(InternalError::Overflow)?;
        if sender_account.info.balance < upfront_cost {
            return Err(TxValidationError::InsufficientAccountFunds.into());
        }

        // [EIP-3860] initcode size cap is a validity rule from Shanghai.
        if vm.tx.is_create() && fork >= Fork::Shanghai && vm.tx.data.len() > INIT_CODE_MAX_SIZE {
            return Err(TxValidationError::InitcodeSizeExceeded.into());
        }

        let access_list_addresses = vm.tx.access_list.len() as u64;
        let access_list_keys: u64 = vm
            .tx
            .access_list
            .iter()
            .map(|(_, keys)| keys.len() as u64)
            .sum();
        let intrinsic_gas = gas_cost::tx_intrinsic_gas(
            &vm.tx.data,
            vm.tx.is_create(),
            access_list_addresses,
            access_list_keys,
            fork,
        )?;
        if intrinsic_gas > vm.env.gas_limit {
            return Err(TxValidationError::IntrinsicGasTooLow.into());
        }
        vm.current_call_frame
            .increase_consumed_gas(intrinsic_gas)
            .map_err(|_| TxValidationError::IntrinsicGasTooLow)?;

        // Pay for the whole gas allowance now; the unused part comes back in
        // finalize. The value moves later, inside the journaled region.
        vm.decrease_account_balance(sender, gas_fee)?;
        vm.increment_account_nonce(sender)?;

        Ok(())
    }

    fn finalize_execution(
        &mut self,
        vm: &mut VM<'_>,
        ctx_result: &mut ContextResult,
    ) -> Result<(), VMError> {
        let sender = vm.env.origin;
        let fork = vm.env.config.fork;
        let schedule = GasSchedule::for_fork(fork);

        // Refunds accumulate during execution and are capped against the
        // gas actually used when the transaction finishes.
        let refund_cap = ctx_result.gas_used / schedule.refund_quotient;
        let refund = vm.substate.refunded_gas.min(refund_cap);
        vm.substate.refunded_gas = refund;
        ctx_result.gas_used = ctx_result
            .gas_used
            .checked_sub(refund)
            .ok_or(InternalError::Underflow)?;

        let unused_gas = vm
            .env
            .gas_limit
            .checked_sub(ctx_result.gas_used)
            .ok_or(InternalError::Underflow)?;
        let returned_fee = vm
            .env
            .gas_price
            .checked_mul(U256::from(unused_gas))
            .ok_or(InternalError::Overflow)?;
        vm.increase_account_balance(sender, returned_fee)?;

        // The coinbase earns the priority fee from London on, the full gas
        // price before that.
        let priority_fee_per_gas = if fork >= Fork::London {
            vm.env.gas_price.saturating_sub(vm.env.base_fee_per_gas)
        } else {
            vm.env.gas_price
        };
        let coinbase_fee = priority_fee_per_gas
            .checked_mul(U256::from(ctx_result.gas_used))
            .ok_or(InternalError::Overflow)?;
        if !coinbase_fee.is_zero() {
            let coinbase = vm.env.coinbase;
            vm.increase_account_balance(coinbase, coinbase_fee)?;
        }

        // Self-destructed accounts disappear at the end of the transaction.
        for address in vm.substate.collect_selfdestructs() {
            let account = vm.get_account_mut(address)?;
            account.info = Default::default();
            account.storage.clear();
            account.mark(AccountStatus::Destroyed);
        }

        // [EIP-161] touched empty accounts disappear too.
        if fork >= Fork::SpuriousDragon {
            let empties: Vec<_> = vm
                .db
                .current_accounts_state
                .iter()
                .filter(|(_, account)| !account.is_unmodified() && account.is_empty())
                .map(|(address, _)| *address)
                .collect();
            for address in empties {
                vm.get_account_mut(address)?.mark(AccountStatus::Destroyed);
            }
        }

        Ok(())
    }
}
