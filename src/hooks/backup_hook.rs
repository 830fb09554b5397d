use crate::{
    errors::{ContextResult, VMError},
    hooks::hook::Hook,
    vm::VM,
};

/// Snapshots the account cache before execution so the host (or
/// `stateless_execute`) can roll the transaction back wholesale.
#[derive(Default)]
pub struct BackupHook;

impl Hook for BackupHook {
    fn prepare_execution(&mut self, vm: &mut VM<'_>) -> Result<(), VMError> {
        vm.db.tx_backup = Some(vm.db.current_accounts_state.clone());
        Ok(())
    }

    fn finalize_execution(
        &mut self,
        _vm: &mut VM<'_>,
        _ctx_result: &mut ContextResult,
    ) -> Result<(), VMError> {
        Ok(())
    }
}
