use crate::{
    errors::{ContextResult, VMError},
    hooks::default_hook::DefaultHook,
    vm::VM,
};
use std::{cell::RefCell, rc::Rc};

/// Transaction-boundary extension points. The default hook implements
/// mainnet processing (validation, intrinsic gas, refunds, fee payment,
/// account cleanup); hosts append their own hooks for anything beyond that.
pub trait Hook {
    fn prepare_execution(&mut self, vm: &mut VM<'_>) -> Result<(), VMError>;

    fn finalize_execution(
        &mut self,
        vm: &mut VM<'_>,
        ctx_result: &mut ContextResult,
    ) -> Result<(), VMError>;
}

pub fn get_default_hooks() -> Vec<Rc<RefCell<dyn Hook>>> {
    vec![Rc::new(RefCell::new(DefaultHook))]
}
