use crate::{
    code::{
        eof::{ContainerKind, EofContainer},
        Code,
    },
    constants::{INVALID_CONTRACT_PREFIX, MAX_CODE_SIZE},
    environment::Fork,
    errors::{ContextResult, ExceptionalHalt, TxResult, VMError},
    gas_cost::CODE_DEPOSIT_COST,
    vm::VM,
};
use bytes::Bytes;

impl<'a> VM<'a> {
    /// Fold a frame that halted through STOP/RETURN/RETURNCONTRACT into a
    /// context result, validating and depositing the contract code when the
    /// frame was a creation.
    pub fn handle_opcode_result(&mut self) -> Result<ContextResult, VMError> {
        if self.current_call_frame.is_create {
            if let Err(error) = self.validate_contract_creation() {
                if error.should_propagate() {
                    return Err(error);
                }
                // Failed deployments burn the frame's whole allowance.
                self.current_call_frame.gas_remaining = 0;
                return Ok(ContextResult {
                    result: TxResult::Revert(error),
                    gas_used: self.current_call_frame.gas_used(),
                    output: Bytes::new(),
                });
            }
        }

        Ok(ContextResult {
            result: TxResult::Success,
            gas_used: self.current_call_frame.gas_used(),
            output: std::mem::take(&mut self.current_call_frame.output),
        })
    }

    /// Fold a frame-terminating error into a context result. Everything but
    /// REVERT consumes the remaining gas; REVERT keeps it and keeps the
    /// frame's output.
    pub fn handle_opcode_error(&mut self, error: VMError) -> Result<ContextResult, VMError> {
        if error.should_propagate() {
            return Err(error);
        }

        let output = if error.is_revert_opcode() {
            std::mem::take(&mut self.current_call_frame.output)
        } else {
            self.current_call_frame.gas_remaining = 0;
            Bytes::new()
        };

        Ok(ContextResult {
            result: TxResult::Revert(error),
            gas_used: self.current_call_frame.gas_used(),
            output,
        })
    }

    /// Deployment epilogue: size caps, the reserved-prefix rule, the code
    /// deposit charge, and finally storing the code on the new account.
    fn validate_contract_creation(&mut self) -> Result<(), VMError> {
        let fork = self.env.config.fork;
        let code = std::mem::take(&mut self.current_call_frame.output);

        // [EIP-170]
        if fork >= Fork::SpuriousDragon && code.len() > MAX_CODE_SIZE {
            return Err(ExceptionalHalt::ContractOutputTooBig.into());
        }

        let new_code = if self.current_call_frame.bytecode.is_eof() {
            // EOFCREATE/initcontainer path: the output is a container
            // assembled by RETURNCONTRACT and must still carry at least the
            // declared data section.
            let container = EofContainer::parse_and_validate(code, ContainerKind::Runtime)
                .map_err(|_| ExceptionalHalt::InvalidEofContainer)?;
            if container.data.len() < container.declared_data_size {
                return Err(ExceptionalHalt::InvalidEofContainer.into());
            }
            Code::from_eof(std::sync::Arc::new(container))
        } else {
            // [EIP-3541]
            if fork >= Fork::London
                && code.first() == Some(&INVALID_CONTRACT_PREFIX)
            {
                return Err(ExceptionalHalt::InvalidContractPrefix.into());
            }
            Code::from_bytecode(code)
        };

        let deposit_cost = CODE_DEPOSIT_COST
            .checked_mul(new_code.len() as u64)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        self.current_call_frame.increase_consumed_gas(deposit_cost)?;

        let address = self.current_call_frame.to;
        self.update_account_bytecode(address, new_code)?;
        Ok(())
    }
}
