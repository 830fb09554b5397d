use crate::call_frame::Log;
use bytes::Bytes;
use thiserror::Error;

/// Top-level error type produced while executing a transaction.
///
/// Variants fall into two disjoint groups:
/// - frame-local outcomes (`RevertOpcode`, `ExceptionalHalt`) that terminate
///   the frame and are observed by the parent as `success = 0`, and
/// - host or implementation failures (`Database`, `Internal`) that abort the
///   whole execution and propagate to the caller as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    #[error("Revert opcode")]
    RevertOpcode,
    #[error("Exceptional halt: {0}")]
    ExceptionalHalt(#[from] ExceptionalHalt),
    #[error("Transaction validation error: {0}")]
    TxValidation(#[from] TxValidationError),
    #[error("Database access error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Internal error: {0}")]
    Internal(#[from] InternalError),
}

impl VMError {
    /// Errors that are bugs or host failures, not EVM semantics. They must
    /// bubble out of the execution loop instead of being folded into a
    /// reverted frame.
    pub fn should_propagate(&self) -> bool {
        matches!(self, VMError::Internal(_) | VMError::Database(_))
    }

    pub fn is_revert_opcode(&self) -> bool {
        matches!(self, VMError::RevertOpcode)
    }
}

impl From<PrecompileError> for VMError {
    fn from(err: PrecompileError) -> Self {
        VMError::ExceptionalHalt(ExceptionalHalt::Precompile(err))
    }
}

/// Frame-terminating faults. Each one consumes all gas remaining in the
/// faulting frame and rolls back the frame's state changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExceptionalHalt {
    #[error("Out of gas")]
    OutOfGas,
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Stack overflow")]
    StackOverflow,
    #[error("Invalid jump destination")]
    InvalidJump,
    #[error("Opcode not allowed in static context")]
    OpcodeNotAllowedInStaticContext,
    #[error("Invalid opcode")]
    InvalidOpcode,
    #[error("Memory or data access out of bounds")]
    OutOfBounds,
    #[error("Return data access out of bounds")]
    ReturnDataOutOfBounds,
    #[error("Offset or size does not fit the address space")]
    VeryLargeNumber,
    #[error("Contract output exceeds the maximum code size")]
    ContractOutputTooBig,
    #[error("Contract output starts with the reserved 0xEF byte")]
    InvalidContractPrefix,
    #[error("Deployed EOF container failed validation")]
    InvalidEofContainer,
    #[error("Call target address does not fit in 20 bytes")]
    AddressOutOfRange,
    #[error("Create collision: target account already exists")]
    CreateCollision,
    #[error("Precompile execution error: {0}")]
    Precompile(#[from] PrecompileError),
}

/// Validation failures raised before bytecode starts executing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxValidationError {
    #[error("Insufficient account funds")]
    InsufficientAccountFunds,
    #[error("Intrinsic gas too low")]
    IntrinsicGasTooLow,
    #[error("Initcode size exceeds maximum")]
    InitcodeSizeExceeded,
    #[error("Sender account is not an EOA")]
    SenderNotEoa,
    #[error("Nonce is at its maximum value")]
    NonceIsMax,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatabaseError {
    #[error("{0}")]
    Custom(String),
}

/// Implementation bugs. Reaching any of these means the interpreter itself is
/// wrong; they are never part of consensus behavior.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Arithmetic underflow")]
    Underflow,
    #[error("Slicing out of bounds")]
    Slicing,
    #[error("Type conversion failed")]
    TypeConversion,
    #[error("Tried to pop the initial call frame")]
    CouldNotPopCallframe,
    #[error("Account expected to be cached")]
    AccountNotCached,
    #[error("{0}")]
    Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrecompileError {
    #[error("Malformed precompile input")]
    ParsingInputError,
    #[error("Invalid input length")]
    InvalidInputLength,
    #[error("Not enough gas for precompile")]
    NotEnoughGas,
    #[error("Point is not on the curve")]
    InvalidPoint,
    #[error("Point is not in the expected subgroup")]
    InvalidSubgroupPoint,
    #[error("Coordinate exceeds the field modulus")]
    CoordinateExceedsFieldModulus,
    #[error("Proof verification failed")]
    VerificationFailed,
    #[error("Modexp base length too large")]
    ModExpBaseTooLarge,
    #[error("Modexp exponent length too large")]
    ModExpExpTooLarge,
    #[error("Modexp modulus length too large")]
    ModExpModulusTooLarge,
}

/// Outcome of a single opcode dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeResult {
    Continue,
    Halt,
}

/// Result of a transaction as observed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxResult {
    Success,
    Revert(VMError),
}

/// Result of one finished execution context (a call frame or precompile run).
#[derive(Debug, Clone)]
pub struct ContextResult {
    pub result: TxResult,
    pub gas_used: u64,
    pub output: Bytes,
}

impl ContextResult {
    pub fn is_success(&self) -> bool {
        matches!(self.result, TxResult::Success)
    }
}

/// Final report of a whole transaction execution.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub result: TxResult,
    pub gas_used: u64,
    pub gas_refunded: u64,
    pub output: Bytes,
    pub logs: Vec<Log>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        matches!(self.result, TxResult::Success)
    }
}
