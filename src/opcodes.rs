use crate::{
    environment::Fork,
    errors::{OpcodeResult, VMError},
    opcode_handlers::{
        arithmetic::*, bitwise_comparison::*, block::*, dup::*, environment::*, eof::*,
        exchange::*, keccak::*, logging::*, push::*, stack_memory_storage_flow::*, system::*,
        OpInvalidHandler, OpStopHandler, OpcodeHandler,
    },
    vm::VM,
};
use strum::EnumString;

#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, EnumString, Hash)]
pub enum Opcode {
    // Stop and arithmetic
    STOP = 0x00,
    ADD = 0x01,
    MUL = 0x02,
    SUB = 0x03,
    DIV = 0x04,
    SDIV = 0x05,
    MOD = 0x06,
    SMOD = 0x07,
    ADDMOD = 0x08,
    MULMOD = 0x09,
    EXP = 0x0A,
    SIGNEXTEND = 0x0B,

    // Comparison and bitwise logic
    LT = 0x10,
    GT = 0x11,
    SLT = 0x12,
    SGT = 0x13,
    EQ = 0x14,
    ISZERO = 0x15,
    AND = 0x16,
    OR = 0x17,
    XOR = 0x18,
    NOT = 0x19,
    BYTE = 0x1A,
    SHL = 0x1B,
    SHR = 0x1C,
    SAR = 0x1D,

    KECCAK256 = 0x20,

    // Environmental information
    ADDRESS = 0x30,
    BALANCE = 0x31,
    ORIGIN = 0x32,
    CALLER = 0x33,
    CALLVALUE = 0x34,
    CALLDATALOAD = 0x35,
    CALLDATASIZE = 0x36,
    CALLDATACOPY = 0x37,
    CODESIZE = 0x38,
    CODECOPY = 0x39,
    GASPRICE = 0x3A,
    EXTCODESIZE = 0x3B,
    EXTCODECOPY = 0x3C,
    RETURNDATASIZE = 0x3D,
    RETURNDATACOPY = 0x3E,
    EXTCODEHASH = 0x3F,

    // Block information
    BLOCKHASH = 0x40,
    COINBASE = 0x41,
    TIMESTAMP = 0x42,
    NUMBER = 0x43,
    PREVRANDAO = 0x44,
    GASLIMIT = 0x45,
    CHAINID = 0x46,
    SELFBALANCE = 0x47,
    BASEFEE = 0x48,
    BLOBHASH = 0x49,
    BLOBBASEFEE = 0x4A,

    // Stack, memory, storage and flow
    POP = 0x50,
    MLOAD = 0x51,
    MSTORE = 0x52,
    MSTORE8 = 0x53,
    SLOAD = 0x54,
    SSTORE = 0x55,
    JUMP = 0x56,
    JUMPI = 0x57,
    PC = 0x58,
    MSIZE = 0x59,
    GAS = 0x5A,
    JUMPDEST = 0x5B,
    TLOAD = 0x5C,
    TSTORE = 0x5D,
    MCOPY = 0x5E,

    // Push
    PUSH0 = 0x5F,
    PUSH1 = 0x60,
    PUSH2 = 0x61,
    PUSH3 = 0x62,
    PUSH4 = 0x63,
    PUSH5 = 0x64,
    PUSH6 = 0x65,
    PUSH7 = 0x66,
    PUSH8 = 0x67,
    PUSH9 = 0x68,
    PUSH10 = 0x69,
    PUSH11 = 0x6A,
    PUSH12 = 0x6B,
    PUSH13 = 0x6C,
    PUSH14 = 0x6D,
    PUSH15 = 0x6E,
    PUSH16 = 0x6F,
    PUSH17 = 0x70,
    PUSH18 = 0x71,
    PUSH19 = 0x72,
    PUSH20 = 0x73,
    PUSH21 = 0x74,
    PUSH22 = 0x75,
    PUSH23 = 0x76,
    PUSH24 = 0x77,
    PUSH25 = 0x78,
    PUSH26 = 0x79,
    PUSH27 = 0x7A,
    PUSH28 = 0x7B,
    PUSH29 = 0x7C,
    PUSH30 = 0x7D,
    PUSH31 = 0x7E,
    PUSH32 = 0x7F,

    // Duplication
    DUP1 = 0x80,
    DUP2 = 0x81,
    DUP3 = 0x82,
    DUP4 = 0x83,
    DUP5 = 0x84,
    DUP6 = 0x85,
    DUP7 = 0x86,
    DUP8 = 0x87,
    DUP9 = 0x88,
    DUP10 = 0x89,
    DUP11 = 0x8A,
    DUP12 = 0x8B,
    DUP13 = 0x8C,
    DUP14 = 0x8D,
    DUP15 = 0x8E,
    DUP16 = 0x8F,

    // Exchange
    SWAP1 = 0x90,
    SWAP2 = 0x91,
    SWAP3 = 0x92,
    SWAP4 = 0x93,
    SWAP5 = 0x94,
    SWAP6 = 0x95,
    SWAP7 = 0x96,
    SWAP8 = 0x97,
    SWAP9 = 0x98,
    SWAP10 = 0x99,
    SWAP11 = 0x9A,
    SWAP12 = 0x9B,
    SWAP13 = 0x9C,
    SWAP14 = 0x9D,
    SWAP15 = 0x9E,
    SWAP16 = 0x9F,

    // Logging
    LOG0 = 0xA0,
    LOG1 = 0xA1,
    LOG2 = 0xA2,
    LOG3 = 0xA3,
    LOG4 = 0xA4,

    // EOF data section access
    DATALOAD = 0xD0,
    DATALOADN = 0xD1,
    DATASIZE = 0xD2,
    DATACOPY = 0xD3,

    // EOF static flow and function sections
    RJUMP = 0xE0,
    RJUMPI = 0xE1,
    RJUMPV = 0xE2,
    CALLF = 0xE3,
    RETF = 0xE4,
    JUMPF = 0xE5,
    DUPN = 0xE6,
    SWAPN = 0xE7,
    EXCHANGE = 0xE8,
    EOFCREATE = 0xEC,
    RETURNCONTRACT = 0xEE,

    // System
    CREATE = 0xF0,
    CALL = 0xF1,
    CALLCODE = 0xF2,
    RETURN = 0xF3,
    DELEGATECALL = 0xF4,
    CREATE2 = 0xF5,
    RETURNDATALOAD = 0xF7,
    EXTCALL = 0xF8,
    EXTDELEGATECALL = 0xF9,
    STATICCALL = 0xFA,
    EXTSTATICCALL = 0xFB,
    REVERT = 0xFD,
    INVALID = 0xFE,
    SELFDESTRUCT = 0xFF,
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> Self {
        opcode as u8
    }
}

impl From<Opcode> for usize {
    fn from(opcode: Opcode) -> Self {
        opcode as usize
    }
}

/// An opcode function handler.
#[derive(Debug, Clone, Copy)]
pub struct OpCodeFn(fn(&mut VM<'_>) -> Result<OpcodeResult, VMError>);

impl OpCodeFn {
    pub const fn new<T>() -> Self
    where
        T: OpcodeHandler,
    {
        Self(T::eval)
    }

    #[inline(always)]
    pub fn call(self, vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        (self.0)(vm)
    }
}

impl<'a> VM<'a> {
    /// Opcode lookup table for legacy code, staged per fork. Unassigned
    /// entries fall through to the INVALID handler.
    pub(crate) fn build_opcode_table(fork: Fork) -> [OpCodeFn; 256] {
        if fork >= Fork::Cancun {
            Self::build_opcode_table_cancun()
        } else if fork >= Fork::Shanghai {
            Self::build_opcode_table_shanghai()
        } else if fork >= Fork::London {
            Self::build_opcode_table_london()
        } else if fork >= Fork::Istanbul {
            Self::build_opcode_table_istanbul()
        } else if fork >= Fork::Constantinople {
            // Petersburg keeps the Constantinople opcode set; only the
            // SSTORE metering differs, which lives in the gas schedule.
            Self::build_opcode_table_constantinople()
        } else if fork >= Fork::Byzantium {
            Self::build_opcode_table_byzantium()
        } else if fork >= Fork::Homestead {
            Self::build_opcode_table_homestead()
        } else {
            Self::build_opcode_table_frontier()
        }
    }

    const fn build_opcode_table_frontier() -> [OpCodeFn; 256] {
        let mut table: [OpCodeFn; 256] = [OpCodeFn::new::<OpInvalidHandler>(); 256];

        table[Opcode::STOP as usize] = OpCodeFn::new::<OpStopHandler>();
        table[Opcode::ADD as usize] = OpCodeFn::new::<OpAddHandler>();
        table[Opcode::MUL as usize] = OpCodeFn::new::<OpMulHandler>();
        table[Opcode::SUB as usize] = OpCodeFn::new::<OpSubHandler>();
        table[Opcode::DIV as usize] = OpCodeFn::new::<OpDivHandler>();
        table[Opcode::SDIV as usize] = OpCodeFn::new::<OpSDivHandler>();
        table[Opcode::MOD as usize] = OpCodeFn::new::<OpModHandler>();
        table[Opcode::SMOD as usize] = OpCodeFn::new::<OpSModHandler>();
        table[Opcode::ADDMOD as usize] = OpCodeFn::new::<OpAddModHandler>();
        table[Opcode::MULMOD as usize] = OpCodeFn::new::<OpMulModHandler>();
        table[Opcode::EXP as usize] = OpCodeFn::new::<OpExpHandler>();
        table[Opcode::SIGNEXTEND as usize] = OpCodeFn::new::<OpSignExtendHandler>();

        table[Opcode::LT as usize] = OpCodeFn::new::<OpLtHandler>();
        table[Opcode::GT as usize] = OpCodeFn::new::<OpGtHandler>();
        table[Opcode::SLT as usize] = OpCodeFn::new::<OpSLtHandler>();
        table[Opcode::SGT as usize] = OpCodeFn::new::<OpSGtHandler>();
        table[Opcode::EQ as usize] = OpCodeFn::new::<OpEqHandler>();
        table[Opcode::ISZERO as usize] = OpCodeFn::new::<OpIsZeroHandler>();
        table[Opcode::AND as usize] = OpCodeFn::new::<OpAndHandler>();
        table[Opcode::OR as usize] = OpCodeFn::new::<OpOrHandler>();
        table[Opcode::XOR as usize] = OpCodeFn::new::<OpXorHandler>();
        table[Opcode::NOT as usize] = OpCodeFn::new::<OpNotHandler>();
        table[Opcode::BYTE as usize] = OpCodeFn::new::<OpByteHandler>();

        table[Opcode::KECCAK256 as usize] = OpCodeFn::new::<OpKeccak256Handler>();

        table[Opcode::ADDRESS as usize] = OpCodeFn::new::<OpAddressHandler>();
        table[Opcode::BALANCE as usize] = OpCodeFn::new::<OpBalanceHandler>();
        table[Opcode::ORIGIN as usize] = OpCodeFn::new::<OpOriginHandler>();
        table[Opcode::CALLER as usize] = OpCodeFn::new::<OpCallerHandler>();
        table[Opcode::CALLVALUE as usize] = OpCodeFn::new::<OpCallValueHandler>();
        table[Opcode::CALLDATALOAD as usize] = OpCodeFn::new::<OpCallDataLoadHandler>();
        table[Opcode::CALLDATASIZE as usize] = OpCodeFn::new::<OpCallDataSizeHandler>();
        table[Opcode::CALLDATACOPY as usize] = OpCodeFn::new::<OpCallDataCopyHandler>();
        table[Opcode::CODESIZE as usize] = OpCodeFn::new::<OpCodeSizeHandler>();
        table[Opcode::CODECOPY as usize] = OpCodeFn::new::<OpCodeCopyHandler>();
        table[Opcode::GASPRICE as usize] = OpCodeFn::new::<OpGasPriceHandler>();
        table[Opcode::EXTCODESIZE as usize] = OpCodeFn::new::<OpExtCodeSizeHandler>();
        table[Opcode::EXTCODECOPY as usize] = OpCodeFn::new::<OpExtCodeCopyHandler>();

        table[Opcode::BLOCKHASH as usize] = OpCodeFn::new::<OpBlockHashHandler>();
        table[Opcode::COINBASE as usize] = OpCodeFn::new::<OpCoinbaseHandler>();
        table[Opcode::TIMESTAMP as usize] = OpCodeFn::new::<OpTimestampHandler>();
        table[Opcode::NUMBER as usize] = OpCodeFn::new::<OpNumberHandler>();
        table[Opcode::PREVRANDAO as usize] = OpCodeFn::new::<OpPrevRandaoHandler>();
        table[Opcode::GASLIMIT as usize] = OpCodeFn::new::<OpGasLimitHandler>();

        table[Opcode::POP as usize] = OpCodeFn::new::<OpPopHandler>();
        table[Opcode::MLOAD as usize] = OpCodeFn::new::<OpMLoadHandler>();
        table[Opcode::MSTORE as usize] = OpCodeFn::new::<OpMStoreHandler>();
        table[Opcode::MSTORE8 as usize] = OpCodeFn::new::<OpMStore8Handler>();
        table[Opcode::SLOAD as usize] = OpCodeFn::new::<OpSLoadHandler>();
        table[Opcode::SSTORE as usize] = OpCodeFn::new::<OpSStoreHandler>();
        table[Opcode::JUMP as usize] = OpCodeFn::new::<OpJumpHandler>();
        table[Opcode::JUMPI as usize] = OpCodeFn::new::<OpJumpIHandler>();
        table[Opcode::PC as usize] = OpCodeFn::new::<OpPcHandler>();
        table[Opcode::MSIZE as usize] = OpCodeFn::new::<OpMSizeHandler>();
        table[Opcode::GAS as usize] = OpCodeFn::new::<OpGasHandler>();
        table[Opcode::JUMPDEST as usize] = OpCodeFn::new::<OpJumpDestHandler>();

        table[Opcode::PUSH1 as usize] = OpCodeFn::new::<OpPushHandler<1>>();
        table[Opcode::PUSH2 as usize] = OpCodeFn::new::<OpPushHandler<2>>();
        table[Opcode::PUSH3 as usize] = OpCodeFn::new::<OpPushHandler<3>>();
        table[Opcode::PUSH4 as usize] = OpCodeFn::new::<OpPushHandler<4>>();
        table[Opcode::PUSH5 as usize] = OpCodeFn::new::<OpPushHandler<5>>();
        table[Opcode::PUSH6 as usize] = OpCodeFn::new::<OpPushHandler<6>>();
        table[Opcode::PUSH7 as usize] = OpCodeFn::new::<OpPushHandler<7>>();
        table[Opcode::PUSH8 as usize] = OpCodeFn::new::<OpPushHandler<8>>();
        table[Opcode::PUSH9 as usize] = OpCodeFn::new::<OpPushHandler<9>>();
        table[Opcode::PUSH10 as usize] = OpCodeFn::new::<OpPushHandler<10>>();
        table[Opcode::PUSH11 as usize] = OpCodeFn::new::<OpPushHandler<11>>();
        table[Opcode::PUSH12 as usize] = OpCodeFn::new::<OpPushHandler<12>>();
        table[Opcode::PUSH13 as usize] = OpCodeFn::new::<OpPushHandler<13>>();
        table[Opcode::PUSH14 as usize] = OpCodeFn::new::<OpPushHandler<14>>();
        table[Opcode::PUSH15 as usize] = OpCodeFn::new::<OpPushHandler<15>>();
        table[Opcode::PUSH16 as usize] = OpCodeFn::new::<OpPushHandler<16>>();
        table[Opcode::PUSH17 as usize] = OpCodeFn::new::<OpPushHandler<17>>();
        table[Opcode::PUSH18 as usize] = OpCodeFn::new::<OpPushHandler<18>>();
        table[Opcode::PUSH19 as usize] = OpCodeFn::new::<OpPushHandler<19>>();
        table[Opcode::PUSH20 as usize] = OpCodeFn::new::<OpPushHandler<20>>();
        table[Opcode::PUSH21 as usize] = OpCodeFn::new::<OpPushHandler<21>>();
        table[Opcode::PUSH22 as usize] = OpCodeFn::new::<OpPushHandler<22>>();
        table[Opcode::PUSH23 as usize] = OpCodeFn::new::<OpPushHandler<23>>();
        table[Opcode::PUSH24 as usize] = OpCodeFn::new::<OpPushHandler<24>>();
        table[Opcode::PUSH25 as usize] = OpCodeFn::new::<OpPushHandler<25>>();
        table[Opcode::PUSH26 as usize] = OpCodeFn::new::<OpPushHandler<26>>();
        table[Opcode::PUSH27 as usize] = OpCodeFn::new::<OpPushHandler<27>>();
        table[Opcode::PUSH28 as usize] = OpCodeFn::new::<OpPushHandler<28>>();
        table[Opcode::PUSH29 as usize] = OpCodeFn::new::<OpPushHandler<29>>();
        table[Opcode::PUSH30 as usize] = OpCodeFn::new::<OpPushHandler<30>>();
        table[Opcode::PUSH31 as usize] = OpCodeFn::new::<OpPushHandler<31>>();
        table[Opcode::PUSH32 as usize] = OpCodeFn::new::<OpPushHandler<32>>();

        table[Opcode::DUP1 as usize] = OpCodeFn::new::<OpDupHandler<0>>();
        table[Opcode::DUP2 as usize] = OpCodeFn::new::<OpDupHandler<1>>();
        table[Opcode::DUP3 as usize] = OpCodeFn::new::<OpDupHandler<2>>();
        table[Opcode::DUP4 as usize] = OpCodeFn::new::<OpDupHandler<3>>();
        table[Opcode::DUP5 as usize] = OpCodeFn::new::<OpDupHandler<4>>();
        table[Opcode::DUP6 as usize] = OpCodeFn::new::<OpDupHandler<5>>();
        table[Opcode::DUP7 as usize] = OpCodeFn::new::<OpDupHandler<6>>();
        table[Opcode::DUP8 as usize] = OpCodeFn::new::<OpDupHandler<7>>();
        table[Opcode::DUP9 as usize] = OpCodeFn::new::<OpDupHandler<8>>();
        table[Opcode::DUP10 as usize] = OpCodeFn::new::<OpDupHandler<9>>();
        table[Opcode::DUP11 as usize] = OpCodeFn::new::<OpDupHandler<10>>();
        table[Opcode::DUP12 as usize] = OpCodeFn::new::<OpDupHandler<11>>();
        table[Opcode::DUP13 as usize] = OpCodeFn::new::<OpDupHandler<12>>();
        table[Opcode::DUP14 as usize] = OpCodeFn::new::<OpDupHandler<13>>();
        table[Opcode::DUP15 as usize] = OpCodeFn::new::<OpDupHandler<14>>();
        table[Opcode::DUP16 as usize] = OpCodeFn::new::<OpDupHandler<15>>();

        table[Opcode::SWAP1 as usize] = OpCodeFn::new::<OpSwapHandler<1>>();
        table[Opcode::SWAP2 as usize] = OpCodeFn::new::<OpSwapHandler<2>>();
        table[Opcode::SWAP3 as usize] = OpCodeFn::new::<OpSwapHandler<3>>();
        table[Opcode::SWAP4 as usize] = OpCodeFn::new::<OpSwapHandler<4>>();
        table[Opcode::SWAP5 as usize] = OpCodeFn::new::<OpSwapHandler<5>>();
        table[Opcode::SWAP6 as usize] = OpCodeFn::new::<OpSwapHandler<6>>();
        table[Opcode::SWAP7 as usize] = OpCodeFn::new::<OpSwapHandler<7>>();
        table[Opcode::SWAP8 as usize] = OpCodeFn::new::<OpSwapHandler<8>>();
        table[Opcode::SWAP9 as usize] = OpCodeFn::new::<OpSwapHandler<9>>();
        table[Opcode::SWAP10 as usize] = OpCodeFn::new::<OpSwapHandler<10>>();
        table[Opcode::SWAP11 as usize] = OpCodeFn::new::<OpSwapHandler<11>>();
        table[Opcode::SWAP12 as usize] = OpCodeFn::new::<OpSwapHandler<12>>();
        table[Opcode::SWAP13 as usize] = OpCodeFn::new::<OpSwapHandler<13>>();
        table[Opcode::SWAP14 as usize] = OpCodeFn::new::<OpSwapHandler<14>>();
        table[Opcode::SWAP15 as usize] = OpCodeFn::new::<OpSwapHandler<15>>();
        table[Opcode::SWAP16 as usize] = OpCodeFn::new::<OpSwapHandler<16>>();

        table[Opcode::LOG0 as usize] = OpCodeFn::new::<OpLogHandler<0>>();
        table[Opcode::LOG1 as usize] = OpCodeFn::new::<OpLogHandler<1>>();
        table[Opcode::LOG2 as usize] = OpCodeFn::new::<OpLogHandler<2>>();
        table[Opcode::LOG3 as usize] = OpCodeFn::new::<OpLogHandler<3>>();
        table[Opcode::LOG4 as usize] = OpCodeFn::new::<OpLogHandler<4>>();

        table[Opcode::CREATE as usize] = OpCodeFn::new::<OpCreateHandler>();
        table[Opcode::CALL as usize] = OpCodeFn::new::<OpCallHandler>();
        table[Opcode::CALLCODE as usize] = OpCodeFn::new::<OpCallCodeHandler>();
        table[Opcode::RETURN as usize] = OpCodeFn::new::<OpReturnHandler>();
        table[Opcode::INVALID as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::SELFDESTRUCT as usize] = OpCodeFn::new::<OpSelfDestructHandler>();

        table
    }

    const fn build_opcode_table_homestead() -> [OpCodeFn; 256] {
        let mut table = Self::build_opcode_table_frontier();
        table[Opcode::DELEGATECALL as usize] = OpCodeFn::new::<OpDelegateCallHandler>();
        table
    }

    const fn build_opcode_table_byzantium() -> [OpCodeFn; 256] {
        let mut table = Self::build_opcode_table_homestead();
        table[Opcode::REVERT as usize] = OpCodeFn::new::<OpRevertHandler>();
        table[Opcode::STATICCALL as usize] = OpCodeFn::new::<OpStaticCallHandler>();
        table[Opcode::RETURNDATASIZE as usize] = OpCodeFn::new::<OpReturnDataSizeHandler>();
        table[Opcode::RETURNDATACOPY as usize] = OpCodeFn::new::<OpReturnDataCopyHandler>();
        table
    }

    const fn build_opcode_table_constantinople() -> [OpCodeFn; 256] {
        let mut table = Self::build_opcode_table_byzantium();
        table[Opcode::CREATE2 as usize] = OpCodeFn::new::<OpCreate2Handler>();
        table[Opcode::EXTCODEHASH as usize] = OpCodeFn::new::<OpExtCodeHashHandler>();
        table[Opcode::SHL as usize] = OpCodeFn::new::<OpShlHandler>();
        table[Opcode::SHR as usize] = OpCodeFn::new::<OpShrHandler>();
        table[Opcode::SAR as usize] = OpCodeFn::new::<OpSarHandler>();
        table
    }

    const fn build_opcode_table_istanbul() -> [OpCodeFn; 256] {
        let mut table = Self::build_opcode_table_constantinople();
        table[Opcode::CHAINID as usize] = OpCodeFn::new::<OpChainIdHandler>();
        table[Opcode::SELFBALANCE as usize] = OpCodeFn::new::<OpSelfBalanceHandler>();
        table
    }

    const fn build_opcode_table_london() -> [OpCodeFn; 256] {
        let mut table = Self::build_opcode_table_istanbul();
        table[Opcode::BASEFEE as usize] = OpCodeFn::new::<OpBaseFeeHandler>();
        table
    }

    const fn build_opcode_table_shanghai() -> [OpCodeFn; 256] {
        let mut table = Self::build_opcode_table_london();
        // [EIP-3855]
        table[Opcode::PUSH0 as usize] = OpCodeFn::new::<OpPush0Handler>();
        table
    }

    const fn build_opcode_table_cancun() -> [OpCodeFn; 256] {
        let mut table = Self::build_opcode_table_shanghai();
        // [EIP-1153]
        table[Opcode::TLOAD as usize] = OpCodeFn::new::<OpTLoadHandler>();
        table[Opcode::TSTORE as usize] = OpCodeFn::new::<OpTStoreHandler>();
        // [EIP-5656]
        table[Opcode::MCOPY as usize] = OpCodeFn::new::<OpMCopyHandler>();
        // [EIP-4844] / [EIP-7516]
        table[Opcode::BLOBHASH as usize] = OpCodeFn::new::<OpBlobHashHandler>();
        table[Opcode::BLOBBASEFEE as usize] = OpCodeFn::new::<OpBlobBaseFeeHandler>();
        table
    }

    /// Lookup table for code inside validated EOF containers. Deprecated
    /// legacy opcodes are absent by construction (validation rejects them),
    /// so their entries keep the INVALID handler.
    pub(crate) const fn build_eof_opcode_table() -> [OpCodeFn; 256] {
        let mut table = Self::build_opcode_table_cancun();

        // Deprecated instructions do not exist inside EOF.
        table[Opcode::JUMP as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::JUMPI as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::JUMPDEST as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::PC as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::GAS as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::CODESIZE as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::CODECOPY as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::EXTCODESIZE as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::EXTCODECOPY as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::EXTCODEHASH as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::CREATE as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::CREATE2 as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::CALL as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::CALLCODE as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::DELEGATECALL as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::STATICCALL as usize] = OpCodeFn::new::<OpInvalidHandler>();
        table[Opcode::SELFDESTRUCT as usize] = OpCodeFn::new::<OpInvalidHandler>();

        table[Opcode::DATALOAD as usize] = OpCodeFn::new::<OpDataLoadHandler>();
        table[Opcode::DATALOADN as usize] = OpCodeFn::new::<OpDataLoadNHandler>();
        table[Opcode::DATASIZE as usize] = OpCodeFn::new::<OpDataSizeHandler>();
        table[Opcode::DATACOPY as usize] = OpCodeFn::new::<OpDataCopyHandler>();

        table[Opcode::RJUMP as usize] = OpCodeFn::new::<OpRJumpHandler>();
        table[Opcode::RJUMPI as usize] = OpCodeFn::new::<OpRJumpIHandler>();
        table[Opcode::RJUMPV as usize] = OpCodeFn::new::<OpRJumpVHandler>();
        table[Opcode::CALLF as usize] = OpCodeFn::new::<OpCallFHandler>();
        table[Opcode::RETF as usize] = OpCodeFn::new::<OpRetFHandler>();
        table[Opcode::JUMPF as usize] = OpCodeFn::new::<OpJumpFHandler>();
        table[Opcode::DUPN as usize] = OpCodeFn::new::<OpDupNHandler>();
        table[Opcode::SWAPN as usize] = OpCodeFn::new::<OpSwapNHandler>();
        table[Opcode::EXCHANGE as usize] = OpCodeFn::new::<OpExchangeHandler>();
        table[Opcode::EOFCREATE as usize] = OpCodeFn::new::<OpEofCreateHandler>();
        table[Opcode::RETURNCONTRACT as usize] = OpCodeFn::new::<OpReturnContractHandler>();

        table[Opcode::RETURNDATALOAD as usize] = OpCodeFn::new::<OpReturnDataLoadHandler>();
        table[Opcode::EXTCALL as usize] = OpCodeFn::new::<OpExtCallHandler>();
        table[Opcode::EXTDELEGATECALL as usize] = OpCodeFn::new::<OpExtDelegateCallHandler>();
        table[Opcode::EXTSTATICCALL as usize] = OpCodeFn::new::<OpExtStaticCallHandler>();

        table
    }
}
