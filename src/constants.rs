use ethereum_types::{H256, U256};

pub const WORD_SIZE: usize = 32;
pub const WORD_SIZE_IN_BYTES_USIZE: usize = 32;
pub const WORD_SIZE_IN_BYTES_U64: u64 = 32;

pub const SUCCESS: U256 = U256([1, 0, 0, 0]);
pub const FAIL: U256 = U256::zero();

pub const STACK_LIMIT: usize = 1024;
pub const MAX_CALL_DEPTH: usize = 1024;

/// keccak256 of the empty byte string.
pub const EMPTY_CODE_HASH: H256 = H256([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

pub const MEMORY_EXPANSION_QUOTIENT: usize = 512;

// Transaction costs in gas
pub const TX_BASE_COST: u64 = 21000;

// [EIP-170] runtime code size cap, [EIP-3860] initcode size cap
pub const MAX_CODE_SIZE: usize = 0x6000;
pub const INIT_CODE_MAX_SIZE: usize = 49152;

// [EIP-3541]
pub const INVALID_CONTRACT_PREFIX: u8 = 0xef;

// EOF container framing
pub const EOF_MAGIC: [u8; 2] = [0xef, 0x00];
pub const EOF_VERSION: u8 = 0x01;

// [EIP-7069] minimum gas bounds for the EXT*CALL family
pub const MIN_RETAINED_GAS: u64 = 5000;
pub const MIN_CALLEE_GAS: u64 = 2300;
pub const EXTCALL_SUCCESS: U256 = U256::zero();
pub const EXTCALL_REVERTED: U256 = U256([1, 0, 0, 0]);
pub const EXTCALL_FAILED: U256 = U256([2, 0, 0, 0]);

// [EIP-4750] CALLF return stack depth limit
pub const RETURN_STACK_LIMIT: usize = 1024;

pub const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

// BLOCKHASH serves the most recent 256 blocks
pub const LAST_AVAILABLE_BLOCK_LIMIT: u64 = 256;

/// Default weight bound (in bytes) for the shared jump-target analysis cache.
pub const DEFAULT_ANALYSIS_CACHE_WEIGHT: usize = 32 * 1024 * 1024;

/// Default weight bound (in bytes) for the optional precompile result cache.
pub const DEFAULT_PRECOMPILE_CACHE_WEIGHT: usize = 4 * 1024 * 1024;
