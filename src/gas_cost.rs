//! Static opcode costs and dynamic cost formulas.
//!
//! Costs that vary by fork go through the `GasSchedule`; the constants here
//! are the ones that have never been repriced.

use crate::{
    constants::{WORD_SIZE, WORD_SIZE_IN_BYTES_U64},
    environment::Fork,
    errors::{ExceptionalHalt, InternalError, PrecompileError, VMError},
    gas_schedule::GasSchedule,
    memory,
};
use bytes::Bytes;
use ethereum_types::U256;
use malachite::base::num::logic::traits::SignificantBits;
use malachite::Natural;
use ExceptionalHalt::OutOfGas;

// Flat opcode costs
pub const STOP: u64 = 0;
pub const ADD: u64 = 3;
pub const MUL: u64 = 5;
pub const SUB: u64 = 3;
pub const DIV: u64 = 5;
pub const SDIV: u64 = 5;
pub const MOD: u64 = 5;
pub const SMOD: u64 = 5;
pub const ADDMOD: u64 = 8;
pub const MULMOD: u64 = 8;
pub const EXP_STATIC: u64 = 10;
pub const SIGNEXTEND: u64 = 5;
pub const LT: u64 = 3;
pub const GT: u64 = 3;
pub const SLT: u64 = 3;
pub const SGT: u64 = 3;
pub const EQ: u64 = 3;
pub const ISZERO: u64 = 3;
pub const AND: u64 = 3;
pub const OR: u64 = 3;
pub const XOR: u64 = 3;
pub const NOT: u64 = 3;
pub const BYTE: u64 = 3;
pub const SHL: u64 = 3;
pub const SHR: u64 = 3;
pub const SAR: u64 = 3;
pub const KECCAK256_STATIC: u64 = 30;
pub const KECCAK256_DYNAMIC_BASE: u64 = 6;
pub const CALLDATALOAD: u64 = 3;
pub const CALLDATASIZE: u64 = 2;
pub const CALLDATACOPY_STATIC: u64 = 3;
pub const CALLDATACOPY_DYNAMIC_BASE: u64 = 3;
pub const RETURNDATASIZE: u64 = 2;
pub const RETURNDATACOPY_STATIC: u64 = 3;
pub const RETURNDATACOPY_DYNAMIC_BASE: u64 = 3;
pub const ADDRESS: u64 = 2;
pub const ORIGIN: u64 = 2;
pub const CALLER: u64 = 2;
pub const CALLVALUE: u64 = 2;
pub const CODESIZE: u64 = 2;
pub const CODECOPY_STATIC: u64 = 3;
pub const CODECOPY_DYNAMIC_BASE: u64 = 3;
pub const GASPRICE: u64 = 2;
pub const BLOCKHASH: u64 = 20;
pub const COINBASE: u64 = 2;
pub const TIMESTAMP: u64 = 2;
pub const NUMBER: u64 = 2;
pub const PREVRANDAO: u64 = 2;
pub const GASLIMIT: u64 = 2;
pub const CHAINID: u64 = 2;
pub const SELFBALANCE: u64 = 5;
pub const BASEFEE: u64 = 2;
pub const BLOBHASH: u64 = 3;
pub const BLOBBASEFEE: u64 = 2;
pub const POP: u64 = 2;
pub const MLOAD_STATIC: u64 = 3;
pub const MSTORE_STATIC: u64 = 3;
pub const MSTORE8_STATIC: u64 = 3;
pub const JUMP: u64 = 8;
pub const JUMPI: u64 = 10;
pub const PC: u64 = 2;
pub const MSIZE: u64 = 2;
pub const GAS: u64 = 2;
pub const JUMPDEST: u64 = 1;
pub const TLOAD: u64 = 100;
pub const TSTORE: u64 = 100;
pub const MCOPY_STATIC: u64 = 3;
pub const MCOPY_DYNAMIC_BASE: u64 = 3;
pub const PUSH0: u64 = 2;
pub const PUSHN: u64 = 3;
pub const DUPN: u64 = 3;
pub const SWAPN: u64 = 3;
pub const EXCHANGE: u64 = 3;
pub const LOGN_STATIC: u64 = 375;
pub const LOGN_DYNAMIC_BASE: u64 = 375;
pub const LOGN_DYNAMIC_BYTE_BASE: u64 = 8;

// EOF opcodes
pub const RJUMP: u64 = 2;
pub const RJUMPI: u64 = 4;
pub const RJUMPV: u64 = 4;
pub const CALLF: u64 = 5;
pub const RETF: u64 = 3;
pub const JUMPF: u64 = 5;
pub const DATALOAD: u64 = 4;
pub const DATALOADN: u64 = 3;
pub const DATASIZE: u64 = 2;
pub const DATACOPY_STATIC: u64 = 3;
pub const DATACOPY_DYNAMIC_BASE: u64 = 3;
pub const RETURNDATALOAD: u64 = 3;

// SSTORE
pub const SSTORE_STIPEND: i64 = 2300;

// Call family extras (stable across forks)
pub const CALL_POSITIVE_VALUE: u64 = 9000;
pub const CALL_POSITIVE_VALUE_STIPEND: u64 = 2300;

// Create family
pub const INIT_CODE_WORD_COST: u64 = 2;
pub const CODE_DEPOSIT_COST: u64 = 200;
pub const CREATE_BASE_COST: u64 = 32000;

// Access lists ([EIP-2930])
pub const ACCESS_LIST_STORAGE_KEY_COST: u64 = 1900;
pub const ACCESS_LIST_ADDRESS_COST: u64 = 2400;

// Precompile costs
pub const ECRECOVER_COST: u64 = 3000;
pub const SHA2_256_STATIC_COST: u64 = 60;
pub const SHA2_256_DYNAMIC_BASE: u64 = 12;
pub const RIPEMD_160_STATIC_COST: u64 = 600;
pub const RIPEMD_160_DYNAMIC_BASE: u64 = 120;
pub const IDENTITY_STATIC_COST: u64 = 15;
pub const IDENTITY_DYNAMIC_BASE: u64 = 3;
pub const MODEXP_STATIC_COST: u64 = 200;
pub const MODEXP_DYNAMIC_QUOTIENT: u64 = 3;
pub const MODEXP_DYNAMIC_QUOTIENT_PRE_BERLIN: u64 = 20;
pub const MODEXP_EXPONENT_FACTOR: u64 = 8;
pub const ECADD_COST: u64 = 150;
pub const ECMUL_COST: u64 = 6000;
pub const ECPAIRING_BASE_COST: u64 = 45000;
pub const ECPAIRING_GROUP_COST: u64 = 34000;
pub const BLAKE2F_ROUND_COST: u64 = 1;
pub const POINT_EVALUATION_COST: u64 = 50000;

pub const BLS12_381_G1ADD_COST: u64 = 375;
pub const BLS12_381_G2ADD_COST: u64 = 600;
pub const G1_MUL_COST: u64 = 12000;
pub const G2_MUL_COST: u64 = 22500;
pub const BLS12_381_MSM_MULTIPLIER: u64 = 1000;
pub const BLS12_PAIRING_CHECK_MUL_COST: u64 = 32600;
pub const BLS12_PAIRING_CHECK_FIXED_COST: u64 = 37700;
pub const BLS12_381_MAP_FP_TO_G1_COST: u64 = 5500;
pub const BLS12_381_MAP_FP2_TO_G2_COST: u64 = 23800;

pub const BLS12_381_G1_K_DISCOUNT: [u64; 128] = [
    1000, 949, 848, 797, 764, 750, 738, 728, 719, 712, 705, 698, 692, 687, 682, 677, 673, 669, 665,
    661, 658, 654, 651, 648, 645, 642, 640, 637, 635, 632, 630, 627, 625, 623, 621, 619, 617, 615,
    613, 611, 609, 608, 606, 604, 603, 601, 599, 598, 596, 595, 593, 592, 591, 589, 588, 586, 585,
    584, 582, 581, 580, 579, 577, 576, 575, 574, 573, 572, 570, 569, 568, 567, 566, 565, 564, 563,
    562, 561, 560, 559, 558, 557, 556, 555, 554, 553, 552, 551, 550, 549, 548, 547, 547, 546, 545,
    544, 543, 542, 541, 540, 540, 539, 538, 537, 536, 536, 535, 534, 533, 532, 532, 531, 530, 529,
    528, 528, 527, 526, 525, 525, 524, 523, 522, 522, 521, 520, 520, 519,
];
pub const BLS12_381_G2_K_DISCOUNT: [u64; 128] = [
    1000, 1000, 923, 884, 855, 832, 812, 796, 782, 770, 759, 749, 740, 732, 724, 717, 711, 704,
    699, 693, 688, 683, 679, 674, 670, 666, 663, 659, 655, 652, 649, 646, 643, 640, 637, 634, 632,
    629, 627, 624, 622, 620, 618, 615, 613, 611, 609, 607, 606, 604, 602, 600, 598, 597, 595, 593,
    592, 590, 589, 587, 586, 584, 583, 582, 580, 579, 578, 576, 575, 574, 573, 571, 570, 569, 568,
    567, 566, 565, 563, 562, 561, 560, 559, 558, 557, 556, 555, 554, 553, 552, 552, 551, 550, 549,
    548, 547, 546, 545, 545, 544, 543, 542, 541, 541, 540, 539, 538, 537, 537, 536, 535, 535, 534,
    533, 532, 532, 531, 530, 530, 529, 528, 528, 527, 526, 526, 525, 524, 524,
];

/// EXP: 10 gas plus a per-exponent-byte cost that was repriced by EIP-160.
pub fn exp(exponent: U256, fork: Fork) -> Result<u64, VMError> {
    let exponent_byte_size = (exponent.bits() as u64)
        .checked_add(7)
        .ok_or(OutOfGas)?
        / 8;

    let schedule = GasSchedule::for_fork(fork);
    let dynamic = schedule
        .exp_byte
        .checked_mul(exponent_byte_size)
        .ok_or(OutOfGas)?;

    EXP_STATIC.checked_add(dynamic).ok_or(OutOfGas.into())
}

fn copy_behavior(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
    dynamic_base: u64,
    static_cost: u64,
) -> Result<u64, VMError> {
    let minimum_word_size = size
        .checked_add(WORD_SIZE - 1)
        .ok_or(OutOfGas)?
        / WORD_SIZE;
    let minimum_word_size: u64 = minimum_word_size
        .try_into()
        .map_err(|_| ExceptionalHalt::VeryLargeNumber)?;

    let memory_expansion_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;
    let words_cost = dynamic_base
        .checked_mul(minimum_word_size)
        .ok_or(OutOfGas)?;

    static_cost
        .checked_add(words_cost)
        .ok_or(OutOfGas)?
        .checked_add(memory_expansion_cost)
        .ok_or(OutOfGas.into())
}

pub fn calldatacopy(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
) -> Result<u64, VMError> {
    copy_behavior(
        new_memory_size,
        current_memory_size,
        size,
        CALLDATACOPY_DYNAMIC_BASE,
        CALLDATACOPY_STATIC,
    )
}

pub fn codecopy(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
) -> Result<u64, VMError> {
    copy_behavior(
        new_memory_size,
        current_memory_size,
        size,
        CODECOPY_DYNAMIC_BASE,
        CODECOPY_STATIC,
    )
}

pub fn returndatacopy(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
) -> Result<u64, VMError> {
    copy_behavior(
        new_memory_size,
        current_memory_size,
        size,
        RETURNDATACOPY_DYNAMIC_BASE,
        RETURNDATACOPY_STATIC,
    )
}

pub fn datacopy(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
) -> Result<u64, VMError> {
    copy_behavior(
        new_memory_size,
        current_memory_size,
        size,
        DATACOPY_DYNAMIC_BASE,
        DATACOPY_STATIC,
    )
}

pub fn keccak256(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
) -> Result<u64, VMError> {
    copy_behavior(
        new_memory_size,
        current_memory_size,
        size,
        KECCAK256_DYNAMIC_BASE,
        KECCAK256_STATIC,
    )
}

/// RETURN and REVERT only pay for memory expansion.
pub fn exit_opcode(new_memory_size: usize, current_memory_size: usize) -> Result<u64, VMError> {
    memory::expansion_cost(new_memory_size, current_memory_size)
}

pub fn log(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
    number_of_topics: usize,
) -> Result<u64, VMError> {
    let memory_expansion_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;

    let topics_cost = LOGN_DYNAMIC_BASE
        .checked_mul(number_of_topics as u64)
        .ok_or(OutOfGas)?;
    let size: u64 = size
        .try_into()
        .map_err(|_| ExceptionalHalt::VeryLargeNumber)?;
    let bytes_cost = LOGN_DYNAMIC_BYTE_BASE.checked_mul(size).ok_or(OutOfGas)?;

    topics_cost
        .checked_add(LOGN_STATIC)
        .ok_or(OutOfGas)?
        .checked_add(bytes_cost)
        .ok_or(OutOfGas)?
        .checked_add(memory_expansion_cost)
        .ok_or(OutOfGas.into())
}

fn mem_expansion_behavior(
    new_memory_size: usize,
    current_memory_size: usize,
    static_cost: u64,
) -> Result<u64, VMError> {
    let memory_expansion_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;
    static_cost
        .checked_add(memory_expansion_cost)
        .ok_or(OutOfGas.into())
}

pub fn mload(new_memory_size: usize, current_memory_size: usize) -> Result<u64, VMError> {
    mem_expansion_behavior(new_memory_size, current_memory_size, MLOAD_STATIC)
}

pub fn mstore(new_memory_size: usize, current_memory_size: usize) -> Result<u64, VMError> {
    mem_expansion_behavior(new_memory_size, current_memory_size, MSTORE_STATIC)
}

pub fn mstore8(new_memory_size: usize, current_memory_size: usize) -> Result<u64, VMError> {
    mem_expansion_behavior(new_memory_size, current_memory_size, MSTORE8_STATIC)
}

pub fn mcopy(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
) -> Result<u64, VMError> {
    copy_behavior(
        new_memory_size,
        current_memory_size,
        size,
        MCOPY_DYNAMIC_BASE,
        MCOPY_STATIC,
    )
}

pub fn sload(storage_slot_was_cold: bool, fork: Fork) -> u64 {
    GasSchedule::for_fork(fork).sload_cost(storage_slot_was_cold)
}

/// SSTORE cost per the fork's metering model:
/// - Berlin+: cold/warm access plus EIP-2200 net metering
/// - Istanbul and Constantinople: EIP-2200/1283 net metering
/// - everything else (including Petersburg): the original two-tier model
pub fn sstore(
    original_value: U256,
    current_value: U256,
    new_value: U256,
    storage_slot_was_cold: bool,
    fork: Fork,
) -> Result<u64, VMError> {
    let schedule = GasSchedule::for_fork(fork);

    if schedule.has_access_lists {
        let base_dynamic_gas = if new_value == current_value {
            schedule.warm_sload
        } else if current_value == original_value {
            if original_value.is_zero() {
                schedule.sstore_set
            } else {
                schedule.sstore_reset
            }
        } else {
            schedule.warm_sload
        };

        let cold_access_cost = if storage_slot_was_cold {
            schedule.cold_sload
        } else {
            0
        };

        return base_dynamic_gas
            .checked_add(cold_access_cost)
            .ok_or(OutOfGas.into());
    }

    if schedule.has_net_metering {
        if new_value == current_value {
            return Ok(schedule.sload);
        }
        if current_value == original_value {
            if original_value.is_zero() {
                return Ok(schedule.sstore_set);
            }
            return Ok(schedule.sstore_reset);
        }
        return Ok(schedule.sload);
    }

    // Original model: clearing costs the reset price, fresh non-zero writes
    // cost the set price, everything else is a reset.
    if current_value.is_zero() && !new_value.is_zero() {
        Ok(schedule.sstore_set)
    } else {
        Ok(schedule.sstore_reset)
    }
}

/// Signed refund adjustment SSTORE makes, per the fork's metering model.
pub fn sstore_refund_delta(
    original_value: U256,
    current_value: U256,
    new_value: U256,
    fork: Fork,
) -> i64 {
    let schedule = GasSchedule::for_fork(fork);
    let clears_refund = schedule.sstore_clears_refund as i64;

    if !schedule.has_net_metering {
        if !current_value.is_zero() && new_value.is_zero() {
            return clears_refund;
        }
        return 0;
    }

    // Warm-read price the no-op case is charged at, used to rebate
    // previously charged set/reset costs when a slot returns to its
    // original value.
    let warm_gas = if schedule.has_access_lists {
        schedule.warm_sload
    } else {
        schedule.sload
    } as i64;

    let mut delta = 0i64;
    if new_value == current_value {
        return 0;
    }

    if current_value == original_value {
        if !original_value.is_zero() && new_value.is_zero() {
            delta += clears_refund;
        }
    } else {
        if !original_value.is_zero() {
            if current_value.is_zero() {
                delta -= clears_refund;
            } else if new_value.is_zero() {
                delta += clears_refund;
            }
        }
        if new_value == original_value {
            if original_value.is_zero() {
                delta += schedule.sstore_set as i64 - warm_gas;
            } else {
                delta += schedule.sstore_reset as i64 - warm_gas;
            }
        }
    }

    delta
}

pub fn balance(address_was_cold: bool, fork: Fork) -> u64 {
    let schedule = GasSchedule::for_fork(fork);
    schedule.account_access_cost(address_was_cold, schedule.balance)
}

pub fn extcodesize(address_was_cold: bool, fork: Fork) -> u64 {
    let schedule = GasSchedule::for_fork(fork);
    schedule.account_access_cost(address_was_cold, schedule.extcodesize)
}

pub fn extcodehash(address_was_cold: bool, fork: Fork) -> u64 {
    let schedule = GasSchedule::for_fork(fork);
    schedule.account_access_cost(address_was_cold, schedule.extcodehash)
}

pub fn extcodecopy(
    size: usize,
    new_memory_size: usize,
    current_memory_size: usize,
    address_was_cold: bool,
    fork: Fork,
) -> Result<u64, VMError> {
    let schedule = GasSchedule::for_fork(fork);
    let copy_cost = copy_behavior(
        new_memory_size,
        current_memory_size,
        size,
        CODECOPY_DYNAMIC_BASE,
        0,
    )?;
    let account_access_cost =
        schedule.account_access_cost(address_was_cold, schedule.extcodecopy_base);

    copy_cost
        .checked_add(account_access_cost)
        .ok_or(OutOfGas.into())
}

/// CALL: returns `(cost charged to the caller, gas limit handed to the
/// child)`.
#[allow(clippy::too_many_arguments)]
pub fn call(
    new_memory_size: usize,
    current_memory_size: usize,
    address_was_cold: bool,
    address_is_empty: bool,
    address_exists: bool,
    value_to_transfer: U256,
    gas_from_stack: U256,
    gas_left: u64,
    fork: Fork,
) -> Result<(u64, u64), VMError> {
    let memory_expansion_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;
    let schedule = GasSchedule::for_fork(fork);

    let address_access_cost = schedule.call_cost(address_was_cold);
    let positive_value_cost = if !value_to_transfer.is_zero() {
        CALL_POSITIVE_VALUE
    } else {
        0
    };

    // G_newaccount:
    // - pre-EIP-161 forks charge for calls to non-existent accounts,
    // - from Spurious Dragon on only for value transfers into dead accounts.
    let eip161 = fork >= Fork::SpuriousDragon;
    let new_account_cost = if eip161 {
        if address_is_empty && !value_to_transfer.is_zero() {
            schedule.call_new_account
        } else {
            0
        }
    } else if !address_exists {
        schedule.call_new_account
    } else {
        0
    };

    let call_gas_costs = memory_expansion_cost
        .checked_add(address_access_cost)
        .ok_or(OutOfGas)?
        .checked_add(positive_value_cost)
        .ok_or(OutOfGas)?
        .checked_add(new_account_cost)
        .ok_or(OutOfGas)?;

    calculate_cost_and_gas_limit_call(
        value_to_transfer.is_zero(),
        gas_from_stack,
        gas_left,
        call_gas_costs,
        CALL_POSITIVE_VALUE_STIPEND,
        fork,
    )
}

pub fn callcode(
    new_memory_size: usize,
    current_memory_size: usize,
    address_was_cold: bool,
    value_to_transfer: U256,
    gas_from_stack: U256,
    gas_left: u64,
    fork: Fork,
) -> Result<(u64, u64), VMError> {
    let memory_expansion_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;
    let schedule = GasSchedule::for_fork(fork);

    let address_access_cost = schedule.call_cost(address_was_cold);
    let positive_value_cost = if !value_to_transfer.is_zero() {
        CALL_POSITIVE_VALUE
    } else {
        0
    };

    let call_gas_costs = memory_expansion_cost
        .checked_add(address_access_cost)
        .ok_or(OutOfGas)?
        .checked_add(positive_value_cost)
        .ok_or(OutOfGas)?;

    calculate_cost_and_gas_limit_call(
        value_to_transfer.is_zero(),
        gas_from_stack,
        gas_left,
        call_gas_costs,
        CALL_POSITIVE_VALUE_STIPEND,
        fork,
    )
}

pub fn delegatecall(
    new_memory_size: usize,
    current_memory_size: usize,
    address_was_cold: bool,
    gas_from_stack: U256,
    gas_left: u64,
    fork: Fork,
) -> Result<(u64, u64), VMError> {
    let memory_expansion_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;
    let schedule = GasSchedule::for_fork(fork);

    let call_gas_costs = memory_expansion_cost
        .checked_add(schedule.call_cost(address_was_cold))
        .ok_or(OutOfGas)?;

    calculate_cost_and_gas_limit_call(true, gas_from_stack, gas_left, call_gas_costs, 0, fork)
}

pub fn staticcall(
    new_memory_size: usize,
    current_memory_size: usize,
    address_was_cold: bool,
    gas_from_stack: U256,
    gas_left: u64,
    fork: Fork,
) -> Result<(u64, u64), VMError> {
    delegatecall(
        new_memory_size,
        current_memory_size,
        address_was_cold,
        gas_from_stack,
        gas_left,
        fork,
    )
}

/// Shared tail of the CALL family: deduct the upfront costs, apply the 63/64
/// cap (EIP-150 forks), clamp to the requested gas, and add the stipend for
/// value-bearing calls.
fn calculate_cost_and_gas_limit_call(
    value_is_zero: bool,
    gas_from_stack: U256,
    gas_left: u64,
    call_gas_costs: u64,
    stipend: u64,
    fork: Fork,
) -> Result<(u64, u64), VMError> {
    let gas_stipend = if value_is_zero { 0 } else { stipend };
    let gas_left = gas_left.checked_sub(call_gas_costs).ok_or(OutOfGas)?;

    let schedule = GasSchedule::for_fork(fork);
    let max_gas_for_call = if schedule.has_63_64_rule {
        gas_left.checked_sub(gas_left / 64).ok_or(OutOfGas)?
    } else {
        gas_left
    };

    let gas: u64 = gas_from_stack
        .min(max_gas_for_call.into())
        .try_into()
        .map_err(|_| OutOfGas)?;

    Ok((
        gas.checked_add(call_gas_costs).ok_or(OutOfGas)?,
        gas.checked_add(gas_stipend).ok_or(OutOfGas)?,
    ))
}

/// Gas ceiling for child frames created by CREATE and EOFCREATE (and the
/// pre-EIP-150 behavior of passing everything).
pub fn max_message_call_gas(gas_remaining: u64, fork: Fork) -> u64 {
    if GasSchedule::for_fork(fork).has_63_64_rule {
        gas_remaining - gas_remaining / 64
    } else {
        gas_remaining
    }
}

pub fn create(
    new_memory_size: usize,
    current_memory_size: usize,
    code_size_in_memory: usize,
    fork: Fork,
) -> Result<u64, VMError> {
    compute_gas_create(
        new_memory_size,
        current_memory_size,
        code_size_in_memory,
        false,
        fork,
    )
}

pub fn create_2(
    new_memory_size: usize,
    current_memory_size: usize,
    code_size_in_memory: usize,
    fork: Fork,
) -> Result<u64, VMError> {
    compute_gas_create(
        new_memory_size,
        current_memory_size,
        code_size_in_memory,
        true,
        fork,
    )
}

fn compute_gas_create(
    new_memory_size: usize,
    current_memory_size: usize,
    code_size_in_memory: usize,
    is_create_2: bool,
    fork: Fork,
) -> Result<u64, VMError> {
    let minimum_word_size = (code_size_in_memory.checked_add(31).ok_or(OutOfGas)?) / 32;
    let minimum_word_size: u64 = minimum_word_size
        .try_into()
        .map_err(|_| ExceptionalHalt::VeryLargeNumber)?;

    // [EIP-3860] initcode metering from Shanghai on
    let init_code_cost = if fork >= Fork::Shanghai {
        minimum_word_size
            .checked_mul(INIT_CODE_WORD_COST)
            .ok_or(OutOfGas)?
    } else {
        0
    };

    let memory_expansion_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;

    let hash_cost = if is_create_2 {
        minimum_word_size
            .checked_mul(KECCAK256_DYNAMIC_BASE)
            .ok_or(OutOfGas)?
    } else {
        0
    };

    memory_expansion_cost
        .checked_add(init_code_cost)
        .ok_or(OutOfGas)?
        .checked_add(CREATE_BASE_COST)
        .ok_or(OutOfGas)?
        .checked_add(hash_cost)
        .ok_or(OutOfGas.into())
}

/// EOFCREATE: base cost plus memory expansion plus hashing of the
/// initcontainer for the address derivation.
pub fn eofcreate(
    new_memory_size: usize,
    current_memory_size: usize,
    initcontainer_size: usize,
) -> Result<u64, VMError> {
    let words: u64 = initcontainer_size
        .div_ceil(WORD_SIZE)
        .try_into()
        .map_err(|_| ExceptionalHalt::VeryLargeNumber)?;
    let hash_cost = words.checked_mul(KECCAK256_DYNAMIC_BASE).ok_or(OutOfGas)?;
    let memory_expansion_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;

    CREATE_BASE_COST
        .checked_add(hash_cost)
        .ok_or(OutOfGas)?
        .checked_add(memory_expansion_cost)
        .ok_or(OutOfGas.into())
}

pub fn selfdestruct(
    address_was_cold: bool,
    account_is_empty: bool,
    account_exists: bool,
    balance_to_transfer: U256,
    fork: Fork,
) -> Result<u64, VMError> {
    let schedule = GasSchedule::for_fork(fork);

    let cold_cost = if schedule.has_access_lists && address_was_cold {
        schedule.cold_account_access
    } else {
        0
    };

    let eip161 = fork >= Fork::SpuriousDragon;
    let new_account_cost = if eip161 {
        if account_is_empty && !balance_to_transfer.is_zero() {
            schedule.selfdestruct_new_account
        } else {
            0
        }
    } else if !account_exists {
        schedule.selfdestruct_new_account
    } else {
        0
    };

    schedule
        .selfdestruct
        .checked_add(cold_cost)
        .ok_or(OutOfGas)?
        .checked_add(new_account_cost)
        .ok_or(OutOfGas.into())
}

/// Intrinsic gas of a transaction: the base cost, calldata bytes, create
/// surcharges and access-list charges.
pub fn tx_intrinsic_gas(
    calldata: &Bytes,
    is_create: bool,
    access_list_addresses: u64,
    access_list_keys: u64,
    fork: Fork,
) -> Result<u64, VMError> {
    let schedule = GasSchedule::for_fork(fork);

    let mut gas = crate::constants::TX_BASE_COST;
    for byte in calldata {
        let cost = if *byte != 0 {
            schedule.calldata_nonzero
        } else {
            schedule.calldata_zero
        };
        gas = gas.checked_add(cost).ok_or(OutOfGas)?;
    }

    if is_create && fork >= Fork::Homestead {
        gas = gas.checked_add(CREATE_BASE_COST).ok_or(OutOfGas)?;
        if fork >= Fork::Shanghai {
            let words = calldata.len().div_ceil(WORD_SIZE) as u64;
            gas = gas
                .checked_add(words.checked_mul(INIT_CODE_WORD_COST).ok_or(OutOfGas)?)
                .ok_or(OutOfGas)?;
        }
    }

    gas = gas
        .checked_add(
            access_list_addresses
                .checked_mul(ACCESS_LIST_ADDRESS_COST)
                .ok_or(OutOfGas)?,
        )
        .ok_or(OutOfGas)?;
    gas = gas
        .checked_add(
            access_list_keys
                .checked_mul(ACCESS_LIST_STORAGE_KEY_COST)
                .ok_or(OutOfGas)?,
        )
        .ok_or(OutOfGas)?;

    Ok(gas)
}

/// Linear precompile pricing: `static + dynamic * ceil(len / 32)`.
pub fn linear_precompile(
    data_size: usize,
    static_cost: u64,
    dynamic_base: u64,
) -> Result<u64, VMError> {
    let data_size: u64 = data_size
        .try_into()
        .map_err(|_| PrecompileError::ParsingInputError)?;
    let words = data_size
        .checked_add(WORD_SIZE_IN_BYTES_U64 - 1)
        .ok_or(OutOfGas)?
        / WORD_SIZE_IN_BYTES_U64;

    let dynamic = dynamic_base.checked_mul(words).ok_or(OutOfGas)?;
    static_cost.checked_add(dynamic).ok_or(OutOfGas.into())
}

pub fn sha2_256(data_size: usize) -> Result<u64, VMError> {
    linear_precompile(data_size, SHA2_256_STATIC_COST, SHA2_256_DYNAMIC_BASE)
}

pub fn ripemd_160(data_size: usize) -> Result<u64, VMError> {
    linear_precompile(data_size, RIPEMD_160_STATIC_COST, RIPEMD_160_DYNAMIC_BASE)
}

pub fn identity(data_size: usize) -> Result<u64, VMError> {
    linear_precompile(data_size, IDENTITY_STATIC_COST, IDENTITY_DYNAMIC_BASE)
}

/// MODEXP pricing: the EIP-198 multiplication-complexity formula before
/// Berlin, the simplified EIP-2565 formula (with its 200 gas floor) after.
pub fn modexp(
    exponent_first_32_bytes: &Natural,
    base_size: usize,
    exponent_size: usize,
    modulus_size: usize,
    fork: Fork,
) -> Result<u64, VMError> {
    let base_size: u64 = base_size
        .try_into()
        .map_err(|_| PrecompileError::ParsingInputError)?;
    let exponent_size: u64 = exponent_size
        .try_into()
        .map_err(|_| PrecompileError::ParsingInputError)?;
    let modulus_size: u64 = modulus_size
        .try_into()
        .map_err(|_| PrecompileError::ParsingInputError)?;

    let max_length = base_size.max(modulus_size);

    let multiplication_complexity = if fork >= Fork::Berlin {
        // https://eips.ethereum.org/EIPS/eip-2565
        let words = (max_length.checked_add(7).ok_or(OutOfGas)?) / 8;
        words.checked_pow(2).ok_or(OutOfGas)?
    } else {
        // https://eips.ethereum.org/EIPS/eip-198
        if max_length <= 64 {
            max_length.checked_pow(2).ok_or(OutOfGas)?
        } else if max_length <= 1024 {
            max_length
                .checked_pow(2)
                .ok_or(OutOfGas)?
                / 4
                + 96u64.checked_mul(max_length).ok_or(OutOfGas)?
                - 3072
        } else {
            max_length
                .checked_pow(2)
                .ok_or(OutOfGas)?
                / 16
                + 480u64.checked_mul(max_length).ok_or(OutOfGas)?
                - 199_680
        }
    };

    let iteration_count = if exponent_size <= 32 && *exponent_first_32_bytes != Natural::from(0u32)
    {
        exponent_first_32_bytes
            .significant_bits()
            .saturating_sub(1)
    } else if exponent_size > 32 {
        let extra = (exponent_size - 32)
            .checked_mul(MODEXP_EXPONENT_FACTOR)
            .ok_or(OutOfGas)?;
        extra
            .checked_add(exponent_first_32_bytes.significant_bits().max(1))
            .ok_or(OutOfGas)?
            - 1
    } else {
        0
    }
    .max(1);

    let quotient = if fork >= Fork::Berlin {
        MODEXP_DYNAMIC_QUOTIENT
    } else {
        MODEXP_DYNAMIC_QUOTIENT_PRE_BERLIN
    };

    let dynamic_cost = multiplication_complexity
        .checked_mul(iteration_count)
        .ok_or(OutOfGas)?
        / quotient;

    Ok(if fork >= Fork::Berlin {
        MODEXP_STATIC_COST.max(dynamic_cost)
    } else {
        dynamic_cost
    })
}

pub fn ecpairing(groups_number: usize) -> Result<u64, VMError> {
    let groups_number = u64::try_from(groups_number).map_err(|_| InternalError::TypeConversion)?;
    groups_number
        .checked_mul(ECPAIRING_GROUP_COST)
        .ok_or(OutOfGas)?
        .checked_add(ECPAIRING_BASE_COST)
        .ok_or(OutOfGas.into())
}

/// Multi-scalar multiplication pricing with the per-size discount table.
pub fn bls12_msm(k: usize, discount_table: &[u64; 128], mul_cost: u64) -> Result<u64, VMError> {
    if k == 0 {
        return Ok(0);
    }

    let discount = if k <= discount_table.len() {
        discount_table[k - 1]
    } else {
        discount_table[discount_table.len() - 1]
    };

    let gas_cost = u64::try_from(k)
        .map_err(|_| ExceptionalHalt::VeryLargeNumber)?
        .checked_mul(mul_cost)
        .ok_or(OutOfGas)?
        .checked_mul(discount)
        .ok_or(OutOfGas)?
        / BLS12_381_MSM_MULTIPLIER;
    Ok(gas_cost)
}

pub fn bls12_pairing_check(k: usize) -> Result<u64, VMError> {
    u64::try_from(k)
        .map_err(|_| ExceptionalHalt::VeryLargeNumber)?
        .checked_mul(BLS12_PAIRING_CHECK_MUL_COST)
        .ok_or(OutOfGas)?
        .checked_add(BLS12_PAIRING_CHECK_FIXED_COST)
        .ok_or(OutOfGas.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exp_cost_tracks_exponent_width() {
        assert_eq!(exp(U256::zero(), Fork::London).unwrap(), 10);
        assert_eq!(exp(U256::from(0xff), Fork::London).unwrap(), 60);
        assert_eq!(exp(U256::from(0x100), Fork::London).unwrap(), 110);
        // Pre-Spurious Dragon the per-byte price was 10.
        assert_eq!(exp(U256::from(0xff), Fork::Homestead).unwrap(), 20);
    }

    #[test]
    fn sstore_no_op_costs_a_warm_read() {
        let v = U256::from(5);
        assert_eq!(sstore(v, v, v, false, Fork::London).unwrap(), 100);
        assert_eq!(sstore(v, v, v, true, Fork::London).unwrap(), 2200);
        assert_eq!(sstore(v, v, v, false, Fork::Istanbul).unwrap(), 800);
    }

    #[test]
    fn sstore_fresh_write_costs_set_price() {
        let zero = U256::zero();
        let one = U256::one();
        assert_eq!(sstore(zero, zero, one, false, Fork::London).unwrap(), 20000);
        assert_eq!(
            sstore(zero, zero, one, true, Fork::London).unwrap(),
            22100
        );
        assert_eq!(sstore(zero, zero, one, false, Fork::Homestead).unwrap(), 20000);
    }

    #[test]
    fn sstore_clear_refunds_by_fork() {
        let one = U256::one();
        let zero = U256::zero();
        assert_eq!(sstore_refund_delta(one, one, zero, Fork::London), 4800);
        assert_eq!(sstore_refund_delta(one, one, zero, Fork::Berlin), 15000);
        assert_eq!(sstore_refund_delta(one, one, zero, Fork::Homestead), 15000);
        // Writing back the original value rebates the earlier reset.
        assert_eq!(
            sstore_refund_delta(one, U256::from(2), one, Fork::London),
            2900 - 100
        );
    }

    #[test]
    fn call_respects_63_64_rule_from_tangerine_whistle() {
        // Plenty of requested gas, no extra costs: child gets 63/64.
        let (cost, limit) = call(
            0,
            0,
            false,
            false,
            true,
            U256::zero(),
            U256::MAX,
            64_000,
            Fork::London,
        )
        .unwrap();
        assert_eq!(limit, 64_000 - 100 - (64_000 - 100) / 64);
        assert_eq!(cost, limit + 100);

        // Pre-EIP-150 the child may take everything requested.
        let (_, limit) = call(
            0,
            0,
            false,
            false,
            true,
            U256::zero(),
            U256::MAX,
            64_000,
            Fork::Homestead,
        )
        .unwrap();
        assert_eq!(limit, 64_000 - 40);
    }

    #[test]
    fn intrinsic_gas_counts_calldata_and_access_list() {
        let data = Bytes::from_static(&[0, 1, 0, 2]);
        let gas = tx_intrinsic_gas(&data, false, 1, 2, Fork::London).unwrap();
        assert_eq!(gas, 21000 + 4 + 16 + 4 + 16 + 2400 + 2 * 1900);
        // Pre-Istanbul non-zero bytes cost 68.
        let gas = tx_intrinsic_gas(&data, false, 0, 0, Fork::Byzantium).unwrap();
        assert_eq!(gas, 21000 + 4 + 68 + 4 + 68);
    }

    #[test]
    fn modexp_gas_floor_applies_from_berlin() {
        let exp_head = Natural::from(3u32);
        let cost = modexp(&exp_head, 32, 32, 32, Fork::London).unwrap();
        assert_eq!(cost, 200);
        let cost = modexp(&exp_head, 32, 32, 32, Fork::Istanbul).unwrap();
        // EIP-198: 32^2 * 1 / 20
        assert_eq!(cost, 51);
    }
}
