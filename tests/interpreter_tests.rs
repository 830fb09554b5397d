//! End-to-end interpreter scenarios over the in-memory database.

use bytes::Bytes;
use corevm::{
    constants::TX_BASE_COST,
    errors::{ExceptionalHalt, TxResult, VMError},
    tracing::noop_tracer,
    utils::{new_db_with_bytecode, new_db_with_bytecode_and_calldata, test_sender},
    vm::VM,
    Fork,
};
use ethereum_types::U256;

fn run(code: &str, fork: Fork) -> corevm::ExecutionReport {
    let bytecode = Bytes::from(hex::decode(code).unwrap());
    let (mut db, env, tx) = new_db_with_bytecode(bytecode, fork);
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    vm.execute().unwrap()
}

#[test]
fn add_and_return() {
    // PUSH1 1; PUSH1 2; ADD; PUSH1 0; MSTORE; PUSH1 0x20; PUSH1 0; RETURN
    let report = run("600160020160005260206000f3", Fork::Cancun);

    assert!(report.is_success());
    assert_eq!(report.output.len(), 32);
    assert_eq!(U256::from_big_endian(&report.output), U256::from(3));
    // 5 pushes + ADD + MSTORE + one word of memory expansion.
    assert_eq!(report.gas_used, TX_BASE_COST + 5 * 3 + 3 + 3 + 3);
}

#[test]
fn signed_comparison_with_int256_min() {
    // PUSH32 INT256_MIN; PUSH1 0; SGT -> 1 (0 > INT256_MIN signed)
    let int256_min = format!("7f80{}", "00".repeat(31));
    let report = run(
        &format!("{int256_min}60001360005260206000f3"),
        Fork::Cancun,
    );
    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::one());

    // Same operands under SLT -> 0
    let report = run(
        &format!("{int256_min}60001260005260206000f3"),
        Fork::Cancun,
    );
    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::zero());
}

#[test]
fn division_by_zero_yields_zero() {
    // PUSH1 0; PUSH1 42; DIV -> 0, no fault
    let report = run("6000602a0460005260206000f3", Fork::Cancun);
    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::zero());
}

#[test]
fn smod_takes_sign_of_dividend() {
    // SMOD(-8, 3) == -2: PUSH1 3; PUSH32 -8; SMOD
    let minus_eight = format!("7f{}f8", "ff".repeat(31));
    let report = run(
        &format!("6003{minus_eight}0760005260206000f3"),
        Fork::Cancun,
    );
    assert!(report.is_success());
    let minus_two = U256::zero().overflowing_sub(U256::from(2)).0;
    assert_eq!(U256::from_big_endian(&report.output), minus_two);
}

#[test]
fn sdiv_int256_min_by_minus_one_wraps() {
    let minus_one = format!("7f{}", "ff".repeat(32));
    let int256_min = format!("7f80{}", "00".repeat(31));
    let report = run(
        &format!("{minus_one}{int256_min}0560005260206000f3"),
        Fork::Cancun,
    );
    assert!(report.is_success());
    let expected = U256::one() << 255;
    assert_eq!(U256::from_big_endian(&report.output), expected);
}

#[test]
fn out_of_gas_on_memory_expansion_consumes_everything() {
    // PUSH1 1; PUSH4 0xFFFFFFFF; MSTORE with a small gas budget.
    let bytecode = Bytes::from(hex::decode("600163ffffffff52").unwrap());
    let (mut db, mut env, tx) = new_db_with_bytecode(bytecode, Fork::Cancun);
    env.gas_limit = TX_BASE_COST + 1000;

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();

    assert!(!report.is_success());
    assert!(matches!(
        report.result,
        TxResult::Revert(VMError::ExceptionalHalt(ExceptionalHalt::OutOfGas))
    ));
    assert_eq!(report.gas_used, TX_BASE_COST + 1000);
    assert!(report.output.is_empty());
}

#[test]
fn invalid_opcode_consumes_all_gas() {
    let bytecode = Bytes::from(hex::decode("fe").unwrap());
    let (mut db, mut env, tx) = new_db_with_bytecode(bytecode, Fork::Cancun);
    env.gas_limit = 50_000;

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();

    assert!(matches!(
        report.result,
        TxResult::Revert(VMError::ExceptionalHalt(ExceptionalHalt::InvalidOpcode))
    ));
    assert_eq!(report.gas_used, 50_000);
}

#[test]
fn bad_jump_destination_faults() {
    // PUSH1 3; JUMP, where target 3 is not a JUMPDEST
    let report = run("600356", Fork::Cancun);
    assert!(matches!(
        report.result,
        TxResult::Revert(VMError::ExceptionalHalt(ExceptionalHalt::InvalidJump))
    ));
}

#[test]
fn jumpdest_inside_push_immediate_is_invalid() {
    // PUSH1 2; JUMP; <0x5B as immediate of a PUSH1 at offset 4>
    // Code: 6004 56 605b. Target 4 is the 0x5b byte, but it is immediate data.
    let report = run("600456605b", Fork::Cancun);
    assert!(matches!(
        report.result,
        TxResult::Revert(VMError::ExceptionalHalt(ExceptionalHalt::InvalidJump))
    ));

    // A real JUMPDEST works: PUSH1 3; JUMP; JUMPDEST; STOP
    let report = run("6003565b00", Fork::Cancun);
    assert!(report.is_success());
}

#[test]
fn push_past_end_of_code_pads_with_zeros() {
    // PUSH2 with a single trailing byte: the missing byte reads as zero,
    // and falling off the end of code is an implicit STOP.
    let report = run("61ff", Fork::Cancun);
    assert!(report.is_success());
}

#[test]
fn dup1_pop_is_stack_neutral() {
    // PUSH1 7; DUP1; POP; PUSH1 0; MSTORE; RETURN still returns 7.
    let report = run("6007805060005260206000f3", Fork::Cancun);
    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::from(7));
}

#[test]
fn calldata_reaches_the_frame() {
    // CALLDATALOAD(0) returned verbatim.
    let bytecode = Bytes::from(hex::decode("60003560005260206000f3").unwrap());
    let mut word = [0u8; 32];
    word[0] = 0xde;
    word[31] = 0xad;
    let (mut db, env, tx) =
        new_db_with_bytecode_and_calldata(bytecode, Bytes::from(word.to_vec()), Fork::Cancun);
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();

    assert!(report.is_success());
    assert_eq!(report.output.as_ref(), &word);
}

#[test]
fn msize_is_word_granular() {
    // MSTORE8 at offset 10, then MSIZE -> 32.
    let report = run("600a600a53 59 60005260206000f3".replace(' ', "").as_str(), Fork::Cancun);
    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::from(32));
}

#[test]
fn gas_used_is_identical_across_runs() {
    // Determinism: two identical executions report identical gas and output.
    let first = run("600160020160005260206000f3", Fork::Cancun);
    let second = run("600160020160005260206000f3", Fork::Cancun);
    assert_eq!(first.gas_used, second.gas_used);
    assert_eq!(first.output, second.output);
}

#[test]
fn fork_gates_reject_future_opcodes() {
    // PUSH0 is invalid before Shanghai.
    let report = run("5f00", Fork::London);
    assert!(matches!(
        report.result,
        TxResult::Revert(VMError::ExceptionalHalt(ExceptionalHalt::InvalidOpcode))
    ));
    let report = run("5f00", Fork::Shanghai);
    assert!(report.is_success());

    // MCOPY is invalid before Cancun.
    let report = run("60006000600060005e00", Fork::Shanghai);
    assert!(!report.is_success());
}

#[test]
fn exp_gas_depends_on_fork() {
    // PUSH1 0xFF (exponent); PUSH1 2; EXP
    let code = "60ff60020a00";
    // Byzantium: 10 + 50*1; Homestead: 10 + 10*1.
    let byzantium = run(code, Fork::Byzantium);
    let homestead = run(code, Fork::Homestead);
    assert!(byzantium.is_success());
    assert!(homestead.is_success());
    assert_eq!(byzantium.gas_used - homestead.gas_used, 40);
}

#[test]
fn sender_nonce_increments_even_on_revert() {
    let bytecode = Bytes::from(hex::decode("fe").unwrap());
    let (mut db, env, tx) = new_db_with_bytecode(bytecode, Fork::Cancun);
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(!report.is_success());

    let sender = db.get_account(test_sender()).unwrap();
    assert_eq!(sender.info.nonce, 1);
}

#[test]
fn bare_stop_costs_only_the_base_fee() {
    let report = run("00", Fork::Cancun);
    assert!(report.is_success());
    assert_eq!(report.gas_used, TX_BASE_COST);
    assert_eq!(report.gas_refunded, 0);
    assert!(report.logs.is_empty());
}
