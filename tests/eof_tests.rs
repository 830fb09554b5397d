//! EOF container execution, end to end.
//!
//! The container vectors follow the published EOF examples: a minimal
//! container, the RJUMP loop, a CALLF pair, a creation transaction with a
//! subcontainer, and an EOFCREATE factory.

use bytes::Bytes;
use corevm::{
    errors::{TxResult, VMError},
    tracing::noop_tracer,
    utils::{
        calculate_create2_address, calculate_create_address, deploy_contract, new_db_for_create,
        new_db_with_bytecode, test_sender,
    },
    vm::VM,
    Fork,
};
use ethereum_types::{Address, U256};

fn decode(hex_str: &str) -> Bytes {
    Bytes::from(hex::decode(hex_str).unwrap())
}

#[test]
fn minimal_container_executes_stop() {
    let (mut db, env, tx) = new_db_with_bytecode(
        decode("EF00010100040200010001040000000080000000"),
        Fork::Eof,
    );
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(report.is_success());
}

#[test]
fn rjump_loop_runs_out_of_gas() {
    let (mut db, mut env, tx) = new_db_with_bytecode(
        decode("EF000101000402000100030400000000800000E0FFFD"),
        Fork::Eof,
    );
    env.gas_limit = 100_000;
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();

    assert!(matches!(
        report.result,
        TxResult::Revert(VMError::ExceptionalHalt(_))
    ));
    assert_eq!(report.gas_used, 100_000);
}

#[test]
fn callf_and_retf_round_trip() {
    // Section 0 pushes 0x2A, CALLFs into section 1 (identity), STOPs.
    let (mut db, env, tx) = new_db_with_bytecode(
        decode("EF000101000802000200060001040000000080000101010001602AE3000100E4"),
        Fork::Eof,
    );
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(report.is_success());
}

#[test]
fn creation_transaction_deploys_subcontainer() {
    // Initcontainer: PUSH0 PUSH0 RETURNCONTRACT(0), deploying the minimal
    // container.
    let initcode = decode(
        "EF00010100040200010004030001001404000000008000025F5FEE00\
         EF00010100040200010001040000000080000000",
    );
    let (mut db, env, tx) = new_db_for_create(initcode, Fork::Eof);
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(report.is_success());

    let created = calculate_create_address(test_sender(), 0);
    assert_eq!(
        created,
        Address::from_slice(&hex::decode("3442a1dec1e72f337007125aa67221498cdd759d").unwrap())
    );
    let account = db.get_account(created).unwrap();
    assert!(account.has_code());
    let code = db.get_account_code(created).unwrap();
    assert!(code.is_eof());
    assert_eq!(
        code.bytecode.as_ref(),
        hex::decode("EF00010100040200010001040000000080000000").unwrap()
    );
}

#[test]
fn eofcreate_factory_deploys_with_salt() {
    // Factory: PUSH0 PUSH0 PUSH1 0xFF PUSH0 EOFCREATE(0) STOP, carrying the
    // initcontainer (which itself carries the deployed container).
    let factory_code = decode(
        "EF00010100040200010008030001003004000000008000045F5F60FF5FEC0000\
         EF00010100040200010004030001001404000000008000025F5FEE00\
         EF00010100040200010001040000000080000000",
    );
    let factory_address = Address::from_low_u64_be(0xFAC);
    let caller = decode("00");
    let (mut db, env, mut tx) = new_db_with_bytecode(caller, Fork::Eof);
    deploy_contract(&mut db, factory_address, factory_code);
    tx.to = corevm::TxKind::Call(factory_address);

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(report.is_success());

    let initcontainer = hex::decode(
        "EF00010100040200010004030001001404000000008000025F5FEE00\
         EF00010100040200010001040000000080000000",
    )
    .unwrap();
    let expected = calculate_create2_address(factory_address, &initcontainer, U256::from(0xFF));
    let account = db.get_account(expected).unwrap();
    assert!(account.has_code());
    assert_eq!(account.info.nonce, 1);
}

#[test]
fn dataloadn_reads_the_data_section() {
    // Code: DATALOADN 0x0000; PUSH0; MSTORE; PUSH1 32; PUSH0; RETURN over a
    // 33-byte data section.
    let data = "454F462068617320736F6D65206772656174206578616D706C6573206865726521";
    // Code section: D1 0000 (DATALOADN 0), 5F (PUSH0), 52 (MSTORE),
    // 6020 (PUSH1 32), 5F (PUSH0), F3 (RETURN).
    let container = format!("EF000101000402000100090400210000800002D100005F5260205FF3{data}");
    let (mut db, env, tx) = new_db_with_bytecode(decode(&container), Fork::Eof);
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();

    assert!(report.is_success());
    let expected = &hex::decode(data).unwrap()[..32];
    assert_eq!(report.output.as_ref(), expected);
}

#[test]
fn rjumpi_takes_the_branch_on_nonzero() {
    // PUSH1 1; RJUMPI +1; INVALID; STOP
    // code: 6001 E10001 FE 00 (7 bytes), max stack 1.
    let container = "EF0001010004020001000704000000008000016001E10001FE00";
    let (mut db, env, tx) = new_db_with_bytecode(decode(container), Fork::Eof);
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(report.is_success());
}

#[test]
fn invalid_initcode_container_reverts_creation() {
    // Truncated container as create-transaction initcode under the EOF
    // revision: the whole transaction reverts.
    let (mut db, env, tx) = new_db_for_create(decode("EF0001010004"), Fork::Eof);
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(!report.is_success());
    assert_eq!(report.gas_used, 30_000_000);
}

#[test]
fn legacy_code_still_runs_under_the_eof_fork() {
    let report = {
        let (mut db, env, tx) = new_db_with_bytecode(
            decode("600160020160005260206000f3"),
            Fork::Eof,
        );
        let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
        vm.execute().unwrap()
    };
    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::from(3));
}
