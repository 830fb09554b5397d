//! Call and create semantics: value transfer, static restrictions, contract
//! deployment and its validation rules.

use bytes::Bytes;
use corevm::{
    errors::{ExceptionalHalt, TxResult, VMError},
    tracing::{noop_tracer, CallTracer, CallType},
    utils::{
        calculate_create2_address, calculate_create_address, deploy_contract, new_db_for_create,
        new_db_with_bytecode, test_contract_address, test_sender,
    },
    vm::VM,
    Fork,
};
use ethereum_types::{Address, U256};

#[test]
fn call_transfers_value_to_callee() {
    // The contract forwards 5 wei of its 10 wei call value to 0x99.
    let target = Address::from_low_u64_be(0x99);
    let code = format!(
        "6000600060006000600573{}5af100",
        hex::encode(target.as_bytes())
    );
    let bytecode = Bytes::from(hex::decode(&code).unwrap());
    let (mut db, env, mut tx) = new_db_with_bytecode(bytecode, Fork::Cancun);
    tx.value = U256::from(10);

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(report.is_success());

    assert_eq!(
        db.get_account(target).unwrap().info.balance,
        U256::from(5)
    );
    assert_eq!(
        db.get_account(test_contract_address()).unwrap().info.balance,
        U256::from(5)
    );
}

#[test]
fn call_with_insufficient_balance_pushes_zero() {
    // The contract (zero balance) tries to send 5 wei: the call never
    // happens and 0 lands on the stack.
    let target = Address::from_low_u64_be(0x99);
    let code = format!(
        "6000600060006000600573{}5af160005260206000f3",
        hex::encode(target.as_bytes())
    );
    let bytecode = Bytes::from(hex::decode(&code).unwrap());
    let (mut db, env, tx) = new_db_with_bytecode(bytecode, Fork::Cancun);

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::zero());
    assert_eq!(db.get_account(target).unwrap().info.balance, U256::zero());
}

#[test]
fn staticcall_rejects_sstore_in_callee() {
    let callee = Address::from_low_u64_be(0x77);
    let caller_code = format!(
        "600060006000600073{}5afa60005260206000f3",
        hex::encode(callee.as_bytes())
    );
    let bytecode = Bytes::from(hex::decode(&caller_code).unwrap());
    let (mut db, env, tx) = new_db_with_bytecode(bytecode, Fork::Cancun);
    // Callee: PUSH1 1; PUSH1 0; SSTORE
    deploy_contract(&mut db, callee, Bytes::from(hex::decode("6001600055").unwrap()));

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();

    assert!(report.is_success());
    // The outer call observes failure, and the callee's storage is clean.
    assert_eq!(U256::from_big_endian(&report.output), U256::zero());
    assert!(db.get_account(callee).unwrap().storage.is_empty());
}

#[test]
fn delegatecall_writes_into_the_caller() {
    let library = Address::from_low_u64_be(0x77);
    // Library code stores 0x2A into slot 0 of whoever runs it.
    let caller_code = format!(
        "600060006000600073{}5af450600054600052 60206000f3",
        hex::encode(library.as_bytes())
    )
    .replace(' ', "");
    let bytecode = Bytes::from(hex::decode(&caller_code).unwrap());
    let (mut db, env, tx) = new_db_with_bytecode(bytecode, Fork::Cancun);
    deploy_contract(&mut db, library, Bytes::from(hex::decode("602a60005500").unwrap()));

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();

    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::from(0x2a));
    // The write landed on the caller, not the library.
    assert!(db.get_account(library).unwrap().storage.is_empty());
    assert!(!db
        .get_account(test_contract_address())
        .unwrap()
        .storage
        .is_empty());
}

#[test]
fn create_transaction_deploys_code() {
    // Initcode returning the runtime code 0x6001600101 (five bytes).
    // PUSH5 <code>; PUSH1 0; MSTORE; PUSH1 5; PUSH1 27; RETURN
    let initcode = Bytes::from(hex::decode("6460016001016000526005601bf3").unwrap());
    let (mut db, env, tx) = new_db_for_create(initcode, Fork::Cancun);

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(report.is_success());

    let created = calculate_create_address(test_sender(), 0);
    let account = db.get_account(created).unwrap();
    assert!(account.has_code());
    assert_eq!(account.info.nonce, 1);
    let code = db.get_account_code(created).unwrap();
    assert_eq!(code.bytecode.as_ref(), hex::decode("6001600101").unwrap());
}

#[test]
fn create_opcode_derives_address_from_nonce() {
    // CREATE with empty initcode, then return the new address.
    let bytecode = Bytes::from(hex::decode("600060006000f060005260206000f3").unwrap());
    let (mut db, env, tx) = new_db_with_bytecode(bytecode, Fork::Cancun);

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(report.is_success());

    // The fixture contract starts with nonce 1.
    let expected = calculate_create_address(test_contract_address(), 1);
    let returned = Address::from_slice(&report.output[12..]);
    assert_eq!(returned, expected);
    assert_eq!(
        db.get_account(test_contract_address()).unwrap().info.nonce,
        2
    );
}

#[test]
fn create2_address_is_salt_determined() {
    // CREATE2 with empty initcode and salt 0.
    let bytecode = Bytes::from(hex::decode("6000600060006000f560005260206000f3").unwrap());
    let (mut db, env, tx) = new_db_with_bytecode(bytecode, Fork::Cancun);

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(report.is_success());

    let expected = calculate_create2_address(test_contract_address(), &[], U256::zero());
    let returned = Address::from_slice(&report.output[12..]);
    assert_eq!(returned, expected);
}

#[test]
fn oversized_deployment_is_rejected() {
    // Initcode returning 0x6001 (24577) zero bytes, over the EIP-170 cap.
    let initcode = Bytes::from(hex::decode("6160016000f3").unwrap());
    let (mut db, env, tx) = new_db_for_create(initcode, Fork::Cancun);

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(matches!(
        report.result,
        TxResult::Revert(VMError::ExceptionalHalt(
            ExceptionalHalt::ContractOutputTooBig
        ))
    ));
}

#[test]
fn reserved_prefix_deployment_is_fork_gated() {
    // Initcode deploying the single byte 0xEF.
    // PUSH1 0xEF; PUSH1 0; MSTORE8; PUSH1 1; PUSH1 0; RETURN
    let initcode = Bytes::from(hex::decode("60ef60005360016000f3").unwrap());

    let (mut db, env, tx) = new_db_for_create(initcode.clone(), Fork::London);
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(matches!(
        report.result,
        TxResult::Revert(VMError::ExceptionalHalt(
            ExceptionalHalt::InvalidContractPrefix
        ))
    ));

    // Before London the 0xEF byte had no special meaning.
    let (mut db, env, tx) = new_db_for_create(initcode, Fork::Berlin);
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(report.is_success());
}

#[test]
fn create_collision_reverts_the_transaction() {
    let initcode = Bytes::from(hex::decode("00").unwrap());
    let (mut db, env, tx) = new_db_for_create(initcode, Fork::Cancun);
    // Occupy the derived address with a contract.
    let colliding = calculate_create_address(test_sender(), 0);
    deploy_contract(&mut db, colliding, Bytes::from_static(&[0x00]));

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(matches!(
        report.result,
        TxResult::Revert(VMError::ExceptionalHalt(ExceptionalHalt::CreateCollision))
    ));
    assert_eq!(report.gas_used, 30_000_000);
}

#[test]
fn revert_returns_data_and_unused_gas() {
    // MSTORE 0x2A at 0, REVERT(0, 32).
    let bytecode = Bytes::from(hex::decode("602a60005260206000fd").unwrap());
    let (mut db, env, tx) = new_db_with_bytecode(bytecode, Fork::Cancun);
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();

    assert!(matches!(report.result, TxResult::Revert(VMError::RevertOpcode)));
    assert_eq!(U256::from_big_endian(&report.output), U256::from(0x2a));
    // Only what actually ran was charged: 4 pushes + MSTORE + memory.
    assert_eq!(
        report.gas_used,
        corevm::constants::TX_BASE_COST + 4 * 3 + 3 + 3
    );
}

#[test]
fn selfdestruct_moves_balance_and_eip6780_limits_deletion() {
    // Contract self-destructs to 0x99. It was NOT created in this
    // transaction, so under EIP-6780 it survives with zero balance.
    let beneficiary = Address::from_low_u64_be(0x99);
    let code = format!("73{}ff", hex::encode(beneficiary.as_bytes()));
    let bytecode = Bytes::from(hex::decode(&code).unwrap());
    let (mut db, env, mut tx) = new_db_with_bytecode(bytecode, Fork::Cancun);
    tx.value = U256::from(7);

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(report.is_success());

    assert_eq!(
        db.get_account(beneficiary).unwrap().info.balance,
        U256::from(7)
    );
    let contract = db.get_account(test_contract_address()).unwrap();
    assert_eq!(contract.info.balance, U256::zero());
    assert!(contract.has_code());
}

#[test]
fn selfdestruct_deletes_pre_cancun() {
    let beneficiary = Address::from_low_u64_be(0x99);
    let code = format!("73{}ff", hex::encode(beneficiary.as_bytes()));
    let bytecode = Bytes::from(hex::decode(&code).unwrap());
    let (mut db, env, mut tx) = new_db_with_bytecode(bytecode, Fork::Shanghai);
    tx.value = U256::from(7);

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(report.is_success());

    let contract = db.get_account(test_contract_address()).unwrap();
    assert!(matches!(
        contract.status,
        corevm::account::AccountStatus::Destroyed
    ));
}

#[test]
fn call_tracer_observes_the_call_tree() {
    let callee = Address::from_low_u64_be(0x77);
    let caller_code = format!(
        "600060006000600073{}5afa5000",
        hex::encode(callee.as_bytes())
    );
    let bytecode = Bytes::from(hex::decode(&caller_code).unwrap());
    let (mut db, env, tx) = new_db_with_bytecode(bytecode, Fork::Cancun);
    deploy_contract(&mut db, callee, Bytes::from(hex::decode("00").unwrap()));

    let tracer = std::rc::Rc::new(std::cell::RefCell::new(CallTracer::new(false, false)));
    let mut vm = VM::new(env, &mut db, &tx, tracer.clone()).unwrap();
    let report = vm.execute().unwrap();
    assert!(report.is_success());
    drop(vm);

    let tracer = tracer.borrow();
    let root = tracer.root().expect("one completed root call");
    assert_eq!(root.call_type, CallType::Call);
    assert_eq!(root.to, test_contract_address());
    assert_eq!(root.calls.len(), 1);
    assert_eq!(root.calls[0].call_type, CallType::StaticCall);
    assert_eq!(root.calls[0].to, callee);
}
