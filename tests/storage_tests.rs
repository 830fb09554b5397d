//! Storage semantics: warm/cold pricing, net metering refunds, transient
//! storage, and revert atomicity across nested calls.

use bytes::Bytes;
use corevm::{
    constants::TX_BASE_COST,
    db::{cache::CacheDB, gen_db::GeneralizedDatabase, InMemoryDb},
    environment::{Environment, EvmConfig, TxEnv},
    tracing::noop_tracer,
    utils::{new_db_with_bytecode, test_contract_address, test_sender, u256_to_h256},
    vm::VM,
    Fork,
};
use ethereum_types::{Address, U256};
use std::sync::Arc;

fn run_report(code: &str, fork: Fork) -> corevm::ExecutionReport {
    let bytecode = Bytes::from(hex::decode(code).unwrap());
    let (mut db, env, tx) = new_db_with_bytecode(bytecode, fork);
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    vm.execute().unwrap()
}

/// The self-calling contract used by the revert tests: with empty calldata
/// it stores 8 into slot 1, calls itself with one byte of calldata, then
/// returns SLOAD(1); with calldata present it stores 9 and reverts.
fn self_call_contract(store_op: &str, load_op: &str) -> String {
    let addr = hex::encode(test_contract_address().as_bytes());
    format!(
        "36\
         6036\
         57\
         60086001{store_op}\
         60006000600160006000\
         73{addr}\
         5a\
         f1\
         50\
         6001{load_op}\
         600052\
         60206000f3\
         5b\
         60096001{store_op}\
         60006000fd"
    )
}

#[test]
fn warm_and_cold_sload_pricing() {
    // PUSH1 5; SLOAD; POP; PUSH1 5; SLOAD; POP; STOP
    let report = run_report("60055450600554500000", Fork::Cancun);
    assert!(report.is_success());
    // cold: 3 + 2100 + 2, warm: 3 + 100 + 2
    assert_eq!(report.gas_used, TX_BASE_COST + 2105 + 105);
}

#[test]
fn pre_berlin_sload_has_flat_cost() {
    let report = run_report("60055450600554500000", Fork::Istanbul);
    assert!(report.is_success());
    // Istanbul SLOAD is 800 regardless of warmth.
    assert_eq!(report.gas_used, TX_BASE_COST + 2 * 805);
}

#[test]
fn sstore_fresh_write_then_clear_refunds() {
    // Pre-set slot 1 to 1 so the store is a clear of an original value.
    let bytecode = Bytes::from(hex::decode("6000600155").unwrap());
    let mut store = InMemoryDb::new();
    store.add_account(test_sender(), U256::from(u128::MAX), 0, Bytes::new());
    store.add_account(test_contract_address(), U256::zero(), 1, bytecode);
    store.set_storage(
        test_contract_address(),
        u256_to_h256(U256::one()),
        U256::one(),
    );
    let mut db = GeneralizedDatabase::new(Arc::new(store), CacheDB::default());

    let mut env = Environment::default_from_address(test_sender());
    env.config = EvmConfig::new(Fork::London, 1);
    let tx = TxEnv::call(test_contract_address(), Bytes::new(), U256::zero());

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();

    assert!(report.is_success());
    assert_eq!(report.gas_refunded, 4800);
    // PUSH + PUSH + (reset 2900 + cold 2100), minus the refund.
    assert_eq!(report.gas_used, TX_BASE_COST + 3 + 3 + 5000 - 4800);
}

#[test]
fn sstore_of_loaded_value_is_cost_neutral() {
    // SSTORE(5, SLOAD(5)) leaves no refund and no state change.
    let report = run_report("600554600555 00".replace(' ', "").as_str(), Fork::Cancun);
    assert!(report.is_success());
    assert_eq!(report.gas_refunded, 0);
    // PUSH 3 + cold SLOAD 2100 + PUSH 3 + warm no-op SSTORE 100.
    assert_eq!(report.gas_used, TX_BASE_COST + 3 + 2100 + 3 + 100);
}

#[test]
fn sstore_requires_stipend_headroom() {
    // Gas tuned so the SSTORE sees exactly the stipend left: must fault.
    let bytecode = Bytes::from(hex::decode("6001600155").unwrap());
    let (mut db, mut env, tx) = new_db_with_bytecode(bytecode, Fork::Cancun);
    env.gas_limit = TX_BASE_COST + 3 + 3 + 2300;
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();
    assert!(!report.is_success());
    assert_eq!(report.gas_used, TX_BASE_COST + 3 + 3 + 2300);
}

#[test]
fn revert_rolls_back_nested_sstore() {
    let code = self_call_contract("55", "54");
    let report = run_report(&code, Fork::Cancun);

    assert!(report.is_success());
    // The inner frame stored 9 and reverted; the outer value survives.
    assert_eq!(U256::from_big_endian(&report.output), U256::from(8));
}

#[test]
fn revert_rolls_back_nested_tstore() {
    let code = self_call_contract("5d", "5c");
    let report = run_report(&code, Fork::Cancun);

    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::from(8));
}

#[test]
fn committed_nested_sstore_is_visible() {
    // Same shape, but the inner frame STOPs instead of reverting: the
    // outer read then observes the inner write.
    let addr = hex::encode(test_contract_address().as_bytes());
    let code = format!(
        "36\
         6036\
         57\
         6008600155\
         60006000600160006000\
         73{addr}\
         5a\
         f1\
         50\
         600154\
         600052\
         60206000f3\
         5b\
         6009600155\
         00"
    );
    let report = run_report(&code, Fork::Cancun);

    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::from(9));
}

#[test]
fn tstore_rejected_in_static_context() {
    // Outer STATICCALLs a callee whose code TSTOREs; callee must fail and
    // the outer call observes success = 0.
    let callee = Address::from_low_u64_be(0x77);
    let caller_code = format!(
        "600060006000600073{}5afa60005260206000f3",
        hex::encode(callee.as_bytes())
    );
    let bytecode = Bytes::from(hex::decode(&caller_code).unwrap());
    let (mut db, env, tx) = new_db_with_bytecode(bytecode, Fork::Cancun);
    corevm::utils::deploy_contract(
        &mut db,
        callee,
        Bytes::from(hex::decode("600160015d00").unwrap()),
    );

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();

    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::zero());
}

#[test]
fn access_list_pre_warms_slots() {
    // SLOAD of slot 5 with (contract, slot 5) in the transaction access
    // list: charged warm from the start, plus the list's intrinsic cost.
    let bytecode = Bytes::from(hex::decode("6005545000").unwrap());
    let (mut db, env, mut tx) = new_db_with_bytecode(bytecode, Fork::Cancun);
    tx.access_list = vec![(
        test_contract_address(),
        vec![u256_to_h256(U256::from(5))],
    )];

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();

    assert!(report.is_success());
    // 2400 + 1900 intrinsic, then PUSH + warm SLOAD + POP + STOP.
    assert_eq!(report.gas_used, TX_BASE_COST + 2400 + 1900 + 3 + 100 + 2);
}

#[test]
fn transient_storage_is_flat_cost_and_not_persisted() {
    // TSTORE(1, 42); TLOAD(1) returned.
    let report = run_report("602a60015d60015c60005260206000f3", Fork::Cancun);
    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::from(42));
    // 6 pushes + TSTORE 100 + TLOAD 100 + MSTORE (3 + 3 mem) + RETURN.
    assert_eq!(report.gas_used, TX_BASE_COST + 6 * 3 + 100 + 100 + 6);
}
