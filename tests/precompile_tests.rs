//! Precompiles reached through the interpreter: direct transactions to the
//! fixed addresses and CALLs from contract code.

use bytes::Bytes;
use corevm::{
    constants::TX_BASE_COST,
    tracing::noop_tracer,
    utils::{new_db_with_bytecode, test_sender},
    vm::VM,
    Environment, EvmConfig, Fork, TxEnv,
};
use corevm::db::{cache::CacheDB, gen_db::GeneralizedDatabase, InMemoryDb};
use ethereum_types::{Address, U256};
use std::sync::Arc;

fn call_precompile_tx(address: u64, data: &[u8], fork: Fork) -> corevm::ExecutionReport {
    let mut store = InMemoryDb::new();
    store.add_account(test_sender(), U256::from(u128::MAX), 0, Bytes::new());
    let mut db = GeneralizedDatabase::new(Arc::new(store), CacheDB::default());

    let mut env = Environment::default_from_address(test_sender());
    env.config = EvmConfig::new(fork, 1);
    let tx = TxEnv::call(
        Address::from_low_u64_be(address),
        Bytes::from(data.to_vec()),
        U256::zero(),
    );

    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    vm.execute().unwrap()
}

#[test]
fn identity_transaction() {
    let report = call_precompile_tx(0x04, b"identity", Fork::Cancun);
    assert!(report.is_success());
    assert_eq!(report.output.as_ref(), b"identity");
    // 21000 + 8 non-zero calldata bytes + identity pricing (15 + 3).
    assert_eq!(report.gas_used, TX_BASE_COST + 8 * 16 + 18);
}

#[test]
fn sha256_transaction() {
    let report = call_precompile_tx(0x02, b"abc", Fork::Cancun);
    assert!(report.is_success());
    assert_eq!(
        hex::encode(&report.output),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn modexp_is_not_addressable_before_byzantium() {
    // Before Byzantium address 0x05 is a plain (empty) account.
    let report = call_precompile_tx(0x05, &[], Fork::Homestead);
    assert!(report.is_success());
    assert!(report.output.is_empty());
    assert_eq!(report.gas_used, TX_BASE_COST);
}

#[test]
fn staticcall_into_sha256_from_code() {
    // Store "abc" at memory 0, STATICCALL sha256 with 3 input bytes and a
    // 32-byte return area at 0x20, then return that area.
    // PUSH3 0x616263; PUSH1 0; MSTORE  (word ends at 32, "abc" at 29..32)
    // STATICCALL(gas, 0x02, in_off=29, in_size=3, out_off=0x20, out_size=32)
    let code = "62616263600052602060206003601d60025afa5060206020f3";
    let bytecode = Bytes::from(hex::decode(code).unwrap());
    let (mut db, env, tx) = new_db_with_bytecode(bytecode, Fork::Cancun);
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();

    assert!(report.is_success());
    assert_eq!(
        hex::encode(&report.output),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn failing_precompile_reports_failure_to_caller() {
    // BLAKE2F with a bad input length from a contract call: push 0.
    // CALL(gas, 0x09, value 0, in 0..1, out 0..0)
    let code = "60006000600160006000600961fffff160005260206000f3";
    let bytecode = Bytes::from(hex::decode(code).unwrap());
    let (mut db, env, tx) = new_db_with_bytecode(bytecode, Fork::Cancun);
    let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
    let report = vm.execute().unwrap();

    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::zero());
}

#[test]
fn point_evaluation_costs_a_flat_fee_and_fails_on_garbage() {
    let report = call_precompile_tx(0x0a, &[0u8; 192], Fork::Cancun);
    // Garbage input: the call is a failure and burns its gas.
    assert!(!report.is_success());
}

#[test]
fn bls_g1_add_transaction() {
    // G1 generator + infinity = generator.
    let mut input = vec![0u8; 256];
    let generator = hex::decode(
        "0000000000000000000000000000000017f1d3a73197d7942695638c4fa9ac0f\
         c3688c4f9774b905a14e3a3f171bac586c55e83ff97a1aeffb3af00adb22c6bb\
         0000000000000000000000000000000008b3f481e3aaa0f1a09e30ed741d8ae4\
         fcf5e095d5d00af600db18cb2c04b3edd03cc744a2888ae40caa232946c5e7e1",
    )
    .unwrap();
    input[..128].copy_from_slice(&generator);

    let report = call_precompile_tx(0x0b, &input, Fork::Prague);
    assert!(report.is_success());
    assert_eq!(report.output.as_ref(), &generator[..]);
}

#[test]
fn ecrecover_transaction_round_trip() {
    let input = hex::decode(
        "456e9aea5e197a1f1af7a3e85a3212fa4049a3ba34c2289b4c860fc0b0c64ef3\
         000000000000000000000000000000000000000000000000000000000000001c\
         9242685bf161793cc25603c231bc2f568eb630ea16aa137d2664ac8038825608\
         4f8ae3bd7535248d0bd448298cc2e2071e56992d0774dc340c368ae950852ada",
    )
    .unwrap();
    let report = call_precompile_tx(0x01, &input, Fork::Cancun);
    assert!(report.is_success());
    assert_eq!(
        hex::encode(&report.output),
        "0000000000000000000000007156526fbd7a3c72969b54f64e42c10fbb768c8a"
    );
}
