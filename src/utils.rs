use crate::{
    account::Account,
    code::Code,
    db::{cache::CacheDB, gen_db::GeneralizedDatabase, InMemoryDb},
    environment::{Environment, EvmConfig, Fork, TxEnv},
    errors::{ExceptionalHalt, VMError},
};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use keccak_hash::keccak;
use std::sync::Arc;

pub fn word_to_address(word: U256) -> Address {
    Address::from_slice(&word.to_big_endian()[12..])
}

pub fn address_to_word(address: Address) -> U256 {
    U256::from_big_endian(address.as_bytes())
}

pub fn u256_to_h256(value: U256) -> H256 {
    H256(value.to_big_endian())
}

pub fn h256_to_u256(value: H256) -> U256 {
    U256::from_big_endian(value.as_bytes())
}

pub fn u256_to_usize(value: U256) -> Result<usize, ExceptionalHalt> {
    value
        .try_into()
        .map_err(|_| ExceptionalHalt::VeryLargeNumber)
}

/// Convert a (size, offset) pair popped off the stack. A zero size makes the
/// offset irrelevant, so arbitrarily large offsets are legal no-ops then.
pub fn size_offset_to_usize(size: U256, offset: U256) -> Result<(usize, usize), VMError> {
    let size = u256_to_usize(size)?;
    if size == 0 {
        return Ok((0, 0));
    }
    Ok((size, u256_to_usize(offset)?))
}

/// CREATE address: `keccak(rlp([sender, nonce]))[12..]`.
pub fn calculate_create_address(sender: Address, nonce: u64) -> Address {
    let mut stream = rlp::RlpStream::new_list(2);
    stream.append(&sender);
    stream.append(&nonce);
    Address::from_slice(&keccak(stream.out()).as_bytes()[12..])
}

/// CREATE2 address: `keccak(0xff ++ sender ++ salt ++ keccak(initcode))[12..]`.
/// EOFCREATE derives addresses the same way over the initcontainer bytes.
pub fn calculate_create2_address(sender: Address, initcode: &[u8], salt: U256) -> Address {
    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(0xff);
    preimage.extend_from_slice(sender.as_bytes());
    preimage.extend_from_slice(&salt.to_big_endian());
    preimage.extend_from_slice(keccak(initcode).as_bytes());
    Address::from_slice(&keccak(&preimage).as_bytes()[12..])
}

pub mod serde_hex_bytes {
    use bytes::Bytes;
    use serde::Serializer;

    pub fn serialize<S>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }
}

// ---------------------------------------------------------------------------
// Fixtures shared by the unit and integration test suites.
// ---------------------------------------------------------------------------

/// Sender used by the test fixtures.
pub fn test_sender() -> Address {
    Address::from_low_u64_be(0x64)
}

/// Contract account used by the test fixtures.
pub fn test_contract_address() -> Address {
    Address::from_low_u64_be(0x42)
}

/// World state with a funded sender and one contract holding `bytecode`,
/// plus the matching environment and call transaction.
pub fn new_db_with_bytecode(
    bytecode: Bytes,
    fork: Fork,
) -> (GeneralizedDatabase, Environment, TxEnv) {
    new_db_with_bytecode_and_calldata(bytecode, Bytes::new(), fork)
}

pub fn new_db_with_bytecode_and_calldata(
    bytecode: Bytes,
    calldata: Bytes,
    fork: Fork,
) -> (GeneralizedDatabase, Environment, TxEnv) {
    let mut store = InMemoryDb::new();
    store.add_account(
        test_sender(),
        U256::from(u128::MAX),
        0,
        Bytes::new(),
    );
    store.add_account(test_contract_address(), U256::zero(), 1, bytecode);

    let db = GeneralizedDatabase::new(Arc::new(store), CacheDB::default());

    let mut env = Environment::default_from_address(test_sender());
    env.config = EvmConfig::new(fork, 1);

    let tx = TxEnv::call(test_contract_address(), calldata, U256::zero());
    (db, env, tx)
}

/// World state for a create transaction carrying `initcode`.
pub fn new_db_for_create(
    initcode: Bytes,
    fork: Fork,
) -> (GeneralizedDatabase, Environment, TxEnv) {
    let mut store = InMemoryDb::new();
    store.add_account(test_sender(), U256::from(u128::MAX), 0, Bytes::new());

    let db = GeneralizedDatabase::new(Arc::new(store), CacheDB::default());

    let mut env = Environment::default_from_address(test_sender());
    env.config = EvmConfig::new(fork, 1);

    let tx = TxEnv::create(initcode, U256::zero());
    (db, env, tx)
}

/// Insert an extra contract into an existing fixture database.
pub fn deploy_contract(db: &mut GeneralizedDatabase, address: Address, code: Bytes) {
    let code = Code::from_bytecode(code);
    let mut account = Account::new(U256::zero(), 1, code.hash);
    account.mark(crate::account::AccountStatus::Modified);
    db.insert_code(code);
    db.current_accounts_state.insert(address, account);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_address_known_vector() {
        // keccak(rlp([0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0, 0]))[12..]
        let sender = Address::from_slice(
            &hex::decode("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap(),
        );
        let address = calculate_create_address(sender, 0);
        assert_eq!(
            address,
            Address::from_slice(&hex::decode("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d").unwrap())
        );
    }

    #[test]
    fn create2_address_known_vector() {
        // Example 1 of the EIP-1014 specification.
        let sender = Address::zero();
        let address = calculate_create2_address(sender, &[0x00], U256::zero());
        assert_eq!(
            address,
            Address::from_slice(&hex::decode("4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38").unwrap())
        );
    }

    #[test]
    fn word_address_round_trip() {
        let address = Address::from_low_u64_be(0xdeadbeef);
        assert_eq!(word_to_address(address_to_word(address)), address);
    }

    #[test]
    fn zero_size_ignores_huge_offset() {
        let (size, offset) = size_offset_to_usize(U256::zero(), U256::MAX).unwrap();
        assert_eq!((size, offset), (0, 0));
        assert!(size_offset_to_usize(U256::one(), U256::MAX).is_err());
    }
}
