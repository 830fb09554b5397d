pub mod cache;
pub mod gen_db;

use crate::{account::AccountInfo, errors::DatabaseError, precompiles::PrecompileCache};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use rustc_hash::FxHashMap;
use std::collections::HashMap;

/// The world-state capability set the interpreter consumes. Everything
/// behind it (tries, disk, remote state) is the host's business.
pub trait Database: Send + Sync {
    /// `None` means the account does not exist at all, which is distinct
    /// from an existing-but-empty account on pre-Spurious-Dragon forks.
    fn get_account_info(&self, address: Address) -> Result<Option<AccountInfo>, DatabaseError>;
    fn get_storage_value(&self, address: Address, key: H256) -> Result<U256, DatabaseError>;
    fn get_block_hash(&self, block_number: u64) -> Result<H256, DatabaseError>;
    fn get_account_code(&self, code_hash: H256) -> Result<Bytes, DatabaseError>;

    /// Shared precompile result cache, if this database layer carries one.
    fn precompile_cache(&self) -> Option<&PrecompileCache> {
        None
    }
}

/// Simple in-memory world state for tests and lightweight hosts.
#[derive(Default)]
pub struct InMemoryDb {
    pub accounts: FxHashMap<Address, AccountInfo>,
    pub storage: FxHashMap<(Address, H256), U256>,
    pub codes: FxHashMap<H256, Bytes>,
    pub block_hashes: HashMap<u64, H256>,
    precompile_cache: Option<PrecompileCache>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_precompile_cache(mut self) -> Self {
        self.precompile_cache = Some(PrecompileCache::default());
        self
    }

    /// Insert an account; code (if any) is stored under its keccak hash.
    pub fn add_account(&mut self, address: Address, balance: U256, nonce: u64, code: Bytes) {
        let code_hash = if code.is_empty() {
            crate::constants::EMPTY_CODE_HASH
        } else {
            keccak_hash::keccak(&code)
        };
        if !code.is_empty() {
            self.codes.insert(code_hash, code);
        }
        self.accounts.insert(
            address,
            AccountInfo {
                balance,
                nonce,
                code_hash,
            },
        );
    }

    pub fn set_storage(&mut self, address: Address, key: H256, value: U256) {
        self.storage.insert((address, key), value);
    }
}

impl Database for InMemoryDb {
    fn get_account_info(&self, address: Address) -> Result<Option<AccountInfo>, DatabaseError> {
        Ok(self.accounts.get(&address).copied())
    }

    fn get_storage_value(&self, address: Address, key: H256) -> Result<U256, DatabaseError> {
        Ok(self
            .storage
            .get(&(address, key))
            .copied()
            .unwrap_or_default())
    }

    fn get_block_hash(&self, block_number: u64) -> Result<H256, DatabaseError> {
        Ok(self
            .block_hashes
            .get(&block_number)
            .copied()
            .unwrap_or_default())
    }

    fn get_account_code(&self, code_hash: H256) -> Result<Bytes, DatabaseError> {
        Ok(self.codes.get(&code_hash).cloned().unwrap_or_default())
    }

    fn precompile_cache(&self) -> Option<&PrecompileCache> {
        self.precompile_cache.as_ref()
    }
}
