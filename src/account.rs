use crate::constants::EMPTY_CODE_HASH;
use ethereum_types::{H256, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Balance, nonce and code hash of an account. Code bytes live behind the
/// database keyed by hash, so duplicate contract code is held in memory only
/// once and is fetched only when actually executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub balance: U256,
    pub nonce: u64,
    pub code_hash: H256,
}

impl Default for AccountInfo {
    fn default() -> Self {
        Self {
            balance: U256::zero(),
            nonce: 0,
            code_hash: EMPTY_CODE_HASH,
        }
    }
}

impl AccountInfo {
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce == 0 && self.code_hash == EMPTY_CODE_HASH
    }
}

/// Lifecycle of a cached account within the current transaction batch, used
/// when folding the cache back into host-visible account updates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    #[default]
    Unmodified,
    Modified,
    /// Created in this batch (external create transaction or CREATE family).
    Created,
    /// Executed SELFDESTRUCT, or emptied out under the EIP-161 rules.
    Destroyed,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub info: AccountInfo,
    pub storage: BTreeMap<H256, U256>,
    pub status: AccountStatus,
}

impl Account {
    pub fn new(balance: U256, nonce: u64, code_hash: H256) -> Self {
        Self {
            info: AccountInfo {
                balance,
                nonce,
                code_hash,
            },
            storage: BTreeMap::new(),
            status: AccountStatus::Unmodified,
        }
    }

    pub fn has_nonce(&self) -> bool {
        self.info.nonce != 0
    }

    pub fn has_code(&self) -> bool {
        self.info.code_hash != EMPTY_CODE_HASH
    }

    /// Deploying over this account would collide ([EIP-684]).
    pub fn create_would_collide(&self) -> bool {
        self.has_code() || self.has_nonce()
    }

    /// Empty per [EIP-161]: zero balance, zero nonce, no code.
    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }

    pub fn mark(&mut self, status: AccountStatus) {
        self.status = status;
    }

    pub fn is_unmodified(&self) -> bool {
        matches!(self.status, AccountStatus::Unmodified)
    }
}
