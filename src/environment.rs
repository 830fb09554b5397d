use crate::constants::DEFAULT_ANALYSIS_CACHE_WEIGHT;
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Protocol revisions, in activation order. The ordering is meaningful:
/// feature gates are written as `fork >= Fork::X`.
///
/// `Eof` is the EOF-enabled revision staged after Prague, mirroring the
/// experimental milestone the reference implementations use for the object
/// format.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Fork {
    Frontier = 0,
    Homestead = 1,
    #[strum(serialize = "tangerine", serialize = "tangerinewhistle")]
    TangerineWhistle = 2,
    #[strum(serialize = "spuriousdragon")]
    SpuriousDragon = 3,
    Byzantium = 4,
    Constantinople = 5,
    Petersburg = 6,
    Istanbul = 7,
    Berlin = 8,
    London = 9,
    Paris = 10,
    Shanghai = 11,
    #[default]
    Cancun = 12,
    Prague = 13,
    /// EOF-enabled revision (object format containers and their opcodes).
    Eof = 14,
}

/// Host-tunable configuration, constant for the lifetime of a VM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmConfig {
    pub fork: Fork,
    pub chain_id: u64,
    /// Weight bound in bytes for the shared jump-target analysis cache.
    #[serde(default = "default_analysis_cache_weight")]
    pub jumpdest_cache_weight_bytes: usize,
    /// Whether SELFDESTRUCT only deletes accounts created in the same
    /// transaction. Effective from Cancun; hosts replaying older
    /// chains may force it off.
    #[serde(default = "default_true")]
    pub eip6780: bool,
}

fn default_analysis_cache_weight() -> usize {
    DEFAULT_ANALYSIS_CACHE_WEIGHT
}

fn default_true() -> bool {
    true
}

impl EvmConfig {
    pub fn new(fork: Fork, chain_id: u64) -> Self {
        Self {
            fork,
            chain_id,
            jumpdest_cache_weight_bytes: DEFAULT_ANALYSIS_CACHE_WEIGHT,
            eip6780: true,
        }
    }
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self::new(Fork::default(), 1)
    }
}

/// Block and transaction-level context the interpreter reads but never
/// writes. Block hashes are resolved through the database instead, since
/// they are unbounded history.
#[derive(Debug, Clone)]
pub struct Environment {
    pub origin: Address,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub config: EvmConfig,

    pub block_number: U256,
    pub coinbase: Address,
    pub timestamp: U256,
    /// PREVRANDAO from Paris on; the pre-merge DIFFICULTY value before it.
    pub prev_randao: H256,
    pub difficulty: U256,
    pub block_gas_limit: u64,
    pub base_fee_per_gas: U256,
    pub blob_base_fee: U256,
}

impl Environment {
    pub fn default_from_address(origin: Address) -> Self {
        Self {
            origin,
            gas_limit: 30_000_000,
            gas_price: U256::one(),
            config: EvmConfig::default(),
            block_number: U256::one(),
            coinbase: Address::zero(),
            timestamp: U256::one(),
            prev_randao: H256::zero(),
            difficulty: U256::zero(),
            block_gas_limit: 30_000_000,
            base_fee_per_gas: U256::zero(),
            blob_base_fee: U256::one(),
        }
    }
}

/// Destination of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TxKind {
    Call(Address),
    #[default]
    Create,
}

/// The transaction-shaped inputs of one execution. Validation of fields the
/// interpreter does not consume (signatures, fee caps, nonce equality) is
/// the host's concern.
#[derive(Debug, Clone, Default)]
pub struct TxEnv {
    pub to: TxKind,
    pub value: U256,
    pub data: Bytes,
    /// [EIP-2930] pre-warmed addresses and storage keys, charged in
    /// intrinsic gas.
    pub access_list: Vec<(Address, Vec<H256>)>,
    /// [EIP-4844] versioned hashes exposed through BLOBHASH.
    pub blob_versioned_hashes: Vec<H256>,
}

impl TxEnv {
    pub fn call(to: Address, data: Bytes, value: U256) -> Self {
        Self {
            to: TxKind::Call(to),
            value,
            data,
            ..Default::default()
        }
    }

    pub fn create(initcode: Bytes, value: U256) -> Self {
        Self {
            to: TxKind::Create,
            value,
            data: initcode,
            ..Default::default()
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self.to, TxKind::Create)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn fork_ordering_matches_activation_order() {
        assert!(Fork::Frontier < Fork::Homestead);
        assert!(Fork::TangerineWhistle < Fork::SpuriousDragon);
        assert!(Fork::Berlin < Fork::London);
        assert!(Fork::Prague < Fork::Eof);
    }

    #[test]
    fn fork_parses_from_lowercase_names() {
        assert_eq!(Fork::from_str("cancun").unwrap(), Fork::Cancun);
        assert_eq!(Fork::from_str("Berlin").unwrap(), Fork::Berlin);
        assert_eq!(
            Fork::from_str("tangerinewhistle").unwrap(),
            Fork::TangerineWhistle
        );
    }
}
