//! Fixed-address built-in contracts.
//!
//! Each precompile prices its input first and only then computes; running
//! out of gas or failing to parse consumes everything the call was given,
//! with the one historical exception of ECRECOVER, which returns empty
//! output on unrecoverable signatures.

pub mod blake2f;
pub mod bls12_381;
pub mod kzg;
pub mod modexp;

use crate::{
    constants::DEFAULT_PRECOMPILE_CACHE_WEIGHT,
    environment::Fork,
    errors::{ExceptionalHalt, PrecompileError, VMError},
    gas_cost,
};
use bytes::Bytes;
use ethereum_types::{Address, H160, H256, U256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use rustc_hash::FxHashMap;
use sha2::Digest;
use sha3::Keccak256;
use std::sync::RwLock;

pub struct Precompile {
    pub address: H160,
    pub name: &'static str,
    pub active_since_fork: Fork,
}

pub const ECRECOVER: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01]),
    name: "ECREC",
    active_since_fork: Fork::Frontier,
};

pub const SHA2_256: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x02]),
    name: "SHA256",
    active_since_fork: Fork::Frontier,
};

pub const RIPEMD_160: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x03]),
    name: "RIPEMD160",
    active_since_fork: Fork::Frontier,
};

pub const IDENTITY: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x04]),
    name: "ID",
    active_since_fork: Fork::Frontier,
};

pub const MODEXP: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x05]),
    name: "MODEXP",
    active_since_fork: Fork::Byzantium,
};

pub const ECADD: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x06]),
    name: "ECADD",
    active_since_fork: Fork::Byzantium,
};

pub const ECMUL: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x07]),
    name: "ECMUL",
    active_since_fork: Fork::Byzantium,
};

pub const ECPAIRING: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x08]),
    name: "ECPAIRING",
    active_since_fork: Fork::Byzantium,
};

pub const BLAKE2F: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x09]),
    name: "BLAKE2F",
    active_since_fork: Fork::Istanbul,
};

pub const POINT_EVALUATION: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x0a]),
    name: "KZG_POINT_EVALUATION",
    active_since_fork: Fork::Cancun,
};

pub const BLS12_G1ADD: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x0b]),
    name: "BLS12_G1ADD",
    active_since_fork: Fork::Prague,
};

pub const BLS12_G1MSM: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x0c]),
    name: "BLS12_G1MSM",
    active_since_fork: Fork::Prague,
};

pub const BLS12_G2ADD: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x0d]),
    name: "BLS12_G2ADD",
    active_since_fork: Fork::Prague,
};

pub const BLS12_G2MSM: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x0e]),
    name: "BLS12_G2MSM",
    active_since_fork: Fork::Prague,
};

pub const BLS12_PAIRING_CHECK: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x0f]),
    name: "BLS12_PAIRING_CHECK",
    active_since_fork: Fork::Prague,
};

pub const BLS12_MAP_FP_TO_G1: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x10]),
    name: "BLS12_MAP_FP_TO_G1",
    active_since_fork: Fork::Prague,
};

pub const BLS12_MAP_FP2_TO_G2: Precompile = Precompile {
    address: H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x11]),
    name: "BLS12_MAP_FP2_TO_G2",
    active_since_fork: Fork::Prague,
};

pub const SIZE_PRECOMPILES_PRE_BYZANTIUM: u64 = 4;
pub const SIZE_PRECOMPILES_PRE_ISTANBUL: u64 = 8;
pub const SIZE_PRECOMPILES_PRE_CANCUN: u64 = 9;
pub const SIZE_PRECOMPILES_CANCUN: u64 = 10;
pub const SIZE_PRECOMPILES_PRAGUE: u64 = 17;

/// Highest precompile address (as a low u64) active in the given fork.
pub const fn max_precompile_address(fork: Fork) -> u64 {
    match fork {
        Fork::Frontier | Fork::Homestead | Fork::TangerineWhistle | Fork::SpuriousDragon => {
            SIZE_PRECOMPILES_PRE_BYZANTIUM
        }
        Fork::Byzantium | Fork::Constantinople | Fork::Petersburg => SIZE_PRECOMPILES_PRE_ISTANBUL,
        Fork::Istanbul | Fork::Berlin | Fork::London | Fork::Paris | Fork::Shanghai => {
            SIZE_PRECOMPILES_PRE_CANCUN
        }
        Fork::Cancun => SIZE_PRECOMPILES_CANCUN,
        Fork::Prague | Fork::Eof => SIZE_PRECOMPILES_PRAGUE,
    }
}

pub fn is_precompile(address: &Address, fork: Fork) -> bool {
    let bytes = address.as_bytes();
    if bytes[..19].iter().any(|byte| *byte != 0) {
        return false;
    }
    let low = bytes[19] as u64;
    low >= 1 && low <= max_precompile_address(fork)
}

/// Optional `(address, input hash) -> output` cache for the precompiles
/// whose outputs are expensive and frequently repeated (MODEXP, BLS MSM).
/// Purely an accelerator: results are content-addressed, so stale entries
/// cannot exist, and the total retained weight is bounded.
pub struct PrecompileCache {
    entries: RwLock<FxHashMap<(H160, H256), Bytes>>,
    weight: RwLock<usize>,
    max_weight: usize,
}

impl Default for PrecompileCache {
    fn default() -> Self {
        Self::new(DEFAULT_PRECOMPILE_CACHE_WEIGHT)
    }
}

impl PrecompileCache {
    pub fn new(max_weight: usize) -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            weight: RwLock::new(0),
            max_weight,
        }
    }

    fn get(&self, address: H160, input_hash: H256) -> Option<Bytes> {
        self.entries
            .read()
            .ok()?
            .get(&(address, input_hash))
            .cloned()
    }

    fn insert(&self, address: H160, input_hash: H256, output: Bytes) {
        let (Ok(mut entries), Ok(mut weight)) = (self.entries.write(), self.weight.write()) else {
            return;
        };
        if *weight + output.len() > self.max_weight {
            ::tracing::debug!(entries = entries.len(), "clearing precompile result cache");
            entries.clear();
            *weight = 0;
        }
        *weight += output.len();
        entries.insert((address, input_hash), output);
    }
}

/// Whether results for this address are worth caching.
fn is_cacheable(address: &Address) -> bool {
    *address == MODEXP.address || *address == BLS12_G1MSM.address || *address == BLS12_G2MSM.address
}

/// Dispatch a call to a precompiled contract, deducting its cost from
/// `gas_remaining`.
pub fn execute_precompile(
    address: Address,
    calldata: &Bytes,
    gas_remaining: &mut u64,
    fork: Fork,
    cache: Option<&PrecompileCache>,
) -> Result<Bytes, VMError> {
    if let Some(cache) = cache {
        if is_cacheable(&address) {
            let input_hash = keccak_hash::keccak(calldata);
            // The cost must be charged either way before the cache lookup.
            if let Some(output) = cache.get(address, input_hash) {
                charge_only(address, calldata, gas_remaining, fork)?;
                return Ok(output);
            }
            let output = dispatch(address, calldata, gas_remaining, fork)?;
            cache.insert(address, input_hash, output.clone());
            return Ok(output);
        }
    }
    dispatch(address, calldata, gas_remaining, fork)
}

/// Charge the gas a cacheable precompile would cost without recomputing it.
fn charge_only(
    address: Address,
    calldata: &Bytes,
    gas_remaining: &mut u64,
    fork: Fork,
) -> Result<(), VMError> {
    if address == MODEXP.address {
        let (gas, ..) = modexp_gas(calldata, fork)?;
        consume_gas(gas, gas_remaining)
    } else if address == BLS12_G1MSM.address {
        let pairs = calldata.len() / bls12_381::G1_MSM_PAIR_SIZE;
        consume_gas(
            gas_cost::bls12_msm(pairs, &gas_cost::BLS12_381_G1_K_DISCOUNT, gas_cost::G1_MUL_COST)?,
            gas_remaining,
        )
    } else {
        let pairs = calldata.len() / bls12_381::G2_MSM_PAIR_SIZE;
        consume_gas(
            gas_cost::bls12_msm(pairs, &gas_cost::BLS12_381_G2_K_DISCOUNT, gas_cost::G2_MUL_COST)?,
            gas_remaining,
        )
    }
}

fn dispatch(
    address: Address,
    calldata: &Bytes,
    gas_remaining: &mut u64,
    fork: Fork,
) -> Result<Bytes, VMError> {
    match address.as_bytes()[19] {
        0x01 => ecrecover(calldata, gas_remaining),
        0x02 => sha2_256(calldata, gas_remaining),
        0x03 => ripemd_160(calldata, gas_remaining),
        0x04 => identity(calldata, gas_remaining),
        0x05 => modexp_precompile(calldata, gas_remaining, fork),
        0x06 => ecadd(calldata, gas_remaining, fork),
        0x07 => ecmul(calldata, gas_remaining, fork),
        0x08 => ecpairing(calldata, gas_remaining, fork),
        0x09 => blake2f_precompile(calldata, gas_remaining),
        0x0a => point_evaluation(calldata, gas_remaining),
        0x0b => bls12_wrapper(calldata, gas_remaining, gas_cost::BLS12_381_G1ADD_COST, bls12_381::g1_add),
        0x0c => {
            let pairs = calldata.len() / bls12_381::G1_MSM_PAIR_SIZE;
            let gas = gas_cost::bls12_msm(
                pairs,
                &gas_cost::BLS12_381_G1_K_DISCOUNT,
                gas_cost::G1_MUL_COST,
            )?;
            bls12_wrapper(calldata, gas_remaining, gas, bls12_381::g1_msm)
        }
        0x0d => bls12_wrapper(calldata, gas_remaining, gas_cost::BLS12_381_G2ADD_COST, bls12_381::g2_add),
        0x0e => {
            let pairs = calldata.len() / bls12_381::G2_MSM_PAIR_SIZE;
            let gas = gas_cost::bls12_msm(
                pairs,
                &gas_cost::BLS12_381_G2_K_DISCOUNT,
                gas_cost::G2_MUL_COST,
            )?;
            bls12_wrapper(calldata, gas_remaining, gas, bls12_381::g2_msm)
        }
        0x0f => {
            let pairs = calldata.len() / bls12_381::PAIRING_PAIR_SIZE;
            let gas = gas_cost::bls12_pairing_check(pairs)?;
            bls12_wrapper(calldata, gas_remaining, gas, bls12_381::pairing_check)
        }
        0x10 => bls12_wrapper(
            calldata,
            gas_remaining,
            gas_cost::BLS12_381_MAP_FP_TO_G1_COST,
            bls12_381::map_fp_to_g1,
        ),
        0x11 => bls12_wrapper(
            calldata,
            gas_remaining,
            gas_cost::BLS12_381_MAP_FP2_TO_G2_COST,
            bls12_381::map_fp2_to_g2,
        ),
        _ => Err(crate::errors::InternalError::Custom(
            "dispatched a non-precompile address".to_string(),
        )
        .into()),
    }
}

fn consume_gas(required: u64, gas_remaining: &mut u64) -> Result<(), VMError> {
    if *gas_remaining < required {
        return Err(PrecompileError::NotEnoughGas.into());
    }
    *gas_remaining -= required;
    Ok(())
}

/// Zero-padded fixed-size view of the calldata.
fn padded<const N: usize>(calldata: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let len = calldata.len().min(N);
    out[..len].copy_from_slice(&calldata[..len]);
    out
}

// ---------------------------------------------------------------------------
// 0x01..0x04
// ---------------------------------------------------------------------------

fn ecrecover(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    consume_gas(gas_cost::ECRECOVER_COST, gas_remaining)?;

    let input: [u8; 128] = padded(calldata);

    // v is a full 32-byte word that must be exactly 27 or 28.
    if input[32..63] != [0u8; 31] || !matches!(input[63], 27 | 28) {
        return Ok(Bytes::new());
    }

    let message = &input[0..32];
    let mut signature_bytes = [0u8; 64];
    signature_bytes[..32].copy_from_slice(&input[64..96]);
    signature_bytes[32..].copy_from_slice(&input[96..128]);

    let recover = || -> Option<[u8; 32]> {
        let mut recovery_id_byte = input[63] - 27;
        let mut signature = Signature::from_slice(&signature_bytes).ok()?;
        if let Some(normalized) = signature.normalize_s() {
            signature = normalized;
            recovery_id_byte ^= 1;
        }
        let recovery_id = RecoveryId::from_byte(recovery_id_byte)?;

        let public_key =
            VerifyingKey::recover_from_prehash(message, &signature, recovery_id).ok()?;
        let mut address = [0u8; 32];
        address.copy_from_slice(
            Keccak256::digest(&public_key.to_encoded_point(false).as_bytes()[1..]).as_slice(),
        );
        address[0..12].copy_from_slice(&[0u8; 12]);
        Some(address)
    };

    // Unrecoverable signatures return success with no output.
    match recover() {
        Some(address) => Ok(Bytes::from(address.to_vec())),
        None => Ok(Bytes::new()),
    }
}

fn sha2_256(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    consume_gas(gas_cost::sha2_256(calldata.len())?, gas_remaining)?;
    let hash = sha2::Sha256::digest(calldata);
    Ok(Bytes::from(hash.to_vec()))
}

fn ripemd_160(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    consume_gas(gas_cost::ripemd_160(calldata.len())?, gas_remaining)?;
    let hash = ripemd::Ripemd160::digest(calldata);
    let mut out = vec![0u8; 32];
    out[12..].copy_from_slice(&hash);
    Ok(Bytes::from(out))
}

fn identity(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    consume_gas(gas_cost::identity(calldata.len())?, gas_remaining)?;
    Ok(calldata.clone())
}

// ---------------------------------------------------------------------------
// 0x05 MODEXP
// ---------------------------------------------------------------------------

/// Parse the [EIP-198] header and price the call; returns
/// `(gas, base_size, exponent_size, modulus_size)`.
fn modexp_gas(calldata: &Bytes, fork: Fork) -> Result<(u64, usize, usize, usize), VMError> {
    let header: [u8; 96] = padded(calldata);
    let base_size = usize::try_from(U256::from_big_endian(&header[0..32]))
        .map_err(|_| PrecompileError::ModExpBaseTooLarge)?;
    let exponent_size = usize::try_from(U256::from_big_endian(&header[32..64]))
        .map_err(|_| PrecompileError::ModExpExpTooLarge)?;
    let modulus_size = usize::try_from(U256::from_big_endian(&header[64..96]))
        .map_err(|_| PrecompileError::ModExpModulusTooLarge)?;

    // Head of the exponent, for the iteration count.
    let exponent_start = 96usize.saturating_add(base_size);
    let head_len = exponent_size.min(32);
    let mut head = vec![0u8; head_len];
    copy_from_calldata(&mut head, calldata, exponent_start);
    let exponent_head = modexp::natural_from_big_endian(&head);

    let gas = gas_cost::modexp(&exponent_head, base_size, exponent_size, modulus_size, fork)?;
    Ok((gas, base_size, exponent_size, modulus_size))
}

fn modexp_precompile(
    calldata: &Bytes,
    gas_remaining: &mut u64,
    fork: Fork,
) -> Result<Bytes, VMError> {
    let (gas, base_size, exponent_size, modulus_size) = modexp_gas(calldata, fork)?;
    consume_gas(gas, gas_remaining)?;

    if base_size == 0 && modulus_size == 0 {
        return Ok(Bytes::new());
    }

    let mut base_bytes = vec![0u8; base_size];
    copy_from_calldata(&mut base_bytes, calldata, 96);
    let mut exponent_bytes = vec![0u8; exponent_size];
    copy_from_calldata(&mut exponent_bytes, calldata, 96 + base_size);
    let mut modulus_bytes = vec![0u8; modulus_size];
    copy_from_calldata(&mut modulus_bytes, calldata, 96 + base_size + exponent_size);

    let base = modexp::natural_from_big_endian(&base_bytes);
    let exponent = modexp::natural_from_big_endian(&exponent_bytes);
    let modulus = modexp::natural_from_big_endian(&modulus_bytes);

    let result = modexp::modexp(base, exponent, modulus);
    Ok(Bytes::from(modexp::natural_to_big_endian(
        &result,
        modulus_size,
    )))
}

/// Copy `target.len()` bytes of calldata starting at `offset`, zero-filling
/// whatever the calldata does not cover.
fn copy_from_calldata(target: &mut [u8], calldata: &[u8], offset: usize) {
    if offset >= calldata.len() {
        return;
    }
    let available = (calldata.len() - offset).min(target.len());
    target[..available].copy_from_slice(&calldata[offset..offset + available]);
}

// ---------------------------------------------------------------------------
// 0x06..0x08 alt_bn128
// ---------------------------------------------------------------------------

// [EIP-1108] repriced the curve precompiles in Istanbul.
const ECADD_COST_BYZANTIUM: u64 = 500;
const ECMUL_COST_BYZANTIUM: u64 = 40000;
const ECPAIRING_BASE_BYZANTIUM: u64 = 100_000;
const ECPAIRING_GROUP_BYZANTIUM: u64 = 80_000;

fn read_bn_fr(input: &[u8; 128], start: usize) -> Result<bn::Fr, PrecompileError> {
    bn::Fr::from_slice(&input[start..start + 32]).map_err(|_| PrecompileError::ParsingInputError)
}

fn read_bn_point(input: &[u8], start: usize) -> Result<bn::G1, PrecompileError> {
    use bn::{AffineG1, Fq, Group, G1};

    let px = Fq::from_slice(&input[start..start + 32])
        .map_err(|_| PrecompileError::CoordinateExceedsFieldModulus)?;
    let py = Fq::from_slice(&input[start + 32..start + 64])
        .map_err(|_| PrecompileError::CoordinateExceedsFieldModulus)?;

    Ok(if px == Fq::zero() && py == Fq::zero() {
        G1::zero()
    } else {
        AffineG1::new(px, py)
            .map_err(|_| PrecompileError::InvalidPoint)?
            .into()
    })
}

fn encode_bn_g1(point: bn::G1) -> Result<Bytes, VMError> {
    use bn::AffineG1;

    let mut out = [0u8; 64];
    if let Some(affine) = AffineG1::from_jacobian(point) {
        affine
            .x()
            .to_big_endian(&mut out[0..32])
            .map_err(|_| PrecompileError::ParsingInputError)?;
        affine
            .y()
            .to_big_endian(&mut out[32..64])
            .map_err(|_| PrecompileError::ParsingInputError)?;
    }
    Ok(Bytes::from(out.to_vec()))
}

fn ecadd(calldata: &Bytes, gas_remaining: &mut u64, fork: Fork) -> Result<Bytes, VMError> {
    let gas = if fork >= Fork::Istanbul {
        gas_cost::ECADD_COST
    } else {
        ECADD_COST_BYZANTIUM
    };
    consume_gas(gas, gas_remaining)?;

    let input: [u8; 128] = padded(calldata);
    let p1 = read_bn_point(&input, 0)?;
    let p2 = read_bn_point(&input, 64)?;
    encode_bn_g1(p1 + p2)
}

fn ecmul(calldata: &Bytes, gas_remaining: &mut u64, fork: Fork) -> Result<Bytes, VMError> {
    let gas = if fork >= Fork::Istanbul {
        gas_cost::ECMUL_COST
    } else {
        ECMUL_COST_BYZANTIUM
    };
    consume_gas(gas, gas_remaining)?;

    let input: [u8; 128] = padded(calldata);
    let point = read_bn_point(&input, 0)?;
    let scalar = read_bn_fr(&input, 64)?;
    encode_bn_g1(point * scalar)
}

fn ecpairing(calldata: &Bytes, gas_remaining: &mut u64, fork: Fork) -> Result<Bytes, VMError> {
    use bn::{pairing_batch, AffineG2, Fq, Fq2, Group, Gt, G2};

    if calldata.len() % 192 != 0 {
        return Err(PrecompileError::InvalidInputLength.into());
    }
    let groups = calldata.len() / 192;

    let gas = if fork >= Fork::Istanbul {
        gas_cost::ecpairing(groups)?
    } else {
        ECPAIRING_BASE_BYZANTIUM
            .checked_add(ECPAIRING_GROUP_BYZANTIUM.saturating_mul(groups as u64))
            .ok_or(ExceptionalHalt::OutOfGas)?
    };
    consume_gas(gas, gas_remaining)?;

    let mut pairs = Vec::with_capacity(groups);
    for idx in 0..groups {
        let at = idx * 192;
        let a = read_bn_point(calldata, at)?;

        // G2 coordinates arrive with the imaginary component first.
        let b_a_y = Fq::from_slice(&calldata[at + 64..at + 96])
            .map_err(|_| PrecompileError::CoordinateExceedsFieldModulus)?;
        let b_a_x = Fq::from_slice(&calldata[at + 96..at + 128])
            .map_err(|_| PrecompileError::CoordinateExceedsFieldModulus)?;
        let b_b_y = Fq::from_slice(&calldata[at + 128..at + 160])
            .map_err(|_| PrecompileError::CoordinateExceedsFieldModulus)?;
        let b_b_x = Fq::from_slice(&calldata[at + 160..at + 192])
            .map_err(|_| PrecompileError::CoordinateExceedsFieldModulus)?;

        let b_a = Fq2::new(b_a_x, b_a_y);
        let b_b = Fq2::new(b_b_x, b_b_y);
        let b = if b_a.is_zero() && b_b.is_zero() {
            G2::zero()
        } else {
            G2::from(AffineG2::new(b_a, b_b).map_err(|_| PrecompileError::InvalidPoint)?)
        };

        pairs.push((a, b));
    }

    let success = if pairs.is_empty() {
        true
    } else {
        pairing_batch(&pairs) == Gt::one()
    };

    let mut out = [0u8; 32];
    if success {
        out[31] = 1;
    }
    Ok(Bytes::from(out.to_vec()))
}

// ---------------------------------------------------------------------------
// 0x09 BLAKE2F
// ---------------------------------------------------------------------------

fn blake2f_precompile(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    const BLAKE2F_INPUT_LENGTH: usize = 213;

    if calldata.len() != BLAKE2F_INPUT_LENGTH {
        return Err(PrecompileError::InvalidInputLength.into());
    }

    let rounds = u32::from_be_bytes(
        calldata[0..4]
            .try_into()
            .map_err(|_| PrecompileError::ParsingInputError)?,
    );
    consume_gas(
        gas_cost::BLAKE2F_ROUND_COST.saturating_mul(rounds as u64),
        gas_remaining,
    )?;

    let mut h = [0u64; 8];
    for (i, word) in h.iter_mut().enumerate() {
        *word = u64::from_le_bytes(
            calldata[4 + i * 8..4 + (i + 1) * 8]
                .try_into()
                .map_err(|_| PrecompileError::ParsingInputError)?,
        );
    }
    let mut m = [0u64; 16];
    for (i, word) in m.iter_mut().enumerate() {
        *word = u64::from_le_bytes(
            calldata[68 + i * 8..68 + (i + 1) * 8]
                .try_into()
                .map_err(|_| PrecompileError::ParsingInputError)?,
        );
    }
    let t = [
        u64::from_le_bytes(
            calldata[196..204]
                .try_into()
                .map_err(|_| PrecompileError::ParsingInputError)?,
        ),
        u64::from_le_bytes(
            calldata[204..212]
                .try_into()
                .map_err(|_| PrecompileError::ParsingInputError)?,
        ),
    ];
    let f = match calldata[212] {
        0 => false,
        1 => true,
        _ => return Err(PrecompileError::ParsingInputError.into()),
    };

    blake2f::compress(&mut h, m, t, f, rounds as usize);

    let mut out = [0u8; 64];
    for (i, word) in h.iter().enumerate() {
        out[i * 8..(i + 1) * 8].copy_from_slice(&word.to_le_bytes());
    }
    Ok(Bytes::from(out.to_vec()))
}

// ---------------------------------------------------------------------------
// 0x0a KZG point evaluation
// ---------------------------------------------------------------------------

fn point_evaluation(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    consume_gas(gas_cost::POINT_EVALUATION_COST, gas_remaining)?;
    kzg::verify_point_evaluation(calldata)?;
    Ok(Bytes::from(kzg::POINT_EVALUATION_RETURN_VALUE.to_vec()))
}

// ---------------------------------------------------------------------------
// 0x0b..0x11 BLS12-381
// ---------------------------------------------------------------------------

fn bls12_wrapper(
    calldata: &Bytes,
    gas_remaining: &mut u64,
    gas: u64,
    body: fn(&[u8]) -> Result<Vec<u8>, PrecompileError>,
) -> Result<Bytes, VMError> {
    consume_gas(gas, gas_remaining)?;
    Ok(Bytes::from(body(calldata)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precompile_set_grows_with_forks() {
        let modexp_address = MODEXP.address;
        assert!(!is_precompile(&modexp_address, Fork::Homestead));
        assert!(is_precompile(&modexp_address, Fork::Byzantium));

        let blake_address = BLAKE2F.address;
        assert!(!is_precompile(&blake_address, Fork::Petersburg));
        assert!(is_precompile(&blake_address, Fork::Istanbul));

        let bls_address = BLS12_G1ADD.address;
        assert!(!is_precompile(&bls_address, Fork::Cancun));
        assert!(is_precompile(&bls_address, Fork::Prague));

        assert!(!is_precompile(&Address::zero(), Fork::Prague));
        assert!(!is_precompile(&Address::from_low_u64_be(0x18), Fork::Prague));
    }

    #[test]
    fn identity_round_trips() {
        let mut gas = 1000;
        let data = Bytes::from_static(b"hello world");
        let out = execute_precompile(IDENTITY.address, &data, &mut gas, Fork::London, None).unwrap();
        assert_eq!(out, data);
        // 15 static + 3 for one word
        assert_eq!(gas, 1000 - 18);
    }

    #[test]
    fn sha256_known_answer() {
        let mut gas = 1000;
        let out = execute_precompile(
            SHA2_256.address,
            &Bytes::from_static(b"abc"),
            &mut gas,
            Fork::London,
            None,
        )
        .unwrap();
        assert_eq!(
            hex::encode(&out),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn ripemd_known_answer() {
        let mut gas = 10_000;
        let out = execute_precompile(
            RIPEMD_160.address,
            &Bytes::from_static(b"abc"),
            &mut gas,
            Fork::London,
            None,
        )
        .unwrap();
        assert_eq!(
            hex::encode(&out),
            "0000000000000000000000008eb208f7e05d987a9b044a8e98c6b087f15a0bfc"
        );
    }

    #[test]
    fn ecrecover_known_answer() {
        // Classic test vector: recovering the signer of a known hash.
        let input = hex::decode(
            "456e9aea5e197a1f1af7a3e85a3212fa4049a3ba34c2289b4c860fc0b0c64ef3\
             000000000000000000000000000000000000000000000000000000000000001c\
             9242685bf161793cc25603c231bc2f568eb630ea16aa137d2664ac8038825608\
             4f8ae3bd7535248d0bd448298cc2e2071e56992d0774dc340c368ae950852ada",
        )
        .unwrap();
        let mut gas = 10_000;
        let out = execute_precompile(
            ECRECOVER.address,
            &Bytes::from(input),
            &mut gas,
            Fork::London,
            None,
        )
        .unwrap();
        assert_eq!(
            hex::encode(&out),
            "0000000000000000000000007156526fbd7a3c72969b54f64e42c10fbb768c8a"
        );
        assert_eq!(gas, 10_000 - 3000);
    }

    #[test]
    fn ecrecover_invalid_v_returns_empty() {
        let mut input = vec![0u8; 128];
        input[63] = 29;
        let mut gas = 10_000;
        let out = execute_precompile(
            ECRECOVER.address,
            &Bytes::from(input),
            &mut gas,
            Fork::London,
            None,
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn modexp_simple_cube() {
        // 3 ^ 2 mod 5 == 4, with one-byte operands.
        let mut input = vec![0u8; 96];
        input[31] = 1;
        input[63] = 1;
        input[95] = 1;
        input.extend_from_slice(&[3, 2, 5]);

        let mut gas = 100_000;
        let out = execute_precompile(
            MODEXP.address,
            &Bytes::from(input),
            &mut gas,
            Fork::London,
            None,
        )
        .unwrap();
        assert_eq!(out.as_ref(), &[4]);
    }

    #[test]
    fn modexp_result_is_cached() {
        let cache = PrecompileCache::default();
        let mut input = vec![0u8; 96];
        input[31] = 1;
        input[63] = 1;
        input[95] = 1;
        input.extend_from_slice(&[3, 2, 5]);
        let input = Bytes::from(input);

        let mut gas = 100_000;
        let first =
            execute_precompile(MODEXP.address, &input, &mut gas, Fork::London, Some(&cache))
                .unwrap();
        let gas_after_first = gas;
        let second =
            execute_precompile(MODEXP.address, &input, &mut gas, Fork::London, Some(&cache))
                .unwrap();
        assert_eq!(first, second);
        // The cached run still pays the same gas.
        assert_eq!(100_000 - gas_after_first, gas_after_first - gas);
    }

    #[test]
    fn ecadd_identity() {
        // P + 0 = P for the generator (1, 2).
        let mut input = vec![0u8; 128];
        input[31] = 1;
        input[63] = 2;
        let mut gas = 10_000;
        let out = execute_precompile(
            ECADD.address,
            &Bytes::from(input),
            &mut gas,
            Fork::London,
            None,
        )
        .unwrap();
        assert_eq!(out[31], 1);
        assert_eq!(out[63], 2);
        assert_eq!(gas, 10_000 - 150);
    }

    #[test]
    fn ecpairing_empty_input_is_true() {
        let mut gas = 200_000;
        let out = execute_precompile(
            ECPAIRING.address,
            &Bytes::new(),
            &mut gas,
            Fork::London,
            None,
        )
        .unwrap();
        assert_eq!(out[31], 1);
        assert_eq!(gas, 200_000 - 45_000);
    }

    #[test]
    fn blake2f_rejects_wrong_length() {
        let mut gas = 100;
        let err = execute_precompile(
            BLAKE2F.address,
            &Bytes::from(vec![0u8; 212]),
            &mut gas,
            Fork::London,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VMError::ExceptionalHalt(ExceptionalHalt::Precompile(
                PrecompileError::InvalidInputLength
            ))
        ));
    }

    #[test]
    fn not_enough_gas_fails_without_side_effects() {
        let mut gas = 10;
        let err = execute_precompile(
            SHA2_256.address,
            &Bytes::from_static(b"abc"),
            &mut gas,
            Fork::London,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VMError::ExceptionalHalt(ExceptionalHalt::Precompile(PrecompileError::NotEnoughGas))
        ));
        assert_eq!(gas, 10);
    }
}
