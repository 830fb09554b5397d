//! KZG point evaluation ([EIP-4844]) over BLS12-381.
//!
//! The verification runs the pairing equation directly against the trusted
//! setup's `[τ]₂` point, so no external setup file is needed.

use crate::{constants::VERSIONED_HASH_VERSION_KZG, errors::PrecompileError};
use ark_bls12_381::{Bls12_381, Fr, G1Affine, G2Affine};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::{BigInteger, One, PrimeField};
use ark_serialize::CanonicalDeserialize;
use core::ops::Neg;
use hex_literal::hex;
use sha2::Digest;

/// `U256(FIELD_ELEMENTS_PER_BLOB).to_be_bytes() ++ BLS_MODULUS.to_bytes32()`
pub const POINT_EVALUATION_RETURN_VALUE: [u8; 64] = hex!(
    "0000000000000000000000000000000000000000000000000000000000001000"
    "73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001"
);

/// The trusted setup point `[τ]₂` from the Ethereum KZG ceremony,
/// compressed (`g2_monomial_1` of `trusted_setup_4096.json`).
const TRUSTED_SETUP_TAU_G2_BYTES: [u8; 96] = hex!(
    "b5bfd7dd8cdeb128843bc287230af38926187075cbfbefa81009a2ce615ac53d2914e5870cb452d2afaaab24f349\
     9f72185cbfee53492714734429b7b38608e23926c911cceceac9a36851477ba4c60b087041de621000edc98edada\
     20c1def2"
);

/// `VERSIONED_HASH_VERSION_KZG ++ sha256(commitment)[1..]`
#[inline]
pub fn kzg_to_versioned_hash(commitment: &[u8]) -> [u8; 32] {
    let mut hash: [u8; 32] = sha2::Sha256::digest(commitment).into();
    hash[0] = VERSIONED_HASH_VERSION_KZG;
    hash
}

/// Verify the input of the point evaluation precompile:
/// `| versioned_hash | z | y | commitment | proof |` (32/32/32/48/48 bytes).
pub fn verify_point_evaluation(input: &[u8]) -> Result<(), PrecompileError> {
    if input.len() != 192 {
        return Err(PrecompileError::InvalidInputLength);
    }

    let versioned_hash = &input[..32];
    let commitment: &[u8; 48] = input[96..144]
        .try_into()
        .map_err(|_| PrecompileError::ParsingInputError)?;
    if kzg_to_versioned_hash(commitment) != versioned_hash {
        return Err(PrecompileError::VerificationFailed);
    }

    let z: &[u8; 32] = input[32..64]
        .try_into()
        .map_err(|_| PrecompileError::ParsingInputError)?;
    let y: &[u8; 32] = input[64..96]
        .try_into()
        .map_err(|_| PrecompileError::ParsingInputError)?;
    let proof: &[u8; 48] = input[144..192]
        .try_into()
        .map_err(|_| PrecompileError::ParsingInputError)?;

    if verify_kzg_proof(commitment, z, y, proof) {
        Ok(())
    } else {
        Err(PrecompileError::VerificationFailed)
    }
}

/// `e(P - y·G₁, -G₂) · e(proof, [τ]₂ - z·G₂) == 1`
fn verify_kzg_proof(commitment: &[u8; 48], z: &[u8; 32], y: &[u8; 32], proof: &[u8; 48]) -> bool {
    let Ok(commitment_point) = parse_g1_compressed(commitment) else {
        return false;
    };
    let Ok(proof_point) = parse_g1_compressed(proof) else {
        return false;
    };
    let Ok(z_fr) = read_scalar_canonical(z) else {
        return false;
    };
    let Ok(y_fr) = read_scalar_canonical(y) else {
        return false;
    };

    let tau_g2 = trusted_setup_g2();
    let g1 = G1Affine::generator();
    let g2 = G2Affine::generator();

    let y_g1 = p1_scalar_mul(&g1, &y_fr);
    let p_minus_y = (commitment_point.into_group() - y_g1.into_group()).into_affine();

    let z_g2 = p2_scalar_mul(&g2, &z_fr);
    let x_minus_z = (tau_g2.into_group() - z_g2.into_group()).into_affine();

    pairing_check(&[(p_minus_y, g2.neg()), (proof_point, x_minus_z)])
}

fn trusted_setup_g2() -> G2Affine {
    // A known-good ceremony point; the unchecked deserialization skips the
    // redundant subgroup check.
    G2Affine::deserialize_compressed_unchecked(&TRUSTED_SETUP_TAU_G2_BYTES[..])
        .unwrap_or_else(|_| G2Affine::generator())
}

fn parse_g1_compressed(bytes: &[u8; 48]) -> Result<G1Affine, PrecompileError> {
    G1Affine::deserialize_compressed(&bytes[..]).map_err(|_| PrecompileError::InvalidPoint)
}

/// A scalar must be a canonical 32-byte big-endian field element.
fn read_scalar_canonical(bytes: &[u8; 32]) -> Result<Fr, PrecompileError> {
    let fr = Fr::from_be_bytes_mod_order(bytes);
    if fr.into_bigint().to_bytes_be().as_slice() != bytes {
        return Err(PrecompileError::ParsingInputError);
    }
    Ok(fr)
}

fn p1_scalar_mul(point: &G1Affine, scalar: &Fr) -> G1Affine {
    point.mul_bigint(scalar.into_bigint()).into_affine()
}

fn p2_scalar_mul(point: &G2Affine, scalar: &Fr) -> G2Affine {
    point.mul_bigint(scalar.into_bigint()).into_affine()
}

fn pairing_check(pairs: &[(G1Affine, G2Affine)]) -> bool {
    if pairs.is_empty() {
        return true;
    }
    let (g1_points, g2_points): (Vec<G1Affine>, Vec<G2Affine>) = pairs.iter().copied().unzip();
    Bls12_381::multi_pairing(&g1_points, &g2_points).0.is_one()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versioned_hash_prefix() {
        let hash = kzg_to_versioned_hash(&[0u8; 48]);
        assert_eq!(hash[0], VERSIONED_HASH_VERSION_KZG);
    }

    #[test]
    fn trusted_setup_point_deserializes() {
        assert_ne!(trusted_setup_g2(), G2Affine::generator());
    }

    #[test]
    fn bad_length_is_rejected() {
        assert_eq!(
            verify_point_evaluation(&[0u8; 191]).unwrap_err(),
            PrecompileError::InvalidInputLength
        );
    }

    #[test]
    fn mismatched_versioned_hash_is_rejected() {
        let input = [0u8; 192];
        // versioned hash of the zero commitment is not all-zero
        assert_eq!(
            verify_point_evaluation(&input).unwrap_err(),
            PrecompileError::VerificationFailed
        );
    }
}
