// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Tagged hashes for the anti-klepto (sign-to-contract) nonce protocol
//!
//! These are shared between the host, which verifies signatures, and the
//! signer simulator, which produces them, so both sides compute identical
//! commitments and nonce tweaks.

use sha2::{Digest as _, Sha256};

/// Tag for the host nonce commitment
pub const TAG_S2C_DATA: &str = "s2c/ecdsa/data";

/// Tag for the signer nonce tweak
pub const TAG_S2C_POINT: &str = "s2c/ecdsa/point";

/// Tagged hash, `SHA256(SHA256(tag) || SHA256(tag) || m)`
pub fn tagged_hash(tag: &str, m: &[&[u8]]) -> [u8; 32] {
    let t = Sha256::digest(tag.as_bytes());

    let mut d = Sha256::new().chain_update(&t).chain_update(&t);
    for p in m {
        d.update(p);
    }

    d.finalize().into()
}

/// Commitment to a 32-byte host nonce, sent before the nonce is revealed
pub fn host_commit(host_nonce: &[u8; 32]) -> [u8; 32] {
    tagged_hash(TAG_S2C_DATA, &[&host_nonce[..]])
}

/// Scalar tweak applied to the signer's committed nonce point `R1`
/// (33-byte compressed encoding) once the host nonce is revealed
pub fn commitment_tweak(signer_commitment: &[u8; 33], host_nonce: &[u8; 32]) -> [u8; 32] {
    tagged_hash(TAG_S2C_POINT, &[&signer_commitment[..], &host_nonce[..]])
}
