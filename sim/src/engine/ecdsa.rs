// Copyright (c) 2022-2023 The MobileCoin Foundation

//! ECDSA signing with caller-chosen nonces
//!
//! Sign-to-contract signing needs control over the nonce `k`, which the
//! secp256k1 bindings do not expose, so signatures are assembled here from
//! [generic_ec] scalar operations: `r = x(k·G) mod n`, `s = k⁻¹·(z + r·d)`.

use generic_ec::{curves::Secp256k1 as E, Point, Scalar, SecretScalar};
use rand_core::CryptoRngCore;
use secp256k1::{ecdsa::Signature, All, PublicKey, Secp256k1, SecretKey};
use zeroize::Zeroize;

use bitbox_hww_proto::digest::commitment_tweak;

use super::Error;

/// Draw a random nonce scalar
pub fn random_nonce<RNG: CryptoRngCore>(rng: &mut RNG) -> SecretKey {
    loop {
        let mut b = [0u8; 32];
        rng.fill_bytes(&mut b);

        let k = SecretKey::from_slice(&b);
        b.zeroize();

        if let Ok(k) = k {
            return k;
        }
    }
}

/// Compressed nonce point `R1 = k1·G`, the signer's anti-klepto commitment
pub fn nonce_commitment(secp: &Secp256k1<All>, k1: &SecretKey) -> [u8; 33] {
    PublicKey::from_secret_key(secp, k1).serialize()
}

/// Sign-to-contract nonce `k = k1 + H(R1 || host_nonce)`
pub fn s2c_nonce(
    secp: &Secp256k1<All>,
    k1: &SecretKey,
    host_nonce: &[u8; 32],
) -> Result<SecretKey, Error> {
    let r1 = nonce_commitment(secp, k1);
    let tweak = secp256k1::Scalar::from_be_bytes(commitment_tweak(&r1, host_nonce))
        .map_err(|_| Error::SignFailed)?;

    k1.add_tweak(&tweak).map_err(|_| Error::SignFailed)
}

/// Load a secret key as a curve scalar, clearing the intermediate bytes
fn secret_scalar(key: &SecretKey) -> Result<SecretScalar<E>, Error> {
    let mut b = key.secret_bytes();
    let s = Scalar::<E>::from_be_bytes(&b);
    b.zeroize();

    let mut s = s.map_err(|_| Error::SignFailed)?;
    Ok(SecretScalar::new(&mut s))
}

/// Sign `digest` with key `d` and nonce `k`, returning the low-s compact
/// signature and its recovery id
pub fn sign_with_nonce(
    d: &SecretKey,
    digest: &[u8; 32],
    k: &SecretKey,
) -> Result<([u8; 64], u8), Error> {
    let d = secret_scalar(d)?;
    let k = secret_scalar(k)?;

    let r_point = (Point::<E>::generator() * &k).to_bytes(true);
    let r_point: &[u8] = r_point.as_ref();
    if r_point.len() != 33 {
        return Err(Error::SignFailed);
    }
    let x = &r_point[1..];

    let r = Scalar::<E>::from_be_bytes_mod_order(x);
    let z = Scalar::<E>::from_be_bytes_mod_order(digest);
    let k_inv = k.as_ref().invert().ok_or(Error::SignFailed)?;

    let s = k_inv * (z + r * d.as_ref());
    if s == Scalar::<E>::zero() {
        return Err(Error::SignFailed);
    }

    let r_bytes = r.to_be_bytes();
    let r_bytes: &[u8] = r_bytes.as_ref();
    let s_bytes = s.to_be_bytes();
    let s_bytes: &[u8] = s_bytes.as_ref();

    let mut recid = r_point[0] - 2;
    if r_bytes != x {
        recid |= 2;
    }

    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(r_bytes);
    compact[32..].copy_from_slice(s_bytes);

    let mut sig = Signature::from_compact(&compact).map_err(|_| Error::SignFailed)?;
    sig.normalize_s();

    // Negating s mirrors R, flipping the parity bit
    let normalized = sig.serialize_compact();
    if normalized != compact {
        recid ^= 1;
    }
    compact.zeroize();

    Ok((normalized, recid))
}

#[cfg(test)]
mod test {
    use rand_core::OsRng;
    use secp256k1::{
        ecdsa::{RecoverableSignature, RecoveryId},
        Message,
    };

    use super::*;

    #[test]
    fn signatures_verify_and_recover() {
        let secp = Secp256k1::new();

        for i in 0..8u8 {
            let d = random_nonce(&mut OsRng);
            let k = random_nonce(&mut OsRng);
            let digest = [i; 32];

            let (sig, recid) = sign_with_nonce(&d, &digest, &k).unwrap();

            let pk = PublicKey::from_secret_key(&secp, &d);
            let msg = Message::from_digest(digest);

            let s = Signature::from_compact(&sig).unwrap();
            secp.verify_ecdsa(&msg, &s, &pk).unwrap();

            let rs = RecoverableSignature::from_compact(&sig, RecoveryId::from_i32(recid as i32).unwrap())
                .unwrap();
            assert_eq!(secp.recover_ecdsa(&msg, &rs).unwrap(), pk);
        }
    }

    #[test]
    fn signature_uses_given_nonce() {
        let secp = Secp256k1::new();

        let d = random_nonce(&mut OsRng);
        let k = random_nonce(&mut OsRng);

        let (sig, _) = sign_with_nonce(&d, &[1u8; 32], &k).unwrap();

        let r = PublicKey::from_secret_key(&secp, &k).serialize();
        let r = Scalar::<E>::from_be_bytes_mod_order(&r[1..]).to_be_bytes();
        let r: &[u8] = r.as_ref();
        assert_eq!(&sig[..32], r);
    }

    #[test]
    fn s2c_nonce_matches_host_verification() {
        let secp = Secp256k1::new();

        let d = random_nonce(&mut OsRng);
        let k1 = random_nonce(&mut OsRng);
        let host_nonce = [0x5au8; 32];

        let k = s2c_nonce(&secp, &k1, &host_nonce).unwrap();
        let (sig, _) = sign_with_nonce(&d, &[7u8; 32], &k).unwrap();

        // r is the x coordinate of R1 + H(R1 || n)·G
        let r1 = PublicKey::from_slice(&nonce_commitment(&secp, &k1)).unwrap();
        let tweak =
            secp256k1::Scalar::from_be_bytes(commitment_tweak(&r1.serialize(), &host_nonce)).unwrap();
        let r = r1.add_exp_tweak(&secp, &tweak).unwrap().serialize();

        let r = Scalar::<E>::from_be_bytes_mod_order(&r[1..]).to_be_bytes();
        let r: &[u8] = r.as_ref();
        assert_eq!(&sig[..32], r);
    }
}
