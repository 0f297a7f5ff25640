// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Anti-klepto nonce commitment protocol
//!
//! Before a signature is produced the host commits to a random nonce, the
//! signer answers with a commitment to its own nonce point `R1`, and only
//! then is the host nonce revealed. The signer must sign with
//! `k = k1 + H(R1 || host_nonce)` which the host checks against the
//! signature's `r` value, so a signer cannot grind or bias its nonces to leak
//! key material.
//!
//! Host nonces are single use, are never cloned or logged, and are zeroized
//! when dropped.

use generic_ec::{curves::Secp256k1 as E, Scalar as CurveScalar};
use log::trace;
use rand_core::{CryptoRng, OsRng, RngCore};
use secp256k1::{ecdsa::Signature, PublicKey, Scalar, Secp256k1};
use zeroize::{Zeroize, ZeroizeOnDrop};

use bitbox_hww_proto::{
    digest::{commitment_tweak, host_commit},
    Exchange, Request, Response,
};

use crate::{handle::Session, Error};

/// Anti-klepto verification errors
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum AntiKleptoError {
    /// Signer commitment is not a valid compressed curve point
    #[error("invalid signer nonce commitment")]
    InvalidCommitment,

    /// Signature is not a valid 64-byte compact signature
    #[error("invalid signature encoding")]
    InvalidSignature,

    /// Signature nonce does not match the committed nonces
    #[error("signature nonce does not match commitments")]
    NonceMismatch,
}

/// Host nonce for a single signature
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct HostNonce([u8; 32]);

impl HostNonce {
    /// Draw a fresh host nonce
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut n = [0u8; 32];
        rng.fill_bytes(&mut n);
        Self(n)
    }

    /// Commitment sent to the signer before the nonce is revealed
    pub fn commitment(&self) -> [u8; 32] {
        host_commit(&self.0)
    }

    /// Nonce bytes for the reveal request
    pub(crate) fn reveal(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Verify a signature against this nonce and the signer's commitment,
    /// consuming the nonce
    pub fn verify(self, signer_commitment: &[u8], signature: &[u8]) -> Result<(), AntiKleptoError> {
        verify(&self.0, signer_commitment, signature)
    }
}

impl core::fmt::Debug for HostNonce {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "HostNonce(commitment: {})", hex::encode(self.commitment()))
    }
}

/// Check that `signature` was produced with the nonce
/// `R = R1 + H(R1 || host_nonce)·G` where `R1` is the signer's commitment
pub fn verify(
    host_nonce: &[u8; 32],
    signer_commitment: &[u8],
    signature: &[u8],
) -> Result<(), AntiKleptoError> {
    let secp = Secp256k1::verification_only();

    let r1: [u8; 33] = signer_commitment
        .try_into()
        .map_err(|_| AntiKleptoError::InvalidCommitment)?;
    let r1_point = PublicKey::from_slice(&r1).map_err(|_| AntiKleptoError::InvalidCommitment)?;

    let sig = Signature::from_compact(signature).map_err(|_| AntiKleptoError::InvalidSignature)?;

    // Tweaks outside the group order occur with negligible probability
    let tweak = Scalar::from_be_bytes(commitment_tweak(&r1, host_nonce))
        .map_err(|_| AntiKleptoError::InvalidCommitment)?;
    let r = r1_point
        .add_exp_tweak(&secp, &tweak)
        .map_err(|_| AntiKleptoError::InvalidCommitment)?;

    // r = x(R) mod n
    let x = CurveScalar::<E>::from_be_bytes_mod_order(&r.serialize()[1..]).to_be_bytes();
    let x: &[u8] = x.as_ref();

    let compact = sig.serialize_compact();
    if x != &compact[..32] {
        return Err(AntiKleptoError::NonceMismatch);
    }

    Ok(())
}

/// Single-shot signature responses carrying a 65-byte recoverable signature
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum SignatureResponse {
    BtcMessage,
    Eth,
}

impl SignatureResponse {
    fn name(&self) -> &'static str {
        match self {
            SignatureResponse::BtcMessage => "BtcSignMessage",
            SignatureResponse::Eth => "EthSign",
        }
    }

    fn extract(&self, resp: Response) -> Result<[u8; 65], Error> {
        let signature = match (self, resp) {
            (SignatureResponse::BtcMessage, Response::BtcSignMessage { signature }) => signature,
            (SignatureResponse::Eth, Response::EthSign { signature }) => signature,
            (_, r) => {
                return Err(Error::UnexpectedResponse {
                    expected: self.name(),
                    actual: (&r).into(),
                })
            }
        };

        signature.as_slice().try_into().map_err(|_| {
            Error::violation(format!(
                "expected 65-byte signature, got {} bytes",
                signature.len()
            ))
        })
    }
}

/// Run a single-shot signing exchange, with the nonce commitment protocol
/// when `anti_klepto` is set.
///
/// `build` creates the signing request with an optional host commitment,
/// `reveal` the request disclosing the host nonce.
pub(crate) async fn sign_single<T, B, R>(
    session: &Session<'_, T>,
    anti_klepto: bool,
    build: B,
    reveal: R,
    kind: SignatureResponse,
) -> Result<[u8; 65], Error>
where
    T: Exchange + Send + Sync,
    B: FnOnce(Option<Vec<u8>>) -> Request,
    R: FnOnce(Vec<u8>) -> Request,
{
    if !anti_klepto {
        let resp = session.interactive(&build(None)).await?;
        return kind.extract(resp);
    }

    let nonce = HostNonce::generate(&mut OsRng);
    let commitment = nonce.commitment();
    trace!("Host nonce commitment: {}", hex::encode(commitment));

    let signer_commitment = match session.interactive(&build(Some(commitment.to_vec()))).await? {
        Response::AntiKleptoSignerCommitment { commitment } => commitment,
        r => {
            return Err(Error::UnexpectedResponse {
                expected: "AntiKleptoSignerCommitment",
                actual: (&r).into(),
            })
        }
    };

    let mut req = reveal(nonce.reveal());
    let resp = session.request(&req).await;
    scrub(&mut req);

    let signature = kind.extract(resp?)?;
    nonce.verify(&signer_commitment, &signature[..64])?;

    trace!("Nonce verification passed");

    Ok(signature)
}

/// Clear revealed nonce bytes from a request once sent
pub(crate) fn scrub(req: &mut Request) {
    match req {
        Request::BtcAntiKleptoSignature { host_nonce }
        | Request::EthAntiKleptoSignature { host_nonce } => host_nonce.zeroize(),
        Request::SetPassword { entropy } => entropy.zeroize(),
        _ => (),
    }
}
