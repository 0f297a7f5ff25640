// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signer side of the anti-klepto nonce commitment protocol

use rand_core::CryptoRngCore;
use secp256k1::SecretKey;

use bitbox_hww_proto::{digest::host_commit, Request, Response};

use super::{
    ecdsa::{nonce_commitment, random_nonce, s2c_nonce, sign_with_nonce},
    function::{PendingSign, SignKind},
    Driver, Engine, Error, State,
};

/// Host nonce used when the host does not take part in the protocol
const NO_HOST_NONCE: [u8; 32] = [0u8; 32];

impl<DRV: Driver, RNG: CryptoRngCore> Engine<DRV, RNG> {
    /// Sign `digest` once, either immediately or, when the host sent a
    /// nonce commitment, after the host reveals its nonce
    pub(crate) fn sign_single(
        &mut self,
        kind: SignKind,
        key: SecretKey,
        digest: [u8; 32],
        host_nonce_commitment: Option<&[u8]>,
    ) -> Result<Response, Error> {
        let k1 = random_nonce(&mut self.rng);

        let host_commitment = match host_nonce_commitment {
            Some(c) => <[u8; 32]>::try_from(c).map_err(|_| Error::InvalidLength)?,
            None => {
                let (sig, recid) = self.s2c_sign(
                    &key,
                    &digest,
                    &k1,
                    &host_commit(&NO_HOST_NONCE),
                    &NO_HOST_NONCE,
                )?;
                return Ok(signature_response(kind, &sig, recid));
            }
        };

        let commitment = nonce_commitment(&self.secp, &k1);

        self.function.anti_klepto_init(PendingSign {
            kind,
            key,
            digest,
            k1,
            host_commitment,
        });
        self.state = State::AntiKlepto;

        Ok(Response::AntiKleptoSignerCommitment {
            commitment: commitment.to_vec(),
        })
    }

    /// Complete a pending single-shot signature with the revealed host nonce
    pub(crate) fn anti_klepto_reveal(
        &mut self,
        req: &Request,
        host_nonce: &[u8],
    ) -> Result<Response, Error> {
        let p = self
            .function
            .anti_klepto_take()
            .ok_or(Error::UnexpectedRequest)?;

        // Reveal must match the pending operation
        match (p.kind, req) {
            (SignKind::BtcMessage, Request::BtcAntiKleptoSignature { .. })
            | (SignKind::Eth, Request::EthAntiKleptoSignature { .. }) => (),
            _ => return Err(Error::UnexpectedRequest),
        }

        let (sig, recid) = self.s2c_sign(&p.key, &p.digest, &p.k1, &p.host_commitment, host_nonce)?;

        self.state = State::Init;

        Ok(signature_response(p.kind, &sig, recid))
    }

    /// Check the revealed host nonce against its commitment, then sign with
    /// the sign-to-contract nonce
    pub(crate) fn s2c_sign(
        &mut self,
        key: &SecretKey,
        digest: &[u8; 32],
        k1: &SecretKey,
        host_commitment: &[u8; 32],
        host_nonce: &[u8],
    ) -> Result<([u8; 64], u8), Error> {
        let host_nonce = <[u8; 32]>::try_from(host_nonce).map_err(|_| Error::InvalidLength)?;

        if &host_commit(&host_nonce) != host_commitment {
            return Err(Error::NonceMismatch);
        }

        let k = match self.faults.grind_nonce {
            true => {
                log::warn!("Ignoring host nonce");
                random_nonce(&mut self.rng)
            }
            false => s2c_nonce(&self.secp, k1, &host_nonce)?,
        };

        sign_with_nonce(key, digest, &k)
    }
}

/// 65-byte signature with the recovery id appended
fn signature_response(kind: SignKind, sig: &[u8; 64], recid: u8) -> Response {
    let mut signature = sig.to_vec();
    signature.push(recid);

    match kind {
        SignKind::BtcMessage => Response::BtcSignMessage { signature },
        SignKind::Eth => Response::EthSign { signature },
    }
}
