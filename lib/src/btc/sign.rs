// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Bitcoin transaction signing session
//!
//! The signer drives the session, each [SignNextResponse] names the next
//! piece it needs. Inputs are requested twice: pass 1 to compute the
//! transaction hashes and pass 2 to sign. Outputs and previous transactions
//! are streamed between the passes on request.
//!
//! With [Feature::AntiKleptoTransaction] every pass-2 input carries a host
//! nonce commitment and the signer replies with a `HostNonce` request before
//! releasing the signature for that input.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, trace};
use rand_core::OsRng;

use bitbox_hww_proto::{
    btc::{SignInitRequest, SignNextResponse},
    Exchange, Request,
};

use super::{
    count, prevtx,
    step::{self, SignerStep},
    BtcTransaction,
};
use crate::{
    antiklepto::{scrub, HostNonce},
    caps::Feature,
    handle::{sign_next, Session},
    DeviceHandle, Error,
};

/// Signature for the input at `index`
pub type InputSignature = (usize, [u8; 64]);

/// Host nonce committed to in the last pass-2 input, awaiting the signer's
/// [SignerStep::HostNonce] request
struct PendingSignature {
    index: usize,
    nonce: HostNonce,
}

/// Per-session signing state
struct SignContext<'a> {
    tx: &'a BtcTransaction,
    anti_klepto: bool,
    /// Inputs seen in pass 1
    pass1: BTreeSet<usize>,
    /// Pass 2 starts after the last input has been seen in pass 1
    pass2: bool,
    pending: Option<PendingSignature>,
    sigs: BTreeMap<usize, [u8; 64]>,
}

impl<T: Exchange + Send + Sync> DeviceHandle<T> {
    /// Sign a bitcoin transaction, returning one signature per input
    /// sorted by input index.
    ///
    /// On any error the session is abandoned and no signatures are returned.
    pub async fn btc_sign(&self, tx: &BtcTransaction) -> Result<Vec<InputSignature>, Error> {
        if !matches!(tx.version, 1 | 2) {
            return Err(Error::InvalidArgument(format!(
                "unsupported transaction version {}",
                tx.version
            )));
        }

        let num_inputs = count(tx.inputs.len(), "inputs")?;
        let num_outputs = count(tx.outputs.len(), "outputs")?;

        let anti_klepto = self.anti_klepto(Feature::AntiKleptoTransaction);

        let session = self.session().await;

        info!(
            "Starting {} signing session ({} inputs, {} outputs)",
            tx.coin,
            tx.inputs.len(),
            tx.outputs.len()
        );

        let mut ctx = SignContext {
            tx,
            anti_klepto,
            pass1: BTreeSet::new(),
            pass2: false,
            pending: None,
            sigs: BTreeMap::new(),
        };

        let init = Request::BtcSignInit(SignInitRequest {
            coin: tx.coin,
            script_configs: tx.script_configs.clone(),
            version: tx.version,
            num_inputs,
            num_outputs,
            locktime: tx.locktime,
        });
        let mut next = sign_next(session.interactive(&init).await?)?;

        loop {
            let step = SignerStep::parse(&next, tx.inputs.len(), tx.outputs.len())?;

            debug!("Signer requested {:?}", step);

            if let Some(p) = &ctx.pending {
                if !matches!(step, SignerStep::HostNonce(_)) {
                    return Err(Error::violation(format!(
                        "expected host nonce request for input {}, got {:?}",
                        p.index, step
                    )));
                }
            }

            next = match step {
                SignerStep::Input(i) => ctx.input(&session, i).await?,
                SignerStep::PrevTxInit(_)
                | SignerStep::PrevTxInput(..)
                | SignerStep::PrevTxOutput(..) => {
                    prevtx::stream(&session, &tx.inputs, &step).await?
                }
                SignerStep::Output(i) => {
                    let req = Request::BtcSignOutput(tx.outputs[i].to_request());
                    sign_next(session.interactive(&req).await?)?
                }
                SignerStep::HostNonce(signer_commitment) => {
                    ctx.host_nonce(&session, &signer_commitment).await?
                }
                SignerStep::Done => break,
            };
        }

        ctx.finish()
    }
}

impl<'a> SignContext<'a> {
    /// Send input `i`, attaching a fresh nonce commitment in pass 2
    async fn input<T: Exchange + Send + Sync>(
        &mut self,
        session: &Session<'_, T>,
        i: usize,
    ) -> Result<SignNextResponse, Error> {
        let pass2 = self.pass2;

        let nonce = match pass2 && self.anti_klepto {
            true => Some(HostNonce::generate(&mut OsRng)),
            false => None,
        };
        let commitment = nonce.as_ref().map(|n| n.commitment());

        if let Some(c) = &commitment {
            trace!("Input {} host nonce commitment: {}", i, hex::encode(c));
        }

        let req = Request::BtcSignInput(self.tx.inputs[i].to_request(commitment));
        let resp = sign_next(session.interactive(&req).await?)?;

        if !pass2 {
            self.pass1.insert(i);

            if i == self.tx.inputs.len() - 1 {
                if self.pass1.len() != self.tx.inputs.len() {
                    return Err(Error::violation(format!(
                        "signing pass started with {} of {} inputs seen",
                        self.pass1.len(),
                        self.tx.inputs.len()
                    )));
                }

                debug!("All inputs streamed, starting pass 2");
                self.pass2 = true;
            }

            return Ok(resp);
        }

        match nonce {
            // Signature follows the host nonce reveal
            Some(nonce) => self.pending = Some(PendingSignature { index: i, nonce }),
            None => {
                let sig = step::signature(&resp)?
                    .ok_or_else(|| Error::violation(format!("missing signature for input {i}")))?;
                self.record(i, sig)?;
            }
        }

        Ok(resp)
    }

    /// Reveal the pending host nonce, then verify and record the signature
    async fn host_nonce<T: Exchange + Send + Sync>(
        &mut self,
        session: &Session<'_, T>,
        signer_commitment: &[u8; 33],
    ) -> Result<SignNextResponse, Error> {
        let PendingSignature { index, nonce } = self
            .pending
            .take()
            .ok_or_else(|| Error::violation("host nonce requested without a pending commitment"))?;

        let mut req = Request::BtcAntiKleptoSignature {
            host_nonce: nonce.reveal(),
        };
        let resp = session.request(&req).await;
        scrub(&mut req);

        let resp = sign_next(resp?)?;
        let sig = step::signature(&resp)?
            .ok_or_else(|| Error::violation(format!("missing signature for input {index}")))?;

        nonce.verify(signer_commitment, &sig)?;

        debug!("Nonce verification passed for input {}", index);

        self.record(index, sig)?;

        Ok(resp)
    }

    fn record(&mut self, index: usize, sig: [u8; 64]) -> Result<(), Error> {
        if self.sigs.insert(index, sig).is_some() {
            return Err(Error::violation(format!(
                "duplicate signature for input {index}"
            )));
        }
        Ok(())
    }

    /// Check every input was signed exactly once
    fn finish(self) -> Result<Vec<InputSignature>, Error> {
        let n = self.tx.inputs.len();

        if self.sigs.len() != n {
            return Err(Error::violation(format!(
                "signing completed with {} of {} signatures",
                self.sigs.len(),
                n
            )));
        }

        info!("Signing session complete");

        Ok(self.sigs.into_iter().collect())
    }
}
