// Copyright (c) 2022-2023 The MobileCoin Foundation

use bitbox_hww_proto::{btc::SignNextResponse, state::NextType};

use crate::Error;

/// Step requested by the signer during a transaction signing session,
/// with indices checked against the declared input / output counts
#[derive(Clone, Debug, PartialEq)]
pub enum SignerStep {
    /// Send input `i`
    Input(usize),
    /// Send the previous transaction header for input `i`
    PrevTxInit(usize),
    /// Send input `j` of the previous transaction for input `i`
    PrevTxInput(usize, usize),
    /// Send output `j` of the previous transaction for input `i`
    PrevTxOutput(usize, usize),
    /// Send output `i`
    Output(usize),
    /// Reveal the host nonce, carries the signer's nonce commitment
    HostNonce([u8; 33]),
    Done,
}

impl SignerStep {
    /// Parse and bounds-check a signer response
    pub(crate) fn parse(
        r: &SignNextResponse,
        num_inputs: usize,
        num_outputs: usize,
    ) -> Result<Self, Error> {
        let i = r.index as usize;
        let j = r.prev_index as usize;

        let input = |i: usize| match i < num_inputs {
            true => Ok(i),
            false => Err(Error::violation(format!(
                "input index {i} out of bounds ({num_inputs} inputs)"
            ))),
        };

        let s = match r.next_type {
            NextType::Input => SignerStep::Input(input(i)?),
            NextType::PrevtxInit => SignerStep::PrevTxInit(input(i)?),
            NextType::PrevtxInput => SignerStep::PrevTxInput(input(i)?, j),
            NextType::PrevtxOutput => SignerStep::PrevTxOutput(input(i)?, j),
            NextType::Output if i < num_outputs => SignerStep::Output(i),
            NextType::Output => {
                return Err(Error::violation(format!(
                    "output index {i} out of bounds ({num_outputs} outputs)"
                )))
            }
            NextType::HostNonce => {
                let c = r
                    .anti_klepto_signer_commitment
                    .as_deref()
                    .ok_or_else(|| Error::violation("host nonce request without signer commitment"))?;

                let c = c.try_into().map_err(|_| {
                    Error::violation(format!(
                        "signer commitment must be 33 bytes, got {}",
                        c.len()
                    ))
                })?;

                SignerStep::HostNonce(c)
            }
            NextType::Done => SignerStep::Done,
        };

        Ok(s)
    }
}

/// Fetch the signature attached to a signer response, if any
pub(crate) fn signature(r: &SignNextResponse) -> Result<Option<[u8; 64]>, Error> {
    if !r.has_signature {
        return Ok(None);
    }

    r.signature
        .as_slice()
        .try_into()
        .map(Some)
        .map_err(|_| {
            Error::violation(format!(
                "expected 64-byte signature, got {} bytes",
                r.signature.len()
            ))
        })
}
