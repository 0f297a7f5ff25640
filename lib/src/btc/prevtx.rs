// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Previous transaction streaming
//!
//! For each non-taproot input the signer requests the transaction being
//! spent piece by piece (header, inputs, outputs) to verify the input value.

use log::debug;

use bitbox_hww_proto::{
    btc::{PrevTxInitRequest, PrevTxInputRequest, PrevTxOutputRequest, SignNextResponse},
    Exchange, Request,
};

use super::{count, step::SignerStep, PrevTx, TxInput};
use crate::{
    handle::{sign_next, Session},
    Error,
};

fn prev_tx(inputs: &[TxInput], i: usize) -> Result<&PrevTx, Error> {
    inputs
        .get(i)
        .and_then(|input| input.prev_tx.as_ref())
        .ok_or_else(|| Error::violation(format!("no previous transaction for input {i}")))
}

/// Build the request answering a previous transaction step
pub(crate) fn request(inputs: &[TxInput], step: &SignerStep) -> Result<Request, Error> {
    let req = match *step {
        SignerStep::PrevTxInit(i) => {
            let tx = prev_tx(inputs, i)?;
            Request::BtcPrevTxInit(PrevTxInitRequest {
                version: tx.version,
                num_inputs: count(tx.inputs.len(), "previous transaction inputs")?,
                num_outputs: count(tx.outputs.len(), "previous transaction outputs")?,
                locktime: tx.locktime,
            })
        }
        SignerStep::PrevTxInput(i, j) => {
            let tx = prev_tx(inputs, i)?;
            let p = tx.inputs.get(j).ok_or_else(|| {
                Error::violation(format!(
                    "previous transaction input {j} out of bounds for input {i} ({} inputs)",
                    tx.inputs.len()
                ))
            })?;
            Request::BtcPrevTxInput(PrevTxInputRequest {
                prev_out_hash: p.prev_out_hash.to_vec(),
                prev_out_index: p.prev_out_index,
                signature_script: p.signature_script.clone(),
                sequence: p.sequence,
            })
        }
        SignerStep::PrevTxOutput(i, j) => {
            let tx = prev_tx(inputs, i)?;
            let p = tx.outputs.get(j).ok_or_else(|| {
                Error::violation(format!(
                    "previous transaction output {j} out of bounds for input {i} ({} outputs)",
                    tx.outputs.len()
                ))
            })?;
            Request::BtcPrevTxOutput(PrevTxOutputRequest {
                value: p.value,
                pubkey_script: p.pubkey_script.clone(),
            })
        }
        _ => return Err(Error::violation(format!("{step:?} is not a prevtx step"))),
    };

    Ok(req)
}

/// Send one piece of a previous transaction, returning the signer's next request
pub(crate) async fn stream<T: Exchange + Send + Sync>(
    session: &Session<'_, T>,
    inputs: &[TxInput],
    step: &SignerStep,
) -> Result<SignNextResponse, Error> {
    debug!("Streaming {:?}", step);

    let req = request(inputs, step)?;
    sign_next(session.request(&req).await?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::btc::{PrevTxInput, PrevTxOutput};

    fn inputs() -> Vec<TxInput> {
        let input = TxInput {
            prev_out_hash: [1u8; 32],
            prev_out_index: 0,
            prev_out_value: 1_000,
            sequence: 0xffff_ffff,
            keypath: vec![],
            script_config_index: 0,
            prev_tx: None,
        };

        vec![
            input.clone(),
            TxInput {
                prev_tx: Some(PrevTx {
                    version: 2,
                    locktime: 7,
                    inputs: vec![PrevTxInput {
                        prev_out_hash: [9u8; 32],
                        prev_out_index: 3,
                        signature_script: vec![0xaa, 0xbb],
                        sequence: 5,
                    }],
                    outputs: vec![PrevTxOutput {
                        value: 1_000,
                        pubkey_script: vec![0x00, 0x14],
                    }],
                }),
                ..input
            },
        ]
    }

    #[test]
    fn builds_prevtx_requests() {
        let inputs = inputs();

        assert_eq!(
            request(&inputs, &SignerStep::PrevTxInit(1)).unwrap(),
            Request::BtcPrevTxInit(PrevTxInitRequest {
                version: 2,
                num_inputs: 1,
                num_outputs: 1,
                locktime: 7,
            })
        );

        assert_eq!(
            request(&inputs, &SignerStep::PrevTxInput(1, 0)).unwrap(),
            Request::BtcPrevTxInput(PrevTxInputRequest {
                prev_out_hash: vec![9u8; 32],
                prev_out_index: 3,
                signature_script: vec![0xaa, 0xbb],
                sequence: 5,
            })
        );
    }

    #[test]
    fn rejects_missing_data() {
        let inputs = inputs();

        for step in [
            SignerStep::PrevTxInit(0),
            SignerStep::PrevTxInput(1, 1),
            SignerStep::PrevTxOutput(1, 1),
            SignerStep::PrevTxOutput(2, 0),
            SignerStep::Input(0),
        ] {
            assert!(
                matches!(request(&inputs, &step), Err(Error::ProtocolViolation(_))),
                "{step:?}"
            );
        }
    }
}
