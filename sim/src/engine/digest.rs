// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transaction digests computed by the signer
//!
//! The simulator does not serialize bitcoin transactions, signature hashes
//! are derived from a running digest over every field streamed in pass 1.

use sha2::{Digest as _, Sha256};

use bitbox_hww_proto::{
    btc::{SignInitRequest, SignInputRequest, SignOutputRequest},
    eth::EthSignRequest,
};

/// Running transaction digest, updated with each streamed item
#[derive(Clone, PartialEq)]
pub struct TxDigest([u8; 32]);

impl TxDigest {
    /// Create a new (empty) digest
    pub const fn new() -> Self {
        Self([0u8; 32])
    }

    /// Update digest with a new item hash
    pub fn update(&mut self, item: &[u8; 32]) -> &mut Self {
        let d = Sha256::new().chain_update(self.0).chain_update(item);
        self.0.copy_from_slice(d.finalize().as_ref());
        self
    }

    /// Signature hash for input `index`
    pub fn sighash(&self, index: u32) -> [u8; 32] {
        Sha256::new()
            .chain_update("sighash")
            .chain_update(self.0)
            .chain_update(index.to_le_bytes())
            .finalize()
            .into()
    }
}

impl Default for TxDigest {
    fn default() -> Self {
        Self::new()
    }
}

/// Debug format [TxDigest] as hex
impl core::fmt::Debug for TxDigest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for b in &self.0[..] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

fn keypath(d: Sha256, path: &[u32]) -> Sha256 {
    path.iter()
        .fold(d.chain_update((path.len() as u32).to_le_bytes()), |d, p| {
            d.chain_update(p.to_le_bytes())
        })
}

pub fn digest_sign_init(r: &SignInitRequest) -> [u8; 32] {
    Sha256::new()
        .chain_update("sign_init")
        .chain_update(r.coin.params().unit)
        .chain_update(r.version.to_le_bytes())
        .chain_update(r.num_inputs.to_le_bytes())
        .chain_update(r.num_outputs.to_le_bytes())
        .chain_update(r.locktime.to_le_bytes())
        .finalize()
        .into()
}

pub fn digest_sign_input(r: &SignInputRequest) -> [u8; 32] {
    let d = Sha256::new()
        .chain_update("sign_input")
        .chain_update(&r.prev_out_hash)
        .chain_update(r.prev_out_index.to_le_bytes())
        .chain_update(r.prev_out_value.to_le_bytes())
        .chain_update(r.sequence.to_le_bytes())
        .chain_update(r.script_config_index.to_le_bytes());

    keypath(d, &r.keypath).finalize().into()
}

pub fn digest_sign_output(r: &SignOutputRequest) -> [u8; 32] {
    let mut d = Sha256::new()
        .chain_update("sign_output")
        .chain_update([r.ours as u8])
        .chain_update(r.value.to_le_bytes())
        .chain_update(&r.hash);

    if let Some(t) = r.output_type {
        d.update(t.to_string());
    }

    keypath(d, &r.keypath).finalize().into()
}

/// Message hash with the bitcoin signed message prefix
pub fn digest_btc_message(msg: &[u8]) -> [u8; 32] {
    const PREFIX: &[u8] = b"\x18Bitcoin Signed Message:\n";

    let inner = Sha256::new()
        .chain_update(PREFIX)
        .chain_update(varint(msg.len()))
        .chain_update(msg)
        .finalize();

    Sha256::digest(inner).into()
}

/// Message hash with the ethereum personal message prefix
pub fn digest_eth_message(msg: &[u8]) -> [u8; 32] {
    Sha256::new()
        .chain_update(b"\x19Ethereum Signed Message:\n")
        .chain_update(msg.len().to_string())
        .chain_update(msg)
        .finalize()
        .into()
}

/// Ethereum transaction hash over the signed fields
pub fn digest_eth_tx(r: &EthSignRequest) -> [u8; 32] {
    [
        &r.nonce,
        &r.gas_price,
        &r.gas_limit,
        &r.recipient,
        &r.value,
        &r.data,
    ]
    .iter()
    .fold(Sha256::new().chain_update("eth_sign"), |d, f| {
        d.chain_update((f.len() as u32).to_le_bytes()).chain_update(f)
    })
    .finalize()
    .into()
}

/// Bitcoin compact size encoding
fn varint(n: usize) -> Vec<u8> {
    match n {
        0..=0xfc => vec![n as u8],
        0xfd..=0xffff => {
            let mut v = vec![0xfd];
            v.extend_from_slice(&(n as u16).to_le_bytes());
            v
        }
        _ => {
            let mut v = vec![0xfe];
            v.extend_from_slice(&(n as u32).to_le_bytes());
            v
        }
    }
}
