// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Bitcoin transaction and message signing APIs
//!

use bitbox_hww_proto::btc::{
    BtcCoin, OutputType, ScriptConfigWithKeypath, SignInputRequest, SignOutputRequest,
};

use crate::Error;

mod message;
pub use message::MessageSignature;

mod prevtx;

mod sign;
pub use sign::InputSignature;

mod step;
pub use step::SignerStep;

/// Transaction to be signed
#[derive(Clone, Debug, PartialEq)]
pub struct BtcTransaction {
    pub coin: BtcCoin,
    /// Script configs referenced by inputs and change outputs
    pub script_configs: Vec<ScriptConfigWithKeypath>,
    /// Transaction version, 1 or 2
    pub version: u32,
    pub locktime: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

/// Input spending one of our outputs
#[derive(Clone, Debug, PartialEq)]
pub struct TxInput {
    pub prev_out_hash: [u8; 32],
    pub prev_out_index: u32,
    pub prev_out_value: u64,
    pub sequence: u32,
    pub keypath: Vec<u32>,
    pub script_config_index: u32,
    /// Transaction being spent, required for non-taproot inputs
    pub prev_tx: Option<PrevTx>,
}

/// Previous transaction, streamed to the signer so it can verify input values
#[derive(Clone, Debug, PartialEq)]
pub struct PrevTx {
    pub version: u32,
    pub locktime: u32,
    pub inputs: Vec<PrevTxInput>,
    pub outputs: Vec<PrevTxOutput>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrevTxInput {
    pub prev_out_hash: [u8; 32],
    pub prev_out_index: u32,
    pub signature_script: Vec<u8>,
    pub sequence: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrevTxOutput {
    pub value: u64,
    pub pubkey_script: Vec<u8>,
}

/// Transaction output
#[derive(Clone, Debug, PartialEq)]
pub enum TxOutput {
    /// Change to one of our script configs
    Internal {
        keypath: Vec<u32>,
        value: u64,
        script_config_index: u32,
    },
    /// Payment to an external address
    External {
        output_type: OutputType,
        /// Pubkey / script hash, or taproot output key
        hash: Vec<u8>,
        value: u64,
    },
}

impl TxInput {
    pub(crate) fn to_request(&self, host_nonce_commitment: Option<[u8; 32]>) -> SignInputRequest {
        SignInputRequest {
            prev_out_hash: self.prev_out_hash.to_vec(),
            prev_out_index: self.prev_out_index,
            prev_out_value: self.prev_out_value,
            sequence: self.sequence,
            keypath: self.keypath.clone(),
            script_config_index: self.script_config_index,
            host_nonce_commitment: host_nonce_commitment.map(|c| c.to_vec()),
        }
    }
}

impl TxOutput {
    pub(crate) fn to_request(&self) -> SignOutputRequest {
        match self {
            TxOutput::Internal {
                keypath,
                value,
                script_config_index,
            } => SignOutputRequest {
                ours: true,
                output_type: None,
                value: *value,
                hash: vec![],
                keypath: keypath.clone(),
                script_config_index: *script_config_index,
            },
            TxOutput::External {
                output_type,
                hash,
                value,
            } => SignOutputRequest {
                ours: false,
                output_type: Some(*output_type),
                value: *value,
                hash: hash.clone(),
                keypath: vec![],
                script_config_index: 0,
            },
        }
    }

    pub fn value(&self) -> u64 {
        match self {
            TxOutput::Internal { value, .. } | TxOutput::External { value, .. } => *value,
        }
    }
}

/// Wire count for a collection, rejecting lengths beyond `u32`
pub(crate) fn count(len: usize, what: &str) -> Result<u32, Error> {
    u32::try_from(len).map_err(|_| Error::InvalidArgument(format!("too many {what} ({len})")))
}
