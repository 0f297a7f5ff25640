// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Bitcoin-family request / response messages
//!
//! A transaction signing session is a strictly alternating exchange,
//! the host opens with a [SignInitRequest] and each signer reply is a
//! [SignNextResponse] naming the piece of the transaction the signer wants
//! next (see [NextType]).

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::state::NextType;

/// Hardened derivation offset
pub const HARDENED: u32 = 0x8000_0000;

/// Bitcoin-family coins supported by the signer
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum BtcCoin {
    Btc,
    Tbtc,
    Ltc,
    Tltc,
}

/// Static per-coin parameters
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct CoinParams {
    /// BIP-44 coin type (hardened), the second element of every keypath
    pub bip44_coin: u32,
    /// Human readable coin name
    pub name: &'static str,
    /// Unit shown for amounts
    pub unit: &'static str,
    /// Whether replace-by-fee sequence numbers are meaningful
    pub rbf_support: bool,
}

impl BtcCoin {
    /// Fetch parameters for a coin
    pub const fn params(&self) -> CoinParams {
        match self {
            BtcCoin::Btc => CoinParams {
                bip44_coin: HARDENED,
                name: "Bitcoin",
                unit: "BTC",
                rbf_support: true,
            },
            BtcCoin::Tbtc => CoinParams {
                bip44_coin: 1 + HARDENED,
                name: "BTC Testnet",
                unit: "TBTC",
                rbf_support: true,
            },
            BtcCoin::Ltc => CoinParams {
                bip44_coin: 2 + HARDENED,
                name: "Litecoin",
                unit: "LTC",
                rbf_support: false,
            },
            BtcCoin::Tltc => CoinParams {
                bip44_coin: 1 + HARDENED,
                name: "LTC Testnet",
                unit: "TLTC",
                rbf_support: false,
            },
        }
    }
}

/// Single-signature script types
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize, Display)]
pub enum SimpleType {
    P2wpkhP2sh,
    P2wpkh,
    P2tr,
}

/// Multisig script encodings
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize, Display)]
pub enum MultisigScriptType {
    P2wsh,
    P2wshP2sh,
}

/// Script configuration describing how inputs and change are locked
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ScriptConfig {
    Simple(SimpleType),
    Multisig {
        threshold: u32,
        xpubs: Vec<String>,
        our_xpub_index: u32,
        script_type: MultisigScriptType,
    },
}

impl ScriptConfig {
    /// Taproot inputs commit to all prevouts and need no previous transaction
    pub fn is_taproot(&self) -> bool {
        matches!(self, ScriptConfig::Simple(SimpleType::P2tr))
    }
}

/// Script configuration with the account keypath it applies to
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ScriptConfigWithKeypath {
    pub script_config: ScriptConfig,
    pub keypath: Vec<u32>,
}

/// External output script types
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize, Display)]
pub enum OutputType {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    P2tr,
}

/// Open a signing session
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SignInitRequest {
    pub coin: BtcCoin,
    pub script_configs: Vec<ScriptConfigWithKeypath>,
    pub version: u32,
    pub num_inputs: u32,
    pub num_outputs: u32,
    pub locktime: u32,
}

/// Transaction input, sent once per pass
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SignInputRequest {
    pub prev_out_hash: Vec<u8>,
    pub prev_out_index: u32,
    pub prev_out_value: u64,
    pub sequence: u32,
    pub keypath: Vec<u32>,
    pub script_config_index: u32,
    /// Host nonce commitment, attached to pass-2 inputs only
    pub host_nonce_commitment: Option<Vec<u8>>,
}

/// Transaction output
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SignOutputRequest {
    /// Output pays to one of our own script configs (change)
    pub ours: bool,
    pub output_type: Option<OutputType>,
    pub value: u64,
    pub hash: Vec<u8>,
    pub keypath: Vec<u32>,
    pub script_config_index: u32,
}

/// Header of the previous transaction for input `index`
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PrevTxInitRequest {
    pub version: u32,
    pub num_inputs: u32,
    pub num_outputs: u32,
    pub locktime: u32,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PrevTxInputRequest {
    pub prev_out_hash: Vec<u8>,
    pub prev_out_index: u32,
    pub signature_script: Vec<u8>,
    pub sequence: u32,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PrevTxOutputRequest {
    pub value: u64,
    pub pubkey_script: Vec<u8>,
}

/// Signer reply within a signing session
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SignNextResponse {
    pub next_type: NextType,
    /// Input / output index the signer is asking for
    pub index: u32,
    /// Sub-index into the previous transaction for prevtx steps
    pub prev_index: u32,
    pub has_signature: bool,
    /// 64-byte compact signature for the previously sent input
    pub signature: Vec<u8>,
    /// Signer nonce commitment (33-byte compressed point) on
    /// [NextType::HostNonce]
    pub anti_klepto_signer_commitment: Option<Vec<u8>>,
}

impl SignNextResponse {
    /// Create a response requesting the next item with no signature attached
    pub fn next(next_type: NextType, index: u32) -> Self {
        Self {
            next_type,
            index,
            prev_index: 0,
            has_signature: false,
            signature: vec![],
            anti_klepto_signer_commitment: None,
        }
    }

    /// Set the prevtx sub-index
    pub fn with_prev_index(mut self, prev_index: u32) -> Self {
        self.prev_index = prev_index;
        self
    }

    /// Attach a signature for the previous input
    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.has_signature = true;
        self.signature = signature;
        self
    }
}

/// Sign an arbitrary message with the key of a single-sig script config
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SignMessageRequest {
    pub coin: BtcCoin,
    pub script_config: ScriptConfigWithKeypath,
    pub msg: Vec<u8>,
    pub host_nonce_commitment: Option<Vec<u8>>,
}

/// Extended public key encoding for multisig registrations
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize, Display)]
pub enum XPubType {
    #[default]
    AutoElectrum,
    AutoXpubTpub,
}

/// Script configuration identity used for registration lookups
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ScriptConfigRegistration {
    pub coin: BtcCoin,
    pub script_config: ScriptConfig,
    pub keypath: Vec<u32>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct RegisterScriptConfigRequest {
    pub registration: ScriptConfigRegistration,
    /// Account name, empty to prompt for one on the device
    pub name: String,
    pub xpub_type: XPubType,
}
