// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Ethereum request messages
//!
//! Numeric fields are big-endian byte strings without leading zeroes, as
//! they appear in the RLP transaction encoding.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize, Display, EnumString)]
pub enum EthCoin {
    #[default]
    Eth,
    RopstenEth,
    RinkebyEth,
}

impl EthCoin {
    /// BIP-44 coin type (hardened)
    pub const fn bip44_coin(&self) -> u32 {
        match self {
            EthCoin::Eth => 60 + crate::btc::HARDENED,
            EthCoin::RopstenEth | EthCoin::RinkebyEth => 1 + crate::btc::HARDENED,
        }
    }
}

/// Legacy (pre EIP-1559) transaction signing request
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct EthSignRequest {
    pub coin: EthCoin,
    pub keypath: Vec<u32>,
    pub nonce: Vec<u8>,
    pub gas_price: Vec<u8>,
    pub gas_limit: Vec<u8>,
    pub recipient: Vec<u8>,
    pub value: Vec<u8>,
    pub data: Vec<u8>,
    pub host_nonce_commitment: Option<Vec<u8>>,
}

/// Personal message signing request, the signer applies the
/// `"\x19Ethereum Signed Message:\n" + len` prefix
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct EthSignMessageRequest {
    pub coin: EthCoin,
    pub keypath: Vec<u32>,
    pub msg: Vec<u8>,
    pub host_nonce_commitment: Option<Vec<u8>>,
}
