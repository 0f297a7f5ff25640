// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Ethereum transaction and message signing
//!

use log::debug;

use bitbox_hww_proto::{
    eth::{EthCoin, EthSignMessageRequest, EthSignRequest},
    Exchange, Request,
};

use crate::{
    antiklepto::{sign_single, SignatureResponse},
    caps::Feature,
    DeviceHandle, Error,
};

/// Recovery id offset marking an uncompressed public key
const UNCOMPRESSED_RECID_OFFSET: u8 = 27;

/// Legacy ethereum transaction fields.
///
/// Numeric fields are minimal big-endian byte strings as in the RLP
/// encoding, callers are responsible for decoding RLP.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EthTransaction {
    pub nonce: Vec<u8>,
    pub gas_price: Vec<u8>,
    pub gas_limit: Vec<u8>,
    /// 20-byte recipient address
    pub recipient: Vec<u8>,
    pub value: Vec<u8>,
    pub data: Vec<u8>,
}

impl<T: Exchange + Send + Sync> DeviceHandle<T> {
    /// Sign an ethereum transaction, returning the 64-byte signature
    /// followed by the recovery id
    pub async fn eth_sign(
        &self,
        tx: &EthTransaction,
        keypath: &[u32],
        coin: EthCoin,
    ) -> Result<[u8; 65], Error> {
        let anti_klepto = self.anti_klepto(Feature::AntiKleptoMessage);

        debug!("Signing {} transaction", coin);

        let session = self.session().await;
        sign_single(
            &session,
            anti_klepto,
            |host_nonce_commitment| {
                Request::EthSign(EthSignRequest {
                    coin,
                    keypath: keypath.to_vec(),
                    nonce: tx.nonce.clone(),
                    gas_price: tx.gas_price.clone(),
                    gas_limit: tx.gas_limit.clone(),
                    recipient: tx.recipient.clone(),
                    value: tx.value.clone(),
                    data: tx.data.clone(),
                    host_nonce_commitment,
                })
            },
            |host_nonce| Request::EthAntiKleptoSignature { host_nonce },
            SignatureResponse::Eth,
        )
        .await
    }

    /// Sign a personal message, returning the 64-byte signature followed by
    /// `27 + recid`
    pub async fn eth_sign_msg(
        &self,
        msg: &[u8],
        keypath: &[u32],
        coin: EthCoin,
    ) -> Result<[u8; 65], Error> {
        let anti_klepto = self.anti_klepto(Feature::AntiKleptoMessage);

        debug!("Signing {} byte {} message", msg.len(), coin);

        let session = self.session().await;
        let mut sig = sign_single(
            &session,
            anti_klepto,
            |host_nonce_commitment| {
                Request::EthSignMessage(EthSignMessageRequest {
                    coin,
                    keypath: keypath.to_vec(),
                    msg: msg.to_vec(),
                    host_nonce_commitment,
                })
            },
            |host_nonce| Request::EthAntiKleptoSignature { host_nonce },
            SignatureResponse::Eth,
        )
        .await?;

        if sig[64] > 3 {
            return Err(Error::violation(format!("invalid recovery id {}", sig[64])));
        }
        sig[64] += UNCOMPRESSED_RECID_OFFSET;

        Ok(sig)
    }
}
