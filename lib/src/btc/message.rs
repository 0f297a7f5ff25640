// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Bitcoin message signing

use log::debug;

use bitbox_hww_proto::{
    btc::{BtcCoin, ScriptConfigWithKeypath, SignMessageRequest},
    Exchange, Request,
};

use crate::{
    antiklepto::{sign_single, SignatureResponse},
    caps::Feature,
    DeviceHandle, Error,
};

/// Electrum header offset for compressed public keys
const ELECTRUM_COMPRESSED: u8 = 27 + 4;

/// Bitcoin message signature
#[derive(Clone, Debug, PartialEq)]
pub struct MessageSignature {
    /// Compact `r || s` signature
    pub signature: [u8; 64],
    /// Public key recovery id (0..=3)
    pub recid: u8,
    /// Electrum-compatible encoding, `[27 + 4 + recid] || signature`
    pub electrum_sig65: [u8; 65],
}

impl MessageSignature {
    fn from_sig65(sig: &[u8; 65]) -> Result<Self, Error> {
        let recid = sig[64];
        if recid > 3 {
            return Err(Error::violation(format!("invalid recovery id {recid}")));
        }

        let mut signature = [0u8; 64];
        signature.copy_from_slice(&sig[..64]);

        let mut electrum_sig65 = [0u8; 65];
        electrum_sig65[0] = ELECTRUM_COMPRESSED + recid;
        electrum_sig65[1..].copy_from_slice(&signature);

        Ok(Self {
            signature,
            recid,
            electrum_sig65,
        })
    }
}

impl<T: Exchange + Send + Sync> DeviceHandle<T> {
    /// Sign a message with the key of a single-sig script config
    pub async fn btc_sign_msg(
        &self,
        coin: BtcCoin,
        script_config: ScriptConfigWithKeypath,
        msg: &[u8],
    ) -> Result<MessageSignature, Error> {
        self.require(Feature::BtcSignMessage)?;

        let anti_klepto = self.anti_klepto(Feature::AntiKleptoMessage);

        debug!("Signing {} byte message ({})", msg.len(), coin);

        let session = self.session().await;
        let sig = sign_single(
            &session,
            anti_klepto,
            |host_nonce_commitment| {
                Request::BtcSignMessage(SignMessageRequest {
                    coin,
                    script_config,
                    msg: msg.to_vec(),
                    host_nonce_commitment,
                })
            },
            |host_nonce| Request::BtcAntiKleptoSignature { host_nonce },
            SignatureResponse::BtcMessage,
        )
        .await?;

        MessageSignature::from_sig65(&sig)
    }
}
