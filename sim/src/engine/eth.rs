// Copyright (c) 2022-2023 The MobileCoin Foundation

use rand_core::CryptoRngCore;

use bitbox_hww_proto::{
    btc::HARDENED,
    eth::{EthCoin, EthSignMessageRequest, EthSignRequest},
    Response,
};

use super::{
    digest::{digest_eth_message, digest_eth_tx},
    function::SignKind,
    Confirm, Driver, Engine, Error, MAX_MESSAGE_LEN,
};

/// Maximum length of the data field
const MAX_DATA_LEN: usize = 1024;

/// Check a big-endian quantity fits `max` bytes with no leading zeroes
fn check_quantity(v: &[u8], max: usize) -> Result<(), Error> {
    if v.len() > max {
        return Err(Error::InvalidLength);
    }
    if v.first() == Some(&0) {
        return Err(Error::InvalidInput);
    }
    Ok(())
}

/// Check `m / 44' / coin' / 0' / 0 / index`
fn check_keypath(coin: EthCoin, keypath: &[u32]) -> Result<(), Error> {
    match keypath {
        [purpose, c, account, 0, _]
            if *purpose == 44 + HARDENED && *c == coin.bip44_coin() && *account == HARDENED =>
        {
            Ok(())
        }
        _ => Err(Error::InvalidKeypath),
    }
}

impl<DRV: Driver, RNG: CryptoRngCore> Engine<DRV, RNG> {
    pub(crate) fn eth_sign(&mut self, r: &EthSignRequest) -> Result<Response, Error> {
        check_keypath(r.coin, &r.keypath)?;

        check_quantity(&r.nonce, 16)?;
        check_quantity(&r.gas_price, 16)?;
        check_quantity(&r.gas_limit, 16)?;
        check_quantity(&r.value, 32)?;

        if r.recipient.len() != 20 || r.recipient.iter().all(|b| *b == 0) {
            return Err(Error::InvalidInput);
        }
        if r.data.len() > MAX_DATA_LEN {
            return Err(Error::InvalidLength);
        }
        // Nothing to transfer
        if r.data.is_empty() && r.value.is_empty() {
            return Err(Error::InvalidInput);
        }

        self.confirm(&Confirm::EthTransaction {
            coin: r.coin,
            recipient: r.recipient.clone(),
            value: r.value.clone(),
        })?;

        let key = self.key(&r.keypath)?;

        self.sign_single(
            SignKind::Eth,
            key,
            digest_eth_tx(r),
            r.host_nonce_commitment.as_deref(),
        )
    }

    pub(crate) fn eth_sign_message(&mut self, r: &EthSignMessageRequest) -> Result<Response, Error> {
        check_keypath(r.coin, &r.keypath)?;

        if r.msg.len() > MAX_MESSAGE_LEN {
            return Err(Error::InvalidLength);
        }

        self.confirm(&Confirm::EthMessage {
            coin: r.coin,
            msg: r.msg.clone(),
        })?;

        let key = self.key(&r.keypath)?;

        self.sign_single(
            SignKind::Eth,
            key,
            digest_eth_message(&r.msg),
            r.host_nonce_commitment.as_deref(),
        )
    }
}
