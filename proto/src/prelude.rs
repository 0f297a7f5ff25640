//! Prelude to simplify downstream use of protocol objects
//!

pub use crate::{
    btc::{
        BtcCoin, CoinParams, MultisigScriptType, OutputType, PrevTxInitRequest,
        PrevTxInputRequest, PrevTxOutputRequest, RegisterScriptConfigRequest, ScriptConfig,
        ScriptConfigRegistration, ScriptConfigWithKeypath, SignInitRequest, SignInputRequest,
        SignMessageRequest, SignNextResponse, SignOutputRequest, SimpleType, XPubType, HARDENED,
    },
    eth::{EthCoin, EthSignMessageRequest, EthSignRequest},
    state::NextType,
    DeviceError, ErrorCode, Exchange, Request, Response, Version,
};
