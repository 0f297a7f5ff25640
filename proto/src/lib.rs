// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol definitions for communication with BitBox-style hardware signers
//!
//! This crate provides the typed request / response messages exchanged with a
//! signer, the negotiated firmware [Version], the [Exchange] transport facade
//! and the tagged hashes of the anti-klepto nonce commitment protocol.
//!
//! Messages are plain serde types, framing and encryption are the concern of
//! the transport so no wire layout is fixed here. Byte fields are `Vec<u8>`
//! with lengths checked by the receiving side.
//!

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

pub mod btc;
pub mod digest;
pub mod eth;
pub mod prelude;
pub mod state;

mod exchange;
pub use exchange::Exchange;

mod version;
pub use version::{Version, VersionError};

/// Signer error codes, reported in [Response::Error]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter, TryFromPrimitive)]
#[repr(u32)]
pub enum ErrorCode {
    /// Malformed or out-of-range request field
    InvalidInput = 101,
    /// Signer ran out of memory
    Memory = 102,
    /// Operation failed or was declined
    Generic = 103,
    /// User rejected the operation on the device
    UserAbort = 104,
    /// Request not valid in the current signer state
    InvalidState = 105,
    /// Feature disabled on this device
    Disabled = 106,
    /// Entry already exists
    Duplicate = 107,
}

/// Error report from the signer
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct DeviceError {
    pub code: u32,
    pub message: String,
}

impl DeviceError {
    /// Build a device error from a known [ErrorCode]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code as u32,
            message: message.into(),
        }
    }

    /// Resolve the numeric code, `None` for codes this crate doesn't know
    pub fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::try_from(self.code).ok()
    }
}

impl core::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Host to signer requests
///
/// [Display] renders the variant name only, so requests carrying secrets
/// (revealed host nonces, entropy) are safe to log in that form.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, Display, IntoStaticStr)]
pub enum Request {
    /// Open a bitcoin signing session
    BtcSignInit(btc::SignInitRequest),
    BtcSignInput(btc::SignInputRequest),
    BtcSignOutput(btc::SignOutputRequest),
    BtcPrevTxInit(btc::PrevTxInitRequest),
    BtcPrevTxInput(btc::PrevTxInputRequest),
    BtcPrevTxOutput(btc::PrevTxOutputRequest),
    /// Reveal the host nonce for a bitcoin signature
    BtcAntiKleptoSignature {
        host_nonce: Vec<u8>,
    },
    BtcSignMessage(btc::SignMessageRequest),
    BtcRegisterScriptConfig(btc::RegisterScriptConfigRequest),
    BtcIsScriptConfigRegistered(btc::ScriptConfigRegistration),
    EthSign(eth::EthSignRequest),
    EthSignMessage(eth::EthSignMessageRequest),
    /// Reveal the host nonce for an ethereum signature
    EthAntiKleptoSignature {
        host_nonce: Vec<u8>,
    },
    /// Set up a new wallet from host and device entropy
    SetPassword {
        entropy: Vec<u8>,
    },
    CreateBackup {
        timestamp: u32,
        timezone_offset: i32,
    },
    RestoreBackup {
        id: String,
        timestamp: u32,
        timezone_offset: i32,
    },
    CheckBackup {
        silent: bool,
    },
}

/// Signer to host responses
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, Display, IntoStaticStr)]
pub enum Response {
    Success,
    Error(DeviceError),
    BtcSignNext(btc::SignNextResponse),
    /// Signer nonce commitment for single-shot signing
    AntiKleptoSignerCommitment {
        commitment: Vec<u8>,
    },
    /// 65-byte signature, compact signature followed by the recovery id
    BtcSignMessage {
        signature: Vec<u8>,
    },
    IsScriptConfigRegistered {
        is_registered: bool,
    },
    /// 65-byte signature, compact signature followed by the recovery id
    EthSign {
        signature: Vec<u8>,
    },
    CheckBackup {
        id: String,
    },
}
