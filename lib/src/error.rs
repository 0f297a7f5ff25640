// Copyright (c) 2022-2023 The MobileCoin Foundation

use bitbox_hww_proto::{DeviceError, ErrorCode, Version};
use tokio::time::error::Elapsed;

use crate::{antiklepto::AntiKleptoError, caps::Feature};

/// Hardware wallet API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Channel error from the underlying transport
    #[error("Transport error {0}")]
    Transport(anyhow::Error),

    /// Request timeout
    #[error("Timeout waiting for device response")]
    RequestTimeout,

    /// User rejected the operation on the device
    #[error("Operation rejected by user")]
    UserAbort,

    /// Response of the wrong kind for the current step
    #[error("Unexpected response (expected: {expected}, actual: {actual})")]
    UnexpectedResponse {
        expected: &'static str,
        actual: &'static str,
    },

    /// Signer request or response inconsistent with the session
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Signature failed anti-klepto nonce verification
    #[error("Nonce verification failed: {0}")]
    NonceVerification(#[from] AntiKleptoError),

    /// Script config registration with this name already exists
    #[error("A script config with this name is already registered")]
    DuplicateRegistration,

    /// Other signer error report
    #[error("Device error: {message} ({code})")]
    Device { code: u32, message: String },

    /// Operation needs a newer firmware
    #[error("{feature} requires firmware {required} (device: {actual})")]
    Unsupported {
        feature: Feature,
        required: Version,
        actual: Version,
    },

    /// Caller-side precondition failed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Helper to build [Error::ProtocolViolation] errors
    pub(crate) fn violation(msg: impl Into<String>) -> Self {
        Error::ProtocolViolation(msg.into())
    }

    /// Generic (declined / failed) device error, converted to a negative
    /// result by some one-shot operations
    pub fn is_generic(&self) -> bool {
        matches!(self, Error::Device { code, .. } if *code == ErrorCode::Generic as u32)
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::RequestTimeout
    }
}

/// Map signer error reports, user aborts are distinguished from other failures
impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        match e.kind() {
            Some(ErrorCode::UserAbort) => Error::UserAbort,
            _ => Error::Device {
                code: e.code,
                message: e.message,
            },
        }
    }
}
