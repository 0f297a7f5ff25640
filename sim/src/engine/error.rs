// Copyright (c) 2022-2023 The MobileCoin Foundation

use bitbox_hww_proto::ErrorCode;

/// [Engine][super::Engine] errors
#[derive(Copy, Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[repr(u8)]
pub enum Error {
    /// Malformed request field
    #[error("invalid input")]
    InvalidInput = 0x00,

    /// Invalid argument length
    #[error("invalid argument length")]
    InvalidLength = 0x01,

    /// Keypath does not match coin / account
    #[error("invalid keypath")]
    InvalidKeypath = 0x02,

    /// Request not expected in the current state
    #[error("unexpected request")]
    UnexpectedRequest = 0x03,

    /// Index or count outside the declared bounds
    #[error("index out of range")]
    OutOfRange = 0x04,

    /// Previous transaction output does not match the declared input value
    #[error("previous output value mismatch")]
    ValueMismatch = 0x05,

    /// Pass-2 input differs from its pass-1 copy
    #[error("input changed between passes")]
    InputMismatch = 0x06,

    /// Revealed host nonce does not match its commitment
    #[error("host nonce does not match commitment")]
    NonceMismatch = 0x07,

    /// Signing error
    #[error("signing error")]
    SignFailed = 0x08,

    /// User rejected the operation
    #[error("operation rejected by user")]
    UserAbort = 0x09,

    /// Operation declined or failed without a specific reason
    #[error("operation failed")]
    Declined = 0x0a,

    /// Entry already exists
    #[error("duplicate entry")]
    Duplicate = 0x0b,

    /// Device has no seed
    #[error("device not initialised")]
    Uninitialised = 0x0c,
}

impl Error {
    /// Error code reported to the host
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::InvalidInput
            | Error::InvalidLength
            | Error::InvalidKeypath
            | Error::OutOfRange
            | Error::ValueMismatch
            | Error::InputMismatch
            | Error::NonceMismatch => ErrorCode::InvalidInput,
            Error::UnexpectedRequest => ErrorCode::InvalidState,
            Error::SignFailed | Error::Declined | Error::Uninitialised => ErrorCode::Generic,
            Error::UserAbort => ErrorCode::UserAbort,
            Error::Duplicate => ErrorCode::Duplicate,
        }
    }
}
