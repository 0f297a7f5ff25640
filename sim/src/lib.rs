// Copyright (c) 2022-2023 The MobileCoin Foundation

//! BitBox-style hardware signer simulator
//!
//! This provides an [Engine][engine::Engine] implementing the signer side of
//! the `bitbox-hww-proto` exchanges, for exercising host libraries without
//! hardware.
//!
//! Interactions with the engine are performed via
//! [Request][bitbox_hww_proto::Request]s and
//! [Response][bitbox_hww_proto::Response]s, platform support (key derivation,
//! user confirmation) is provided by a [Driver][engine::Driver].
//!
//! ## Operations
//!
//! ### Transaction signing
//!
//! A session opens with `BtcSignInit`, after which the engine names each
//! item it needs in a `BtcSignNext` response:
//!
//! 1. Each input in order (pass 1), followed for non-taproot inputs by the
//!    previous transaction header, inputs and outputs so the input value
//!    can be checked
//! 2. Each output in order
//! 3. Each input again (pass 2), the user confirms the transaction on the
//!    first of these and each reply carries the signature for that input
//!
//! When a pass-2 input carries a host nonce commitment the engine answers
//! with a `HostNonce` request containing its nonce commitment and releases
//! the signature only once the host nonce is revealed.
//!
//! ### Single-shot signing
//!
//! Message and ethereum signatures are returned directly, or after a host
//! nonce reveal when the request carries a commitment.
//!
//! Any error aborts the running operation.

pub mod engine;

mod driver;
pub use driver::{TestDriver, TEST_SEED};

mod transport;
pub use transport::{SimTransport, TransportError, SIM_VERSION};

pub use engine::{Confirm, ConfirmKind, Engine, Faults};
