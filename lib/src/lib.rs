// Copyright (c) 2022-2023 The MobileCoin Foundation

//! BitBox-style hardware wallet host library
//!
//! This drives the host side of signing sessions with a hardware signer over
//! any [Exchange] transport: streaming bitcoin transactions (and the
//! previous transactions they spend) across bounded request / response
//! rounds, single-shot message and ethereum signing, and anti-klepto
//! verification of every signature where the firmware supports it.
//!
//! ```no_run
//! # async fn demo<T: bitbox_hww::Exchange + Send + Sync>(t: T, tx: bitbox_hww::btc::BtcTransaction) -> Result<(), bitbox_hww::Error> {
//! use bitbox_hww::DeviceHandle;
//!
//! let d = DeviceHandle::from(t);
//! for (index, sig) in d.btc_sign(&tx).await? {
//!     println!("input {index}: {}", hex::encode(sig));
//! }
//! # Ok(())
//! # }
//! ```

/// Re-export `bitbox-hww-proto` for consumers
pub use bitbox_hww_proto::{self as proto, Exchange, Version};

pub mod antiklepto;

pub mod btc;

pub mod caps;
pub use caps::Feature;

mod config;
pub use config::Config;

mod error;
pub use error::Error;

pub mod eth;

mod handle;
pub use handle::{DeviceHandle, MAX_NAME_LEN};
