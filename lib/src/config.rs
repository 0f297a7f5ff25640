// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Device handle configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// [DeviceHandle](crate::DeviceHandle) configuration, loadable from any
/// serde format (TOML in practice)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timeout for requests answered without user interaction
    /// (previous transaction streaming, nonce reveal)
    pub request_timeout_s: u64,

    /// Timeout for requests that may wait on user confirmation
    pub user_timeout_s: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout_s: 10,
            user_timeout_s: 120,
        }
    }
}

impl Config {
    /// Fetch request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_s)
    }

    /// Fetch user interaction timeout
    pub fn user_timeout(&self) -> Duration {
        Duration::from_secs(self.user_timeout_s)
    }
}
