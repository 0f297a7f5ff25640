// Copyright (c) 2022-2023 The MobileCoin Foundation

//! In-process [Exchange] transport backed by an [Engine]

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

use bitbox_hww_proto::{DeviceError, Exchange, Request, Response, Version};

use crate::engine::{Driver, Engine};

/// Firmware version reported by default
pub const SIM_VERSION: Version = Version::new(9, 16, 0);

/// Simulated transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Channel closed by a configured disconnect
    #[error("device disconnected")]
    Disconnected,

    /// Message encoding failed
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_cbor::Error),
}

/// Transport exchanging CBOR encoded messages with an in-process [Engine].
///
/// Clones share the engine and the request log, so tests can keep a clone
/// to inspect the signer while a host handle owns the other.
pub struct SimTransport<DRV: Driver> {
    engine: Arc<Mutex<Engine<DRV>>>,
    requests: Arc<Mutex<Vec<Request>>>,
    version: Version,
    disconnect_after: Option<usize>,
    delay: Option<Duration>,
}

impl<DRV: Driver> Clone for SimTransport<DRV> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            requests: self.requests.clone(),
            version: self.version,
            disconnect_after: self.disconnect_after,
            delay: self.delay,
        }
    }
}

impl<DRV: Driver> SimTransport<DRV> {
    /// Create a transport reporting [SIM_VERSION]
    pub fn new(engine: Engine<DRV>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            requests: Arc::new(Mutex::new(Vec::new())),
            version: SIM_VERSION,
            disconnect_after: None,
            delay: None,
        }
    }

    /// Report a different firmware version
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Fail every exchange after `n` requests have been delivered
    pub fn disconnect_after(mut self, n: usize) -> Self {
        self.disconnect_after = Some(n);
        self
    }

    /// Delay each response, simulating a slow link or a waiting user
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Lock the engine for inspection
    pub async fn engine(&self) -> MutexGuard<'_, Engine<DRV>> {
        self.engine.lock().await
    }

    /// Requests delivered to the engine, in order
    pub async fn requests(&self) -> Vec<Request> {
        self.requests.lock().await.clone()
    }
}

/// Encode and decode a message as it would cross the wire
fn wire<T: serde::Serialize + serde::de::DeserializeOwned>(v: &T) -> Result<T, TransportError> {
    let buff = serde_cbor::to_vec(v)?;
    Ok(serde_cbor::from_slice(&buff)?)
}

#[async_trait]
impl<DRV: Driver + Send> Exchange for SimTransport<DRV> {
    type Error = TransportError;

    async fn exchange(&self, req: &Request) -> Result<Response, Self::Error> {
        {
            let mut requests = self.requests.lock().await;
            if let Some(n) = self.disconnect_after {
                if requests.len() >= n {
                    log::debug!("Disconnecting after {} requests", n);
                    return Err(TransportError::Disconnected);
                }
            }
            requests.push(req.clone());
        }

        let req = wire(req)?;

        let resp = {
            let mut e = self.engine.lock().await;
            match e.update(&req) {
                Ok(r) => r,
                Err(e) => Response::Error(DeviceError::new(e.code(), e.to_string())),
            }
        };

        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }

        wire(&resp)
    }

    fn version(&self) -> Version {
        self.version
    }
}
