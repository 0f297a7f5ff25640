// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Handle for connected signing devices
//!
//! This provides methods for interacting with the device
//! and is generic over [Exchange] transports

use std::{sync::Arc, time::Duration};

use chrono::Local;
use log::{debug, trace, warn};
use rand_core::{OsRng, RngCore};
use tokio::sync::{Mutex, MutexGuard};

use bitbox_hww_proto::{
    btc::{
        BtcCoin, RegisterScriptConfigRequest, ScriptConfig, ScriptConfigRegistration,
        SignNextResponse, XPubType,
    },
    ErrorCode, Exchange, Request, Response, Version,
};

use crate::{
    antiklepto::scrub,
    caps::{supports, Feature},
    Config, Error,
};

/// Maximum length of a script config registration name
pub const MAX_NAME_LEN: usize = 30;

/// Handle for a connected signer.
///
/// This is generic over [Exchange] types to support different
/// underlying transports. The transport is held exclusively for the
/// duration of each operation, so concurrent calls on clones of one
/// handle are serialised.
pub struct DeviceHandle<T: Exchange> {
    /// Transport for communication
    t: Arc<Mutex<T>>,
    /// Firmware version, read once at creation
    version: Version,
    /// Timeouts
    config: Config,
}

impl<T: Exchange> Clone for DeviceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            t: self.t.clone(),
            version: self.version,
            config: self.config.clone(),
        }
    }
}

/// Create a [DeviceHandle] wrapper from a type implementing [Exchange]
impl<T: Exchange> From<T> for DeviceHandle<T> {
    fn from(t: T) -> Self {
        Self::with_config(t, Config::default())
    }
}

/// Exclusive use of the transport for one operation
pub(crate) struct Session<'a, T: Exchange> {
    t: MutexGuard<'a, T>,
    config: &'a Config,
}

impl<'a, T: Exchange + Send + Sync> Session<'a, T> {
    /// Issue a request answered without user interaction
    pub(crate) async fn request(&self, req: &Request) -> Result<Response, Error> {
        exchange(&*self.t, req, self.config.request_timeout()).await
    }

    /// Issue a request that may wait on user confirmation
    pub(crate) async fn interactive(&self, req: &Request) -> Result<Response, Error> {
        exchange(&*self.t, req, self.config.user_timeout()).await
    }
}

/// Helper for executing requests with the device, mapping transport errors,
/// timeouts and signer error reports into [Error]
pub(crate) async fn exchange<T: Exchange + Send + Sync>(
    t: &T,
    req: &Request,
    timeout: Duration,
) -> Result<Response, Error> {
    trace!("Request: {}", req);

    let resp = match tokio::time::timeout(timeout, t.exchange(req)).await {
        Ok(Ok(v)) => v,
        Ok(Err(e)) => return Err(Error::Transport(anyhow::Error::new(e))),
        Err(_e) => return Err(Error::RequestTimeout),
    };

    trace!("Response: {}", resp);

    match resp {
        Response::Error(e) => {
            debug!("Device error: {}", e);
            Err(e.into())
        }
        r => Ok(r),
    }
}

/// Unwrap a [Response::BtcSignNext]
pub(crate) fn sign_next(resp: Response) -> Result<SignNextResponse, Error> {
    match resp {
        Response::BtcSignNext(r) => Ok(r),
        r => Err(Error::UnexpectedResponse {
            expected: "BtcSignNext",
            actual: (&r).into(),
        }),
    }
}

/// Require a [Response::Success]
fn success(resp: Response) -> Result<(), Error> {
    match resp {
        Response::Success => Ok(()),
        r => Err(Error::UnexpectedResponse {
            expected: "Success",
            actual: (&r).into(),
        }),
    }
}

/// Convert the generic device error into a negative result
fn declined_as_false(r: Result<(), Error>) -> Result<bool, Error> {
    match r {
        Ok(()) => Ok(true),
        Err(e) if e.is_generic() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Current unix time and local UTC offset (seconds) for backup requests
fn timestamp() -> Result<(u32, i32), Error> {
    let now = Local::now();

    let ts = u32::try_from(now.timestamp())
        .map_err(|_| Error::InvalidArgument(format!("timestamp {} out of range", now)))?;

    Ok((ts, now.offset().local_minus_utc()))
}

impl<T: Exchange> DeviceHandle<T> {
    /// Create a handle with explicit [Config]
    pub fn with_config(t: T, config: Config) -> Self {
        let version = t.version();

        debug!("Connected to signer firmware {}", version);

        Self {
            t: Arc::new(Mutex::new(t)),
            version,
            config,
        }
    }

    /// Firmware version negotiated by the transport
    pub fn version(&self) -> Version {
        self.version
    }

    /// Handle configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check whether the connected firmware supports a [Feature]
    pub fn supports(&self, feature: Feature) -> bool {
        supports(feature, &self.version)
    }

    /// Fail with [Error::Unsupported] when a required [Feature] is missing
    pub(crate) fn require(&self, feature: Feature) -> Result<(), Error> {
        match self.supports(feature) {
            true => Ok(()),
            false => Err(Error::Unsupported {
                feature,
                required: feature.min_version(),
                actual: self.version,
            }),
        }
    }

    /// Check for an optional anti-klepto [Feature], older firmware signs
    /// without nonce commitments
    pub(crate) fn anti_klepto(&self, feature: Feature) -> bool {
        let v = self.supports(feature);
        if !v {
            warn!(
                "Firmware {} predates {} ({}), signing without nonce commitment",
                self.version,
                feature,
                feature.min_version()
            );
        }
        v
    }
}

impl<T: Exchange + Send + Sync> DeviceHandle<T> {
    /// Take exclusive use of the transport
    pub(crate) async fn session(&self) -> Session<'_, T> {
        Session {
            t: self.t.lock().await,
            config: &self.config,
        }
    }

    /// Register a (multisig) script configuration under `name`.
    ///
    /// An empty `name` prompts for one on the device.
    pub async fn register_script_config(
        &self,
        coin: BtcCoin,
        script_config: ScriptConfig,
        keypath: &[u32],
        name: &str,
        xpub_type: XPubType,
    ) -> Result<(), Error> {
        if name.is_empty() {
            self.require(Feature::RegisterNamePrompt)?;
        }

        if name.chars().count() > MAX_NAME_LEN {
            return Err(Error::InvalidArgument(format!(
                "name exceeds {MAX_NAME_LEN} characters"
            )));
        }

        debug!("Registering {} script config '{}'", coin, name);

        let req = Request::BtcRegisterScriptConfig(RegisterScriptConfigRequest {
            registration: ScriptConfigRegistration {
                coin,
                script_config,
                keypath: keypath.to_vec(),
            },
            name: name.to_string(),
            xpub_type,
        });

        let s = self.session().await;
        match s.interactive(&req).await {
            Ok(r) => success(r),
            Err(Error::Device { code, .. }) if code == ErrorCode::Duplicate as u32 => {
                Err(Error::DuplicateRegistration)
            }
            Err(e) => Err(e),
        }
    }

    /// Check whether a script configuration is already registered
    pub async fn is_script_config_registered(
        &self,
        coin: BtcCoin,
        script_config: ScriptConfig,
        keypath: &[u32],
    ) -> Result<bool, Error> {
        let req = Request::BtcIsScriptConfigRegistered(ScriptConfigRegistration {
            coin,
            script_config,
            keypath: keypath.to_vec(),
        });

        let s = self.session().await;
        match s.request(&req).await? {
            Response::IsScriptConfigRegistered { is_registered } => Ok(is_registered),
            r => Err(Error::UnexpectedResponse {
                expected: "IsScriptConfigRegistered",
                actual: (&r).into(),
            }),
        }
    }

    /// Set up a new wallet, contributing `entropy_size` bytes (16 or 32) of
    /// host entropy. Returns `false` if the device declined.
    pub async fn set_password(&self, entropy_size: usize) -> Result<bool, Error> {
        match entropy_size {
            32 => (),
            16 => self.require(Feature::ReducedEntropy)?,
            n => {
                return Err(Error::InvalidArgument(format!(
                    "entropy size must be 16 or 32 bytes, got {n}"
                )))
            }
        }

        let mut entropy = vec![0u8; entropy_size];
        OsRng.fill_bytes(&mut entropy);

        let mut req = Request::SetPassword { entropy };

        let s = self.session().await;
        let r = s.interactive(&req).await;
        scrub(&mut req);

        declined_as_false(r.and_then(success))
    }

    /// Create a backup. Returns `false` if the device declined.
    pub async fn create_backup(&self) -> Result<bool, Error> {
        let (timestamp, timezone_offset) = timestamp()?;
        let req = Request::CreateBackup {
            timestamp,
            timezone_offset,
        };

        let s = self.session().await;
        declined_as_false(s.interactive(&req).await.and_then(success))
    }

    /// Restore the backup with `id`. Returns `false` if the device declined.
    pub async fn restore_backup(&self, id: &str) -> Result<bool, Error> {
        let (timestamp, timezone_offset) = timestamp()?;
        let req = Request::RestoreBackup {
            id: id.to_string(),
            timestamp,
            timezone_offset,
        };

        let s = self.session().await;
        declined_as_false(s.interactive(&req).await.and_then(success))
    }

    /// Check the device backup, returning its id if one was found
    pub async fn check_backup(&self, silent: bool) -> Result<Option<String>, Error> {
        let req = Request::CheckBackup { silent };

        let s = self.session().await;
        match s.interactive(&req).await {
            Ok(Response::CheckBackup { id }) => Ok(Some(id)),
            Ok(r) => Err(Error::UnexpectedResponse {
                expected: "CheckBackup",
                actual: (&r).into(),
            }),
            Err(e) if e.is_generic() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
