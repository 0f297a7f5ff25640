// Copyright (c) 2022-2023 The MobileCoin Foundation

//! The [Engine] models the signer side of every host exchange.
//!
//! This handles [Request] inputs and returns [Response]s to the caller,
//! see [bitbox_hww_proto] for message definitions. Errors are reported to
//! the host as [Response::Error] with the matching [ErrorCode][bitbox_hww_proto::ErrorCode].

use rand_core::{CryptoRngCore, OsRng};
use secp256k1::{All, Secp256k1, SecretKey};
use sha2::{Digest as _, Sha256};
use strum::{Display, EnumDiscriminants};
use zeroize::Zeroize;

use bitbox_hww_proto::{
    btc::{BtcCoin, ScriptConfigRegistration, HARDENED},
    eth::EthCoin,
    Request, Response,
};

mod antiklepto;

mod btc;
pub use btc::Phase;

pub mod digest;

pub mod ecdsa;

mod error;
pub use error::Error;

mod eth;

mod function;
use function::Function;

/// Maximum message length for message signing
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Maximum length of a script config registration name
pub const MAX_NAME_LEN: usize = 30;

/// Engine internal state enumeration
#[derive(Copy, Clone, PartialEq, Debug, Display)]
pub enum State {
    /// Idle state, no operation running
    Init,
    /// Bitcoin transaction signing session
    BtcSign(Phase),
    /// Single-shot signature awaiting the host nonce
    AntiKlepto,
}

/// Operations requiring user confirmation on the device
#[derive(Clone, PartialEq, Debug, EnumDiscriminants)]
#[strum_discriminants(name(ConfirmKind), derive(Hash, Display))]
pub enum Confirm {
    /// Bitcoin transaction summary, shown before the first signature
    Transaction {
        coin: BtcCoin,
        num_inputs: u32,
        num_outputs: u32,
        total_out: u64,
        fee: u64,
    },
    BtcMessage {
        coin: BtcCoin,
        msg: Vec<u8>,
    },
    EthTransaction {
        coin: EthCoin,
        recipient: Vec<u8>,
        value: Vec<u8>,
    },
    EthMessage {
        coin: EthCoin,
        msg: Vec<u8>,
    },
    /// Script config registration under `name`
    Register {
        coin: BtcCoin,
        name: String,
    },
    SetPassword,
    CreateBackup,
    RestoreBackup {
        id: String,
    },
}

/// [`Driver`] trait provides platform support for [`Engine`] instances
pub trait Driver {
    /// Derive secp256k1 private key bytes for a keypath
    fn derive_secp256k1(&self, keypath: &[u32]) -> [u8; 32];

    /// Ask the user to confirm an operation
    fn confirm(&mut self, c: &Confirm) -> bool;

    /// Ask the user to enter an account name
    fn enter_name(&mut self) -> String;
}

impl<T: Driver> Driver for &mut T {
    fn derive_secp256k1(&self, keypath: &[u32]) -> [u8; 32] {
        T::derive_secp256k1(self, keypath)
    }

    fn confirm(&mut self, c: &Confirm) -> bool {
        T::confirm(self, c)
    }

    fn enter_name(&mut self) -> String {
        T::enter_name(self)
    }
}

/// Misbehaviour injected into the engine for testing host checks
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Faults {
    /// Sign with a nonce of the engine's choosing instead of the
    /// committed sign-to-contract nonce
    pub grind_nonce: bool,
}

/// [Engine] provides hardware-independent support for signer operations
pub struct Engine<DRV: Driver, RNG: CryptoRngCore = OsRng> {
    state: State,
    seeded: bool,

    registrations: Vec<(ScriptConfigRegistration, String)>,
    backups: Vec<String>,

    function: Function,
    faults: Faults,

    secp: Secp256k1<All>,
    drv: DRV,
    rng: RNG,
}

impl<DRV: Driver> Engine<DRV> {
    /// Create a new seeded engine instance with the provided driver,
    /// using the default [OsRng]
    pub fn new(drv: DRV) -> Self {
        Self::new_with_rng(drv, OsRng {})
    }
}

impl<DRV: Driver, RNG: CryptoRngCore> Engine<DRV, RNG> {
    /// Create a new seeded engine instance with the provided driver and rng
    pub fn new_with_rng(drv: DRV, rng: RNG) -> Self {
        Self {
            state: State::Init,
            seeded: true,
            registrations: Vec::new(),
            backups: Vec::new(),
            function: Function::new(),
            faults: Faults::default(),
            secp: Secp256k1::new(),
            drv,
            rng,
        }
    }

    /// Start without a seed, as a factory-new device
    pub fn uninitialised(mut self) -> Self {
        self.seeded = false;
        self
    }

    /// Set injected faults
    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.faults = faults;
        self
    }

    /// Access injected faults
    pub fn faults_mut(&mut self) -> &mut Faults {
        &mut self.faults
    }

    /// Fetch current engine state
    pub fn state(&self) -> State {
        self.state
    }

    /// Whether the device holds a seed
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn driver(&self) -> &DRV {
        &self.drv
    }

    pub fn driver_mut(&mut self) -> &mut DRV {
        &mut self.drv
    }

    /// Handle incoming requests.
    ///
    /// Any error aborts the running operation and returns the engine to
    /// [State::Init].
    pub fn update(&mut self, req: &Request) -> Result<Response, Error> {
        log::debug!("request: {} (state: {})", req, self.state);

        let r = self.handle(req);

        if let Err(e) = &r {
            log::warn!("{} failed in state {}: {}", req, self.state, e);

            self.function.clear();
            self.state = State::Init;
        }

        r
    }

    fn handle(&mut self, req: &Request) -> Result<Response, Error> {
        match (self.state, req) {
            // (Re)start transaction signing, aborting any running operation
            (_, Request::BtcSignInit(r)) => self.btc_sign_init(r),

            // Transaction signing steps
            (
                State::BtcSign(_),
                Request::BtcSignInput(_)
                | Request::BtcSignOutput(_)
                | Request::BtcPrevTxInit(_)
                | Request::BtcPrevTxInput(_)
                | Request::BtcPrevTxOutput(_)
                | Request::BtcAntiKleptoSignature { .. },
            ) => self.btc_sign_update(req),

            // Host nonce reveal for single-shot signatures
            (
                State::AntiKlepto,
                Request::BtcAntiKleptoSignature { host_nonce }
                | Request::EthAntiKleptoSignature { host_nonce },
            ) => self.anti_klepto_reveal(req, host_nonce),

            (State::Init, Request::BtcSignMessage(r)) => self.btc_sign_message(r),
            (State::Init, Request::EthSign(r)) => self.eth_sign(r),
            (State::Init, Request::EthSignMessage(r)) => self.eth_sign_message(r),

            (State::Init, Request::BtcRegisterScriptConfig(r)) => {
                if r.name.chars().count() > MAX_NAME_LEN {
                    return Err(Error::InvalidInput);
                }
                self.check_btc_keypath(r.registration.coin, &r.registration.keypath)?;

                let name = match r.name.is_empty() {
                    true => self.drv.enter_name(),
                    false => r.name.clone(),
                };

                if self.registrations.iter().any(|(_, n)| n == &name) {
                    return Err(Error::Duplicate);
                }

                self.confirm(&Confirm::Register {
                    coin: r.registration.coin,
                    name: name.clone(),
                })?;

                self.registrations
                    .retain(|(reg, _)| reg != &r.registration);
                self.registrations.push((r.registration.clone(), name));

                Ok(Response::Success)
            }

            (State::Init, Request::BtcIsScriptConfigRegistered(r)) => {
                let is_registered = self.registrations.iter().any(|(reg, _)| reg == r);
                Ok(Response::IsScriptConfigRegistered { is_registered })
            }

            (State::Init, Request::SetPassword { entropy }) => {
                if self.seeded {
                    return Err(Error::UnexpectedRequest);
                }
                if entropy.len() != 16 && entropy.len() != 32 {
                    return Err(Error::InvalidLength);
                }
                if !self.drv.confirm(&Confirm::SetPassword) {
                    return Err(Error::Declined);
                }

                self.seeded = true;

                Ok(Response::Success)
            }

            (State::Init, Request::CreateBackup { .. }) => {
                if !self.seeded {
                    return Err(Error::Uninitialised);
                }
                if !self.drv.confirm(&Confirm::CreateBackup) {
                    return Err(Error::Declined);
                }

                let id = self.backup_id();
                if !self.backups.contains(&id) {
                    self.backups.push(id);
                }

                Ok(Response::Success)
            }

            (State::Init, Request::RestoreBackup { id, .. }) => {
                if !self.backups.contains(id) {
                    return Err(Error::Declined);
                }
                if !self.drv.confirm(&Confirm::RestoreBackup { id: id.clone() }) {
                    return Err(Error::Declined);
                }

                self.seeded = true;

                Ok(Response::Success)
            }

            (State::Init, Request::CheckBackup { .. }) => {
                if !self.seeded {
                    return Err(Error::Uninitialised);
                }

                let id = self.backup_id();
                match self.backups.contains(&id) {
                    true => Ok(Response::CheckBackup { id }),
                    false => Err(Error::Declined),
                }
            }

            // Handle unexpected requests
            (_s, _r) => {
                log::error!("Unexpected request in state {}: {}", _s, _r);
                Err(Error::UnexpectedRequest)
            }
        }
    }

    /// Request user confirmation, mapping rejection to [Error::UserAbort]
    fn confirm(&mut self, c: &Confirm) -> Result<(), Error> {
        match self.drv.confirm(c) {
            true => Ok(()),
            false => Err(Error::UserAbort),
        }
    }

    /// Derive the signing key for a keypath
    fn key(&self, keypath: &[u32]) -> Result<SecretKey, Error> {
        if !self.seeded {
            return Err(Error::Uninitialised);
        }

        let mut b = self.drv.derive_secp256k1(keypath);
        let k = SecretKey::from_slice(&b).map_err(|_| Error::SignFailed);
        b.zeroize();

        k
    }

    /// Check a bitcoin keypath starts with `purpose' / coin' / account'`
    /// for the session coin
    fn check_btc_keypath(&self, coin: BtcCoin, keypath: &[u32]) -> Result<(), Error> {
        if keypath.len() < 3 || keypath[..3].iter().any(|p| p & HARDENED == 0) {
            return Err(Error::InvalidKeypath);
        }
        if keypath[1] != coin.params().bip44_coin {
            return Err(Error::InvalidKeypath);
        }
        Ok(())
    }

    /// Identifier for backups of the current seed
    fn backup_id(&self) -> String {
        let mut root = self.drv.derive_secp256k1(&[]);
        let h = Sha256::new()
            .chain_update("backup")
            .chain_update(root)
            .finalize();
        root.zeroize();

        h[..8].iter().map(|b| format!("{b:02x}")).collect()
    }
}
