// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Scriptable [Driver] for tests and host development

use std::collections::HashSet;

use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha2::{Digest as _, Sha256};

use crate::engine::{Confirm, ConfirmKind, Driver};

/// Default seed for test drivers
pub const TEST_SEED: [u8; 32] = [
    0x5e, 0x0b, 0x7d, 0x2a, 0x91, 0xc4, 0x3f, 0x68, 0xd1, 0x22, 0x8a, 0x4e, 0xb7, 0x06, 0xf9, 0x13,
    0x6c, 0xa5, 0x30, 0xe8, 0x47, 0x9b, 0x1d, 0x82, 0xfe, 0x55, 0x0c, 0xc3, 0x76, 0x2f, 0xb9, 0x14,
];

/// Driver deriving keys from a fixed seed and answering confirmations
/// from a configurable decline list
pub struct TestDriver {
    seed: [u8; 32],
    decline: HashSet<ConfirmKind>,
    name: String,
    confirmations: Vec<Confirm>,
}

impl Default for TestDriver {
    fn default() -> Self {
        Self::new(TEST_SEED)
    }
}

impl TestDriver {
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            seed,
            decline: HashSet::new(),
            name: "account".to_string(),
            confirmations: Vec::new(),
        }
    }

    /// Decline confirmations of the provided kind
    pub fn decline(mut self, kind: ConfirmKind) -> Self {
        self.decline.insert(kind);
        self
    }

    /// Update whether confirmations of the provided kind are declined
    pub fn set_decline(&mut self, kind: ConfirmKind, decline: bool) {
        match decline {
            true => self.decline.insert(kind),
            false => self.decline.remove(&kind),
        };
    }

    /// Set the name entered when the host leaves a registration name empty
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Confirmations shown to the user, accepted or not
    pub fn confirmations(&self) -> &[Confirm] {
        &self.confirmations
    }

    /// Public key for a keypath, for checking signatures
    pub fn public_key(&self, keypath: &[u32]) -> Result<PublicKey, secp256k1::Error> {
        let secp = Secp256k1::signing_only();
        let sk = SecretKey::from_slice(&self.derive_secp256k1(keypath))?;

        Ok(PublicKey::from_secret_key(&secp, &sk))
    }
}

impl Driver for TestDriver {
    fn derive_secp256k1(&self, keypath: &[u32]) -> [u8; 32] {
        keypath
            .iter()
            .fold(Sha256::new().chain_update(self.seed), |d, p| {
                d.chain_update(p.to_be_bytes())
            })
            .finalize()
            .into()
    }

    fn confirm(&mut self, c: &Confirm) -> bool {
        let kind = ConfirmKind::from(c);
        let accept = !self.decline.contains(&kind);

        log::debug!("Confirm {}: {}", kind, accept);

        self.confirmations.push(c.clone());

        accept
    }

    fn enter_name(&mut self) -> String {
        self.name.clone()
    }
}
