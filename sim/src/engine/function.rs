// Copyright (c) 2022-2023 The MobileCoin Foundation

use secp256k1::SecretKey;

use super::btc::BtcSession;

/// Function context for operations spanning multiple requests
pub struct Function {
    inner: FunctionType,
}

impl Default for Function {
    fn default() -> Self {
        Self::new()
    }
}

/// Enum for internal state machines, at most one operation is active
#[allow(clippy::large_enum_variant)]
enum FunctionType {
    None,
    BtcSign(BtcSession),
    AntiKlepto(PendingSign),
}

impl Function {
    /// Create a new / empty function context
    pub const fn new() -> Self {
        Self {
            inner: FunctionType::None,
        }
    }

    /// Drop any active context
    pub fn clear(&mut self) {
        self.inner = FunctionType::None;
    }

    /// Store a transaction signing session
    pub fn btc_sign_resume(&mut self, s: BtcSession) {
        self.inner = FunctionType::BtcSign(s);
    }

    /// Take the active transaction signing session, if any
    pub fn btc_sign_take(&mut self) -> Option<BtcSession> {
        match core::mem::replace(&mut self.inner, FunctionType::None) {
            FunctionType::BtcSign(s) => Some(s),
            other => {
                self.inner = other;
                None
            }
        }
    }

    /// Store a single-shot signature awaiting the host nonce
    pub fn anti_klepto_init(&mut self, p: PendingSign) {
        self.inner = FunctionType::AntiKlepto(p);
    }

    /// Take the pending single-shot signature, if any
    pub fn anti_klepto_take(&mut self) -> Option<PendingSign> {
        match core::mem::replace(&mut self.inner, FunctionType::None) {
            FunctionType::AntiKlepto(p) => Some(p),
            other => {
                self.inner = other;
                None
            }
        }
    }
}

/// Response shape for single-shot signatures
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum SignKind {
    BtcMessage,
    Eth,
}

/// Signature held back until the host reveals its nonce
pub struct PendingSign {
    pub kind: SignKind,
    pub key: SecretKey,
    pub digest: [u8; 32],
    /// Signer nonce, `R1 = k1·G` has been sent as the commitment
    pub k1: SecretKey,
    pub host_commitment: [u8; 32],
}

impl Drop for PendingSign {
    fn drop(&mut self) {
        self.key.non_secure_erase();
        self.k1.non_secure_erase();
    }
}
