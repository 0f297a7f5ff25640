// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Bitcoin transaction and message signing
//!
//! Sessions follow the firmware order. Each pass-1 input is followed by
//! the previous transaction it spends (skipped for taproot inputs), then
//! all outputs, then pass 2 where each input is requested again and signed.

use rand_core::CryptoRngCore;
use secp256k1::SecretKey;
use strum::Display;

use bitbox_hww_proto::{
    btc::{
        OutputType, PrevTxInitRequest, ScriptConfig, SignInitRequest, SignInputRequest,
        SignMessageRequest, SignNextResponse, SignOutputRequest, SimpleType,
    },
    state::NextType,
    Request, Response,
};

use super::{
    digest::{digest_btc_message, digest_sign_init, digest_sign_input, digest_sign_output, TxDigest},
    ecdsa::{nonce_commitment, random_nonce, sign_with_nonce},
    function::SignKind,
    Confirm, Driver, Engine, Error, State, MAX_MESSAGE_LEN,
};

/// Transaction signing phase, naming the item the signer expects next
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
pub enum Phase {
    /// Pass-1 input
    Inputs1(u32),
    PrevTxInit(u32),
    /// Previous transaction input `(input, prev_index)`
    PrevTxInput(u32, u32),
    /// Previous transaction output `(input, prev_index)`
    PrevTxOutput(u32, u32),
    Outputs(u32),
    /// Pass-2 input
    Inputs2(u32),
    /// Pass-2 input awaiting the host nonce reveal
    HostNonce(u32),
    Done,
}

/// Pass-2 signature held back until the host reveals its nonce
struct PendingInput {
    key: SecretKey,
    sighash: [u8; 32],
    k1: SecretKey,
    signer_commitment: [u8; 33],
    host_commitment: [u8; 32],
}

impl Drop for PendingInput {
    fn drop(&mut self) {
        self.key.non_secure_erase();
        self.k1.non_secure_erase();
    }
}

/// Transaction signing session context
pub struct BtcSession {
    init: SignInitRequest,
    phase: Phase,
    digest: TxDigest,

    /// Pass-1 inputs, compared against their pass-2 copies
    inputs: Vec<SignInputRequest>,
    input_total: u64,
    output_total: u64,

    prevtx: Option<PrevTxInitRequest>,
    pending: Option<PendingInput>,
    confirmed: bool,
}

impl BtcSession {
    /// Phase following pass-1 input `i` and its previous transaction
    fn after_input(&self, i: u32) -> Phase {
        match i + 1 < self.init.num_inputs {
            true => Phase::Inputs1(i + 1),
            false => Phase::Outputs(0),
        }
    }

    /// Phase following the signature for input `i`
    fn after_sign(&self, i: u32) -> Phase {
        match i + 1 < self.init.num_inputs {
            true => Phase::Inputs2(i + 1),
            false => Phase::Done,
        }
    }

    fn prevtx(&self) -> Result<&PrevTxInitRequest, Error> {
        self.prevtx.as_ref().ok_or(Error::UnexpectedRequest)
    }

    fn input(&self, i: u32) -> Result<&SignInputRequest, Error> {
        self.inputs.get(i as usize).ok_or(Error::OutOfRange)
    }
}

impl<DRV: Driver, RNG: CryptoRngCore> Engine<DRV, RNG> {
    /// Start a transaction signing session
    pub(crate) fn btc_sign_init(&mut self, r: &SignInitRequest) -> Result<Response, Error> {
        // Init always restarts
        self.function.clear();
        self.state = State::Init;

        if !matches!(r.version, 1 | 2) {
            return Err(Error::InvalidInput);
        }
        if r.num_inputs == 0 || r.num_outputs == 0 || r.script_configs.is_empty() {
            return Err(Error::InvalidInput);
        }
        for c in &r.script_configs {
            self.check_btc_keypath(r.coin, &c.keypath)?;
        }

        let mut digest = TxDigest::new();
        digest.update(&digest_sign_init(r));

        log::debug!(
            "Sign init: {} inputs, {} outputs",
            r.num_inputs,
            r.num_outputs
        );

        let s = BtcSession {
            init: r.clone(),
            phase: Phase::Inputs1(0),
            digest,
            inputs: Vec::with_capacity(r.num_inputs as usize),
            input_total: 0,
            output_total: 0,
            prevtx: None,
            pending: None,
            confirmed: false,
        };

        Ok(self.btc_sign_resume(s, None))
    }

    /// Handle a request within a transaction signing session
    pub(crate) fn btc_sign_update(&mut self, req: &Request) -> Result<Response, Error> {
        let mut s = self
            .function
            .btc_sign_take()
            .ok_or(Error::UnexpectedRequest)?;
        let mut signature = None;

        match (s.phase, req) {
            (Phase::Inputs1(i), Request::BtcSignInput(r)) => {
                self.check_input(&s.init, r)?;
                if r.host_nonce_commitment.is_some() {
                    return Err(Error::InvalidInput);
                }

                s.digest.update(&digest_sign_input(r));
                s.input_total = s
                    .input_total
                    .checked_add(r.prev_out_value)
                    .ok_or(Error::InvalidInput)?;
                s.inputs.push(r.clone());

                let taproot =
                    s.init.script_configs[r.script_config_index as usize].script_config.is_taproot();

                s.phase = match taproot {
                    true => s.after_input(i),
                    false => Phase::PrevTxInit(i),
                };
            }

            (Phase::PrevTxInit(i), Request::BtcPrevTxInit(r)) => {
                if r.num_inputs == 0 || r.num_outputs == 0 {
                    return Err(Error::InvalidInput);
                }
                if s.input(i)?.prev_out_index >= r.num_outputs {
                    return Err(Error::OutOfRange);
                }

                s.prevtx = Some(r.clone());
                s.phase = Phase::PrevTxInput(i, 0);
            }

            (Phase::PrevTxInput(i, j), Request::BtcPrevTxInput(r)) => {
                if r.prev_out_hash.len() != 32 {
                    return Err(Error::InvalidLength);
                }

                let num_inputs = s.prevtx()?.num_inputs;
                s.phase = match j + 1 < num_inputs {
                    true => Phase::PrevTxInput(i, j + 1),
                    false => Phase::PrevTxOutput(i, 0),
                };
            }

            (Phase::PrevTxOutput(i, j), Request::BtcPrevTxOutput(r)) => {
                let input = s.input(i)?;
                if j == input.prev_out_index && r.value != input.prev_out_value {
                    log::error!(
                        "Input {} value {} does not match previous output {}",
                        i,
                        input.prev_out_value,
                        r.value
                    );
                    return Err(Error::ValueMismatch);
                }

                let num_outputs = s.prevtx()?.num_outputs;
                s.phase = match j + 1 < num_outputs {
                    true => Phase::PrevTxOutput(i, j + 1),
                    false => {
                        s.prevtx = None;
                        s.after_input(i)
                    }
                };
            }

            (Phase::Outputs(k), Request::BtcSignOutput(r)) => {
                self.check_output(&s.init, r)?;

                s.digest.update(&digest_sign_output(r));
                s.output_total = s
                    .output_total
                    .checked_add(r.value)
                    .ok_or(Error::InvalidInput)?;

                s.phase = match k + 1 < s.init.num_outputs {
                    true => Phase::Outputs(k + 1),
                    false if s.output_total > s.input_total => return Err(Error::InvalidInput),
                    false => Phase::Inputs2(0),
                };
            }

            (Phase::Inputs2(i), Request::BtcSignInput(r)) => {
                let mut stripped = r.clone();
                let commitment = stripped.host_nonce_commitment.take();

                if &stripped != s.input(i)? {
                    return Err(Error::InputMismatch);
                }

                // Show the summary before the first signature
                if !s.confirmed {
                    self.confirm(&Confirm::Transaction {
                        coin: s.init.coin,
                        num_inputs: s.init.num_inputs,
                        num_outputs: s.init.num_outputs,
                        total_out: s.output_total,
                        fee: s.input_total - s.output_total,
                    })?;
                    s.confirmed = true;
                }

                let key = self.key(&r.keypath)?;
                let sighash = s.digest.sighash(i);

                match commitment {
                    Some(c) => {
                        let host_commitment =
                            <[u8; 32]>::try_from(&c[..]).map_err(|_| Error::InvalidLength)?;
                        let k1 = random_nonce(&mut self.rng);

                        s.pending = Some(PendingInput {
                            key,
                            sighash,
                            signer_commitment: nonce_commitment(&self.secp, &k1),
                            k1,
                            host_commitment,
                        });
                        s.phase = Phase::HostNonce(i);
                    }
                    None => {
                        let k = random_nonce(&mut self.rng);
                        let (sig, _) = sign_with_nonce(&key, &sighash, &k)?;

                        signature = Some(sig);
                        s.phase = s.after_sign(i);
                    }
                }
            }

            (Phase::HostNonce(i), Request::BtcAntiKleptoSignature { host_nonce }) => {
                let p = s.pending.take().ok_or(Error::UnexpectedRequest)?;

                let (sig, _) =
                    self.s2c_sign(&p.key, &p.sighash, &p.k1, &p.host_commitment, host_nonce)?;

                signature = Some(sig);
                s.phase = s.after_sign(i);
            }

            (_p, _r) => {
                log::error!("Unexpected {} in phase {:?}", _r, _p);
                return Err(Error::UnexpectedRequest);
            }
        }

        Ok(self.btc_sign_resume(s, signature))
    }

    /// Store the session and build the request for its current phase
    fn btc_sign_resume(&mut self, s: BtcSession, signature: Option<[u8; 64]>) -> Response {
        let mut next = match s.phase {
            Phase::Inputs1(i) | Phase::Inputs2(i) => SignNextResponse::next(NextType::Input, i),
            Phase::PrevTxInit(i) => SignNextResponse::next(NextType::PrevtxInit, i),
            Phase::PrevTxInput(i, j) => {
                SignNextResponse::next(NextType::PrevtxInput, i).with_prev_index(j)
            }
            Phase::PrevTxOutput(i, j) => {
                SignNextResponse::next(NextType::PrevtxOutput, i).with_prev_index(j)
            }
            Phase::Outputs(k) => SignNextResponse::next(NextType::Output, k),
            Phase::HostNonce(i) => SignNextResponse {
                anti_klepto_signer_commitment: s
                    .pending
                    .as_ref()
                    .map(|p| p.signer_commitment.to_vec()),
                ..SignNextResponse::next(NextType::HostNonce, i)
            },
            Phase::Done => SignNextResponse::next(NextType::Done, 0),
        };

        if let Some(sig) = signature {
            next = next.with_signature(sig.to_vec());
        }

        match s.phase {
            Phase::Done => {
                log::debug!("Signing session complete");
                self.state = State::Init;
            }
            p => {
                self.state = State::BtcSign(p);
                self.function.btc_sign_resume(s);
            }
        }

        Response::BtcSignNext(next)
    }

    /// Check a transaction input against the session script configs
    fn check_input(&self, init: &SignInitRequest, r: &SignInputRequest) -> Result<(), Error> {
        if r.prev_out_hash.len() != 32 {
            return Err(Error::InvalidLength);
        }
        if r.prev_out_value == 0 {
            return Err(Error::InvalidInput);
        }

        let c = init
            .script_configs
            .get(r.script_config_index as usize)
            .ok_or(Error::OutOfRange)?;

        // account / change / address
        if r.keypath.len() != c.keypath.len() + 2 || !r.keypath.starts_with(&c.keypath) {
            return Err(Error::InvalidKeypath);
        }

        Ok(())
    }

    fn check_output(&self, init: &SignInitRequest, r: &SignOutputRequest) -> Result<(), Error> {
        if r.value == 0 {
            return Err(Error::InvalidInput);
        }

        if r.ours {
            let c = init
                .script_configs
                .get(r.script_config_index as usize)
                .ok_or(Error::OutOfRange)?;

            if r.keypath.len() != c.keypath.len() + 2 || !r.keypath.starts_with(&c.keypath) {
                return Err(Error::InvalidKeypath);
            }

            return Ok(());
        }

        let hash_len = match r.output_type {
            Some(OutputType::P2pkh | OutputType::P2sh | OutputType::P2wpkh) => 20,
            Some(OutputType::P2wsh | OutputType::P2tr) => 32,
            None => return Err(Error::InvalidInput),
        };
        if r.hash.len() != hash_len {
            return Err(Error::InvalidLength);
        }

        Ok(())
    }

    /// Sign a message with the key of a single-sig script config
    pub(crate) fn btc_sign_message(&mut self, r: &SignMessageRequest) -> Result<Response, Error> {
        match r.script_config.script_config {
            ScriptConfig::Simple(SimpleType::P2wpkh | SimpleType::P2wpkhP2sh) => (),
            _ => return Err(Error::InvalidInput),
        }
        if r.msg.len() > MAX_MESSAGE_LEN {
            return Err(Error::InvalidLength);
        }

        // Full address keypath
        let keypath = &r.script_config.keypath;
        self.check_btc_keypath(r.coin, keypath)?;
        if keypath.len() != 5 {
            return Err(Error::InvalidKeypath);
        }

        self.confirm(&Confirm::BtcMessage {
            coin: r.coin,
            msg: r.msg.clone(),
        })?;

        let key = self.key(keypath)?;
        let digest = digest_btc_message(&r.msg);

        self.sign_single(
            SignKind::BtcMessage,
            key,
            digest,
            r.host_nonce_commitment.as_deref(),
        )
    }
}

#[cfg(test)]
mod test {
    use bitbox_hww_proto::btc::*;

    use super::*;
    use crate::{ConfirmKind, TestDriver};

    const ACCOUNT: [u32; 3] = [84 + HARDENED, 1 + HARDENED, HARDENED];

    fn init(num_inputs: u32, simple: SimpleType) -> Request {
        Request::BtcSignInit(SignInitRequest {
            coin: BtcCoin::Tbtc,
            script_configs: vec![ScriptConfigWithKeypath {
                script_config: ScriptConfig::Simple(simple),
                keypath: ACCOUNT.to_vec(),
            }],
            version: 2,
            num_inputs,
            num_outputs: 1,
            locktime: 0,
        })
    }

    fn input(i: u32, commitment: Option<Vec<u8>>) -> SignInputRequest {
        SignInputRequest {
            prev_out_hash: vec![i as u8 + 1; 32],
            prev_out_index: 0,
            prev_out_value: 50_000,
            sequence: 0xffff_fffd,
            keypath: [&ACCOUNT[..], &[0, i]].concat(),
            script_config_index: 0,
            host_nonce_commitment: commitment,
        }
    }

    fn output(value: u64) -> Request {
        Request::BtcSignOutput(SignOutputRequest {
            ours: false,
            output_type: Some(OutputType::P2wpkh),
            value,
            hash: vec![0x11; 20],
            keypath: vec![],
            script_config_index: 0,
        })
    }

    fn next(r: Result<Response, Error>) -> SignNextResponse {
        match r {
            Ok(Response::BtcSignNext(n)) => n,
            r => panic!("unexpected response: {r:?}"),
        }
    }

    #[test]
    fn taproot_session() {
        let mut e = Engine::new(TestDriver::default());

        let n = next(e.update(&init(2, SimpleType::P2tr)));
        assert_eq!((n.next_type, n.index), (NextType::Input, 0));

        // No prevtx requests for taproot inputs
        let n = next(e.update(&Request::BtcSignInput(input(0, None))));
        assert_eq!((n.next_type, n.index), (NextType::Input, 1));
        let n = next(e.update(&Request::BtcSignInput(input(1, None))));
        assert_eq!((n.next_type, n.index), (NextType::Output, 0));
        let n = next(e.update(&output(90_000)));
        assert_eq!((n.next_type, n.index), (NextType::Input, 0));
        assert_eq!(e.state(), State::BtcSign(Phase::Inputs2(0)));

        let n = next(e.update(&Request::BtcSignInput(input(0, None))));
        assert_eq!((n.next_type, n.index), (NextType::Input, 1));
        assert!(n.has_signature);
        assert_eq!(n.signature.len(), 64);

        let n = next(e.update(&Request::BtcSignInput(input(1, None))));
        assert_eq!(n.next_type, NextType::Done);
        assert!(n.has_signature);

        assert_eq!(e.state(), State::Init);
        assert_eq!(e.driver().confirmations().len(), 1);
    }

    #[test]
    fn prevtx_value_mismatch() {
        let mut e = Engine::new(TestDriver::default());

        next(e.update(&init(1, SimpleType::P2wpkh)));
        let n = next(e.update(&Request::BtcSignInput(input(0, None))));
        assert_eq!(n.next_type, NextType::PrevtxInit);

        let n = next(e.update(&Request::BtcPrevTxInit(PrevTxInitRequest {
            version: 2,
            num_inputs: 1,
            num_outputs: 1,
            locktime: 0,
        })));
        assert_eq!((n.next_type, n.prev_index), (NextType::PrevtxInput, 0));

        let n = next(e.update(&Request::BtcPrevTxInput(PrevTxInputRequest {
            prev_out_hash: vec![0xcc; 32],
            prev_out_index: 3,
            signature_script: vec![],
            sequence: 0xffff_ffff,
        })));
        assert_eq!((n.next_type, n.prev_index), (NextType::PrevtxOutput, 0));

        let r = e.update(&Request::BtcPrevTxOutput(PrevTxOutputRequest {
            value: 49_999,
            pubkey_script: vec![0x00, 0x14],
        }));
        assert_eq!(r, Err(Error::ValueMismatch));

        // Session aborted
        assert_eq!(e.state(), State::Init);
    }

    #[test]
    fn pass2_input_must_match() {
        let mut e = Engine::new(TestDriver::default());

        next(e.update(&init(1, SimpleType::P2tr)));
        next(e.update(&Request::BtcSignInput(input(0, None))));
        next(e.update(&output(10_000)));

        let mut changed = input(0, None);
        changed.prev_out_value += 1;

        assert_eq!(
            e.update(&Request::BtcSignInput(changed)),
            Err(Error::InputMismatch)
        );
    }

    #[test]
    fn outputs_exceeding_inputs() {
        let mut e = Engine::new(TestDriver::default());

        next(e.update(&init(1, SimpleType::P2tr)));
        next(e.update(&Request::BtcSignInput(input(0, None))));

        assert_eq!(e.update(&output(50_001)), Err(Error::InvalidInput));
    }

    #[test]
    fn declined_transaction() {
        let drv = TestDriver::default().decline(ConfirmKind::Transaction);
        let mut e = Engine::new(drv);

        next(e.update(&init(1, SimpleType::P2tr)));
        next(e.update(&Request::BtcSignInput(input(0, None))));
        next(e.update(&output(10_000)));

        assert_eq!(
            e.update(&Request::BtcSignInput(input(0, None))),
            Err(Error::UserAbort)
        );
    }

    #[test]
    fn host_nonce_must_match_commitment() {
        let mut e = Engine::new(TestDriver::default());

        let host_nonce = [0x42u8; 32];
        let commitment = bitbox_hww_proto::digest::host_commit(&host_nonce);

        next(e.update(&init(1, SimpleType::P2tr)));
        next(e.update(&Request::BtcSignInput(input(0, None))));
        next(e.update(&output(10_000)));

        let n = next(e.update(&Request::BtcSignInput(input(0, Some(commitment.to_vec())))));
        assert_eq!(n.next_type, NextType::HostNonce);
        assert!(!n.has_signature);
        assert_eq!(n.anti_klepto_signer_commitment.map(|c| c.len()), Some(33));

        assert_eq!(
            e.update(&Request::BtcAntiKleptoSignature {
                host_nonce: vec![0x43; 32]
            }),
            Err(Error::NonceMismatch)
        );
    }

    #[test]
    fn message_script_types() {
        let mut e = Engine::new(TestDriver::default());

        let r = Request::BtcSignMessage(SignMessageRequest {
            coin: BtcCoin::Btc,
            script_config: ScriptConfigWithKeypath {
                script_config: ScriptConfig::Simple(SimpleType::P2tr),
                keypath: vec![86 + HARDENED, HARDENED, HARDENED, 0, 0],
            },
            msg: b"message".to_vec(),
            host_nonce_commitment: None,
        });

        assert_eq!(e.update(&r), Err(Error::InvalidInput));
    }
}
