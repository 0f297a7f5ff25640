#![allow(unused)]

use std::{collections::VecDeque, str::FromStr, sync::Mutex};

use async_trait::async_trait;
use log::{debug, LevelFilter};
use simplelog::SimpleLogger;

use bitbox_hww::{
    btc::{BtcTransaction, PrevTx, PrevTxInput, PrevTxOutput, TxInput, TxOutput},
    proto::{
        btc::{
            BtcCoin, OutputType, ScriptConfig, ScriptConfigWithKeypath, SimpleType, HARDENED,
        },
        Exchange, Request, Response, Version,
    },
    DeviceHandle,
};
use bitbox_hww_sim::{Engine, SimTransport, TestDriver};

/// Account keypath `m/84'/0'/0'`
pub const ACCOUNT: [u32; 3] = [84 + HARDENED, HARDENED, HARDENED];

/// Taproot account keypath `m/86'/0'/0'`
pub const TR_ACCOUNT: [u32; 3] = [86 + HARDENED, HARDENED, HARDENED];

pub type SimHandle = DeviceHandle<SimTransport<TestDriver>>;

/// Setup logging, level from `LOG_LEVEL`
pub fn setup() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let log_cfg = simplelog::ConfigBuilder::new()
        .add_filter_ignore_str("mio")
        .build();

    let _ = SimpleLogger::init(log_level, log_cfg);
}

/// Setup a simulated signer reporting `version`, returning the transport
/// (for inspecting the engine) and a host handle
pub fn sim(version: Version, engine: Engine<TestDriver>) -> (SimTransport<TestDriver>, SimHandle) {
    setup();

    let t = SimTransport::new(engine).with_version(version);
    let d = DeviceHandle::from(t.clone());

    (t, d)
}

/// Single-sig transaction with one native segwit and one taproot input,
/// a payment and change
pub fn transaction() -> BtcTransaction {
    BtcTransaction {
        coin: BtcCoin::Btc,
        script_configs: vec![
            ScriptConfigWithKeypath {
                script_config: ScriptConfig::Simple(SimpleType::P2wpkh),
                keypath: ACCOUNT.to_vec(),
            },
            ScriptConfigWithKeypath {
                script_config: ScriptConfig::Simple(SimpleType::P2tr),
                keypath: TR_ACCOUNT.to_vec(),
            },
        ],
        version: 2,
        locktime: 0,
        inputs: vec![
            TxInput {
                prev_out_hash: [0x45; 32],
                prev_out_index: 1,
                prev_out_value: 60_000_000,
                sequence: 0xffff_fffd,
                keypath: [&ACCOUNT[..], &[0, 5]].concat(),
                script_config_index: 0,
                prev_tx: Some(prev_tx(1, 60_000_000)),
            },
            TxInput {
                prev_out_hash: [0x46; 32],
                prev_out_index: 0,
                prev_out_value: 40_000_000,
                sequence: 0xffff_fffd,
                keypath: [&TR_ACCOUNT[..], &[1, 2]].concat(),
                script_config_index: 1,
                prev_tx: None,
            },
        ],
        outputs: vec![
            TxOutput::External {
                output_type: OutputType::P2wsh,
                hash: vec![0x11; 32],
                value: 70_000_000,
            },
            TxOutput::Internal {
                keypath: [&ACCOUNT[..], &[1, 3]].concat(),
                value: 29_990_000,
                script_config_index: 0,
            },
        ],
    }
}

/// Previous transaction paying `value` at output `index`
pub fn prev_tx(index: u32, value: u64) -> PrevTx {
    let mut outputs: Vec<_> = (0..=index)
        .map(|_| PrevTxOutput {
            value: 1_000,
            pubkey_script: vec![0x00, 0x14, 0xab],
        })
        .collect();
    outputs[index as usize].value = value;

    PrevTx {
        version: 1,
        locktime: 0,
        inputs: vec![PrevTxInput {
            prev_out_hash: [0x99; 32],
            prev_out_index: 0,
            signature_script: vec![],
            sequence: 0xffff_ffff,
        }],
        outputs,
    }
}

/// Channel error for scripted exchanges
#[derive(Debug, thiserror::Error)]
#[error("scripted channel error")]
pub struct ScriptError;

/// Exchange replaying scripted responses, for signer behaviour the
/// simulator does not produce
pub struct Scripted {
    version: Version,
    responses: Mutex<VecDeque<Result<Response, ScriptError>>>,
    pub requests: Mutex<Vec<Request>>,
}

impl Scripted {
    pub fn new(version: Version, responses: Vec<Result<Response, ScriptError>>) -> Self {
        setup();

        Self {
            version,
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl Exchange for Scripted {
    type Error = ScriptError;

    async fn exchange(&self, req: &Request) -> Result<Response, Self::Error> {
        debug!("scripted request: {}", req);

        self.requests.lock().unwrap().push(req.clone());

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("script exhausted")
    }

    fn version(&self) -> Version {
        self.version
    }
}

/// Exchange answering each request with a closure, for signer behaviour
/// that depends on request contents
pub struct Responder<F> {
    version: Version,
    respond: Mutex<F>,
    pub requests: Mutex<Vec<Request>>,
}

impl<F: FnMut(&Request) -> Response + Send> Responder<F> {
    pub fn new(version: Version, respond: F) -> Self {
        setup();

        Self {
            version,
            respond: Mutex::new(respond),
            requests: Mutex::new(vec![]),
        }
    }

    /// Names of the recorded requests
    pub fn request_names(&self) -> Vec<&'static str> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(<&'static str>::from)
            .collect()
    }
}

#[async_trait]
impl<F: FnMut(&Request) -> Response + Send> Exchange for Responder<F> {
    type Error = ScriptError;

    async fn exchange(&self, req: &Request) -> Result<Response, Self::Error> {
        debug!("responder request: {}", req);

        self.requests.lock().unwrap().push(req.clone());

        let resp = (self.respond.lock().unwrap())(req);
        Ok(resp)
    }

    fn version(&self) -> Version {
        self.version
    }
}
